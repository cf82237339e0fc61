//! Tracer configuration
//!
//! Configuration is layered the usual way: defaults, then a TOML file, then
//! `PATHTRACE_*` environment variables, then `validate()`.

use crate::errors::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on path depth before pushes are dropped.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Context id used by the default-context façade.
pub const DEFAULT_CONTEXT: &str = "default";

const ENV_PREFIX: &str = "PATHTRACE_";

/// How the summary chooses the value that percentages are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalBasis {
    /// Aggregate of the first entry in sorted order (the shortest path).
    #[default]
    FirstSorted,
    /// Sum of every depth-1 aggregate in the table.
    RootLevelSum,
}

impl std::str::FromStr for TotalBasis {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_sorted" => Ok(Self::FirstSorted),
            "root_level_sum" => Ok(Self::RootLevelSum),
            other => Err(TraceError::config(format!(
                "unknown total basis `{other}` (expected `first_sorted` or `root_level_sum`)"
            ))),
        }
    }
}

/// Settings shared by every state in a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Pushes onto a path longer than this are dropped with a warning
    pub max_depth: usize,
    /// Basis for summary percentages
    pub total_basis: TotalBasis,
    /// Context id used by `enter_default`/`exit_default`
    pub default_context: String,
    /// Print the summary when a pop reaches the root
    pub print_on_root_exit: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            total_basis: TotalBasis::default(),
            default_context: DEFAULT_CONTEXT.to_string(),
            print_on_root_exit: true,
        }
    }
}

impl TraceConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Override fields from `PATHTRACE_*` environment variables.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Override fields from an explicit set of `(key, value)` pairs.
    ///
    /// Keys use the environment spelling, e.g. `PATHTRACE_MAX_DEPTH`.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(field) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            self.set_from_string(&field.to_ascii_lowercase(), value.as_ref())?;
        }
        Ok(())
    }

    /// Set a single field from its string form.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "max_depth" => {
                self.max_depth = value.trim().parse().map_err(|e| {
                    TraceError::config(format!("max_depth `{value}` is not a number: {e}"))
                })?;
            }
            "total_basis" => self.total_basis = value.parse()?,
            "default_context" => self.default_context = value.to_string(),
            "print_on_root_exit" => {
                self.print_on_root_exit = value.trim().parse().map_err(|e| {
                    TraceError::config(format!(
                        "print_on_root_exit `{value}` is not a boolean: {e}"
                    ))
                })?;
            }
            other => {
                return Err(TraceError::config(format!("unknown config key `{other}`")));
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(TraceError::config("max_depth must be at least 1"));
        }
        if self.default_context.is_empty() {
            return Err(TraceError::config("default_context must not be empty"));
        }
        Ok(())
    }
}
