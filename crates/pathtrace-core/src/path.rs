//! Trace paths and their segments.
//!
//! A [`TracePath`] is an immutable sequence of [`Segment`]s. Paths are the
//! keys of the aggregate table, so their ordering, equality and hashing only
//! look at namespaces and names; start timestamps are ignored.
//!
//! Ordering is length first: a shorter path sorts before a longer one no
//! matter what the segments contain. Paths of equal length compare segment
//! by segment: namespace first (absent before present), then name. Strings
//! compare by UTF-16 code units, the same units the fingerprint hashes.

use crate::errors::{Result, TraceError};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One named, timestamped node in a trace path.
#[derive(Debug, Clone)]
pub struct Segment {
    namespace: Option<String>,
    name: String,
    start_ms: u64,
}

impl Segment {
    /// Create a segment. The name must not be empty.
    pub fn new(namespace: Option<String>, name: impl Into<String>, start_ms: u64) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TraceError::EmptyName);
        }
        Ok(Self {
            namespace,
            name,
            start_ms,
        })
    }

    /// Namespace URI, if the segment has one
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local name of the section
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clock reading when the segment was entered
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// Render as `/prefix:name`, `/namespace:name` or `/name`.
    pub fn render(&self, prefixes: &PrefixMap) -> String {
        let display = self
            .namespace
            .as_deref()
            .map(|ns| prefixes.get(ns).unwrap_or(ns));
        match display {
            Some(ns) => format!("/{ns}:{}", self.name),
            None => format!("/{}", self.name),
        }
    }

    fn fingerprint(&self) -> i32 {
        let ns = self.namespace.as_deref().map_or(0, string_hash);
        let name = string_hash(&self.name);
        31i32.wrapping_add(ns).wrapping_mul(31).wrapping_add(name)
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        let namespace = match (&self.namespace, &other.namespace) {
            (Some(a), Some(b)) => utf16_cmp(a, b),
            (a, b) => a.is_some().cmp(&b.is_some()),
        };
        namespace.then_with(|| utf16_cmp(&self.name, &other.name))
    }
}

/// Order strings by UTF-16 code units, consistent with [`string_hash`].
fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.fingerprint());
    }
}

/// Polynomial string hash over UTF-16 code units.
fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Immutable ordered sequence of segments. The empty path is the root.
#[derive(Debug, Clone)]
pub struct TracePath {
    segments: Arc<[Segment]>,
}

impl TracePath {
    /// The root path
    pub fn root() -> Self {
        Self::from_segments(Vec::new())
    }

    /// Build a path from segments, outermost first.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments, outermost first
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Innermost segment
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// A new path with `segment` appended. `self` is unchanged.
    pub fn pushed(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self::from_segments(segments)
    }

    /// A new path without the innermost segment, or `None` at the root.
    pub fn popped(&self) -> Option<Self> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self::from_segments(parent.to_vec()))
    }

    /// Render every segment, resolving namespaces through `prefixes`.
    pub fn render(&self, prefixes: &PrefixMap) -> String {
        self.segments.iter().map(|s| s.render(prefixes)).collect()
    }

    /// Length-seeded rolling hash over the segments.
    pub fn fingerprint(&self) -> i32 {
        let seed = (self.len() as i32).wrapping_shl(16);
        self.segments
            .iter()
            .fold(seed, |acc, s| acc.wrapping_mul(7).wrapping_add(s.fingerprint()))
    }
}

impl Default for TracePath {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialEq for TracePath {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TracePath {}

impl PartialOrd for TracePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TracePath {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.segments, &other.segments) {
            return Ordering::Equal;
        }
        self.len()
            .cmp(&other.len())
            .then_with(|| self.segments.iter().cmp(other.segments.iter()))
    }
}

impl Hash for TracePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.fingerprint());
    }
}

impl fmt::Display for TracePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&PrefixMap::new()))
    }
}

/// Namespace URI to display prefix mapping, fixed once a lineage is rooted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl PrefixMap {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.insert(namespace, prefix);
        self
    }

    /// Map `namespace` to `prefix`
    pub fn insert(&mut self, namespace: impl Into<String>, prefix: impl Into<String>) {
        self.prefixes.insert(namespace.into(), prefix.into());
    }

    /// Display prefix for `namespace`
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.prefixes.get(namespace).map(String::as_str)
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// True when nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl<N: Into<String>, P: Into<String>> FromIterator<(N, P)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (N, P)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (namespace, prefix) in iter {
            map.insert(namespace, prefix);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn seg(ns: Option<&str>, name: &str, ts: u64) -> Segment {
        Segment::new(ns.map(str::to_string), name, ts).unwrap()
    }

    fn path(names: &[&str]) -> TracePath {
        TracePath::from_segments(names.iter().map(|n| seg(None, n, 0)).collect())
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(Segment::new(None, "", 0).unwrap_err(), TraceError::EmptyName);
    }

    #[test]
    fn test_shorter_path_sorts_first() {
        let short = path(&["zzz"]);
        let long = path(&["aaa", "aaa"]);
        assert!(short < long);
        assert!(path(&[]) < short);
    }

    #[test]
    fn test_equal_length_compares_segmentwise() {
        assert!(path(&["a", "b"]) < path(&["a", "c"]));
        assert!(path(&["b", "a"]) > path(&["a", "z"]));
        assert_eq!(path(&["a", "b"]), path(&["a", "b"]));
    }

    #[test]
    fn test_namespace_compared_before_name() {
        let plain = TracePath::from_segments(vec![seg(None, "z", 0)]);
        let apples = TracePath::from_segments(vec![seg(Some("apples"), "z", 0)]);
        let beans = TracePath::from_segments(vec![seg(Some("beans"), "a", 0)]);
        assert!(plain < apples);
        assert!(apples < beans);
        assert_ne!(plain, apples);
    }

    #[test]
    fn test_names_compare_by_utf16_units() {
        // U+FF61 is one unit above the surrogate pair that encodes U+1F600
        let halfwidth = path(&["\u{FF61}"]);
        let emoji = path(&["\u{1F600}"]);
        assert!(halfwidth > emoji);
        assert!("\u{FF61}" < "\u{1F600}");

        let ns_a = TracePath::from_segments(vec![seg(Some("\u{FF61}"), "x", 0)]);
        let ns_b = TracePath::from_segments(vec![seg(Some("\u{1F600}"), "x", 0)]);
        assert!(ns_a > ns_b);
    }

    #[test]
    fn test_timestamp_ignored_by_eq_and_hash() {
        let a = TracePath::from_segments(vec![seg(Some("ns"), "Task", 1)]);
        let b = TracePath::from_segments(vec![seg(Some("ns"), "Task", 999)]);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_fingerprint_seeds_with_length() {
        assert_eq!(TracePath::root().fingerprint(), 0);
        // "a" hashes to 97; segment hash is 31 * 31 + 97
        assert_eq!(path(&["a"]).fingerprint(), (1 << 16) * 7 + 31 * 31 + 97);
    }

    #[test]
    fn test_render_with_prefixes() {
        let prefixes = PrefixMap::new().with("urn:apples", "ap");
        let p = TracePath::from_segments(vec![
            seg(Some("urn:apples"), "Program Start", 0),
            seg(Some("urn:pears"), "Task 1", 0),
            seg(None, "inner", 0),
        ]);
        assert_eq!(
            p.render(&prefixes),
            "/ap:Program Start/urn:pears:Task 1/inner"
        );
        assert_eq!(p.to_string(), "/urn:apples:Program Start/urn:pears:Task 1/inner");
        assert_eq!(TracePath::root().render(&prefixes), "");
    }

    #[test]
    fn test_push_and_pop_leave_receiver_untouched() {
        let base = path(&["a"]);
        let child = base.pushed(seg(None, "b", 5));
        assert_eq!(base.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.popped().unwrap(), base);
        assert!(TracePath::root().popped().is_none());
    }
}
