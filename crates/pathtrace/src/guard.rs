//! RAII section guards.

use crate::store::ContextStore;
use crate::tracer::Tracer;

/// Exits its section when dropped.
///
/// Created by [`Tracer::section`] and [`Tracer::default_section`]. A failed
/// exit on drop is logged, not propagated; call [`SectionGuard::finish`] to
/// observe the error instead.
#[must_use = "the section is exited as soon as the guard is dropped"]
pub struct SectionGuard<'a, S: ContextStore> {
    tracer: &'a Tracer<S>,
    context: Option<String>,
    active: bool,
}

impl<'a, S: ContextStore> SectionGuard<'a, S> {
    pub(crate) fn new(tracer: &'a Tracer<S>, context: Option<String>) -> Self {
        Self {
            tracer,
            context,
            active: true,
        }
    }

    /// Context the section was entered in (`None` for the default context)
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Exit now and report the outcome.
    pub fn finish(mut self) -> pathtrace_core::Result<()> {
        self.active = false;
        self.exit()
    }

    fn exit(&self) -> pathtrace_core::Result<()> {
        match &self.context {
            Some(context) => self.tracer.exit(context),
            None => self.tracer.exit_default(),
        }
    }
}

impl<S: ContextStore> Drop for SectionGuard<'_, S> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(error) = self.exit() {
            tracing::warn!(
                context = self.context.as_deref().unwrap_or(self.tracer.default_context()),
                %error,
                "failed to exit section on guard drop"
            );
        }
    }
}
