use crate::application::render::types::RenderError;

pub type FinallyHook = Box<dyn FnOnce() + Send>;
pub type ErrorHook = Box<dyn FnOnce(&RenderError) + Send>;

/// Runs a render's `finally` hook when dropped, so it fires exactly once on
/// success, on failure, and when the render future is cancelled.
pub(crate) struct FinallyGuard {
    hook: Option<FinallyHook>,
}

impl FinallyGuard {
    pub(crate) fn new(hook: Option<FinallyHook>) -> Self {
        Self { hook }
    }
}

impl Drop for FinallyGuard {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}
