use std::time::Duration;

use depot_types::ContextId;

/// Per-request parameters.
///
/// The context id is the unit-of-work token: nested calls carrying the same
/// id re-enter locks they already hold instead of waiting on themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub id: ContextId,
    /// Overrides the configured lock wait for this request.
    pub lock_timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: ContextId) -> Self {
        Self {
            id,
            lock_timeout: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}
