//! Request-scoped correlation context.
//!
//! Created once per inbound call and passed explicitly to every step of a flow.
//! There is no implicit or task-local correlation state anywhere in the crate.

use std::time::Instant;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    started_at: Instant,
}

impl RequestContext {
    /// Fresh context with a new random correlation id
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Instant::now(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
