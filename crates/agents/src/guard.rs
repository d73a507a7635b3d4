use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

pub(crate) type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks a session as having a run in flight until dropped.
pub(crate) struct RunGuard {
    in_flight: InFlight,
    session_id: String,
}

impl RunGuard {
    pub(crate) fn acquire(in_flight: &InFlight, session_id: &str) -> Option<Self> {
        if !in_flight.lock().insert(session_id.to_string()) {
            return None;
        }

        Some(Self {
            in_flight: in_flight.clone(),
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.session_id);
    }
}
