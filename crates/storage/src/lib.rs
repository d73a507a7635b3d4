use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;
use voyage_core::{GeoResult, SessionState, TripPlan};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown session: {0}")]
    UnknownSession(String),
}

/// Per-session display state. `replace` is the only way to change a
/// session's plan or geography and swaps both in one step.
pub trait SessionStore: Send + Sync {
    fn create_session(&self) -> String;
    fn contains(&self, session_id: &str) -> bool;
    fn get(&self, session_id: &str) -> Option<SessionState>;
    fn replace(
        &self,
        session_id: &str,
        destination: &str,
        plan: TripPlan,
        geo: GeoResult,
    ) -> Result<SessionState, StoreError>;
    fn remove(&self, session_id: &str) -> bool;
}

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .insert(session_id.clone(), SessionState::default());
        session_id
    }

    fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    fn get(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.read().get(session_id).cloned()
    }

    fn replace(
        &self,
        session_id: &str,
        destination: &str,
        plan: TripPlan,
        geo: GeoResult,
    ) -> Result<SessionState, StoreError> {
        let mut sessions = self.sessions.write();
        let slot = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))?;

        *slot = SessionState {
            plan: Some(plan),
            geo: Some(geo),
            destination: Some(destination.to_string()),
            updated_at: Some(Utc::now()),
        };

        Ok(slot.clone())
    }

    fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }
}
