//! Session storage keyed by (app, user, session).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::session::Session;
use super::state::{SessionState, SharedStateMap, StateMap};
use crate::error::BraidError;

/// CRUD over sessions.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create a session; a missing id is generated.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
        initial_state: StateMap,
    ) -> Result<Arc<Session>, BraidError>;

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Arc<Session>, BraidError>;

    async fn list_sessions(
        &self,
        app_name: &str,
        user_id: &str,
    ) -> Result<Vec<Arc<Session>>, BraidError>;

    async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), BraidError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    fn not_found(self) -> BraidError {
        BraidError::SessionNotFound {
            app_name: self.app_name,
            user_id: self.user_id,
            session_id: self.session_id,
        }
    }
}

#[derive(Default)]
struct Store {
    sessions: HashMap<SessionKey, Arc<Session>>,
    app_state: HashMap<String, SharedStateMap>,
    user_state: HashMap<(String, String), SharedStateMap>,
}

/// Process-local session service.
#[derive(Default)]
pub struct InMemorySessionService {
    store: RwLock<Store>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
        initial_state: StateMap,
    ) -> Result<Arc<Session>, BraidError> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = SessionKey::new(app_name, user_id, &session_id);
        let mut store = self.store.write().await;
        if store.sessions.contains_key(&key) {
            return Err(BraidError::InvalidState(format!(
                "session {app_name}/{user_id}/{session_id} already exists"
            )));
        }

        let app = store
            .app_state
            .entry(app_name.to_string())
            .or_default()
            .clone();
        let user = store
            .user_state
            .entry((app_name.to_string(), user_id.to_string()))
            .or_default()
            .clone();
        let state = SessionState::with_shared(app, user);
        state.apply_delta(&initial_state);

        let session = Arc::new(Session::with_state(app_name, user_id, session_id, state));
        store.sessions.insert(key, session.clone());
        tracing::debug!(
            app_name,
            user_id,
            session_id = %session.id(),
            "session created"
        );
        Ok(session)
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Arc<Session>, BraidError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let store = self.store.read().await;
        store
            .sessions
            .get(&key)
            .cloned()
            .ok_or_else(|| key.not_found())
    }

    async fn list_sessions(
        &self,
        app_name: &str,
        user_id: &str,
    ) -> Result<Vec<Arc<Session>>, BraidError> {
        let store = self.store.read().await;
        let mut sessions: Vec<Arc<Session>> = store
            .sessions
            .iter()
            .filter(|(key, _)| key.app_name == app_name && key.user_id == user_id)
            .map(|(_, session)| session.clone())
            .collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(sessions)
    }

    async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), BraidError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut store = self.store.write().await;
        match store.sessions.remove(&key) {
            Some(_) => Ok(()),
            None => Err(key.not_found()),
        }
    }
}
