//! Hierarchical key/value state.
//!
//! Keys are routed to a scope by prefix: `app:` keys are shared by every
//! session of an app, `user:` keys by every session of one user in that app,
//! and unprefixed keys belong to the session alone. The merged view keeps the
//! prefixes, so scopes never collide.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

/// Prefix for app-scoped keys.
pub const APP_PREFIX: &str = "app:";
/// Prefix for user-scoped keys.
pub const USER_PREFIX: &str = "user:";

/// Flat JSON map used for state and deltas.
pub type StateMap = serde_json::Map<String, Value>;

/// One scope's map, shareable across sessions.
pub type SharedStateMap = Arc<RwLock<StateMap>>;

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Scope a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    App,
    User,
    Session,
}

impl StateScope {
    pub fn of(key: &str) -> Self {
        if key.starts_with(APP_PREFIX) {
            StateScope::App
        } else if key.starts_with(USER_PREFIX) {
            StateScope::User
        } else {
            StateScope::Session
        }
    }
}

/// A session's view over the three scopes.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    app: SharedStateMap,
    user: SharedStateMap,
    session: SharedStateMap,
}

impl SessionState {
    /// Fresh, unshared scopes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session-local scope over existing app and user scopes.
    pub fn with_shared(app: SharedStateMap, user: SharedStateMap) -> Self {
        Self {
            app,
            user,
            session: SharedStateMap::default(),
        }
    }

    fn scope(&self, key: &str) -> &SharedStateMap {
        match StateScope::of(key) {
            StateScope::App => &self.app,
            StateScope::User => &self.user,
            StateScope::Session => &self.session,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        read_lock(self.scope(key)).get(key).cloned()
    }

    /// String value, if the key holds a JSON string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        write_lock(self.scope(&key)).insert(key, value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        write_lock(self.scope(key)).remove(key)
    }

    /// Merge a delta, routing every key to its scope.
    pub fn apply_delta(&self, delta: &StateMap) {
        for (key, value) in delta {
            self.set(key.clone(), value.clone());
        }
    }

    /// Merged view of all scopes, prefixes retained.
    pub fn to_map(&self) -> StateMap {
        let mut merged = read_lock(&self.app).clone();
        merged.extend(read_lock(&self.user).clone());
        merged.extend(read_lock(&self.session).clone());
        merged
    }

    pub fn is_empty(&self) -> bool {
        read_lock(&self.app).is_empty()
            && read_lock(&self.user).is_empty()
            && read_lock(&self.session).is_empty()
    }
}
