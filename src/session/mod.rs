//! Sessions: event log, scoped state, and storage.

pub mod service;
#[allow(clippy::module_inception)]
pub mod session;
pub mod state;

pub use service::{InMemorySessionService, SessionService};
pub use session::Session;
pub use state::{SessionState, StateMap, StateScope, APP_PREFIX, USER_PREFIX};
