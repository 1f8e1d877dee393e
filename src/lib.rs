//! Braid: an agent runtime.
//!
//! Agents form a tree. An [`agent::LlmAgent`] drives a model through a
//! multi-turn tool loop; workflow agents compose children sequentially, in a
//! loop, or in parallel; the router hands control between agents when one
//! requests a transfer. Everything an invocation produces is recorded as
//! [`types::Event`]s in a [`session::Session`], and the log can be
//! periodically condensed by the [`compaction::CompactionService`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use braid::prelude::*;
//! use futures::StreamExt;
//!
//! # async fn example(model: Arc<dyn Model>) -> braid::error::Result<()> {
//! let tree = AgentTree::build(AgentNode::new(
//!     LlmAgent::new("assistant", model).with_instruction("Answer briefly."),
//! ))?;
//! let sessions = Arc::new(InMemorySessionService::new());
//! sessions
//!     .create_session("demo", "user-1", Some("s1".into()), StateMap::new())
//!     .await?;
//!
//! let runner = Runner::new("demo", tree, sessions);
//! let mut events = runner.run("user-1", "s1", Content::user("Hello!"), RunConfig::default());
//! while let Some(event) = events.next().await {
//!     let event = event?;
//!     println!("{}: {}", event.author, event.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod compaction;
pub mod config;
pub mod error;
pub mod model;
pub mod prelude;
pub mod runner;
pub mod session;
pub mod tools;
pub mod types;

pub use runner::Runner;
