//! Core types for Braid.

pub mod content;
pub mod event;
pub mod generation;
pub mod usage;

pub use content::*;
pub use event::*;
pub use generation::*;
pub use usage::*;
