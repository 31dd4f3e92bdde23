//! # Application Layer
//!
//! Contains the core logic of the watcher: credential rotation, persistent
//! cursors, the three monitors, fair assignment and the job orchestrator.

pub mod assigner;
pub mod channel;
pub mod credentials;
pub mod feed;
pub mod notify;
pub mod official;
pub mod roster;
pub mod scheduler;
pub mod social;
pub mod state;
pub mod tracked;
