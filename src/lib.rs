//! notekeep
//!
//! Data core for a hierarchical notes and todo organizer: folder trees
//! with cycle prevention and cached counts, note/tag association
//! bookkeeping, a note filter engine, and todo checklists. Consumed by
//! an external request-handling layer.

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod logging;
pub mod services;
