//! Validation limits
//!
//! Central location for the field length limits and credential
//! boundaries enforced by the services layer.

/// Maximum length for a note title
pub const MAX_NOTE_TITLE_LENGTH: usize = 200;

/// Maximum length for a todo list title
pub const MAX_TODO_LIST_TITLE_LENGTH: usize = 500;

/// Maximum length for a todo description
pub const MAX_TODO_DESCRIPTION_LENGTH: usize = 1000;

/// Minimum length for a local account password.
/// Shorter passwords are rejected before hashing.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum folder nesting depth (a root folder sits at depth 0).
/// Enforced when a folder is created or re-parented, so persisted
/// trees never exceed it and structural reads never have to bail.
pub const MAX_FOLDER_DEPTH: usize = 128;
