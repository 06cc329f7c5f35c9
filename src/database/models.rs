//! Database models
//!
//! Rust structs representing database entities, plus the request
//! structs the services layer accepts. All models use serde so the
//! consuming request layer can render them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// How a user proves who they are: exactly one of an external identity
/// or a locally stored password digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    External { provider: String, uid: String },
    Local { password_digest: String },
}

/// An account owning folders, notes, tags, todos and todo lists
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub credential: Credential,
    pub notes_count: i64,
    pub todos_count: i64,
    pub todo_lists_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_external(&self) -> bool {
        matches!(self.credential, Credential::External { .. })
    }

    /// Name, falling back to the local part of the email.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.email.split('@').next().unwrap_or(&self.email)
        }
    }
}

// The credential columns are nullable siblings in the row; fold them
// into the tagged enum so the "exactly one" invariant holds in the type.
impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let provider: Option<String> = row.try_get("provider")?;
        let uid: Option<String> = row.try_get("uid")?;
        let password_digest: Option<String> = row.try_get("password_digest")?;

        let credential = match (provider, uid, password_digest) {
            (Some(provider), Some(uid), _) => Credential::External { provider, uid },
            (None, None, Some(password_digest)) => Credential::Local { password_digest },
            _ => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "provider".into(),
                    source: "user row has neither an external identity nor a password digest"
                        .into(),
                })
            }
        };

        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            credential,
            notes_count: row.try_get("notes_count")?,
            todos_count: row.try_get("todos_count")?,
            todo_lists_count: row.try_get("todo_lists_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A named hierarchical container for notes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub user_id: String,
    /// Cached count of notes directly in this folder
    pub notes_count: i64,
    /// Cached count of direct child folders
    pub children_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Backed by the cached counter, not a live query.
    pub fn has_children(&self) -> bool {
        self.children_count > 0
    }
}

/// A titled piece of markdown content, optionally foldered and tagged
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub folder_id: Option<String>,
    pub user_id: String,
    /// Cached count of tag links on this note
    pub tags_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user-defined label attachable to notes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub user_id: String,
    /// Cached count of notes linked to this tag
    pub notes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join row between a note and a tag
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NoteTagLink {
    pub id: String,
    pub note_id: String,
    pub tag_id: String,
    /// Denormalized from the tag at creation, for scoped queries
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A checklist container of todos
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TodoList {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single checklist item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: String,
    pub description: String,
    pub completed: bool,
    pub todo_list_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn status(&self) -> &'static str {
        if self.completed {
            "completed"
        } else {
            "pending"
        }
    }
}

/// Register a local-password account
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// External-identity payload, as handed over by the excluded auth layer
#[derive(Debug, Deserialize)]
pub struct ExternalIdentity {
    pub provider: String,
    pub uid: String,
    pub email: String,
    pub name: String,
}

/// Create folder request
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub user_id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// Update folder request.
///
/// `parent_id` is doubly optional: `None` leaves the parent untouched,
/// `Some(None)` re-parents the folder to the root level.
#[derive(Debug, Deserialize)]
pub struct UpdateFolderRequest {
    pub id: String,
    pub name: Option<String>,
    pub parent_id: Option<Option<String>>,
}

/// Create note request
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub folder_id: Option<String>,
}

/// Update note request; `folder_id` follows the same double-option
/// convention as [`UpdateFolderRequest`].
#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder_id: Option<Option<String>>,
}

/// Folder predicate for note filtering: a concrete folder, or the
/// "none" sentinel meaning notes outside any folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderScope {
    Unfiled,
    In(String),
}

impl FolderScope {
    /// Parse the request-layer form of the predicate. Blank input is a
    /// no-op; the literal `"none"` selects unfiled notes.
    pub fn parse(raw: Option<&str>) -> Option<FolderScope> {
        match raw.map(str::trim) {
            None | Some("") => None,
            Some("none") => Some(FolderScope::Unfiled),
            Some(id) => Some(FolderScope::In(id.to_string())),
        }
    }
}

/// Conjunctive note filter. Absent predicates pass everything through;
/// ordering of the base collection (most recent first) is preserved.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub folder: Option<FolderScope>,
    pub tag_id: Option<String>,
    pub title_contains: Option<String>,
}

/// Completion predicate for todo listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoStatus {
    Completed,
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_scope_parse() {
        assert_eq!(FolderScope::parse(None), None);
        assert_eq!(FolderScope::parse(Some("")), None);
        assert_eq!(FolderScope::parse(Some("  ")), None);
        assert_eq!(FolderScope::parse(Some("none")), Some(FolderScope::Unfiled));
        assert_eq!(
            FolderScope::parse(Some("abc-123")),
            Some(FolderScope::In("abc-123".to_string()))
        );
    }
}
