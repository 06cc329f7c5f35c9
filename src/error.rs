//! Error types for the notekeep data core
//!
//! All errors use thiserror for structured error handling.
//! Storage-engine errors are translated at the repository boundary;
//! callers only ever see the taxonomy below.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Field-scoped validation failure, surfaced as form feedback.
    #[error("{field} {message}")]
    Validation { field: String, message: String },

    /// The id does not exist within the current user's scope.
    #[error("{0} not found")]
    NotFound(String),

    /// The (note, tag) pair is already linked.
    #[error("Tag link already exists")]
    DuplicateLink,

    /// A cached counter disagrees with the live row count.
    #[error("Counter drift on {counter}: cached {cached}, live {live}")]
    Consistency {
        counter: String,
        cached: i64,
        live: i64,
    },
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(entity.to_string())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_serialize_to_display_string() {
        let err = AppError::validation("name", "can't be blank");

        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"name can't be blank\""
        );

        let drift = AppError::Consistency {
            counter: "folders.children_count".to_string(),
            cached: 3,
            live: 2,
        };

        assert_eq!(
            serde_json::to_string(&drift).unwrap(),
            "\"Counter drift on folders.children_count: cached 3, live 2\""
        );
    }
}
