//! User repository operations
//!
//! Account rows fold their credential columns into the [`Credential`]
//! enum; see `models.rs`. Account deletion cascades to everything the
//! user owns, in one transaction.

use super::models::{Credential, User};
use super::Repository;
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

impl Repository {
    /// Insert a new user with the given credential.
    ///
    /// Uniqueness of email, name and (provider, uid) is checked here so
    /// violations surface as field-scoped validation errors instead of
    /// raw constraint failures.
    pub async fn create_user(&self, email: &str, name: &str, credential: Credential) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
                .bind(email)
                .fetch_one(&mut *tx)
                .await?;
        if email_taken {
            return Err(AppError::validation("email", "has already been taken"));
        }

        let name_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE name = ?)")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if name_taken {
            return Err(AppError::validation("name", "has already been taken"));
        }

        let (provider, uid, password_digest) = match &credential {
            Credential::External { provider, uid } => {
                let identity_taken: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE provider = ? AND uid = ?)",
                )
                .bind(provider)
                .bind(uid)
                .fetch_one(&mut *tx)
                .await?;
                if identity_taken {
                    return Err(AppError::validation("uid", "has already been taken"));
                }
                (Some(provider.as_str()), Some(uid.as_str()), None)
            }
            Credential::Local { password_digest } => (None, None, Some(password_digest.as_str())),
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, provider, uid, email, name, password_digest,
                               notes_count, todos_count, todo_lists_count,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(provider)
        .bind(uid)
        .bind(email)
        .bind(name)
        .bind(password_digest)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Created user: {}", id);
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_user_by_identity(&self, provider: &str, uid: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE provider = ? AND uid = ?")
            .bind(provider)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Delete a user and everything they own.
    ///
    /// Notes and their tag links go first, then folders (parent links
    /// are nulled out beforehand so the self-referencing foreign key
    /// never sees a dangling child mid-delete), then todos, lists and
    /// tags, and finally the account row itself.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM note_tag_links WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM notes WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE folders SET parent_id = NULL WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM folders WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM todos WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM todo_lists WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tags WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("User"));
        }

        tx.commit().await?;

        tracing::debug!("Deleted user and owned records: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    #[tokio::test]
    async fn test_create_local_user() {
        let repo = create_test_repo().await;

        let user = repo
            .create_user(
                "ada@example.com",
                "ada",
                Credential::Local {
                    password_digest: "$argon2id$stub".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_external());
        assert_eq!(user.notes_count, 0);

        let fetched = repo.get_user(&user.id).await.unwrap();
        assert_eq!(fetched.credential, user.credential);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = create_test_repo().await;

        let credential = Credential::Local {
            password_digest: "$argon2id$stub".to_string(),
        };

        repo.create_user("dup@example.com", "first", credential.clone())
            .await
            .unwrap();

        let err = repo
            .create_user("dup@example.com", "second", credential)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_find_by_identity() {
        let repo = create_test_repo().await;

        let user = repo
            .create_user(
                "ext@example.com",
                "ext",
                Credential::External {
                    provider: "github".to_string(),
                    uid: "12345".to_string(),
                },
            )
            .await
            .unwrap();

        let found = repo
            .find_user_by_identity("github", "12345")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);

        let missing = repo.find_user_by_identity("github", "99999").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let repo = create_test_repo().await;

        let err = repo.delete_user("no-such-id").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
