//! Note repository operations
//!
//! Covers the note lifecycle (with the folder/user counter choreography)
//! and the filter engine: conjunctive folder/tag/title predicates over
//! the user-scoped collection, most-recent-first.

use super::models::{CreateNoteRequest, FolderScope, Note, NoteFilter, UpdateNoteRequest};
use super::Repository;
use crate::config::MAX_NOTE_TITLE_LENGTH;
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::validation("title", "can't be blank"));
    }
    if title.chars().count() > MAX_NOTE_TITLE_LENGTH {
        return Err(AppError::validation("title", "is too long"));
    }
    Ok(title)
}

impl Repository {
    /// Create a note, bumping the owner's and folder's note counters in
    /// the same transaction.
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let title = validate_title(&req.title)?;

        let mut tx = self.pool.begin().await?;

        if let Some(folder_id) = &req.folder_id {
            let folder_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM folders WHERE id = ? AND user_id = ?)",
            )
            .bind(folder_id)
            .bind(&req.user_id)
            .fetch_one(&mut *tx)
            .await?;

            if !folder_exists {
                return Err(AppError::not_found("Folder"));
            }
        }

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, title, content, folder_id, user_id, tags_count,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&title)
        .bind(&req.content)
        .bind(req.folder_id.as_deref())
        .bind(&req.user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET notes_count = notes_count + 1 WHERE id = ?")
            .bind(&req.user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(folder_id) = &req.folder_id {
            sqlx::query("UPDATE folders SET notes_count = notes_count + 1 WHERE id = ?")
                .bind(folder_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!("Created note: {}", id);
        Ok(note)
    }

    /// Get a note by ID, scoped to the user
    pub async fn get_note(&self, user_id: &str, id: &str) -> Result<Note> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Note"))
    }

    /// List the user's notes, narrowed by the filter's predicates.
    ///
    /// Predicates apply conjunctively; blank ones pass through. A folder
    /// or tag id that doesn't exist for this user is a `NotFound`, not a
    /// silently empty result. Ordering is always most-recent-first.
    pub async fn list_notes(&self, user_id: &str, filter: &NoteFilter) -> Result<Vec<Note>> {
        let tag_id = filter
            .tag_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let title_query = filter
            .title_contains
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        // Predicate ids are validated up front so an out-of-scope id
        // surfaces instead of matching nothing.
        if let Some(FolderScope::In(folder_id)) = &filter.folder {
            self.get_folder(user_id, folder_id).await?;
        }
        if let Some(tag_id) = tag_id {
            self.get_tag(user_id, tag_id).await?;
        }

        let mut sql = String::from("SELECT * FROM notes WHERE user_id = ?");
        let mut binds: Vec<String> = vec![user_id.to_string()];

        match &filter.folder {
            Some(FolderScope::Unfiled) => sql.push_str(" AND folder_id IS NULL"),
            Some(FolderScope::In(folder_id)) => {
                sql.push_str(" AND folder_id = ?");
                binds.push(folder_id.clone());
            }
            None => {}
        }

        if let Some(tag_id) = tag_id {
            sql.push_str(
                " AND EXISTS(SELECT 1 FROM note_tag_links WHERE note_id = notes.id AND tag_id = ?)",
            );
            binds.push(tag_id.to_string());
        }

        if let Some(query) = title_query {
            sql.push_str(" AND title LIKE ?");
            binds.push(format!("%{}%", query));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut q = sqlx::query_as::<_, Note>(&sql);
        for bind in &binds {
            q = q.bind(bind);
        }

        let notes = q.fetch_all(&self.pool).await?;
        Ok(notes)
    }

    /// Update a note's title, content and/or folder.
    ///
    /// A folder move decrements the old folder's `notes_count` and
    /// increments the new one's in the same transaction as the
    /// `folder_id` change; there is no intermediate state where both
    /// folders claim the note or neither does.
    pub async fn update_note(&self, user_id: &str, req: UpdateNoteRequest) -> Result<Note> {
        let existing = self.get_note(user_id, &req.id).await?;

        let title = match &req.title {
            Some(title) => validate_title(title)?,
            None => existing.title.clone(),
        };
        let content = req.content.clone().unwrap_or_else(|| existing.content.clone());
        let new_folder_id = match &req.folder_id {
            Some(folder) => folder.clone(),
            None => existing.folder_id.clone(),
        };

        let mut tx = self.pool.begin().await?;

        if new_folder_id != existing.folder_id {
            if let Some(folder_id) = &new_folder_id {
                let folder_exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM folders WHERE id = ? AND user_id = ?)",
                )
                .bind(folder_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

                if !folder_exists {
                    return Err(AppError::not_found("Folder"));
                }
            }
        }

        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes SET title = ?, content = ?, folder_id = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&content)
        .bind(new_folder_id.as_deref())
        .bind(Utc::now())
        .bind(&existing.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if new_folder_id != existing.folder_id {
            if let Some(old_folder) = &existing.folder_id {
                sqlx::query("UPDATE folders SET notes_count = notes_count - 1 WHERE id = ?")
                    .bind(old_folder)
                    .execute(&mut *tx)
                    .await?;
            }
            if let Some(new_folder) = &new_folder_id {
                sqlx::query("UPDATE folders SET notes_count = notes_count + 1 WHERE id = ?")
                    .bind(new_folder)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::debug!("Updated note: {}", note.id);
        Ok(note)
    }

    /// Delete a note, its tag links, and every counter they feed.
    pub async fn delete_note(&self, user_id: &str, id: &str) -> Result<()> {
        let note = self.get_note(user_id, id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE tags SET notes_count = notes_count - 1
            WHERE id IN (SELECT tag_id FROM note_tag_links WHERE note_id = ?)
            "#,
        )
        .bind(&note.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM note_tag_links WHERE note_id = ?")
            .bind(&note.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET notes_count = notes_count - 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(folder_id) = &note.folder_id {
            sqlx::query("UPDATE folders SET notes_count = notes_count - 1 WHERE id = ?")
                .bind(folder_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(&note.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted note: {}", note.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{CreateFolderRequest, Credential};
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> (Repository, String) {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let user = repo
            .create_user(
                "notes@example.com",
                "notes",
                Credential::Local {
                    password_digest: "$argon2id$stub".to_string(),
                },
            )
            .await
            .unwrap();

        (repo, user.id)
    }

    async fn create_note(
        repo: &Repository,
        user_id: &str,
        title: &str,
        folder_id: Option<&str>,
    ) -> Note {
        repo.create_note(CreateNoteRequest {
            user_id: user_id.to_string(),
            title: title.to_string(),
            content: String::new(),
            folder_id: folder_id.map(str::to_string),
        })
        .await
        .unwrap()
    }

    async fn create_folder(repo: &Repository, user_id: &str, name: &str) -> String {
        repo.create_folder(CreateFolderRequest {
            user_id: user_id.to_string(),
            name: name.to_string(),
            parent_id: None,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_create_updates_counters() {
        let (repo, user) = create_test_repo().await;
        let folder = create_folder(&repo, &user, "inbox").await;

        create_note(&repo, &user, "filed", Some(&folder)).await;
        create_note(&repo, &user, "loose", None).await;

        let owner = repo.get_user(&user).await.unwrap();
        assert_eq!(owner.notes_count, 2);

        let folder = repo.get_folder(&user, &folder).await.unwrap();
        assert_eq!(folder.notes_count, 1);
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let (repo, user) = create_test_repo().await;

        let err = repo
            .create_note(CreateNoteRequest {
                user_id: user.clone(),
                title: "   ".to_string(),
                content: String::new(),
                folder_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "title"));
    }

    #[tokio::test]
    async fn test_overlong_title_rejected() {
        let (repo, user) = create_test_repo().await;

        let err = repo
            .create_note(CreateNoteRequest {
                user_id: user.clone(),
                title: "x".repeat(MAX_NOTE_TITLE_LENGTH + 1),
                content: String::new(),
                folder_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "title"));
    }

    #[tokio::test]
    async fn test_filter_by_folder_and_unfiled() {
        let (repo, user) = create_test_repo().await;
        let work = create_folder(&repo, &user, "Work").await;
        let personal = create_folder(&repo, &user, "Personal").await;

        let a = create_note(&repo, &user, "A", Some(&work)).await;
        create_note(&repo, &user, "B", Some(&personal)).await;
        let c = create_note(&repo, &user, "C", None).await;

        let unfiled = repo
            .list_notes(
                &user,
                &NoteFilter {
                    folder: Some(FolderScope::Unfiled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unfiled.len(), 1);
        assert_eq!(unfiled[0].id, c.id);

        let in_work = repo
            .list_notes(
                &user,
                &NoteFilter {
                    folder: Some(FolderScope::In(work.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(in_work.len(), 1);
        assert_eq!(in_work[0].id, a.id);
    }

    #[tokio::test]
    async fn test_filter_folder_and_tag_intersect() {
        let (repo, user) = create_test_repo().await;
        let work = create_folder(&repo, &user, "Work").await;

        let tagged_in_work = create_note(&repo, &user, "tagged in work", Some(&work)).await;
        let untagged_in_work = create_note(&repo, &user, "untagged in work", Some(&work)).await;
        let tagged_loose = create_note(&repo, &user, "tagged loose", None).await;

        let tag = repo.create_tag(&user, "urgent").await.unwrap();
        repo.link_note_tag(&user, &tagged_in_work.id, &tag.id)
            .await
            .unwrap();
        repo.link_note_tag(&user, &tagged_loose.id, &tag.id)
            .await
            .unwrap();

        let both = repo
            .list_notes(
                &user,
                &NoteFilter {
                    folder: Some(FolderScope::In(work.clone())),
                    tag_id: Some(tag.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, tagged_in_work.id);
        assert_ne!(both[0].id, untagged_in_work.id);
    }

    #[tokio::test]
    async fn test_filter_title_substring() {
        let (repo, user) = create_test_repo().await;

        create_note(&repo, &user, "Meeting agenda", None).await;
        create_note(&repo, &user, "Groceries", None).await;

        let hits = repo
            .list_notes(
                &user,
                &NoteFilter {
                    title_contains: Some("eeting".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Meeting agenda");
    }

    #[tokio::test]
    async fn test_blank_predicates_pass_through() {
        let (repo, user) = create_test_repo().await;

        create_note(&repo, &user, "one", None).await;
        create_note(&repo, &user, "two", None).await;

        let all = repo
            .list_notes(
                &user,
                &NoteFilter {
                    folder: None,
                    tag_id: Some("  ".to_string()),
                    title_contains: Some(String::new()),
                },
            )
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_unknown_ids_surface_not_found() {
        let (repo, user) = create_test_repo().await;

        let err = repo
            .list_notes(
                &user,
                &NoteFilter {
                    folder: Some(FolderScope::In("missing".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = repo
            .list_notes(
                &user,
                &NoteFilter {
                    tag_id: Some("missing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_move_between_folders_swaps_counters() {
        let (repo, user) = create_test_repo().await;
        let from = create_folder(&repo, &user, "from").await;
        let to = create_folder(&repo, &user, "to").await;

        let note = create_note(&repo, &user, "mover", Some(&from)).await;

        assert_eq!(repo.get_folder(&user, &from).await.unwrap().notes_count, 1);
        assert_eq!(repo.get_folder(&user, &to).await.unwrap().notes_count, 0);

        repo.update_note(
            &user,
            UpdateNoteRequest {
                id: note.id.clone(),
                title: None,
                content: None,
                folder_id: Some(Some(to.clone())),
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.get_folder(&user, &from).await.unwrap().notes_count, 0);
        assert_eq!(repo.get_folder(&user, &to).await.unwrap().notes_count, 1);
    }

    #[tokio::test]
    async fn test_delete_note_fixes_counters_and_links() {
        let (repo, user) = create_test_repo().await;
        let folder = create_folder(&repo, &user, "docs").await;
        let note = create_note(&repo, &user, "doomed", Some(&folder)).await;

        let tag = repo.create_tag(&user, "keep").await.unwrap();
        repo.link_note_tag(&user, &note.id, &tag.id).await.unwrap();

        repo.delete_note(&user, &note.id).await.unwrap();

        assert_eq!(repo.get_user(&user).await.unwrap().notes_count, 0);
        assert_eq!(repo.get_folder(&user, &folder).await.unwrap().notes_count, 0);
        assert_eq!(repo.get_tag(&user, &tag.id).await.unwrap().notes_count, 0);
    }
}
