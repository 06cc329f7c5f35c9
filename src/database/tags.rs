//! Tag repository operations
//!
//! Tags and the note/tag association ledger. Linking and unlinking
//! always move `tag.notes_count` and `note.tags_count` together in one
//! transaction, so the two counters can never drift apart under a
//! partial failure.

use super::models::{Note, NoteTagLink, Tag};
use super::Repository;
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

impl Repository {
    /// Create a tag; names are unique per user.
    pub async fn create_tag(&self, user_id: &str, name: &str) -> Result<Tag> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "can't be blank"));
        }

        let mut tx = self.pool.begin().await?;

        let name_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE user_id = ? AND name = ?)",
        )
        .bind(user_id)
        .bind(&name)
        .fetch_one(&mut *tx)
        .await?;

        if name_taken {
            return Err(AppError::validation("name", "has already been taken"));
        }

        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (id, name, user_id, notes_count, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Created tag: {}", id);
        Ok(tag)
    }

    /// Get a tag by ID, scoped to the user
    pub async fn get_tag(&self, user_id: &str, id: &str) -> Result<Tag> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Tag"))
    }

    /// All of a user's tags, ordered by name
    pub async fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE user_id = ? ORDER BY name ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tags)
    }

    /// Rename a tag
    pub async fn rename_tag(&self, user_id: &str, id: &str, name: &str) -> Result<Tag> {
        let existing = self.get_tag(user_id, id).await?;

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "can't be blank"));
        }

        let name_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE user_id = ? AND name = ? AND id != ?)",
        )
        .bind(user_id)
        .bind(&name)
        .bind(&existing.id)
        .fetch_one(&self.pool)
        .await?;

        if name_taken {
            return Err(AppError::validation("name", "has already been taken"));
        }

        let tag = sqlx::query_as::<_, Tag>(
            "UPDATE tags SET name = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&name)
        .bind(Utc::now())
        .bind(&existing.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Renamed tag: {}", tag.id);
        Ok(tag)
    }

    /// Delete a tag and its links, restoring each linked note's
    /// `tags_count` in the same transaction.
    pub async fn delete_tag(&self, user_id: &str, id: &str) -> Result<()> {
        let tag = self.get_tag(user_id, id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE notes SET tags_count = tags_count - 1
            WHERE id IN (SELECT note_id FROM note_tag_links WHERE tag_id = ?)
            "#,
        )
        .bind(&tag.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM note_tag_links WHERE tag_id = ?")
            .bind(&tag.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(&tag.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted tag: {}", tag.id);
        Ok(())
    }

    /// Link a note to a tag.
    ///
    /// The link row's `user_id` is defaulted from the tag. Both cached
    /// counters move in the transaction that inserts the row; a second
    /// link of the same pair is a `DuplicateLink` error.
    pub async fn link_note_tag(&self, user_id: &str, note_id: &str, tag_id: &str) -> Result<NoteTagLink> {
        let note = self.get_note(user_id, note_id).await?;
        let tag = self.get_tag(user_id, tag_id).await?;

        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM note_tag_links WHERE note_id = ? AND tag_id = ?)",
        )
        .bind(&note.id)
        .bind(&tag.id)
        .fetch_one(&mut *tx)
        .await?;

        if exists {
            return Err(AppError::DuplicateLink);
        }

        let link = sqlx::query_as::<_, NoteTagLink>(
            r#"
            INSERT INTO note_tag_links (id, note_id, tag_id, user_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&note.id)
        .bind(&tag.id)
        .bind(&tag.user_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE tags SET notes_count = notes_count + 1 WHERE id = ?")
            .bind(&tag.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE notes SET tags_count = tags_count + 1 WHERE id = ?")
            .bind(&note.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Linked note {} to tag {}", note.id, tag.id);
        Ok(link)
    }

    /// Remove a link by its id, decrementing both counters symmetrically.
    pub async fn unlink_note_tag(&self, user_id: &str, link_id: &str) -> Result<()> {
        let link = sqlx::query_as::<_, NoteTagLink>(
            "SELECT * FROM note_tag_links WHERE id = ? AND user_id = ?",
        )
        .bind(link_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Tag link"))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM note_tag_links WHERE id = ?")
            .bind(&link.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE tags SET notes_count = notes_count - 1 WHERE id = ?")
            .bind(&link.tag_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE notes SET tags_count = tags_count - 1 WHERE id = ?")
            .bind(&link.note_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Unlinked note {} from tag {}", link.note_id, link.tag_id);
        Ok(())
    }

    /// Links on a note, oldest first
    pub async fn list_note_tag_links(&self, user_id: &str, note_id: &str) -> Result<Vec<NoteTagLink>> {
        let links = sqlx::query_as::<_, NoteTagLink>(
            r#"
            SELECT * FROM note_tag_links WHERE note_id = ? AND user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(note_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    /// Notes linked to a tag, most recent first
    pub async fn notes_for_tag(&self, user_id: &str, tag_id: &str) -> Result<Vec<Note>> {
        let tag = self.get_tag(user_id, tag_id).await?;

        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT n.* FROM notes n
            JOIN note_tag_links l ON l.note_id = n.id
            WHERE l.tag_id = ?
            ORDER BY n.created_at DESC, n.rowid DESC
            "#,
        )
        .bind(&tag.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// The next rung down the popularity ranking: among the user's
    /// other tags, the one with the highest note count strictly below
    /// this tag's. `None` when this tag is already at the bottom.
    pub async fn find_next_popular_tag(&self, user_id: &str, tag_id: &str) -> Result<Option<Tag>> {
        let tag = self.get_tag(user_id, tag_id).await?;

        let next = sqlx::query_as::<_, Tag>(
            r#"
            SELECT * FROM tags
            WHERE user_id = ? AND id != ? AND notes_count < ?
            ORDER BY notes_count DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(&tag.id)
        .bind(tag.notes_count)
        .fetch_optional(&self.pool)
        .await?;

        Ok(next)
    }
}
