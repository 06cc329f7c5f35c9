//! Folder repository operations
//!
//! Folders form a same-table tree through `parent_id`. Structural
//! queries (ancestors, descendants, depth, path) re-derive from rows on
//! every call; nothing about the tree shape is cached except the
//! `children_count` and `notes_count` columns, which every mutation
//! here keeps exact within its own transaction.

use super::models::{CreateFolderRequest, Folder, UpdateFolderRequest};
use super::Repository;
use crate::config::MAX_FOLDER_DEPTH;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::sqlite::Sqlite;
use std::collections::HashSet;
use uuid::Uuid;

/// Transitive subtree of a folder, root id included, via the parent links.
const SUBTREE_SQL: &str = r#"
    WITH RECURSIVE subtree (id) AS (
        SELECT id FROM folders WHERE id = ?
        UNION ALL
        SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
    )
    SELECT id FROM subtree
"#;

fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 3);
    for i in 0..n {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

impl Repository {
    /// Create a folder, bumping the parent's `children_count` in the
    /// same transaction.
    pub async fn create_folder(&self, req: CreateFolderRequest) -> Result<Folder> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "can't be blank"));
        }

        if let Some(parent_id) = &req.parent_id {
            let parent = self.get_folder(&req.user_id, parent_id).await?;
            let parent_depth = self.folder_ancestors(&req.user_id, &parent.id).await?.len();
            if parent_depth + 1 > MAX_FOLDER_DEPTH {
                return Err(AppError::validation("parent_id", "is nested too deeply"));
            }
        }

        let mut tx = self.pool.begin().await?;

        // SQLite UNIQUE indexes treat NULLs as distinct, so uniqueness
        // among root folders has to be checked here.
        let name_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folders WHERE user_id = ? AND parent_id IS ? AND name = ?)",
        )
        .bind(&req.user_id)
        .bind(req.parent_id.as_deref())
        .bind(&name)
        .fetch_one(&mut *tx)
        .await?;

        if name_taken {
            return Err(AppError::validation("name", "has already been taken"));
        }

        let folder = sqlx::query_as::<_, Folder>(
            r#"
            INSERT INTO folders (id, name, parent_id, user_id, notes_count, children_count,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&name)
        .bind(req.parent_id.as_deref())
        .bind(&req.user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(parent_id) = &req.parent_id {
            sqlx::query("UPDATE folders SET children_count = children_count + 1 WHERE id = ?")
                .bind(parent_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!("Created folder: {}", id);
        Ok(folder)
    }

    /// Get a folder by ID, scoped to the user
    pub async fn get_folder(&self, user_id: &str, id: &str) -> Result<Folder> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Folder"))
    }

    /// All of a user's folders, ordered by name
    pub async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE user_id = ? ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    /// Folders with no parent, ordered by name
    pub async fn list_root_folders(&self, user_id: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE user_id = ? AND parent_id IS NULL ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    /// Direct children of a folder, ordered by name
    pub async fn list_children(&self, user_id: &str, folder_id: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE user_id = ? AND parent_id = ? ORDER BY name ASC",
        )
        .bind(user_id)
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    /// Rename and/or re-parent a folder.
    ///
    /// Re-parenting is validated against self-parenting and circular
    /// references before anything changes; the old and new parents'
    /// `children_count` move together with the row update.
    pub async fn update_folder(&self, user_id: &str, req: UpdateFolderRequest) -> Result<Folder> {
        let existing = self.get_folder(user_id, &req.id).await?;

        let name = match &req.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppError::validation("name", "can't be blank"));
                }
                name
            }
            None => existing.name.clone(),
        };

        let new_parent_id = match &req.parent_id {
            Some(parent) => parent.clone(),
            None => existing.parent_id.clone(),
        };

        if let Some(parent_id) = &new_parent_id {
            if parent_id == &existing.id {
                return Err(AppError::validation(
                    "parent_id",
                    "cannot be the same as the folder itself",
                ));
            }

            // Walk the candidate parent's ancestor chain; reaching this
            // folder's own id means the assignment would close a cycle.
            let parent = self.get_folder(user_id, parent_id).await?;
            let mut seen = HashSet::new();
            let mut parent_depth = 0;
            let mut current = parent.parent_id.clone();
            while let Some(ancestor_id) = current {
                if ancestor_id == existing.id {
                    return Err(AppError::validation(
                        "parent_id",
                        "cannot create circular reference",
                    ));
                }
                if !seen.insert(ancestor_id.clone()) {
                    return Err(AppError::validation("parent_id", "circular reference detected"));
                }
                parent_depth += 1;
                current = self.get_folder(user_id, &ancestor_id).await?.parent_id;
            }

            if parent_depth + 1 > MAX_FOLDER_DEPTH {
                return Err(AppError::validation("parent_id", "is nested too deeply"));
            }
        }

        let mut tx = self.pool.begin().await?;

        let name_taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM folders
                WHERE user_id = ? AND parent_id IS ? AND name = ? AND id != ?
            )
            "#,
        )
        .bind(user_id)
        .bind(new_parent_id.as_deref())
        .bind(&name)
        .bind(&existing.id)
        .fetch_one(&mut *tx)
        .await?;

        if name_taken {
            return Err(AppError::validation("name", "has already been taken"));
        }

        let folder = sqlx::query_as::<_, Folder>(
            r#"
            UPDATE folders SET name = ?, parent_id = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(new_parent_id.as_deref())
        .bind(Utc::now())
        .bind(&existing.id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing.parent_id != new_parent_id {
            if let Some(old_parent) = &existing.parent_id {
                sqlx::query("UPDATE folders SET children_count = children_count - 1 WHERE id = ?")
                    .bind(old_parent)
                    .execute(&mut *tx)
                    .await?;
            }
            if let Some(new_parent) = &new_parent_id {
                sqlx::query("UPDATE folders SET children_count = children_count + 1 WHERE id = ?")
                    .bind(new_parent)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::debug!("Updated folder: {}", folder.id);
        Ok(folder)
    }

    /// Destroy a folder, its descendant folders, and every note inside
    /// the destroyed subtree, adjusting all affected counters in the
    /// same transaction.
    pub async fn delete_folder(&self, user_id: &str, id: &str) -> Result<()> {
        let folder = self.get_folder(user_id, id).await?;

        let mut tx = self.pool.begin().await?;

        let subtree: Vec<String> = sqlx::query_scalar(SUBTREE_SQL)
            .bind(&folder.id)
            .fetch_all(&mut *tx)
            .await?;

        let marks = placeholders(subtree.len());

        // Tag counters for links on notes about to disappear.
        let tag_sql = format!(
            r#"
            UPDATE tags SET notes_count = notes_count - (
                SELECT COUNT(*) FROM note_tag_links l
                JOIN notes n ON n.id = l.note_id
                WHERE l.tag_id = tags.id AND n.folder_id IN ({marks})
            )
            WHERE id IN (
                SELECT DISTINCT l.tag_id FROM note_tag_links l
                JOIN notes n ON n.id = l.note_id
                WHERE n.folder_id IN ({marks})
            )
            "#
        );
        let mut q = sqlx::query::<Sqlite>(&tag_sql);
        for folder_id in subtree.iter().chain(subtree.iter()) {
            q = q.bind(folder_id);
        }
        q.execute(&mut *tx).await?;

        let link_sql = format!(
            "DELETE FROM note_tag_links WHERE note_id IN (SELECT id FROM notes WHERE folder_id IN ({marks}))"
        );
        let mut q = sqlx::query::<Sqlite>(&link_sql);
        for folder_id in &subtree {
            q = q.bind(folder_id);
        }
        q.execute(&mut *tx).await?;

        let note_sql = format!("DELETE FROM notes WHERE folder_id IN ({marks})");
        let mut q = sqlx::query::<Sqlite>(&note_sql);
        for folder_id in &subtree {
            q = q.bind(folder_id);
        }
        let notes_deleted = q.execute(&mut *tx).await?.rows_affected() as i64;

        sqlx::query("UPDATE users SET notes_count = notes_count - ? WHERE id = ?")
            .bind(notes_deleted)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(parent_id) = &folder.parent_id {
            sqlx::query("UPDATE folders SET children_count = children_count - 1 WHERE id = ?")
                .bind(parent_id)
                .execute(&mut *tx)
                .await?;
        }

        // Null the parent links first so the self-referencing foreign
        // key never sees a child outliving its parent mid-delete.
        let unlink_sql = format!("UPDATE folders SET parent_id = NULL WHERE id IN ({marks})");
        let mut q = sqlx::query::<Sqlite>(&unlink_sql);
        for folder_id in &subtree {
            q = q.bind(folder_id);
        }
        q.execute(&mut *tx).await?;

        let folder_sql = format!("DELETE FROM folders WHERE id IN ({marks})");
        let mut q = sqlx::query::<Sqlite>(&folder_sql);
        for folder_id in &subtree {
            q = q.bind(folder_id);
        }
        q.execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::debug!(
            "Deleted folder {} ({} folders, {} notes)",
            folder.id,
            subtree.len(),
            notes_deleted
        );
        Ok(())
    }

    /// Ancestors of a folder, nearest-first; empty for a root folder.
    pub async fn folder_ancestors(&self, user_id: &str, id: &str) -> Result<Vec<Folder>> {
        let folder = self.get_folder(user_id, id).await?;

        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        let mut current = folder.parent_id;
        while let Some(parent_id) = current {
            // Depth is bounded at write time, so revisiting an id is the
            // only way this walk could fail to terminate.
            if !seen.insert(parent_id.clone()) {
                return Err(AppError::validation("parent_id", "circular reference detected"));
            }
            let parent = self.get_folder(user_id, &parent_id).await?;
            current = parent.parent_id.clone();
            ancestors.push(parent);
        }

        Ok(ancestors)
    }

    /// All transitive children of a folder. Order is not meaningful.
    pub async fn folder_descendants(&self, user_id: &str, id: &str) -> Result<Vec<Folder>> {
        // Scope check before exposing structure.
        self.get_folder(user_id, id).await?;

        let folders = sqlx::query_as::<_, Folder>(
            r#"
            WITH RECURSIVE subtree (id) AS (
                SELECT id FROM folders WHERE id = ?
                UNION ALL
                SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
            )
            SELECT * FROM folders WHERE id IN (SELECT id FROM subtree) AND id != ?
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(folders)
    }

    /// `"Documents/Work/Projects"`-style path from the root to this folder.
    pub async fn folder_full_path(&self, user_id: &str, id: &str) -> Result<String> {
        let folder = self.get_folder(user_id, id).await?;
        let ancestors = self.folder_ancestors(user_id, id).await?;

        let mut segments: Vec<&str> = ancestors.iter().rev().map(|f| f.name.as_str()).collect();
        segments.push(&folder.name);

        Ok(segments.join("/"))
    }

    /// 0 for a root folder, parent depth + 1 otherwise.
    pub async fn folder_depth(&self, user_id: &str, id: &str) -> Result<usize> {
        Ok(self.folder_ancestors(user_id, id).await?.len())
    }

    /// The folder immediately after this one among its siblings (same
    /// parent, or all roots), in creation order; `None` if it is last.
    pub async fn folder_next_sibling(&self, user_id: &str, id: &str) -> Result<Option<Folder>> {
        let folder = self.get_folder(user_id, id).await?;

        let siblings = sqlx::query_as::<_, Folder>(
            r#"
            SELECT * FROM folders WHERE user_id = ? AND parent_id IS ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_id)
        .bind(folder.parent_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let position = siblings.iter().position(|f| f.id == folder.id);
        let next = position.and_then(|i| siblings.into_iter().nth(i + 1));

        Ok(next)
    }
}
