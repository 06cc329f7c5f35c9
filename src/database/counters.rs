//! Cached-counter reconciliation
//!
//! Every mutation in the sibling modules keeps the cached counters
//! exact, so these operations exist for backfill and repair: recompute
//! each counter from a live COUNT over its owning relation and compare
//! with (or overwrite) the cached value. Drift is never ignored; it is
//! either reported as a `Consistency` error or repaired and logged.

use super::Repository;
use crate::error::{AppError, Result};
use serde::Serialize;

/// A cached counter that disagreed with its live count.
#[derive(Debug, Clone, Serialize)]
pub struct CounterDrift {
    /// Which counter, e.g. `folder.children_count`
    pub counter: String,
    /// Id of the row owning the cached column
    pub owner_id: String,
    pub cached: i64,
    pub live: i64,
}

/// (counter name, drift-detection SQL) per cached column. Each query
/// yields (owner_id, cached, live) rows and takes the user id once.
const DRIFT_QUERIES: &[(&str, &str)] = &[
    (
        "user.notes_count",
        r#"
        SELECT id, notes_count,
               (SELECT COUNT(*) FROM notes WHERE notes.user_id = users.id)
        FROM users WHERE id = ?
        "#,
    ),
    (
        "user.todos_count",
        r#"
        SELECT id, todos_count,
               (SELECT COUNT(*) FROM todos WHERE todos.user_id = users.id)
        FROM users WHERE id = ?
        "#,
    ),
    (
        "user.todo_lists_count",
        r#"
        SELECT id, todo_lists_count,
               (SELECT COUNT(*) FROM todo_lists WHERE todo_lists.user_id = users.id)
        FROM users WHERE id = ?
        "#,
    ),
    (
        "folder.notes_count",
        r#"
        SELECT id, notes_count,
               (SELECT COUNT(*) FROM notes WHERE notes.folder_id = folders.id)
        FROM folders WHERE user_id = ?
        "#,
    ),
    (
        "folder.children_count",
        r#"
        SELECT id, children_count,
               (SELECT COUNT(*) FROM folders AS children WHERE children.parent_id = folders.id)
        FROM folders WHERE user_id = ?
        "#,
    ),
    (
        "tag.notes_count",
        r#"
        SELECT id, notes_count,
               (SELECT COUNT(*) FROM note_tag_links WHERE note_tag_links.tag_id = tags.id)
        FROM tags WHERE user_id = ?
        "#,
    ),
    (
        "note.tags_count",
        r#"
        SELECT id, tags_count,
               (SELECT COUNT(*) FROM note_tag_links WHERE note_tag_links.note_id = notes.id)
        FROM notes WHERE user_id = ?
        "#,
    ),
];

/// (cached column recount SQL) applied wholesale during repair.
const RECOUNT_STATEMENTS: &[&str] = &[
    r#"
    UPDATE users SET notes_count =
        (SELECT COUNT(*) FROM notes WHERE notes.user_id = users.id)
    WHERE id = ?
    "#,
    r#"
    UPDATE users SET todos_count =
        (SELECT COUNT(*) FROM todos WHERE todos.user_id = users.id)
    WHERE id = ?
    "#,
    r#"
    UPDATE users SET todo_lists_count =
        (SELECT COUNT(*) FROM todo_lists WHERE todo_lists.user_id = users.id)
    WHERE id = ?
    "#,
    r#"
    UPDATE folders SET notes_count =
        (SELECT COUNT(*) FROM notes WHERE notes.folder_id = folders.id)
    WHERE user_id = ?
    "#,
    r#"
    UPDATE folders SET children_count =
        (SELECT COUNT(*) FROM folders AS children WHERE children.parent_id = folders.id)
    WHERE user_id = ?
    "#,
    r#"
    UPDATE tags SET notes_count =
        (SELECT COUNT(*) FROM note_tag_links WHERE note_tag_links.tag_id = tags.id)
    WHERE user_id = ?
    "#,
    r#"
    UPDATE notes SET tags_count =
        (SELECT COUNT(*) FROM note_tag_links WHERE note_tag_links.note_id = notes.id)
    WHERE user_id = ?
    "#,
];

impl Repository {
    async fn collect_counter_drift(&self, user_id: &str) -> Result<Vec<CounterDrift>> {
        let mut drift = Vec::new();

        for (counter, sql) in DRIFT_QUERIES {
            let rows: Vec<(String, i64, i64)> = sqlx::query_as(sql)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

            for (owner_id, cached, live) in rows {
                if cached != live {
                    drift.push(CounterDrift {
                        counter: counter.to_string(),
                        owner_id,
                        cached,
                        live,
                    });
                }
            }
        }

        Ok(drift)
    }

    /// Check every cached counter the user owns against its live count.
    /// The first disagreement surfaces as a `Consistency` error.
    pub async fn verify_user_counters(&self, user_id: &str) -> Result<()> {
        self.get_user(user_id).await?;

        let drift = self.collect_counter_drift(user_id).await?;

        match drift.into_iter().next() {
            None => Ok(()),
            Some(d) => Err(AppError::Consistency {
                counter: format!("{} ({})", d.counter, d.owner_id),
                cached: d.cached,
                live: d.live,
            }),
        }
    }

    /// Recompute every cached counter the user owns from live rows and
    /// overwrite the cached values. Returns the drift that was repaired;
    /// empty means everything already agreed.
    pub async fn recount_user_counters(&self, user_id: &str) -> Result<Vec<CounterDrift>> {
        self.get_user(user_id).await?;

        let drift = self.collect_counter_drift(user_id).await?;

        let mut tx = self.pool.begin().await?;
        for sql in RECOUNT_STATEMENTS {
            sqlx::query(sql).bind(user_id).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        for d in &drift {
            tracing::warn!(
                "Repaired counter drift: {} on {} ({} -> {})",
                d.counter,
                d.owner_id,
                d.cached,
                d.live
            );
        }

        Ok(drift)
    }
}
