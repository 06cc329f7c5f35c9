//! Todo list and todo repository operations
//!
//! Lists own their todos; destroying a list takes its todos with it and
//! settles `user.todos_count` in the same transaction. Progress is
//! always derived from live rows, never cached.

use super::models::{Todo, TodoList, TodoStatus};
use super::Repository;
use crate::config::{MAX_TODO_DESCRIPTION_LENGTH, MAX_TODO_LIST_TITLE_LENGTH};
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

impl Repository {
    /// Create a todo list, bumping the owner's `todo_lists_count`.
    pub async fn create_todo_list(&self, user_id: &str, title: &str) -> Result<TodoList> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title", "can't be blank"));
        }
        if title.chars().count() > MAX_TODO_LIST_TITLE_LENGTH {
            return Err(AppError::validation("title", "is too long"));
        }

        let mut tx = self.pool.begin().await?;

        let list = sqlx::query_as::<_, TodoList>(
            r#"
            INSERT INTO todo_lists (id, title, completed, user_id, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&title)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET todo_lists_count = todo_lists_count + 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Created todo list: {}", id);
        Ok(list)
    }

    /// Get a todo list by ID, scoped to the user
    pub async fn get_todo_list(&self, user_id: &str, id: &str) -> Result<TodoList> {
        sqlx::query_as::<_, TodoList>("SELECT * FROM todo_lists WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Todo list"))
    }

    /// The user's todo lists, most recent first
    pub async fn list_todo_lists(&self, user_id: &str) -> Result<Vec<TodoList>> {
        let lists = sqlx::query_as::<_, TodoList>(
            r#"
            SELECT * FROM todo_lists WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lists)
    }

    /// Rename a todo list and/or set its completion flag
    pub async fn update_todo_list(
        &self,
        user_id: &str,
        id: &str,
        title: Option<&str>,
        completed: Option<bool>,
    ) -> Result<TodoList> {
        let existing = self.get_todo_list(user_id, id).await?;

        let title = match title {
            Some(title) => {
                let title = title.trim().to_string();
                if title.is_empty() {
                    return Err(AppError::validation("title", "can't be blank"));
                }
                if title.chars().count() > MAX_TODO_LIST_TITLE_LENGTH {
                    return Err(AppError::validation("title", "is too long"));
                }
                title
            }
            None => existing.title.clone(),
        };
        let completed = completed.unwrap_or(existing.completed);

        let list = sqlx::query_as::<_, TodoList>(
            "UPDATE todo_lists SET title = ?, completed = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&title)
        .bind(completed)
        .bind(Utc::now())
        .bind(&existing.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Updated todo list: {}", list.id);
        Ok(list)
    }

    /// Flip a list's completion flag
    pub async fn toggle_todo_list(&self, user_id: &str, id: &str) -> Result<TodoList> {
        let existing = self.get_todo_list(user_id, id).await?;
        self.update_todo_list(user_id, id, None, Some(!existing.completed))
            .await
    }

    /// Delete a list and its todos, settling `user.todos_count` and
    /// `user.todo_lists_count` in the same transaction.
    pub async fn delete_todo_list(&self, user_id: &str, id: &str) -> Result<()> {
        let list = self.get_todo_list(user_id, id).await?;

        let mut tx = self.pool.begin().await?;

        let todos_deleted = sqlx::query("DELETE FROM todos WHERE todo_list_id = ?")
            .bind(&list.id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        sqlx::query("UPDATE users SET todos_count = todos_count - ? WHERE id = ?")
            .bind(todos_deleted)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM todo_lists WHERE id = ?")
            .bind(&list.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET todo_lists_count = todo_lists_count - 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted todo list {} ({} todos)", list.id, todos_deleted);
        Ok(())
    }

    /// Create a todo in a list; the owner comes from the list.
    pub async fn create_todo(&self, user_id: &str, todo_list_id: &str, description: &str) -> Result<Todo> {
        let list = self.get_todo_list(user_id, todo_list_id).await?;

        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::validation("description", "can't be blank"));
        }
        if description.chars().count() > MAX_TODO_DESCRIPTION_LENGTH {
            return Err(AppError::validation("description", "is too long"));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, description, completed, todo_list_id, user_id,
                               created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&description)
        .bind(&list.id)
        .bind(&list.user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET todos_count = todos_count + 1 WHERE id = ?")
            .bind(&list.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Created todo: {} in list {}", id, list.id);
        Ok(todo)
    }

    /// Get a todo by ID, scoped to the user
    pub async fn get_todo(&self, user_id: &str, id: &str) -> Result<Todo> {
        sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Todo"))
    }

    /// Todos of a list, most recent first, optionally narrowed to a
    /// completion status.
    pub async fn list_todos(
        &self,
        user_id: &str,
        todo_list_id: &str,
        status: Option<TodoStatus>,
    ) -> Result<Vec<Todo>> {
        let list = self.get_todo_list(user_id, todo_list_id).await?;

        let mut sql = String::from("SELECT * FROM todos WHERE todo_list_id = ?");
        match status {
            Some(TodoStatus::Completed) => sql.push_str(" AND completed = 1"),
            Some(TodoStatus::Pending) => sql.push_str(" AND completed = 0"),
            None => {}
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let todos = sqlx::query_as::<_, Todo>(&sql)
            .bind(&list.id)
            .fetch_all(&self.pool)
            .await?;

        Ok(todos)
    }

    /// Update a todo's description and/or completion flag
    pub async fn update_todo(
        &self,
        user_id: &str,
        id: &str,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Todo> {
        let existing = self.get_todo(user_id, id).await?;

        let description = match description {
            Some(description) => {
                let description = description.trim().to_string();
                if description.is_empty() {
                    return Err(AppError::validation("description", "can't be blank"));
                }
                if description.chars().count() > MAX_TODO_DESCRIPTION_LENGTH {
                    return Err(AppError::validation("description", "is too long"));
                }
                description
            }
            None => existing.description.clone(),
        };
        let completed = completed.unwrap_or(existing.completed);

        let todo = sqlx::query_as::<_, Todo>(
            "UPDATE todos SET description = ?, completed = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&description)
        .bind(completed)
        .bind(Utc::now())
        .bind(&existing.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Updated todo: {}", todo.id);
        Ok(todo)
    }

    /// Flip a todo's completion flag
    pub async fn toggle_todo(&self, user_id: &str, id: &str) -> Result<Todo> {
        let existing = self.get_todo(user_id, id).await?;
        self.update_todo(user_id, id, None, Some(!existing.completed))
            .await
    }

    /// Delete a todo, decrementing `user.todos_count` with it.
    pub async fn delete_todo(&self, user_id: &str, id: &str) -> Result<()> {
        let todo = self.get_todo(user_id, id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(&todo.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET todos_count = todos_count - 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted todo: {}", todo.id);
        Ok(())
    }

    /// Percentage of completed todos, rounded; 0 for an empty list.
    pub async fn todo_list_progress(&self, user_id: &str, todo_list_id: &str) -> Result<i64> {
        let list = self.get_todo_list(user_id, todo_list_id).await?;

        let (total, completed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(completed), 0)
            FROM todos WHERE todo_list_id = ?
            "#,
        )
        .bind(&list.id)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(0);
        }

        Ok((completed as f64 / total as f64 * 100.0).round() as i64)
    }

    /// Live pending count for a list
    pub async fn pending_todos_count(&self, user_id: &str, todo_list_id: &str) -> Result<i64> {
        Ok(self
            .list_todos(user_id, todo_list_id, Some(TodoStatus::Pending))
            .await?
            .len() as i64)
    }

    /// Live completed count for a list
    pub async fn completed_todos_count(&self, user_id: &str, todo_list_id: &str) -> Result<i64> {
        Ok(self
            .list_todos(user_id, todo_list_id, Some(TodoStatus::Completed))
            .await?
            .len() as i64)
    }

    /// True when the list has todos and every one is completed.
    pub async fn all_todos_completed(&self, user_id: &str, todo_list_id: &str) -> Result<bool> {
        let todos = self.list_todos(user_id, todo_list_id, None).await?;
        Ok(!todos.is_empty() && todos.iter().all(|t| t.completed))
    }
}
