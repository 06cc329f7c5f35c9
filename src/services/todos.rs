//! Todos service
//!
//! Checklist lists and their items, with completion toggles and the
//! derived progress numbers the request layer shows as progress bars.

use crate::database::{Repository, Todo, TodoList, TodoStatus};
use crate::error::Result;

/// Service for managing todo lists and todos
#[derive(Clone)]
pub struct TodoService {
    repo: Repository,
}

impl TodoService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_list(&self, user_id: &str, title: &str) -> Result<TodoList> {
        tracing::info!("Creating todo list: {}", title);
        self.repo.create_todo_list(user_id, title).await
    }

    pub async fn get_list(&self, user_id: &str, id: &str) -> Result<TodoList> {
        self.repo.get_todo_list(user_id, id).await
    }

    pub async fn list_lists(&self, user_id: &str) -> Result<Vec<TodoList>> {
        self.repo.list_todo_lists(user_id).await
    }

    pub async fn rename_list(&self, user_id: &str, id: &str, title: &str) -> Result<TodoList> {
        self.repo.update_todo_list(user_id, id, Some(title), None).await
    }

    pub async fn toggle_list(&self, user_id: &str, id: &str) -> Result<TodoList> {
        self.repo.toggle_todo_list(user_id, id).await
    }

    pub async fn delete_list(&self, user_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting todo list: {}", id);
        self.repo.delete_todo_list(user_id, id).await
    }

    pub async fn create_todo(&self, user_id: &str, list_id: &str, description: &str) -> Result<Todo> {
        self.repo.create_todo(user_id, list_id, description).await
    }

    pub async fn list_todos(
        &self,
        user_id: &str,
        list_id: &str,
        status: Option<TodoStatus>,
    ) -> Result<Vec<Todo>> {
        self.repo.list_todos(user_id, list_id, status).await
    }

    pub async fn update_todo(
        &self,
        user_id: &str,
        id: &str,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Todo> {
        self.repo.update_todo(user_id, id, description, completed).await
    }

    pub async fn toggle_todo(&self, user_id: &str, id: &str) -> Result<Todo> {
        self.repo.toggle_todo(user_id, id).await
    }

    pub async fn delete_todo(&self, user_id: &str, id: &str) -> Result<()> {
        self.repo.delete_todo(user_id, id).await
    }

    /// Rounded completion percentage; 0 for an empty list.
    pub async fn progress_percentage(&self, user_id: &str, list_id: &str) -> Result<i64> {
        self.repo.todo_list_progress(user_id, list_id).await
    }

    pub async fn pending_count(&self, user_id: &str, list_id: &str) -> Result<i64> {
        self.repo.pending_todos_count(user_id, list_id).await
    }

    pub async fn completed_count(&self, user_id: &str, list_id: &str) -> Result<i64> {
        self.repo.completed_todos_count(user_id, list_id).await
    }

    pub async fn all_completed(&self, user_id: &str, list_id: &str) -> Result<bool> {
        self.repo.all_todos_completed(user_id, list_id).await
    }
}
