//! Notes service
//!
//! Note lifecycle plus the filter engine entry point. The request layer
//! hands over raw filter params; [`NoteFilter`] carries the parsed form.

use crate::database::{
    CreateNoteRequest, FolderScope, Note, NoteFilter, Repository, UpdateNoteRequest,
};
use crate::error::Result;

/// Service for managing notes
#[derive(Clone)]
pub struct NotesService {
    repo: Repository,
}

impl NotesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        tracing::info!("Creating note: {}", req.title);
        self.repo.create_note(req).await
    }

    pub async fn get_note(&self, user_id: &str, id: &str) -> Result<Note> {
        self.repo.get_note(user_id, id).await
    }

    /// The user's notes, most recent first, unfiltered.
    pub async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        self.repo.list_notes(user_id, &NoteFilter::default()).await
    }

    /// The filter engine: conjunctive folder/tag/title predicates.
    pub async fn filter_notes(&self, user_id: &str, filter: &NoteFilter) -> Result<Vec<Note>> {
        self.repo.list_notes(user_id, filter).await
    }

    /// Convenience for the request layer's raw query params; blank
    /// values fall through as absent predicates.
    pub async fn filter_notes_from_params(
        &self,
        user_id: &str,
        folder_id: Option<&str>,
        tag_id: Option<&str>,
        title_query: Option<&str>,
    ) -> Result<Vec<Note>> {
        let filter = NoteFilter {
            folder: FolderScope::parse(folder_id),
            tag_id: tag_id.map(str::to_string),
            title_contains: title_query.map(str::to_string),
        };
        self.repo.list_notes(user_id, &filter).await
    }

    pub async fn update_note(&self, user_id: &str, req: UpdateNoteRequest) -> Result<Note> {
        tracing::debug!("Updating note: {}", req.id);
        self.repo.update_note(user_id, req).await
    }

    /// Move a note into a folder (or out of all folders with `None`).
    pub async fn move_note(&self, user_id: &str, id: &str, folder_id: Option<&str>) -> Result<Note> {
        tracing::debug!("Moving note {} to folder {:?}", id, folder_id);
        self.repo
            .update_note(
                user_id,
                UpdateNoteRequest {
                    id: id.to_string(),
                    title: None,
                    content: None,
                    folder_id: Some(folder_id.map(str::to_string)),
                },
            )
            .await
    }

    pub async fn delete_note(&self, user_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting note: {}", id);
        self.repo.delete_note(user_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Credential;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> (NotesService, String) {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let user = repo
            .create_user(
                "notesvc@example.com",
                "notesvc",
                Credential::Local {
                    password_digest: "$argon2id$stub".to_string(),
                },
            )
            .await
            .unwrap();

        (NotesService::new(repo), user.id)
    }

    #[tokio::test]
    async fn test_recent_ordering_preserved() {
        let (service, user) = create_test_service().await;

        for title in ["first", "second", "third"] {
            service
                .create_note(CreateNoteRequest {
                    user_id: user.clone(),
                    title: title.to_string(),
                    content: String::new(),
                    folder_id: None,
                })
                .await
                .unwrap();
        }

        let notes = service.list_notes(&user).await.unwrap();
        let titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        // Filtering never reorders the base collection.
        let filtered = service
            .filter_notes_from_params(&user, Some("none"), None, None)
            .await
            .unwrap();
        let titles: Vec<&str> = filtered.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_move_note_in_and_out_of_folder() {
        let (service, user) = create_test_service().await;

        let folder = service
            .repo
            .create_folder(crate::database::CreateFolderRequest {
                user_id: user.clone(),
                name: "target".to_string(),
                parent_id: None,
            })
            .await
            .unwrap();

        let note = service
            .create_note(CreateNoteRequest {
                user_id: user.clone(),
                title: "wanderer".to_string(),
                content: String::new(),
                folder_id: None,
            })
            .await
            .unwrap();

        let moved = service
            .move_note(&user, &note.id, Some(&folder.id))
            .await
            .unwrap();
        assert_eq!(moved.folder_id.as_deref(), Some(folder.id.as_str()));

        let unfiled = service.move_note(&user, &note.id, None).await.unwrap();
        assert!(unfiled.folder_id.is_none());
    }
}
