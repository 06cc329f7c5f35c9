//! Tags service
//!
//! Tag lifecycle and the note/tag association ledger.

use crate::database::{Note, NoteTagLink, Repository, Tag};
use crate::error::Result;

/// Service for managing tags and tag links
#[derive(Clone)]
pub struct TagService {
    repo: Repository,
}

impl TagService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_tag(&self, user_id: &str, name: &str) -> Result<Tag> {
        tracing::info!("Creating tag: {}", name);
        self.repo.create_tag(user_id, name).await
    }

    pub async fn get_tag(&self, user_id: &str, id: &str) -> Result<Tag> {
        self.repo.get_tag(user_id, id).await
    }

    pub async fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>> {
        self.repo.list_tags(user_id).await
    }

    pub async fn rename_tag(&self, user_id: &str, id: &str, name: &str) -> Result<Tag> {
        tracing::debug!("Renaming tag: {}", id);
        self.repo.rename_tag(user_id, id, name).await
    }

    pub async fn delete_tag(&self, user_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting tag: {}", id);
        self.repo.delete_tag(user_id, id).await
    }

    /// Link a note to a tag; both cached counters move together.
    pub async fn link(&self, user_id: &str, note_id: &str, tag_id: &str) -> Result<NoteTagLink> {
        self.repo.link_note_tag(user_id, note_id, tag_id).await
    }

    /// Remove a link by id; both cached counters move together.
    pub async fn unlink(&self, user_id: &str, link_id: &str) -> Result<()> {
        self.repo.unlink_note_tag(user_id, link_id).await
    }

    pub async fn links_for_note(&self, user_id: &str, note_id: &str) -> Result<Vec<NoteTagLink>> {
        self.repo.list_note_tag_links(user_id, note_id).await
    }

    pub async fn notes_for_tag(&self, user_id: &str, tag_id: &str) -> Result<Vec<Note>> {
        self.repo.notes_for_tag(user_id, tag_id).await
    }

    /// Next rung down the popularity ranking, if any.
    pub async fn find_next_popular(&self, user_id: &str, tag_id: &str) -> Result<Option<Tag>> {
        self.repo.find_next_popular_tag(user_id, tag_id).await
    }
}
