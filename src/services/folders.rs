//! Folder service
//!
//! High-level interface to the folder tree: lifecycle, structural
//! queries and sibling navigation. All tree semantics live in the
//! repository; this layer adds logging and a stable public surface.

use crate::database::{CreateFolderRequest, Folder, Repository, UpdateFolderRequest};
use crate::error::Result;

/// Service for managing the folder hierarchy
#[derive(Clone)]
pub struct FolderService {
    repo: Repository,
}

impl FolderService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_folder(&self, req: CreateFolderRequest) -> Result<Folder> {
        tracing::info!("Creating folder: {}", req.name);
        self.repo.create_folder(req).await
    }

    pub async fn get_folder(&self, user_id: &str, id: &str) -> Result<Folder> {
        self.repo.get_folder(user_id, id).await
    }

    pub async fn list_folders(&self, user_id: &str) -> Result<Vec<Folder>> {
        self.repo.list_folders(user_id).await
    }

    pub async fn list_root_folders(&self, user_id: &str) -> Result<Vec<Folder>> {
        self.repo.list_root_folders(user_id).await
    }

    pub async fn list_children(&self, user_id: &str, folder_id: &str) -> Result<Vec<Folder>> {
        self.repo.list_children(user_id, folder_id).await
    }

    pub async fn update_folder(&self, user_id: &str, req: UpdateFolderRequest) -> Result<Folder> {
        tracing::info!("Updating folder: {}", req.id);
        self.repo.update_folder(user_id, req).await
    }

    /// Destroys the folder, its whole subtree, and the notes inside it.
    pub async fn delete_folder(&self, user_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting folder: {}", id);
        self.repo.delete_folder(user_id, id).await
    }

    /// Ancestors, nearest-first; empty for a root.
    pub async fn ancestors(&self, user_id: &str, id: &str) -> Result<Vec<Folder>> {
        self.repo.folder_ancestors(user_id, id).await
    }

    /// Every transitive child; treat the result as a set.
    pub async fn descendants(&self, user_id: &str, id: &str) -> Result<Vec<Folder>> {
        self.repo.folder_descendants(user_id, id).await
    }

    /// Slash-joined names from the root down to this folder.
    pub async fn full_path(&self, user_id: &str, id: &str) -> Result<String> {
        self.repo.folder_full_path(user_id, id).await
    }

    /// 0 for a root folder.
    pub async fn depth(&self, user_id: &str, id: &str) -> Result<usize> {
        self.repo.folder_depth(user_id, id).await
    }

    /// Next folder in the sibling group, creation order.
    pub async fn next_sibling(&self, user_id: &str, id: &str) -> Result<Option<Folder>> {
        self.repo.folder_next_sibling(user_id, id).await
    }
}
