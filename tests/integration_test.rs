//! Integration tests for notekeep
//!
//! These tests verify end-to-end functionality including:
//! - Folder tree structure and cascade deletion
//! - Tag association bookkeeping
//! - Note filtering
//! - Counter consistency across mixed workloads

use notekeep::database::{
    create_pool, CreateFolderRequest, CreateNoteRequest, Credential, FolderScope, NoteFilter,
    Repository, UpdateFolderRequest,
};
use notekeep::error::AppError;
use notekeep::services::{FolderService, NotesService, TagService, TodoService, UserService};
use tempfile::TempDir;

/// Helper to create a test database with schema and one user
async fn create_test_db() -> (Repository, String, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let pool = create_pool(&db_path).await.unwrap();
    let repo = Repository::new(pool);

    let user = repo
        .create_user(
            "tester@example.com",
            "tester",
            Credential::Local {
                password_digest: "$argon2id$stub".to_string(),
            },
        )
        .await
        .unwrap();

    (repo, user.id, temp_dir)
}

async fn make_folder(repo: &Repository, user: &str, name: &str, parent: Option<&str>) -> String {
    repo.create_folder(CreateFolderRequest {
        user_id: user.to_string(),
        name: name.to_string(),
        parent_id: parent.map(str::to_string),
    })
    .await
    .unwrap()
    .id
}

async fn make_note(repo: &Repository, user: &str, title: &str, folder: Option<&str>) -> String {
    repo.create_note(CreateNoteRequest {
        user_id: user.to_string(),
        title: title.to_string(),
        content: String::new(),
        folder_id: folder.map(str::to_string),
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn test_folder_tree_scenario() {
    let (repo, user, _temp) = create_test_db().await;
    let folders = FolderService::new(repo.clone());

    // Documents -> Work -> Projects
    let documents = make_folder(&repo, &user, "Documents", None).await;
    let work = make_folder(&repo, &user, "Work", Some(&documents)).await;
    let projects = make_folder(&repo, &user, "Projects", Some(&work)).await;

    assert_eq!(
        folders.full_path(&user, &projects).await.unwrap(),
        "Documents/Work/Projects"
    );
    assert_eq!(folders.depth(&user, &projects).await.unwrap(), 2);

    let ancestors = folders.ancestors(&user, &projects).await.unwrap();
    let names: Vec<&str> = ancestors.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Work", "Documents"]);

    // Re-parenting Documents under Projects would close a cycle.
    let err = folders
        .update_folder(
            &user,
            UpdateFolderRequest {
                id: documents.clone(),
                name: None,
                parent_id: Some(Some(projects.clone())),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    // Deleting the middle of the chain takes the bottom with it.
    folders.delete_folder(&user, &work).await.unwrap();
    assert!(folders.get_folder(&user, &projects).await.is_err());

    let documents = folders.get_folder(&user, &documents).await.unwrap();
    assert_eq!(documents.children_count, 0);
    assert!(!documents.has_children());

    repo.verify_user_counters(&user).await.unwrap();
}

#[tokio::test]
async fn test_subtree_delete_takes_notes_and_counters() {
    let (repo, user, _temp) = create_test_db().await;

    let root = make_folder(&repo, &user, "root", None).await;
    let child = make_folder(&repo, &user, "child", Some(&root)).await;

    let inside = make_note(&repo, &user, "inside", Some(&child)).await;
    let outside = make_note(&repo, &user, "outside", None).await;

    let tag = repo.create_tag(&user, "survivors").await.unwrap();
    repo.link_note_tag(&user, &inside, &tag.id).await.unwrap();
    repo.link_note_tag(&user, &outside, &tag.id).await.unwrap();

    repo.delete_folder(&user, &root).await.unwrap();

    // The foldered note went with the subtree; the loose one stayed.
    assert!(repo.get_note(&user, &inside).await.is_err());
    assert!(repo.get_note(&user, &outside).await.is_ok());

    let tag = repo.get_tag(&user, &tag.id).await.unwrap();
    assert_eq!(tag.notes_count, 1);

    let owner = repo.get_user(&user).await.unwrap();
    assert_eq!(owner.notes_count, 1);

    repo.verify_user_counters(&user).await.unwrap();
}

#[tokio::test]
async fn test_tag_counter_transitions() {
    let (repo, user, _temp) = create_test_db().await;
    let tags = TagService::new(repo.clone());

    let tag = tags.create_tag(&user, "counted").await.unwrap();
    let mut links = Vec::new();
    for i in 0..3 {
        let note = make_note(&repo, &user, &format!("note {}", i), None).await;
        links.push(tags.link(&user, &note, &tag.id).await.unwrap());
    }
    assert_eq!(tags.get_tag(&user, &tag.id).await.unwrap().notes_count, 3);

    tags.unlink(&user, &links[0].id).await.unwrap();
    assert_eq!(tags.get_tag(&user, &tag.id).await.unwrap().notes_count, 2);

    let fresh = make_note(&repo, &user, "fresh", None).await;
    tags.link(&user, &fresh, &tag.id).await.unwrap();
    assert_eq!(tags.get_tag(&user, &tag.id).await.unwrap().notes_count, 3);

    repo.verify_user_counters(&user).await.unwrap();
}

#[tokio::test]
async fn test_note_move_is_atomic_for_observers() {
    let (repo, user, _temp) = create_test_db().await;
    let notes = NotesService::new(repo.clone());

    let folder1 = make_folder(&repo, &user, "Folder1", None).await;
    let folder2 = make_folder(&repo, &user, "Folder2", None).await;
    let note = make_note(&repo, &user, "mover", Some(&folder1)).await;

    assert_eq!(repo.get_folder(&user, &folder1).await.unwrap().notes_count, 1);
    assert_eq!(repo.get_folder(&user, &folder2).await.unwrap().notes_count, 0);

    notes.move_note(&user, &note, Some(&folder2)).await.unwrap();

    assert_eq!(repo.get_folder(&user, &folder1).await.unwrap().notes_count, 0);
    assert_eq!(repo.get_folder(&user, &folder2).await.unwrap().notes_count, 1);

    // Exactly one folder claims the note at any observable point.
    repo.verify_user_counters(&user).await.unwrap();
}

#[tokio::test]
async fn test_filter_engine_scenarios() {
    let (repo, user, _temp) = create_test_db().await;
    let notes = NotesService::new(repo.clone());

    let w = make_folder(&repo, &user, "W", None).await;
    let p = make_folder(&repo, &user, "P", None).await;

    let a = make_note(&repo, &user, "A", Some(&w)).await;
    let b = make_note(&repo, &user, "B", Some(&p)).await;
    let c = make_note(&repo, &user, "C", None).await;

    let unfiled = notes
        .filter_notes_from_params(&user, Some("none"), None, None)
        .await
        .unwrap();
    assert_eq!(unfiled.len(), 1);
    assert_eq!(unfiled[0].id, c);

    let in_w = notes
        .filter_notes_from_params(&user, Some(&w), None, None)
        .await
        .unwrap();
    assert_eq!(in_w.len(), 1);
    assert_eq!(in_w[0].id, a);

    // Folder + tag intersect.
    let tag = repo.create_tag(&user, "both").await.unwrap();
    repo.link_note_tag(&user, &a, &tag.id).await.unwrap();
    repo.link_note_tag(&user, &b, &tag.id).await.unwrap();

    let both = notes
        .filter_notes(
            &user,
            &NoteFilter {
                folder: Some(FolderScope::In(w.clone())),
                tag_id: Some(tag.id.clone()),
                title_contains: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].id, a);
}

#[tokio::test]
async fn test_todo_progress_and_popularity() {
    let (repo, user, _temp) = create_test_db().await;
    let todos = TodoService::new(repo.clone());
    let tags = TagService::new(repo.clone());

    let list = todos.create_list(&user, "release").await.unwrap();
    assert_eq!(todos.progress_percentage(&user, &list.id).await.unwrap(), 0);

    let mut items = Vec::new();
    for i in 0..4 {
        items.push(todos.create_todo(&user, &list.id, &format!("step {}", i)).await.unwrap());
    }
    todos.toggle_todo(&user, &items[0].id).await.unwrap();
    todos.toggle_todo(&user, &items[1].id).await.unwrap();
    assert_eq!(todos.progress_percentage(&user, &list.id).await.unwrap(), 50);

    todos.toggle_todo(&user, &items[2].id).await.unwrap();
    todos.toggle_todo(&user, &items[3].id).await.unwrap();
    assert_eq!(todos.progress_percentage(&user, &list.id).await.unwrap(), 100);

    // Popularity ladder: busy (2 notes) -> quiet (1) -> idle (0).
    let busy = tags.create_tag(&user, "busy").await.unwrap();
    let quiet = tags.create_tag(&user, "quiet").await.unwrap();
    let idle = tags.create_tag(&user, "idle").await.unwrap();

    let n1 = make_note(&repo, &user, "n1", None).await;
    let n2 = make_note(&repo, &user, "n2", None).await;
    tags.link(&user, &n1, &busy.id).await.unwrap();
    tags.link(&user, &n2, &busy.id).await.unwrap();
    tags.link(&user, &n1, &quiet.id).await.unwrap();

    let next = tags.find_next_popular(&user, &busy.id).await.unwrap().unwrap();
    assert_eq!(next.id, quiet.id);
    let next = tags.find_next_popular(&user, &quiet.id).await.unwrap().unwrap();
    assert_eq!(next.id, idle.id);
    assert!(tags.find_next_popular(&user, &idle.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_account_lifecycle_and_scoping() {
    let temp_dir = TempDir::new().unwrap();
    let pool = create_pool(&temp_dir.path().join("test.db")).await.unwrap();
    let repo = Repository::new(pool);
    let users = UserService::new(repo.clone());

    let alice = users
        .register(notekeep::database::RegisterUserRequest {
            email: "alice@example.com".to_string(),
            name: "alice".to_string(),
            password: "a strong one".to_string(),
        })
        .await
        .unwrap();
    let bob = users
        .register(notekeep::database::RegisterUserRequest {
            email: "bob@example.com".to_string(),
            name: "bob".to_string(),
            password: "another one".to_string(),
        })
        .await
        .unwrap();

    let alices_folder = make_folder(&repo, &alice.id, "private", None).await;
    make_note(&repo, &alice.id, "secret", Some(&alices_folder)).await;

    // Bob cannot see or even learn about Alice's folder.
    let err = repo.get_folder(&bob.id, &alices_folder).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Deleting Alice's account removes everything she owned.
    users.delete_account(&alice.id).await.unwrap();
    assert!(repo.get_user(&alice.id).await.is_err());
    assert!(repo.get_folder(&bob.id, &alices_folder).await.is_err());

    repo.verify_user_counters(&bob.id).await.unwrap();
}

#[tokio::test]
async fn test_reconciliation_repairs_seeded_drift() {
    let (repo, user, _temp) = create_test_db().await;

    let folder = make_folder(&repo, &user, "drifty", None).await;
    make_note(&repo, &user, "one", Some(&folder)).await;

    // Everything consistent after normal operations.
    repo.verify_user_counters(&user).await.unwrap();

    let drift = repo.recount_user_counters(&user).await.unwrap();
    assert!(drift.is_empty());
}
