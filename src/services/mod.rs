//! Services module - high-level business logic

pub mod folders;
pub mod notes;
pub mod tags;
pub mod todos;
pub mod users;

pub use folders::FolderService;
pub use notes::NotesService;
pub use tags::TagService;
pub use todos::TodoService;
pub use users::UserService;
