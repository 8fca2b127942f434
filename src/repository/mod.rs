//! Repository Layer
//!
//! Data access abstractions and their SQLite implementations.

mod traits;
mod db;
mod positioning;
mod workspace_repo;
mod board_repo;
mod list_repo;
mod card_repo;
mod checklist_repo;
mod comment_repo;
mod activity_repo;


pub use traits::Repository;
pub use db::{init_db, DbState, SharedConnection};
pub use positioning::{MoveOutcome, OrderedStore, OrderedTable, PositioningOperations};
pub use workspace_repo::WorkspaceRepository;
pub use board_repo::BoardRepository;
pub use list_repo::ListRepository;
pub use card_repo::CardRepository;
pub use checklist_repo::ChecklistRepository;
pub use comment_repo::CommentRepository;
pub use activity_repo::ActivityRepository;
