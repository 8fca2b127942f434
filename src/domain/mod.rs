//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO storage dependencies (serde for serialization only).

mod entity;
mod workspace;
mod board;
mod list;
mod card;
mod checklist;
mod comment;
mod activity;

pub use entity::{Entity, DomainError, DomainResult};
pub use workspace::Workspace;
pub use board::{Board, Visibility};
pub use list::BoardList;
pub use card::Card;
pub use checklist::ChecklistItem;
pub use comment::Comment;
pub use activity::{ActivityAction, ActivityLog, EntityKind};
