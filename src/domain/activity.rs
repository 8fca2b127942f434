//! Activity Log Entity
//!
//! Append-only record of moves, completions and deletions, scoped to a board.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

/// Kind of row an activity entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Board,
    List,
    Card,
    ChecklistItem,
    Comment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Board => "board",
            EntityKind::List => "list",
            EntityKind::Card => "card",
            EntityKind::ChecklistItem => "checklist_item",
            EntityKind::Comment => "comment",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "board" => Some(EntityKind::Board),
            "list" => Some(EntityKind::List),
            "card" => Some(EntityKind::Card),
            "checklist_item" => Some(EntityKind::ChecklistItem),
            "comment" => Some(EntityKind::Comment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Moved,
    Completed,
    /// Checklist item unticked
    Reopened,
    Deleted,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Moved => "moved",
            ActivityAction::Completed => "completed",
            ActivityAction::Reopened => "reopened",
            ActivityAction::Deleted => "deleted",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "moved" => Some(ActivityAction::Moved),
            "completed" => Some(ActivityAction::Completed),
            "reopened" => Some(ActivityAction::Reopened),
            "deleted" => Some(ActivityAction::Deleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: u32,
    pub board_id: u32,
    pub entity_type: EntityKind,
    pub entity_id: u32,
    pub action: ActivityAction,
    /// Free-form context, e.g. `{"from": 3, "to": 7}` for a move
    pub details: serde_json::Value,
    pub created_at: Option<i64>,
}

impl ActivityLog {
    pub fn new(board_id: u32, entity_type: EntityKind, entity_id: u32, action: ActivityAction) -> Self {
        Self {
            id: 0,
            board_id,
            entity_type,
            entity_id,
            action,
            details: serde_json::Value::Object(Default::default()),
            created_at: None,
        }
    }

    pub fn with_details(self, details: serde_json::Value) -> Self {
        Self { details, ..self }
    }
}

impl Entity for ActivityLog {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_action_round_trip() {
        for kind in [
            EntityKind::Board,
            EntityKind::List,
            EntityKind::Card,
            EntityKind::ChecklistItem,
            EntityKind::Comment,
        ] {
            assert_eq!(EntityKind::from_db(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityAction::from_db("moved"), Some(ActivityAction::Moved));
        assert_eq!(ActivityAction::from_db("archived"), None);
    }

    #[test]
    fn test_new_entry_has_empty_details() {
        let entry = ActivityLog::new(1, EntityKind::Card, 9, ActivityAction::Deleted);
        assert_eq!(entry.details, serde_json::json!({}));
    }
}
