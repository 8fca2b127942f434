//! Board List Entity
//!
//! A column on a board. Lists are ordered by position within their board.

use serde::{Deserialize, Serialize};
use super::entity::{require_text, DomainResult, Entity};
use crate::position::Orderable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: u32,
    pub board_id: u32,
    pub name: String,
    /// Sort key within the board; `0.0` on a new list means "append"
    pub position: f64,
    pub is_archived: bool,
    /// Bumped on every write
    pub version: u32,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl BoardList {
    pub fn new(id: u32, board_id: u32, name: String) -> Self {
        Self {
            id,
            board_id,
            name,
            position: 0.0,
            is_archived: false,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            name: require_text("List name", &self.name, 100)?,
            ..self.clone()
        })
    }
}

impl Entity for BoardList {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Orderable for BoardList {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    fn container_id(&self) -> u32 {
        self.board_id
    }
}
