//! Checklist Item Entity

use serde::{Deserialize, Serialize};
use super::entity::{require_text, DomainResult, Entity};
use crate::position::Orderable;

/// One line of a card's checklist, ordered within the card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: u32,
    pub card_id: u32,
    pub title: String,
    pub is_completed: bool,
    pub position: f64,
    pub version: u32,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl ChecklistItem {
    pub fn new(id: u32, card_id: u32, title: String) -> Self {
        Self {
            id,
            card_id,
            title,
            is_completed: false,
            position: 0.0,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            title: require_text("Checklist item title", &self.title, 500)?,
            ..self.clone()
        })
    }
}

impl Entity for ChecklistItem {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Orderable for ChecklistItem {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    fn container_id(&self) -> u32 {
        self.card_id
    }
}
