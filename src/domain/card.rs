//! Card Entity
//!
//! Cards live in a list and can move between lists of any board.

use serde::{Deserialize, Serialize};
use super::entity::{optional_text, optional_url, require_text, DomainResult, Entity};
use crate::position::Orderable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub list_id: u32,
    pub title: String,
    /// Markdown body
    pub description: Option<String>,
    /// Sort key within the list; `0.0` on a new card means "append"
    pub position: f64,
    /// Unix millis
    pub due_date: Option<i64>,
    pub is_archived: bool,
    pub cover_image: Option<String>,
    pub version: u32,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Card {
    pub fn new(id: u32, list_id: u32, title: String) -> Self {
        Self {
            id,
            list_id,
            title,
            description: None,
            position: 0.0,
            due_date: None,
            is_archived: false,
            cover_image: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            title: require_text("Card title", &self.title, 255)?,
            description: optional_text("Card description", self.description.as_deref(), 100_000)?,
            cover_image: optional_url("Cover image", self.cover_image.as_deref(), 2048)?,
            ..self.clone()
        })
    }
}

impl Entity for Card {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Orderable for Card {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    fn container_id(&self) -> u32 {
        self.list_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_creation() {
        let card = Card::new(0, 3, "Write docs".to_string());
        assert_eq!(card.container_id(), 3);
        assert_eq!(card.position, 0.0);
        assert_eq!(card.version, 0);
    }

    #[test]
    fn test_card_title_limit() {
        let card = Card::new(0, 1, "t".repeat(256));
        assert!(card.validated().is_err());

        let mut card = Card::new(0, 1, "ok".to_string());
        card.description = Some("   ".to_string());
        assert_eq!(card.validated().unwrap().description, None);
    }

    #[test]
    fn test_card_validation_cleans_input() {
        let mut card = Card::new(0, 1, "<em>Fix</em>   the\tbuild".to_string());
        card.cover_image = Some("https://img.example.com/cover.jpg".to_string());
        let clean = card.validated().unwrap();
        assert_eq!(clean.title, "Fix the build");
        assert_eq!(clean.cover_image.as_deref(), Some("https://img.example.com/cover.jpg"));

        card.cover_image = Some("javascript:alert(1)".to_string());
        assert!(matches!(card.validated(), Err(crate::domain::DomainError::InvalidInput(_))));
    }
}
