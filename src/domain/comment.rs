//! Comment Entity

use serde::{Deserialize, Serialize};
use super::entity::{require_text, DomainResult, Entity};

/// A comment on a card. Comments are listed newest first, not by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    pub card_id: u32,
    /// Display name or id of whoever wrote it, as supplied by the host
    pub author: String,
    pub content: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Comment {
    pub fn new(id: u32, card_id: u32, author: String, content: String) -> Self {
        Self {
            id,
            card_id,
            author,
            content,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            author: require_text("Comment author", &self.author, 255)?,
            content: require_text("Comment", &self.content, 5000)?,
            ..self.clone()
        })
    }
}

impl Entity for Comment {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}
