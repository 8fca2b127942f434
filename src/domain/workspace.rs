//! Workspace domain entity

use serde::{Deserialize, Serialize};
use super::entity::{optional_text, require_text, DomainResult, Entity};

/// Top-level grouping of boards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub created_at: Option<i64>,
}

impl Entity for Workspace {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Workspace {
    pub fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            description: None,
            is_archived: false,
            created_at: None,
        }
    }

    /// Normalized copy, or an error if a field is out of bounds
    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            name: require_text("Workspace name", &self.name, 100)?,
            description: optional_text("Workspace description", self.description.as_deref(), 500)?,
            ..self.clone()
        })
    }
}
