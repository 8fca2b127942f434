//! Board Entity
//!
//! A board belongs to a workspace and holds ordered lists.

use serde::{Deserialize, Serialize};
use super::entity::{optional_url, require_text, DomainResult, Entity};

/// Who can see a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    /// Visible to every workspace member
    #[default]
    Workspace,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Workspace => "workspace",
            Visibility::Public => "public",
        }
    }

    /// Parse a stored value, falling back to the default for unknown input
    pub fn from_db(s: &str) -> Self {
        match s {
            "private" => Visibility::Private,
            "public" => Visibility::Public,
            _ => Visibility::Workspace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: u32,
    pub workspace_id: u32,
    pub name: String,
    pub visibility: Visibility,
    pub background_image: Option<String>,
    pub created_at: Option<i64>,
}

impl Board {
    pub fn new(id: u32, workspace_id: u32, name: String) -> Self {
        Self {
            id,
            workspace_id,
            name,
            visibility: Visibility::default(),
            background_image: None,
            created_at: None,
        }
    }

    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            name: require_text("Board name", &self.name, 100)?,
            background_image: optional_url("Background image", self.background_image.as_deref(), 2048)?,
            ..self.clone()
        })
    }
}

impl Entity for Board {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_round_trip() {
        for v in [Visibility::Private, Visibility::Workspace, Visibility::Public] {
            assert_eq!(Visibility::from_db(v.as_str()), v);
        }
        assert_eq!(Visibility::from_db("bogus"), Visibility::Workspace);
    }

    #[test]
    fn test_board_validation() {
        let board = Board::new(0, 1, "  Roadmap ".to_string());
        assert_eq!(board.validated().unwrap().name, "Roadmap");
        assert!(Board::new(0, 1, String::new()).validated().is_err());

        let mut board = Board::new(0, 1, "Roadmap".to_string());
        board.background_image = Some("data:image/png;base64,iVBORw0KGgo=".to_string());
        assert!(board.validated().is_ok());
        board.background_image = Some("file:///etc/passwd".to_string());
        assert!(board.validated().is_err());
    }
}
