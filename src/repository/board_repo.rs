//! Board Repository
//!
//! SQLite-backed implementation for Board CRUD operations.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::activity_repo;
use super::db::{not_initialized, now_millis, SharedConnection};
use super::traits::Repository;
use crate::domain::{ActivityAction, Board, DomainError, DomainResult, EntityKind, Visibility};

const COLUMNS: &str = "id, workspace_id, name, visibility, background_image, created_at";

pub struct BoardRepository {
    conn: SharedConnection,
}

impl BoardRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Live boards of a workspace, oldest first
    pub async fn list_by_workspace(&self, workspace_id: u32) -> DomainResult<Vec<Board>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM boards WHERE workspace_id = ?1 AND deleted_at IS NULL ORDER BY id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let boards = stmt
            .query_map(params![workspace_id], row_to_board)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(boards)
    }
}

#[async_trait]
impl Repository<Board> for BoardRepository {
    async fn create(&self, entity: &Board) -> DomainResult<Board> {
        let board = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let workspace: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM workspaces WHERE id = ?1 AND deleted_at IS NULL",
                params![board.workspace_id],
                |row| row.get(0),
            )
            .optional()?;
        if workspace.is_none() {
            return Err(DomainError::NotFound(format!("Workspace {} not found", board.workspace_id)));
        }

        let now = now_millis();
        conn.execute(
            "INSERT INTO boards (workspace_id, name, visibility, background_image, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                board.workspace_id,
                board.name,
                board.visibility.as_str(),
                board.background_image,
                now
            ],
        )?;

        Ok(Board {
            id: conn.last_insert_rowid() as u32,
            created_at: Some(now),
            ..board
        })
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Board>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!("SELECT {} FROM boards WHERE id = ?1 AND deleted_at IS NULL", COLUMNS);
        Ok(conn.query_row(&sql, params![id], row_to_board).optional()?)
    }

    async fn list(&self) -> DomainResult<Vec<Board>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!("SELECT {} FROM boards WHERE deleted_at IS NULL ORDER BY workspace_id, id", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let boards = stmt.query_map([], row_to_board)?.collect::<Result<Vec<_>, _>>()?;
        Ok(boards)
    }

    /// Updates name, visibility and background. Boards do not change workspace.
    async fn update(&self, entity: &Board) -> DomainResult<Board> {
        let board = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE boards SET name = ?1, visibility = ?2, background_image = ?3 WHERE id = ?4 AND deleted_at IS NULL",
            params![board.name, board.visibility.as_str(), board.background_image, board.id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Board {} not found", board.id)));
        }

        let sql = format!("SELECT {} FROM boards WHERE id = ?1", COLUMNS);
        Ok(conn.query_row(&sql, params![board.id], row_to_board)?)
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now = now_millis();
        let changed = tx.execute(
            "UPDATE boards SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Board {} not found", id)));
        }

        cascade_from_boards(&tx, now, "SELECT ?2", id)?;
        activity_repo::record_for(&tx, EntityKind::Board, id, ActivityAction::Deleted, serde_json::json!({}))?;
        tx.commit()?;

        tracing::info!(board_id = id, "board deleted");
        Ok(())
    }
}

/// Soft-delete everything under the boards selected by `boards_sql`
///
/// `boards_sql` is a subquery that may reference `?2`, bound to `id`.
pub(super) fn cascade_from_boards(conn: &Connection, now: i64, boards_sql: &str, id: u32) -> DomainResult<()> {
    conn.execute(
        &format!(
            "UPDATE board_lists SET deleted_at = ?1 WHERE board_id IN ({}) AND deleted_at IS NULL",
            boards_sql
        ),
        params![now, id],
    )?;
    let lists_sql = format!("SELECT id FROM board_lists WHERE board_id IN ({})", boards_sql);
    super::list_repo::cascade_from_lists(conn, now, &lists_sql, id)
}

fn row_to_board(row: &rusqlite::Row) -> rusqlite::Result<Board> {
    let visibility: String = row.get(3)?;
    Ok(Board {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        visibility: Visibility::from_db(&visibility),
        background_image: row.get(4)?,
        created_at: row.get(5)?,
    })
}
