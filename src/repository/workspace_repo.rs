//! Workspace Repository
//!
//! Handles all workspace-related database operations.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::db::{not_initialized, now_millis, SharedConnection};
use super::traits::Repository;
use crate::domain::{DomainError, DomainResult, Workspace};

const COLUMNS: &str = "id, name, description, is_archived, created_at";

pub struct WorkspaceRepository {
    conn: SharedConnection,
}

impl WorkspaceRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Repository<Workspace> for WorkspaceRepository {
    async fn create(&self, entity: &Workspace) -> DomainResult<Workspace> {
        let workspace = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let now = now_millis();
        conn.execute(
            "INSERT INTO workspaces (name, description, is_archived, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![workspace.name, workspace.description, workspace.is_archived, now],
        )?;

        Ok(Workspace {
            id: conn.last_insert_rowid() as u32,
            created_at: Some(now),
            ..workspace
        })
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Workspace>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!("SELECT {} FROM workspaces WHERE id = ?1 AND deleted_at IS NULL", COLUMNS);
        Ok(conn.query_row(&sql, params![id], row_to_workspace).optional()?)
    }

    async fn list(&self) -> DomainResult<Vec<Workspace>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!("SELECT {} FROM workspaces WHERE deleted_at IS NULL ORDER BY id", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let workspaces = stmt
            .query_map([], row_to_workspace)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(workspaces)
    }

    async fn update(&self, entity: &Workspace) -> DomainResult<Workspace> {
        let workspace = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE workspaces SET name = ?1, description = ?2, is_archived = ?3 WHERE id = ?4 AND deleted_at IS NULL",
            params![workspace.name, workspace.description, workspace.is_archived, workspace.id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Workspace {} not found", workspace.id)));
        }

        let sql = format!("SELECT {} FROM workspaces WHERE id = ?1", COLUMNS);
        Ok(conn.query_row(&sql, params![workspace.id], row_to_workspace)?)
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now = now_millis();
        let changed = tx.execute(
            "UPDATE workspaces SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Workspace {} not found", id)));
        }

        tx.execute(
            "UPDATE boards SET deleted_at = ?1 WHERE workspace_id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        super::board_repo::cascade_from_boards(
            &tx,
            now,
            "SELECT id FROM boards WHERE workspace_id = ?2",
            id,
        )?;
        tx.commit()?;

        tracing::info!(workspace_id = id, "workspace deleted");
        Ok(())
    }
}

fn row_to_workspace(row: &rusqlite::Row) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_archived: row.get(3)?,
        created_at: row.get(4)?,
    })
}
