//! Activity Repository
//!
//! Entries are written by the other repositories inside their own write
//! transactions through [`record`]; this repository only reads them back.

use rusqlite::{params, Connection, OptionalExtension};

use super::db::{not_initialized, now_millis, SharedConnection};
use crate::domain::{ActivityAction, ActivityLog, DomainError, DomainResult, EntityKind};

pub struct ActivityRepository {
    conn: SharedConnection,
}

impl ActivityRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Entries of a board, newest first
    pub async fn list_by_board(&self, board_id: u32, skip: u32, limit: u32) -> DomainResult<Vec<ActivityLog>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let mut stmt = conn.prepare(
            "SELECT id, board_id, entity_type, entity_id, action, details, created_at
             FROM activity_logs WHERE board_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![board_id, limit, skip], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_entry).collect()
    }

    pub async fn count_by_board(&self, board_id: u32) -> DomainResult<u32> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM activity_logs WHERE board_id = ?1",
            params![board_id],
            |row| row.get(0),
        )?)
    }
}

/// Append an entry; call inside the transaction making the change
pub(crate) fn record(conn: &Connection, entry: &ActivityLog) -> DomainResult<()> {
    let details = serde_json::to_string(&entry.details)
        .map_err(|e| DomainError::Internal(format!("Failed to encode activity details: {}", e)))?;
    conn.execute(
        "INSERT INTO activity_logs (board_id, entity_type, entity_id, action, details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.board_id,
            entry.entity_type.as_str(),
            entry.entity_id,
            entry.action.as_str(),
            details,
            now_millis()
        ],
    )?;
    Ok(())
}

/// Board that `id` belongs to, deleted rows included
pub(crate) fn board_of(conn: &Connection, kind: EntityKind, id: u32) -> DomainResult<Option<u32>> {
    let sql = match kind {
        EntityKind::Board => "SELECT id FROM boards WHERE id = ?1",
        EntityKind::List => "SELECT board_id FROM board_lists WHERE id = ?1",
        EntityKind::Card => {
            "SELECT l.board_id FROM cards c JOIN board_lists l ON l.id = c.list_id WHERE c.id = ?1"
        }
        EntityKind::ChecklistItem => {
            "SELECT l.board_id FROM checklist_items i
             JOIN cards c ON c.id = i.card_id
             JOIN board_lists l ON l.id = c.list_id
             WHERE i.id = ?1"
        }
        EntityKind::Comment => {
            "SELECT l.board_id FROM comments m
             JOIN cards c ON c.id = m.card_id
             JOIN board_lists l ON l.id = c.list_id
             WHERE m.id = ?1"
        }
    };
    Ok(conn.query_row(sql, params![id], |row| row.get(0)).optional()?)
}

/// Record `action` on `id`, resolving its board first
pub(crate) fn record_for(
    conn: &Connection,
    kind: EntityKind,
    id: u32,
    action: ActivityAction,
    details: serde_json::Value,
) -> DomainResult<()> {
    match board_of(conn, kind, id)? {
        Some(board_id) => record(conn, &ActivityLog::new(board_id, kind, id, action).with_details(details)),
        None => {
            tracing::warn!(entity = kind.as_str(), id, "no board for activity entry");
            Ok(())
        }
    }
}

type RawRow = (u32, u32, String, u32, String, String, Option<i64>);

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_entry((id, board_id, entity_type, entity_id, action, details, created_at): RawRow) -> DomainResult<ActivityLog> {
    let entity_type = EntityKind::from_db(&entity_type)
        .ok_or_else(|| DomainError::Internal(format!("Unknown activity entity type {}", entity_type)))?;
    let action = ActivityAction::from_db(&action)
        .ok_or_else(|| DomainError::Internal(format!("Unknown activity action {}", action)))?;
    let details = serde_json::from_str(&details)
        .map_err(|e| DomainError::Internal(format!("Corrupt activity details: {}", e)))?;
    Ok(ActivityLog {
        id,
        board_id,
        entity_type,
        entity_id,
        action,
        details,
        created_at,
    })
}
