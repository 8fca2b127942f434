//! List Repository
//!
//! SQLite-backed implementation for board lists. Ordering within a board goes
//! through [`PositioningOperations`](super::PositioningOperations).

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::activity_repo;
use super::db::{not_initialized, now_millis, SharedConnection};
use super::positioning::{self, OrderedStore, OrderedTable};
use super::traits::Repository;
use crate::domain::{ActivityAction, BoardList, DomainError, DomainResult, EntityKind};

const COLUMNS: &str = "id, board_id, name, position, is_archived, version, created_at, updated_at";

pub struct ListRepository {
    conn: SharedConnection,
}

impl ListRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Live lists of a board in display order
    pub async fn list_by_board(&self, board_id: u32) -> DomainResult<Vec<BoardList>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM board_lists WHERE board_id = ?1 AND deleted_at IS NULL ORDER BY position, id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lists = stmt
            .query_map(params![board_id], row_to_list)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }
}

impl OrderedStore for ListRepository {
    const TABLE: OrderedTable = OrderedTable::Lists;

    fn connection(&self) -> &SharedConnection {
        &self.conn
    }
}

#[async_trait]
impl Repository<BoardList> for ListRepository {
    /// Appends to the board unless a free positive position is supplied;
    /// a position already taken places the list right after its holder
    async fn create(&self, entity: &BoardList) -> DomainResult<BoardList> {
        let list = entity.validated()?;
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        positioning::ensure_container(&tx, OrderedTable::Lists, list.board_id)?;
        let position = positioning::place_new(&tx, OrderedTable::Lists, list.board_id, list.position)?;

        let now = now_millis();
        tx.execute(
            "INSERT INTO board_lists (board_id, name, position, is_archived, version, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![list.board_id, list.name, position, list.is_archived, now],
        )?;
        let id = tx.last_insert_rowid() as u32;
        tx.commit()?;

        Ok(BoardList {
            id,
            position,
            version: 0,
            created_at: Some(now),
            updated_at: Some(now),
            ..list
        })
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<BoardList>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        find_list(conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<BoardList>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM board_lists WHERE deleted_at IS NULL ORDER BY board_id, position, id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lists = stmt.query_map([], row_to_list)?.collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }

    /// Updates name and archive flag, guarded by `entity.version`
    ///
    /// Position and board are left alone; use `move_to` for those.
    async fn update(&self, entity: &BoardList) -> DomainResult<BoardList> {
        let list = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE board_lists SET name = ?1, is_archived = ?2, version = version + 1, updated_at = ?3
             WHERE id = ?4 AND version = ?5 AND deleted_at IS NULL",
            params![list.name, list.is_archived, now_millis(), list.id, list.version],
        )?;
        if changed == 0 {
            return Err(match find_list(conn, list.id)? {
                Some(current) => DomainError::Conflict(format!(
                    "List {} is at version {}, expected {}",
                    list.id, current.version, list.version
                )),
                None => DomainError::NotFound(format!("List {} not found", list.id)),
            });
        }

        find_list(conn, list.id)?.ok_or_else(|| DomainError::NotFound(format!("List {} not found", list.id)))
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now = now_millis();
        let changed = tx.execute(
            "UPDATE board_lists SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("List {} not found", id)));
        }

        cascade_from_lists(&tx, now, "SELECT ?2", id)?;
        activity_repo::record_for(&tx, EntityKind::List, id, ActivityAction::Deleted, serde_json::json!({}))?;
        tx.commit()?;
        Ok(())
    }
}

fn find_list(conn: &Connection, id: u32) -> DomainResult<Option<BoardList>> {
    let sql = format!("SELECT {} FROM board_lists WHERE id = ?1 AND deleted_at IS NULL", COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_list).optional()?)
}

/// Soft-delete the cards (and their contents) of the lists selected by `lists_sql`
pub(super) fn cascade_from_lists(conn: &Connection, now: i64, lists_sql: &str, id: u32) -> DomainResult<()> {
    conn.execute(
        &format!(
            "UPDATE cards SET deleted_at = ?1 WHERE list_id IN ({}) AND deleted_at IS NULL",
            lists_sql
        ),
        params![now, id],
    )?;
    let cards_sql = format!("SELECT id FROM cards WHERE list_id IN ({})", lists_sql);
    super::card_repo::cascade_from_cards(conn, now, &cards_sql, id)
}

fn row_to_list(row: &rusqlite::Row) -> rusqlite::Result<BoardList> {
    Ok(BoardList {
        id: row.get(0)?,
        board_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        is_archived: row.get(4)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
