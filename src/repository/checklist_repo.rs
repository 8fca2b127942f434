//! Checklist Repository
//!
//! Checklist items are ordered within their card like cards within a list.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::activity_repo;
use super::db::{not_initialized, now_millis, SharedConnection};
use super::positioning::{self, OrderedStore, OrderedTable};
use super::traits::Repository;
use crate::domain::{ActivityAction, ChecklistItem, DomainError, DomainResult, EntityKind};

const COLUMNS: &str = "id, card_id, title, is_completed, position, version, created_at, updated_at";

pub struct ChecklistRepository {
    conn: SharedConnection,
}

impl ChecklistRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Live checklist items of a card in display order
    pub async fn list_by_card(&self, card_id: u32) -> DomainResult<Vec<ChecklistItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM checklist_items WHERE card_id = ?1 AND deleted_at IS NULL ORDER BY position, id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![card_id], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Flip completion; returns the stored item
    pub async fn toggle(&self, id: u32) -> DomainResult<ChecklistItem> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE checklist_items SET is_completed = NOT is_completed, version = version + 1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![now_millis(), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Checklist item {} not found", id)));
        }
        let item = find_item(&tx, id)?
            .ok_or_else(|| DomainError::NotFound(format!("Checklist item {} not found", id)))?;

        let action = if item.is_completed {
            ActivityAction::Completed
        } else {
            ActivityAction::Reopened
        };
        activity_repo::record_for(
            &tx,
            EntityKind::ChecklistItem,
            id,
            action,
            serde_json::json!({ "card_id": item.card_id, "title": item.title }),
        )?;
        tx.commit()?;
        Ok(item)
    }
}

impl OrderedStore for ChecklistRepository {
    const TABLE: OrderedTable = OrderedTable::ChecklistItems;

    fn connection(&self) -> &SharedConnection {
        &self.conn
    }
}

#[async_trait]
impl Repository<ChecklistItem> for ChecklistRepository {
    async fn create(&self, entity: &ChecklistItem) -> DomainResult<ChecklistItem> {
        let item = entity.validated()?;
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        positioning::ensure_container(&tx, OrderedTable::ChecklistItems, item.card_id)?;
        let position = positioning::place_new(&tx, OrderedTable::ChecklistItems, item.card_id, item.position)?;

        let now = now_millis();
        tx.execute(
            "INSERT INTO checklist_items (card_id, title, is_completed, position, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![item.card_id, item.title, item.is_completed, position, now],
        )?;
        let id = tx.last_insert_rowid() as u32;
        tx.commit()?;

        Ok(ChecklistItem {
            id,
            position,
            version: 0,
            created_at: Some(now),
            updated_at: Some(now),
            ..item
        })
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<ChecklistItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        find_item(conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<ChecklistItem>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM checklist_items WHERE deleted_at IS NULL ORDER BY card_id, position, id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt.query_map([], row_to_item)?.collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn update(&self, entity: &ChecklistItem) -> DomainResult<ChecklistItem> {
        let item = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE checklist_items SET title = ?1, is_completed = ?2, version = version + 1, updated_at = ?3
             WHERE id = ?4 AND version = ?5 AND deleted_at IS NULL",
            params![item.title, item.is_completed, now_millis(), item.id, item.version],
        )?;
        if changed == 0 {
            return Err(match find_item(conn, item.id)? {
                Some(current) => DomainError::Conflict(format!(
                    "Checklist item {} is at version {}, expected {}",
                    item.id, current.version, item.version
                )),
                None => DomainError::NotFound(format!("Checklist item {} not found", item.id)),
            });
        }

        find_item(conn, item.id)?
            .ok_or_else(|| DomainError::NotFound(format!("Checklist item {} not found", item.id)))
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE checklist_items SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now_millis(), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Checklist item {} not found", id)));
        }
        activity_repo::record_for(&tx, EntityKind::ChecklistItem, id, ActivityAction::Deleted, serde_json::json!({}))?;
        tx.commit()?;
        Ok(())
    }
}

fn find_item(conn: &Connection, id: u32) -> DomainResult<Option<ChecklistItem>> {
    let sql = format!("SELECT {} FROM checklist_items WHERE id = ?1 AND deleted_at IS NULL", COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_item).optional()?)
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<ChecklistItem> {
    Ok(ChecklistItem {
        id: row.get(0)?,
        card_id: row.get(1)?,
        title: row.get(2)?,
        is_completed: row.get(3)?,
        position: row.get(4)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
