//! Card Repository
//!
//! SQLite-backed implementation for cards. Moving a card between lists is
//! `move_to` from [`PositioningOperations`](super::PositioningOperations),
//! which writes the new list and position together.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::activity_repo;
use super::db::{not_initialized, now_millis, SharedConnection};
use super::positioning::{self, OrderedStore, OrderedTable};
use super::traits::Repository;
use crate::domain::{ActivityAction, Card, DomainError, DomainResult, EntityKind};

const COLUMNS: &str =
    "id, list_id, title, description, position, due_date, is_archived, cover_image, version, created_at, updated_at";

pub struct CardRepository {
    conn: SharedConnection,
}

impl CardRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Live cards of a list in display order, archived ones included
    pub async fn list_by_list(&self, list_id: u32) -> DomainResult<Vec<Card>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM cards WHERE list_id = ?1 AND deleted_at IS NULL ORDER BY position, id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let cards = stmt
            .query_map(params![list_id], row_to_card)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    /// Archive or restore a card without touching its other fields
    pub async fn set_archived(&self, id: u32, archived: bool) -> DomainResult<Card> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE cards SET is_archived = ?1, version = version + 1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
            params![archived, now_millis(), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Card {} not found", id)));
        }
        find_card(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("Card {} not found", id)))
    }
}

impl OrderedStore for CardRepository {
    const TABLE: OrderedTable = OrderedTable::Cards;

    fn connection(&self) -> &SharedConnection {
        &self.conn
    }
}

#[async_trait]
impl Repository<Card> for CardRepository {
    /// Appends to the list unless a free positive position is supplied;
    /// a position already taken places the card right after its holder
    async fn create(&self, entity: &Card) -> DomainResult<Card> {
        let card = entity.validated()?;
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        positioning::ensure_container(&tx, OrderedTable::Cards, card.list_id)?;
        let position = positioning::place_new(&tx, OrderedTable::Cards, card.list_id, card.position)?;

        let now = now_millis();
        tx.execute(
            "INSERT INTO cards (list_id, title, description, position, due_date, is_archived, cover_image, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                card.list_id,
                card.title,
                card.description,
                position,
                card.due_date,
                card.is_archived,
                card.cover_image,
                now
            ],
        )?;
        let id = tx.last_insert_rowid() as u32;
        tx.commit()?;

        tracing::debug!(card_id = id, list_id = card.list_id, position, "card created");
        Ok(Card {
            id,
            position,
            version: 0,
            created_at: Some(now),
            updated_at: Some(now),
            ..card
        })
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Card>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        find_card(conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<Card>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM cards WHERE deleted_at IS NULL ORDER BY list_id, position, id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let cards = stmt.query_map([], row_to_card)?.collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    /// Updates content fields, guarded by `entity.version`
    ///
    /// List and position are left alone; use `move_to` for those.
    async fn update(&self, entity: &Card) -> DomainResult<Card> {
        let card = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE cards SET title = ?1, description = ?2, due_date = ?3, is_archived = ?4, cover_image = ?5,
                version = version + 1, updated_at = ?6
             WHERE id = ?7 AND version = ?8 AND deleted_at IS NULL",
            params![
                card.title,
                card.description,
                card.due_date,
                card.is_archived,
                card.cover_image,
                now_millis(),
                card.id,
                card.version
            ],
        )?;
        if changed == 0 {
            return Err(match find_card(conn, card.id)? {
                Some(current) => DomainError::Conflict(format!(
                    "Card {} is at version {}, expected {}",
                    card.id, current.version, card.version
                )),
                None => DomainError::NotFound(format!("Card {} not found", card.id)),
            });
        }

        find_card(conn, card.id)?.ok_or_else(|| DomainError::NotFound(format!("Card {} not found", card.id)))
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now = now_millis();
        let changed = tx.execute(
            "UPDATE cards SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Card {} not found", id)));
        }

        cascade_from_cards(&tx, now, "SELECT ?2", id)?;
        activity_repo::record_for(&tx, EntityKind::Card, id, ActivityAction::Deleted, serde_json::json!({}))?;
        tx.commit()?;
        Ok(())
    }
}

fn find_card(conn: &Connection, id: u32) -> DomainResult<Option<Card>> {
    let sql = format!("SELECT {} FROM cards WHERE id = ?1 AND deleted_at IS NULL", COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_card).optional()?)
}

/// Soft-delete checklist items and comments of the cards selected by `cards_sql`
pub(super) fn cascade_from_cards(conn: &Connection, now: i64, cards_sql: &str, id: u32) -> DomainResult<()> {
    for table in ["checklist_items", "comments"] {
        conn.execute(
            &format!(
                "UPDATE {} SET deleted_at = ?1 WHERE card_id IN ({}) AND deleted_at IS NULL",
                table, cards_sql
            ),
            params![now, id],
        )?;
    }
    Ok(())
}

fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        list_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        position: row.get(4)?,
        due_date: row.get(5)?,
        is_archived: row.get(6)?,
        cover_image: row.get(7)?,
        version: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
