//! Shared Positioning Operations
//!
//! Lists, cards and checklist items all reorder the same way: read the live
//! siblings of the target container, ask the allocator for a position, write
//! it back. This module does that once, parameterised by [`OrderedTable`].
//!
//! Each reorder runs in an IMMEDIATE transaction, which takes SQLite's write
//! lock before the siblings are read. Callers that pass `expected_version`
//! get a `Conflict` instead of silently overwriting a concurrent move.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::activity_repo;
use super::db::{not_initialized, now_millis, SharedConnection};
use crate::domain::{ActivityAction, DomainError, DomainResult, EntityKind};
use crate::position::{self, Orderable};

/// Table holding an orderable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedTable {
    Lists,
    Cards,
    ChecklistItems,
}

impl OrderedTable {
    fn table(self) -> &'static str {
        match self {
            OrderedTable::Lists => "board_lists",
            OrderedTable::Cards => "cards",
            OrderedTable::ChecklistItems => "checklist_items",
        }
    }

    fn container_column(self) -> &'static str {
        match self {
            OrderedTable::Lists => "board_id",
            OrderedTable::Cards => "list_id",
            OrderedTable::ChecklistItems => "card_id",
        }
    }

    fn container_table(self) -> &'static str {
        match self {
            OrderedTable::Lists => "boards",
            OrderedTable::Cards => "board_lists",
            OrderedTable::ChecklistItems => "cards",
        }
    }

    fn entity_name(self) -> &'static str {
        match self {
            OrderedTable::Lists => "List",
            OrderedTable::Cards => "Card",
            OrderedTable::ChecklistItems => "Checklist item",
        }
    }

    fn entity_kind(self) -> EntityKind {
        match self {
            OrderedTable::Lists => EntityKind::List,
            OrderedTable::Cards => EntityKind::Card,
            OrderedTable::ChecklistItems => EntityKind::ChecklistItem,
        }
    }

    fn container_name(self) -> &'static str {
        match self {
            OrderedTable::Lists => "Board",
            OrderedTable::Cards => "List",
            OrderedTable::ChecklistItems => "Card",
        }
    }
}

/// Result of a move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub id: u32,
    pub container_id: u32,
    pub position: f64,
    /// Version after the move; pass it as `expected_version` next time
    pub version: u32,
    /// Whether the target container was rebalanced to make room
    pub rebalanced: bool,
}

/// Row projection used for sibling ordering
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sibling {
    pub id: u32,
    pub container_id: u32,
    pub position: f64,
}

impl Orderable for Sibling {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    fn container_id(&self) -> u32 {
        self.container_id
    }
}

/// Trait for reordering operations shared by every orderable repository
#[async_trait]
pub trait PositioningOperations {
    /// Position a new entity would get when appended to `container_id`
    async fn next_position(&self, container_id: u32) -> DomainResult<f64>;

    /// Move an entity into `container_id` so it sorts at `target_index`
    ///
    /// `target_index` counts the container's live siblings excluding the
    /// moved entity, so moving within one container uses the index the entity
    /// should end up at.
    async fn move_to(
        &self,
        id: u32,
        container_id: u32,
        target_index: usize,
        expected_version: Option<u32>,
    ) -> DomainResult<MoveOutcome>;

    /// Respace every live sibling of `container_id`; returns rows rewritten
    async fn rebalance(&self, container_id: u32) -> DomainResult<usize>;
}

/// Implemented by repositories whose rows are ordered by position
pub trait OrderedStore: Send + Sync {
    const TABLE: OrderedTable;

    fn connection(&self) -> &SharedConnection;
}

#[async_trait]
impl<R: OrderedStore> PositioningOperations for R {
    async fn next_position(&self, container_id: u32) -> DomainResult<f64> {
        let guard = self.connection().lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        next_position(conn, R::TABLE, container_id)
    }

    async fn move_to(
        &self,
        id: u32,
        container_id: u32,
        target_index: usize,
        expected_version: Option<u32>,
    ) -> DomainResult<MoveOutcome> {
        let mut guard = self.connection().lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        move_to(conn, R::TABLE, id, container_id, target_index, expected_version)
    }

    async fn rebalance(&self, container_id: u32) -> DomainResult<usize> {
        let mut guard = self.connection().lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        rebalance(conn, R::TABLE, container_id)
    }
}

/// Live siblings of `container_id` in display order, optionally minus one id
pub(crate) fn load_siblings(
    conn: &Connection,
    table: OrderedTable,
    container_id: u32,
    exclude: Option<u32>,
) -> DomainResult<Vec<Sibling>> {
    let sql = format!(
        "SELECT id, {col}, position FROM {t}
         WHERE {col} = ?1 AND deleted_at IS NULL AND id != ?2
         ORDER BY position, id",
        col = table.container_column(),
        t = table.table(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let siblings = stmt
        .query_map(params![container_id, exclude.unwrap_or(0)], |row| {
            Ok(Sibling {
                id: row.get(0)?,
                container_id: row.get(1)?,
                position: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(table = table.table(), container_id, count = siblings.len(), "loaded siblings");
    Ok(siblings)
}

pub(crate) fn next_position(conn: &Connection, table: OrderedTable, container_id: u32) -> DomainResult<f64> {
    let siblings = load_siblings(conn, table, container_id, None)?;
    Ok(position::append(&siblings))
}

/// Position for a row about to be inserted into `container_id`
///
/// A finite positive `requested` position is kept when it sits at least
/// `MIN_GAP` away from every live sibling. Otherwise the row goes where the
/// request sorts (or at the tail when there is no usable request), and the
/// container is respaced in place if that gap is exhausted. Must run inside
/// the caller's write transaction. Requests above [`position::MAX_POSITION`]
/// are rejected.
pub(crate) fn place_new(
    conn: &Connection,
    table: OrderedTable,
    container_id: u32,
    requested: f64,
) -> DomainResult<f64> {
    if requested.is_finite() && requested > position::MAX_POSITION {
        return Err(DomainError::InvalidInput(format!(
            "{} position {} is above the limit of {}",
            table.entity_name(),
            requested,
            position::MAX_POSITION
        )));
    }

    let mut siblings = load_siblings(conn, table, container_id, None)?;
    let requested = (requested.is_finite() && requested > 0.0).then_some(requested);

    let target_index = match requested {
        Some(wanted) => {
            let clear = siblings
                .iter()
                .all(|s| (s.position - wanted).abs() >= position::MIN_GAP);
            if clear {
                return Ok(wanted);
            }
            tracing::debug!(table = table.table(), container_id, wanted, "requested position taken");
            siblings.iter().filter(|s| s.position <= wanted).count()
        }
        None => siblings.len(),
    };

    let placement = position::plan_insert(&mut siblings, target_index)?;
    if placement.rebalanced {
        write_positions(conn, table, &siblings)?;
        tracing::info!(
            table = table.table(),
            container_id,
            count = siblings.len(),
            "rebalanced container before create"
        );
    }
    Ok(placement.position)
}

/// Fail with `NotFound` unless the container row exists and is live
pub(crate) fn ensure_container(conn: &Connection, table: OrderedTable, container_id: u32) -> DomainResult<()> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE id = ?1 AND deleted_at IS NULL",
        table.container_table()
    );
    let found: Option<i64> = conn.query_row(&sql, params![container_id], |row| row.get(0)).optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(DomainError::NotFound(format!(
            "{} {} not found",
            table.container_name(),
            container_id
        ))),
    }
}

fn write_positions(conn: &Connection, table: OrderedTable, siblings: &[Sibling]) -> DomainResult<()> {
    let sql = format!(
        "UPDATE {} SET position = ?1, version = version + 1, updated_at = ?2 WHERE id = ?3",
        table.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let now = now_millis();
    for sibling in siblings {
        stmt.execute(params![sibling.position, now, sibling.id])?;
    }
    Ok(())
}

pub(crate) fn move_to(
    conn: &mut Connection,
    table: OrderedTable,
    id: u32,
    container_id: u32,
    target_index: usize,
    expected_version: Option<u32>,
) -> DomainResult<MoveOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let sql = format!(
        "SELECT {}, version FROM {} WHERE id = ?1 AND deleted_at IS NULL",
        table.container_column(),
        table.table()
    );
    let current: Option<(u32, u32)> = tx
        .query_row(&sql, params![id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    let (from_container, version) = current
        .ok_or_else(|| DomainError::NotFound(format!("{} {} not found", table.entity_name(), id)))?;

    if let Some(expected) = expected_version {
        if expected != version {
            tracing::warn!(
                table = table.table(),
                id,
                expected,
                actual = version,
                "stale move rejected"
            );
            return Err(DomainError::Conflict(format!(
                "{} {} is at version {}, expected {}",
                table.entity_name(),
                id,
                version,
                expected
            )));
        }
    }

    ensure_container(&tx, table, container_id)?;

    let mut siblings = load_siblings(&tx, table, container_id, Some(id))?;
    let placement = position::plan_insert(&mut siblings, target_index).map_err(|e| {
        tracing::warn!(table = table.table(), container_id, error = %e, "misordered siblings");
        e
    })?;
    if placement.rebalanced {
        write_positions(&tx, table, &siblings)?;
        tracing::info!(
            table = table.table(),
            container_id,
            count = siblings.len(),
            "rebalanced container before insert"
        );
    }

    let new_version = version + 1;
    let sql = format!(
        "UPDATE {} SET {} = ?1, position = ?2, version = ?3, updated_at = ?4 WHERE id = ?5",
        table.table(),
        table.container_column()
    );
    tx.execute(&sql, params![container_id, placement.position, new_version, now_millis(), id])?;
    activity_repo::record_for(
        &tx,
        table.entity_kind(),
        id,
        ActivityAction::Moved,
        serde_json::json!({
            "from": from_container,
            "to": container_id,
            "index": target_index,
            "position": placement.position,
            "rebalanced": placement.rebalanced,
        }),
    )?;
    tx.commit()?;

    tracing::info!(
        table = table.table(),
        id,
        from = from_container,
        to = container_id,
        index = target_index,
        position = placement.position,
        "moved"
    );

    Ok(MoveOutcome {
        id,
        container_id,
        position: placement.position,
        version: new_version,
        rebalanced: placement.rebalanced,
    })
}

pub(crate) fn rebalance(conn: &mut Connection, table: OrderedTable, container_id: u32) -> DomainResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut siblings = load_siblings(&tx, table, container_id, None)?;
    position::rebalance(&mut siblings);
    write_positions(&tx, table, &siblings)?;
    tx.commit()?;

    tracing::info!(table = table.table(), container_id, count = siblings.len(), "rebalanced container");
    Ok(siblings.len())
}
