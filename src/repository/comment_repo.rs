//! Comment Repository

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::activity_repo;
use super::db::{not_initialized, now_millis, SharedConnection};
use super::traits::Repository;
use crate::domain::{ActivityAction, Comment, DomainError, DomainResult, EntityKind};

const COLUMNS: &str = "id, card_id, author, content, created_at, updated_at";

pub struct CommentRepository {
    conn: SharedConnection,
}

impl CommentRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Live comments of a card, newest first
    pub async fn list_by_card(&self, card_id: u32) -> DomainResult<Vec<Comment>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM comments WHERE card_id = ?1 AND deleted_at IS NULL ORDER BY created_at DESC, id DESC",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let comments = stmt
            .query_map(params![card_id], row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}

#[async_trait]
impl Repository<Comment> for CommentRepository {
    async fn create(&self, entity: &Comment) -> DomainResult<Comment> {
        let comment = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let card: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM cards WHERE id = ?1 AND deleted_at IS NULL",
                params![comment.card_id],
                |row| row.get(0),
            )
            .optional()?;
        if card.is_none() {
            return Err(DomainError::NotFound(format!("Card {} not found", comment.card_id)));
        }

        let now = now_millis();
        conn.execute(
            "INSERT INTO comments (card_id, author, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![comment.card_id, comment.author, comment.content, now],
        )?;

        Ok(Comment {
            id: conn.last_insert_rowid() as u32,
            created_at: Some(now),
            updated_at: Some(now),
            ..comment
        })
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Comment>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        find_comment(conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<Comment>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let sql = format!(
            "SELECT {} FROM comments WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let comments = stmt.query_map([], row_to_comment)?.collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    /// Only the content is editable
    async fn update(&self, entity: &Comment) -> DomainResult<Comment> {
        let comment = entity.validated()?;
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn.execute(
            "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
            params![comment.content, now_millis(), comment.id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Comment {} not found", comment.id)));
        }
        find_comment(conn, comment.id)?
            .ok_or_else(|| DomainError::NotFound(format!("Comment {} not found", comment.id)))
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE comments SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now_millis(), id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Comment {} not found", id)));
        }
        activity_repo::record_for(&tx, EntityKind::Comment, id, ActivityAction::Deleted, serde_json::json!({}))?;
        tx.commit()?;
        Ok(())
    }
}

fn find_comment(conn: &Connection, id: u32) -> DomainResult<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = ?1 AND deleted_at IS NULL", COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_comment).optional()?)
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        card_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
