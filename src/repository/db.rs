//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Connection shared by every repository; `None` until the database is opened
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    pub conn: SharedConnection,
    pub path: PathBuf,
}

impl DbState {
    /// Empty state; repositories built from it fail until a connection is installed
    pub fn new(path: PathBuf) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            path,
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

pub(crate) fn not_initialized() -> DomainError {
    DomainError::Internal("Database not initialized".to_string())
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Open (or create) the database at `db_path` and run migrations
///
/// `":memory:"` opens a private in-memory database.
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Internal(format!("Failed to open {}: {}", db_path.display(), e)))?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    run_migrations(&conn)?;

    let state = DbState::new(db_path.to_path_buf());
    *state.conn.lock().await = Some(conn);
    tracing::info!(path = %db_path.display(), "database ready");

    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS workspaces (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER,
            deleted_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS boards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            visibility TEXT NOT NULL DEFAULT 'workspace',
            background_image TEXT,
            created_at INTEGER,
            deleted_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS board_lists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            position REAL NOT NULL,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER,
            updated_at INTEGER,
            deleted_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            list_id INTEGER NOT NULL REFERENCES board_lists(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            position REAL NOT NULL,
            due_date INTEGER,
            is_archived INTEGER NOT NULL DEFAULT 0,
            cover_image TEXT,
            created_at INTEGER,
            updated_at INTEGER,
            deleted_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS checklist_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            position REAL NOT NULL,
            created_at INTEGER,
            updated_at INTEGER,
            deleted_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            author TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER,
            updated_at INTEGER,
            deleted_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS activity_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            board_id INTEGER NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            details TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        );",
    )?;

    // Optimistic-concurrency counters, added separately so older files pick them up
    for table in ["board_lists", "cards", "checklist_items"] {
        if !column_exists(conn, table, "version")? {
            conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN version INTEGER NOT NULL DEFAULT 0", table),
                [],
            )
            .map_err(|e| DomainError::Internal(format!("Failed to add version to {}: {}", table, e)))?;
        }
    }

    // Sibling lookups always filter by container and sort by position
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_boards_workspace ON boards(workspace_id);
        CREATE INDEX IF NOT EXISTS idx_lists_board ON board_lists(board_id, position);
        CREATE INDEX IF NOT EXISTS idx_cards_list ON cards(list_id, position);
        CREATE INDEX IF NOT EXISTS idx_checklist_card ON checklist_items(card_id, position);
        CREATE INDEX IF NOT EXISTS idx_comments_card ON comments(card_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_activity_board ON activity_logs(board_id, created_at);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_memory_db() {
        let state = init_db(Path::new(":memory:")).await.expect("init");
        assert!(state.is_initialized().await);

        let guard = state.conn.lock().await;
        let conn = guard.as_ref().unwrap();
        assert!(column_exists(conn, "cards", "version").unwrap());
        assert!(!column_exists(conn, "cards", "nonexistent").unwrap());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");

        drop(init_db(&path).await.expect("first open"));
        let state = init_db(&path).await.expect("second open");
        assert!(state.is_initialized().await);
    }

    #[tokio::test]
    async fn test_uninitialized_state() {
        let state = DbState::new(PathBuf::from("unused.db"));
        assert!(!state.is_initialized().await);
    }
}
