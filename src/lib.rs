//! Kanban Board Backend
//!
//! Layered architecture:
//! - position: Pure fractional-position allocator
//! - domain: Core entities and business rules
//! - repository: SQLite data access, including transactional reordering
//! - config: Layered file and environment configuration

use std::path::PathBuf;

pub mod config;
pub mod domain;
pub mod position;
pub mod repository;

use config::AppConfig;
use domain::{DomainError, DomainResult};
use repository::{
    init_db, ActivityRepository, BoardRepository, CardRepository, ChecklistRepository, CommentRepository, DbState,
    ListRepository, WorkspaceRepository,
};

/// Application state shared by every caller
///
/// All repositories hold the same connection.
pub struct AppState {
    pub db_state: DbState,
    pub db_path: PathBuf,
    pub workspaces: WorkspaceRepository,
    pub boards: BoardRepository,
    pub lists: ListRepository,
    pub cards: CardRepository,
    pub checklists: ChecklistRepository,
    pub comments: CommentRepository,
    pub activities: ActivityRepository,
}

/// Start logging (if configured), open the database and build the repositories
pub async fn bootstrap(config: &AppConfig) -> DomainResult<AppState> {
    if let Some(log_dir) = config.log_dir() {
        match rolling_logger::init_logger(log_dir.to_path_buf(), &config.app_name) {
            Ok(()) => {}
            // Host already installed its own subscriber; keep it
            Err(rolling_logger::LoggerError::Subscriber(e)) => {
                tracing::warn!(error = %e, "rolling logger not installed");
            }
            Err(e) => return Err(DomainError::Internal(e.to_string())),
        }
    }

    let db_path = config.db_path.clone();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| DomainError::Internal(format!("Failed to create {}: {}", parent.display(), e)))?;
    }

    let db_state = init_db(&db_path).await?;
    let conn = db_state.conn.clone();
    tracing::info!(path = %db_path.display(), "database opened");

    Ok(AppState {
        db_state,
        db_path,
        workspaces: WorkspaceRepository::new(conn.clone()),
        boards: BoardRepository::new(conn.clone()),
        lists: ListRepository::new(conn.clone()),
        cards: CardRepository::new(conn.clone()),
        checklists: ChecklistRepository::new(conn.clone()),
        comments: CommentRepository::new(conn.clone()),
        activities: ActivityRepository::new(conn),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{BoardList, Board, Card, Workspace};
    use repository::{PositioningOperations, Repository};

    #[tokio::test]
    async fn test_bootstrap_creates_db_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            db_path: dir.path().join("nested").join("kanban.db"),
            log_dir: Some(dir.path().join("logs")),
            app_name: "KanbanTest".to_string(),
        };

        let state = bootstrap(&config).await.expect("bootstrap");
        assert!(state.db_state.is_initialized().await);
        assert!(config.db_path.exists());
        assert!(dir.path().join("logs").join("KanbanTest.log").exists());
        assert!(rolling_logger::recent_lines()
            .iter()
            .any(|line| line.contains("database opened")));
    }

    #[tokio::test]
    async fn test_repositories_share_connection() {
        let config = AppConfig {
            db_path: PathBuf::from(":memory:"),
            ..AppConfig::default()
        };
        let state = bootstrap(&config).await.unwrap();

        let ws = state.workspaces.create(&Workspace::new(0, "Home".to_string())).await.unwrap();
        let board = state.boards.create(&Board::new(0, ws.id, "Chores".to_string())).await.unwrap();
        let list = state.lists.create(&BoardList::new(0, board.id, "Todo".to_string())).await.unwrap();
        let a = state.cards.create(&Card::new(0, list.id, "Dishes".to_string())).await.unwrap();
        let b = state.cards.create(&Card::new(0, list.id, "Laundry".to_string())).await.unwrap();

        state.cards.move_to(b.id, list.id, 0, Some(b.version)).await.unwrap();
        let order: Vec<u32> = state
            .cards
            .list_by_list(list.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(order, vec![b.id, a.id]);
        assert_eq!(state.activities.count_by_board(board.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_skips_empty_log_dir() {
        let config = AppConfig {
            db_path: PathBuf::from(":memory:"),
            log_dir: Some(PathBuf::new()),
            ..AppConfig::default()
        };
        let state = bootstrap(&config).await.unwrap();
        assert!(state.db_state.is_initialized().await);
    }
}
