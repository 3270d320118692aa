use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tauri::Manager;
use tokio::sync::Mutex;
use tracing::info;

use crate::checkin::context::ContextStrategy;
use crate::checkin::session::CheckInSession;
use crate::config::AppConfig;

pub type DbPool = SqlitePool;

/// Application state holding the database connection pool
pub struct AppState {
  pub db: DbPool,
  /// Resolved once at start-up, see `checkin::context::detect_strategy`
  pub context_strategy: ContextStrategy,
  /// Open check-in sessions keyed by user id. Holds at most one entry, since
  /// opening a session for another user clears the map.
  pub sessions: Mutex<HashMap<String, CheckInSession>>,
}

impl AppState {
  pub fn new(db: DbPool, context_strategy: ContextStrategy) -> Self {
    Self {
      db,
      context_strategy,
      sessions: Mutex::new(HashMap::new()),
    }
  }
}

/// Get the path to the database file
/// Stored in: <app data dir>/com.samleuthold.squad-challenge/squad-challenge.db
fn get_db_path<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<PathBuf, Box<dyn std::error::Error>> {
  let data_dir = app
    .path()
    .app_data_dir()
    .map_err(|e| format!("Failed to get app data dir: {}", e))?;

  // Create directory if it doesn't exist
  fs::create_dir_all(&data_dir)?;

  Ok(data_dir.join("squad-challenge.db"))
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db<R: tauri::Runtime>(
  app: &tauri::AppHandle<R>,
  config: &AppConfig,
) -> Result<DbPool, Box<dyn std::error::Error>> {
  let db_url = match &config.database_url {
    Some(url) => url.clone(),
    None => format!("sqlite://{}?mode=rwc", get_db_path(app)?.display()),
  };

  info!(url = %db_url, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
