//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for users, squads, activities, goals and logs
//! - Date helpers
//! - Helper assertions

use chrono::{Duration, Local, NaiveDate};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Seed Helpers
/// ---------------------------------------------------------------------------

pub async fn seed_user(pool: &SqlitePool, id: &str, name: &str, is_admin: bool) {
  sqlx::query("INSERT INTO users (id, display_name, is_admin) VALUES (?1, ?2, ?3)")
    .bind(id)
    .bind(name)
    .bind(is_admin)
    .execute(pool)
    .await
    .expect("Failed to seed user");
}

/// Returns the squad id
pub async fn seed_squad(pool: &SqlitePool, name: &str) -> i64 {
  sqlx::query("INSERT INTO squads (name) VALUES (?1)")
    .bind(name)
    .execute(pool)
    .await
    .expect("Failed to seed squad")
    .last_insert_rowid()
}

pub async fn seed_membership(pool: &SqlitePool, squad_id: i64, user_id: &str, status: &str) {
  sqlx::query("INSERT INTO squad_members (squad_id, user_id, status) VALUES (?1, ?2, ?3)")
    .bind(squad_id)
    .bind(user_id)
    .bind(status)
    .execute(pool)
    .await
    .expect("Failed to seed membership");
}

/// Returns the activity id
pub async fn seed_activity(
  pool: &SqlitePool,
  squad_id: i64,
  name: &str,
  points: i64,
  display_order: i64,
) -> i64 {
  sqlx::query(
    "INSERT INTO squad_activities (squad_id, name, points, display_order) VALUES (?1, ?2, ?3, ?4)",
  )
  .bind(squad_id)
  .bind(name)
  .bind(points)
  .bind(display_order)
  .execute(pool)
  .await
  .expect("Failed to seed activity")
  .last_insert_rowid()
}

/// Returns the template id
pub async fn seed_goal_template(pool: &SqlitePool, name: &str, points: i64) -> i64 {
  sqlx::query("INSERT INTO goal_templates (name, points) VALUES (?1, ?2)")
    .bind(name)
    .bind(points)
    .execute(pool)
    .await
    .expect("Failed to seed goal template")
    .last_insert_rowid()
}

pub async fn seed_goal(pool: &SqlitePool, user_id: &str, slot: i64, template_id: i64) {
  sqlx::query("INSERT INTO user_goals (user_id, slot, template_id) VALUES (?1, ?2, ?3)")
    .bind(user_id)
    .bind(slot)
    .bind(template_id)
    .execute(pool)
    .await
    .expect("Failed to seed goal");
}

/// Insert a raw daily log row, bypassing the submitter
pub async fn seed_daily_log(
  pool: &SqlitePool,
  user_id: &str,
  date: NaiveDate,
  points: i64,
  custom_logs: &str,
  junk_food: bool,
) {
  sqlx::query(
    r#"
    INSERT INTO daily_logs (user_id, log_date, daily_points, custom_logs, junk_food, negative_points)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
  )
  .bind(user_id)
  .bind(date)
  .bind(points)
  .bind(custom_logs)
  .bind(junk_food)
  .bind(if junk_food { -5 } else { 0 })
  .execute(pool)
  .await
  .expect("Failed to seed daily log");
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Local calendar date N days ago
pub fn date_days_ago(days: i64) -> NaiveDate {
  Local::now().date_naive() - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('users', 'squads', 'daily_logs', 'weekly_bonuses')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 4, "Expected 4 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_helpers_link_up() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    let squad = seed_squad(&pool, "Blue").await;
    seed_membership(&pool, squad, "u1", "approved").await;
    seed_activity(&pool, squad, "Run", 10, 1).await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_checkin_items WHERE user_id = 'u1'")
      .fetch_one(&pool)
      .await
      .expect("Failed to count items");
    assert_eq!(count, 1);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_date_helper_counts_back() {
    assert_eq!(date_days_ago(0) - date_days_ago(7), Duration::days(7));
  }
}
