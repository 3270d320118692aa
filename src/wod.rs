//! Workout of the day, scheduled per squad by an admin.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::admin::{self, AdminError};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workout {
  pub id: i64,
  pub squad_id: i64,
  pub scheduled_for: NaiveDate,
  pub title: String,
  pub description: Option<String>,
  pub created_by: String,
}

/// Set the workout for a squad on a date, replacing any earlier one
pub async fn schedule_workout(
  pool: &SqlitePool,
  admin_id: &str,
  squad_id: i64,
  date: NaiveDate,
  title: &str,
  description: Option<&str>,
) -> Result<Workout, AdminError> {
  admin::require_admin(pool, admin_id).await?;
  admin::ensure_squad(pool, squad_id).await?;
  let title = admin::required_name(title, "Workout")?;
  let description = description.map(str::trim).filter(|d| !d.is_empty());

  let workout = sqlx::query_as::<_, Workout>(
    r#"
    INSERT INTO workouts_of_the_day (squad_id, scheduled_for, title, description, created_by)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(squad_id, scheduled_for) DO UPDATE SET
      title = excluded.title,
      description = excluded.description,
      created_by = excluded.created_by
    RETURNING id, squad_id, scheduled_for, title, description, created_by
    "#,
  )
  .bind(squad_id)
  .bind(date)
  .bind(&title)
  .bind(description)
  .bind(admin_id)
  .fetch_one(pool)
  .await?;

  info!(squad_id, %date, title = %workout.title, "Workout scheduled");
  Ok(workout)
}

/// Workout for the user's approved squad. `None` without a squad or schedule.
pub async fn workout_of_the_day(
  pool: &SqlitePool,
  user_id: &str,
  date: NaiveDate,
) -> Result<Option<Workout>, String> {
  sqlx::query_as::<_, Workout>(
    r#"
    SELECT w.id, w.squad_id, w.scheduled_for, w.title, w.description, w.created_by
    FROM workouts_of_the_day w
    JOIN squad_members sm ON sm.squad_id = w.squad_id AND sm.status = 'approved'
    WHERE sm.user_id = ?1 AND w.scheduled_for = ?2
    "#,
  )
  .bind(user_id)
  .bind(date)
  .fetch_optional(pool)
  .await
  .map_err(|e| format!("Failed to load workout: {}", e))
}
