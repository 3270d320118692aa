//! Squad administration: squads, membership, activities, goals, weekly
//! bonus points and per-squad analytics.
//!
//! Every operation takes the acting admin's id and checks `users.is_admin`
//! before touching anything.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::audit::{self, AuditAction};
use crate::models::{GoalTemplate, Squad, SquadActivity, SquadMember, User};

/// Upper bound for one discretionary weekly award
pub const MAX_WEEKLY_BONUS: i64 = 50;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AdminError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("{0} is not an admin")]
  Forbidden(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid input: {0}")]
  Invalid(String),

  #[error("Conflict: {0}")]
  Conflict(String),
}

impl From<sqlx::Error> for AdminError {
  fn from(e: sqlx::Error) -> Self {
    match &e {
      sqlx::Error::Database(db) if db.is_unique_violation() => AdminError::Conflict(db.message().to_string()),
      _ => AdminError::Database(e.to_string()),
    }
  }
}

pub async fn require_admin(pool: &SqlitePool, admin_id: &str) -> Result<(), AdminError> {
  let is_admin: Option<bool> = sqlx::query_scalar("SELECT is_admin FROM users WHERE id = ?1")
    .bind(admin_id)
    .fetch_optional(pool)
    .await?;

  match is_admin {
    Some(true) => Ok(()),
    _ => Err(AdminError::Forbidden(admin_id.to_string())),
  }
}

async fn ensure_user(pool: &SqlitePool, user_id: &str) -> Result<(), AdminError> {
  let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?1")
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
  exists
    .map(|_| ())
    .ok_or_else(|| AdminError::NotFound(format!("user {}", user_id)))
}

pub(crate) async fn ensure_squad(pool: &SqlitePool, squad_id: i64) -> Result<(), AdminError> {
  let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM squads WHERE id = ?1")
    .bind(squad_id)
    .fetch_optional(pool)
    .await?;
  exists
    .map(|_| ())
    .ok_or_else(|| AdminError::NotFound(format!("squad {}", squad_id)))
}

pub(crate) fn required_name(raw: &str, what: &str) -> Result<String, AdminError> {
  let name = raw.trim();
  if name.is_empty() {
    return Err(AdminError::Invalid(format!("{} name is required", what)));
  }
  Ok(name.to_string())
}

/// ---------------------------------------------------------------------------
/// Users
/// ---------------------------------------------------------------------------

const USER_COLUMNS: &str = "id, display_name, is_admin, created_at";

/// Create or rename a participant. The first user registered while no admin
/// exists becomes the admin.
pub async fn register_user(pool: &SqlitePool, user_id: &str, display_name: &str) -> Result<User, AdminError> {
  let user_id = user_id.trim();
  if user_id.is_empty() {
    return Err(AdminError::Invalid("User id is required".into()));
  }
  let display_name = required_name(display_name, "Display")?;

  let user = sqlx::query_as::<_, User>(&format!(
    r#"
    INSERT INTO users (id, display_name, is_admin)
    VALUES (?1, ?2, NOT EXISTS (SELECT 1 FROM users WHERE is_admin = 1))
    ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name
    RETURNING {}
    "#,
    USER_COLUMNS
  ))
  .bind(user_id)
  .bind(&display_name)
  .fetch_one(pool)
  .await?;

  info!(user_id = %user.id, is_admin = user.is_admin, "User registered");
  Ok(user)
}

pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, AdminError> {
  let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
  Ok(user)
}

/// Grant or revoke admin rights. Admins cannot revoke their own.
pub async fn set_admin(pool: &SqlitePool, admin_id: &str, user_id: &str, is_admin: bool) -> Result<User, AdminError> {
  require_admin(pool, admin_id).await?;
  if admin_id == user_id && !is_admin {
    return Err(AdminError::Invalid("Admins cannot revoke their own access".into()));
  }

  sqlx::query_as::<_, User>(&format!(
    "UPDATE users SET is_admin = ?2 WHERE id = ?1 RETURNING {}",
    USER_COLUMNS
  ))
  .bind(user_id)
  .bind(is_admin)
  .fetch_optional(pool)
  .await?
  .ok_or_else(|| AdminError::NotFound(format!("user {}", user_id)))
}

/// ---------------------------------------------------------------------------
/// Squads & Membership
/// ---------------------------------------------------------------------------

pub async fn create_squad(pool: &SqlitePool, admin_id: &str, name: &str) -> Result<Squad, AdminError> {
  require_admin(pool, admin_id).await?;
  let name = required_name(name, "Squad")?;

  let squad = sqlx::query_as::<_, Squad>(
    "INSERT INTO squads (name) VALUES (?1) RETURNING id, name, created_at",
  )
  .bind(&name)
  .fetch_one(pool)
  .await?;

  info!(squad_id = squad.id, name = %squad.name, "Squad created");
  Ok(squad)
}

pub async fn list_squads(pool: &SqlitePool) -> Result<Vec<Squad>, AdminError> {
  let squads = sqlx::query_as::<_, Squad>("SELECT id, name, created_at FROM squads ORDER BY name")
    .fetch_all(pool)
    .await?;
  Ok(squads)
}

/// Participant asks to join a squad; stays pending until an admin approves
pub async fn request_membership(
  pool: &SqlitePool,
  user_id: &str,
  squad_id: i64,
) -> Result<SquadMember, AdminError> {
  ensure_user(pool, user_id).await?;
  ensure_squad(pool, squad_id).await?;

  sqlx::query(
    r#"
    INSERT INTO squad_members (squad_id, user_id, status)
    VALUES (?1, ?2, 'pending')
    ON CONFLICT(squad_id, user_id) DO NOTHING
    "#,
  )
  .bind(squad_id)
  .bind(user_id)
  .execute(pool)
  .await?;

  let member = sqlx::query_as::<_, SquadMember>(
    "SELECT id, squad_id, user_id, status, joined_at FROM squad_members WHERE squad_id = ?1 AND user_id = ?2",
  )
  .bind(squad_id)
  .bind(user_id)
  .fetch_one(pool)
  .await?;
  Ok(member)
}

/// Approve a pending request. Users already approved elsewhere must be
/// transferred instead.
pub async fn approve_membership(
  pool: &SqlitePool,
  admin_id: &str,
  squad_id: i64,
  user_id: &str,
) -> Result<(), AdminError> {
  require_admin(pool, admin_id).await?;

  let other: Option<i64> = sqlx::query_scalar(
    "SELECT squad_id FROM squad_members WHERE user_id = ?1 AND status = 'approved' AND squad_id != ?2",
  )
  .bind(user_id)
  .bind(squad_id)
  .fetch_optional(pool)
  .await?;
  if let Some(other) = other {
    return Err(AdminError::Conflict(format!(
      "{} is already approved in squad {}",
      user_id, other
    )));
  }

  let result = sqlx::query(
    "UPDATE squad_members SET status = 'approved' WHERE squad_id = ?1 AND user_id = ?2",
  )
  .bind(squad_id)
  .bind(user_id)
  .execute(pool)
  .await?;
  if result.rows_affected() == 0 {
    return Err(AdminError::NotFound(format!(
      "membership request for {} in squad {}",
      user_id, squad_id
    )));
  }

  audit::record_audit_best_effort(
    pool,
    user_id,
    AuditAction::MemberApproved,
    serde_json::json!({ "squad_id": squad_id, "by": admin_id }),
  )
  .await;
  Ok(())
}

/// Move a user into `to_squad` atomically: the old approved membership is
/// removed and the new one approved in one transaction.
pub async fn transfer_member(
  pool: &SqlitePool,
  admin_id: &str,
  user_id: &str,
  to_squad: i64,
) -> Result<(), AdminError> {
  require_admin(pool, admin_id).await?;
  ensure_user(pool, user_id).await?;
  ensure_squad(pool, to_squad).await?;

  let mut tx = pool.begin().await?;

  let from_squad: Option<i64> = sqlx::query_scalar(
    "SELECT squad_id FROM squad_members WHERE user_id = ?1 AND status = 'approved'",
  )
  .bind(user_id)
  .fetch_optional(&mut *tx)
  .await?;

  sqlx::query("DELETE FROM squad_members WHERE user_id = ?1 AND squad_id != ?2 AND status = 'approved'")
    .bind(user_id)
    .bind(to_squad)
    .execute(&mut *tx)
    .await?;

  sqlx::query(
    r#"
    INSERT INTO squad_members (squad_id, user_id, status)
    VALUES (?1, ?2, 'approved')
    ON CONFLICT(squad_id, user_id) DO UPDATE SET status = 'approved'
    "#,
  )
  .bind(to_squad)
  .bind(user_id)
  .execute(&mut *tx)
  .await?;

  tx.commit().await?;

  info!(user_id, ?from_squad, to_squad, "Member transferred");
  audit::record_audit_best_effort(
    pool,
    user_id,
    AuditAction::MemberTransferred,
    serde_json::json!({ "from": from_squad, "to": to_squad, "by": admin_id }),
  )
  .await;
  Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberOverview {
  pub user_id: String,
  pub display_name: String,
  pub status: String,
  /// Points logged on the requested date; `None` if not checked in
  pub points_on_date: Option<i64>,
  pub note_to_admin: Option<String>,
  /// Derived from the daily and bonus ledgers
  pub total_points: i64,
}

/// Members of a squad with their check-in state for `date`
pub async fn squad_members_for_admin(
  pool: &SqlitePool,
  admin_id: &str,
  squad_id: i64,
  date: NaiveDate,
) -> Result<Vec<MemberOverview>, AdminError> {
  require_admin(pool, admin_id).await?;

  let members = sqlx::query_as::<_, MemberOverview>(
    r#"
    SELECT
      u.id AS user_id,
      u.display_name,
      sm.status,
      dl.daily_points AS points_on_date,
      dl.note_to_admin,
      COALESCE((SELECT SUM(d.daily_points) FROM daily_logs d WHERE d.user_id = u.id), 0)
        + COALESCE((SELECT SUM(b.points) FROM weekly_bonuses b WHERE b.user_id = u.id), 0)
        AS total_points
    FROM squad_members sm
    JOIN users u ON u.id = sm.user_id
    LEFT JOIN daily_logs dl ON dl.user_id = u.id AND dl.log_date = ?2
    WHERE sm.squad_id = ?1
    ORDER BY u.display_name
    "#,
  )
  .bind(squad_id)
  .bind(date)
  .fetch_all(pool)
  .await?;

  Ok(members)
}

/// ---------------------------------------------------------------------------
/// Activities
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
  pub name: String,
  pub description: Option<String>,
  pub points: i64,
  pub display_order: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityUpdate {
  pub name: Option<String>,
  pub description: Option<String>,
  pub points: Option<i64>,
  pub display_order: Option<i64>,
  pub enabled: Option<bool>,
}

const ACTIVITY_COLUMNS: &str = "id, squad_id, name, description, points, display_order, enabled";

pub async fn add_activity(
  pool: &SqlitePool,
  admin_id: &str,
  squad_id: i64,
  activity: &NewActivity,
) -> Result<SquadActivity, AdminError> {
  require_admin(pool, admin_id).await?;
  ensure_squad(pool, squad_id).await?;
  let name = required_name(&activity.name, "Activity")?;
  if activity.points < 0 {
    return Err(AdminError::Invalid("Activity points must be zero or more".into()));
  }

  let row = sqlx::query_as::<_, SquadActivity>(&format!(
    r#"
    INSERT INTO squad_activities (squad_id, name, description, points, display_order)
    VALUES (?1, ?2, ?3, ?4, ?5)
    RETURNING {}
    "#,
    ACTIVITY_COLUMNS
  ))
  .bind(squad_id)
  .bind(&name)
  .bind(&activity.description)
  .bind(activity.points)
  .bind(activity.display_order)
  .fetch_one(pool)
  .await?;

  Ok(row)
}

pub async fn update_activity(
  pool: &SqlitePool,
  admin_id: &str,
  activity_id: i64,
  update: &ActivityUpdate,
) -> Result<SquadActivity, AdminError> {
  require_admin(pool, admin_id).await?;
  let name = match &update.name {
    Some(raw) => Some(required_name(raw, "Activity")?),
    None => None,
  };
  if update.points.is_some_and(|p| p < 0) {
    return Err(AdminError::Invalid("Activity points must be zero or more".into()));
  }

  let row = sqlx::query_as::<_, SquadActivity>(&format!(
    r#"
    UPDATE squad_activities SET
      name = COALESCE(?1, name),
      description = COALESCE(?2, description),
      points = COALESCE(?3, points),
      display_order = COALESCE(?4, display_order),
      enabled = COALESCE(?5, enabled)
    WHERE id = ?6
    RETURNING {}
    "#,
    ACTIVITY_COLUMNS
  ))
  .bind(name)
  .bind(&update.description)
  .bind(update.points)
  .bind(update.display_order)
  .bind(update.enabled)
  .bind(activity_id)
  .fetch_optional(pool)
  .await?;

  row.ok_or_else(|| AdminError::NotFound(format!("activity {}", activity_id)))
}

/// All activities of a squad, disabled ones included
pub async fn list_activities(pool: &SqlitePool, squad_id: i64) -> Result<Vec<SquadActivity>, AdminError> {
  let rows = sqlx::query_as::<_, SquadActivity>(&format!(
    "SELECT {} FROM squad_activities WHERE squad_id = ?1 ORDER BY display_order, id",
    ACTIVITY_COLUMNS
  ))
  .bind(squad_id)
  .fetch_all(pool)
  .await?;
  Ok(rows)
}

/// ---------------------------------------------------------------------------
/// Goals
/// ---------------------------------------------------------------------------

pub async fn create_goal_template(
  pool: &SqlitePool,
  admin_id: &str,
  name: &str,
  description: Option<&str>,
  points: i64,
) -> Result<GoalTemplate, AdminError> {
  require_admin(pool, admin_id).await?;
  let name = required_name(name, "Goal")?;
  if points < 0 {
    return Err(AdminError::Invalid("Goal points must be zero or more".into()));
  }

  let template = sqlx::query_as::<_, GoalTemplate>(
    "INSERT INTO goal_templates (name, description, points) VALUES (?1, ?2, ?3) RETURNING id, name, description, points",
  )
  .bind(&name)
  .bind(description)
  .bind(points)
  .fetch_one(pool)
  .await?;
  Ok(template)
}

/// Put a goal template into one of the user's two slots, replacing what was there
pub async fn assign_goal(
  pool: &SqlitePool,
  admin_id: &str,
  user_id: &str,
  slot: u8,
  template_id: i64,
) -> Result<(), AdminError> {
  require_admin(pool, admin_id).await?;
  if !(1..=2).contains(&slot) {
    return Err(AdminError::Invalid(format!("Goal slot must be 1 or 2, got {}", slot)));
  }
  ensure_user(pool, user_id).await?;

  let template: Option<i64> = sqlx::query_scalar("SELECT id FROM goal_templates WHERE id = ?1")
    .bind(template_id)
    .fetch_optional(pool)
    .await?;
  if template.is_none() {
    return Err(AdminError::NotFound(format!("goal template {}", template_id)));
  }

  sqlx::query(
    r#"
    INSERT INTO user_goals (user_id, slot, template_id)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(user_id, slot) DO UPDATE SET
      template_id = excluded.template_id,
      assigned_at = CURRENT_TIMESTAMP
    "#,
  )
  .bind(user_id)
  .bind(slot)
  .bind(template_id)
  .execute(pool)
  .await?;

  audit::record_audit_best_effort(
    pool,
    user_id,
    AuditAction::GoalAssigned,
    serde_json::json!({ "slot": slot, "template_id": template_id, "by": admin_id }),
  )
  .await;
  Ok(())
}

/// Returns whether a goal was removed
pub async fn clear_goal(pool: &SqlitePool, admin_id: &str, user_id: &str, slot: u8) -> Result<bool, AdminError> {
  require_admin(pool, admin_id).await?;
  let result = sqlx::query("DELETE FROM user_goals WHERE user_id = ?1 AND slot = ?2")
    .bind(user_id)
    .bind(slot)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// ---------------------------------------------------------------------------
/// Weekly Bonus
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyBonus {
  pub id: i64,
  pub user_id: String,
  pub week_start: NaiveDate,
  pub points: i64,
  pub reason: Option<String>,
  pub awarded_by: String,
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Award discretionary points for the week containing `date`. Awarding again
/// in the same week replaces the previous award.
pub async fn award_weekly_bonus(
  pool: &SqlitePool,
  admin_id: &str,
  user_id: &str,
  date: NaiveDate,
  points: i64,
  reason: Option<&str>,
) -> Result<WeeklyBonus, AdminError> {
  require_admin(pool, admin_id).await?;
  if !(0..=MAX_WEEKLY_BONUS).contains(&points) {
    return Err(AdminError::Invalid(format!(
      "Weekly bonus must be between 0 and {}, got {}",
      MAX_WEEKLY_BONUS, points
    )));
  }
  ensure_user(pool, user_id).await?;
  let week = week_start(date);
  let reason = reason.map(str::trim).filter(|r| !r.is_empty());

  let bonus = sqlx::query_as::<_, WeeklyBonus>(
    r#"
    INSERT INTO weekly_bonuses (user_id, week_start, points, reason, awarded_by)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(user_id, week_start) DO UPDATE SET
      points = excluded.points,
      reason = excluded.reason,
      awarded_by = excluded.awarded_by,
      updated_at = CURRENT_TIMESTAMP
    RETURNING id, user_id, week_start, points, reason, awarded_by
    "#,
  )
  .bind(user_id)
  .bind(week)
  .bind(points)
  .bind(reason)
  .bind(admin_id)
  .fetch_one(pool)
  .await?;

  audit::record_audit_best_effort(
    pool,
    user_id,
    AuditAction::WeeklyBonus,
    serde_json::json!({ "week_start": week, "points": points, "by": admin_id }),
  )
  .await;

  info!(user_id, %week, points, "Weekly bonus awarded");
  Ok(bonus)
}

/// ---------------------------------------------------------------------------
/// Analytics
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySquadStats {
  pub date: NaiveDate,
  pub submissions: i64,
  pub total_points: i64,
  pub average_points: f64,
  pub slipups: i64,
}

/// Per-day check-in stats for approved members of a squad, inclusive range
pub async fn squad_analytics(
  pool: &SqlitePool,
  admin_id: &str,
  squad_id: i64,
  from: NaiveDate,
  to: NaiveDate,
) -> Result<Vec<DailySquadStats>, AdminError> {
  require_admin(pool, admin_id).await?;
  if from > to {
    return Err(AdminError::Invalid(format!("{} is after {}", from, to)));
  }

  let rows: Vec<(NaiveDate, i64, i64, f64, i64)> = sqlx::query_as(
    r#"
    SELECT
      dl.log_date,
      COUNT(*),
      SUM(dl.daily_points),
      AVG(dl.daily_points),
      SUM(dl.junk_food + dl.processed_sugar + dl.alcohol_excess)
    FROM daily_logs dl
    JOIN squad_members sm
      ON sm.user_id = dl.user_id AND sm.squad_id = ?1 AND sm.status = 'approved'
    WHERE dl.log_date BETWEEN ?2 AND ?3
    GROUP BY dl.log_date
    ORDER BY dl.log_date
    "#,
  )
  .bind(squad_id)
  .bind(from)
  .bind(to)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .into_iter()
      .map(|(date, submissions, total_points, average_points, slipups)| DailySquadStats {
        date,
        submissions,
        total_points,
        average_points,
        slipups,
      })
      .collect(),
  )
}
