//! Audit trail for point-affecting actions.
//!
//! Writes here are never part of the action's outcome: callers use
//! `record_audit_best_effort`, which logs and swallows failures.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
  CheckIn,
  WeeklyBonus,
  MemberApproved,
  MemberTransferred,
  GoalAssigned,
}

impl AuditAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::CheckIn => "check_in",
      Self::WeeklyBonus => "weekly_bonus",
      Self::MemberApproved => "member_approved",
      Self::MemberTransferred => "member_transferred",
      Self::GoalAssigned => "goal_assigned",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
  pub id: i64,
  pub user_id: String,
  pub action: String,
  pub details_json: Option<String>,
}

pub async fn record_audit(
  pool: &SqlitePool,
  user_id: &str,
  action: AuditAction,
  details: serde_json::Value,
) -> Result<(), sqlx::Error> {
  sqlx::query("INSERT INTO audit_log (user_id, action, details_json) VALUES (?1, ?2, ?3)")
    .bind(user_id)
    .bind(action.as_str())
    .bind(details.to_string())
    .execute(pool)
    .await?;
  Ok(())
}

pub async fn record_audit_best_effort(
  pool: &SqlitePool,
  user_id: &str,
  action: AuditAction,
  details: serde_json::Value,
) {
  if let Err(e) = record_audit(pool, user_id, action, details).await {
    warn!(user_id, action = action.as_str(), error = %e, "Audit write failed");
  }
}

/// Most recent entries for a user, newest first
pub async fn recent_audit(
  pool: &SqlitePool,
  user_id: &str,
  limit: i64,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
  sqlx::query_as::<_, AuditEntry>(
    "SELECT id, user_id, action, details_json FROM audit_log WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
  )
  .bind(user_id)
  .bind(limit)
  .fetch_all(pool)
  .await
}
