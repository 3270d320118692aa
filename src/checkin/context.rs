//! Check-in Context Loader
//!
//! Resolves, for one user and date, the answerable items and any check-in
//! already stored for that date. Two read strategies converge on the same
//! `CheckInContext`:
//! - Aggregate: one statement over the `user_checkin_items` view
//! - Discrete: squad -> activities -> goals -> existing log, in that order
//!
//! The strategy is picked once at start-up (`detect_strategy`). Loading never
//! fails outright: a failed read ends the walk and the partial context carries
//! `load_error` so the UI can stop spinning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::items::{CheckInItem, ItemKey};
use super::responses::{Responses, SlipupFlags};
use super::CheckInError;
use crate::config::StrategySetting;
use crate::models::DailyLog;

/// ---------------------------------------------------------------------------
/// Strategy
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
  Aggregate,
  Discrete,
}

/// Resolve the read strategy once. `Auto` uses the aggregate view when the
/// schema has it.
pub async fn detect_strategy(pool: &SqlitePool, setting: StrategySetting) -> ContextStrategy {
  match setting {
    StrategySetting::Aggregate => ContextStrategy::Aggregate,
    StrategySetting::Discrete => ContextStrategy::Discrete,
    StrategySetting::Auto => {
      let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'view' AND name = 'user_checkin_items'",
      )
      .fetch_one(pool)
      .await;

      match found {
        Ok(n) if n > 0 => ContextStrategy::Aggregate,
        Ok(_) => {
          info!("user_checkin_items view missing, using discrete context reads");
          ContextStrategy::Discrete
        }
        Err(e) => {
          warn!(error = %e, "Could not probe schema, using discrete context reads");
          ContextStrategy::Discrete
        }
      }
    }
  }
}

/// ---------------------------------------------------------------------------
/// Context Types
/// ---------------------------------------------------------------------------

/// A check-in already persisted for the date, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingCheckIn {
  pub daily_points: i64,
  pub responses: Responses,
  pub slipups: SlipupFlags,
  pub note: Option<String>,
}

impl ExistingCheckIn {
  pub fn from_log(log: &DailyLog) -> Result<Self, CheckInError> {
    Ok(Self {
      daily_points: log.daily_points,
      responses: Responses::from_custom_logs(&log.custom_logs)?,
      slipups: SlipupFlags {
        junk_food: log.junk_food,
        processed_sugar: log.processed_sugar,
        alcohol_excess: log.alcohol_excess,
      },
      note: log.note_to_admin.clone(),
    })
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInContext {
  pub date: NaiveDate,
  /// `None` means the user has no approved squad yet: nothing to do
  pub squad_id: Option<i64>,
  pub activities: Vec<CheckInItem>,
  pub goals: Vec<CheckInItem>,
  pub existing: Option<ExistingCheckIn>,
  pub source: ContextStrategy,
  pub load_error: Option<String>,
}

impl CheckInContext {
  pub fn empty(date: NaiveDate, source: ContextStrategy) -> Self {
    Self {
      date,
      squad_id: None,
      activities: Vec::new(),
      goals: Vec::new(),
      existing: None,
      source,
      load_error: None,
    }
  }

  pub fn already_submitted(&self) -> bool {
    self.existing.is_some()
  }

  /// Activities then goals
  pub fn items(&self) -> impl Iterator<Item = &CheckInItem> {
    self.activities.iter().chain(self.goals.iter())
  }

  pub fn live_keys(&self) -> Vec<ItemKey> {
    self.items().map(|i| i.key).collect()
  }

  pub fn contains(&self, key: ItemKey) -> bool {
    self.items().any(|i| i.key == key)
  }

  /// No squad or nothing configured
  pub fn is_empty(&self) -> bool {
    self.activities.is_empty() && self.goals.is_empty()
  }

  fn with_error(mut self, step: &str, error: impl std::fmt::Display) -> Self {
    warn!(date = %self.date, step, error = %error, "Check-in context read failed");
    self.load_error = Some(format!("Failed to load {}: {}", step, error));
    self
  }
}

/// ---------------------------------------------------------------------------
/// Loader
/// ---------------------------------------------------------------------------

/// Load the check-in context for `user_id` on `date`
pub async fn load_context(
  pool: &SqlitePool,
  strategy: ContextStrategy,
  user_id: &str,
  date: NaiveDate,
) -> CheckInContext {
  if strategy == ContextStrategy::Aggregate {
    match load_aggregate(pool, user_id, date).await {
      Ok(Some(context)) => return context,
      Ok(None) => debug!(user_id, %date, "Aggregate context empty, using discrete reads"),
      Err(e) => warn!(user_id, %date, error = %e, "Aggregate context failed, using discrete reads"),
    }
  }
  load_discrete(pool, user_id, date).await
}

#[derive(Debug, Deserialize)]
struct AggregateItem {
  kind: String,
  ref_id: i64,
  label: String,
  description: Option<String>,
  points: i64,
  sort_key: i64,
}

#[derive(Debug, Deserialize)]
struct AggregateLog {
  daily_points: i64,
  custom_logs: String,
  junk_food: i64,
  processed_sugar: i64,
  alcohol_excess: i64,
  note_to_admin: Option<String>,
}

async fn load_aggregate(
  pool: &SqlitePool,
  user_id: &str,
  date: NaiveDate,
) -> Result<Option<CheckInContext>, CheckInError> {
  let row: Option<(Option<i64>, Option<String>, Option<String>)> = sqlx::query_as(
    r#"
    SELECT
      (SELECT squad_id FROM squad_members
        WHERE user_id = ?1 AND status = 'approved' LIMIT 1) AS squad_id,
      (SELECT json_group_array(json_object(
          'kind', kind, 'ref_id', ref_id, 'label', label,
          'description', description, 'points', points, 'sort_key', sort_key))
        FROM user_checkin_items WHERE user_id = ?1) AS items_json,
      (SELECT json_object(
          'daily_points', daily_points, 'custom_logs', custom_logs,
          'junk_food', junk_food, 'processed_sugar', processed_sugar,
          'alcohol_excess', alcohol_excess, 'note_to_admin', note_to_admin)
        FROM daily_logs WHERE user_id = ?1 AND log_date = ?2) AS log_json
    "#,
  )
  .bind(user_id)
  .bind(date)
  .fetch_optional(pool)
  .await?;

  let Some((squad_id, items_json, log_json)) = row else {
    return Ok(None);
  };

  let mut context = CheckInContext::empty(date, ContextStrategy::Aggregate);
  let Some(squad_id) = squad_id else {
    return Ok(Some(context));
  };
  context.squad_id = Some(squad_id);

  let mut rows: Vec<AggregateItem> = match items_json {
    Some(json) => serde_json::from_str(&json)?,
    None => Vec::new(),
  };
  rows.sort_by(|a, b| (a.sort_key, a.ref_id).cmp(&(b.sort_key, b.ref_id)));

  for row in rows {
    match row.kind.as_str() {
      "activity" => context.activities.push(
        CheckInItem::activity(row.ref_id, row.label, row.points).with_description(row.description),
      ),
      "goal" => match u8::try_from(row.ref_id) {
        Ok(slot) => context
          .goals
          .push(CheckInItem::goal(slot, row.label, row.points).with_description(row.description)),
        Err(_) => warn!(slot = row.ref_id, "Skipping goal with out-of-range slot"),
      },
      other => warn!(kind = other, "Skipping unknown check-in item kind"),
    }
  }

  if let Some(json) = log_json {
    let log: AggregateLog = serde_json::from_str(&json)?;
    context.existing = Some(ExistingCheckIn {
      daily_points: log.daily_points,
      responses: Responses::from_custom_logs(&log.custom_logs)?,
      slipups: SlipupFlags {
        junk_food: log.junk_food != 0,
        processed_sugar: log.processed_sugar != 0,
        alcohol_excess: log.alcohol_excess != 0,
      },
      note: log.note_to_admin,
    });
  }

  Ok(Some(context))
}

async fn load_discrete(pool: &SqlitePool, user_id: &str, date: NaiveDate) -> CheckInContext {
  let mut context = CheckInContext::empty(date, ContextStrategy::Discrete);

  let squad_id = match approved_squad(pool, user_id).await {
    Ok(Some(id)) => id,
    Ok(None) => return context,
    Err(e) => return context.with_error("squad membership", e),
  };
  context.squad_id = Some(squad_id);

  match list_squad_activities(pool, squad_id).await {
    Ok(activities) => context.activities = activities,
    Err(e) => return context.with_error("activities", e),
  }

  match list_assigned_goals(pool, user_id).await {
    Ok(goals) => context.goals = goals,
    Err(e) => return context.with_error("goals", e),
  }

  match get_daily_log(pool, user_id, date).await {
    Ok(Some(log)) => match ExistingCheckIn::from_log(&log) {
      Ok(existing) => context.existing = Some(existing),
      Err(e) => return context.with_error("existing check-in", e),
    },
    Ok(None) => {}
    Err(e) => return context.with_error("existing check-in", e),
  }

  context
}

/// ---------------------------------------------------------------------------
/// Discrete Reads
/// ---------------------------------------------------------------------------

/// The squad the user is approved in, if any
pub async fn approved_squad(pool: &SqlitePool, user_id: &str) -> Result<Option<i64>, CheckInError> {
  let squad_id = sqlx::query_scalar::<_, i64>(
    "SELECT squad_id FROM squad_members WHERE user_id = ?1 AND status = 'approved' LIMIT 1",
  )
  .bind(user_id)
  .fetch_optional(pool)
  .await?;
  Ok(squad_id)
}

/// Enabled activities for a squad, in display order
pub async fn list_squad_activities(
  pool: &SqlitePool,
  squad_id: i64,
) -> Result<Vec<CheckInItem>, CheckInError> {
  let rows: Vec<(i64, String, Option<String>, i64)> = sqlx::query_as(
    r#"
    SELECT id, name, description, points
    FROM squad_activities
    WHERE squad_id = ?1 AND enabled = 1
    ORDER BY display_order, id
    "#,
  )
  .bind(squad_id)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .into_iter()
      .map(|(id, name, description, points)| {
        CheckInItem::activity(id, name, points).with_description(description)
      })
      .collect(),
  )
}

/// The user's goal slots (at most two), ordered by slot
pub async fn list_assigned_goals(
  pool: &SqlitePool,
  user_id: &str,
) -> Result<Vec<CheckInItem>, CheckInError> {
  let rows: Vec<(i64, String, Option<String>, i64)> = sqlx::query_as(
    r#"
    SELECT ug.slot, gt.name, gt.description, gt.points
    FROM user_goals ug
    JOIN goal_templates gt ON gt.id = ug.template_id
    WHERE ug.user_id = ?1
    ORDER BY ug.slot
    LIMIT 2
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .into_iter()
      .filter_map(|(slot, name, description, points)| {
        let slot = u8::try_from(slot).ok()?;
        Some(CheckInItem::goal(slot, name, points).with_description(description))
      })
      .collect(),
  )
}

pub async fn get_daily_log(
  pool: &SqlitePool,
  user_id: &str,
  date: NaiveDate,
) -> Result<Option<DailyLog>, CheckInError> {
  let log = sqlx::query_as::<_, DailyLog>(
    r#"
    SELECT id, user_id, log_date, daily_points, custom_logs, junk_food,
           processed_sugar, alcohol_excess, negative_points, note_to_admin,
           created_at, updated_at
    FROM daily_logs
    WHERE user_id = ?1 AND log_date = ?2
    "#,
  )
  .bind(user_id)
  .bind(date)
  .fetch_optional(pool)
  .await?;
  Ok(log)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;

  async fn seed_scenario(pool: &SqlitePool) -> (i64, Vec<i64>) {
    seed_user(pool, "u1", "Ana", false).await;
    let squad = seed_squad(pool, "Red").await;
    seed_membership(pool, squad, "u1", "approved").await;
    let a1 = seed_activity(pool, squad, "Workout", 10, 2).await;
    let a2 = seed_activity(pool, squad, "10k steps", 15, 1).await;
    let template = seed_goal_template(pool, "Drink water", 5).await;
    seed_goal(pool, "u1", 1, template).await;
    (squad, vec![a1, a2])
  }

  #[tokio::test]
  async fn test_detect_strategy_respects_setting() {
    let pool = setup_test_db().await;
    assert_eq!(
      detect_strategy(&pool, StrategySetting::Auto).await,
      ContextStrategy::Aggregate
    );
    assert_eq!(
      detect_strategy(&pool, StrategySetting::Discrete).await,
      ContextStrategy::Discrete
    );

    sqlx::query("DROP VIEW user_checkin_items").execute(&pool).await.unwrap();
    assert_eq!(
      detect_strategy(&pool, StrategySetting::Auto).await,
      ContextStrategy::Discrete
    );
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_both_strategies_converge() {
    let pool = setup_test_db().await;
    let (squad, ids) = seed_scenario(&pool).await;
    let date = date_days_ago(0);

    let aggregate = load_context(&pool, ContextStrategy::Aggregate, "u1", date).await;
    let discrete = load_context(&pool, ContextStrategy::Discrete, "u1", date).await;

    assert_eq!(aggregate.source, ContextStrategy::Aggregate);
    assert_eq!(discrete.source, ContextStrategy::Discrete);
    assert_eq!(aggregate.squad_id, Some(squad));
    assert_eq!(aggregate.activities, discrete.activities);
    assert_eq!(aggregate.goals, discrete.goals);
    assert!(!aggregate.already_submitted());
    assert!(!discrete.already_submitted());

    // display_order puts the steps activity first
    assert_eq!(aggregate.activities[0].key, ItemKey::Activity(ids[1]));
    assert_eq!(aggregate.goals[0].key, ItemKey::Goal(1));
    assert_eq!(aggregate.goals[0].points, 5);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_no_squad_is_empty_terminal_state() {
    let pool = setup_test_db().await;
    seed_user(&pool, "loner", "Lee", false).await;
    let template = seed_goal_template(&pool, "Sleep 8h", 5).await;
    seed_goal(&pool, "loner", 1, template).await;

    for strategy in [ContextStrategy::Aggregate, ContextStrategy::Discrete] {
      let context = load_context(&pool, strategy, "loner", date_days_ago(0)).await;
      assert_eq!(context.squad_id, None);
      assert!(context.is_empty());
      assert!(context.load_error.is_none());
    }
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_disabled_activities_are_hidden() {
    let pool = setup_test_db().await;
    let (_, ids) = seed_scenario(&pool).await;
    sqlx::query("UPDATE squad_activities SET enabled = 0 WHERE id = ?1")
      .bind(ids[0])
      .execute(&pool)
      .await
      .unwrap();

    let context = load_context(&pool, ContextStrategy::Discrete, "u1", date_days_ago(0)).await;
    assert_eq!(context.activities.len(), 1);
    assert!(!context.contains(ItemKey::Activity(ids[0])));
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_existing_log_is_hydrated() {
    let pool = setup_test_db().await;
    let (_, ids) = seed_scenario(&pool).await;
    let date = date_days_ago(1);
    let blob = format!(r#"{{"activity_{}": true, "activity_{}": false, "goal_1": true}}"#, ids[0], ids[1]);
    seed_daily_log(&pool, "u1", date, 10, &blob, true).await;

    for strategy in [ContextStrategy::Aggregate, ContextStrategy::Discrete] {
      let context = load_context(&pool, strategy, "u1", date).await;
      let existing = context.existing.expect("existing check-in");
      assert_eq!(existing.daily_points, 10);
      assert_eq!(existing.responses.get(ItemKey::Activity(ids[0])), Some(true));
      assert_eq!(existing.responses.get(ItemKey::Activity(ids[1])), Some(false));
      assert!(existing.slipups.junk_food);
      assert!(!existing.slipups.alcohol_excess);
    }
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_aggregate_falls_back_when_view_is_gone() {
    let pool = setup_test_db().await;
    seed_scenario(&pool).await;
    sqlx::query("DROP VIEW user_checkin_items").execute(&pool).await.unwrap();

    let context = load_context(&pool, ContextStrategy::Aggregate, "u1", date_days_ago(0)).await;
    assert_eq!(context.source, ContextStrategy::Discrete);
    assert_eq!(context.activities.len(), 2);
    assert_eq!(context.goals.len(), 1);
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_discrete_failure_returns_partial_context() {
    let pool = setup_test_db().await;
    seed_scenario(&pool).await;
    sqlx::query("DROP TABLE user_goals").execute(&pool).await.unwrap();

    let context = load_context(&pool, ContextStrategy::Discrete, "u1", date_days_ago(0)).await;
    assert_eq!(context.activities.len(), 2);
    assert!(context.goals.is_empty());
    assert!(context.load_error.as_deref().unwrap_or_default().contains("goals"));
    teardown_test_db(pool).await;
  }
}
