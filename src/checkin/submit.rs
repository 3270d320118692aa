//! Check-in Submitter
//!
//! One row per (user, date): resubmitting overwrites every scoring, answer,
//! flag and note field. Totals are always recomputed here from the answers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::items::{CheckInItem, ItemKey};
use super::responses::{normalize_note, Responses, SlipupFlags};
use super::scoring::{self, Score};
use super::CheckInError;
use crate::audit::{self, AuditAction};
use crate::models::DailyLog;

/// Everything needed to persist one day's check-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInSubmission {
  pub user_id: String,
  pub date: NaiveDate,
  /// Live items the answers are scored against
  pub items: Vec<CheckInItem>,
  pub responses: Responses,
  pub slipups: SlipupFlags,
  pub note: String,
}

impl CheckInSubmission {
  fn live_keys(&self) -> Vec<ItemKey> {
    self.items.iter().map(|i| i.key).collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
  pub log_id: i64,
  pub date: NaiveDate,
  pub total_points: i64,
  pub negative_points: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "receipt", rename_all = "snake_case")]
pub enum SubmitOutcome {
  Submitted(SubmissionReceipt),
  /// Another submit from this session was still running; nothing was done
  InFlight,
}

/// ---------------------------------------------------------------------------
/// In-flight guard
/// ---------------------------------------------------------------------------

pub(crate) struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// Per-session submitter. Overlapping submits from the same session are
/// dropped; separate sessions race on the upsert and the last write wins.
#[derive(Debug, Default)]
pub struct Submitter {
  in_flight: AtomicBool,
}

impl Submitter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_in_flight(&self) -> bool {
    self.in_flight.load(Ordering::Acquire)
  }

  pub(crate) fn try_begin(&self) -> Option<InFlightGuard<'_>> {
    self
      .in_flight
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| InFlightGuard(&self.in_flight))
  }

  pub async fn submit(
    &self,
    pool: &SqlitePool,
    submission: &CheckInSubmission,
  ) -> Result<SubmitOutcome, CheckInError> {
    let Some(_guard) = self.try_begin() else {
      debug!(user_id = %submission.user_id, date = %submission.date, "Submit already in flight, ignoring");
      return Ok(SubmitOutcome::InFlight);
    };

    if !submission.responses.all_answered(&submission.live_keys()) {
      return Err(CheckInError::Incomplete);
    }
    let note = normalize_note(&submission.note)?;
    let score = scoring::score(&submission.items, &submission.responses, &submission.slipups);

    let log = upsert_daily_log(
      pool,
      &submission.user_id,
      submission.date,
      &score,
      &submission.responses,
      &submission.slipups,
      note.as_deref(),
    )
    .await?;

    audit::record_audit_best_effort(
      pool,
      &submission.user_id,
      AuditAction::CheckIn,
      serde_json::json!({
        "date": submission.date,
        "total_points": score.total,
      }),
    )
    .await;

    info!(
      user_id = %submission.user_id,
      date = %submission.date,
      total = score.total,
      "Check-in saved"
    );

    Ok(SubmitOutcome::Submitted(SubmissionReceipt {
      log_id: log.id,
      date: submission.date,
      total_points: score.total,
      negative_points: score.negative,
    }))
  }
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

/// Insert or fully overwrite the log row for (user, date)
pub async fn upsert_daily_log(
  pool: &SqlitePool,
  user_id: &str,
  date: NaiveDate,
  score: &Score,
  responses: &Responses,
  slipups: &SlipupFlags,
  note: Option<&str>,
) -> Result<DailyLog, CheckInError> {
  let custom_logs = serde_json::to_string(&responses.to_custom_logs())?;

  let log = sqlx::query_as::<_, DailyLog>(
    r#"
    INSERT INTO daily_logs (
      user_id, log_date, daily_points, custom_logs, junk_food,
      processed_sugar, alcohol_excess, negative_points, note_to_admin
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(user_id, log_date) DO UPDATE SET
      daily_points = excluded.daily_points,
      custom_logs = excluded.custom_logs,
      junk_food = excluded.junk_food,
      processed_sugar = excluded.processed_sugar,
      alcohol_excess = excluded.alcohol_excess,
      negative_points = excluded.negative_points,
      note_to_admin = excluded.note_to_admin,
      updated_at = CURRENT_TIMESTAMP
    RETURNING id, user_id, log_date, daily_points, custom_logs, junk_food,
              processed_sugar, alcohol_excess, negative_points, note_to_admin,
              created_at, updated_at
    "#,
  )
  .bind(user_id)
  .bind(date)
  .bind(score.total)
  .bind(custom_logs)
  .bind(slipups.junk_food)
  .bind(slipups.processed_sugar)
  .bind(slipups.alcohol_excess)
  .bind(score.negative)
  .bind(note)
  .fetch_one(pool)
  .await?;

  Ok(log)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::checkin::context::get_daily_log;
  use crate::test_utils::*;

  fn items() -> Vec<CheckInItem> {
    vec![
      CheckInItem::activity(1, "Workout", 10),
      CheckInItem::activity(2, "Steps", 15),
      CheckInItem::goal(1, "Water", 5),
    ]
  }

  fn submission(date: NaiveDate, answers: [bool; 3], slipups: SlipupFlags) -> CheckInSubmission {
    let items = items();
    let mut responses = Responses::unanswered(items.iter().map(|i| i.key));
    for (item, answer) in items.iter().zip(answers) {
      responses.answer(item.key, answer);
    }
    CheckInSubmission {
      user_id: "u1".to_string(),
      date,
      items,
      responses,
      slipups,
      note: String::new(),
    }
  }

  fn receipt(outcome: SubmitOutcome) -> SubmissionReceipt {
    match outcome {
      SubmitOutcome::Submitted(r) => r,
      SubmitOutcome::InFlight => panic!("expected a submitted outcome"),
    }
  }

  async fn log_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM daily_logs")
      .fetch_one(pool)
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn test_submit_persists_score_and_answers() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    let date = date_days_ago(0);
    let slipups = SlipupFlags {
      junk_food: true,
      alcohol_excess: true,
      ..Default::default()
    };

    let outcome = Submitter::new()
      .submit(&pool, &submission(date, [true, false, true], slipups))
      .await
      .unwrap();
    let r = receipt(outcome);
    assert_eq!(r.total_points, 5);
    assert_eq!(r.negative_points, -10);

    let log = get_daily_log(&pool, "u1", date).await.unwrap().unwrap();
    assert_eq!(log.daily_points, 5);
    assert_eq!(log.negative_points, -10);
    assert!(log.junk_food && log.alcohol_excess && !log.processed_sugar);
    let stored = Responses::from_custom_logs(&log.custom_logs).unwrap();
    assert_eq!(stored.get(ItemKey::Activity(2)), Some(false));
    assert_eq!(stored.get(ItemKey::Goal(1)), Some(true));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_resubmission_overwrites_single_row() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    let date = date_days_ago(1);
    let submitter = Submitter::new();

    let first = receipt(
      submitter
        .submit(&pool, &submission(date, [true, true, false], SlipupFlags::default()))
        .await
        .unwrap(),
    );
    assert_eq!(first.total_points, 25);

    let mut second_req = submission(date, [false, false, true], SlipupFlags::default());
    second_req.note = "  travel day ".to_string();
    let second = receipt(submitter.submit(&pool, &second_req).await.unwrap());
    assert_eq!(second.total_points, 5);
    assert_eq!(first.log_id, second.log_id);

    assert_eq!(log_count(&pool).await, 1);
    let log = get_daily_log(&pool, "u1", date).await.unwrap().unwrap();
    assert_eq!(log.daily_points, 5);
    assert_eq!(log.note_to_admin.as_deref(), Some("travel day"));
    let stored = Responses::from_custom_logs(&log.custom_logs).unwrap();
    assert_eq!(stored.get(ItemKey::Activity(1)), Some(false));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_incomplete_submission_is_rejected() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    let mut req = submission(date_days_ago(0), [true, true, true], SlipupFlags::default());
    req.responses = Responses::unanswered(req.items.iter().map(|i| i.key));

    let submitter = Submitter::new();
    let err = submitter.submit(&pool, &req).await.unwrap_err();
    assert!(matches!(err, CheckInError::Incomplete));
    assert!(!submitter.is_in_flight());
    assert_eq!(log_count(&pool).await, 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_overlapping_submit_is_a_no_op() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    let submitter = Submitter::new();
    let req = submission(date_days_ago(0), [true, true, true], SlipupFlags::default());

    let guard = submitter.try_begin().expect("first begin");
    let outcome = submitter.submit(&pool, &req).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::InFlight);
    assert_eq!(log_count(&pool).await, 0);

    drop(guard);
    assert!(!submitter.is_in_flight());
    receipt(submitter.submit(&pool, &req).await.unwrap());
    assert_eq!(log_count(&pool).await, 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_failed_upsert_releases_guard_for_retry() {
    let pool = setup_test_db().await;
    let submitter = Submitter::new();
    let req = submission(date_days_ago(0), [true, false, false], SlipupFlags::default());

    // No such user yet: foreign key violation
    let err = submitter.submit(&pool, &req).await.unwrap_err();
    assert!(matches!(err, CheckInError::Database(_)));
    assert!(!submitter.is_in_flight());
    assert_eq!(log_count(&pool).await, 0);

    seed_user(&pool, "u1", "Ana", false).await;
    let r = receipt(submitter.submit(&pool, &req).await.unwrap());
    assert_eq!(r.total_points, 10);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_audit_failure_does_not_fail_submission() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    sqlx::query("DROP TABLE audit_log").execute(&pool).await.unwrap();

    let outcome = Submitter::new()
      .submit(&pool, &submission(date_days_ago(0), [true, true, true], SlipupFlags::default()))
      .await
      .unwrap();
    assert_eq!(receipt(outcome).total_points, 30);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_submit_writes_audit_entry() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    Submitter::new()
      .submit(&pool, &submission(date_days_ago(0), [true, true, true], SlipupFlags::default()))
      .await
      .unwrap();

    let action: String = sqlx::query_scalar("SELECT action FROM audit_log WHERE user_id = 'u1'")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(action, "check_in");

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_orphaned_answers_survive_resubmission() {
    let pool = setup_test_db().await;
    seed_user(&pool, "u1", "Ana", false).await;
    let mut req = submission(date_days_ago(0), [true, true, true], SlipupFlags::default());
    let stored = Responses::from_custom_logs(r#"{"activity_404": true, "legacy_habit": false}"#).unwrap();
    req.responses.hydrate(&stored);

    let r = receipt(Submitter::new().submit(&pool, &req).await.unwrap());
    assert_eq!(r.total_points, 30);

    let log = get_daily_log(&pool, "u1", req.date).await.unwrap().unwrap();
    let back = Responses::from_custom_logs(&log.custom_logs).unwrap();
    assert_eq!(back.get(ItemKey::Activity(404)), Some(true));
    assert!(back.orphaned().contains_key("legacy_habit"));

    teardown_test_db(pool).await;
  }
}
