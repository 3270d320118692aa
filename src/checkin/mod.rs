//! Daily check-in pipeline
//!
//! Loader -> Collector -> Scorer -> Submitter:
//! - `context` resolves the items, goals and any existing log for a date
//! - `session` holds the answers for the selected date
//! - `scoring` derives the day total from the answers
//! - `submit` upserts the one log row per (user, date)

pub mod context;
pub mod items;
pub mod responses;
pub mod scoring;
pub mod session;
pub mod submit;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CheckInError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Stored check-in data is unreadable: {0}")]
  Storage(String),

  #[error("No check-in session for user {0}")]
  NoSession(String),

  #[error("{0} is outside the check-in window")]
  DateOutsideWindow(NaiveDate),

  #[error("Check-in for {0} is still loading")]
  Loading(NaiveDate),

  #[error("Check-in for {0} did not load completely, reload before submitting")]
  ContextIncomplete(NaiveDate),

  #[error("Unknown check-in item: {0}")]
  UnknownItem(String),

  #[error("Answer every activity and goal before submitting")]
  Incomplete,

  #[error("Note is {0} characters, the limit is 500")]
  NoteTooLong(usize),
}

impl From<sqlx::Error> for CheckInError {
  fn from(e: sqlx::Error) -> Self {
    CheckInError::Database(e.to_string())
  }
}

impl From<serde_json::Error> for CheckInError {
  fn from(e: serde_json::Error) -> Self {
    CheckInError::Storage(e.to_string())
  }
}
