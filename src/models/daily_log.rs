use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One check-in per (user, date). `custom_logs` is the raw answer blob.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyLog {
  pub id: i64,
  pub user_id: String,
  pub log_date: NaiveDate,
  pub daily_points: i64,
  pub custom_logs: String,
  pub junk_food: bool,
  pub processed_sugar: bool,
  pub alcohol_excess: bool,
  pub negative_points: i64,
  pub note_to_admin: Option<String>,
  pub created_at: Option<NaiveDateTime>,
  pub updated_at: Option<NaiveDateTime>,
}
