//! Biometric entries (weight, height, body fat) and BMI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BiometricsError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Invalid measurement: {0}")]
  Invalid(String),
}

impl From<sqlx::Error> for BiometricsError {
  fn from(e: sqlx::Error) -> Self {
    BiometricsError::Database(e.to_string())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
  Underweight,
  Normal,
  Overweight,
  Obese,
}

impl BmiCategory {
  pub fn from_bmi(bmi: f64) -> Self {
    if bmi < 18.5 {
      Self::Underweight
    } else if bmi < 25.0 {
      Self::Normal
    } else if bmi < 30.0 {
      Self::Overweight
    } else {
      Self::Obese
    }
  }
}

/// BMI rounded to one decimal, `None` when either input is missing or not positive
pub fn bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<f64> {
  let (w, h) = (weight_kg?, height_cm?);
  if w <= 0.0 || h <= 0.0 {
    return None;
  }
  let meters = h / 100.0;
  Some((w / (meters * meters) * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewBiometrics {
  pub weight_kg: Option<f64>,
  pub height_cm: Option<f64>,
  pub body_fat_pct: Option<f64>,
}

impl NewBiometrics {
  fn validate(&self) -> Result<(), BiometricsError> {
    if self.weight_kg.is_none() && self.height_cm.is_none() && self.body_fat_pct.is_none() {
      return Err(BiometricsError::Invalid("at least one measurement is required".into()));
    }
    check_range("weight_kg", self.weight_kg, 20.0, 400.0)?;
    check_range("height_cm", self.height_cm, 80.0, 250.0)?;
    check_range("body_fat_pct", self.body_fat_pct, 2.0, 75.0)?;
    Ok(())
  }
}

fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), BiometricsError> {
  match value {
    Some(v) if !(min..=max).contains(&v) => Err(BiometricsError::Invalid(format!(
      "{} must be between {} and {}, got {}",
      field, min, max, v
    ))),
    _ => Ok(()),
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiometricEntry {
  pub recorded_on: NaiveDate,
  pub weight_kg: Option<f64>,
  pub height_cm: Option<f64>,
  pub body_fat_pct: Option<f64>,
  pub bmi: Option<f64>,
  pub bmi_category: Option<BmiCategory>,
}

/// Save measurements for a day. Re-recording the same day replaces it.
pub async fn record_biometrics(
  pool: &SqlitePool,
  user_id: &str,
  date: NaiveDate,
  entry: &NewBiometrics,
) -> Result<BiometricEntry, BiometricsError> {
  entry.validate()?;

  sqlx::query(
    r#"
    INSERT INTO biometrics (user_id, recorded_on, weight_kg, height_cm, body_fat_pct)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(user_id, recorded_on) DO UPDATE SET
      weight_kg = excluded.weight_kg,
      height_cm = excluded.height_cm,
      body_fat_pct = excluded.body_fat_pct
    "#,
  )
  .bind(user_id)
  .bind(date)
  .bind(entry.weight_kg)
  .bind(entry.height_cm)
  .bind(entry.body_fat_pct)
  .execute(pool)
  .await?;

  load_entries(pool, user_id, Some(date), 1)
    .await?
    .pop()
    .ok_or_else(|| BiometricsError::Database("entry missing after save".into()))
}

/// Newest first. Height is carried forward from earlier entries so BMI can be
/// shown for weigh-ins that did not repeat it.
pub async fn biometric_history(
  pool: &SqlitePool,
  user_id: &str,
  limit: i64,
) -> Result<Vec<BiometricEntry>, BiometricsError> {
  load_entries(pool, user_id, None, limit).await
}

async fn load_entries(
  pool: &SqlitePool,
  user_id: &str,
  only_date: Option<NaiveDate>,
  limit: i64,
) -> Result<Vec<BiometricEntry>, BiometricsError> {
  let rows: Vec<(NaiveDate, Option<f64>, Option<f64>, Option<f64>, Option<f64>)> = sqlx::query_as(
    r#"
    SELECT
      b.recorded_on,
      b.weight_kg,
      b.height_cm,
      b.body_fat_pct,
      (SELECT p.height_cm FROM biometrics p
        WHERE p.user_id = b.user_id AND p.recorded_on <= b.recorded_on AND p.height_cm IS NOT NULL
        ORDER BY p.recorded_on DESC LIMIT 1) AS known_height
    FROM biometrics b
    WHERE b.user_id = ?1 AND (?2 IS NULL OR b.recorded_on = ?2)
    ORDER BY b.recorded_on DESC
    LIMIT ?3
    "#,
  )
  .bind(user_id)
  .bind(only_date)
  .bind(limit)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .into_iter()
      .map(|(recorded_on, weight_kg, height_cm, body_fat_pct, known_height)| {
        let bmi = bmi(weight_kg, known_height);
        BiometricEntry {
          recorded_on,
          weight_kg,
          height_cm,
          body_fat_pct,
          bmi,
          bmi_category: bmi.map(BmiCategory::from_bmi),
        }
      })
      .collect(),
  )
}
