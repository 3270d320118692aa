//! Tauri commands for biometric tracking

use chrono::NaiveDate;
use std::sync::Arc;
use tauri::State;

use crate::biometrics::{self, BiometricEntry, BiometricsError, NewBiometrics};
use crate::db::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 30;

#[tauri::command]
pub async fn record_biometrics(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  date: NaiveDate,
  weight_kg: Option<f64>,
  height_cm: Option<f64>,
  body_fat_pct: Option<f64>,
) -> Result<BiometricEntry, BiometricsError> {
  let entry = NewBiometrics {
    weight_kg,
    height_cm,
    body_fat_pct,
  };
  biometrics::record_biometrics(&state.db, &user_id, date, &entry).await
}

#[tauri::command]
pub async fn get_biometric_history(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  limit: Option<i64>,
) -> Result<Vec<BiometricEntry>, BiometricsError> {
  biometrics::biometric_history(&state.db, &user_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT)).await
}
