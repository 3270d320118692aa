pub mod admin;
pub mod biometrics;
pub mod checkin;
pub mod leaderboard;

use crate::db::AppState;
use crate::wod::{self, Workout};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tauri::State;

/// Workout for the user's squad, today unless `date` is given
#[tauri::command]
pub async fn get_workout_of_the_day(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  date: Option<NaiveDate>,
) -> Result<Option<Workout>, String> {
  let date = date.unwrap_or_else(|| Local::now().date_naive());
  wod::workout_of_the_day(&state.db, &user_id, date).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::checkin::context::ContextStrategy;
  use crate::test_utils::*;
  use serial_test::serial;
  use tauri::Manager;

  #[tokio::test]
  #[serial]
  async fn test_get_workout_of_the_day_defaults_to_today() {
    let pool = setup_test_db().await;
    seed_user(&pool, "admin", "Coach", true).await;
    seed_user(&pool, "u1", "Ana", false).await;
    let squad = seed_squad(&pool, "Red").await;
    seed_membership(&pool, squad, "u1", "approved").await;
    wod::schedule_workout(&pool, "admin", squad, date_days_ago(0), "Burpees", None)
      .await
      .unwrap();
    let state = Arc::new(AppState::new(pool.clone(), ContextStrategy::Aggregate));
    let app = tauri::test::mock_app();
    app.manage(state);

    let workout = get_workout_of_the_day(app.state(), "u1".into(), None).await.unwrap();
    assert_eq!(workout.map(|w| w.title), Some("Burpees".to_string()));

    let yesterday = get_workout_of_the_day(app.state(), "u1".into(), Some(date_days_ago(1)))
      .await
      .unwrap();
    assert!(yesterday.is_none());

    teardown_test_db(pool).await;
  }
}
