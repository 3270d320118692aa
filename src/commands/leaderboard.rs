//! Tauri commands for leaderboard and streaks

use chrono::Local;
use std::sync::Arc;
use tauri::State;

use crate::db::AppState;
use crate::leaderboard::{self, LeaderboardEntry, Streak};

/// Ranked totals, optionally for one squad
#[tauri::command]
pub async fn get_leaderboard(
    state: State<'_, Arc<AppState>>,
    squad_id: Option<i64>,
) -> Result<Vec<LeaderboardEntry>, String> {
    leaderboard::leaderboard(&state.db, squad_id, Local::now().date_naive()).await
}

#[tauri::command]
pub async fn get_user_streak(
    state: State<'_, Arc<AppState>>,
    user_id: String,
) -> Result<Streak, String> {
    leaderboard::user_streak(&state.db, &user_id, Local::now().date_naive()).await
}
