mod admin;
mod audit;
mod biometrics;
mod checkin;
mod commands;
mod config;
mod db;
mod leaderboard;
mod models;
mod wod;

#[cfg(test)]
mod test_utils;

use checkin::context::detect_strategy;
use config::AppConfig;
use db::AppState;
use std::sync::Arc;
use tauri::Manager;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let config = AppConfig::from_env().unwrap_or_else(|e| {
    eprintln!("{}, falling back to defaults", e);
    AppConfig::default()
  });

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
    .with_target(true)
    .init();

  tauri::Builder::default()
    .plugin(tauri_plugin_opener::init())
    .setup(move |app| {
      let app_handle = app.handle().clone();
      tauri::async_runtime::block_on(async move {
        match db::initialize_db(&app_handle, &config).await {
          Ok(pool) => {
            let strategy = detect_strategy(&pool, config.context_strategy).await;
            info!(?strategy, "Check-in context strategy resolved");
            app_handle.manage(Arc::new(AppState::new(pool, strategy)));
          }
          Err(e) => {
            error!(error = %e, "Failed to initialize database");
            warn!("Commands will be unavailable until the database opens");
          }
        }
      });
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      // Check-in
      commands::checkin::checkin_select_date,
      commands::checkin::checkin_state,
      commands::checkin::checkin_answer,
      commands::checkin::checkin_set_slipup,
      commands::checkin::checkin_set_note,
      commands::checkin::checkin_submit,
      commands::checkin::get_checkin_context,
      // Users & admin
      commands::admin::register_user,
      commands::admin::get_user,
      commands::admin::admin_set_admin,
      commands::admin::admin_create_squad,
      commands::admin::admin_list_squads,
      commands::admin::request_squad_membership,
      commands::admin::admin_approve_member,
      commands::admin::admin_transfer_member,
      commands::admin::admin_squad_members,
      commands::admin::admin_add_activity,
      commands::admin::admin_update_activity,
      commands::admin::admin_list_activities,
      commands::admin::admin_create_goal_template,
      commands::admin::admin_assign_goal,
      commands::admin::admin_clear_goal,
      commands::admin::admin_award_bonus,
      commands::admin::admin_squad_analytics,
      commands::admin::admin_schedule_workout,
      commands::admin::admin_audit_log,
      // Leaderboard
      commands::leaderboard::get_leaderboard,
      commands::leaderboard::get_user_streak,
      // Biometrics
      commands::biometrics::record_biometrics,
      commands::biometrics::get_biometric_history,
      commands::get_workout_of_the_day,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}
