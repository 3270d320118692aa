//! Tauri commands for squad administration

use chrono::NaiveDate;
use std::sync::Arc;
use tauri::State;

use crate::admin::{
  self, ActivityUpdate, AdminError, DailySquadStats, MemberOverview, NewActivity, WeeklyBonus,
};
use crate::audit::{self, AuditEntry};
use crate::db::AppState;
use crate::models::{GoalTemplate, Squad, SquadActivity, SquadMember, User};
use crate::wod::{self, Workout};

#[tauri::command]
pub async fn register_user(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  display_name: String,
) -> Result<User, AdminError> {
  admin::register_user(&state.db, &user_id, &display_name).await
}

#[tauri::command]
pub async fn get_user(state: State<'_, Arc<AppState>>, user_id: String) -> Result<Option<User>, AdminError> {
  admin::get_user(&state.db, &user_id).await
}

#[tauri::command]
pub async fn admin_set_admin(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  user_id: String,
  is_admin: bool,
) -> Result<User, AdminError> {
  admin::set_admin(&state.db, &admin_id, &user_id, is_admin).await
}

#[tauri::command]
pub async fn admin_create_squad(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  name: String,
) -> Result<Squad, AdminError> {
  admin::create_squad(&state.db, &admin_id, &name).await
}

#[tauri::command]
pub async fn admin_list_squads(state: State<'_, Arc<AppState>>) -> Result<Vec<Squad>, AdminError> {
  admin::list_squads(&state.db).await
}

/// Participant-side: ask to join a squad
#[tauri::command]
pub async fn request_squad_membership(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  squad_id: i64,
) -> Result<SquadMember, AdminError> {
  admin::request_membership(&state.db, &user_id, squad_id).await
}

#[tauri::command]
pub async fn admin_approve_member(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  squad_id: i64,
  user_id: String,
) -> Result<(), AdminError> {
  admin::approve_membership(&state.db, &admin_id, squad_id, &user_id).await
}

#[tauri::command]
pub async fn admin_transfer_member(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  user_id: String,
  to_squad: i64,
) -> Result<(), AdminError> {
  admin::transfer_member(&state.db, &admin_id, &user_id, to_squad).await
}

/// Members with their check-in for `date` and running total
#[tauri::command]
pub async fn admin_squad_members(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  squad_id: i64,
  date: NaiveDate,
) -> Result<Vec<MemberOverview>, AdminError> {
  admin::squad_members_for_admin(&state.db, &admin_id, squad_id, date).await
}

#[tauri::command]
pub async fn admin_add_activity(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  squad_id: i64,
  activity: NewActivity,
) -> Result<SquadActivity, AdminError> {
  admin::add_activity(&state.db, &admin_id, squad_id, &activity).await
}

#[tauri::command]
pub async fn admin_update_activity(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  activity_id: i64,
  update: ActivityUpdate,
) -> Result<SquadActivity, AdminError> {
  admin::update_activity(&state.db, &admin_id, activity_id, &update).await
}

#[tauri::command]
pub async fn admin_list_activities(
  state: State<'_, Arc<AppState>>,
  squad_id: i64,
) -> Result<Vec<SquadActivity>, AdminError> {
  admin::list_activities(&state.db, squad_id).await
}

#[tauri::command]
pub async fn admin_create_goal_template(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  name: String,
  description: Option<String>,
  points: i64,
) -> Result<GoalTemplate, AdminError> {
  admin::create_goal_template(&state.db, &admin_id, &name, description.as_deref(), points).await
}

#[tauri::command]
pub async fn admin_assign_goal(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  user_id: String,
  slot: u8,
  template_id: i64,
) -> Result<(), AdminError> {
  admin::assign_goal(&state.db, &admin_id, &user_id, slot, template_id).await
}

/// Returns false when the slot was already empty
#[tauri::command]
pub async fn admin_clear_goal(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  user_id: String,
  slot: u8,
) -> Result<bool, AdminError> {
  admin::clear_goal(&state.db, &admin_id, &user_id, slot).await
}

#[tauri::command]
pub async fn admin_award_bonus(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  user_id: String,
  date: NaiveDate,
  points: i64,
  reason: Option<String>,
) -> Result<WeeklyBonus, AdminError> {
  admin::award_weekly_bonus(&state.db, &admin_id, &user_id, date, points, reason.as_deref()).await
}

#[tauri::command]
pub async fn admin_squad_analytics(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  squad_id: i64,
  from: NaiveDate,
  to: NaiveDate,
) -> Result<Vec<DailySquadStats>, AdminError> {
  admin::squad_analytics(&state.db, &admin_id, squad_id, from, to).await
}

#[tauri::command]
pub async fn admin_schedule_workout(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  squad_id: i64,
  date: NaiveDate,
  title: String,
  description: Option<String>,
) -> Result<Workout, AdminError> {
  wod::schedule_workout(&state.db, &admin_id, squad_id, date, &title, description.as_deref()).await
}

/// Recent audit entries for one participant, newest first
#[tauri::command]
pub async fn admin_audit_log(
  state: State<'_, Arc<AppState>>,
  admin_id: String,
  user_id: String,
  limit: Option<i64>,
) -> Result<Vec<AuditEntry>, AdminError> {
  admin::require_admin(&state.db, &admin_id).await?;
  Ok(audit::recent_audit(&state.db, &user_id, limit.unwrap_or(50)).await?)
}
