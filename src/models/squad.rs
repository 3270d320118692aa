use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Squad {
  pub id: i64,
  pub name: String,
  pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SquadMember {
  pub id: i64,
  pub squad_id: i64,
  pub user_id: String,
  /// pending | approved | rejected
  pub status: String,
  pub joined_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SquadActivity {
  pub id: i64,
  pub squad_id: i64,
  pub name: String,
  pub description: Option<String>,
  pub points: i64,
  pub display_order: i64,
  pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GoalTemplate {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  pub points: i64,
}
