use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
  pub id: String,
  pub display_name: String,
  pub is_admin: bool,
  pub created_at: Option<NaiveDateTime>,
}
