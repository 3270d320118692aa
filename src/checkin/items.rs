//! Check-in items: the yes/no things a participant answers for a day.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Logical identity of a check-in item.
///
/// Stored as `activity_<id>` / `goal_<slot>` inside `daily_logs.custom_logs`;
/// that string form only exists at the storage and IPC boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemKey {
  /// Squad activity by row id
  Activity(i64),
  /// Personal goal by slot (1 or 2)
  Goal(u8),
}

impl fmt::Display for ItemKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Activity(id) => write!(f, "activity_{}", id),
      Self::Goal(slot) => write!(f, "goal_{}", slot),
    }
  }
}

impl FromStr for ItemKey {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if let Some(id) = s.strip_prefix("activity_") {
      return id
        .parse()
        .map(Self::Activity)
        .map_err(|_| format!("Invalid activity key: {}", s));
    }
    if let Some(slot) = s.strip_prefix("goal_") {
      return slot
        .parse()
        .map(Self::Goal)
        .map_err(|_| format!("Invalid goal key: {}", s));
    }
    Err(format!("Unknown item key: {}", s))
  }
}

impl Serialize for ItemKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ItemKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

/// One answerable item, materialized fresh on every context load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInItem {
  pub key: ItemKey,
  /// Raw configured weight; may be negative if an admin typo'd it
  pub points: i64,
  pub label: String,
  pub description: Option<String>,
}

impl CheckInItem {
  pub fn activity(id: i64, label: impl Into<String>, points: i64) -> Self {
    Self {
      key: ItemKey::Activity(id),
      points,
      label: label.into(),
      description: None,
    }
  }

  pub fn goal(slot: u8, label: impl Into<String>, points: i64) -> Self {
    Self {
      key: ItemKey::Goal(slot),
      points,
      label: label.into(),
      description: None,
    }
  }

  pub fn with_description(mut self, description: Option<String>) -> Self {
    self.description = description;
    self
  }

  /// Weight awarded for a "yes"; never negative
  pub fn effective_points(&self) -> i64 {
    self.points.max(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_string_form() {
    assert_eq!(ItemKey::Activity(42).to_string(), "activity_42");
    assert_eq!(ItemKey::Goal(2).to_string(), "goal_2");
    assert_eq!("activity_7".parse::<ItemKey>().unwrap(), ItemKey::Activity(7));
    assert_eq!("goal_1".parse::<ItemKey>().unwrap(), ItemKey::Goal(1));
  }

  #[test]
  fn test_key_rejects_unknown_forms() {
    assert!("habit_1".parse::<ItemKey>().is_err());
    assert!("activity_".parse::<ItemKey>().is_err());
    assert!("goal_abc".parse::<ItemKey>().is_err());
  }

  #[test]
  fn test_key_serializes_as_string() {
    let json = serde_json::to_string(&ItemKey::Goal(1)).unwrap();
    assert_eq!(json, "\"goal_1\"");
    let back: ItemKey = serde_json::from_str("\"activity_3\"").unwrap();
    assert_eq!(back, ItemKey::Activity(3));
  }

  #[test]
  fn test_negative_points_are_floored() {
    assert_eq!(CheckInItem::activity(1, "Run", -10).effective_points(), 0);
    assert_eq!(CheckInItem::goal(1, "Water", 5).effective_points(), 5);
  }
}
