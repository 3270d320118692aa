//! Response Collector state: per-item answers, slip-up flags and the note.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::items::ItemKey;
use super::CheckInError;

pub const NOTE_MAX_CHARS: usize = 500;

/// ---------------------------------------------------------------------------
/// Answers
/// ---------------------------------------------------------------------------

/// Tri-state answers keyed by item. `None` means unanswered.
///
/// Keys that no longer match a live item (deleted activity, reassigned goal)
/// are kept and written back on the next submission. Entries whose key cannot
/// be parsed at all live in `orphaned`, verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Responses {
  answers: BTreeMap<ItemKey, Option<bool>>,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  orphaned: Map<String, Value>,
}

impl Responses {
  /// Fresh state with every live key unanswered
  pub fn unanswered<I>(live_keys: I) -> Self
  where
    I: IntoIterator<Item = ItemKey>,
  {
    Self {
      answers: live_keys.into_iter().map(|k| (k, None)).collect(),
      orphaned: Map::new(),
    }
  }

  pub fn get(&self, key: ItemKey) -> Option<bool> {
    self.answers.get(&key).copied().flatten()
  }

  pub fn is_yes(&self, key: ItemKey) -> bool {
    self.get(key) == Some(true)
  }

  /// Unanswered -> Yes/No, or Yes <-> No. There is no way back to unanswered.
  pub fn answer(&mut self, key: ItemKey, value: bool) {
    self.answers.insert(key, Some(value));
  }

  /// True when every live key has an answer. Vacuously true for no items.
  pub fn all_answered(&self, live_keys: &[ItemKey]) -> bool {
    live_keys.iter().all(|k| self.get(*k).is_some())
  }

  /// Overlay previously persisted answers on top of the current state
  pub fn hydrate(&mut self, stored: &Responses) {
    for (key, value) in &stored.answers {
      self.answers.insert(*key, *value);
    }
    for (key, value) in &stored.orphaned {
      self.orphaned.insert(key.clone(), value.clone());
    }
  }

  pub fn answers(&self) -> impl Iterator<Item = (ItemKey, Option<bool>)> + '_ {
    self.answers.iter().map(|(k, v)| (*k, *v))
  }

  /// Stored entries that could not be mapped to any item key
  pub fn orphaned(&self) -> &Map<String, Value> {
    &self.orphaned
  }

  /// Serialize into the `custom_logs` JSON object
  pub fn to_custom_logs(&self) -> Value {
    let mut object = self.orphaned.clone();
    for (key, value) in &self.answers {
      let json = match value {
        Some(b) => Value::Bool(*b),
        None => Value::Null,
      };
      object.insert(key.to_string(), json);
    }
    Value::Object(object)
  }

  /// Parse a stored `custom_logs` blob
  pub fn from_custom_logs(raw: &str) -> Result<Self, CheckInError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(object) = value else {
      return Err(CheckInError::Storage(
        "custom_logs is not a JSON object".to_string(),
      ));
    };

    let mut responses = Self::default();
    for (raw_key, value) in object {
      // Only canonical spellings map to an item ("activity_007" stays raw)
      let parsed = raw_key
        .parse::<ItemKey>()
        .ok()
        .filter(|key| key.to_string() == raw_key);
      match (parsed, &value) {
        (Some(key), Value::Bool(b)) => {
          responses.answers.insert(key, Some(*b));
        }
        (Some(key), Value::Null) => {
          responses.answers.insert(key, None);
        }
        _ => {
          responses.orphaned.insert(raw_key, value);
        }
      }
    }
    Ok(responses)
  }
}

/// ---------------------------------------------------------------------------
/// Slip-ups
/// ---------------------------------------------------------------------------

/// The fixed set of self-reported slip-ups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipupFlags {
  pub junk_food: bool,
  pub processed_sugar: bool,
  pub alcohol_excess: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slipup {
  JunkFood,
  ProcessedSugar,
  AlcoholExcess,
}

impl SlipupFlags {
  pub fn set(&mut self, slipup: Slipup, value: bool) {
    match slipup {
      Slipup::JunkFood => self.junk_food = value,
      Slipup::ProcessedSugar => self.processed_sugar = value,
      Slipup::AlcoholExcess => self.alcohol_excess = value,
    }
  }

  pub fn count(&self) -> u32 {
    [self.junk_food, self.processed_sugar, self.alcohol_excess]
      .iter()
      .filter(|f| **f)
      .count() as u32
  }
}

/// ---------------------------------------------------------------------------
/// Note to admin
/// ---------------------------------------------------------------------------

/// Trim the note; blank becomes `None`
pub fn normalize_note(raw: &str) -> Result<Option<String>, CheckInError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  let len = trimmed.chars().count();
  if len > NOTE_MAX_CHARS {
    return Err(CheckInError::NoteTooLong(len));
  }
  Ok(Some(trimmed.to_string()))
}
