//! Check-in session: the Response Collector for one user and selected date.
//!
//! Selecting a date clears every answer, slip-up and the note, and hands out a
//! `LoadTicket`. Context results are only applied when their ticket still
//! matches the selection, so a slow load for a previous date is dropped.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::context::CheckInContext;
use super::items::{CheckInItem, ItemKey};
use super::responses::{Responses, Slipup, SlipupFlags};
use super::scoring::{self, Score};
use super::submit::{CheckInSubmission, SubmissionReceipt, Submitter};
use super::CheckInError;

/// Number of days a participant may check in for (today and the two before)
pub const WINDOW_DAYS: usize = 3;

pub fn selectable_dates(today: NaiveDate) -> [NaiveDate; WINDOW_DAYS] {
  [today, today - Duration::days(1), today - Duration::days(2)]
}

/// Identifies one context load. Stale tickets are ignored by `apply_context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
  pub date: NaiveDate,
  generation: u64,
}

#[derive(Debug)]
pub struct CheckInSession {
  user_id: String,
  today: NaiveDate,
  selected: NaiveDate,
  generation: u64,
  context: Option<CheckInContext>,
  responses: Responses,
  slipups: SlipupFlags,
  note: String,
  already_submitted: bool,
  last_receipt: Option<SubmissionReceipt>,
  submitter: Arc<Submitter>,
}

/// Snapshot of the session for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
  pub user_id: String,
  pub selected_date: NaiveDate,
  pub selectable_dates: Vec<NaiveDate>,
  pub loading: bool,
  pub has_squad: bool,
  pub activities: Vec<CheckInItem>,
  pub goals: Vec<CheckInItem>,
  pub responses: Responses,
  pub slipups: SlipupFlags,
  pub note: String,
  pub all_answered: bool,
  pub can_submit: bool,
  pub submitting: bool,
  pub score: Score,
  pub already_submitted: bool,
  pub last_receipt: Option<SubmissionReceipt>,
  pub load_error: Option<String>,
}

impl CheckInSession {
  /// New session with today selected and nothing loaded yet
  pub fn new(user_id: impl Into<String>, today: NaiveDate) -> Self {
    Self {
      user_id: user_id.into(),
      today,
      selected: today,
      generation: 0,
      context: None,
      responses: Responses::default(),
      slipups: SlipupFlags::default(),
      note: String::new(),
      already_submitted: false,
      last_receipt: None,
      submitter: Arc::new(Submitter::new()),
    }
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  pub fn selected_date(&self) -> NaiveDate {
    self.selected
  }

  pub fn today(&self) -> NaiveDate {
    self.today
  }

  pub fn submitter(&self) -> Arc<Submitter> {
    Arc::clone(&self.submitter)
  }

  pub fn is_loading(&self) -> bool {
    self.context.is_none()
  }

  pub fn context(&self) -> Option<&CheckInContext> {
    self.context.as_ref()
  }

  /// Switch to `date` (or reload the current one). All state is reset before
  /// any stored check-in can be applied.
  pub fn select_date(&mut self, date: NaiveDate) -> Result<LoadTicket, CheckInError> {
    if !selectable_dates(self.today).contains(&date) {
      return Err(CheckInError::DateOutsideWindow(date));
    }

    self.selected = date;
    self.generation += 1;
    self.context = None;
    self.responses = Responses::default();
    self.slipups = SlipupFlags::default();
    self.note.clear();
    self.already_submitted = false;
    self.last_receipt = None;

    Ok(LoadTicket {
      date,
      generation: self.generation,
    })
  }

  /// Move the window forward when the calendar day changes. The selection and
  /// its answers are kept while the selected date is still in the window.
  pub fn roll_today(&mut self, today: NaiveDate) -> Option<LoadTicket> {
    if today == self.today {
      return None;
    }
    self.today = today;
    if selectable_dates(today).contains(&self.selected) {
      return None;
    }
    self.select_date(today).ok()
  }

  /// Apply a loaded context. Returns false when the ticket is stale.
  pub fn apply_context(&mut self, ticket: LoadTicket, context: CheckInContext) -> bool {
    if ticket.generation != self.generation || ticket.date != self.selected || context.date != ticket.date {
      debug!(
        user_id = %self.user_id,
        ticket_date = %ticket.date,
        selected = %self.selected,
        "Discarding stale check-in context"
      );
      return false;
    }

    self.responses = Responses::unanswered(context.live_keys());
    if let Some(existing) = &context.existing {
      self.responses.hydrate(&existing.responses);
      self.slipups = existing.slipups;
      self.note = existing.note.clone().unwrap_or_default();
      self.already_submitted = true;
    }
    self.context = Some(context);
    true
  }

  pub fn answer(&mut self, key: ItemKey, value: bool) -> Result<(), CheckInError> {
    match &self.context {
      Some(context) if context.contains(key) => {
        self.responses.answer(key, value);
        Ok(())
      }
      _ => Err(CheckInError::UnknownItem(key.to_string())),
    }
  }

  pub fn set_slipup(&mut self, slipup: Slipup, value: bool) {
    self.slipups.set(slipup, value);
  }

  pub fn set_note(&mut self, note: impl Into<String>) {
    self.note = note.into();
  }

  /// Every live activity and goal has an answer. False while loading.
  pub fn all_answered(&self) -> bool {
    match &self.context {
      Some(context) => self.responses.all_answered(&context.live_keys()),
      None => false,
    }
  }

  /// A context with a `load_error` may be missing items or the stored row,
  /// so it never gates open.
  pub fn can_submit(&self) -> bool {
    let complete = self.context.as_ref().is_some_and(|c| c.load_error.is_none());
    complete && self.all_answered() && !self.submitter.is_in_flight()
  }

  /// Recomputed on every call
  pub fn current_score(&self) -> Score {
    match &self.context {
      Some(context) => scoring::score(context.items(), &self.responses, &self.slipups),
      None => scoring::score(std::iter::empty::<&CheckInItem>(), &self.responses, &self.slipups),
    }
  }

  /// Build the request for the selected date
  pub fn submission(&self) -> Result<CheckInSubmission, CheckInError> {
    let context = self
      .context
      .as_ref()
      .ok_or(CheckInError::Loading(self.selected))?;
    if context.load_error.is_some() {
      return Err(CheckInError::ContextIncomplete(self.selected));
    }
    if !self.all_answered() {
      return Err(CheckInError::Incomplete);
    }

    Ok(CheckInSubmission {
      user_id: self.user_id.clone(),
      date: self.selected,
      items: context.items().cloned().collect(),
      responses: self.responses.clone(),
      slipups: self.slipups,
      note: self.note.clone(),
    })
  }

  /// Record a successful submit if the session is still on that date
  pub fn mark_submitted(&mut self, receipt: SubmissionReceipt) -> bool {
    if receipt.date != self.selected {
      return false;
    }
    self.already_submitted = true;
    self.last_receipt = Some(receipt);
    true
  }

  pub fn view(&self) -> SessionView {
    let (activities, goals, has_squad, load_error) = match &self.context {
      Some(c) => (
        c.activities.clone(),
        c.goals.clone(),
        c.squad_id.is_some(),
        c.load_error.clone(),
      ),
      None => (Vec::new(), Vec::new(), false, None),
    };

    SessionView {
      user_id: self.user_id.clone(),
      selected_date: self.selected,
      selectable_dates: selectable_dates(self.today).to_vec(),
      loading: self.is_loading(),
      has_squad,
      activities,
      goals,
      responses: self.responses.clone(),
      slipups: self.slipups,
      note: self.note.clone(),
      all_answered: self.all_answered(),
      can_submit: self.can_submit(),
      submitting: self.submitter.is_in_flight(),
      score: self.current_score(),
      already_submitted: self.already_submitted,
      last_receipt: self.last_receipt,
      load_error,
    }
  }
}
