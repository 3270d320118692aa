//! Tauri commands for the daily check-in flow
//!
//! The sessions lock is only held while touching a session. Context loads and
//! submits run with it released; their results go back through
//! `apply_context` / `mark_submitted`, which drop anything stale.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tauri::State;

use crate::checkin::context::{load_context, CheckInContext};
use crate::checkin::items::ItemKey;
use crate::checkin::responses::Slipup;
use crate::checkin::session::{CheckInSession, LoadTicket, SessionView};
use crate::checkin::submit::SubmitOutcome;
use crate::checkin::CheckInError;
use crate::db::AppState;

fn local_today() -> NaiveDate {
  Local::now().date_naive()
}

/// Load the context for `ticket` and apply it, then return the session view
async fn load_and_apply(state: &AppState, user_id: &str, ticket: LoadTicket) -> Result<SessionView, CheckInError> {
  let context = load_context(&state.db, state.context_strategy, user_id, ticket.date).await;

  let mut sessions = state.sessions.lock().await;
  let session = sessions
    .get_mut(user_id)
    .ok_or_else(|| CheckInError::NoSession(user_id.to_string()))?;
  session.apply_context(ticket, context);
  Ok(session.view())
}

/// Open (or roll over) the user's session and select `date`, or keep the
/// current selection when `date` is `None`
async fn open_session(
  state: &AppState,
  user_id: &str,
  date: Option<NaiveDate>,
  today: NaiveDate,
) -> Result<SessionView, CheckInError> {
  let ticket = {
    let mut sessions = state.sessions.lock().await;
    // One participant at a time: opening a new user's session drops the rest
    if !sessions.contains_key(user_id) {
      sessions.clear();
    }
    let mut fresh = false;
    let session = sessions.entry(user_id.to_string()).or_insert_with(|| {
      fresh = true;
      CheckInSession::new(user_id, today)
    });
    let rolled = session.roll_today(today);

    match date {
      Some(date) => Some(session.select_date(date)?),
      None if fresh => Some(session.select_date(today)?),
      None => rolled,
    }
  };

  match ticket {
    Some(ticket) => load_and_apply(state, user_id, ticket).await,
    None => view_of(state, user_id).await,
  }
}

async fn view_of(state: &AppState, user_id: &str) -> Result<SessionView, CheckInError> {
  let sessions = state.sessions.lock().await;
  sessions
    .get(user_id)
    .map(CheckInSession::view)
    .ok_or_else(|| CheckInError::NoSession(user_id.to_string()))
}

async fn edit_session<F>(state: &AppState, user_id: &str, edit: F) -> Result<SessionView, CheckInError>
where
  F: FnOnce(&mut CheckInSession) -> Result<(), CheckInError>,
{
  let mut sessions = state.sessions.lock().await;
  let session = sessions
    .get_mut(user_id)
    .ok_or_else(|| CheckInError::NoSession(user_id.to_string()))?;
  edit(session)?;
  Ok(session.view())
}

/// Submit the selected date. On success the stored row is reloaded so the
/// session reflects exactly what was persisted.
async fn submit_session(state: &AppState, user_id: &str) -> Result<SubmitOutcome, CheckInError> {
  let (submission, submitter) = {
    let sessions = state.sessions.lock().await;
    let session = sessions
      .get(user_id)
      .ok_or_else(|| CheckInError::NoSession(user_id.to_string()))?;
    (session.submission()?, session.submitter())
  };

  let outcome = submitter.submit(&state.db, &submission).await?;

  if let SubmitOutcome::Submitted(receipt) = outcome {
    let ticket = {
      let mut sessions = state.sessions.lock().await;
      match sessions.get_mut(user_id) {
        Some(session) => {
          if session.mark_submitted(receipt) {
            session.select_date(receipt.date).ok()
          } else {
            None
          }
        }
        None => None,
      }
    };

    if let Some(ticket) = ticket {
      load_and_apply(state, user_id, ticket).await?;
      let mut sessions = state.sessions.lock().await;
      if let Some(session) = sessions.get_mut(user_id) {
        session.mark_submitted(receipt);
      }
    }
  }

  Ok(outcome)
}

/// ---------------------------------------------------------------------------
/// Commands
/// ---------------------------------------------------------------------------

/// Select a date in the check-in window and load its context
#[tauri::command]
pub async fn checkin_select_date(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  date: NaiveDate,
) -> Result<SessionView, CheckInError> {
  open_session(&state, &user_id, Some(date), local_today()).await
}

/// Current session state, opening a session for today if needed
#[tauri::command]
pub async fn checkin_state(state: State<'_, Arc<AppState>>, user_id: String) -> Result<SessionView, CheckInError> {
  open_session(&state, &user_id, None, local_today()).await
}

#[tauri::command]
pub async fn checkin_answer(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  item: ItemKey,
  value: bool,
) -> Result<SessionView, CheckInError> {
  edit_session(&state, &user_id, |s| s.answer(item, value)).await
}

#[tauri::command]
pub async fn checkin_set_slipup(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  slipup: Slipup,
  value: bool,
) -> Result<SessionView, CheckInError> {
  edit_session(&state, &user_id, |s| {
    s.set_slipup(slipup, value);
    Ok(())
  })
  .await
}

#[tauri::command]
pub async fn checkin_set_note(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  note: String,
) -> Result<SessionView, CheckInError> {
  edit_session(&state, &user_id, |s| {
    s.set_note(note);
    Ok(())
  })
  .await
}

#[tauri::command]
pub async fn checkin_submit(state: State<'_, Arc<AppState>>, user_id: String) -> Result<SubmitOutcome, CheckInError> {
  submit_session(&state, &user_id).await
}

/// Raw context for a date, without touching the session
#[tauri::command]
pub async fn get_checkin_context(
  state: State<'_, Arc<AppState>>,
  user_id: String,
  date: NaiveDate,
) -> Result<CheckInContext, CheckInError> {
  Ok(load_context(&state.db, state.context_strategy, &user_id, date).await)
}
