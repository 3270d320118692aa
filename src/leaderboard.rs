//! Leaderboard & Streaks
//!
//! Point totals are never stored as a running counter. They are summed from
//! the two ledgers every time:
//! - `daily_logs.daily_points` (one row per user per day, overwritten on resubmit)
//! - `weekly_bonuses.points` (one row per user per week)
//!
//! Streaks count consecutive logged days. A streak is still "current" when
//! today has not been logged yet but yesterday was.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};

// ---------------------------------------------------------------------------
/// Streaks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub last_logged: Option<NaiveDate>,
}

/// Compute current and longest streak from logged dates (any order, duplicates ok)
pub fn compute_streak(dates: &[NaiveDate], today: NaiveDate) -> Streak {
    let days: BTreeSet<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
    let Some(&last) = days.iter().next_back() else {
        return Streak::default();
    };

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for day in &days {
        run = match prev {
            Some(p) if *day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }

    // `run` is the streak ending at `last`
    let current = if today - last <= Duration::days(1) { run } else { 0 };

    Streak {
        current,
        longest,
        last_logged: Some(last),
    }
}

/// Streak for one user
pub async fn user_streak(pool: &SqlitePool, user_id: &str, today: NaiveDate) -> Result<Streak, String> {
    let dates: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT log_date FROM daily_logs WHERE user_id = ?1 ORDER BY log_date")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(|e| format!("Failed to load log dates: {}", e))?;

    Ok(compute_streak(&dates, today))
}

/// Streaks for every user who has logged at least once
pub async fn all_user_streaks(pool: &SqlitePool, today: NaiveDate) -> Result<HashMap<String, Streak>, String> {
    let rows: Vec<(String, NaiveDate)> =
        sqlx::query_as("SELECT user_id, log_date FROM daily_logs ORDER BY user_id, log_date")
            .fetch_all(pool)
            .await
            .map_err(|e| format!("Failed to load log dates: {}", e))?;

    let mut by_user: HashMap<String, Vec<NaiveDate>> = HashMap::new();
    for (user_id, date) in rows {
        by_user.entry(user_id).or_default().push(date);
    }

    Ok(by_user
        .into_iter()
        .map(|(user_id, dates)| {
            let streak = compute_streak(&dates, today);
            (user_id, streak)
        })
        .collect())
}

// ---------------------------------------------------------------------------
/// Leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub squad_name: Option<String>,
    pub checkin_points: i64,
    pub bonus_points: i64,
    pub total_points: i64,
    pub days_logged: i64,
    pub current_streak: u32,
}

/// Ranked totals for approved participants, optionally limited to one squad.
///
/// Ties share a rank (1, 2, 2, 4).
pub async fn leaderboard(
    pool: &SqlitePool,
    squad_id: Option<i64>,
    today: NaiveDate,
) -> Result<Vec<LeaderboardEntry>, String> {
    let rows: Vec<(String, String, Option<String>, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT
            u.id,
            u.display_name,
            s.name,
            COALESCE((SELECT SUM(d.daily_points) FROM daily_logs d WHERE d.user_id = u.id), 0),
            COALESCE((SELECT SUM(b.points) FROM weekly_bonuses b WHERE b.user_id = u.id), 0),
            (SELECT COUNT(*) FROM daily_logs d WHERE d.user_id = u.id)
        FROM users u
        JOIN squad_members sm ON sm.user_id = u.id AND sm.status = 'approved'
        JOIN squads s ON s.id = sm.squad_id
        WHERE ?1 IS NULL OR sm.squad_id = ?1
        "#,
    )
    .bind(squad_id)
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to load leaderboard: {}", e))?;

    let streaks = all_user_streaks(pool, today).await?;

    let mut entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .map(|(user_id, display_name, squad_name, checkin, bonus, days)| {
            let current_streak = streaks.get(&user_id).map(|s| s.current).unwrap_or(0);
            LeaderboardEntry {
                rank: 0,
                user_id,
                display_name,
                squad_name,
                checkin_points: checkin,
                bonus_points: bonus,
                total_points: checkin + bonus,
                days_logged: days,
                current_streak,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let mut prev_total: Option<i64> = None;
    let mut rank = 0u32;
    for (i, entry) in entries.iter_mut().enumerate() {
        if prev_total != Some(entry.total_points) {
            rank = i as u32 + 1;
            prev_total = Some(entry.total_points);
        }
        entry.rank = rank;
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
