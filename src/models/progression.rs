use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-user progression state, persisted as one JSON blob.
///
/// Every field defaults so that partially written or older blobs still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionState {
  /// Lifetime XP, never decreases
  #[serde(rename = "totalXP")]
  pub total_xp: u64,
  /// XP used for level derivation; equals total_xp since XP is never spent
  #[serde(rename = "currentXP")]
  pub current_xp: u64,
  pub earned_badges: BTreeSet<String>,
  pub streak_days: u32,
  pub last_workout_date: Option<NaiveDate>,
  #[serde(rename = "dailyXP")]
  pub daily_xp: XpWindow,
  #[serde(rename = "weeklyXP")]
  pub weekly_xp: XpWindow,
  pub weekly_challenge: WeeklyChallengeProgress,
  pub stats: LifetimeStats,
  pub daily_bonus: Option<DailyBonus>,
  pub last_bonus_check: Option<NaiveDate>,
  pub challenge_log: Vec<ChallengeLogEntry>,
}

impl Default for ProgressionState {
  fn default() -> Self {
    Self {
      total_xp: 0,
      current_xp: 0,
      earned_badges: BTreeSet::new(),
      streak_days: 0,
      last_workout_date: None,
      daily_xp: XpWindow::with_goal(100),
      weekly_xp: XpWindow::with_goal(500),
      weekly_challenge: WeeklyChallengeProgress::default(),
      stats: LifetimeStats::default(),
      daily_bonus: None,
      last_bonus_check: None,
      challenge_log: Vec::new(),
    }
  }
}

impl ProgressionState {
  pub fn new(daily_goal: u64, weekly_goal: u64) -> Self {
    Self {
      daily_xp: XpWindow::with_goal(daily_goal),
      weekly_xp: XpWindow::with_goal(weekly_goal),
      ..Self::default()
    }
  }

  pub fn has_badge(&self, id: &str) -> bool {
    self.earned_badges.contains(id)
  }
}

/// XP counter over a calendar window (a day, or a Monday-start week)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XpWindow {
  pub period_start: Option<NaiveDate>,
  pub amount: u64,
  pub goal: u64,
  pub goal_met: bool,
}

impl Default for XpWindow {
  fn default() -> Self {
    Self::with_goal(0)
  }
}

impl XpWindow {
  pub fn with_goal(goal: u64) -> Self {
    Self {
      period_start: None,
      amount: 0,
      goal,
      goal_met: false,
    }
  }

  /// Zero the counter if the window has moved on
  pub fn roll(&mut self, period_start: NaiveDate) {
    if self.period_start != Some(period_start) {
      self.period_start = Some(period_start);
      self.amount = 0;
      self.goal_met = false;
    }
  }

  pub fn percentage(&self) -> u32 {
    if self.goal == 0 {
      return 100;
    }
    ((self.amount as f64 / self.goal as f64) * 100.0).round().min(100.0) as u32
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklyChallengeProgress {
  pub challenge_id: String,
  pub progress: f64,
  pub completed: bool,
  pub week_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifetimeStats {
  pub total_workouts: u64,
  pub total_sets: u64,
  pub total_volume: f64,
  #[serde(rename = "totalPRs")]
  pub total_prs: u64,
  pub shares_count: u64,
  pub tutorials_watched: u64,
  pub exercise_set_counts: BTreeMap<String, u64>,
}

impl LifetimeStats {
  pub fn max_exercise_sets(&self) -> u64 {
    self.exercise_set_counts.values().copied().max().unwrap_or(0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusKind {
  #[serde(rename = "tripleXP")]
  TripleXp,
  #[serde(rename = "doubleXP")]
  DoubleXp,
  #[serde(rename = "bonusBadgeProgress")]
  BonusBadgeProgress,
}

impl BonusKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::TripleXp => "tripleXP",
      Self::DoubleXp => "doubleXP",
      Self::BonusBadgeProgress => "bonusBadgeProgress",
    }
  }
}

/// Result of the once-per-day bonus roll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBonus {
  pub kind: BonusKind,
  pub multiplier: f64,
  pub rolled_on: NaiveDate,
}

/// Manually logged exercise toward the weekly challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeLogEntry {
  pub challenge_id: String,
  pub exercise_name: String,
  pub sets: u32,
  pub reps: u32,
  pub weight: f64,
  pub volume: f64,
  pub logged_at: DateTime<Utc>,
  /// Calendar date of the logging clock; absent in older blobs
  #[serde(default)]
  pub logged_on: Option<NaiveDate>,
}

impl ChallengeLogEntry {
  /// Date used for week bucketing, falling back to the UTC date of `logged_at`
  pub fn log_date(&self) -> NaiveDate {
    self.logged_on.unwrap_or_else(|| self.logged_at.date_naive())
  }
}
