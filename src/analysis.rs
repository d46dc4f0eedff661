//! Deterministic analysis layer over workout history
//!
//! Readiness scoring, per-exercise volume trends, 1RM estimates and next-weight
//! suggestions. Everything here is a pure function of the history slice and
//! the instant passed in.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::WorkoutHistoryRecord;

/// RPE assumed when no set in the window carries one
pub const DEFAULT_RPE: f64 = 7.0;

/// ---------------------------------------------------------------------------
/// Readiness
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
  /// No training in the trailing week
  Rested,
  Optimal,
  Good,
  Moderate,
  Fatigued,
}

impl ReadinessStatus {
  pub fn from_score(score: u32) -> Self {
    match score {
      s if s >= 80 => ReadinessStatus::Optimal,
      s if s >= 60 => ReadinessStatus::Good,
      s if s >= 40 => ReadinessStatus::Moderate,
      _ => ReadinessStatus::Fatigued,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ReadinessStatus::Rested => "rested",
      ReadinessStatus::Optimal => "optimal",
      ReadinessStatus::Good => "good",
      ReadinessStatus::Moderate => "moderate",
      ReadinessStatus::Fatigued => "fatigued",
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      ReadinessStatus::Rested => "Fully rested. A great day to get back under the bar.",
      ReadinessStatus::Optimal => "You're primed to push hard today. Go after a PR.",
      ReadinessStatus::Good => "Good to train. Stick to the plan and keep quality high.",
      ReadinessStatus::Moderate => "Some fatigue building. Keep intensity moderate today.",
      ReadinessStatus::Fatigued => "Your body needs recovery. Consider a deload or rest day.",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
  /// 0-100
  pub score: u32,
  pub status: ReadinessStatus,
  pub message: String,
  #[serde(rename = "avgRPE")]
  pub avg_rpe: f64,
  pub workouts_this_week: u32,
  pub days_since_last_workout: Option<i64>,
}

impl Readiness {
  /// Score recovery from the trailing 7 days of completed workouts
  ///
  /// `100 - (avgRPE - 7) * 10 - max(0, workouts - 4) * 5 + min(daysSince * 10, 30)`,
  /// clamped to 0-100.
  pub fn compute(history: &[WorkoutHistoryRecord], now: DateTime<Utc>) -> Self {
    let recent: Vec<_> = history
      .iter()
      .filter(|w| w.completed && w.performed_at <= now)
      .filter(|w| (now - w.performed_at).num_days() < 7)
      .collect();

    if recent.is_empty() {
      let status = ReadinessStatus::Rested;
      return Self {
        score: 100,
        status,
        message: status.message().to_string(),
        avg_rpe: DEFAULT_RPE,
        workouts_this_week: 0,
        days_since_last_workout: None,
      };
    }

    let rpes: Vec<f64> = recent
      .iter()
      .flat_map(|w| w.exercises.iter())
      .flat_map(|e| e.sets.iter())
      .filter_map(|s| s.rpe)
      .collect();
    let avg_rpe = if rpes.is_empty() {
      DEFAULT_RPE
    } else {
      rpes.iter().sum::<f64>() / rpes.len() as f64
    };

    let workouts_this_week = recent.len() as u32;
    let days_since = recent
      .iter()
      .map(|w| w.performed_at)
      .max()
      .map(|last| (now.date_naive() - last.date_naive()).num_days())
      .unwrap_or(0);

    let rpe_penalty = (avg_rpe - 7.0) * 10.0;
    let frequency_penalty = (workouts_this_week.saturating_sub(4) * 5) as f64;
    let rest_credit = ((days_since * 10) as f64).min(30.0);
    let raw = 100.0 - rpe_penalty - frequency_penalty + rest_credit;
    let score = raw.round().clamp(0.0, 100.0) as u32;

    let status = ReadinessStatus::from_score(score);

    Self {
      score,
      status,
      message: status.message().to_string(),
      avg_rpe,
      workouts_this_week,
      days_since_last_workout: Some(days_since),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Volume Trend
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
  Increasing,
  Stable,
  Decreasing,
}

impl VolumeTrend {
  pub fn as_str(&self) -> &'static str {
    match self {
      VolumeTrend::Increasing => "increasing",
      VolumeTrend::Stable => "stable",
      VolumeTrend::Decreasing => "decreasing",
    }
  }
}

/// Total volume per calendar date for one exercise, oldest first
pub fn daily_volumes(history: &[WorkoutHistoryRecord], exercise: &str) -> Vec<(NaiveDate, f64)> {
  let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

  for w in history {
    for e in w.exercises.iter().filter(|e| e.exercise_name.eq_ignore_ascii_case(exercise)) {
      *by_date.entry(w.date()).or_insert(0.0) += e.volume();
    }
  }

  by_date.into_iter().collect()
}

/// Compare mean volume of the older half against the newer half
///
/// Needs at least two dated entries. With an odd count the older half takes
/// the extra entry. A change beyond +/-5% is a trend.
pub fn volume_trend(history: &[WorkoutHistoryRecord], exercise: &str) -> VolumeTrend {
  let volumes = daily_volumes(history, exercise);
  if volumes.len() < 2 {
    return VolumeTrend::Stable;
  }

  let mid = volumes.len().div_ceil(2);
  let mean = |slice: &[(NaiveDate, f64)]| slice.iter().map(|(_, v)| v).sum::<f64>() / slice.len() as f64;
  let first = mean(&volumes[..mid]);
  let second = mean(&volumes[mid..]);

  if first <= 0.0 {
    return if second > 0.0 {
      VolumeTrend::Increasing
    } else {
      VolumeTrend::Stable
    };
  }

  let change = (second - first) / first;
  if change > 0.05 {
    VolumeTrend::Increasing
  } else if change < -0.05 {
    VolumeTrend::Decreasing
  } else {
    VolumeTrend::Stable
  }
}

/// ---------------------------------------------------------------------------
/// Strength Estimates
/// ---------------------------------------------------------------------------

/// Brzycki estimate below 12 reps; above that a flat 1.3x heuristic
pub fn estimate_1rm(weight: f64, reps: u32) -> f64 {
  if reps < 12 {
    weight * 36.0 / (37.0 - reps as f64)
  } else {
    weight * 1.3
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestLift {
  pub weight: f64,
  pub reps: u32,
  pub date: NaiveDate,
  #[serde(rename = "estimated1RM")]
  pub estimated_1rm: f64,
}

/// Heaviest set per exercise (ties go to more reps, then the earlier date)
pub fn best_lifts(history: &[WorkoutHistoryRecord]) -> BTreeMap<String, BestLift> {
  let mut best: BTreeMap<String, BestLift> = BTreeMap::new();

  let mut ordered: Vec<_> = history.iter().collect();
  ordered.sort_by_key(|w| w.performed_at);

  for w in ordered {
    for e in &w.exercises {
      for s in &e.sets {
        let better = match best.get(&e.exercise_name) {
          Some(current) => s.weight > current.weight || (s.weight == current.weight && s.reps > current.reps),
          None => true,
        };
        if better {
          best.insert(
            e.exercise_name.clone(),
            BestLift {
              weight: s.weight,
              reps: s.reps,
              date: w.date(),
              estimated_1rm: estimate_1rm(s.weight, s.reps),
            },
          );
        }
      }
    }
  }

  best
}

/// ---------------------------------------------------------------------------
/// Next-Session Prescription
/// ---------------------------------------------------------------------------

pub fn round_to_nearest_5(weight: f64) -> f64 {
  (weight / 5.0).round() * 5.0
}

/// Working weight from the most recent session containing `exercise`
///
/// Prefers the heaviest set that reached `target_reps`, falling back to the
/// heaviest set of that session.
pub fn last_working_weight(
  history: &[WorkoutHistoryRecord],
  exercise: &str,
  target_reps: u32,
) -> Option<f64> {
  let latest = history
    .iter()
    .filter(|w| w.exercises.iter().any(|e| e.exercise_name.eq_ignore_ascii_case(exercise)))
    .max_by_key(|w| w.performed_at)?;

  let sets: Vec<_> = latest
    .exercises
    .iter()
    .filter(|e| e.exercise_name.eq_ignore_ascii_case(exercise))
    .flat_map(|e| e.sets.iter())
    .collect();

  let heaviest = |min_reps: u32| {
    sets
      .iter()
      .filter(|s| s.reps >= min_reps)
      .map(|s| s.weight)
      .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))))
  };

  heaviest(target_reps).or_else(|| heaviest(0))
}

/// Suggest the next working weight
///
/// - increasing trend and RPE < 8: +2.5%
/// - decreasing trend or RPE > 8.5: deload to 90%
/// - RPE within 7-8: +1%
/// - otherwise unchanged
///
/// Adjusted weights are rounded to the nearest 5.
pub fn suggest_next_weight(
  history: &[WorkoutHistoryRecord],
  exercise: &str,
  target_reps: u32,
  avg_rpe: f64,
  trend: VolumeTrend,
) -> Option<f64> {
  let weight = last_working_weight(history, exercise, target_reps)?;
  Some(adjust_weight(weight, avg_rpe, trend))
}

pub fn adjust_weight(weight: f64, avg_rpe: f64, trend: VolumeTrend) -> f64 {
  if trend == VolumeTrend::Increasing && avg_rpe < 8.0 {
    round_to_nearest_5(weight * 1.025)
  } else if trend == VolumeTrend::Decreasing || avg_rpe > 8.5 {
    round_to_nearest_5(weight * 0.9)
  } else if (7.0..=8.0).contains(&avg_rpe) {
    round_to_nearest_5(weight * 1.01)
  } else {
    weight
  }
}

/// Per-set weights ramping from 90% to 100%; the last set is exactly `weight`
///
/// Intermediate sets round to the nearest 5 but never exceed `weight`, so the
/// ramp is non-decreasing even when `weight` is off the 5 lb grid.
pub fn prescribe_sets(weight: f64, set_count: usize) -> Vec<f64> {
  match set_count {
    0 => Vec::new(),
    1 => vec![weight],
    n => (0..n)
      .map(|i| {
        if i == n - 1 {
          weight
        } else {
          let pct = 0.9 + 0.1 * (i as f64 / (n - 1) as f64);
          round_to_nearest_5(weight * pct).min(weight)
        }
      })
      .collect(),
  }
}

/// Average RPE of the named exercise over its most recent session
pub fn last_session_rpe(history: &[WorkoutHistoryRecord], exercise: &str) -> Option<f64> {
  let latest = history
    .iter()
    .filter(|w| w.exercises.iter().any(|e| e.exercise_name.eq_ignore_ascii_case(exercise)))
    .max_by_key(|w| w.performed_at)?;

  let rpes: Vec<f64> = latest
    .exercises
    .iter()
    .filter(|e| e.exercise_name.eq_ignore_ascii_case(exercise))
    .flat_map(|e| e.sets.iter())
    .filter_map(|s| s.rpe)
    .collect();

  if rpes.is_empty() {
    None
  } else {
    Some(rpes.iter().sum::<f64>() / rpes.len() as f64)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
