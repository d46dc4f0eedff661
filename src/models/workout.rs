use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single logged set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
  pub weight: f64,
  pub reps: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rpe: Option<f64>,
}

impl SetLog {
  pub fn volume(&self) -> f64 {
    self.weight * self.reps as f64
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
  pub exercise_name: String,
  pub sets: Vec<SetLog>,
}

impl ExerciseLog {
  pub fn volume(&self) -> f64 {
    self.sets.iter().map(SetLog::volume).sum()
  }
}

/// Append-only workout record; corrections create new records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutHistoryRecord {
  #[serde(default)]
  pub id: Option<i64>,
  pub performed_at: DateTime<Utc>,
  pub duration_minutes: u32,
  pub exercises: Vec<ExerciseLog>,
  pub completed: bool,
}

impl WorkoutHistoryRecord {
  pub fn date(&self) -> NaiveDate {
    self.performed_at.date_naive()
  }

  pub fn total_sets(&self) -> u64 {
    self.exercises.iter().map(|e| e.sets.len() as u64).sum()
  }

  pub fn total_volume(&self) -> f64 {
    self.exercises.iter().map(ExerciseLog::volume).sum()
  }

  /// Completion payload for the progression engine
  pub fn completion(&self) -> WorkoutCompletion {
    WorkoutCompletion {
      total_sets: self.total_sets(),
      total_volume: self.total_volume(),
      duration_minutes: self.duration_minutes,
    }
  }
}

/// Best lift for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalRecord {
  pub exercise: String,
  pub weight: f64,
  pub reps: i64,
  pub achieved_at: DateTime<Utc>,
}

/// Totals reported when a workout is completed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutCompletion {
  pub total_sets: u64,
  pub total_volume: f64,
  pub duration_minutes: u32,
}

/// One manually logged exercise toward the weekly challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLogEntry {
  pub exercise_name: String,
  pub sets: u32,
  pub reps: u32,
  pub weight: f64,
}

impl ExerciseLogEntry {
  pub fn volume(&self) -> f64 {
    self.sets as f64 * self.reps as f64 * self.weight
  }
}
