//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock workout and personal record factories
//! - Fixed instants and config
//! - Helper assertions

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::models::{ExerciseLog, PersonalRecord, SetLog, WorkoutHistoryRecord};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed one Squat session per day ending on [`wednesday`], heavier each day
/// Returns the IDs of created workouts
pub async fn seed_history(pool: &SqlitePool, user_id: &str, count: usize) -> Vec<i64> {
  let mut ids = Vec::new();

  for i in 0..count {
    let days_ago = i as i64;
    let weight = 200.0 + (count - i) as f64 * 10.0;
    let workout = mock_workout("Squat", wednesday() - Duration::days(days_ago), weight, 5);
    let exercises_json = serde_json::to_string(&workout.exercises).expect("Failed to encode exercises");

    let result = sqlx::query(
      r#"
      INSERT INTO workout_history (user_id, performed_at, duration_minutes, exercises_json, completed)
      VALUES (?1, ?2, ?3, ?4, 1)
      "#,
    )
    .bind(user_id)
    .bind(workout.performed_at)
    .bind(workout.duration_minutes as i64)
    .bind(exercises_json)
    .execute(pool)
    .await
    .expect("Failed to seed workout");

    ids.push(result.last_insert_rowid());
  }

  ids
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Completed single-set workout for one exercise
pub fn mock_workout(exercise: &str, performed_at: DateTime<Utc>, weight: f64, reps: u32) -> WorkoutHistoryRecord {
  WorkoutHistoryRecord {
    id: None,
    performed_at,
    duration_minutes: 45,
    exercises: vec![ExerciseLog {
      exercise_name: exercise.to_string(),
      sets: vec![SetLog { weight, reps, rpe: None }],
    }],
    completed: true,
  }
}

/// Same as [`mock_workout`] with an RPE on the set
pub fn mock_workout_with_rpe(
  exercise: &str,
  performed_at: DateTime<Utc>,
  weight: f64,
  reps: u32,
  rpe: f64,
) -> WorkoutHistoryRecord {
  let mut workout = mock_workout(exercise, performed_at, weight, reps);
  for exercise in &mut workout.exercises {
    for set in &mut exercise.sets {
      set.rpe = Some(rpe);
    }
  }
  workout
}

/// Bench session that was either finished or abandoned
pub fn mock_workout_with_completion(performed_at: DateTime<Utc>, completed: bool) -> WorkoutHistoryRecord {
  WorkoutHistoryRecord {
    completed,
    ..mock_workout("Bench Press", performed_at, 135.0, 8)
  }
}

pub fn mock_personal_record(exercise: &str, weight: f64, reps: i64, achieved_at: DateTime<Utc>) -> PersonalRecord {
  PersonalRecord {
    exercise: exercise.to_string(),
    weight,
    reps,
    achieved_at,
  }
}

/// Defaults with a tight retry budget
pub fn test_config() -> EngineConfig {
  EngineConfig {
    max_cas_retries: 3,
    ..EngineConfig::default()
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Wednesday 2025-03-12 18:00 UTC
pub fn wednesday() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 3, 12, 18, 0, 0).unwrap()
}

/// Create a DateTime N days before [`wednesday`]
pub fn days_before_wednesday(days: i64) -> DateTime<Utc> {
  wednesday() - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {{
    let left: f64 = $left;
    let right: f64 = $right;
    let diff = (left - right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      left,
      right,
      diff,
      $tolerance
    );
  }};
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('progression_state', 'workout_history', 'personal_records')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 3, "Expected 3 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_history_returns_correct_count() {
    let pool = setup_test_db().await;

    let ids = seed_history(&pool, "sam", 5).await;
    assert_eq!(ids.len(), 5);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_history WHERE user_id = 'sam'")
      .fetch_one(&pool)
      .await
      .expect("Failed to count workouts");

    assert_eq!(count, 5);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_workout_with_rpe_marks_every_set() {
    let workout = mock_workout_with_rpe("Squat", days_before_wednesday(1), 225.0, 5, 8.5);
    assert!(workout.exercises.iter().flat_map(|e| &e.sets).all(|s| s.rpe == Some(8.5)));
    assert_eq!(workout.total_sets(), 1);
  }

  #[test]
  fn test_assert_approx_eq_macro() {
    assert_approx_eq!(1.0, 1.0001, 0.001);
    assert_approx_eq!(100.0, 100.05, 0.1);
  }
}
