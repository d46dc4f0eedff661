//! Workout history and personal records
//!
//! Read side is what the analyzer and message selector consume. The write
//! helpers exist so callers and tests can populate history; records are
//! append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::warn;

use crate::db::DbPool;
use crate::error::EngineResult;
use crate::models::{ExerciseLog, PersonalRecord, WorkoutHistoryRecord};

#[async_trait]
pub trait WorkoutHistory: Send + Sync {
  /// All workouts for a user, oldest first
  async fn workouts(&self, user_id: &str) -> EngineResult<Vec<WorkoutHistoryRecord>>;

  /// Best lift per exercise
  async fn personal_records(&self, user_id: &str) -> EngineResult<HashMap<String, PersonalRecord>>;

  /// Append a workout and return its id
  async fn append_workout(&self, user_id: &str, record: &WorkoutHistoryRecord) -> EngineResult<i64>;

  /// Store a lift if it beats the current record. Returns true on a new PR.
  async fn record_lift(
    &self,
    user_id: &str,
    exercise: &str,
    weight: f64,
    reps: i64,
    achieved_at: DateTime<Utc>,
  ) -> EngineResult<bool>;
}

/// Heavier wins; at equal weight, more reps wins
pub fn beats(existing: Option<&PersonalRecord>, weight: f64, reps: i64) -> bool {
  match existing {
    None => true,
    Some(pr) => weight > pr.weight || (weight == pr.weight && reps > pr.reps),
  }
}

/// ---------------------------------------------------------------------------
/// In-Memory History
/// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryHistory {
  workouts: Mutex<HashMap<String, Vec<WorkoutHistoryRecord>>>,
  records: Mutex<HashMap<String, HashMap<String, PersonalRecord>>>,
}

impl MemoryHistory {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl WorkoutHistory for MemoryHistory {
  async fn workouts(&self, user_id: &str) -> EngineResult<Vec<WorkoutHistoryRecord>> {
    let mut list = self.workouts.lock().await.get(user_id).cloned().unwrap_or_default();
    list.sort_by_key(|w| w.performed_at);
    Ok(list)
  }

  async fn personal_records(&self, user_id: &str) -> EngineResult<HashMap<String, PersonalRecord>> {
    Ok(self.records.lock().await.get(user_id).cloned().unwrap_or_default())
  }

  async fn append_workout(&self, user_id: &str, record: &WorkoutHistoryRecord) -> EngineResult<i64> {
    let mut all = self.workouts.lock().await;
    let next_id = all.values().map(Vec::len).sum::<usize>() as i64 + 1;
    let list = all.entry(user_id.to_string()).or_default();
    list.push(WorkoutHistoryRecord {
      id: Some(next_id),
      ..record.clone()
    });
    Ok(next_id)
  }

  async fn record_lift(
    &self,
    user_id: &str,
    exercise: &str,
    weight: f64,
    reps: i64,
    achieved_at: DateTime<Utc>,
  ) -> EngineResult<bool> {
    let mut all = self.records.lock().await;
    let records = all.entry(user_id.to_string()).or_default();
    if !beats(records.get(exercise), weight, reps) {
      return Ok(false);
    }
    records.insert(
      exercise.to_string(),
      PersonalRecord {
        exercise: exercise.to_string(),
        weight,
        reps,
        achieved_at,
      },
    );
    Ok(true)
  }
}

/// ---------------------------------------------------------------------------
/// SQLite History
/// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct WorkoutRow {
  id: i64,
  performed_at: DateTime<Utc>,
  duration_minutes: i64,
  exercises_json: String,
  completed: bool,
}

impl WorkoutRow {
  fn into_record(self) -> WorkoutHistoryRecord {
    let exercises: Vec<ExerciseLog> = serde_json::from_str(&self.exercises_json).unwrap_or_else(|e| {
      warn!(workout_id = self.id, "Unreadable exercises for workout: {}", e);
      Vec::new()
    });

    WorkoutHistoryRecord {
      id: Some(self.id),
      performed_at: self.performed_at,
      duration_minutes: self.duration_minutes.max(0) as u32,
      exercises,
      completed: self.completed,
    }
  }
}

#[derive(Debug, Clone)]
pub struct SqliteHistory {
  pool: DbPool,
}

impl SqliteHistory {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl WorkoutHistory for SqliteHistory {
  async fn workouts(&self, user_id: &str) -> EngineResult<Vec<WorkoutHistoryRecord>> {
    let rows: Vec<WorkoutRow> = sqlx::query_as(
      r#"
      SELECT id, performed_at, duration_minutes, exercises_json, completed
      FROM workout_history
      WHERE user_id = ?
      ORDER BY performed_at ASC, id ASC
      "#,
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(WorkoutRow::into_record).collect())
  }

  async fn personal_records(&self, user_id: &str) -> EngineResult<HashMap<String, PersonalRecord>> {
    let rows: Vec<PersonalRecord> = sqlx::query_as(
      "SELECT exercise, weight, reps, achieved_at FROM personal_records WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().map(|pr| (pr.exercise.clone(), pr)).collect())
  }

  async fn append_workout(&self, user_id: &str, record: &WorkoutHistoryRecord) -> EngineResult<i64> {
    let exercises_json = serde_json::to_string(&record.exercises)?;

    let result = sqlx::query(
      r#"
      INSERT INTO workout_history (user_id, performed_at, duration_minutes, exercises_json, completed)
      VALUES (?, ?, ?, ?, ?)
      "#,
    )
    .bind(user_id)
    .bind(record.performed_at)
    .bind(record.duration_minutes as i64)
    .bind(exercises_json)
    .bind(record.completed)
    .execute(&self.pool)
    .await?;

    Ok(result.last_insert_rowid())
  }

  async fn record_lift(
    &self,
    user_id: &str,
    exercise: &str,
    weight: f64,
    reps: i64,
    achieved_at: DateTime<Utc>,
  ) -> EngineResult<bool> {
    let result = sqlx::query(
      r#"
      INSERT INTO personal_records (user_id, exercise, weight, reps, achieved_at)
      VALUES (?, ?, ?, ?, ?)
      ON CONFLICT(user_id, exercise) DO UPDATE SET
        weight = excluded.weight,
        reps = excluded.reps,
        achieved_at = excluded.achieved_at
      WHERE excluded.weight > personal_records.weight
        OR (excluded.weight = personal_records.weight AND excluded.reps > personal_records.reps)
      "#,
    )
    .bind(user_id)
    .bind(exercise)
    .bind(weight)
    .bind(reps)
    .bind(achieved_at)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_workout, mock_workout_with_completion, setup_test_db, teardown_test_db};
  use chrono::{Duration, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 18, 0, 0).unwrap()
  }

  async fn assert_history_semantics(history: &dyn WorkoutHistory) {
    // Appended out of order, read back oldest first
    history
      .append_workout("sam", &mock_workout("Squat", now(), 225.0, 5))
      .await
      .unwrap();
    history
      .append_workout("sam", &mock_workout("Bench Press", now() - Duration::days(2), 185.0, 5))
      .await
      .unwrap();
    history
      .append_workout("sam", &mock_workout_with_completion(now() - Duration::days(1), false))
      .await
      .unwrap();
    history
      .append_workout("alex", &mock_workout("Row", now(), 135.0, 10))
      .await
      .unwrap();

    let workouts = history.workouts("sam").await.unwrap();
    assert_eq!(workouts.len(), 3);
    assert_eq!(workouts[0].exercises[0].exercise_name, "Bench Press");
    assert!(!workouts[1].completed);
    assert_eq!(workouts[2].exercises[0].sets[0].weight, 225.0);
    assert_eq!(workouts[2].performed_at, now());
    assert!(workouts.iter().all(|w| w.id.is_some()));

    assert!(history.workouts("nobody").await.unwrap().is_empty());

    // Personal records only move up
    assert!(history.record_lift("sam", "Squat", 225.0, 5, now() - Duration::days(7)).await.unwrap());
    assert!(!history.record_lift("sam", "Squat", 215.0, 8, now()).await.unwrap());
    assert!(history.record_lift("sam", "Squat", 225.0, 6, now()).await.unwrap());
    assert!(history.record_lift("sam", "Deadlift", 315.0, 3, now()).await.unwrap());

    let prs = history.personal_records("sam").await.unwrap();
    assert_eq!(prs.len(), 2);
    assert_eq!(prs["Squat"].reps, 6);
    assert_eq!(prs["Squat"].achieved_at, now());
    assert!(history.personal_records("alex").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_memory_history() {
    let history = MemoryHistory::new();
    assert_history_semantics(&history).await;
  }

  #[tokio::test]
  async fn test_sqlite_history() {
    let pool = setup_test_db().await;
    let history = SqliteHistory::new(pool.clone());
    assert_history_semantics(&history).await;
    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_sqlite_tolerates_corrupt_exercises() {
    let pool = setup_test_db().await;
    sqlx::query("INSERT INTO workout_history (user_id, performed_at, exercises_json) VALUES ('sam', ?, 'oops')")
      .bind(now())
      .execute(&pool)
      .await
      .unwrap();

    let history = SqliteHistory::new(pool.clone());
    let workouts = history.workouts("sam").await.unwrap();
    assert_eq!(workouts.len(), 1);
    assert!(workouts[0].exercises.is_empty());
    assert!(workouts[0].completed);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_beats() {
    let pr = PersonalRecord {
      exercise: "Squat".to_string(),
      weight: 225.0,
      reps: 5,
      achieved_at: now(),
    };
    assert!(beats(None, 45.0, 1));
    assert!(beats(Some(&pr), 230.0, 1));
    assert!(beats(Some(&pr), 225.0, 6));
    assert!(!beats(Some(&pr), 225.0, 5));
    assert!(!beats(Some(&pr), 200.0, 12));
  }
}
