//! History-backed coaching: readiness, trends, next-session weights, messages

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::warn;

use crate::analysis::{self, BestLift, Readiness, VolumeTrend};
use crate::history::WorkoutHistory;
use crate::messaging::{self, AthleteContext, SmartMessage};
use crate::models::{PersonalRecord, WorkoutHistoryRecord};
use crate::ports::{Clock, RandomSource};

/// Suggested working weight and per-set ramp for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPrescription {
  pub exercise: String,
  pub weight: f64,
  pub sets: Vec<f64>,
  pub trend: VolumeTrend,
  #[serde(rename = "avgRPE")]
  pub avg_rpe: f64,
}

pub struct CoachingService<H, C, R> {
  history: H,
  clock: C,
  rng: Mutex<R>,
}

impl<H, C, R> CoachingService<H, C, R>
where
  H: WorkoutHistory,
  C: Clock,
  R: RandomSource,
{
  pub fn new(history: H, clock: C, rng: R) -> Self {
    Self {
      history,
      clock,
      rng: Mutex::new(rng),
    }
  }

  pub fn history(&self) -> &H {
    &self.history
  }

  async fn workouts(&self, user_id: &str) -> Vec<WorkoutHistoryRecord> {
    self.history.workouts(user_id).await.unwrap_or_else(|e| {
      warn!(user_id, "Workout history unavailable: {}", e);
      Vec::new()
    })
  }

  async fn personal_records(&self, user_id: &str) -> HashMap<String, PersonalRecord> {
    self.history.personal_records(user_id).await.unwrap_or_else(|e| {
      warn!(user_id, "Personal records unavailable: {}", e);
      HashMap::new()
    })
  }

  pub async fn readiness(&self, user_id: &str) -> Readiness {
    let workouts = self.workouts(user_id).await;
    Readiness::compute(&workouts, self.clock.now())
  }

  pub async fn volume_trend(&self, user_id: &str, exercise: &str) -> VolumeTrend {
    analysis::volume_trend(&self.workouts(user_id).await, exercise)
  }

  pub async fn best_lifts(&self, user_id: &str) -> BTreeMap<String, BestLift> {
    analysis::best_lifts(&self.workouts(user_id).await)
  }

  /// Next working weight for `exercise`, `None` if it has never been logged
  ///
  /// RPE comes from the exercise's last session, falling back to the
  /// trailing-week readiness average.
  pub async fn prescribe(
    &self,
    user_id: &str,
    exercise: &str,
    target_reps: u32,
    set_count: usize,
  ) -> Option<SetPrescription> {
    let workouts = self.workouts(user_id).await;
    let trend = analysis::volume_trend(&workouts, exercise);
    let avg_rpe = analysis::last_session_rpe(&workouts, exercise)
      .unwrap_or_else(|| Readiness::compute(&workouts, self.clock.now()).avg_rpe);

    let weight = analysis::suggest_next_weight(&workouts, exercise, target_reps, avg_rpe, trend)?;

    Some(SetPrescription {
      exercise: exercise.to_string(),
      weight,
      sets: analysis::prescribe_sets(weight, set_count),
      trend,
      avg_rpe,
    })
  }

  pub async fn athlete_context(&self, user_id: &str, name: Option<&str>) -> AthleteContext {
    let workouts = self.workouts(user_id).await;
    let prs = self.personal_records(user_id).await;
    AthleteContext::derive(&workouts, &prs, self.clock.now(), name)
  }

  pub async fn smart_messages(&self, user_id: &str, name: Option<&str>) -> Vec<SmartMessage> {
    let ctx = self.athlete_context(user_id, name).await;
    let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    messaging::select_messages(&ctx, &mut *rng)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::ReadinessStatus;
  use crate::error::{EngineError, EngineResult};
  use crate::history::{MemoryHistory, SqliteHistory};
  use crate::messaging::MessageKind;
  use crate::ports::{FixedClock, FixedRandom};
  use crate::test_utils::{
    mock_workout, mock_workout_with_rpe, seed_history, setup_test_db, teardown_test_db, wednesday,
  };
  use async_trait::async_trait;
  use chrono::{DateTime, Duration, Utc};

  fn service<H: WorkoutHistory>(history: H) -> CoachingService<H, FixedClock, FixedRandom> {
    CoachingService::new(history, FixedClock(wednesday()), FixedRandom(0.0))
  }

  struct BrokenHistory;

  #[async_trait]
  impl WorkoutHistory for BrokenHistory {
    async fn workouts(&self, _: &str) -> EngineResult<Vec<WorkoutHistoryRecord>> {
      Err(EngineError::Database("disk I/O error".to_string()))
    }

    async fn personal_records(&self, _: &str) -> EngineResult<HashMap<String, PersonalRecord>> {
      Err(EngineError::Database("disk I/O error".to_string()))
    }

    async fn append_workout(&self, _: &str, _: &WorkoutHistoryRecord) -> EngineResult<i64> {
      Err(EngineError::Database("disk I/O error".to_string()))
    }

    async fn record_lift(&self, _: &str, _: &str, _: f64, _: i64, _: DateTime<Utc>) -> EngineResult<bool> {
      Err(EngineError::Database("disk I/O error".to_string()))
    }
  }

  #[tokio::test]
  async fn test_unavailable_history_degrades_to_empty() {
    let svc = service(BrokenHistory);

    let readiness = svc.readiness("sam").await;
    assert_eq!(readiness.status, ReadinessStatus::Rested);

    let messages = svc.smart_messages("sam", None).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::CheckInCasual);
    assert!(messages[0].text.contains("there"));

    assert!(svc.prescribe("sam", "Squat", 5, 4).await.is_none());
  }

  #[tokio::test]
  async fn test_prescription_from_history() {
    let history = MemoryHistory::new();
    history
      .append_workout("sam", &mock_workout_with_rpe("Squat", wednesday() - Duration::days(7), 200.0, 5, 7.5))
      .await
      .unwrap();
    history
      .append_workout("sam", &mock_workout_with_rpe("Squat", wednesday() - Duration::days(1), 220.0, 5, 7.5))
      .await
      .unwrap();
    let svc = service(history);

    let plan = svc.prescribe("sam", "Squat", 5, 3).await.unwrap();

    // Volume up 10%, RPE 7.5: 220 * 1.025 = 225.5 -> 225
    assert_eq!(plan.trend, VolumeTrend::Increasing);
    crate::assert_approx_eq!(plan.avg_rpe, 7.5, 1e-9);
    assert_eq!(plan.weight, 225.0);
    assert_eq!(plan.sets.len(), 3);
    assert_eq!(*plan.sets.last().unwrap(), 225.0);
  }

  #[tokio::test]
  async fn test_messages_celebrate_recent_pr() {
    let history = MemoryHistory::new();
    history
      .append_workout("sam", &mock_workout("Deadlift", wednesday() - Duration::days(1), 405.0, 1))
      .await
      .unwrap();
    history
      .record_lift("sam", "Deadlift", 405.0, 1, wednesday() - Duration::days(1))
      .await
      .unwrap();
    let svc = service(history);

    let messages = svc.smart_messages("sam", Some("Sam")).await;
    assert_eq!(messages[0].kind, MessageKind::PrCelebration);
    assert!(messages[0].text.contains("Deadlift"));
    assert!(messages[0].text.contains("405"));
  }

  #[tokio::test]
  async fn test_sqlite_backed_analysis() {
    let pool = setup_test_db().await;
    seed_history(&pool, "sam", 6).await;
    let svc = service(SqliteHistory::new(pool.clone()));

    let readiness = svc.readiness("sam").await;
    assert_eq!(readiness.workouts_this_week, 6);
    assert_eq!(readiness.days_since_last_workout, Some(0));

    let lifts = svc.best_lifts("sam").await;
    assert!(lifts.contains_key("Squat"));
    assert_eq!(svc.volume_trend("sam", "Squat").await, VolumeTrend::Increasing);

    let ctx = svc.athlete_context("sam", Some("Sam")).await;
    assert_eq!(ctx.total_workouts, 6);
    assert_eq!(ctx.current_streak, 6);

    teardown_test_db(pool).await;
  }
}
