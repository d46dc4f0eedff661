//! Load → engine → save, per user
//!
//! Every mutating call reads the stored blob, runs one engine operation on it
//! and writes it back with a version check. Losing the race reloads and
//! replays the operation, up to `max_cas_retries` attempts.

use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gamification::{
  ActionReward, ChallengeExerciseResult, ChallengeStatus, ProgressionEngine, ProgressionSnapshot,
  StreakUpdate, WorkoutReward, XpAward,
};
use crate::models::{
  ChallengeLogEntry, DailyBonus, ExerciseLogEntry, ProgressionState, WorkoutCompletion,
};
use crate::ports::{Clock, RandomSource};
use crate::store::ProgressionStore;

pub struct ProgressionService<S, C, R> {
  store: S,
  clock: C,
  rng: Mutex<R>,
  config: EngineConfig,
}

impl<S, C, R> ProgressionService<S, C, R>
where
  S: ProgressionStore,
  C: Clock,
  R: RandomSource,
{
  pub fn new(store: S, clock: C, rng: R, config: EngineConfig) -> Self {
    Self {
      store,
      clock,
      rng: Mutex::new(rng),
      config,
    }
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  // -------------------------------------------------------------------------
  // Load / Save
  // -------------------------------------------------------------------------

  fn fresh_state(&self) -> ProgressionState {
    ProgressionState::new(self.config.daily_xp_goal, self.config.weekly_xp_goal)
  }

  /// Stored state and its version. Missing, unreadable or corrupt state
  /// all come back as a new user.
  async fn load(&self, user_id: &str) -> (ProgressionState, Option<i64>) {
    let (mut state, version) = match self.store.load(user_id).await {
      Ok(Some(stored)) => match serde_json::from_str::<ProgressionState>(&stored.state_json) {
        Ok(state) => (state, Some(stored.version)),
        Err(e) => {
          warn!(user_id, "Stored progression is malformed, starting fresh: {}", e);
          (self.fresh_state(), Some(stored.version))
        }
      },
      Ok(None) => (self.fresh_state(), None),
      Err(e) => {
        warn!(user_id, "Progression store unavailable, using default state: {}", e);
        (self.fresh_state(), None)
      }
    };

    state.daily_xp.goal = self.config.daily_xp_goal;
    state.weekly_xp.goal = self.config.weekly_xp_goal;
    (state, version)
  }

  fn run_engine<T, F>(&self, state: &mut ProgressionState, op: &mut F) -> T
  where
    F: FnMut(&mut ProgressionEngine<'_>) -> T,
  {
    let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut engine = ProgressionEngine::new(state, &self.clock, &mut *rng);
    op(&mut engine)
  }

  /// Apply `op` and persist the result with compare-and-swap
  pub async fn mutate<T, F>(&self, user_id: &str, mut op: F) -> EngineResult<T>
  where
    F: FnMut(&mut ProgressionEngine<'_>) -> T,
  {
    let attempts = self.config.max_cas_retries.max(1);

    for attempt in 1..=attempts {
      let (mut state, version) = self.load(user_id).await;
      let result = self.run_engine(&mut state, &mut op);

      match self.store.save(user_id, &state, version).await? {
        Some(new_version) => {
          debug!(user_id, version = new_version, "Saved progression");
          return Ok(result);
        }
        None => warn!(user_id, attempt, "Progression changed underneath us, retrying"),
      }
    }

    Err(EngineError::Conflict {
      user_id: user_id.to_string(),
      attempts,
    })
  }

  /// Apply `op` to the current state without saving
  pub async fn view<T, F>(&self, user_id: &str, mut op: F) -> T
  where
    F: FnMut(&mut ProgressionEngine<'_>) -> T,
  {
    let (mut state, _) = self.load(user_id).await;
    self.run_engine(&mut state, &mut op)
  }

  // -------------------------------------------------------------------------
  // Operations
  // -------------------------------------------------------------------------

  pub async fn state(&self, user_id: &str) -> ProgressionState {
    self.load(user_id).await.0
  }

  /// Award XP by action name; unknown names award nothing
  pub async fn award_xp(&self, user_id: &str, action: &str, multiplier: f64) -> EngineResult<XpAward> {
    self
      .mutate(user_id, |engine| engine.award_xp_named(action, multiplier))
      .await
  }

  pub async fn update_streak(&self, user_id: &str) -> EngineResult<StreakUpdate> {
    self.mutate(user_id, |engine| engine.update_streak()).await
  }

  /// Newly unlocked badge ids
  pub async fn evaluate_badges(&self, user_id: &str) -> EngineResult<Vec<String>> {
    self
      .mutate(user_id, |engine| {
        engine
          .evaluate_badges()
          .into_iter()
          .map(|b| b.id.to_string())
          .collect()
      })
      .await
  }

  pub async fn record_workout(&self, user_id: &str, workout: &WorkoutCompletion) -> EngineResult<WorkoutReward> {
    self.mutate(user_id, |engine| engine.record_workout(workout)).await
  }

  pub async fn record_challenge_exercise(
    &self,
    user_id: &str,
    challenge_id: &str,
    entry: &ExerciseLogEntry,
  ) -> EngineResult<ChallengeExerciseResult> {
    self
      .mutate(user_id, |engine| engine.record_challenge_exercise(challenge_id, entry))
      .await
  }

  pub async fn record_pr(&self, user_id: &str) -> EngineResult<ActionReward> {
    self.mutate(user_id, |engine| engine.record_pr()).await
  }

  pub async fn record_share(&self, user_id: &str) -> EngineResult<ActionReward> {
    self.mutate(user_id, |engine| engine.record_share()).await
  }

  pub async fn record_tutorial_watched(&self, user_id: &str) -> EngineResult<ActionReward> {
    self.mutate(user_id, |engine| engine.record_tutorial_watched()).await
  }

  pub async fn record_set_completed(&self, user_id: &str) -> EngineResult<ActionReward> {
    self.mutate(user_id, |engine| engine.record_set_completed()).await
  }

  pub async fn check_daily_bonus(&self, user_id: &str) -> EngineResult<Option<DailyBonus>> {
    self.mutate(user_id, |engine| engine.check_daily_bonus()).await
  }

  pub async fn challenge_status(&self, user_id: &str) -> ChallengeStatus {
    self.view(user_id, |engine| engine.challenge_status()).await
  }

  pub async fn challenge_log_this_week(&self, user_id: &str) -> Vec<ChallengeLogEntry> {
    self
      .view(user_id, |engine| {
        engine.challenge_log_this_week().into_iter().cloned().collect()
      })
      .await
  }

  pub async fn snapshot(&self, user_id: &str) -> ProgressionSnapshot {
    self.view(user_id, |engine| engine.snapshot()).await
  }
}
