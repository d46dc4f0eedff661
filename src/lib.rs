pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod gamification;
pub mod history;
pub mod messaging;
pub mod models;
pub mod ports;
pub mod services;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use gamification::{level_from_xp, ActionKind, ProgressionEngine};
pub use history::{MemoryHistory, SqliteHistory, WorkoutHistory};
pub use ports::{Clock, FixedClock, FixedRandom, RandomSource, SeededRandom, SystemClock, ThreadRandom};
pub use services::{CoachingService, ProgressionService};
pub use store::{MemoryStore, ProgressionStore, SqliteStore};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins over the configured level. Calling this more than once is
/// harmless.
pub fn init_tracing(config: &EngineConfig) {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

  if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
    tracing::debug!("Tracing subscriber already installed");
  }
}

/// SQLite-backed services sharing one pool
pub struct AppState {
  pub db: db::DbPool,
  pub progression: ProgressionService<SqliteStore, SystemClock, ThreadRandom>,
  pub coaching: CoachingService<SqliteHistory, SystemClock, ThreadRandom>,
}

impl AppState {
  /// Open the configured database, run migrations and wire up the services
  pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
    let pool = db::initialize_db(&config.database_url).await?;
    tracing::info!("Database ready");

    Ok(Self {
      progression: ProgressionService::new(SqliteStore::new(pool.clone()), SystemClock, ThreadRandom, config),
      coaching: CoachingService::new(SqliteHistory::new(pool.clone()), SystemClock, ThreadRandom),
      db: pool,
    })
  }

  /// Same as [`AppState::connect`] with [`EngineConfig::from_env`]
  pub async fn from_env() -> EngineResult<Self> {
    let config = EngineConfig::from_env()?;
    init_tracing(&config);
    Self::connect(config).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::WorkoutCompletion;
  use crate::test_utils::test_config;

  #[tokio::test]
  async fn test_connect_in_memory_and_round_trip() {
    init_tracing(&test_config());
    let state = AppState::connect(test_config()).await.unwrap();

    let reward = state
      .progression
      .record_workout(
        "sam",
        &WorkoutCompletion {
          total_sets: 12,
          total_volume: 6_000.0,
          duration_minutes: 40,
        },
      )
      .await
      .unwrap();
    assert!(reward.xp.earned_xp >= 40);
    assert_eq!(state.progression.state("sam").await.stats.total_workouts, 1);

    let readiness = state.coaching.readiness("sam").await;
    assert_eq!(readiness.score, 100);

    state.db.close().await;
  }

  #[test]
  fn test_init_tracing_twice_is_harmless() {
    init_tracing(&test_config());
    init_tracing(&test_config());
  }
}
