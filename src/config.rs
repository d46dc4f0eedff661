//! Environment-driven configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use crate::error::{EngineError, EngineResult};
use std::str::FromStr;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const ENV_DATABASE_URL: &str = "TRAINER_QUEST_DATABASE_URL";
pub const ENV_DAILY_XP_GOAL: &str = "TRAINER_QUEST_DAILY_XP_GOAL";
pub const ENV_WEEKLY_XP_GOAL: &str = "TRAINER_QUEST_WEEKLY_XP_GOAL";
pub const ENV_MAX_CAS_RETRIES: &str = "TRAINER_QUEST_MAX_CAS_RETRIES";
pub const ENV_LOG: &str = "TRAINER_QUEST_LOG";

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_DAILY_XP_GOAL: u64 = 100;
const DEFAULT_WEEKLY_XP_GOAL: u64 = 500;
const DEFAULT_MAX_CAS_RETRIES: u32 = 3;
const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
  pub database_url: String,
  /// XP target for a single calendar day
  pub daily_xp_goal: u64,
  /// XP target for a Monday-start week
  pub weekly_xp_goal: u64,
  /// Attempts at the read-modify-write cycle before giving up on a conflict
  pub max_cas_retries: u32,
  /// Fallback filter when RUST_LOG is unset
  pub log_level: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      daily_xp_goal: DEFAULT_DAILY_XP_GOAL,
      weekly_xp_goal: DEFAULT_WEEKLY_XP_GOAL,
      max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
      log_level: DEFAULT_LOG.to_string(),
    }
  }
}

impl EngineConfig {
  /// Load configuration from `.env` (if present) and the environment
  pub fn from_env() -> EngineResult<Self> {
    dotenvy::dotenv().ok();

    let defaults = Self::default();
    let config = Self {
      database_url: std::env::var(ENV_DATABASE_URL).unwrap_or(defaults.database_url),
      daily_xp_goal: parse_var(ENV_DAILY_XP_GOAL, defaults.daily_xp_goal)?,
      weekly_xp_goal: parse_var(ENV_WEEKLY_XP_GOAL, defaults.weekly_xp_goal)?,
      max_cas_retries: parse_var(ENV_MAX_CAS_RETRIES, defaults.max_cas_retries)?,
      log_level: std::env::var(ENV_LOG).unwrap_or(defaults.log_level),
    };

    if config.max_cas_retries == 0 {
      return Err(EngineError::Config(format!(
        "{} must be at least 1",
        ENV_MAX_CAS_RETRIES
      )));
    }

    Ok(config)
  }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> EngineResult<T> {
  match std::env::var(name) {
    Ok(raw) => raw
      .trim()
      .parse()
      .map_err(|_| EngineError::Config(format!("{} is not a valid number: {:?}", name, raw))),
    Err(_) => Ok(default),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
