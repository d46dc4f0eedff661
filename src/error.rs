//! Error taxonomy for the progression and coaching services
//!
//! The engines themselves never fail: unknown action kinds or challenge ids
//! degrade to "no XP awarded". Errors only surface at the persistence edge.

use serde::Serialize;
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum EngineError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("Concurrent update for user {user_id} not resolved after {attempts} attempts")]
  Conflict { user_id: String, attempts: u32 },

  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error("Unknown action kind: {0}")]
  UnknownActionKind(String),

  #[error("Unknown challenge: {0}")]
  UnknownChallenge(String),
}

impl From<sqlx::Error> for EngineError {
  fn from(e: sqlx::Error) -> Self {
    EngineError::Database(e.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for EngineError {
  fn from(e: sqlx::migrate::MigrateError) -> Self {
    EngineError::Database(format!("Migration failed: {}", e))
  }
}

impl From<serde_json::Error> for EngineError {
  fn from(e: serde_json::Error) -> Self {
    EngineError::Serialization(e.to_string())
  }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_conflict_message_names_user() {
    let err = EngineError::Conflict {
      user_id: "athlete-1".to_string(),
      attempts: 3,
    };
    let msg = err.to_string();
    assert!(msg.contains("athlete-1"));
    assert!(msg.contains("3 attempts"));
  }

  #[test]
  fn test_json_error_maps_to_serialization() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
    let err: EngineError = parse.unwrap_err().into();
    assert!(matches!(err, EngineError::Serialization(_)));
  }
}
