//! Persisted progression state, keyed by user
//!
//! State is stored as a JSON blob with a monotonically increasing version.
//! Writes are compare-and-swap on that version so two requests for the same
//! user can't silently overwrite each other.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db::DbPool;
use crate::error::EngineResult;
use crate::models::ProgressionState;

/// Raw stored row. JSON is left unparsed so a corrupt blob can be replaced
/// instead of wedging the user.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredState {
  pub version: i64,
  pub state_json: String,
}

#[async_trait]
pub trait ProgressionStore: Send + Sync {
  async fn load(&self, user_id: &str) -> EngineResult<Option<StoredState>>;

  /// Write `state` if the stored version still equals `expected_version`
  /// (`None` meaning no row yet).
  ///
  /// Returns the new version, or `None` when another writer got there first.
  async fn save(
    &self,
    user_id: &str,
    state: &ProgressionState,
    expected_version: Option<i64>,
  ) -> EngineResult<Option<i64>>;
}

/// ---------------------------------------------------------------------------
/// In-Memory Store
/// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
  rows: Mutex<HashMap<String, StoredState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Overwrite a row unconditionally, bumping its version
  pub async fn put_raw(&self, user_id: &str, state_json: impl Into<String>) -> i64 {
    let mut rows = self.rows.lock().await;
    let version = rows.get(user_id).map_or(1, |r| r.version + 1);
    rows.insert(
      user_id.to_string(),
      StoredState {
        version,
        state_json: state_json.into(),
      },
    );
    version
  }
}

#[async_trait]
impl ProgressionStore for MemoryStore {
  async fn load(&self, user_id: &str) -> EngineResult<Option<StoredState>> {
    Ok(self.rows.lock().await.get(user_id).cloned())
  }

  async fn save(
    &self,
    user_id: &str,
    state: &ProgressionState,
    expected_version: Option<i64>,
  ) -> EngineResult<Option<i64>> {
    let state_json = serde_json::to_string(state)?;
    let mut rows = self.rows.lock().await;

    let current = rows.get(user_id).map(|r| r.version);
    if current != expected_version {
      return Ok(None);
    }

    let version = current.map_or(1, |v| v + 1);
    rows.insert(user_id.to_string(), StoredState { version, state_json });
    Ok(Some(version))
  }
}

/// ---------------------------------------------------------------------------
/// SQLite Store
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ProgressionStore for SqliteStore {
  async fn load(&self, user_id: &str) -> EngineResult<Option<StoredState>> {
    let row: Option<(i64, String)> =
      sqlx::query_as("SELECT version, state_json FROM progression_state WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

    Ok(row.map(|(version, state_json)| StoredState { version, state_json }))
  }

  async fn save(
    &self,
    user_id: &str,
    state: &ProgressionState,
    expected_version: Option<i64>,
  ) -> EngineResult<Option<i64>> {
    let state_json = serde_json::to_string(state)?;

    match expected_version {
      None => {
        let result = sqlx::query(
          r#"
          INSERT INTO progression_state (user_id, version, state_json)
          VALUES (?, 1, ?)
          ON CONFLICT(user_id) DO NOTHING
          "#,
        )
        .bind(user_id)
        .bind(&state_json)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() == 1).then_some(1))
      }
      Some(version) => {
        let result = sqlx::query(
          r#"
          UPDATE progression_state
          SET state_json = ?, version = version + 1, updated_at = CURRENT_TIMESTAMP
          WHERE user_id = ? AND version = ?
          "#,
        )
        .bind(&state_json)
        .bind(user_id)
        .bind(version)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() == 1).then_some(version + 1))
      }
    }
  }
}
