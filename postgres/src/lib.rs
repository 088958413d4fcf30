//! PostgreSQL-backed [`SessionStore`] for the seminar signup service.
//!
//! Sessions are stored as whole documents, one JSONB row per session, with a
//! `version` column driving the compare-and-swap commit:
//!
//! ```sql
//! UPDATE sessions SET doc = $2, version = version + 1
//! WHERE id = $1 AND version = $3
//! ```
//!
//! Zero rows affected means a concurrent commit won; the caller's
//! transaction loop re-reads and retries. After every successful write the
//! full collection is pushed to subscribers, mirroring the change feed of a
//! hosted document store.

use seminar_signup_core::store::{SessionStore, StoreError, StoreFuture, Version, Versioned};
use seminar_signup_core::types::{Session, SessionId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tokio::sync::broadcast;

/// SQLSTATE codes the store treats as authorization failures.
const ACCESS_DENIED_CODES: &[&str] = &["42501", "28000", "28P01"];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id      TEXT PRIMARY KEY,
    doc     JSONB NOT NULL,
    version BIGINT NOT NULL DEFAULT 1
)
";

/// Production [`SessionStore`] backed by PostgreSQL.
///
/// Cheap to clone is not needed; the server holds it behind
/// `Arc<dyn SessionStore>`.
pub struct PostgresSessionStore {
    pool: PgPool,
    notify: broadcast::Sender<Vec<Session>>,
}

impl PostgresSessionStore {
    /// Connects to the database and ensures the sessions table exists.
    ///
    /// # Errors
    ///
    /// [`StoreError::Connectivity`] when the pool cannot be established or
    /// the schema statement fails; [`StoreError::AccessDenied`] when the
    /// credentials are rejected.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with(url, 5, Duration::from_secs(5)).await
    }

    /// Connects with explicit pool sizing and timeout.
    ///
    /// # Errors
    ///
    /// Same as [`PostgresSessionStore::connect`].
    pub async fn connect_with(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(classify)?;

        sqlx::query(SCHEMA).execute(&pool).await.map_err(classify)?;

        let (notify, _) = broadcast::channel(64);
        Ok(Self { pool, notify })
    }

    async fn snapshot(&self) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM sessions ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;
        rows.into_iter()
            .map(|row| {
                let doc: serde_json::Value = row.try_get("doc").map_err(classify)?;
                serde_json::from_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Pushes the current collection to subscribers. Broadcast failures
    /// (no receivers) are not errors; snapshot failures are logged and
    /// swallowed so a flaky read never fails a committed write.
    async fn publish_snapshot(&self) {
        match self.snapshot().await {
            Ok(snapshot) => {
                let _ = self.notify.send(snapshot);
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read session snapshot for change feed");
            }
        }
    }

    async fn current_version(&self, id: &SessionId) -> Result<Option<Version>, StoreError> {
        let row = sqlx::query("SELECT version FROM sessions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.map(|row| {
            let version: i64 = row.try_get("version").map_err(classify)?;
            to_version(version)
        })
        .transpose()
    }
}

fn classify(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(db) => {
            let code = db.code();
            if code
                .as_deref()
                .is_some_and(|c| ACCESS_DENIED_CODES.contains(&c))
            {
                StoreError::AccessDenied(db.message().to_string())
            } else {
                StoreError::Connectivity(error.to_string())
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Serialization(error.to_string())
        }
        _ => StoreError::Connectivity(error.to_string()),
    }
}

fn to_version(raw: i64) -> Result<Version, StoreError> {
    u64::try_from(raw)
        .map(Version::new)
        .map_err(|_| StoreError::Serialization(format!("negative stored version: {raw}")))
}

fn to_doc(session: &Session) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(session).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl SessionStore for PostgresSessionStore {
    fn load(&self, id: SessionId) -> StoreFuture<'_, Option<Versioned<Session>>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT doc, version FROM sessions WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(classify)?;
            let Some(row) = row else {
                return Ok(None);
            };
            let doc: serde_json::Value = row.try_get("doc").map_err(classify)?;
            let version: i64 = row.try_get("version").map_err(classify)?;
            let session: Session = serde_json::from_value(doc)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok(Some(Versioned {
                doc: session,
                version: to_version(version)?,
            }))
        })
    }

    fn commit(&self, session: Session, expected: Option<Version>) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            let doc = to_doc(&session)?;
            let committed = match expected {
                None => {
                    let result = sqlx::query(
                        "INSERT INTO sessions (id, doc, version) VALUES ($1, $2, 1)
                         ON CONFLICT (id) DO NOTHING",
                    )
                    .bind(session.id.as_str())
                    .bind(&doc)
                    .execute(&self.pool)
                    .await
                    .map_err(classify)?;
                    if result.rows_affected() == 0 {
                        return Err(StoreError::AlreadyExists(session.id));
                    }
                    Version::FIRST
                }
                Some(expected) => {
                    let expected_raw = i64::try_from(expected.value()).map_err(|_| {
                        StoreError::Serialization(format!("version out of range: {expected}"))
                    })?;
                    let result = sqlx::query(
                        "UPDATE sessions SET doc = $2, version = version + 1
                         WHERE id = $1 AND version = $3",
                    )
                    .bind(session.id.as_str())
                    .bind(&doc)
                    .bind(expected_raw)
                    .execute(&self.pool)
                    .await
                    .map_err(classify)?;
                    if result.rows_affected() == 0 {
                        // Distinguish a lost race from a missing document.
                        return match self.current_version(&session.id).await? {
                            Some(actual) => Err(StoreError::Conflict {
                                session_id: session.id,
                                expected,
                                actual,
                            }),
                            None => Err(StoreError::NotFound(session.id)),
                        };
                    }
                    expected.next()
                }
            };
            self.publish_snapshot().await;
            Ok(committed)
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<Session>> {
        Box::pin(async move { self.snapshot().await })
    }

    fn delete(&self, id: SessionId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM sessions WHERE id = $1")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_err(classify)?;
            self.publish_snapshot().await;
            Ok(())
        })
    }

    fn clear_all(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM sessions")
                .execute(&self.pool)
                .await
                .map_err(classify)?;
            self.publish_snapshot().await;
            Ok(())
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Session>> {
        self.notify.subscribe()
    }
}
