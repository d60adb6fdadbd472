//! Persisted customer headers and their compiled PDFs
//!
//! A record is only written after its PDF compiled. Updates to one record
//! are serialized and checked against the version that was read, so a
//! failed or conflicting update never changes what is stored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex};

use chrono::Utc;
use latex_engine::{CompiledPdf, LatexEngine};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{CustomerHeaderRecord, DbCustomerHeader, StoredArtifact};

/// Template every customer header is rendered with
pub const CUSTOMER_HEADER_TEMPLATE: &str = "customer_header";

const OWNER: &str = "customer-header";

type LockMap = SyncMutex<HashMap<String, Arc<Mutex<()>>>>;

pub struct ArtifactStore {
    db: SqlitePool,
    engine: Arc<LatexEngine>,
    locks: LockMap,
}

/// A caller's claim on one record's update lock.
///
/// Dropping it removes the map entry once nobody else holds or waits on
/// the lock, also when the update future is cancelled.
struct RecordLock<'a> {
    locks: &'a LockMap,
    id: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> RecordLock<'a> {
    fn claim(locks: &'a LockMap, id: &'a str) -> Self {
        let mut map = locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let lock = map.entry(id.to_string()).or_default().clone();
        Self { locks, id, lock }
    }
}

impl Drop for RecordLock<'_> {
    fn drop(&mut self) {
        let mut map = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map and this claim remain
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(self.id);
        }
    }
}

impl ArtifactStore {
    pub fn new(db: SqlitePool, engine: Arc<LatexEngine>) -> Self {
        Self {
            db,
            engine,
            locks: SyncMutex::new(HashMap::new()),
        }
    }

    pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customer_headers (
                id TEXT PRIMARY KEY,
                data_json TEXT NOT NULL,
                pdf_data BLOB NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_customer_headers_created ON customer_headers(created_at)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Compile without persisting anything
    pub async fn preview(&self, data: &Value) -> Result<CompiledPdf, ApiError> {
        require_object(data)?;
        Ok(self
            .engine
            .compile_data(OWNER, CUSTOMER_HEADER_TEMPLATE, data)
            .await?)
    }

    /// Compile and, only if that succeeds, persist a new record
    pub async fn create(&self, data: &Value) -> Result<StoredArtifact, ApiError> {
        let compiled = self.preview(data).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let data_json = encode(data)?;

        sqlx::query(
            r#"
            INSERT INTO customer_headers (id, data_json, pdf_data, version, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data_json)
        .bind(&compiled.pdf)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        tracing::info!(id = %id, bytes = compiled.pdf.len(), "Created customer header");

        Ok(StoredArtifact {
            record: CustomerHeaderRecord {
                pdf_ref: CustomerHeaderRecord::pdf_ref_for(&id),
                id,
                data: data.clone(),
                version: 1,
                created_at: now,
                updated_at: now,
            },
            pdf: compiled.pdf,
        })
    }

    pub async fn get(&self, id: &str) -> Result<CustomerHeaderRecord, ApiError> {
        let row: Option<DbCustomerHeader> = sqlx::query_as(
            r#"
            SELECT id, data_json, version, created_at, updated_at
            FROM customer_headers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let row = row.ok_or_else(|| not_found(id))?;
        decode(row)
    }

    /// All records, newest first
    pub async fn list(&self) -> Result<Vec<CustomerHeaderRecord>, ApiError> {
        let rows: Vec<DbCustomerHeader> = sqlx::query_as(
            r#"
            SELECT id, data_json, version, created_at, updated_at
            FROM customer_headers
            ORDER BY created_at DESC, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(decode).collect()
    }

    pub async fn pdf(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT pdf_data FROM customer_headers WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        row.map(|(pdf,)| pdf).ok_or_else(|| not_found(id))
    }

    /// Recompile a record with new data and replace it.
    ///
    /// The stored record is untouched unless the compile succeeds and the
    /// version read at the start is still current.
    pub async fn update(&self, id: &str, data: &Value) -> Result<StoredArtifact, ApiError> {
        let claim = RecordLock::claim(&self.locks, id);
        let _guard = claim.lock.lock().await;
        self.update_locked(id, data).await
    }

    /// Records with an update in flight
    #[cfg(test)]
    pub fn locked_records(&self) -> usize {
        self.locks
            .lock()
            .map(|map| map.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    async fn update_locked(&self, id: &str, data: &Value) -> Result<StoredArtifact, ApiError> {
        let current = self.get(id).await?;
        let compiled = self.preview(data).await?;

        let now = Utc::now();
        let data_json = encode(data)?;

        let updated = sqlx::query(
            r#"
            UPDATE customer_headers
            SET data_json = ?, pdf_data = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&data_json)
        .bind(&compiled.pdf)
        .bind(now.to_rfc3339())
        .bind(id)
        .bind(current.version)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            tracing::warn!(id, version = current.version, "Customer header changed during update");
            return Err(ApiError::Conflict(format!(
                "Customer header {} was modified concurrently",
                id
            )));
        }

        tracing::info!(id, version = current.version + 1, "Updated customer header");

        Ok(StoredArtifact {
            record: CustomerHeaderRecord {
                data: data.clone(),
                version: current.version + 1,
                updated_at: now,
                ..current
            },
            pdf: compiled.pdf,
        })
    }
}

fn require_object(data: &Value) -> Result<(), ApiError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Customer header data must be a JSON object".to_string(),
        ))
    }
}

fn encode(data: &Value) -> Result<String, ApiError> {
    serde_json::to_string(data).map_err(|e| ApiError::Internal(e.to_string()))
}

fn decode(row: DbCustomerHeader) -> Result<CustomerHeaderRecord, ApiError> {
    CustomerHeaderRecord::try_from(row).map_err(|e| ApiError::Internal(e.to_string()))
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Customer header {}", id))
}
