use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AuditLogError, AuditQuery, AuditRecord, RecordId, RegistryId, Result, StateSnapshot, Version,
    store::{AppendOptions, AuditLog, RecordStream, validate_batch},
};

const RECORD_COLUMNS: &str =
    "id, event_type, registry_id, aggregate_type, version, recorded_at, payload, metadata";

/// PostgreSQL-backed audit log.
///
/// Records live in `audit_records`, snapshots in `snapshots`; see
/// `migrations/` for the schema.
#[derive(Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and runs pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let log = Self::new(pool);
        log.run_migrations().await?;
        Ok(log)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<AuditRecord> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(AuditRecord {
            record_id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            registry_id: RegistryId::from_uuid(row.try_get::<Uuid, _>("registry_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, records: Vec<AuditRecord>, options: AppendOptions) -> Result<Version> {
        validate_batch(&records)?;

        let registry_id = records[0].registry_id;
        let mut tx = self.pool.begin().await?;

        if let Some(expected) = options.expected_version {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT MAX(version) FROM audit_records WHERE registry_id = $1",
            )
            .bind(registry_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

            let actual = Version::new(current.unwrap_or(0));
            if actual != expected {
                return Err(AuditLogError::ConcurrencyConflict {
                    registry_id,
                    expected,
                    actual,
                });
            }
        }

        let mut last_version = Version::initial();
        for record in &records {
            let metadata_json = serde_json::to_value(&record.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO audit_records (id, event_type, registry_id, aggregate_type, version, recorded_at, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(record.record_id.as_uuid())
            .bind(&record.event_type)
            .bind(record.registry_id.as_uuid())
            .bind(&record.aggregate_type)
            .bind(record.version.as_i64())
            .bind(record.recorded_at)
            .bind(&record.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_registry_version")
                {
                    return AuditLogError::ConcurrencyConflict {
                        registry_id,
                        expected: options.expected_version.unwrap_or(Version::initial()),
                        actual: record.version,
                    };
                }
                AuditLogError::Database(e)
            })?;

            last_version = record.version;
        }

        tx.commit().await?;
        tracing::debug!(%registry_id, version = %last_version, "appended audit records");
        Ok(last_version)
    }

    async fn records_for_registry(&self, registry_id: RegistryId) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM audit_records WHERE registry_id = $1 ORDER BY version ASC"
        ))
        .bind(registry_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn records_from_version(
        &self,
        registry_id: RegistryId,
        from_version: Version,
    ) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM audit_records WHERE registry_id = $1 AND version >= $2 ORDER BY version ASC"
        ))
        .bind(registry_id.as_uuid())
        .bind(from_version.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditRecord>> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM audit_records WHERE 1=1");
        let mut param_count = 0;

        if query.registry_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND registry_id = ${param_count}"));
        }
        if query.aggregate_type.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND aggregate_type = ${param_count}"));
        }
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }
        if query.from_version.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND version >= ${param_count}"));
        }
        if query.to_version.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND version <= ${param_count}"));
        }
        if query.from_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND recorded_at >= ${param_count}"));
        }
        if query.to_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND recorded_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY recorded_at ASC, version ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut statement = sqlx::query(&sql);

        if let Some(id) = query.registry_id {
            statement = statement.bind(id.as_uuid());
        }
        if let Some(aggregate_type) = query.aggregate_type {
            statement = statement.bind(aggregate_type);
        }
        if let Some(event_types) = query.event_types {
            statement = statement.bind(event_types);
        }
        if let Some(from_version) = query.from_version {
            statement = statement.bind(from_version.as_i64());
        }
        if let Some(to_version) = query.to_version {
            statement = statement.bind(to_version.as_i64());
        }
        if let Some(from_ts) = query.from_timestamp {
            statement = statement.bind(from_ts);
        }
        if let Some(to_ts) = query.to_timestamp {
            statement = statement.bind(to_ts);
        }
        if let Some(limit) = query.limit {
            statement = statement.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            statement = statement.bind(offset as i64);
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn records_by_type(&self, event_type: &str) -> Result<Vec<AuditRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM audit_records WHERE event_type = $1 ORDER BY position ASC"
        ))
        .bind(event_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn stream_all(&self) -> Result<RecordStream> {
        use futures_util::stream;

        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM audit_records ORDER BY position ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let records: Vec<Result<AuditRecord>> =
            rows.into_iter().map(Self::row_to_record).collect();
        Ok(Box::pin(stream::iter(records)))
    }

    async fn registry_version(&self, registry_id: RegistryId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM audit_records WHERE registry_id = $1")
                .bind(registry_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn save_snapshot(&self, snapshot: StateSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (registry_id, aggregate_type, version, taken_at, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (registry_id) DO UPDATE SET
                aggregate_type = EXCLUDED.aggregate_type,
                version = EXCLUDED.version,
                taken_at = EXCLUDED.taken_at,
                state = EXCLUDED.state
            "#,
        )
        .bind(snapshot.registry_id.as_uuid())
        .bind(&snapshot.aggregate_type)
        .bind(snapshot.version.as_i64())
        .bind(snapshot.taken_at)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_snapshot(&self, registry_id: RegistryId) -> Result<Option<StateSnapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT registry_id, aggregate_type, version, taken_at, state
            FROM snapshots
            WHERE registry_id = $1
            "#,
        )
        .bind(registry_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(StateSnapshot {
                registry_id: RegistryId::from_uuid(row.try_get::<Uuid, _>("registry_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                version: Version::new(row.try_get("version")?),
                taken_at: row.try_get::<DateTime<Utc>, _>("taken_at")?,
                state: row.try_get("state")?,
            })),
            None => Ok(None),
        }
    }
}
