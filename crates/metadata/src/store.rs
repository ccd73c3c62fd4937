//! Metadata store trait and implementations.

use crate::error::MetadataResult;
use crate::repos::{ArtifactRepo, MaintenanceRepo, RecordRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ArtifactRepo + RecordRepo + MaintenanceRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// Connections in the read pool. WAL lets these run alongside the writer.
pub const DEFAULT_READ_CONNECTIONS: u32 = 4;

/// SQLite-based metadata store.
///
/// Writes (ingestion, artifact upserts, `VACUUM`) go through a single-connection
/// pool, since SQLite admits one writer at a time. Reads use a separate pool so
/// they never queue behind an open write transaction.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    read_pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: Option<u64>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let busy_timeout_secs = busy_timeout_secs.unwrap_or(5);

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(busy_timeout_secs));

        // Only the writer switches the journal mode; WAL is persistent, so
        // readers opened afterwards inherit it without taking a write lock.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                opts.clone()
                    .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal),
            )
            .await?;

        let store = Self {
            read_pool: SqlitePoolOptions::new()
                .max_connections(DEFAULT_READ_CONNECTIONS)
                .connect_lazy_with(opts),
            pool,
        };
        // The schema must exist before any reader connects.
        store.migrate().await?;

        tracing::info!(
            path = %path.display(),
            busy_timeout_secs,
            read_connections = DEFAULT_READ_CONNECTIONS,
            "Opened SQLite store"
        );

        Ok(store)
    }

    /// Get a reference to the write connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Get a reference to the read connection pool.
    pub fn read_pool(&self) -> &Pool<Sqlite> {
        &self.read_pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        sqlx::query("SELECT 1").execute(&self.read_pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use benchcache_core::BenchmarkRecord;
    use time::OffsetDateTime;

    #[async_trait]
    impl ArtifactRepo for SqliteStore {
        async fn get_artifact(&self, name: &str) -> MetadataResult<Option<CachedArtifactRow>> {
            let row = sqlx::query_as::<_, CachedArtifactRow>(
                "SELECT name, blob, generated_at FROM cached_artifacts WHERE name = ?",
            )
            .bind(name)
            .fetch_optional(&self.read_pool)
            .await?;
            Ok(row)
        }

        async fn put_artifact(
            &self,
            name: &str,
            blob: &[u8],
            generated_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO cached_artifacts (name, blob, generated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    blob = excluded.blob,
                    generated_at = excluded.generated_at
                "#,
            )
            .bind(name)
            .bind(blob)
            .bind(generated_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl RecordRepo for SqliteStore {
        async fn append_records(
            &self,
            records: &[BenchmarkRecord],
            submitted_at: OffsetDateTime,
        ) -> MetadataResult<u64> {
            let mut tx = self.pool.begin().await?;
            let mut inserted = 0u64;

            for record in records {
                let result = sqlx::query(
                    r#"
                    INSERT INTO benchmark_results (
                        benchmark_type, benchmark_result, extra_info, machine_id, board,
                        cpu_name, cpu_config, num_cpus, num_cores, num_threads, num_nodes,
                        memory_in_kib, physical_memory_in_mib, memory_types, opengl_renderer,
                        gpu_desc, pointer_bits, data_from_super_user, used_threads,
                        benchmark_version, user_note, elapsed_time, machine_data_version,
                        legacy, machine_type, submitted_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&record.benchmark_type)
                .bind(record.benchmark_result)
                .bind(&record.extra_info)
                .bind(&record.machine_id)
                .bind(&record.board)
                .bind(&record.cpu_name)
                .bind(record.cpu_config.to_stored())
                .bind(record.num_cpus)
                .bind(record.num_cores)
                .bind(record.num_threads)
                .bind(record.num_nodes)
                .bind(record.memory_in_kib)
                .bind(record.physical_memory_in_mib)
                .bind(&record.memory_types)
                .bind(&record.opengl_renderer)
                .bind(&record.gpu_desc)
                .bind(record.pointer_bits)
                .bind(record.data_from_super_user)
                .bind(record.used_threads)
                .bind(record.benchmark_version)
                .bind(&record.user_note)
                .bind(record.elapsed_time)
                .bind(record.machine_data_version)
                .bind(record.legacy)
                .bind(&record.machine_type)
                .bind(submitted_at)
                .execute(&mut *tx)
                .await?;
                inserted += result.rows_affected();
            }

            tx.commit().await?;
            Ok(inserted)
        }

        async fn list_benchmark_types(&self) -> MetadataResult<Vec<String>> {
            let types: Vec<String> = sqlx::query_scalar(
                "SELECT DISTINCT benchmark_type FROM benchmark_results ORDER BY benchmark_type",
            )
            .fetch_all(&self.read_pool)
            .await?;
            Ok(types)
        }

        async fn sample_grouped_results(
            &self,
            benchmark_type: &str,
            limit: u32,
        ) -> MetadataResult<Vec<GroupedResultRow>> {
            // Non-aggregated columns take their value from an arbitrary row of
            // the group.
            let rows = sqlx::query_as::<_, GroupedResultRow>(
                r#"
                SELECT
                    machine_id,
                    pointer_bits,
                    AVG(benchmark_result) AS benchmark_result,
                    extra_info, board, cpu_name, cpu_config,
                    num_cpus, num_cores, num_threads, num_nodes,
                    memory_in_kib, physical_memory_in_mib, memory_types,
                    opengl_renderer, gpu_desc, data_from_super_user, used_threads,
                    benchmark_version, user_note, elapsed_time, machine_data_version,
                    legacy, machine_type
                FROM benchmark_results
                WHERE benchmark_type = ? AND legacy = 0
                GROUP BY machine_id, pointer_bits
                ORDER BY RANDOM()
                LIMIT ?
                "#,
            )
            .bind(benchmark_type)
            .bind(i64::from(limit))
            .fetch_all(&self.read_pool)
            .await?;
            Ok(rows)
        }

        async fn list_records(
            &self,
            benchmark_type: &str,
        ) -> MetadataResult<Vec<BenchmarkRecordRow>> {
            let rows = sqlx::query_as::<_, BenchmarkRecordRow>(
                "SELECT * FROM benchmark_results WHERE benchmark_type = ? ORDER BY id",
            )
            .bind(benchmark_type)
            .fetch_all(&self.read_pool)
            .await?;
            Ok(rows)
        }

        async fn count_records(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM benchmark_results")
                .fetch_one(&self.read_pool)
                .await?;
            Ok(count.max(0) as u64)
        }
    }

    #[async_trait]
    impl MaintenanceRepo for SqliteStore {
        async fn compact(&self) -> MetadataResult<()> {
            sqlx::query("VACUUM").execute(&self.pool).await?;
            Ok(())
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Benchmark records (append-only)
CREATE TABLE IF NOT EXISTS benchmark_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    benchmark_type TEXT NOT NULL,
    benchmark_result REAL NOT NULL,
    extra_info TEXT NOT NULL DEFAULT '',
    machine_id TEXT NOT NULL,
    board TEXT NOT NULL DEFAULT '',
    cpu_name TEXT NOT NULL DEFAULT '',
    cpu_config TEXT NOT NULL DEFAULT '{}',
    num_cpus INTEGER NOT NULL DEFAULT 0,
    num_cores INTEGER NOT NULL DEFAULT 0,
    num_threads INTEGER NOT NULL DEFAULT 0,
    num_nodes INTEGER NOT NULL DEFAULT 0,
    memory_in_kib INTEGER NOT NULL DEFAULT 0,
    physical_memory_in_mib INTEGER NOT NULL DEFAULT 0,
    memory_types TEXT NOT NULL DEFAULT '',
    opengl_renderer TEXT NOT NULL DEFAULT '',
    gpu_desc TEXT NOT NULL DEFAULT '',
    pointer_bits INTEGER NOT NULL DEFAULT 0,
    data_from_super_user INTEGER NOT NULL DEFAULT 0,
    used_threads INTEGER NOT NULL DEFAULT 0,
    benchmark_version INTEGER NOT NULL DEFAULT 0,
    user_note TEXT NOT NULL DEFAULT '',
    elapsed_time REAL NOT NULL DEFAULT 0,
    machine_data_version INTEGER NOT NULL DEFAULT 0,
    legacy INTEGER NOT NULL DEFAULT 0,
    machine_type TEXT NOT NULL DEFAULT '',
    submitted_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_benchmark_results_type ON benchmark_results(benchmark_type, legacy);

-- Cached artifacts (one row per name)
CREATE TABLE IF NOT EXISTS cached_artifacts (
    name TEXT PRIMARY KEY,
    blob BLOB NOT NULL,
    generated_at TEXT NOT NULL
);
"#;
