//! SQLite Scheduler Store
//!
//! Implements SchedulerStore using SQLite for durable storage.
//! Holds the `backends` and `policies` tables.

use crate::domain::entities::{Backend, PolicyConfig};
use crate::domain::ports::SchedulerStore;
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

/// SQLite-backed scheduler store.
///
/// A single connection behind a mutex; every write is its own
/// autocommit statement, so a successful return means the row is on disk.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: String,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open scheduler db at {}", path))?;

        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        tracing::debug!("scheduler db journal_mode={}", mode);

        Self::init_schema(&conn)?;
        tracing::info!("scheduler store opened, db_path={}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_string(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: ":memory:".to_string(),
        })
    }

    /// Path this store was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS backends (
                id TEXT PRIMARY KEY,
                app_id TEXT NOT NULL,
                instance_id TEXT NOT NULL UNIQUE,
                weight INTEGER NOT NULL DEFAULT 1,
                state TEXT NOT NULL DEFAULT 'active'
            );
            CREATE INDEX IF NOT EXISTS idx_backends_app_id ON backends(app_id);
            CREATE TABLE IF NOT EXISTS policies (
                app_id TEXT PRIMARY KEY,
                policy_type TEXT NOT NULL,
                "limit" INTEGER NOT NULL
            );
            "#,
        )
        .context("failed to create scheduler schema")?;
        Ok(())
    }

    /// Convert a SQLite row to a Backend entity.
    fn row_to_backend(row: &Row) -> rusqlite::Result<Backend> {
        let state: String = row.get(4)?;
        Ok(Backend {
            id: row.get(0)?,
            app_id: row.get(1)?,
            instance_id: row.get(2)?,
            weight: Self::positive_column(row, 3)?,
            state: state
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        })
    }

    /// Convert a SQLite row to a PolicyConfig.
    fn row_to_policy(row: &Row) -> rusqlite::Result<PolicyConfig> {
        let policy_type: String = row.get(1)?;
        Ok(PolicyConfig {
            app_id: row.get(0)?,
            policy_type: policy_type
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
            limit: Self::positive_column(row, 2)? as usize,
        })
    }

    /// Read a weight or limit column; values outside `1..=u32::MAX` are rejected.
    fn positive_column(row: &Row, idx: usize) -> rusqlite::Result<u32> {
        let value: i64 = row.get(idx)?;
        u32::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, value))
    }
}

impl SchedulerStore for SqliteStore {
    fn load_backends(&self) -> Result<Vec<Backend>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, app_id, instance_id, weight, state FROM backends ORDER BY id")?;

        let backends = stmt
            .query_map([], |row| Self::row_to_backend(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(backends)
    }

    fn load_policies(&self) -> Result<Vec<PolicyConfig>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare(r#"SELECT app_id, policy_type, "limit" FROM policies ORDER BY app_id"#)?;

        let policies = stmt
            .query_map([], |row| Self::row_to_policy(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(policies)
    }

    fn insert_backend(&self, backend: &Backend) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO backends (id, app_id, instance_id, weight, state)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    backend.id,
                    backend.app_id,
                    backend.instance_id,
                    i64::from(backend.weight),
                    backend.state.as_str()
                ],
            )
            .with_context(|| format!("failed to insert backend {}", backend.id))?;
        Ok(())
    }

    fn update_backend(&self, backend: &Backend) -> Result<()> {
        let updated = self
            .conn
            .lock()
            .execute(
                "UPDATE backends SET app_id = ?1, weight = ?2, state = ?3 WHERE id = ?4",
                params![
                    backend.app_id,
                    i64::from(backend.weight),
                    backend.state.as_str(),
                    backend.id
                ],
            )
            .with_context(|| format!("failed to update backend {}", backend.id))?;

        if updated == 0 {
            bail!("backend {} is not stored", backend.id);
        }
        Ok(())
    }

    fn delete_backend(&self, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM backends WHERE id = ?1", [id])
            .with_context(|| format!("failed to delete backend {}", id))?;

        if deleted == 0 {
            bail!("backend {} is not stored", id);
        }
        Ok(())
    }

    fn upsert_policy(&self, policy: &PolicyConfig) -> Result<()> {
        self.conn
            .lock()
            .execute(
                r#"INSERT OR REPLACE INTO policies (app_id, policy_type, "limit") VALUES (?1, ?2, ?3)"#,
                params![policy.app_id, policy.policy_type.as_str(), policy.limit as i64],
            )
            .with_context(|| format!("failed to store policy for {}", policy.app_id))?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .context("failed to checkpoint scheduler db")?;
        tracing::debug!("scheduler store flushed, db_path={}", self.path);
        Ok(())
    }
}
