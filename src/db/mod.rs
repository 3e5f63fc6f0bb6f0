use crate::errors::{AppError, AppResult};
use crate::models::{ClientStatusRow, EcdOverrides, EditLogEntry, EditSource, MetricsMap};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const CLIENT_STATUS_COLUMNS: &str = "sf_id, task_id, task_name, task_status, task_url,
       task_created_at, task_closed_at, metrics_json, source_updated_at, synced_at";

const UPSERT_CLIENT_STATUS_SQL: &str = "INSERT INTO client_status (
       sf_id, task_id, task_name, task_status, task_url,
       task_created_at, task_closed_at, metrics_json, source_updated_at, synced_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
     ON CONFLICT(sf_id) DO UPDATE SET
       task_id = excluded.task_id,
       task_name = excluded.task_name,
       task_status = excluded.task_status,
       task_url = excluded.task_url,
       task_created_at = excluded.task_created_at,
       task_closed_at = excluded.task_closed_at,
       metrics_json = excluded.metrics_json,
       source_updated_at = excluded.source_updated_at,
       synced_at = excluded.synced_at";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };
        db.ensure_schema_extensions()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    fn ensure_schema_extensions(&self) -> AppResult<()> {
        let conn = self.lock()?;
        for column in ["task_created_at", "task_closed_at"] {
            if !column_exists(&conn, "client_status", column)? {
                conn.execute(&format!("ALTER TABLE client_status ADD COLUMN {column} TEXT"), [])?;
            }
        }
        Ok(())
    }

    pub fn upsert_client_status(&self, row: &ClientStatusRow) -> AppResult<()> {
        let metrics_json = serde_json::to_string(&row.metrics)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(UPSERT_CLIENT_STATUS_SQL, client_status_params(row, &metrics_json, &now))?;
        Ok(())
    }

    /// Upserts every row in one transaction and returns how many were written.
    pub fn upsert_client_statuses(&self, rows: &[ClientStatusRow]) -> AppResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_CLIENT_STATUS_SQL)?;
            for row in rows {
                let metrics_json = serde_json::to_string(&row.metrics)?;
                stmt.execute(client_status_params(row, &metrics_json, &now))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn get_client_status(&self, sf_id: &str) -> AppResult<Option<ClientStatusRow>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {CLIENT_STATUS_COLUMNS} FROM client_status WHERE sf_id = ?1"),
                [sf_id],
                parse_client_status_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_client_statuses(&self) -> AppResult<Vec<ClientStatusRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CLIENT_STATUS_COLUMNS} FROM client_status ORDER BY lower(task_name), sf_id"
        ))?;
        let rows = stmt
            .query_map([], parse_client_status_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_ecd_overrides(&self, sf_id: &str) -> AppResult<EcdOverrides> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT step_slug, ecd_value FROM ecd_override WHERE sf_id = ?1")?;
        let overrides = stmt
            .query_map([sf_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<EcdOverrides, _>>()?;
        Ok(overrides)
    }

    /// Stores an ECD override; a blank value removes it.
    pub fn upsert_ecd_override(&self, sf_id: &str, step_slug: &str, ecd_value: &str) -> AppResult<()> {
        let conn = self.lock()?;
        if ecd_value.trim().is_empty() {
            conn.execute(
                "DELETE FROM ecd_override WHERE sf_id = ?1 AND step_slug = ?2",
                params![sf_id, step_slug],
            )?;
        } else {
            conn.execute(
                "INSERT INTO ecd_override (sf_id, step_slug, ecd_value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(sf_id, step_slug) DO UPDATE SET
                   ecd_value = excluded.ecd_value,
                   updated_at = excluded.updated_at",
                params![sf_id, step_slug, ecd_value, Utc::now().to_rfc3339()],
            )?;
        }
        Ok(())
    }

    pub fn log_edit(
        &self,
        sf_id: &str,
        task_id: Option<&str>,
        field_key: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        source: EditSource,
    ) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO edit_log (logged_at, sf_id, task_id, field_key, old_value, new_value, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Utc::now().to_rfc3339(),
                sf_id,
                task_id,
                field_key,
                old_value,
                new_value,
                source.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Edit history for one client, oldest first.
    pub fn list_edit_log(&self, sf_id: &str) -> AppResult<Vec<EditLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, logged_at, sf_id, task_id, field_key, old_value, new_value, source
             FROM edit_log
             WHERE sf_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([sf_id], |row| {
                Ok(EditLogEntry {
                    id: row.get(0)?,
                    logged_at: row.get(1)?,
                    sf_id: row.get(2)?,
                    task_id: row.get(3)?,
                    field_key: row.get(4)?,
                    old_value: row.get(5)?,
                    new_value: row.get(6)?,
                    source: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn client_status_params<'a>(
    row: &'a ClientStatusRow,
    metrics_json: &'a String,
    synced_at: &'a String,
) -> [&'a dyn rusqlite::ToSql; 10] {
    [
        &row.sf_id,
        &row.task_id,
        &row.task_name,
        &row.task_status,
        &row.task_url,
        &row.task_created_at,
        &row.task_closed_at,
        metrics_json,
        &row.source_updated_at,
        synced_at,
    ]
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let pragma = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn parse_client_status_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientStatusRow> {
    let text = |index: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(index)?.unwrap_or_default())
    };
    let metrics_raw = text(7)?;
    Ok(ClientStatusRow {
        sf_id: row.get(0)?,
        task_id: row.get(1)?,
        task_name: row.get(2)?,
        task_status: row.get(3)?,
        task_url: row.get(4)?,
        task_created_at: text(5)?,
        task_closed_at: text(6)?,
        metrics: serde_json::from_str::<MetricsMap>(&metrics_raw).unwrap_or_default(),
        source_updated_at: text(8)?,
        synced_at: text(9)?,
    })
}
