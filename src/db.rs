use crate::config::DB_FILE_NAME;
use crate::store::RecordStore;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

/// Record store backed by one SQLite file per workspace. Each collection is a
/// single JSON blob in the `kv` table, replaced wholesale on every write.
pub struct SqliteStore {
    conn: Connection,
}

pub fn open_db(workspace: &Path) -> anyhow::Result<SqliteStore> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(SqliteStore { conn })
}

impl RecordStore for SqliteStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()
            .with_context(|| format!("failed to read {}", key))?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv(key, value, updated_at)
                 VALUES(?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                (key, value),
            )
            .with_context(|| format!("failed to write {}", key))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", [key])
            .with_context(|| format!("failed to delete {}", key))?;
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to begin transaction")?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv(key, value, updated_at)
                 VALUES(?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                (*key, value.as_str()),
            )
            .with_context(|| format!("failed to write {}", key))?;
        }
        tx.commit().context("failed to commit transaction")?;
        Ok(())
    }
}
