use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{helpers::parse_datetime, Database};

/// One row of the local-storage table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

fn row_to_item(row: &Row) -> Result<StoredItem> {
    let updated_at: String = row.get("updated_at")?;

    Ok(StoredItem {
        key: row.get("key")?,
        value: row.get("value")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Read a value by key, `None` when nothing was stored.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM local_storage WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .with_context(|| format!("failed to read storage key {key}"))?;
            Ok(value)
        })
        .await
    }

    /// Insert or overwrite a value.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO local_storage (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write storage key {key}"))?;
            Ok(())
        })
        .await
    }

    /// Delete a key. Returns whether a row was removed.
    pub async fn remove_item(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute("DELETE FROM local_storage WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove storage key {key}"))?;
            Ok(removed > 0)
        })
        .await
    }

    /// All items whose key starts with `prefix`, e.g. every `form_` autosave.
    pub async fn items_with_prefix(&self, prefix: &str) -> Result<Vec<StoredItem>> {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value, updated_at
                 FROM local_storage
                 WHERE key LIKE ?1 ESCAPE '\\'
                 ORDER BY key ASC",
            )?;

            let mut rows = stmt.query(params![pattern])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(row_to_item(row)?);
            }

            Ok(items)
        })
        .await
    }
}
