pub mod data;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::db::{helpers::form_storage_key, Database};
use crate::log_debug;

pub use data::{FieldValue, FormData, FormId};

const ENABLE_LOGS: bool = true;

/// Per-form autosave under `form_{formId}`.
#[derive(Clone)]
pub struct FormAutosave {
    db: Database,
}

impl FormAutosave {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn save(&self, form: FormId, data: &FormData) -> Result<()> {
        let serialized = serde_json::to_string(data).context("failed to serialize form")?;
        self.db
            .set_item(&form_storage_key(form.as_str()), &serialized)
            .await?;
        log_debug!("Form auto-saved: {form}");
        Ok(())
    }

    pub async fn load(&self, form: FormId) -> Result<Option<FormData>> {
        let Some(raw) = self.db.get_item(&form_storage_key(form.as_str())).await? else {
            return Ok(None);
        };

        let data = serde_json::from_str(&raw)
            .with_context(|| format!("saved data for form {form} is not valid JSON"))?;
        log_debug!("Saved form data loaded: {form}");
        Ok(Some(data))
    }

    pub async fn clear(&self, form: FormId) -> Result<bool> {
        self.db.remove_item(&form_storage_key(form.as_str())).await
    }

    /// Every form that has an autosave, with when it was written.
    pub async fn saved_forms(&self) -> Result<Vec<(FormId, DateTime<Utc>)>> {
        let items = self.db.items_with_prefix(&form_storage_key("")).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| {
                let form = item.key.strip_prefix(&form_storage_key(""))?.parse().ok()?;
                Some((form, item.updated_at))
            })
            .collect())
    }
}
