//! Application state container: one flat record per quote session.
//!
//! Every write notifies subscribers synchronously with
//! `(key, new value, old value, full state)` and then persists the whole
//! record under [`STATE_STORAGE_KEY`]. Persistence is best-effort: failures
//! are logged, never returned.

pub mod record;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::Database;
use crate::{log_debug, log_warn};

pub use record::{PdfSummary, QuoteState, STATE_VERSION};

const ENABLE_LOGS: bool = true;

pub const STATE_STORAGE_KEY: &str = "ZORDON_STATE";
/// Notification key fired by [`StateStore::reset`].
pub const RESET_KEY: &str = "RESET";
/// Notification key fired by [`StateStore::import`].
pub const IMPORT_KEY: &str = "IMPORT";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("calculationComplete requires power, kit and price to be set")]
    IncompleteCalculation,
    #[error("state JSON could not be parsed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One change as seen by a subscriber.
#[derive(Debug)]
pub struct StateChange<'a> {
    pub key: &'a str,
    pub new_value: &'a Value,
    pub old_value: Option<&'a Value>,
    pub state: &'a Map<String, Value>,
}

pub type ListenerId = u64;
type Listener = Arc<dyn Fn(&StateChange<'_>) + Send + Sync>;

pub struct StateStore {
    state: Mutex<Map<String, Value>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    storage: Option<Database>,
    persist_lock: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn validate(map: &Map<String, Value>, key: &str) -> Result<QuoteState, StateError> {
    let state = QuoteState::from_map(map).map_err(|err| StateError::InvalidValue {
        key: key.to_string(),
        reason: err.to_string(),
    })?;
    if !state.completion_is_consistent() {
        return Err(StateError::IncompleteCalculation);
    }
    Ok(state)
}

fn merge_saved(map: &mut Map<String, Value>, saved: Map<String, Value>) {
    let mut merged = map.clone();
    merged.extend(saved.clone());
    if validate(&merged, STATE_STORAGE_KEY).is_ok() {
        *map = merged;
        return;
    }

    // Salvage key by key; the completion flag goes last so it is judged
    // against whatever power/kit/price survived.
    let (flags, values): (Vec<_>, Vec<_>) = saved
        .into_iter()
        .partition(|(key, _)| key == "calculationComplete");
    for (key, value) in values.into_iter().chain(flags) {
        let previous = map.insert(key.clone(), value);
        if validate(map, &key).is_err() {
            log_warn!("Dropping stored state key '{key}': value no longer valid");
            match previous {
                Some(previous) => map.insert(key, previous),
                None => map.remove(&key),
            };
        }
    }
}

impl StateStore {
    /// In-memory store that never touches storage.
    pub fn detached() -> Self {
        Self::with_map(QuoteState::default().to_map(), None)
    }

    /// Seeds from the persisted snapshot (if any), shallow-merged over defaults.
    /// Keys whose stored value no longer fits the record are dropped.
    pub async fn load(storage: Database) -> Self {
        let mut map = QuoteState::default().to_map();

        match storage.get_item(STATE_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(saved) => {
                    merge_saved(&mut map, saved);
                    log_debug!("State loaded from storage");
                }
                Err(err) => log_warn!("Failed to parse stored state: {err}"),
            },
            Ok(None) => {}
            Err(err) => log_warn!("Failed to load state from storage: {err:#}"),
        }

        Self::with_map(map, Some(storage))
    }

    fn with_map(map: Map<String, Value>, storage: Option<Database>) -> Self {
        Self {
            state: Mutex::new(map),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            storage,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.state).get(key).cloned()
    }

    pub fn get_all(&self) -> QuoteState {
        let map = lock(&self.state).clone();
        QuoteState::from_map(&map).unwrap_or_default()
    }

    pub fn get_all_raw(&self) -> Map<String, Value> {
        lock(&self.state).clone()
    }

    pub async fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), StateError> {
        let value = value.into();
        let (old_value, snapshot) = {
            let mut state = lock(&self.state);
            let mut candidate = state.clone();
            let old_value = candidate.insert(key.to_string(), value.clone());
            validate(&candidate, key)?;
            *state = candidate;
            (old_value, state.clone())
        };

        log_debug!("Set {key}: {value}");
        self.notify(key, &value, old_value.as_ref(), &snapshot);
        self.persist().await;
        Ok(())
    }

    /// Applies several keys at once. Only keys whose value changed are notified.
    pub async fn update(&self, updates: Value) -> Result<(), StateError> {
        let Value::Object(updates) = updates else {
            return Err(StateError::InvalidValue {
                key: "update".into(),
                reason: "expected a JSON object".into(),
            });
        };

        let (changed, snapshot) = {
            let mut state = lock(&self.state);
            let mut candidate = state.clone();
            let mut changed = Vec::new();
            for (key, value) in updates {
                if candidate.get(&key) != Some(&value) {
                    let old_value = candidate.insert(key.clone(), value);
                    changed.push((key, old_value));
                }
            }
            validate(&candidate, "update")?;
            *state = candidate;
            (changed, state.clone())
        };

        log_debug!("Bulk update of {} keys", changed.len());
        for (key, old_value) in &changed {
            if let Some(new_value) = snapshot.get(key) {
                self.notify(key, new_value, old_value.as_ref(), &snapshot);
            }
        }
        self.persist().await;
        Ok(())
    }

    /// Restores the default record and fires a single `RESET` notification.
    pub async fn reset(&self) {
        let snapshot = {
            let mut state = lock(&self.state);
            *state = QuoteState::default().to_map();
            state.clone()
        };

        log_debug!("State reset");
        let full = Value::Object(snapshot.clone());
        let empty = Value::Object(Map::new());
        self.notify(RESET_KEY, &full, Some(&empty), &snapshot);
        self.persist().await;
    }

    pub fn export(&self) -> String {
        serde_json::to_string_pretty(&*lock(&self.state)).unwrap_or_else(|_| "{}".into())
    }

    /// Shallow-merges a JSON snapshot over the current state.
    pub async fn import(&self, json: &str) -> Result<(), StateError> {
        let imported: Map<String, Value> = serde_json::from_str(json).map_err(|err| {
            log_warn!("Failed to import state: {err}");
            StateError::Serialize(err)
        })?;

        let snapshot = {
            let mut state = lock(&self.state);
            let mut candidate = state.clone();
            candidate.extend(imported);
            validate(&candidate, IMPORT_KEY)?;
            *state = candidate;
            state.clone()
        };

        log_debug!("State imported from JSON");
        let full = Value::Object(snapshot.clone());
        let empty = Value::Object(Map::new());
        self.notify(IMPORT_KEY, &full, Some(&empty), &snapshot);
        self.persist().await;
        Ok(())
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StateChange<'_>) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let mut listeners = lock(&self.listeners);
        listeners.push((id, Arc::new(listener)));
        log_debug!("Listener added, total: {}", listeners.len());
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    pub fn is_calculation_complete(&self) -> bool {
        self.get_all().is_calculation_complete()
    }

    pub fn can_generate_pdf(&self) -> bool {
        self.get_all().can_generate_pdf()
    }

    pub fn pdf_summary(&self) -> PdfSummary {
        self.get_all().pdf_summary()
    }

    fn notify(
        &self,
        key: &str,
        new_value: &Value,
        old_value: Option<&Value>,
        state: &Map<String, Value>,
    ) {
        // Snapshot the list so listeners may subscribe/unsubscribe re-entrantly.
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        let change = StateChange {
            key,
            new_value,
            old_value,
            state,
        };
        for listener in listeners {
            listener(&change);
        }
    }

    async fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        // Serialize under the persist lock so the latest snapshot always lands last.
        let _guard = self.persist_lock.lock().await;
        let serialized = match serde_json::to_string(&*lock(&self.state)) {
            Ok(serialized) => serialized,
            Err(err) => {
                log_warn!("Failed to serialize state: {err}");
                return;
            }
        };

        if let Err(err) = storage.set_item(STATE_STORAGE_KEY, &serialized).await {
            log_warn!("Failed to save state to storage: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(store: &StateStore) -> Arc<Mutex<Vec<(String, Value, Option<Value>)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |change| {
            sink.lock().unwrap().push((
                change.key.to_string(),
                change.new_value.clone(),
                change.old_value.cloned(),
            ));
        });
        seen
    }

    #[tokio::test]
    async fn set_notifies_with_old_and_new_value() {
        let store = StateStore::detached();
        let seen = recorder(&store);

        store.set("powierzchnia", 150.0).await.unwrap();
        store.set("powierzchnia", 160.0).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], ("powierzchnia".into(), json!(160.0), Some(json!(150.0))));
        assert_eq!(store.get_all().heated_area, Some(160.0));
    }

    #[tokio::test]
    async fn wrongly_typed_write_is_rejected() {
        let store = StateStore::detached();
        let err = store.set("kondygnacje", "dwie").await.unwrap_err();
        assert!(matches!(err, StateError::InvalidValue { ref key, .. } if key == "kondygnacje"));
        assert_eq!(store.get("kondygnacje"), Some(json!(1)));
    }

    #[tokio::test]
    async fn completion_flag_without_results_is_rejected() {
        let store = StateStore::detached();
        let err = store.set("calculationComplete", true).await.unwrap_err();
        assert!(matches!(err, StateError::IncompleteCalculation));

        store
            .update(json!({
                "mocSzacowana": 7.8,
                "kit": "Panasonic Monoblock 8kW",
                "price": 31_000.0,
                "calculationComplete": true
            }))
            .await
            .unwrap();
        assert!(store.get_all().calculation_complete);
    }

    #[tokio::test]
    async fn update_notifies_only_changed_keys() {
        let store = StateStore::detached();
        let seen = recorder(&store);

        store
            .update(json!({ "kondygnacje": 1, "eu": 70.0, "aiAnalysisCompleted": true }))
            .await
            .unwrap();

        let keys: Vec<String> = seen.lock().unwrap().iter().map(|(k, _, _)| k.clone()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"eu".to_string()));
        assert!(keys.contains(&"aiAnalysisCompleted".to_string()));
    }

    #[tokio::test]
    async fn reset_restores_defaults_and_fires_reset() {
        let store = StateStore::detached();
        store
            .update(json!({ "powierzchnia": 120.0, "email": "jan@example.pl" }))
            .await
            .unwrap();
        let seen = recorder(&store);

        store.reset().await;

        let state = store.get_all();
        assert_eq!(state, QuoteState::defaults_at(state.timestamp.clone()));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, RESET_KEY);
    }

    #[tokio::test]
    async fn unsubscribed_listener_stops_receiving() {
        let store = StateStore::detached();
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let id = store.subscribe(move |_| *sink.lock().unwrap() += 1);

        store.set("eu", 60.0).await.unwrap();
        assert!(store.unsubscribe(id));
        store.set("eu", 65.0).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn writes_persist_and_reload() {
        let db = Database::open_in_memory().unwrap();
        let store = StateStore::load(db.clone()).await;
        store.set("email", "anna@example.pl").await.unwrap();
        store.set("aiAnalysisCompleted", true).await.unwrap();

        let reloaded = StateStore::load(db).await;
        let state = reloaded.get_all();
        assert_eq!(state.email.as_deref(), Some("anna@example.pl"));
        assert_eq!(state.extra.get("aiAnalysisCompleted"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn invalid_stored_keys_are_dropped_on_load() {
        let db = Database::open_in_memory().unwrap();
        db.set_item(
            STATE_STORAGE_KEY,
            r#"{"kondygnacje":"many","eu":80,"calculationComplete":true}"#,
        )
        .await
        .unwrap();

        let state = StateStore::load(db).await.get_all();
        assert_eq!(state.floors, 1);
        assert_eq!(state.eu_index, Some(80.0));
        assert!(!state.calculation_complete);
    }

    #[tokio::test]
    async fn import_merges_and_export_round_trips() {
        let store = StateStore::detached();
        store.set("name", "Jan").await.unwrap();
        store.import(r#"{"phone":"600100200"}"#).await.unwrap();

        let state = store.get_all();
        assert_eq!(state.name.as_deref(), Some("Jan"));
        assert_eq!(state.phone.as_deref(), Some("600100200"));

        let other = StateStore::detached();
        other.import(&store.export()).await.unwrap();
        assert_eq!(other.get_all(), state);

        assert!(store.import("[1, 2").await.is_err());
    }

    #[tokio::test]
    async fn reset_and_import_notify_before_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.sqlite3");
        let store = StateStore::load(Database::new(path.clone()).unwrap()).await;
        store.set("powierzchnia", 120.0).await.unwrap();

        // Each listener call records what was on disk at that moment.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |change| {
            let conn = rusqlite::Connection::open(&path).unwrap();
            let raw: String = conn
                .query_row(
                    "SELECT value FROM local_storage WHERE key = ?1",
                    [STATE_STORAGE_KEY],
                    |row| row.get(0),
                )
                .unwrap();
            let stored: Value = serde_json::from_str(&raw).unwrap();
            sink.lock()
                .unwrap()
                .push((change.key.to_string(), stored["powierzchnia"].clone()));
        });

        store.reset().await;
        store.import(r#"{"powierzchnia": 80}"#).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (RESET_KEY.to_string(), json!(120.0)));
        assert_eq!(seen[1], (IMPORT_KEY.to_string(), Value::Null));
        assert_eq!(store.get("powierzchnia"), Some(json!(80)));
    }
}
