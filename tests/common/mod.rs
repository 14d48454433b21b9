//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use heatquote_lib::db::Database;
use heatquote_lib::flow::QuoteApp;
use heatquote_lib::forms::FormData;
use heatquote_lib::notify::RecordingNotifier;
use heatquote_lib::settings::ClientSettings;
use heatquote_lib::state::StateStore;

pub use heatquote_lib::api::testing::FakeBackend;

pub fn app_with(
    backend: FakeBackend,
    state: StateStore,
    db: Database,
) -> (QuoteApp<FakeBackend>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = QuoteApp::new(backend, state, db, ClientSettings::default(), notifier.clone());
    (app, notifier)
}

pub fn app() -> (QuoteApp<FakeBackend>, Arc<RecordingNotifier>) {
    app_with(
        FakeBackend::default(),
        StateStore::detached(),
        Database::open_in_memory().expect("in-memory database"),
    )
}

pub fn mode2_form() -> FormData {
    FormData::from_pairs([
        ("postal_code", "50-001"),
        ("building_type", "dom"),
        ("heat_pump_purpose", "heating_cwu"),
        ("heated_area", "100"),
        ("eu_index", "70"),
    ])
}
