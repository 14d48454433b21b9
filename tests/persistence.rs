mod common;

use common::{app_with, mode2_form, FakeBackend};
use heatquote_lib::db::Database;
use heatquote_lib::forms::FormId;
use heatquote_lib::router::Route;
use heatquote_lib::state::StateStore;
use serde_json::json;

#[tokio::test]
async fn quote_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("heatquote.sqlite3");

    {
        let db = Database::new(db_path.clone()).unwrap();
        let state = StateStore::load(db.clone()).await;
        let (app, _) = app_with(FakeBackend::default(), state, db);
        app.submit(FormId::Mode2, &mode2_form()).await.unwrap();
    }

    let db = Database::new(db_path).unwrap();
    let state = StateStore::load(db.clone()).await;
    assert!(state.is_calculation_complete());
    assert_eq!(state.get("mocSzacowana"), Some(json!(7.8)));

    let (app, _) = app_with(FakeBackend::default(), state, db);
    assert_eq!(app.current_route(), Some(Route::Results));
    assert_eq!(app.restore_form(FormId::Mode2).await, Some(mode2_form()));
}

#[tokio::test]
async fn stored_numeric_mode_is_understood() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("state.sqlite3")).unwrap();
    db.set_item(
        "ZORDON_STATE",
        r#"{"currentMode": 2, "powierzchnia": 120, "emailSent": true}"#,
    )
    .await
    .unwrap();

    let state = StateStore::load(db).await;
    let snapshot = state.get_all();
    assert_eq!(snapshot.current_mode, Some(Route::Mode2));
    assert_eq!(snapshot.heated_area, Some(120.0));
    assert_eq!(snapshot.extra.get("emailSent"), Some(&json!(true)));
}

#[tokio::test]
async fn export_then_import_into_fresh_store() {
    let source = StateStore::detached();
    source
        .update(json!({ "powierzchnia": 95.5, "eu": 80, "name": "Jan" }))
        .await
        .unwrap();
    let exported = source.export();

    let target = StateStore::detached();
    target.import(&exported).await.unwrap();
    assert_eq!(target.get("powierzchnia"), Some(json!(95.5)));
    assert_eq!(target.get("name"), Some(json!("Jan")));

    assert!(target.import("{not json").await.is_err());
    assert_eq!(target.get("powierzchnia"), Some(json!(95.5)));
}
