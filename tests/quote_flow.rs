mod common;

use common::{app, app_with, mode2_form, FakeBackend};
use heatquote_lib::analysis::{AnalysisError, PdfFile};
use heatquote_lib::db::Database;
use heatquote_lib::flow::FlowError;
use heatquote_lib::forms::{FormData, FormId};
use heatquote_lib::notify::Level;
use heatquote_lib::router::Route;
use heatquote_lib::state::StateStore;
use serde_json::json;

#[tokio::test]
async fn project_data_quote_end_to_end() {
    let (app, notifier) = app();
    assert!(app.navigate("tryb2").await);
    assert_eq!(app.query_string(), "?mode=mode2");

    let outcome = app.submit(FormId::Mode2, &mode2_form()).await.unwrap();

    assert_eq!(outcome.result.calculated_power, 7.8);
    assert_eq!(outcome.result.annual_demand, Some(7000.0));
    assert_eq!(app.state().get("mocSzacowana"), Some(json!(7.8)));
    assert_eq!(app.state().get("calculationComplete"), Some(json!(true)));
    assert_eq!(app.state().get("kit"), Some(json!("Panasonic Monoblock 8kW")));
    assert!(app.state().is_calculation_complete());
    assert_eq!(app.current_route(), Some(Route::Results));
    assert_eq!(app.history(), vec![Route::Mode2]);
    assert_eq!(notifier.count(Level::Success), 1);
}

#[tokio::test]
async fn full_calculator_receives_prepared_record() {
    let (app, _) = app();
    let data = FormData::from_pairs([
        ("postal_code", "30-001"),
        ("building_type", "dom"),
        ("heated_area", "150"),
        ("floors", "2"),
    ]);

    let outcome = app.submit(FormId::Mode1, &data).await.unwrap();

    // 150 m² × 0.06 kW/m² from the fake calculator.
    assert_eq!(outcome.result.calculated_power, 9.0);
    let buildings = app.backend().buildings.borrow();
    assert_eq!(buildings[0].postal_code, "30-001");
    assert_eq!(buildings[0].floors, 2);
    assert_eq!(buildings[0].heating_temp, 55.0);
}

#[tokio::test]
async fn validation_failure_never_reaches_backend() {
    let (app, notifier) = app();
    let data = FormData::from_pairs([
        ("postal_code", "50001"),
        ("building_type", "dom"),
        ("heated_area", "120"),
    ]);

    let err = app.submit(FormId::Mode1, &data).await.unwrap_err();

    let FlowError::Invalid(validation) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(validation.error_for("postal_code").is_some());
    assert_eq!(app.backend().requests.get(), 0);
    assert_eq!(notifier.count(Level::Error), 1);
    assert_eq!(app.state().get("calculationComplete"), Some(json!(false)));
}

#[tokio::test]
async fn non_pdf_is_rejected_before_any_network_call() {
    let (app, notifier) = app();
    let file = PdfFile::new("rzut.png", Some("image/png"), vec![0x89, 0x50, 0x4e, 0x47]);

    let err = app.analyze(file).await.unwrap_err();

    assert!(matches!(err, AnalysisError::InvalidFile));
    assert_eq!(app.backend().requests.get(), 0);
    assert_eq!(notifier.last().map(|(level, _)| level), Some(Level::Error));
}

#[tokio::test]
async fn analysis_fills_project_fields() {
    let (app, _) = app();
    let file = PdfFile::new("projekt.pdf", None, b"%PDF-1.4 test".to_vec());

    let report = app.analyze(file).await.unwrap();

    assert_eq!(report.location.as_deref(), Some("Wrocław"));
    let state = app.state().get_all();
    assert_eq!(state.heated_area, Some(142.0));
    assert_eq!(state.eu_index, Some(65.0));
    assert_eq!(state.estimated_power, Some(10.3));
    assert_eq!(state.extra.get("aiAnalysisCompleted"), Some(&json!(true)));
    assert!(!app.analyzer().is_busy());
}

#[tokio::test]
async fn analyzer_down_is_reported_without_upload() {
    let backend = FakeBackend {
        analyzer_available: false,
        ..FakeBackend::default()
    };
    let (app, _) = app_with(backend, StateStore::detached(), Database::open_in_memory().unwrap());
    let file = PdfFile::new("projekt.pdf", None, b"%PDF".to_vec());

    let err = app.analyze(file).await.unwrap_err();

    assert!(matches!(err, AnalysisError::ServiceUnavailable));
    // Only the health check went out.
    assert_eq!(app.backend().requests.get(), 1);
}

#[tokio::test]
async fn offer_delivery_after_quote() {
    let (app, _) = app();
    app.submit(FormId::Mode2, &mode2_form()).await.unwrap();

    let html = app.generate_offer_document().await.unwrap();
    assert!(html.contains("Panasonic Monoblock 8kW"));
    assert_eq!(app.state().get("pdfReady"), Some(json!(true)));

    app.send_offer_email("anna.nowak@example.pl").await.unwrap();
    assert_eq!(app.state().get("emailSent"), Some(json!(true)));
    assert_eq!(app.backend().emails.borrow()[0].language, "pl");
}

#[tokio::test]
async fn absurd_eu_index_is_refused_before_pricing() {
    let (app, _) = app();
    let mut data = mode2_form();
    data.insert("eu_index", "100000000000");

    let err = app.submit(FormId::Mode2, &data).await.unwrap_err();

    let FlowError::Invalid(validation) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(validation.error_for("eu_index").is_some());
    assert!(!app.state().is_calculation_complete());
}

#[tokio::test]
async fn analysis_after_a_quote_reopens_it() {
    let (app, _) = app();
    app.submit(FormId::Mode2, &mode2_form()).await.unwrap();
    assert!(app.state().is_calculation_complete());

    app.navigate("mode2").await;
    let file = PdfFile::new("projekt.pdf", None, b"%PDF-1.4".to_vec());
    app.analyze(file).await.unwrap();

    let state = app.state().get_all();
    assert_eq!(state.estimated_power, Some(10.3));
    assert_eq!(state.kit, None);
    assert_eq!(state.price, None);
    assert!(!state.calculation_complete);
    assert!(!app.state().is_calculation_complete());
    assert!(app.generate_offer_document().await.is_err());

    // Pricing the analysed power completes the quote again.
    let mut data = mode2_form();
    data.insert("heated_area", "142");
    data.insert("eu_index", "65");
    app.submit(FormId::Mode2, &data).await.unwrap();
    assert!(app.state().is_calculation_complete());
}

#[tokio::test]
async fn known_power_out_of_range_is_a_validation_error() {
    let (app, _) = app();
    let data = FormData::from_pairs([
        ("postal_code", "00-001"),
        ("known_power", "75"),
        ("heat_pump_purpose", "heating"),
    ]);

    let err = app.submit(FormId::Mode4, &data).await.unwrap_err();
    let FlowError::Invalid(validation) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(validation.error_for("known_power").is_some());
}
