//! Composition root for a quote session.
//!
//! [`QuoteApp`] owns the state store, the router, the backend and the
//! notifier, and runs the multi-step flows over them. Every navigation
//! cancels the flow token handed to whatever was in flight, so a result that
//! arrives after the user moved on is discarded instead of written.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::analysis::{AnalysisError, AnalysisReport, PdfAnalyzer, PdfFile};
use crate::api::QuoteBackend;
use crate::calculation::{calculate, CalculationError, CalculationMethod, CalculationResult};
use crate::db::Database;
use crate::forms::{FormAutosave, FormData, FormId};
use crate::notify::Notifier;
use crate::offer::{self, OfferError};
use crate::pricing::{recommend_kit, KitOptions, KitRecommendation};
use crate::router::{Route, Router, SectionRegistry};
use crate::settings::ClientSettings;
use crate::state::{StateError, StateStore};
use crate::validation::{validate_form, FormValidation};
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Formularz zawiera błędy ({} pól)", .0.errors.len())]
    Invalid(FormValidation),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("Obliczenia przerwane: zmieniono widok")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub form: FormId,
    pub result: CalculationResult,
    pub kit: KitRecommendation,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct QuoteApp<B> {
    backend: B,
    state: StateStore,
    router: Mutex<Router<SectionRegistry>>,
    autosave: FormAutosave,
    analyzer: PdfAnalyzer,
    settings: ClientSettings,
    notifier: Arc<dyn Notifier>,
    flow_token: Mutex<CancellationToken>,
}

impl<B: QuoteBackend> QuoteApp<B> {
    /// Wires the session together. The view starts on the route stored in
    /// `currentMode`, or nowhere when the state has none.
    pub fn new(
        backend: B,
        state: StateStore,
        db: Database,
        settings: ClientSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut router = Router::new(SectionRegistry::new());
        if let Some(route) = state.get_all().current_mode {
            router.pop_state(route);
        }

        Self {
            backend,
            state,
            router: Mutex::new(router),
            autosave: FormAutosave::new(db),
            analyzer: PdfAnalyzer::new(&settings),
            settings,
            notifier,
            flow_token: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn analyzer(&self) -> &PdfAnalyzer {
        &self.analyzer
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn current_route(&self) -> Option<Route> {
        lock(&self.router).current()
    }

    pub fn history(&self) -> Vec<Route> {
        lock(&self.router).history().to_vec()
    }

    pub fn visible_sections(&self) -> Vec<Route> {
        lock(&self.router).view().visible()
    }

    pub fn query_string(&self) -> String {
        lock(&self.router).query_string()
    }

    /// Token for a flow starting now; cancelled by the next navigation.
    pub fn flow_token(&self) -> CancellationToken {
        lock(&self.flow_token).clone()
    }

    pub fn cancel_in_flight(&self) {
        let mut token = lock(&self.flow_token);
        if !token.is_cancelled() {
            log_debug!("Cancelling in-flight flow");
        }
        token.cancel();
        *token = CancellationToken::new();
    }

    async fn after_navigation(&self, route: Route) {
        self.cancel_in_flight();
        if let Err(err) = self.state.set("currentMode", route.as_str()).await {
            log_warn!("Failed to record current route: {err}");
        }
    }

    /// Navigates by name or alias; `false` when the route is unknown.
    pub async fn navigate(&self, name: &str) -> bool {
        let route = {
            let mut router = lock(&self.router);
            if !router.navigate(name) {
                return false;
            }
            router.current()
        };
        if let Some(route) = route {
            self.after_navigation(route).await;
        }
        true
    }

    pub async fn navigate_to(&self, route: Route) {
        lock(&self.router).navigate_to(route);
        self.after_navigation(route).await;
    }

    pub async fn go_back(&self) -> Route {
        let route = lock(&self.router).go_back();
        self.after_navigation(route).await;
        route
    }

    /// History traversal: shows `route` without recording history.
    pub async fn pop_state(&self, route: Route) {
        lock(&self.router).pop_state(route);
        self.after_navigation(route).await;
    }

    pub async fn init_from_query(&self, query: &str) -> Route {
        let route = lock(&self.router).init_from_query(query);
        self.after_navigation(route).await;
        route
    }

    /// Validate, autosave, calculate, price, then commit everything in one
    /// state update and show the results.
    pub async fn submit(&self, form: FormId, data: &FormData) -> Result<SubmitOutcome, FlowError> {
        let token = self.flow_token();

        let validation = validate_form(form, data);
        if !validation.valid {
            self.notifier.error("Popraw błędy w formularzu");
            return Err(FlowError::Invalid(validation));
        }

        if let Err(err) = self.autosave.save(form, data).await {
            log_warn!("Autosave of {form} failed: {err:#}");
        }

        let result = match calculate(form, data, &self.backend).await {
            Ok(result) => result,
            Err(err) => {
                self.notifier.error(&format!("Błąd obliczeń: {err}"));
                return Err(err.into());
            }
        };
        let kit = recommend_kit(
            result.calculated_power,
            &KitOptions::from_form(data, self.settings.vat_rate),
        );

        if token.is_cancelled() {
            log_info!("Discarding {form} result: view changed during calculation");
            return Err(FlowError::Cancelled);
        }

        self.state
            .update(submission_fields(form, data, &result, &kit))
            .await?;
        self.navigate_to(Route::Results).await;

        self.notifier.success(&format!(
            "Obliczenia zakończone: {} kW, {}",
            result.calculated_power,
            kit.kit_label()
        ));
        Ok(SubmitOutcome { form, result, kit })
    }

    /// The last autosaved values for `form`, if any.
    pub async fn restore_form(&self, form: FormId) -> Option<FormData> {
        match self.autosave.load(form).await {
            Ok(data) => data,
            Err(err) => {
                log_warn!("Failed to restore {form}: {err:#}");
                None
            }
        }
    }

    pub async fn analyze(&self, file: PdfFile) -> Result<AnalysisReport, AnalysisError> {
        let token = self.flow_token();
        self.notifier.info("Analizuję projekt...");

        match self
            .analyzer
            .analyze(&self.backend, &self.state, file, &token)
            .await
        {
            Ok(report) => {
                self.notifier.success("Analiza projektu zakończona");
                Ok(report)
            }
            Err(AnalysisError::Cancelled) => {
                self.notifier.warning("Analiza została anulowana");
                Err(AnalysisError::Cancelled)
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err)
            }
        }
    }

    pub fn recommend(&self, power_kw: f64, options: &KitOptions) -> KitRecommendation {
        recommend_kit(power_kw, options)
    }

    pub async fn send_offer_email(&self, to: &str) -> Result<String, OfferError> {
        match offer::send_offer_email(&self.backend, &self.state, to, None).await {
            Ok(message) => {
                self.notifier.success(&message);
                Ok(message)
            }
            Err(err) => {
                self.notifier.error(&format!("Błąd wysyłania emaila: {err}"));
                Err(err)
            }
        }
    }

    pub async fn generate_offer_document(&self) -> Result<String, OfferError> {
        match offer::generate_offer_document(&self.backend, &self.state).await {
            Ok(html) => {
                self.notifier.success("Oferta wygenerowana");
                Ok(html)
            }
            Err(err) => {
                self.notifier.error(&err.to_string());
                Err(err)
            }
        }
    }
}

/// Everything a finished submission writes, as one update.
fn submission_fields(
    form: FormId,
    data: &FormData,
    result: &CalculationResult,
    kit: &KitRecommendation,
) -> Value {
    let mut fields = Map::new();
    fields.insert("currentMode".into(), json!(form.route().as_str()));
    fields.insert(
        "powierzchnia".into(),
        json!(result
            .area
            .or_else(|| data.number_any(&["heated_area", "project_area", "audit_area"]))),
    );
    if let Some(eu) = result.eu_index {
        fields.insert("eu".into(), json!(eu));
    }
    fields.insert("mocSzacowana".into(), json!(result.calculated_power));
    if result.method == CalculationMethod::FullCalculator {
        fields.insert("mocObliczona".into(), json!(result.calculated_power));
    }
    if let Value::Object(kit_fields) = kit.state_fields() {
        fields.extend(kit_fields);
    }
    for key in ["email", "phone", "name"] {
        if let Some(value) = data.text(key) {
            fields.insert(key.into(), json!(value));
        }
    }
    fields.insert("calculationResult".into(), json!(result));
    fields.insert("calculationComplete".into(), json!(true));
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeBackend;
    use crate::notify::{Level, RecordingNotifier};

    fn app() -> (QuoteApp<FakeBackend>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let app = QuoteApp::new(
            FakeBackend::default(),
            StateStore::detached(),
            Database::open_in_memory().unwrap(),
            ClientSettings::default(),
            notifier.clone(),
        );
        (app, notifier)
    }

    fn mode2_form() -> FormData {
        FormData::from_pairs([
            ("postal_code", "31-000"),
            ("building_type", "dom"),
            ("heat_pump_purpose", "heating"),
            ("heated_area", "100"),
            ("eu_index", "70"),
        ])
    }

    #[tokio::test]
    async fn submit_commits_and_shows_results() {
        let (app, notifier) = app();
        app.navigate("tryb2").await;

        let outcome = app.submit(FormId::Mode2, &mode2_form()).await.unwrap();

        assert_eq!(outcome.result.calculated_power, 7.8);
        let state = app.state().get_all();
        assert!(state.calculation_complete);
        assert_eq!(state.estimated_power, Some(7.8));
        assert_eq!(state.kit.as_deref(), Some("Panasonic Monoblock 8kW"));
        assert_eq!(state.heated_area, Some(100.0));
        assert_eq!(app.current_route(), Some(Route::Results));
        assert_eq!(app.visible_sections(), vec![Route::Results]);
        assert_eq!(notifier.count(Level::Success), 1);

        let restored = app.restore_form(FormId::Mode2).await.unwrap();
        assert_eq!(restored, mode2_form());
    }

    #[tokio::test]
    async fn invalid_form_changes_nothing() {
        let (app, notifier) = app();
        let data = FormData::from_pairs([("heated_area", "5")]);

        let err = app.submit(FormId::Mode1, &data).await.unwrap_err();

        let FlowError::Invalid(validation) = err else {
            panic!("expected validation failure");
        };
        assert!(validation.error_for("postal_code").is_some());
        assert!(validation.error_for("heated_area").is_some());
        assert!(!app.state().is_calculation_complete());
        assert_eq!(app.restore_form(FormId::Mode1).await, None);
        assert_eq!(notifier.count(Level::Error), 1);
    }

    #[tokio::test]
    async fn navigation_cancels_the_flow_token() {
        let (app, _) = app();
        let token = app.flow_token();

        assert!(app.navigate("mode3").await);
        assert!(token.is_cancelled());
        assert!(!app.flow_token().is_cancelled());
        assert_eq!(app.state().get("currentMode"), Some(json!("mode3")));
    }

    #[tokio::test]
    async fn unknown_route_is_ignored() {
        let (app, _) = app();
        app.navigate("mode1").await;
        let token = app.flow_token();

        assert!(!app.navigate("settings").await);
        assert!(!token.is_cancelled());
        assert_eq!(app.current_route(), Some(Route::Mode1));
    }

    #[tokio::test]
    async fn back_returns_to_previous_section() {
        let (app, _) = app();
        app.navigate("mode1").await;
        app.navigate("mode4").await;

        assert_eq!(app.go_back().await, Route::Mode1);
        assert_eq!(app.state().get("currentMode"), Some(json!("mode1")));
    }

    #[tokio::test]
    async fn router_starts_on_stored_route() {
        let state = StateStore::detached();
        state.set("currentMode", "mode4").await.unwrap();
        let app = QuoteApp::new(
            FakeBackend::default(),
            state,
            Database::open_in_memory().unwrap(),
            ClientSettings::default(),
            Arc::new(RecordingNotifier::default()),
        );
        assert_eq!(app.current_route(), Some(Route::Mode4));
        assert_eq!(app.query_string(), "?mode=mode4");
    }

    #[tokio::test]
    async fn mode1_records_calculated_power() {
        let (app, _) = app();
        let data = FormData::from_pairs([
            ("postal_code", "00-950"),
            ("building_type", "dom"),
            ("heated_area", "150"),
        ]);

        app.submit(FormId::Mode1, &data).await.unwrap();

        let state = app.state().get_all();
        // 150 m² at the fake calculator's 0.06 kW/m².
        assert_eq!(state.estimated_power, Some(9.0));
        assert_eq!(state.calculated_power, Some(9.0));
    }
}
