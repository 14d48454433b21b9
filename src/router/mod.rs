//! Mode switching: which section of the quote form is on screen.
//!
//! Entering a route always hides every section first and then shows the
//! target, so at most one section is visible even if a previous transition
//! was interrupted halfway.

pub mod sections;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{log_debug, log_warn};

pub use sections::{SectionRegistry, SectionState, SectionView};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase", try_from = "StoredRoute")]
pub enum Route {
    Welcome,
    /// Full calculator.
    Mode1,
    /// AI analysis of a project PDF.
    Mode2,
    /// Modernization from an energy audit.
    Mode3,
    /// Power already known.
    Mode4,
    Results,
}

/// `currentMode` has been stored both as a name and as a bare mode number.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRoute {
    Name(String),
    Number(u64),
}

impl TryFrom<StoredRoute> for Route {
    type Error = UnknownRoute;

    fn try_from(stored: StoredRoute) -> Result<Self, Self::Error> {
        match stored {
            StoredRoute::Name(name) => name.parse(),
            StoredRoute::Number(number) => number.to_string().parse(),
        }
    }
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Welcome,
        Route::Mode1,
        Route::Mode2,
        Route::Mode3,
        Route::Mode4,
        Route::Results,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Welcome => "welcome",
            Route::Mode1 => "mode1",
            Route::Mode2 => "mode2",
            Route::Mode3 => "mode3",
            Route::Mode4 => "mode4",
            Route::Results => "results",
        }
    }

    /// DOM id of the section the route shows.
    pub fn section_id(&self) -> &'static str {
        match self {
            Route::Welcome => "welcome-screen",
            Route::Mode1 => "heatCalcFormFull",
            Route::Mode2 => "heatCalcMode2",
            Route::Mode3 => "form-mode3",
            Route::Mode4 => "form-mode4",
            Route::Results => "calcResultsSection",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Welcome => "Wybierz sposób doboru pompy",
            Route::Mode1 => "Pełny kalkulator",
            Route::Mode2 => "Analiza projektu PDF z AI",
            Route::Mode3 => "Modernizacja - audyt energetyczny",
            Route::Mode4 => "Znam moc pompy",
            Route::Results => "Wyniki",
        }
    }

    pub fn is_mode(&self) -> bool {
        matches!(self, Route::Mode1 | Route::Mode2 | Route::Mode3 | Route::Mode4)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoute(pub String);

impl fmt::Display for UnknownRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route not found: {}", self.0)
    }
}

impl std::error::Error for UnknownRoute {}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "welcome" => Ok(Route::Welcome),
            "mode1" | "tryb1" | "1" => Ok(Route::Mode1),
            "mode2" | "tryb2" | "2" => Ok(Route::Mode2),
            "mode3" | "tryb3" | "3" => Ok(Route::Mode3),
            "mode4" | "tryb4" | "4" => Ok(Route::Mode4),
            "results" => Ok(Route::Results),
            _ => Err(UnknownRoute(value.to_string())),
        }
    }
}

/// Looks up one parameter of a `?a=b&c=d` query string.
pub fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub struct Router<V: SectionView> {
    view: V,
    current: Option<Route>,
    history: Vec<Route>,
}

impl<V: SectionView> Router<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            current: None,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<Route> {
        self.current
    }

    pub fn history(&self) -> &[Route] {
        &self.history
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Navigates by name; unknown names are rejected without touching the view.
    pub fn navigate(&mut self, name: &str) -> bool {
        match name.parse::<Route>() {
            Ok(route) => {
                self.navigate_to(route);
                true
            }
            Err(err) => {
                log_warn!("{err}");
                false
            }
        }
    }

    pub fn navigate_to(&mut self, route: Route) {
        log_debug!("Navigating to: {route}");

        if let Some(current) = self.current {
            if current != route {
                self.history.push(current);
            }
        }

        self.show(route);
    }

    /// Pops the most recent route, or goes to `welcome` when history is empty.
    pub fn go_back(&mut self) -> Route {
        let target = self.history.pop().unwrap_or(Route::Welcome);
        log_debug!("Going back to: {target}");
        self.show(target);
        target
    }

    /// Browser back/forward: the browser already owns this history entry.
    pub fn pop_state(&mut self, route: Route) {
        self.show(route);
    }

    /// Restores the view a reload with `?mode=X` should show.
    pub fn init_from_query(&mut self, query: &str) -> Route {
        let route = query_param(query, "mode")
            .and_then(|mode| mode.parse::<Route>().ok())
            .unwrap_or(Route::Welcome);
        self.navigate_to(route);
        route
    }

    /// Address-bar mirror of the current route.
    pub fn query_string(&self) -> String {
        match self.current {
            Some(route) => format!("?mode={route}"),
            None => String::new(),
        }
    }

    fn show(&mut self, route: Route) {
        self.view.hide_all();
        self.view.show(route);
        self.view.scroll_to(route);
        self.current = Some(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<SectionRegistry> {
        Router::new(SectionRegistry::new())
    }

    #[test]
    fn exactly_one_section_visible_after_every_navigation() {
        let mut router = router();
        for route in Route::ALL.iter().chain(Route::ALL.iter().rev()) {
            router.navigate_to(*route);
            assert_eq!(router.view().visible(), vec![*route]);
        }
    }

    #[test]
    fn back_pops_history_then_defaults_to_welcome() {
        let mut router = router();
        router.navigate_to(Route::Welcome);
        router.navigate_to(Route::Mode2);
        router.navigate_to(Route::Results);

        assert_eq!(router.go_back(), Route::Mode2);
        assert_eq!(router.go_back(), Route::Welcome);
        assert_eq!(router.go_back(), Route::Welcome);
        assert_eq!(router.view().visible(), vec![Route::Welcome]);
    }

    #[test]
    fn repeated_navigation_does_not_grow_history() {
        let mut router = router();
        router.navigate_to(Route::Mode3);
        router.navigate_to(Route::Mode3);
        assert!(router.history().is_empty());
    }

    #[test]
    fn unknown_route_leaves_view_untouched() {
        let mut router = router();
        router.navigate_to(Route::Mode1);
        assert!(!router.navigate("tryb9"));
        assert_eq!(router.current(), Some(Route::Mode1));
        assert!(router.navigate("tryb4"));
        assert_eq!(router.current(), Some(Route::Mode4));
    }

    #[test]
    fn query_round_trip() {
        let mut router = router();
        assert_eq!(router.init_from_query("?dev=true&mode=mode3"), Route::Mode3);
        assert_eq!(router.query_string(), "?mode=mode3");

        let mut fresh = super::Router::new(SectionRegistry::new());
        assert_eq!(fresh.init_from_query("?mode=bogus"), Route::Welcome);
        assert_eq!(query_param("?dev=true&mode=mode3", "dev"), Some("true"));
        assert_eq!(query_param("", "mode"), None);
    }

    #[test]
    fn stored_mode_accepts_names_and_numbers() {
        let parsed: Vec<Route> =
            serde_json::from_str(r#"["tryb1", "mode3", 4, "results"]"#).unwrap();
        assert_eq!(parsed, vec![Route::Mode1, Route::Mode3, Route::Mode4, Route::Results]);
        assert!(serde_json::from_str::<Route>("7").is_err());
        assert_eq!(serde_json::to_string(&Route::Mode2).unwrap(), r#""mode2""#);
    }

    #[test]
    fn pop_state_skips_history() {
        let mut router = router();
        router.navigate_to(Route::Mode1);
        router.pop_state(Route::Welcome);
        assert!(router.history().is_empty());
        assert_eq!(router.current(), Some(Route::Welcome));
    }
}
