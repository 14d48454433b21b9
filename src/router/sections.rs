use std::collections::BTreeMap;

use super::Route;

/// What the router needs from whatever actually displays the sections.
pub trait SectionView {
    fn hide_all(&mut self);
    fn show(&mut self, route: Route);
    fn scroll_to(&mut self, _route: Route) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionState {
    pub hidden: bool,
    pub active: bool,
}

impl Default for SectionState {
    fn default() -> Self {
        Self {
            hidden: true,
            active: false,
        }
    }
}

/// In-memory stand-in for the page's sections.
#[derive(Debug, Clone)]
pub struct SectionRegistry {
    sections: BTreeMap<Route, SectionState>,
    scrolled_to: Option<Route>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self {
            sections: Route::ALL
                .iter()
                .map(|route| (*route, SectionState::default()))
                .collect(),
            scrolled_to: None,
        }
    }

    pub fn state(&self, route: Route) -> SectionState {
        self.sections.get(&route).copied().unwrap_or_default()
    }

    pub fn visible(&self) -> Vec<Route> {
        self.sections
            .iter()
            .filter(|(_, state)| !state.hidden && state.active)
            .map(|(route, _)| *route)
            .collect()
    }

    pub fn scrolled_to(&self) -> Option<Route> {
        self.scrolled_to
    }
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionView for SectionRegistry {
    fn hide_all(&mut self) {
        for state in self.sections.values_mut() {
            state.hidden = true;
            state.active = false;
        }
    }

    fn show(&mut self, route: Route) {
        let state = self.sections.entry(route).or_default();
        state.hidden = false;
        state.active = true;
    }

    fn scroll_to(&mut self, route: Route) {
        self.scrolled_to = Some(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fully_hidden() {
        let registry = SectionRegistry::new();
        assert!(registry.visible().is_empty());
        assert!(registry.state(Route::Results).hidden);
    }

    #[test]
    fn default_registers_every_section() {
        let registry = SectionRegistry::default();
        for route in Route::ALL {
            assert!(registry.sections.contains_key(&route));
        }
        assert!(registry.visible().is_empty());
    }

    #[test]
    fn show_without_hide_would_leave_two_visible() {
        let mut registry = SectionRegistry::new();
        registry.show(Route::Mode1);
        registry.show(Route::Mode2);
        assert_eq!(registry.visible().len(), 2);

        registry.hide_all();
        registry.show(Route::Mode2);
        assert_eq!(registry.visible(), vec![Route::Mode2]);
    }
}
