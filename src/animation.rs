//! Entrance animations: one-shot scroll reveal and timed cheer images.

use quick_xml::escape::escape;

use crate::config::{ResourceConfig, UiConfig};
use crate::state::LoadTicket;

/// Per-section reveal progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealState {
    /// Not registered for the current render.
    Unobserved,
    /// Registered and waiting to become visible.
    Observed,
    /// Marked visible and deregistered. Terminal.
    Revealed,
}

/// What the host should do with an intersection report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealAction {
    /// Nothing changes.
    Ignore,
    /// Add the visible class and stop observing the element.
    Reveal,
}

/// Reveal bookkeeping for the sections of one render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrollReveal {
    ticket: Option<LoadTicket>,
    states: Vec<RevealState>,
}

impl ScrollReveal {
    /// Start tracking `count` freshly rendered sections, discarding the
    /// previous render's elements.
    pub fn register(&mut self, ticket: LoadTicket, count: usize) {
        self.ticket = Some(ticket);
        self.states.clear();
        self.states.resize(count, RevealState::Observed);
    }

    /// Forget every tracked element.
    pub fn clear(&mut self) {
        self.ticket = None;
        self.states.clear();
    }

    pub fn state(&self, ticket: LoadTicket, index: usize) -> RevealState {
        if self.ticket != Some(ticket) {
            return RevealState::Unobserved;
        }
        self.states
            .get(index)
            .copied()
            .unwrap_or(RevealState::Unobserved)
    }

    /// Apply one intersection report. Reveals at most once per element.
    pub fn on_intersection(
        &mut self,
        ticket: LoadTicket,
        index: usize,
        is_intersecting: bool,
    ) -> RevealAction {
        if self.ticket != Some(ticket) || !is_intersecting {
            return RevealAction::Ignore;
        }
        match self.states.get_mut(index) {
            Some(state @ RevealState::Observed) => {
                *state = RevealState::Revealed;
                RevealAction::Reveal
            }
            _ => RevealAction::Ignore,
        }
    }

    /// Elements still waiting to become visible.
    pub fn pending(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == RevealState::Observed)
            .count()
    }
}

/// Image swapped into every cheer placeholder, and its delayed reveal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheerPlan {
    /// Class identifying placeholders.
    pub placeholder_class: String,
    pub src: String,
    pub alt: String,
    /// Inline style applied when the image is created.
    pub hidden_style: String,
    /// Style properties set once the delay elapses.
    pub shown: Vec<(String, String)>,
    pub delay_ms: u32,
}

impl CheerPlan {
    pub fn from_config(ui: &UiConfig, resources: &ResourceConfig) -> Self {
        Self {
            placeholder_class: ui.cheer_class.clone(),
            src: resources.cheer_image.clone(),
            alt: ui.cheer_alt.clone(),
            hidden_style: concat!(
                "height: 1.5em; vertical-align: -0.2em; opacity: 0; ",
                "transform: scale(0.7); transition: opacity 0.3s, transform 0.3s;"
            )
            .to_string(),
            shown: vec![
                ("opacity".to_string(), "1".to_string()),
                ("transform".to_string(), "scale(1)".to_string()),
            ],
            delay_ms: ui.cheer_delay_ms,
        }
    }

    /// Markup of the freshly created, still hidden image.
    pub fn image_html(&self) -> String {
        format!(
            "<img src=\"{}\" alt=\"{}\" style=\"{}\">",
            escape(self.src.as_str()),
            escape(self.alt.as_str()),
            escape(self.hidden_style.as_str())
        )
    }
}

/// A scheduled cheer reveal, owned by the host until its timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheerTimer {
    pub ticket: LoadTicket,
    /// Placeholder index in document order.
    pub index: usize,
    pub delay_ms: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ViewState;

    fn tickets() -> (LoadTicket, LoadTicket) {
        let mut state = ViewState::new();
        (state.issue("a"), state.issue("b"))
    }

    #[test]
    fn reveal_is_one_shot() {
        let (ticket, _) = tickets();
        let mut reveal = ScrollReveal::default();
        reveal.register(ticket, 2);
        assert_eq!(reveal.state(ticket, 0), RevealState::Observed);
        assert_eq!(reveal.on_intersection(ticket, 0, true), RevealAction::Reveal);
        assert_eq!(reveal.on_intersection(ticket, 0, true), RevealAction::Ignore);
        assert_eq!(reveal.state(ticket, 0), RevealState::Revealed);
        assert_eq!(reveal.pending(), 1);
    }

    #[test]
    fn leaving_the_viewport_does_not_unreveal() {
        let (ticket, _) = tickets();
        let mut reveal = ScrollReveal::default();
        reveal.register(ticket, 1);
        assert_eq!(reveal.on_intersection(ticket, 0, false), RevealAction::Ignore);
        assert_eq!(reveal.state(ticket, 0), RevealState::Observed);
        reveal.on_intersection(ticket, 0, true);
        reveal.on_intersection(ticket, 0, false);
        assert_eq!(reveal.state(ticket, 0), RevealState::Revealed);
    }

    #[test]
    fn reports_for_replaced_render_are_ignored() {
        let (old, new) = tickets();
        let mut reveal = ScrollReveal::default();
        reveal.register(old, 1);
        reveal.register(new, 1);
        assert_eq!(reveal.on_intersection(old, 0, true), RevealAction::Ignore);
        assert_eq!(reveal.state(old, 0), RevealState::Unobserved);
        assert_eq!(reveal.state(new, 0), RevealState::Observed);
    }

    #[test]
    fn out_of_range_index_is_unobserved() {
        let (ticket, _) = tickets();
        let mut reveal = ScrollReveal::default();
        reveal.register(ticket, 1);
        assert_eq!(reveal.state(ticket, 5), RevealState::Unobserved);
        assert_eq!(reveal.on_intersection(ticket, 5, true), RevealAction::Ignore);
    }

    #[test]
    fn cheer_image_starts_hidden() {
        let plan = CheerPlan::from_config(&UiConfig::default(), &ResourceConfig::default());
        let html = plan.image_html();
        assert!(html.starts_with("<img src=\"../Cheer-Gift/Cheer 10000.webp\" alt=\"小奇點\""));
        assert!(html.contains("opacity: 0;"));
        assert!(html.contains("scale(0.7)"));
        assert_eq!(plan.delay_ms, 120);
    }
}
