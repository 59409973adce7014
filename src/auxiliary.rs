//! Auxiliary "jump to related chapter" row.

use quick_xml::escape::escape;

use crate::config::{AuxButton, AuxRowConfig};
use crate::registry::{file_name, AuxEligibility};

const CONTAINER_STYLE: &str =
    "display:flex;flex-direction:column;align-items:center;margin:0 0 0.5em 0";
const INDICATOR_STYLE: &str =
    "font-size:2.2em;line-height:1;margin-bottom:0.1em;color:var(--primary-color);";
const BUTTONS_STYLE: &str = "display:flex;gap:1.2em;justify-content:center;";
const INDICATOR_ANIMATION: &str = "animation:fadeInDown 0.7s;";
const BUTTONS_ANIMATION: &str = "animation:fadeInDown 0.7s 0.08s both;";

/// A built row, ready to be inserted after the navigation bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuxRow {
    pub container_id: String,
    pub container_class: String,
    pub container_style: String,
    /// Inner markup: indicator followed by the button group.
    pub inner_html: String,
    /// Buttons in display order.
    pub buttons: Vec<AuxButton>,
    /// Whether the row plays its own entrance animation.
    pub animated: bool,
}

impl AuxRow {
    /// Complete markup including the container element.
    pub fn outer_html(&self) -> String {
        format!(
            "<div id=\"{}\" class=\"{}\" style=\"{}\">{}</div>",
            escape(self.container_id.as_str()),
            escape(self.container_class.as_str()),
            escape(self.container_style.as_str()),
            self.inner_html
        )
    }
}

/// Decides when the row appears and builds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuxRowBuilder {
    cfg: AuxRowConfig,
    eligibility: AuxEligibility,
}

impl AuxRowBuilder {
    pub fn new(cfg: &AuxRowConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            eligibility: AuxEligibility::from_config(cfg),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.cfg.container_id
    }

    pub fn buttons(&self) -> &[AuxButton] {
        &self.cfg.buttons
    }

    pub fn button(&self, id: &str) -> Option<&AuxButton> {
        self.cfg.buttons.iter().find(|b| b.id == id)
    }

    /// Whether a completed load of `path` shows the row.
    pub fn shows_for(&self, path: &str) -> bool {
        self.eligibility.shows_row(path)
    }

    /// Button whose target is the host page itself, if any.
    pub fn button_for_page(&self, page_path: Option<&str>) -> Option<&AuxButton> {
        let current = file_name(page_path?);
        if current.is_empty() {
            return None;
        }
        self.cfg.buttons.iter().find(|b| b.target == current)
    }

    pub fn build(&self, path: &str) -> AuxRow {
        let animated = self.eligibility.animates_row(path);
        let (indicator_anim, buttons_anim) = if animated {
            (INDICATOR_ANIMATION, BUTTONS_ANIMATION)
        } else {
            ("", "")
        };
        let mut buttons_html = String::with_capacity(64 * self.cfg.buttons.len());
        for button in &self.cfg.buttons {
            buttons_html.push_str(&format!(
                "<button id=\"{}\" class=\"{}\">{}</button>",
                escape(button.id.as_str()),
                escape(self.cfg.button_class.as_str()),
                escape(button.label.as_str())
            ));
        }
        let inner_html = format!(
            "<div style=\"{}{}\">{}</div><div style=\"{}{}\">{}</div>",
            INDICATOR_STYLE,
            indicator_anim,
            escape(self.cfg.indicator.as_str()),
            BUTTONS_STYLE,
            buttons_anim,
            buttons_html
        );
        AuxRow {
            container_id: self.cfg.container_id.clone(),
            container_class: self.cfg.container_class.clone(),
            container_style: CONTAINER_STYLE.to_string(),
            inner_html,
            buttons: self.cfg.buttons.clone(),
            animated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> AuxRowBuilder {
        AuxRowBuilder::new(&AuxRowConfig::default())
    }

    #[test]
    fn shows_only_for_configured_fragments() {
        let b = builder();
        assert!(b.shows_for("articles/涅波絲經.html"));
        assert!(b.shows_for("articles/涅波絲經有聲書.html"));
        assert!(!b.shows_for("articles/涅波史記.html"));
        assert!(!b.shows_for("articles/涅波教聞.html"));
    }

    #[test]
    fn row_lists_buttons_in_order() {
        let row = builder().build("articles/涅波絲經.html");
        let labels: Vec<&str> = row.buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["有聲書", "英文版"]);
        let audio = row.inner_html.find("np-audio-btn").expect("audio button");
        let english = row.inner_html.find("np-en-btn").expect("english button");
        assert!(audio < english);
        assert!(row.inner_html.contains("↓"));
    }

    #[test]
    fn only_main_chapter_animates_the_row() {
        let b = builder();
        let main = b.build("articles/涅波絲經.html");
        assert!(main.animated);
        assert!(main.inner_html.contains("fadeInDown"));
        let english = b.build("articles/涅波絲經英文版.html");
        assert!(!english.animated);
        assert!(!english.inner_html.contains("fadeInDown"));
    }

    #[test]
    fn page_filename_selects_matching_button() {
        let b = builder();
        let hit = b.button_for_page(Some("/site/涅波絲經英文版.html"));
        assert_eq!(hit.map(|b| b.id.as_str()), Some("np-en-btn"));
        assert!(b.button_for_page(Some("/site/index.html")).is_none());
        assert!(b.button_for_page(Some("/")).is_none());
        assert!(b.button_for_page(None).is_none());
    }

    #[test]
    fn outer_html_wraps_container() {
        let row = builder().build("articles/涅波絲經.html");
        let html = row.outer_html();
        assert!(html.starts_with("<div id=\"np-extra-action-real\" class=\"extra-actions-container\""));
        assert!(html.ends_with("</button></div></div>"));
    }
}
