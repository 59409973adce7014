//! Tab bar discovery and fragment path derivation.
//!
//! The page shell carries the tab controls:
//!
//! ```html
//! <nav class="tabs">
//!   <button data-article="涅波絲經.html" class="active">涅波絲經</button>
//!   <button data-article="涅波史記.html">涅波史記</button>
//! </nav>
//! ```
//!
//! The browser host reads them straight from the live document; everything
//! else (headless runs, `site-preview --check`) parses the shell file:
//!
//! ```rust
//! use article_viewer::navigation::{parse_tab_bar, NavigationLimits};
//! use article_viewer::ViewerConfig;
//!
//! # fn example() -> Result<(), article_viewer::ViewerError> {
//! let shell = br#"<nav class="tabs"><button data-article="a.html">A</button></nav>"#;
//! let bar = parse_tab_bar(shell, &ViewerConfig::default(), NavigationLimits::default())?;
//! assert_eq!(bar.tabs[0].target, "a.html");
//! # Ok(())
//! # }
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::config::{SelectorConfig, ViewerConfig};
use crate::error::ViewerError;
use crate::markup::is_void;

/// Limits for tab bar parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationLimits {
    /// Maximum number of tab controls.
    pub max_tabs: usize,
    /// Maximum UTF-8 byte length for labels.
    pub max_label_bytes: usize,
    /// Maximum UTF-8 byte length for target attribute values.
    pub max_target_bytes: usize,
}

impl Default for NavigationLimits {
    fn default() -> Self {
        Self {
            max_tabs: 64,
            max_label_bytes: 1024,
            max_target_bytes: 1024,
        }
    }
}

/// A single tab control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabSpec {
    /// Position among the tab controls, in document order.
    pub index: usize,
    /// Visible label text.
    pub label: String,
    /// Raw value of the target attribute (empty if absent).
    pub target: String,
}

/// Tab controls found in the page shell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabBar {
    pub tabs: Vec<TabSpec>,
    /// Index of the tab marked active in the shell markup, if any.
    pub initially_active: Option<usize>,
}

impl TabBar {
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TabSpec> {
        self.tabs.get(index)
    }
}

/// Request path for a tab or button target.
///
/// The target is not validated; an unusable value simply fails to fetch.
pub fn fragment_path(articles_path: &str, target: &str) -> String {
    format!("{}{}", articles_path, target)
}

/// Partial tab being built during parsing
struct PartialTab {
    target: String,
    label: String,
    active: bool,
}

/// Parse the tab controls out of a page shell.
///
/// Tabs are found through `config.selectors`; a tab carrying
/// `config.ui.active_class` becomes [`TabBar::initially_active`].
pub fn parse_tab_bar(
    shell: &[u8],
    config: &ViewerConfig,
    limits: NavigationLimits,
) -> Result<TabBar, ViewerError> {
    let selectors = &config.selectors;
    let active_class = config.ui.active_class.as_str();
    let nav_class = selectors.nav_class().ok_or_else(|| {
        ViewerError::navigation(
            "NAV_SELECTOR",
            format!("navigation selector '{}' is not a plain class", selectors.nav),
        )
    })?;
    let mut reader = Reader::from_reader(shell);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut bar = TabBar::default();
    let mut buf = Vec::with_capacity(256);
    // Open elements inside the nav bar, the bar itself included.
    let mut nav_depth = 0usize;
    let mut current: Option<PartialTab> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if nav_depth == 0 {
                    if has_class(&reader, &e, nav_class) {
                        nav_depth = 1;
                    }
                } else if !is_void(e.local_name().as_ref()) {
                    nav_depth += 1;
                    if e.local_name().as_ref().eq_ignore_ascii_case(b"button") {
                        current = Some(start_tab(&reader, &e, selectors, active_class, limits)?);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if nav_depth > 0 && e.local_name().as_ref().eq_ignore_ascii_case(b"button") {
                    let tab = start_tab(&reader, &e, selectors, active_class, limits)?;
                    finish_tab(&mut bar, tab, limits)?;
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(tab) = current.as_mut() {
                    let text = reader.decoder().decode(&e).unwrap_or_default();
                    if !tab.label.is_empty() && !text.is_empty() {
                        tab.label.push(' ');
                    }
                    tab.label.push_str(text.as_ref());
                    if tab.label.len() > limits.max_label_bytes {
                        return Err(ViewerError::navigation(
                            "NAV_LIMIT",
                            format!(
                                "Tab label exceeds max_label_bytes ({} > {})",
                                tab.label.len(),
                                limits.max_label_bytes
                            ),
                        ));
                    }
                }
            }
            Ok(Event::End(e)) => {
                if nav_depth > 0 && !is_void(e.local_name().as_ref()) {
                    if e.local_name().as_ref().eq_ignore_ascii_case(b"button") {
                        if let Some(tab) = current.take() {
                            finish_tab(&mut bar, tab, limits)?;
                        }
                    }
                    nav_depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ViewerError::navigation(
                    "NAV_PARSE",
                    format!("Shell parse error: {:?}", e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(tab) = current.take() {
        finish_tab(&mut bar, tab, limits)?;
    }
    Ok(bar)
}

fn start_tab(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
    selectors: &SelectorConfig,
    active_class: &str,
    limits: NavigationLimits,
) -> Result<PartialTab, ViewerError> {
    let mut tab = PartialTab {
        target: String::new(),
        label: String::new(),
        active: false,
    };
    for attr in e.attributes().flatten() {
        let key = match reader.decoder().decode(attr.key.as_ref()) {
            Ok(v) => v.to_ascii_lowercase(),
            Err(_) => continue,
        };
        if key == selectors.tab_attribute {
            let value = reader
                .decoder()
                .decode(attr.value.as_ref())
                .unwrap_or_default();
            if value.len() > limits.max_target_bytes {
                return Err(ViewerError::navigation(
                    "NAV_LIMIT",
                    format!(
                        "Tab target exceeds max_target_bytes ({} > {})",
                        value.len(),
                        limits.max_target_bytes
                    ),
                ));
            }
            tab.target = value.into_owned();
        } else if key == "class" {
            let value = reader.decoder().decode(&attr.value).unwrap_or_default();
            tab.active = value.split_ascii_whitespace().any(|c| c == active_class);
        }
    }
    Ok(tab)
}

fn finish_tab(
    bar: &mut TabBar,
    tab: PartialTab,
    limits: NavigationLimits,
) -> Result<(), ViewerError> {
    if bar.tabs.len() >= limits.max_tabs {
        return Err(ViewerError::navigation(
            "NAV_LIMIT",
            format!("Tab count exceeds max_tabs ({})", limits.max_tabs),
        ));
    }
    if tab.target.is_empty() {
        log::warn!("tab '{}' has no target attribute", tab.label);
    }
    let index = bar.tabs.len();
    if tab.active && bar.initially_active.is_none() {
        bar.initially_active = Some(index);
    }
    bar.tabs.push(TabSpec {
        index,
        label: tab.label,
        target: tab.target,
    });
    Ok(())
}

fn has_class(reader: &Reader<&[u8]>, e: &BytesStart<'_>, class: &str) -> bool {
    e.attributes().flatten().any(|attr| {
        attr.key.as_ref() == b"class"
            && reader
                .decoder()
                .decode(&attr.value)
                .is_ok_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHELL: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>涅波</title></head>
<body>
  <h1 id="main-title">涅波</h1>
  <nav class="tabs">
    <button data-article="涅波絲經.html">涅波絲經</button>
    <button data-article="涅波史記.html" class="active"><img src="Emoji/a.png"> 涅波史記</button>
    <button data-article="涅波教聞.html">涅波教聞</button>
  </nav>
  <button data-article="outside.html">Outside</button>
  <div id="article-container"></div>
</body>
</html>"#;

    fn parse(shell: &str) -> Result<TabBar, ViewerError> {
        parse_tab_bar(
            shell.as_bytes(),
            &ViewerConfig::default(),
            NavigationLimits::default(),
        )
    }

    #[test]
    fn finds_tabs_inside_nav_only() {
        let bar = parse(SHELL).expect("shell should parse");
        let targets: Vec<&str> = bar.tabs.iter().map(|t| t.target.as_str()).collect();
        assert_eq!(targets, ["涅波絲經.html", "涅波史記.html", "涅波教聞.html"]);
        assert_eq!(bar.tabs[1].label, "涅波史記");
        assert_eq!(bar.tabs[2].index, 2);
    }

    #[test]
    fn records_initially_active_tab() {
        let bar = parse(SHELL).expect("shell should parse");
        assert_eq!(bar.initially_active, Some(1));
    }

    #[test]
    fn missing_target_yields_empty_string() {
        let bar = parse(r#"<div class="tabs"><button>none</button></div>"#).expect("parse");
        assert_eq!(bar.len(), 1);
        assert_eq!(bar.tabs[0].target, "");
        assert_eq!(fragment_path("articles/", &bar.tabs[0].target), "articles/");
    }

    #[test]
    fn tab_limit_is_enforced() {
        let shell = r#"<nav class="tabs"><button data-article="a">a</button><button data-article="b">b</button></nav>"#;
        let limits = NavigationLimits {
            max_tabs: 1,
            ..NavigationLimits::default()
        };
        let err = parse_tab_bar(shell.as_bytes(), &ViewerConfig::default(), limits)
            .expect_err("limit should trip");
        assert_eq!(err.code, "NAV_LIMIT");
    }

    #[test]
    fn complex_nav_selector_is_rejected() {
        let mut config = ViewerConfig::default();
        config.selectors.nav = "nav > .tabs".to_string();
        let err = parse_tab_bar(SHELL.as_bytes(), &config, NavigationLimits::default())
            .expect_err("selector unsupported");
        assert_eq!(err.code, "NAV_SELECTOR");
    }

    #[test]
    fn initially_active_follows_configured_class() {
        let shell = r#"<nav class="tabs"><button data-article="a" class="active">a</button><button data-article="b" class="current">b</button></nav>"#;
        let mut config = ViewerConfig::default();
        config.ui.active_class = "current".to_string();
        let bar = parse_tab_bar(shell.as_bytes(), &config, NavigationLimits::default())
            .expect("shell should parse");
        assert_eq!(bar.initially_active, Some(1));
    }

    #[test]
    fn fragment_path_concatenates_prefix() {
        assert_eq!(
            fragment_path("articles/", "涅波絲經.html"),
            "articles/涅波絲經.html"
        );
    }
}
