//! Viewer configuration: chapter registry source, UI strings, auxiliary row,
//! selectors and resource paths.
//!
//! Every struct is `#[serde(default)]`, so a JSON file only has to name the
//! fields it overrides:
//!
//! ```rust
//! use article_viewer::ViewerConfig;
//!
//! # fn example() -> Result<(), article_viewer::ViewerError> {
//! let cfg = ViewerConfig::from_json_str(r#"{ "chapters": { "default_title": "Site" } }"#)?;
//! assert_eq!(cfg.chapters.default_title, "Site");
//! assert_eq!(cfg.chapters.articles_path, "articles/");
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorPhase, ViewerError};
use crate::registry::FragmentFlags;

const MAIN_CHAPTER: &str = "涅波絲經.html";
const AUDIO_CHAPTER: &str = "涅波絲經有聲書.html";
const ENGLISH_CHAPTER: &str = "涅波絲經英文版.html";

/// Top-level viewer configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub chapters: ChapterConfig,
    pub ui: UiConfig,
    pub aux_row: AuxRowConfig,
    pub selectors: SelectorConfig,
    pub resources: ResourceConfig,
}

/// One registered fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChapterEntry {
    /// Fragment filename, matched against the last segment of a request path.
    pub file: String,
    /// Title shown while this fragment is rendered.
    pub title: String,
    /// Per-fragment render capabilities.
    #[serde(default)]
    pub flags: FragmentFlags,
}

impl ChapterEntry {
    fn new(file: &str, title: &str) -> Self {
        Self {
            file: file.to_string(),
            title: title.to_string(),
            flags: FragmentFlags::default(),
        }
    }
}

/// Chapter set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterConfig {
    /// Ordered chapter entries.
    pub entries: Vec<ChapterEntry>,
    /// Title used when a fragment has no entry.
    pub default_title: String,
    /// Directory prefix joined with tab/button targets. Must end with `/`.
    pub articles_path: String,
    /// Filenames that replay the container entrance animation on load.
    pub animated: Vec<String>,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        let mut audio = ChapterEntry::new(AUDIO_CHAPTER, "涅波絲經有聲書");
        audio.flags = FragmentFlags::self_contained();
        Self {
            entries: vec![
                ChapterEntry::new(MAIN_CHAPTER, "涅波絲經"),
                audio,
                ChapterEntry::new(ENGLISH_CHAPTER, "涅波絲經英文版"),
                ChapterEntry::new("涅波史記.html", "涅波史記"),
                ChapterEntry::new("涅波教聞.html", "涅波教聞"),
            ],
            default_title: "涅波".to_string(),
            articles_path: "articles/".to_string(),
            animated: vec![
                MAIN_CHAPTER.to_string(),
                AUDIO_CHAPTER.to_string(),
                ENGLISH_CHAPTER.to_string(),
            ],
        }
    }
}

/// Fixed UI strings, marker classes and animation tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub loading_text: String,
    pub error_text: String,
    pub placeholder_class: String,
    pub active_class: String,
    pub visible_class: String,
    /// Container class that plays the fade-in.
    pub animation_class: String,
    /// Intersection ratio at which a section counts as visible.
    pub threshold: f32,
    /// Class marking inline cheer placeholders.
    pub cheer_class: String,
    pub cheer_alt: String,
    pub cheer_delay_ms: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            loading_text: "載入中...".to_string(),
            error_text: "找不到檔案".to_string(),
            placeholder_class: "placeholder-text".to_string(),
            active_class: "active".to_string(),
            visible_class: "visible".to_string(),
            animation_class: "np-fadein".to_string(),
            threshold: 0.2,
            cheer_class: "cheer-animate".to_string(),
            cheer_alt: "小奇點".to_string(),
            cheer_delay_ms: 120,
        }
    }
}

/// A button in the auxiliary row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxButton {
    pub id: String,
    pub label: String,
    /// Fragment filename loaded when the button is clicked.
    pub target: String,
}

/// Auxiliary "jump to related chapter" row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxRowConfig {
    /// Fragments for which the row is shown.
    pub show_for: Vec<String>,
    /// Fragments for which the row plays its own entrance animation.
    pub animate_for: Vec<String>,
    pub buttons: Vec<AuxButton>,
    pub container_id: String,
    pub container_class: String,
    pub button_class: String,
    pub indicator: String,
}

impl Default for AuxRowConfig {
    fn default() -> Self {
        Self {
            show_for: vec![
                MAIN_CHAPTER.to_string(),
                AUDIO_CHAPTER.to_string(),
                ENGLISH_CHAPTER.to_string(),
            ],
            animate_for: vec![MAIN_CHAPTER.to_string()],
            buttons: vec![
                AuxButton {
                    id: "np-audio-btn".to_string(),
                    label: "有聲書".to_string(),
                    target: AUDIO_CHAPTER.to_string(),
                },
                AuxButton {
                    id: "np-en-btn".to_string(),
                    label: "英文版".to_string(),
                    target: ENGLISH_CHAPTER.to_string(),
                },
            ],
            container_id: "np-extra-action-real".to_string(),
            container_class: "extra-actions-container".to_string(),
            button_class: "extra-btn".to_string(),
            indicator: "↓".to_string(),
        }
    }
}

/// Selectors forming the contract with the page shell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub tabs: String,
    pub container: String,
    pub nav: String,
    pub main_title: String,
    /// Attribute on each tab naming the fragment to load.
    pub tab_attribute: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            tabs: ".tabs button".to_string(),
            container: "#article-container".to_string(),
            nav: ".tabs".to_string(),
            main_title: "#main-title".to_string(),
            tab_attribute: "data-article".to_string(),
        }
    }
}

impl SelectorConfig {
    /// Class name of the navigation bar when `nav` is a plain class selector.
    pub fn nav_class(&self) -> Option<&str> {
        let class = self.nav.strip_prefix('.')?;
        if class.is_empty() || class.contains([' ', '.', '#', '[']) {
            return None;
        }
        Some(class)
    }
}

/// Asset locations and the rewrite contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub error_image: String,
    pub cheer_image: String,
    /// Top-level asset directories whose references get `parent_marker` prepended.
    pub path_prefixes: Vec<String>,
    /// Shared stylesheet filename, also moved one directory up.
    pub stylesheet: String,
    pub parent_marker: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            error_image: "Emoji/NO SOURCE.png".to_string(),
            cheer_image: "../Cheer-Gift/Cheer 10000.webp".to_string(),
            path_prefixes: vec![
                "Person".to_string(),
                "Cheer-Gift".to_string(),
                "Emoji".to_string(),
            ],
            stylesheet: "style.css".to_string(),
            parent_marker: "../".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ViewerError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|err| {
            ViewerError::new(ErrorPhase::Config, "CONFIG_IO", err.to_string())
                .with_path(display.clone())
        })?;
        Self::from_json_str(&json).map_err(|err| err.with_path(display))
    }

    /// Reject configurations the viewer cannot run with.
    pub fn validate(&self) -> Result<(), ViewerError> {
        let articles_path = &self.chapters.articles_path;
        if !articles_path.is_empty() && !articles_path.ends_with('/') {
            return Err(ViewerError::config(
                "CONFIG_INVALID",
                format!("articles_path must end with '/' (got '{}')", articles_path),
            ));
        }
        if !(0.0..=1.0).contains(&self.ui.threshold) {
            return Err(ViewerError::config(
                "CONFIG_INVALID",
                format!("threshold must be within 0..=1 (got {})", self.ui.threshold),
            ));
        }
        if let Some(empty) = self.resources.path_prefixes.iter().position(|p| p.is_empty()) {
            return Err(ViewerError::config(
                "CONFIG_INVALID",
                format!("path_prefixes[{}] is empty", empty),
            ));
        }
        let mut ids = BTreeSet::new();
        for button in &self.aux_row.buttons {
            if button.id.is_empty() {
                return Err(ViewerError::config(
                    "CONFIG_INVALID",
                    format!("auxiliary button '{}' has an empty id", button.label),
                ));
            }
            if !ids.insert(button.id.as_str()) {
                return Err(ViewerError::config(
                    "CONFIG_INVALID",
                    format!("duplicate auxiliary button id '{}'", button.id),
                ));
            }
        }
        let mut files = BTreeSet::new();
        for entry in &self.chapters.entries {
            if !files.insert(entry.file.as_str()) {
                log::warn!("chapter '{}' registered twice; first entry wins", entry.file);
            }
        }
        Ok(())
    }
}
