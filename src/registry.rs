//! Chapter registry: titles, animation eligibility and per-fragment
//! capabilities, keyed by fragment filename.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::{AuxRowConfig, ChapterConfig};

/// Render capabilities attached to a registered fragment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentFlags {
    /// Inject the fragment without resource-path rewriting.
    pub skip_rewrite: bool,
    /// Leave the container entrance-animation class untouched.
    pub skip_animation: bool,
    /// Drop whitespace-only lines from the body before injecting.
    pub strip_blank_lines: bool,
}

impl FragmentFlags {
    /// Flags for fragments whose markup needs no host-side processing.
    pub fn self_contained() -> Self {
        Self {
            skip_rewrite: true,
            skip_animation: true,
            strip_blank_lines: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct RegistryEntry {
    title: String,
    flags: FragmentFlags,
}

/// Everything the render path needs to know about one request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentProfile<'a> {
    /// Last path segment of the request.
    pub file: &'a str,
    /// Registry title or the default title.
    pub title: &'a str,
    pub flags: FragmentFlags,
    /// Replay the container entrance animation after injecting.
    pub animated: bool,
    /// Whether a registry entry exists for `file`.
    pub known: bool,
}

/// Immutable lookup built once from [`ChapterConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterRegistry {
    order: Vec<String>,
    entries: BTreeMap<String, RegistryEntry>,
    // Independent of `entries`: an unregistered file may still animate.
    animated: BTreeSet<String>,
    default_title: String,
    articles_path: String,
}

impl ChapterRegistry {
    pub fn from_config(cfg: &ChapterConfig) -> Self {
        let mut order = Vec::with_capacity(cfg.entries.len());
        let mut entries = BTreeMap::new();
        for entry in &cfg.entries {
            if entries.contains_key(&entry.file) {
                continue;
            }
            order.push(entry.file.clone());
            entries.insert(
                entry.file.clone(),
                RegistryEntry {
                    title: entry.title.clone(),
                    flags: entry.flags,
                },
            );
        }
        Self {
            order,
            entries,
            animated: cfg.animated.iter().cloned().collect(),
            default_title: cfg.default_title.clone(),
            articles_path: cfg.articles_path.clone(),
        }
    }

    /// Registered filenames in configuration order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    /// Request path for a fragment filename.
    pub fn article_path(&self, file: &str) -> String {
        format!("{}{}", self.articles_path, file)
    }

    /// Title for a request path, falling back to the default title.
    pub fn title_for(&self, path: &str) -> &str {
        self.entries
            .get(file_name(path))
            .map_or(self.default_title.as_str(), |entry| entry.title.as_str())
    }

    /// Resolve a request path against the registry.
    pub fn profile<'a>(&'a self, path: &'a str) -> FragmentProfile<'a> {
        let file = file_name(path);
        let animated = self.animated.contains(file);
        match self.entries.get(file) {
            Some(entry) => FragmentProfile {
                file,
                title: &entry.title,
                flags: entry.flags,
                animated,
                known: true,
            },
            None => FragmentProfile {
                file,
                title: &self.default_title,
                flags: FragmentFlags::default(),
                animated,
                known: false,
            },
        }
    }
}

/// Which fragments show the auxiliary row and which animate it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuxEligibility {
    show_for: Vec<String>,
    animate_for: Vec<String>,
}

impl AuxEligibility {
    pub fn from_config(cfg: &AuxRowConfig) -> Self {
        Self {
            show_for: cfg.show_for.clone(),
            animate_for: cfg.animate_for.clone(),
        }
    }

    pub fn shows_row(&self, path: &str) -> bool {
        let file = file_name(path);
        self.show_for.iter().any(|f| f == file)
    }

    pub fn animates_row(&self, path: &str) -> bool {
        let file = file_name(path);
        self.animate_for.iter().any(|f| f == file)
    }
}

/// Last `/`-separated segment of a path, ignoring any query or fragment.
pub fn file_name(path: &str) -> &str {
    let no_fragment = path.split_once('#').map_or(path, |(base, _)| base);
    let no_query = no_fragment
        .split_once('?')
        .map_or(no_fragment, |(base, _)| base);
    no_query.rsplit('/').next().unwrap_or(no_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn registry() -> ChapterRegistry {
        ChapterRegistry::from_config(&ViewerConfig::default().chapters)
    }

    #[test]
    fn file_name_takes_last_segment() {
        assert_eq!(file_name("articles/涅波史記.html"), "涅波史記.html");
        assert_eq!(file_name("a/b/c.html?x=1#top"), "c.html");
        assert_eq!(file_name("plain.html"), "plain.html");
        assert_eq!(file_name("dir/"), "");
    }

    #[test]
    fn known_fragment_resolves_title_and_animation() {
        let reg = registry();
        let profile = reg.profile("articles/涅波絲經.html");
        assert!(profile.known);
        assert!(profile.animated);
        assert_eq!(profile.title, "涅波絲經");
        assert_eq!(profile.flags, FragmentFlags::default());
    }

    #[test]
    fn audio_fragment_is_self_contained() {
        let reg = registry();
        let profile = reg.profile("articles/涅波絲經有聲書.html");
        assert_eq!(profile.flags, FragmentFlags::self_contained());
    }

    #[test]
    fn unknown_fragment_falls_back_to_default_title() {
        let reg = registry();
        let profile = reg.profile("articles/missing.html");
        assert!(!profile.known);
        assert!(!profile.animated);
        assert_eq!(profile.title, "涅波");
        assert_eq!(reg.title_for("articles/missing.html"), reg.default_title());
    }

    #[test]
    fn animated_set_applies_to_unregistered_fragments() {
        let cfg = ChapterConfig {
            entries: Vec::new(),
            animated: vec!["x.html".to_string()],
            ..ChapterConfig::default()
        };
        let reg = ChapterRegistry::from_config(&cfg);
        let profile = reg.profile("articles/x.html");
        assert!(!profile.known);
        assert!(profile.animated);
        assert_eq!(profile.title, "涅波");
        assert_eq!(profile.flags, FragmentFlags::default());
        assert!(!reg.profile("articles/y.html").animated);
    }

    #[test]
    fn title_outlives_the_request_path() {
        let reg = registry();
        let title = {
            let path = String::from("articles/涅波史記.html");
            reg.title_for(&path)
        };
        assert_eq!(title, "涅波史記");
    }

    #[test]
    fn matching_is_per_segment_not_raw_suffix() {
        let reg = registry();
        assert!(!reg.profile("articles/英文版涅波絲經.html").known);
    }

    #[test]
    fn order_follows_configuration() {
        let reg = registry();
        let files: Vec<&str> = reg.files().collect();
        assert_eq!(files.first().copied(), Some("涅波絲經.html"));
        assert_eq!(files.len(), 5);
        assert_eq!(reg.article_path("x.html"), "articles/x.html");
    }

    #[test]
    fn aux_eligibility_matches_show_set() {
        let cfg = ViewerConfig::default();
        let aux = AuxEligibility::from_config(&cfg.aux_row);
        assert!(aux.shows_row("articles/涅波絲經.html"));
        assert!(aux.shows_row("articles/涅波絲經英文版.html"));
        assert!(!aux.shows_row("articles/涅波史記.html"));
        assert!(aux.animates_row("articles/涅波絲經.html"));
        assert!(!aux.animates_row("articles/涅波絲經英文版.html"));
    }
}
