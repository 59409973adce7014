//! The article viewer controller.
//!
//! `ArticleViewer` owns the view state and decides every document mutation;
//! a [`ViewHost`] carries them out. Loads are split in two so the host can
//! fetch on its own event loop:
//!
//! ```rust
//! use article_viewer::{ArticleViewer, HeadlessHost, LoadOutcome, ViewerConfig};
//!
//! let mut viewer = ArticleViewer::new(ViewerConfig::default(), HeadlessHost::new());
//! let request = viewer.begin_load("articles/涅波史記.html");
//! // ... fetch request.path ...
//! let outcome = viewer.complete_load(request.ticket, Ok("<section>hi</section>".to_string()));
//! assert!(matches!(outcome, LoadOutcome::Rendered(_)));
//! assert_eq!(viewer.host().title(), "涅波史記");
//! ```

use crate::animation::{CheerPlan, CheerTimer, RevealAction, ScrollReveal};
use crate::auxiliary::AuxRowBuilder;
use crate::config::ViewerConfig;
use crate::error::FetchError;
use crate::host::{FragmentSource, ViewHost};
use crate::markup::{error_block, loading_placeholder, strip_blank_lines};
use crate::navigation::{fragment_path, TabBar, TabSpec};
use crate::registry::ChapterRegistry;
use crate::rewrite::ResourceRewriter;
use crate::state::{LoadTicket, ViewState};

/// A load that has been started and awaits its fetch result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    /// Path to fetch.
    pub path: String,
}

/// What a successful render did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderSummary {
    pub path: String,
    pub title: String,
    /// Attribute values that received the parent marker.
    pub rewritten: usize,
    /// Whether the container entrance animation was replayed.
    pub animated: bool,
    /// Sections registered for scroll reveal.
    pub sections: usize,
    /// Cheer placeholders resolved.
    pub cheers: usize,
    /// Whether the auxiliary row was mounted.
    pub aux_row: bool,
}

/// Result of [`ArticleViewer::complete_load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fragment was rendered into the container.
    Rendered(RenderSummary),
    /// The fragment was unavailable; the error block is shown.
    Failed,
    /// A newer load was requested in the meantime; nothing changed.
    Superseded,
}

impl LoadOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

pub struct ArticleViewer<H: ViewHost> {
    host: H,
    config: ViewerConfig,
    registry: ChapterRegistry,
    rewriter: ResourceRewriter,
    aux: AuxRowBuilder,
    cheer: CheerPlan,
    tabs: Vec<TabSpec>,
    state: ViewState,
    reveal: ScrollReveal,
}

impl<H: ViewHost> ArticleViewer<H> {
    /// Build a viewer from a validated configuration.
    pub fn new(config: ViewerConfig, host: H) -> Self {
        Self {
            registry: ChapterRegistry::from_config(&config.chapters),
            rewriter: ResourceRewriter::from_config(&config.resources),
            aux: AuxRowBuilder::new(&config.aux_row),
            cheer: CheerPlan::from_config(&config.ui, &config.resources),
            host,
            config,
            tabs: Vec::new(),
            state: ViewState::new(),
            reveal: ScrollReveal::default(),
        }
    }

    /// Bind the tab controls. A tab marked active in the shell stays active.
    pub fn bind_tabs(&mut self, bar: TabBar) {
        self.tabs = bar.tabs;
        if let Some(index) = bar.initially_active {
            self.state.select_tab(index);
        }
        self.sync_tab_markers();
    }

    pub fn tabs(&self) -> &[TabSpec] {
        &self.tabs
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ChapterRegistry {
        &self.registry
    }

    pub fn aux_row(&self) -> &AuxRowBuilder {
        &self.aux
    }

    /// Handle a click on tab `index`: move the active marker and start
    /// loading its fragment. Returns `None` for an unknown tab.
    pub fn click_tab(&mut self, index: usize) -> Option<LoadRequest> {
        let Some(tab) = self.tabs.get(index) else {
            log::warn!("click on unknown tab {}", index);
            return None;
        };
        let path = fragment_path(&self.config.chapters.articles_path, &tab.target);
        self.state.select_tab(index);
        self.sync_tab_markers();
        Some(self.begin_load(&path))
    }

    /// Handle a click on auxiliary button `id`.
    pub fn click_aux(&mut self, id: &str) -> Option<LoadRequest> {
        let Some(button) = self.aux.button(id) else {
            log::warn!("click on unknown auxiliary button '{}'", id);
            return None;
        };
        let path = fragment_path(&self.config.chapters.articles_path, &button.target);
        self.state.select_aux(id);
        self.sync_aux_markers();
        Some(self.begin_load(&path))
    }

    /// Show the loading placeholder, drop the auxiliary row and issue a
    /// ticket for `path`.
    pub fn begin_load(&mut self, path: &str) -> LoadRequest {
        let ticket = self.state.issue(path);
        log::debug!("load #{} requested: {}", ticket.get(), path);
        self.host
            .set_container_html(&loading_placeholder(&self.config.ui));
        self.host.remove_aux_row(self.aux.container_id());
        self.reveal.clear();
        LoadRequest {
            ticket,
            path: path.to_string(),
        }
    }

    /// Apply a fetch result. Results for anything but the latest ticket are
    /// discarded.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<String, FetchError>,
    ) -> LoadOutcome {
        if !self.state.is_current(ticket) {
            log::debug!(
                "load #{} superseded by #{}",
                ticket.get(),
                self.state.latest_ticket().get()
            );
            return LoadOutcome::Superseded;
        }
        let path = self.state.requested_path().unwrap_or_default().to_string();
        match result {
            Ok(body) => LoadOutcome::Rendered(self.render(ticket, &path, body)),
            Err(err) => {
                log::warn!("{}: {}", path, err);
                self.show_error();
                LoadOutcome::Failed
            }
        }
    }

    /// Load `path` from a synchronous source.
    pub fn load_from<S: FragmentSource>(&mut self, source: &S, path: &str) -> LoadOutcome {
        let request = self.begin_load(path);
        let result = source.fetch(&request.path);
        self.complete_load(request.ticket, result)
    }

    /// Click tab `index` and load its fragment from a synchronous source.
    pub fn click_tab_from<S: FragmentSource>(
        &mut self,
        source: &S,
        index: usize,
    ) -> Option<LoadOutcome> {
        let request = self.click_tab(index)?;
        let result = source.fetch(&request.path);
        Some(self.complete_load(request.ticket, result))
    }

    /// Click auxiliary button `id` and load its target from a synchronous source.
    pub fn click_aux_from<S: FragmentSource>(
        &mut self,
        source: &S,
        id: &str,
    ) -> Option<LoadOutcome> {
        let request = self.click_aux(id)?;
        let result = source.fetch(&request.path);
        Some(self.complete_load(request.ticket, result))
    }

    /// Feed a visibility report for section `index` of render `ticket`.
    pub fn on_section_intersection(
        &mut self,
        ticket: LoadTicket,
        index: usize,
        is_intersecting: bool,
    ) -> RevealAction {
        let action = self.reveal.on_intersection(ticket, index, is_intersecting);
        if action == RevealAction::Reveal {
            self.host
                .reveal_section(ticket, index, &self.config.ui.visible_class);
        }
        action
    }

    /// Whether a cheer timer scheduled for `ticket` may still touch the page.
    pub fn cheer_due(&self, ticket: LoadTicket) -> bool {
        self.state.is_current(ticket)
    }

    /// Run an elapsed cheer timer. Timers of a replaced render do nothing.
    pub fn fire_cheer(&mut self, timer: CheerTimer) -> bool {
        if !self.cheer_due(timer.ticket) {
            log::trace!("cheer timer of load #{} expired", timer.ticket.get());
            return false;
        }
        self.host.show_cheer(timer.ticket, timer.index, &self.cheer);
        true
    }

    pub fn cheer_plan(&self) -> &CheerPlan {
        &self.cheer
    }

    /// Set the displayed title for `path` and return it.
    pub fn update_title(&mut self, path: &str) -> String {
        let title = self.registry.title_for(path).to_string();
        self.host.set_title(&title);
        title
    }

    fn render(&mut self, ticket: LoadTicket, path: &str, body: String) -> RenderSummary {
        let profile = self.registry.profile(path);
        let flags = profile.flags;
        let replay = profile.animated && !flags.skip_animation;

        let mut html = body;
        if flags.strip_blank_lines {
            html = strip_blank_lines(&html);
        }
        let mut rewritten = 0usize;
        if !flags.skip_rewrite {
            let (fixed, count) = self.rewriter.rewrite_counted(&html);
            html = fixed;
            rewritten = count;
        }

        let animation_class = &self.config.ui.animation_class;
        if flags.skip_animation {
            self.host.set_container_html(&html);
        } else {
            self.host.remove_container_class(animation_class);
            self.host.set_container_html(&html);
            if replay {
                self.host.flush_layout();
                self.host.add_container_class(animation_class);
            }
        }

        let sections = self
            .host
            .observe_sections(ticket, self.config.ui.threshold);
        self.reveal.register(ticket, sections);
        let cheers = self.host.render_cheers(ticket, &self.cheer);
        let aux_row = self.mount_aux_row(path);
        let title = self.update_title(path);
        self.state.set_rendered(Some(path));

        log::debug!(
            "rendered {} (rewritten={}, sections={}, cheers={}, aux_row={})",
            path,
            rewritten,
            sections,
            cheers,
            aux_row
        );
        RenderSummary {
            path: path.to_string(),
            title,
            rewritten,
            animated: replay,
            sections,
            cheers,
            aux_row,
        }
    }

    fn mount_aux_row(&mut self, path: &str) -> bool {
        if !self.aux.shows_for(path) || !self.host.has_nav() {
            self.state.clear_aux();
            return false;
        }
        let row = self.aux.build(path);
        self.host.mount_aux_row(&row);
        if self.state.active_aux().is_none() {
            let page = self.host.page_path();
            if let Some(button) = self.aux.button_for_page(page.as_deref()) {
                let id = button.id.clone();
                self.state.select_aux(&id);
            }
        }
        self.sync_aux_markers();
        true
    }

    fn show_error(&mut self) {
        self.host
            .set_container_html(&error_block(&self.config.ui, &self.config.resources));
        self.host.remove_aux_row(self.aux.container_id());
        self.state.clear_aux();
        self.state.set_rendered(None);
    }

    fn sync_tab_markers(&mut self) {
        let active = self.state.active_tab();
        let class = &self.config.ui.active_class;
        for tab in &self.tabs {
            self.host
                .set_tab_marker(tab.index, class, active == Some(tab.index));
        }
    }

    fn sync_aux_markers(&mut self) {
        let active = self.state.active_aux();
        let class = &self.config.ui.active_class;
        for button in self.aux.buttons() {
            self.host
                .set_aux_marker(&button.id, class, active == Some(button.id.as_str()));
        }
    }
}
