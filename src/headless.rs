//! In-memory host used by tests and the site checker.
//!
//! `HeadlessHost` keeps the container markup as a string and records every
//! other mutation so callers can inspect what a browser would show.

use std::collections::{BTreeMap, BTreeSet};

use crate::animation::{CheerPlan, CheerTimer};
use crate::auxiliary::AuxRow;
use crate::host::ViewHost;
use crate::markup::{fill_placeholders, outline};
use crate::state::LoadTicket;

/// One recorded host mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    SetHtml,
    AddClass(String),
    RemoveClass(String),
    Flush,
    MountAux(String),
    RemoveAux(String),
    Observe(usize),
    /// Section index and the class it received.
    Reveal(usize, String),
    Cheers(usize),
    ShowCheer(usize),
    Title(String),
}

#[derive(Clone, Debug)]
pub struct HeadlessHost {
    container_html: String,
    container_classes: BTreeSet<String>,
    title: String,
    tab_markers: BTreeMap<usize, BTreeSet<String>>,
    aux_markers: BTreeMap<String, BTreeSet<String>>,
    aux_row: Option<AuxRow>,
    has_nav: bool,
    page_path: Option<String>,
    flushes: usize,
    observed: Option<(LoadTicket, usize)>,
    revealed: Vec<usize>,
    cheer_timers: Vec<CheerTimer>,
    shown_cheers: Vec<usize>,
    ops: Vec<HostOp>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// Empty document with a navigation bar.
    pub fn new() -> Self {
        Self {
            container_html: String::new(),
            container_classes: BTreeSet::new(),
            title: String::new(),
            tab_markers: BTreeMap::new(),
            aux_markers: BTreeMap::new(),
            aux_row: None,
            has_nav: true,
            page_path: None,
            flushes: 0,
            observed: None,
            revealed: Vec::new(),
            cheer_timers: Vec::new(),
            shown_cheers: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Document without the navigation bar the auxiliary row attaches to.
    pub fn without_nav(mut self) -> Self {
        self.has_nav = false;
        self
    }

    /// Report `path` as the location of the hosting page.
    pub fn with_page_path(mut self, path: impl Into<String>) -> Self {
        self.page_path = Some(path.into());
        self
    }

    pub fn container_html(&self) -> &str {
        &self.container_html
    }

    pub fn container_has_class(&self, class: &str) -> bool {
        self.container_classes.contains(class)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn aux_row(&self) -> Option<&AuxRow> {
        self.aux_row.as_ref()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn tab_has_class(&self, index: usize, class: &str) -> bool {
        self.tab_markers
            .get(&index)
            .is_some_and(|classes| classes.contains(class))
    }

    /// Indices of tabs carrying `class`.
    pub fn tabs_with_class(&self, class: &str) -> Vec<usize> {
        self.tab_markers
            .iter()
            .filter(|(_, classes)| classes.contains(class))
            .map(|(index, _)| *index)
            .collect()
    }

    /// Whether button `id` carries `class`. Buttons exist only while the row
    /// is mounted.
    pub fn aux_has_class(&self, id: &str, class: &str) -> bool {
        self.aux_row.is_some()
            && self
                .aux_markers
                .get(id)
                .is_some_and(|classes| classes.contains(class))
    }

    /// Sections registered by the latest render.
    pub fn observed_sections(&self) -> usize {
        self.observed.map_or(0, |(_, count)| count)
    }

    pub fn observed_ticket(&self) -> Option<LoadTicket> {
        self.observed.map(|(ticket, _)| ticket)
    }

    /// Sections revealed since the latest render, in reveal order.
    pub fn revealed_sections(&self) -> &[usize] {
        &self.revealed
    }

    /// Take the cheer timers scheduled so far, as a browser event loop would.
    pub fn take_cheer_timers(&mut self) -> Vec<CheerTimer> {
        std::mem::take(&mut self.cheer_timers)
    }

    pub fn pending_cheer_timers(&self) -> &[CheerTimer] {
        &self.cheer_timers
    }

    /// Cheer images made visible since the latest render.
    pub fn shown_cheers(&self) -> &[usize] {
        &self.shown_cheers
    }

    /// Every mutation in the order it happened.
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl ViewHost for HeadlessHost {
    fn set_container_html(&mut self, html: &str) {
        self.container_html = html.to_string();
        self.ops.push(HostOp::SetHtml);
    }

    fn add_container_class(&mut self, class: &str) {
        self.container_classes.insert(class.to_string());
        self.ops.push(HostOp::AddClass(class.to_string()));
    }

    fn remove_container_class(&mut self, class: &str) {
        self.container_classes.remove(class);
        self.ops.push(HostOp::RemoveClass(class.to_string()));
    }

    fn flush_layout(&mut self) {
        self.flushes += 1;
        self.ops.push(HostOp::Flush);
    }

    fn set_tab_marker(&mut self, index: usize, class: &str, active: bool) {
        let classes = self.tab_markers.entry(index).or_default();
        if active {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    fn set_aux_marker(&mut self, id: &str, class: &str, active: bool) {
        if self.aux_row.is_none() {
            return;
        }
        let classes = self.aux_markers.entry(id.to_string()).or_default();
        if active {
            classes.insert(class.to_string());
        } else {
            classes.remove(class);
        }
    }

    fn has_nav(&self) -> bool {
        self.has_nav
    }

    fn mount_aux_row(&mut self, row: &AuxRow) {
        // Freshly created buttons carry no marker.
        self.aux_markers.clear();
        self.aux_row = Some(row.clone());
        self.ops.push(HostOp::MountAux(row.container_id.clone()));
    }

    fn remove_aux_row(&mut self, container_id: &str) {
        if self
            .aux_row
            .as_ref()
            .is_some_and(|row| row.container_id == container_id)
        {
            self.aux_row = None;
            self.aux_markers.clear();
            self.ops.push(HostOp::RemoveAux(container_id.to_string()));
        }
    }

    fn observe_sections(&mut self, ticket: LoadTicket, _threshold: f32) -> usize {
        let count = outline(&self.container_html, "").sections;
        self.observed = Some((ticket, count));
        self.revealed.clear();
        self.ops.push(HostOp::Observe(count));
        count
    }

    fn reveal_section(&mut self, ticket: LoadTicket, index: usize, class: &str) {
        if self.observed_ticket() == Some(ticket) {
            self.revealed.push(index);
            self.ops.push(HostOp::Reveal(index, class.to_string()));
        }
    }

    fn render_cheers(&mut self, ticket: LoadTicket, plan: &CheerPlan) -> usize {
        let (html, count) = fill_placeholders(
            &self.container_html,
            &plan.placeholder_class,
            &plan.image_html(),
        );
        self.container_html = html;
        self.shown_cheers.clear();
        self.cheer_timers.extend((0..count).map(|index| CheerTimer {
            ticket,
            index,
            delay_ms: plan.delay_ms,
        }));
        self.ops.push(HostOp::Cheers(count));
        count
    }

    fn show_cheer(&mut self, _ticket: LoadTicket, index: usize, _plan: &CheerPlan) {
        self.shown_cheers.push(index);
        self.ops.push(HostOp::ShowCheer(index));
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.ops.push(HostOp::Title(title.to_string()));
    }

    fn page_path(&self) -> Option<String> {
        self.page_path.clone()
    }
}
