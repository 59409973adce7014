//! Seams between the controller and its environment.
//!
//! [`ViewHost`] receives every document mutation the controller decides on;
//! [`FragmentSource`] supplies fragment bodies for synchronous drivers. The
//! browser backend implements `ViewHost` over the live DOM and fetches on its
//! own event loop, handing results back through
//! [`crate::ArticleViewer::complete_load`].

use crate::animation::CheerPlan;
use crate::auxiliary::AuxRow;
use crate::error::FetchError;
use crate::state::LoadTicket;

/// Document operations the controller needs.
pub trait ViewHost {
    /// Replace the whole container subtree.
    fn set_container_html(&mut self, html: &str);

    fn add_container_class(&mut self, class: &str);

    fn remove_container_class(&mut self, class: &str);

    /// Force the host to commit pending style changes (read a layout
    /// property) so a removed-then-re-added class replays its animation.
    fn flush_layout(&mut self);

    /// Set or clear the active marker on one tab control.
    fn set_tab_marker(&mut self, index: usize, class: &str, active: bool);

    /// Set or clear the active marker on one auxiliary button.
    fn set_aux_marker(&mut self, id: &str, class: &str, active: bool);

    /// Whether the navigation bar the auxiliary row attaches to exists.
    fn has_nav(&self) -> bool;

    /// Insert `row` directly after the navigation bar.
    fn mount_aux_row(&mut self, row: &AuxRow);

    /// Remove the element with `container_id`, if present.
    fn remove_aux_row(&mut self, container_id: &str);

    /// Register every section of the current container content with a
    /// visibility observer; returns how many were registered. Reports come
    /// back through [`crate::ArticleViewer::on_section_intersection`].
    fn observe_sections(&mut self, ticket: LoadTicket, threshold: f32) -> usize;

    /// Add the visible class to a section and stop observing it.
    fn reveal_section(&mut self, ticket: LoadTicket, index: usize, class: &str);

    /// Swap every cheer placeholder's content for the plan's hidden image
    /// and schedule its reveal; returns how many placeholders were found.
    fn render_cheers(&mut self, ticket: LoadTicket, plan: &CheerPlan) -> usize;

    /// Apply the plan's shown style to cheer image `index` of render `ticket`.
    fn show_cheer(&mut self, ticket: LoadTicket, index: usize, plan: &CheerPlan);

    fn set_title(&mut self, title: &str);

    /// Path of the page hosting the viewer (used to pre-mark a button).
    fn page_path(&self) -> Option<String>;
}

/// Synchronous fragment fetcher.
pub trait FragmentSource {
    fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

impl<S: FragmentSource + ?Sized> FragmentSource for &S {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        (**self).fetch(path)
    }
}
