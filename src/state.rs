//! Explicit view state owned by the controller.
//!
//! Marker classes on tabs and auxiliary buttons are derived from this record
//! on every transition; the DOM is never read back as the source of truth.

/// Generation number issued for every load request.
///
/// Tickets are strictly increasing within one [`ViewState`]; only the most
/// recently issued ticket may apply its result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Selection and render bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    active_tab: Option<usize>,
    active_aux: Option<String>,
    rendered_path: Option<String>,
    requested_path: Option<String>,
    latest: LoadTicket,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tab(&self) -> Option<usize> {
        self.active_tab
    }

    pub fn active_aux(&self) -> Option<&str> {
        self.active_aux.as_deref()
    }

    /// Path of the fragment currently occupying the container, if any
    /// load has completed successfully.
    pub fn rendered_path(&self) -> Option<&str> {
        self.rendered_path.as_deref()
    }

    /// Path of the most recent load request.
    pub fn requested_path(&self) -> Option<&str> {
        self.requested_path.as_deref()
    }

    pub fn latest_ticket(&self) -> LoadTicket {
        self.latest
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket == self.latest
    }

    pub(crate) fn select_tab(&mut self, index: usize) {
        self.active_tab = Some(index);
        self.active_aux = None;
    }

    pub(crate) fn select_aux(&mut self, id: &str) {
        self.active_aux = Some(id.to_string());
    }

    pub(crate) fn clear_aux(&mut self) {
        self.active_aux = None;
    }

    pub(crate) fn issue(&mut self, path: &str) -> LoadTicket {
        self.latest = LoadTicket(self.latest.0.wrapping_add(1));
        self.requested_path = Some(path.to_string());
        self.latest
    }

    pub(crate) fn set_rendered(&mut self, path: Option<&str>) {
        self.rendered_path = path.map(str::to_string);
    }
}
