//! Client-side chapter viewer for a static reading site.
//!
//! A page shell carries a tab bar and an empty container; clicking a tab
//! fetches the matching HTML fragment, fixes its relative asset paths and
//! swaps it in with entrance animations. Chapters with related editions
//! (an audio book, an English translation) get an extra row of jump buttons
//! under the tab bar.
//!
//! The crate is split along one seam: [`ArticleViewer`] decides, a
//! [`ViewHost`] applies. The browser backend lives in the
//! `article-viewer-web` crate; [`HeadlessHost`] keeps everything in memory.
//!
//! ```rust
//! use article_viewer::{ArticleViewer, HeadlessHost, MemorySource, ViewerConfig};
//!
//! let source = MemorySource::new()
//!     .with("articles/涅波絲經.html", r#"<section><img src="Person/a.png"></section>"#);
//! let mut viewer = ArticleViewer::new(ViewerConfig::default(), HeadlessHost::new());
//! let outcome = viewer.load_from(&source, "articles/涅波絲經.html");
//!
//! assert!(outcome.is_rendered());
//! assert!(viewer.host().container_html().contains(r#"src="../Person/a.png""#));
//! assert!(viewer.host().aux_row().is_some());
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod animation;
pub mod auxiliary;
pub mod config;
pub mod error;
pub mod headless;
pub mod host;
pub mod markup;
pub mod navigation;
pub mod registry;
pub mod rewrite;
pub mod source;
pub mod state;
pub mod viewer;

pub use animation::{CheerPlan, CheerTimer, RevealAction, RevealState, ScrollReveal};
pub use auxiliary::{AuxRow, AuxRowBuilder};
pub use config::{
    AuxButton, AuxRowConfig, ChapterConfig, ChapterEntry, ResourceConfig, SelectorConfig,
    UiConfig, ViewerConfig,
};
pub use error::{ErrorPhase, FetchError, ViewerError};
pub use headless::{HeadlessHost, HostOp};
pub use host::{FragmentSource, ViewHost};
pub use navigation::{fragment_path, parse_tab_bar, NavigationLimits, TabBar, TabSpec};
pub use registry::{ChapterRegistry, FragmentFlags, FragmentProfile};
pub use rewrite::ResourceRewriter;
pub use source::{DirSource, MemorySource};
#[cfg(feature = "async")]
pub use source::{AsyncFragmentSource, TokioDirSource};
pub use state::{LoadTicket, ViewState};
pub use viewer::{ArticleViewer, LoadOutcome, LoadRequest, RenderSummary};
