//! Browser backend and local preview helpers for `article-viewer`.
//!
//! On `wasm32` the crate exports a `start` entry point that binds the page's
//! tab bar to an [`article_viewer::ArticleViewer`] driving the live document
//! through [`DomHost`]. Natively it provides the site checker used by the
//! `site-preview` binary.

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

pub mod check;
#[cfg(target_arch = "wasm32")]
mod dom;

pub use check::{check_site, CheckOrigin, FragmentCheck, SiteReport};
#[cfg(target_arch = "wasm32")]
pub use dom::{load_article, set_main_title_by_path, start, DomHost};
