use std::path::{Path, PathBuf};

use article_viewer::{
    parse_tab_bar, ArticleViewer, DirSource, HeadlessHost, LoadOutcome, NavigationLimits,
    RenderSummary, TabBar, ViewerConfig,
};

pub const SITE_FIXTURE: &str = "tests/fixtures/site";
pub const SHELL: &str = "index.html";

pub const TAB_MAIN: usize = 0;
pub const TAB_HISTORY: usize = 1;
pub const TAB_TEACHINGS: usize = 2;
/// Tab whose fragment does not exist.
pub const TAB_MISSING: usize = 3;

pub const MAIN_PATH: &str = "articles/涅波絲經.html";
pub const AUDIO_PATH: &str = "articles/涅波絲經有聲書.html";
pub const ENGLISH_PATH: &str = "articles/涅波絲經英文版.html";
pub const HISTORY_PATH: &str = "articles/涅波史記.html";

pub fn site_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(SITE_FIXTURE)
}

pub fn site_source() -> DirSource {
    DirSource::new(site_root()).expect("fixture site should exist")
}

pub fn shell_tabs() -> TabBar {
    let shell = std::fs::read(site_root().join(SHELL)).expect("read fixture shell");
    parse_tab_bar(
        &shell,
        &ViewerConfig::default(),
        NavigationLimits::default(),
    )
    .expect("fixture shell should parse")
}

pub fn viewer_with(host: HeadlessHost) -> ArticleViewer<HeadlessHost> {
    let mut viewer = ArticleViewer::new(ViewerConfig::default(), host);
    viewer.bind_tabs(shell_tabs());
    viewer
}

pub fn viewer() -> ArticleViewer<HeadlessHost> {
    viewer_with(HeadlessHost::new())
}

pub fn rendered(outcome: LoadOutcome) -> RenderSummary {
    match outcome {
        LoadOutcome::Rendered(summary) => summary,
        other => panic!("expected a rendered fragment, got {:?}", other),
    }
}
