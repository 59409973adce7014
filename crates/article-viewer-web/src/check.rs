//! Headless walk over a site directory.
//!
//! Every tab of the shell is clicked in turn, followed by every auxiliary
//! button the resulting row offers, exactly as a reader would. Each load
//! goes through the same controller the browser runs, so a fragment that
//! would show the error block in the browser shows up as a failure here.

use std::collections::BTreeSet;
use std::path::Path;

use article_viewer::{
    fragment_path, parse_tab_bar, ArticleViewer, DirSource, FragmentSource, HeadlessHost,
    LoadOutcome, LoadRequest, NavigationLimits, ViewerConfig,
};
use serde::Serialize;

/// Control that triggered a checked load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum CheckOrigin {
    /// Tab, by label.
    Tab(String),
    /// Auxiliary button, by id.
    Aux(String),
}

/// Result of loading one fragment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FragmentCheck {
    pub origin: CheckOrigin,
    pub path: String,
    pub title: String,
    pub rendered: bool,
    /// Fetch failure, when the error block was shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub rewritten: usize,
    pub sections: usize,
    pub cheers: usize,
    pub aux_row: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub shell: String,
    pub tabs: usize,
    pub fragments: Vec<FragmentCheck>,
}

impl SiteReport {
    pub fn failures(&self) -> impl Iterator<Item = &FragmentCheck> {
        self.fragments.iter().filter(|check| !check.rendered)
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Click through the site rooted at `root` whose page shell is `shell`.
pub fn check_site(root: &Path, shell: &str, config: &ViewerConfig) -> Result<SiteReport, String> {
    config.validate().map_err(|e| e.to_string())?;
    let source = DirSource::new(root).map_err(|e| e.to_string())?;
    let shell_path = root.join(shell);
    let bytes = std::fs::read(&shell_path)
        .map_err(|e| format!("{}: {}", shell_path.display(), e))?;
    let bar = parse_tab_bar(&bytes, config, NavigationLimits::default())
        .map_err(|e| e.to_string())?;

    let host = HeadlessHost::new().with_page_path(format!("/{}", shell));
    let mut viewer = ArticleViewer::new(config.clone(), host);
    viewer.bind_tabs(bar);

    let mut report = SiteReport {
        shell: shell.to_string(),
        tabs: viewer.tabs().len(),
        fragments: Vec::new(),
    };
    let mut seen = BTreeSet::new();

    for index in 0..report.tabs {
        let label = viewer
            .tabs()
            .get(index)
            .map(|tab| tab.label.clone())
            .unwrap_or_default();
        let Some(request) = viewer.click_tab(index) else {
            continue;
        };
        let check = run(&mut viewer, &source, request, CheckOrigin::Tab(label));
        seen.insert(check.path.clone());
        let row_shown = check.aux_row;
        report.fragments.push(check);
        if !row_shown {
            continue;
        }

        let ids: Vec<String> = viewer
            .host()
            .aux_row()
            .map(|row| row.buttons.iter().map(|b| b.id.clone()).collect())
            .unwrap_or_default();
        for id in ids {
            let Some(button) = viewer.aux_row().button(&id) else {
                continue;
            };
            let path = fragment_path(&viewer.config().chapters.articles_path, &button.target);
            if seen.contains(&path) {
                continue;
            }
            let Some(request) = viewer.click_aux(&id) else {
                continue;
            };
            let check = run(&mut viewer, &source, request, CheckOrigin::Aux(id));
            seen.insert(check.path.clone());
            report.fragments.push(check);
        }
    }

    Ok(report)
}

fn run<S: FragmentSource>(
    viewer: &mut ArticleViewer<HeadlessHost>,
    source: &S,
    request: LoadRequest,
    origin: CheckOrigin,
) -> FragmentCheck {
    let result = source.fetch(&request.path);
    let error = result.as_ref().err().map(ToString::to_string);
    match viewer.complete_load(request.ticket, result) {
        LoadOutcome::Rendered(summary) => FragmentCheck {
            origin,
            path: summary.path,
            title: summary.title,
            rendered: true,
            error: None,
            rewritten: summary.rewritten,
            sections: summary.sections,
            cheers: summary.cheers,
            aux_row: summary.aux_row,
        },
        LoadOutcome::Failed | LoadOutcome::Superseded => FragmentCheck {
            origin,
            path: request.path,
            title: viewer.host().title().to_string(),
            rendered: false,
            error,
            rewritten: 0,
            sections: 0,
            cheers: 0,
            aux_row: false,
        },
    }
}
