//! Fragment sources for native drivers.
//!
//! The browser host fetches over HTTP itself; these sources serve headless
//! runs, tests and the site checker.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{FetchError, ViewerError};
use crate::host::FragmentSource;

/// Fragments held in memory, keyed by request path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemorySource {
    fragments: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the fragment served for `path`.
    pub fn with(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, body: impl Into<String>) {
        self.fragments.insert(path.into(), body.into());
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl FragmentSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        self.fragments
            .get(path)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// Fragments read from a site directory, the way a static server maps
/// request paths onto files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Serve fragments below `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ViewerError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ViewerError::io(
                "SOURCE_IO",
                "site root is not a directory",
            )
            .with_path(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing request `path`, or `None` when the path would leave
    /// the site root.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        resolve_under(&self.root, path)
    }
}

impl FragmentSource for DirSource {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let file = self.resolve(path).ok_or(FetchError::Status(403))?;
        std::fs::read_to_string(&file).map_err(map_io_error)
    }
}

/// Join a request path onto `root`, refusing anything but plain segments.
pub fn resolve_under(root: &Path, path: &str) -> Option<PathBuf> {
    let rel = path.split(['?', '#']).next().unwrap_or_default();
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return None;
    }
    let mut out = root.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

fn map_io_error(err: io::Error) -> FetchError {
    match err.kind() {
        io::ErrorKind::NotFound => FetchError::Status(404),
        io::ErrorKind::PermissionDenied => FetchError::Status(403),
        _ => FetchError::transport(err),
    }
}

#[cfg(feature = "async")]
mod tokio_source {
    use std::future::Future;
    use std::path::PathBuf;

    use super::{map_io_error, resolve_under, DirSource};
    use crate::error::{FetchError, ViewerError};
    use crate::host::ViewHost;
    use crate::viewer::{ArticleViewer, LoadOutcome};

    /// Asynchronous fragment fetcher.
    pub trait AsyncFragmentSource {
        fn fetch(&self, path: &str) -> impl Future<Output = Result<String, FetchError>>;
    }

    /// [`DirSource`] counterpart reading through `tokio::fs`.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct TokioDirSource {
        root: PathBuf,
    }

    impl TokioDirSource {
        pub fn new(root: impl Into<PathBuf>) -> Result<Self, ViewerError> {
            let dir = DirSource::new(root)?;
            Ok(Self {
                root: dir.root().to_path_buf(),
            })
        }
    }

    impl AsyncFragmentSource for TokioDirSource {
        async fn fetch(&self, path: &str) -> Result<String, FetchError> {
            let file = resolve_under(&self.root, path).ok_or(FetchError::Status(403))?;
            tokio::fs::read_to_string(&file).await.map_err(map_io_error)
        }
    }

    impl<H: ViewHost> ArticleViewer<H> {
        /// Load `path` from an asynchronous source.
        ///
        /// The viewer is borrowed across the fetch, so loads driven this way
        /// never overlap; interleaved drivers use
        /// [`ArticleViewer::begin_load`] and [`ArticleViewer::complete_load`].
        pub async fn load_from_async<S: AsyncFragmentSource>(
            &mut self,
            source: &S,
            path: &str,
        ) -> LoadOutcome {
            let request = self.begin_load(path);
            let result = source.fetch(&request.path).await;
            self.complete_load(request.ticket, result)
        }
    }
}

#[cfg(feature = "async")]
pub use tokio_source::{AsyncFragmentSource, TokioDirSource};

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_site(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "article-viewer-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(dir.join("articles")).expect("create temp site");
        dir
    }

    #[test]
    fn memory_source_reports_missing_as_404() {
        let source = MemorySource::new().with("articles/a.html", "<p>a</p>");
        assert_eq!(source.fetch("articles/a.html").as_deref(), Ok("<p>a</p>"));
        assert_eq!(source.fetch("articles/b.html"), Err(FetchError::Status(404)));
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn dir_source_reads_files_below_root() {
        let dir = temp_site("read");
        std::fs::write(dir.join("articles/涅波史記.html"), "<p>史</p>").expect("write");
        let source = DirSource::new(&dir).expect("dir source");
        assert_eq!(
            source.fetch("articles/涅波史記.html").as_deref(),
            Ok("<p>史</p>")
        );
        assert_eq!(
            source.fetch("articles/missing.html"),
            Err(FetchError::Status(404))
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dir_source_refuses_parent_segments() {
        let dir = temp_site("escape");
        let source = DirSource::new(&dir).expect("dir source");
        assert_eq!(
            source.fetch("articles/../../etc/passwd"),
            Err(FetchError::Status(403))
        );
        assert!(source.resolve("/articles/a.html?x=1").is_some());
        assert!(source.resolve("").is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dir_source_requires_directory() {
        let err = DirSource::new("/definitely/not/here").expect_err("missing root");
        assert_eq!(err.code, "SOURCE_IO");
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn tokio_source_matches_dir_source() {
        let dir = temp_site("tokio");
        std::fs::write(dir.join("articles/a.html"), "<p>a</p>").expect("write");
        let source = TokioDirSource::new(&dir).expect("tokio source");
        assert_eq!(
            AsyncFragmentSource::fetch(&source, "articles/a.html").await.as_deref(),
            Ok("<p>a</p>")
        );
        assert_eq!(
            AsyncFragmentSource::fetch(&source, "articles/none.html").await,
            Err(FetchError::Status(404))
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
