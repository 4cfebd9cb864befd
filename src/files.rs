//! `try_files`: serve a file from disk when one exists for the request.
//!
//! The probe only decides *whether* a file answers the request. Producing the
//! bytes is the job of a [`FileServer`]; [`StaticFiles`] is the default one.
//!
//! A candidate is accepted only if, once symlinks and `..` are resolved, it is
//! a readable regular file inside the configured base directory.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error};

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// Replaced by the request path, without its leading `/`, in every pattern.
pub const URI_PLACEHOLDER: &str = ":uri";

// ── FileServer ───────────────────────────────────────────────────────────────

/// Produces the response for a file the probe has already vetted.
///
/// `path` is absolute and canonical. The request's path has been rewritten to
/// the file's location relative to the base directory.
pub trait FileServer: Send + Sync + 'static {
    fn serve(&self, path: PathBuf, req: Request) -> BoxFuture;
}

/// Reads the whole file and answers `200` with a guessed content type.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticFiles;

impl FileServer for StaticFiles {
    fn serve(&self, path: PathBuf, req: Request) -> BoxFuture {
        Box::pin(async move {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "file vanished after probe");
                    return Response::not_found();
                }
                Err(e) => {
                    error!(path = %path.display(), "reading file failed: {e}");
                    return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
                }
            };

            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let body = if req.method().eq_ignore_ascii_case("HEAD") { Vec::new() } else { bytes };
            Response::builder().bytes(mime.as_ref(), body)
        })
    }
}

// ── TryFiles ─────────────────────────────────────────────────────────────────

/// Configuration of a `try_files` location.
///
/// ```rust,no_run
/// use waypost::{RouteTable, TryFiles};
///
/// let mut table = RouteTable::new();
/// table.try_files(TryFiles::patterns([":uri", ":uri/index.html"]).dir("public"))?;
/// # Ok::<(), waypost::Error>(())
/// ```
#[derive(Clone)]
pub struct TryFiles {
    patterns: Vec<String>,
    dir: Option<PathBuf>,
    server: Arc<dyn FileServer>,
}

impl TryFiles {
    /// Tries the request path itself (`:uri`).
    pub fn new() -> Self {
        Self::patterns([URI_PLACEHOLDER])
    }

    /// Tries each pattern in order. An empty list means `[":uri"]`.
    pub fn patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        if patterns.is_empty() {
            patterns.push(URI_PLACEHOLDER.to_owned());
        }
        Self { patterns, dir: None, server: Arc::new(StaticFiles) }
    }

    /// Base directory; defaults to the working directory at registration.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn server(mut self, server: impl FileServer) -> Self {
        self.server = Arc::new(server);
        self
    }

    pub(crate) fn with_default_dir(mut self) -> Result<Self, Error> {
        if self.dir.is_none() {
            self.dir = Some(std::env::current_dir()?);
        }
        Ok(self)
    }

    /// Patterns as they would read in an nginx `try_files` line.
    pub(crate) fn describe(&self) -> String {
        self.patterns.join(" ")
    }

    /// Finds the first pattern that resolves to a servable file.
    ///
    /// `decoded_path` is the percent-decoded request path with its case kept.
    /// Every other tier compares against the lower-cased path, but file
    /// systems are case-sensitive, so this one deliberately does not.
    pub fn probe(&self, decoded_path: &str) -> Option<FileHit> {
        let dir = self.dir.as_deref().unwrap_or(Path::new("."));
        let base = match dir.canonicalize() {
            Ok(base) => base,
            Err(e) => {
                debug!(dir = %dir.display(), "try_files base directory unusable: {e}");
                return None;
            }
        };

        let uri = decoded_path.trim_start_matches('/');
        self.patterns.iter().find_map(|pattern| {
            let candidate = pattern.replace(URI_PLACEHOLDER, uri);
            check(&base, candidate.trim_start_matches('/'))
        })
    }

    pub(crate) fn serve(&self, path: PathBuf, req: Request) -> BoxFuture {
        self.server.serve(path, req)
    }
}

impl Default for TryFiles {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for TryFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryFiles")
            .field("patterns", &self.patterns)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// A file the probe accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHit {
    /// Canonical absolute path on disk.
    pub absolute: PathBuf,
    /// `/`-separated path relative to the base directory, with a leading `/`.
    pub relative: String,
}

fn check(base: &Path, candidate: &str) -> Option<FileHit> {
    let full = base.join(candidate).canonicalize().ok()?;

    let Ok(inside) = full.strip_prefix(base) else {
        debug!(candidate, "try_files candidate escapes base directory");
        return None;
    };
    let relative = inside
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    if !fs::metadata(&full).is_ok_and(|m| m.is_file()) {
        return None;
    }
    if let Err(e) = fs::File::open(&full) {
        debug!(path = %full.display(), "try_files candidate unreadable: {e}");
        return None;
    }

    Some(FileHit { relative: format!("/{relative}"), absolute: full })
}
