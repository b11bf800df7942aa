//! Script discovery.
//!
//! Walks the script root lazily. Within every directory the files come
//! first (sorted by name), then each subdirectory in name order, so
//! numbered top-level scripts always run before anything nested deeper.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{RunError, RunResult};

/// Default script file extension.
pub const DEFAULT_EXTENSION: &str = "sql";

/// A located script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    path: PathBuf,
    name: String,
}

impl ScriptFile {
    /// Absolute path of the script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name, e.g. `01_tables.sql`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Finds script files under a root directory.
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    root: PathBuf,
    extension: String,
}

impl ScriptLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Match files with this extension instead of `sql`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Start a fresh walk over the script tree.
    ///
    /// Fails with [`RunError::DirectoryNotFound`] when the root is missing
    /// or is not a directory. Errors met while walking are yielded as
    /// [`RunError::DiscoveryFailed`].
    pub fn scripts(&self) -> RunResult<Scripts> {
        let root = match self.root.canonicalize() {
            Ok(root) if root.is_dir() => root,
            Ok(_) => return Err(RunError::DirectoryNotFound(self.root.clone())),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                return Err(RunError::DirectoryNotFound(self.root.clone()));
            }
            Err(source) => {
                return Err(RunError::DiscoveryFailed {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        debug!(root = %root.display(), extension = %self.extension, "walking script tree");

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by(files_before_dirs)
            .into_iter();

        Ok(Scripts {
            root,
            extension: self.extension.clone(),
            walker,
        })
    }
}

/// Sibling order: plain files first, then directories, each by name.
fn files_before_dirs(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Lazy iterator over located scripts, in apply order.
pub struct Scripts {
    root: PathBuf,
    extension: String,
    walker: walkdir::IntoIter,
}

impl Scripts {
    /// Regular files, and symlinks that resolve to one. Symlinked
    /// directories are not descended into.
    fn matches(&self, entry: &DirEntry) -> bool {
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
        is_file
            && entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

impl Iterator for Scripts {
    type Item = RunResult<ScriptFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(RunError::DiscoveryFailed {
                        path,
                        source: io::Error::from(err),
                    }));
                }
            };

            if !self.matches(&entry) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            return Some(Ok(ScriptFile {
                path: entry.into_path(),
                name,
            }));
        }
    }
}
