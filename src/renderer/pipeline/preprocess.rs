//! Shader Source Resolution
//!
//! Loads shader sources from virtual files or the configured root paths and
//! expands `#include "name"` directives in place. Every file that contributed
//! to a stage is recorded as a [`Dependency`] so hot reload can tell when a
//! pipeline went stale.
//!
//! Lookup order for a name:
//! 1. a registered virtual file with exactly that name
//! 2. the directory of the including file (for nested includes)
//! 3. each root path, in order
//! 4. the name as a plain filesystem path

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{Result, RuntimeError};

/// A virtual file as stored by a pipeline manager.
#[derive(Debug, Clone)]
pub(crate) struct VirtualEntry {
    pub contents: String,
    pub version: u64,
}

/// Something a compiled stage was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dependency {
    File {
        /// Name the file was requested under. A virtual file registered
        /// later under this name shadows the file.
        name: String,
        path: PathBuf,
        modified: Option<SystemTime>,
    },
    Virtual {
        name: String,
        version: u64,
    },
}

impl Dependency {
    /// Whether the dependency differs from what was observed at build time.
    pub fn is_stale(&self, virtual_files: &FxHashMap<String, VirtualEntry>) -> bool {
        match self {
            Self::File { name, path, modified } => {
                virtual_files.contains_key(name) || file_modified(path) != *modified
            }
            Self::Virtual { name, version } => virtual_files
                .get(name)
                .is_none_or(|entry| entry.version != *version),
        }
    }
}

/// Fully expanded source text plus everything it was assembled from.
#[derive(Debug, Default)]
pub(crate) struct ResolvedSource {
    pub code: String,
    pub dependencies: Vec<Dependency>,
}

struct Loaded {
    key: String,
    text: String,
    directory: Option<PathBuf>,
    dependency: Dependency,
}

pub(crate) struct SourceResolver<'a> {
    pub virtual_files: &'a FxHashMap<String, VirtualEntry>,
    pub root_paths: &'a [PathBuf],
    pub max_include_depth: usize,
}

impl SourceResolver<'_> {
    /// Loads `name` and expands its includes.
    pub fn resolve_file(&self, name: &str) -> Result<ResolvedSource> {
        let loaded = self.load(name, None)?;
        let mut resolved = ResolvedSource::default();
        let mut seen = FxHashSet::default();
        seen.insert(loaded.key.clone());
        resolved.dependencies.push(loaded.dependency);

        self.expand(
            &loaded.text,
            loaded.directory.as_deref(),
            Path::new(name),
            0,
            &mut seen,
            &mut resolved,
        )?;
        Ok(resolved)
    }

    /// Expands includes inside inline source code.
    pub fn resolve_code(&self, code: &str) -> Result<ResolvedSource> {
        let mut resolved = ResolvedSource::default();
        let mut seen = FxHashSet::default();
        self.expand(code, None, Path::new("<inline>"), 0, &mut seen, &mut resolved)?;
        Ok(resolved)
    }

    fn expand(
        &self,
        text: &str,
        directory: Option<&Path>,
        origin: &Path,
        depth: usize,
        seen: &mut FxHashSet<String>,
        out: &mut ResolvedSource,
    ) -> Result<()> {
        for line in text.lines() {
            let Some(include) = parse_include(line) else {
                out.code.push_str(line);
                out.code.push('\n');
                continue;
            };

            if depth >= self.max_include_depth {
                return Err(RuntimeError::IncludeDepthExceeded {
                    path: origin.to_path_buf(),
                    depth: self.max_include_depth,
                });
            }

            let loaded = self.load(include, directory)?;
            // Each file is pasted at most once per stage.
            if !seen.insert(loaded.key.clone()) {
                continue;
            }
            out.dependencies.push(loaded.dependency);
            self.expand(
                &loaded.text,
                loaded.directory.as_deref(),
                Path::new(include),
                depth + 1,
                seen,
                out,
            )?;
        }
        Ok(())
    }

    fn load(&self, name: &str, directory: Option<&Path>) -> Result<Loaded> {
        if let Some(entry) = self.virtual_files.get(name) {
            return Ok(Loaded {
                key: format!("virtual:{name}"),
                text: entry.contents.clone(),
                directory: None,
                dependency: Dependency::Virtual {
                    name: name.to_string(),
                    version: entry.version,
                },
            });
        }

        let candidates = directory
            .into_iter()
            .chain(self.root_paths.iter().map(PathBuf::as_path))
            .map(|root| root.join(name))
            .chain(std::iter::once(PathBuf::from(name)));

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            return Ok(Loaded {
                key: format!("file:{}", path.display()),
                text,
                directory: path.parent().map(Path::to_path_buf),
                dependency: Dependency::File {
                    name: name.to_string(),
                    modified: file_modified(&path),
                    path,
                },
            });
        }

        Err(RuntimeError::ShaderNotFound(name.to_string()))
    }
}

fn file_modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|md| md.modified()).ok()
}

/// Extracts the target of an `#include "x"` or `#include <x>` line.
fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("#include")?.trim();
    rest.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')))
}
