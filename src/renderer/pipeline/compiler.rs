//! Slot Compiler Contract
//!
//! A [`PipelineCompiler`] is one non-thread-safe compiler backend. The build
//! cache owns several of them, each behind its own lock, and never calls two
//! methods on the same instance concurrently. All methods therefore take
//! `&mut self`.

/// An in-memory file that shadows (or adds to) the files on disk.
///
/// Paths are opaque strings and are matched verbatim against shader sources
/// and `#include` directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub name: String,
    pub contents: String,
}

impl VirtualFile {
    #[must_use]
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Outcome of a successful [`PipelineCompiler::reload_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    /// Nothing the compiler tracks had changed.
    NoChange,
    /// At least one pipeline was recompiled.
    Reloaded,
}

/// One compiler backend instance owned by a build slot.
pub trait PipelineCompiler: Send + 'static {
    /// Description consumed by [`compile`](Self::compile).
    type Description: Send + 'static;

    /// Built object handed back to the requester. Cloning must be cheap.
    type Pipeline: Clone + Send + 'static;

    /// Builds a pipeline. The error string is shown to the user verbatim.
    fn compile(&mut self, description: &Self::Description) -> Result<Self::Pipeline, String>;

    /// Structural validity of a freshly built object.
    fn validate(&self, _pipeline: &Self::Pipeline) -> bool {
        true
    }

    fn add_virtual_file(&mut self, file: &VirtualFile);

    /// Recompiles everything this instance knows about that went stale.
    fn reload_all(&mut self) -> Result<ReloadStatus, String>;

    fn remove_pipeline(&mut self, pipeline: &Self::Pipeline);
}
