//! Build Cache & Pipeline Manager Settings
//!
//! Plain configuration structs consumed at construction time.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use voxel_runtime::renderer::settings::BuildCacheSettings;
//!
//! // Default: 16 slots, one worker per hardware thread
//! let settings = BuildCacheSettings::default();
//!
//! // Deterministic, single-threaded builds (e.g. for capture tools)
//! let settings = BuildCacheSettings {
//!     worker_count: Some(0),
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;

use crate::renderer::pipeline::manager::ShaderDefine;
use crate::utils::work_queue::default_worker_count;

/// Number of independent compiler instances used by default.
pub const DEFAULT_SLOT_COUNT: usize = 16;

// ---------------------------------------------------------------------------
// BuildCacheSettings
// ---------------------------------------------------------------------------

/// Sizing of a [`PipelineBuildCache`](crate::renderer::pipeline::PipelineBuildCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCacheSettings {
    /// Number of build slots. Must be at least 1.
    pub slot_count: usize,

    /// Worker thread count. `None` uses the available hardware parallelism,
    /// `Some(0)` compiles synchronously on the requesting thread.
    pub worker_count: Option<usize>,

    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for BuildCacheSettings {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            worker_count: None,
            thread_name: "pipeline-build".to_string(),
        }
    }
}

impl BuildCacheSettings {
    /// Worker count with `None` resolved against the current machine.
    #[must_use]
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(default_worker_count)
    }
}

// ---------------------------------------------------------------------------
// PipelineManagerInfo
// ---------------------------------------------------------------------------

/// Shared configuration for every [`PipelineManager`](crate::renderer::pipeline::PipelineManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineManagerInfo {
    /// Directories searched, in order, for shader files and includes.
    pub root_paths: Vec<PathBuf>,

    /// Defines applied to every pipeline before its own defines.
    pub default_defines: Vec<ShaderDefine>,

    /// Maximum `#include` nesting depth.
    pub max_include_depth: usize,
}

impl Default for PipelineManagerInfo {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            default_defines: Vec::new(),
            max_include_depth: 32,
        }
    }
}
