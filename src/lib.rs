#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod renderer;
pub mod utils;

pub use errors::{Result, RuntimeError};
pub use renderer::graph::{PingPongResource, ResourceKind, ResourceRole, ResourceView};
pub use renderer::pipeline::{
    AsyncPipelineHandle, PipelineBuildCache, PipelineCompileInfo, PipelineCompiler, PipelineManager, ReloadStatus,
    VirtualFile,
};
pub use renderer::settings::{BuildCacheSettings, PipelineManagerInfo};
pub use utils::{ConsoleLog, LogSink, WorkQueue};
