//! Pipeline Compilation
//!
//! Background pipeline builds over a pool of non-thread-safe compilers:
//! - [`PipelineCompiler`]: the per-slot compiler contract
//! - [`PipelineBuildCache`]: slot rotation, worker pool, broadcast operations
//! - [`AsyncPipelineHandle`]: lazily-resolved build result
//! - [`PipelineManager`]: source-aware compiler with includes, defines and hot reload
//! - `wgpu_device`: WGSL pipelines on a `wgpu::Device` (feature `wgpu`)

pub mod async_handle;
pub mod build_cache;
pub mod compiler;
pub mod manager;
pub(crate) mod preprocess;
#[cfg(feature = "wgpu")]
pub mod wgpu_device;

pub use async_handle::{AsyncPipelineHandle, BuildOutcome, PendingBuild};
pub use build_cache::PipelineBuildCache;
pub use compiler::{PipelineCompiler, ReloadStatus, VirtualFile};
pub use manager::{
    ManagedPipeline, PipelineCompileInfo, PipelineDevice, PipelineManager, PipelineSource, ResolvedStage,
    ShaderCompileInfo, ShaderDefine, ShaderSource, ShaderStage,
};
#[cfg(feature = "wgpu")]
pub use wgpu_device::{WgpuPipeline, WgpuPipelineDevice, WgpuPipelineState, WgpuRasterState};
