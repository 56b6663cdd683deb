//! Renderer Runtime
//!
//! The CPU-side services a voxel renderer leans on every frame:
//!
//! - [`pipeline`]: asynchronous, slot-parallel pipeline builds with hot reload
//! - [`graph`]: ping-pong resources for temporal passes
//! - [`settings`]: construction-time configuration

pub mod graph;
pub mod pipeline;
pub mod settings;

pub use settings::{BuildCacheSettings, PipelineManagerInfo};
