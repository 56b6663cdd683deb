//! Pipeline Manager
//!
//! A concrete [`PipelineCompiler`] that turns shader sources into device
//! pipelines and keeps them fresh.
//!
//! # Responsibilities
//!
//! - Resolve stage sources from virtual files and root paths, expanding
//!   `#include` directives (see `preprocess`).
//! - Merge default and per-pipeline defines.
//! - Hand the resolved sources to a [`PipelineDevice`].
//! - Remember what each pipeline was built from so that
//!   [`reload_all`](PipelineCompiler::reload_all) recompiles exactly the stale
//!   ones and swaps them into the shared [`ManagedPipeline`] in place.
//!
//! A manager is not thread-safe; the build cache wraps each one in a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::Result;
use crate::renderer::pipeline::compiler::{PipelineCompiler, ReloadStatus, VirtualFile};
use crate::renderer::pipeline::preprocess::{Dependency, SourceResolver, VirtualEntry};
use crate::renderer::settings::PipelineManagerInfo;

// ─── Compile Descriptions ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// Where a stage's source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// A virtual file name or a path relative to the root paths.
    File(String),
    /// Inline source code. May still contain `#include` directives.
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDefine {
    pub name: String,
    pub value: String,
}

impl ShaderDefine {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCompileInfo {
    pub source: ShaderSource,
    pub entry_point: String,
    pub stage: ShaderStage,
}

/// Everything needed to build one pipeline.
///
/// `S` is device-specific fixed-function state (render target formats,
/// topology, ...), passed through untouched.
#[derive(Debug, Clone)]
pub struct PipelineCompileInfo<S> {
    pub name: String,
    pub stages: SmallVec<[ShaderCompileInfo; 2]>,
    pub defines: Vec<ShaderDefine>,
    pub state: S,
}

impl<S> PipelineCompileInfo<S> {
    /// A single-stage compute pipeline.
    #[must_use]
    pub fn compute(name: impl Into<String>, source: ShaderSource, entry_point: impl Into<String>, state: S) -> Self {
        Self {
            name: name.into(),
            stages: smallvec::smallvec![ShaderCompileInfo {
                source,
                entry_point: entry_point.into(),
                stage: ShaderStage::Compute,
            }],
            defines: Vec::new(),
            state,
        }
    }

    /// A vertex + fragment pipeline.
    #[must_use]
    pub fn raster(
        name: impl Into<String>,
        vertex: (ShaderSource, &str),
        fragment: (ShaderSource, &str),
        state: S,
    ) -> Self {
        Self {
            name: name.into(),
            stages: smallvec::smallvec![
                ShaderCompileInfo {
                    source: vertex.0,
                    entry_point: vertex.1.to_string(),
                    stage: ShaderStage::Vertex,
                },
                ShaderCompileInfo {
                    source: fragment.0,
                    entry_point: fragment.1.to_string(),
                    stage: ShaderStage::Fragment,
                },
            ],
            defines: Vec::new(),
            state,
        }
    }

    #[must_use]
    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push(ShaderDefine::new(name, value));
        self
    }
}

// ─── Device Contract ─────────────────────────────────────────────────────────

/// A stage after source resolution and include expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStage {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub code: String,
}

/// What a [`PipelineDevice`] is asked to compile.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSource<'a> {
    pub name: &'a str,
    pub stages: &'a [ResolvedStage],
    pub defines: &'a [ShaderDefine],
}

/// The graphics device collaborator. Implementations must be shareable
/// across build slots.
pub trait PipelineDevice: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;
    type Pipeline: Send + Sync + 'static;

    fn create_pipeline(
        &self,
        source: &PipelineSource<'_>,
        state: &Self::State,
    ) -> std::result::Result<Self::Pipeline, String>;

    fn is_pipeline_valid(&self, _pipeline: &Self::Pipeline) -> bool {
        true
    }
}

// ─── Managed Pipeline ────────────────────────────────────────────────────────

/// A pipeline shared between its manager and the renderer. Hot reload swaps
/// the inner object; holders always see the latest successful build.
pub struct ManagedPipeline<P> {
    name: String,
    current: RwLock<Arc<P>>,
    generation: AtomicU64,
}

impl<P> ManagedPipeline<P> {
    fn new(name: String, pipeline: P) -> Self {
        Self {
            name,
            current: RwLock::new(Arc::new(pipeline)),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The latest successfully built object.
    #[must_use]
    pub fn get(&self) -> Arc<P> {
        Arc::clone(&self.current.read())
    }

    /// Number of times the pipeline has been rebuilt by hot reload.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn replace(&self, pipeline: P) {
        *self.current.write() = Arc::new(pipeline);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl<P> std::fmt::Debug for ManagedPipeline<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedPipeline")
            .field("name", &self.name)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

// ─── Pipeline Manager ────────────────────────────────────────────────────────

struct TrackedPipeline<D: PipelineDevice> {
    info: PipelineCompileInfo<D::State>,
    dependencies: Vec<Dependency>,
    pipeline: Arc<ManagedPipeline<D::Pipeline>>,
}

/// Source-aware slot compiler with hot reload.
pub struct PipelineManager<D: PipelineDevice> {
    device: Arc<D>,
    info: PipelineManagerInfo,
    virtual_files: FxHashMap<String, VirtualEntry>,
    virtual_version: u64,
    tracked: Vec<TrackedPipeline<D>>,
}

impl<D: PipelineDevice> PipelineManager<D> {
    #[must_use]
    pub fn new(device: Arc<D>, info: PipelineManagerInfo) -> Self {
        Self {
            device,
            info,
            virtual_files: FxHashMap::default(),
            virtual_version: 0,
            tracked: Vec::new(),
        }
    }

    /// Number of pipelines watched for hot reload.
    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.tracked.len()
    }

    fn resolver(&self) -> SourceResolver<'_> {
        SourceResolver {
            virtual_files: &self.virtual_files,
            root_paths: &self.info.root_paths,
            max_include_depth: self.info.max_include_depth,
        }
    }

    fn merged_defines(&self, own: &[ShaderDefine]) -> Vec<ShaderDefine> {
        let mut merged: Vec<ShaderDefine> = Vec::with_capacity(self.info.default_defines.len() + own.len());
        for define in self.info.default_defines.iter().chain(own) {
            match merged.iter_mut().find(|d| d.name == define.name) {
                Some(existing) => existing.value.clone_from(&define.value),
                None => merged.push(define.clone()),
            }
        }
        merged
    }

    fn resolve_stages(&self, info: &PipelineCompileInfo<D::State>) -> Result<(Vec<ResolvedStage>, Vec<Dependency>)> {
        let resolver = self.resolver();
        let mut stages = Vec::with_capacity(info.stages.len());
        let mut dependencies = Vec::new();

        for stage in &info.stages {
            let resolved = match &stage.source {
                ShaderSource::File(name) => resolver.resolve_file(name)?,
                ShaderSource::Code(code) => resolver.resolve_code(code)?,
            };
            dependencies.extend(resolved.dependencies);
            stages.push(ResolvedStage {
                stage: stage.stage,
                entry_point: stage.entry_point.clone(),
                code: resolved.code,
            });
        }
        Ok((stages, dependencies))
    }

    fn build(
        &self,
        info: &PipelineCompileInfo<D::State>,
    ) -> std::result::Result<(D::Pipeline, Vec<Dependency>), String> {
        let (stages, dependencies) = self
            .resolve_stages(info)
            .map_err(|e| format!("{}: {e}", info.name))?;
        let defines = self.merged_defines(&info.defines);

        let source = PipelineSource {
            name: &info.name,
            stages: &stages,
            defines: &defines,
        };
        let pipeline = self
            .device
            .create_pipeline(&source, &info.state)
            .map_err(|e| format!("{}: {e}", info.name))?;
        // Rejected objects are never tracked or swapped in.
        if !self.device.is_pipeline_valid(&pipeline) {
            return Err(format!("{}: pipeline compiled but is not valid", info.name));
        }
        Ok((pipeline, dependencies))
    }
}

impl<D: PipelineDevice> PipelineCompiler for PipelineManager<D> {
    type Description = PipelineCompileInfo<D::State>;
    type Pipeline = Arc<ManagedPipeline<D::Pipeline>>;

    fn compile(&mut self, description: &Self::Description) -> std::result::Result<Self::Pipeline, String> {
        let (pipeline, dependencies) = self.build(description)?;
        let managed = Arc::new(ManagedPipeline::new(description.name.clone(), pipeline));

        self.tracked.push(TrackedPipeline {
            info: description.clone(),
            dependencies,
            pipeline: Arc::clone(&managed),
        });
        Ok(managed)
    }

    fn validate(&self, pipeline: &Self::Pipeline) -> bool {
        self.device.is_pipeline_valid(&pipeline.get())
    }

    fn add_virtual_file(&mut self, file: &VirtualFile) {
        self.virtual_version += 1;
        self.virtual_files.insert(
            file.name.clone(),
            VirtualEntry {
                contents: file.contents.clone(),
                version: self.virtual_version,
            },
        );
    }

    fn reload_all(&mut self) -> std::result::Result<ReloadStatus, String> {
        let mut status = ReloadStatus::NoChange;
        let mut first_error = None;

        for index in 0..self.tracked.len() {
            let tracked = &self.tracked[index];
            if !tracked.dependencies.iter().any(|dep| dep.is_stale(&self.virtual_files)) {
                continue;
            }

            match self.build(&tracked.info) {
                Ok((pipeline, dependencies)) => {
                    let tracked = &mut self.tracked[index];
                    tracked.pipeline.replace(pipeline);
                    tracked.dependencies = dependencies;
                    log::info!("Reloaded pipeline '{}'", tracked.info.name);
                    status = ReloadStatus::Reloaded;
                }
                // The previous build stays in place and is retried next reload.
                Err(message) => {
                    first_error.get_or_insert(message);
                }
            }
        }

        match first_error {
            Some(message) => Err(message),
            None => Ok(status),
        }
    }

    fn remove_pipeline(&mut self, pipeline: &Self::Pipeline) {
        self.tracked.retain(|tracked| !Arc::ptr_eq(&tracked.pipeline, pipeline));
    }
}
