//! Pipeline Manager Integration Tests
//!
//! Tests for:
//! - Source resolution from virtual files and root paths
//! - `#include` expansion and define merging
//! - Hot reload on virtual file and on-disk changes
//! - Keeping the last good pipeline when a reload fails
//! - Removal and use behind a build cache

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use voxel_runtime::renderer::pipeline::{
    PipelineBuildCache, PipelineCompileInfo, PipelineCompiler, PipelineDevice, PipelineManager, PipelineSource,
    ReloadStatus, ShaderDefine, ShaderSource, VirtualFile,
};
use voxel_runtime::renderer::settings::{BuildCacheSettings, PipelineManagerInfo};
use voxel_runtime::utils::{ConsoleLog, LogSink};

// ============================================================================
// Echo Device
// ============================================================================

/// Records what it was asked to build. Any stage containing `SYNTAX_ERROR`
/// fails to compile; one containing `INVALID` compiles into an object the
/// device rejects.
struct EchoDevice;

#[derive(Debug)]
struct EchoPipeline {
    stages: Vec<String>,
    defines: Vec<(String, String)>,
}

impl PipelineDevice for EchoDevice {
    type State = ();
    type Pipeline = EchoPipeline;

    fn create_pipeline(&self, source: &PipelineSource<'_>, _state: &()) -> Result<EchoPipeline, String> {
        if source.stages.iter().any(|s| s.code.contains("SYNTAX_ERROR")) {
            return Err("syntax error".to_string());
        }
        Ok(EchoPipeline {
            stages: source.stages.iter().map(|s| s.code.clone()).collect(),
            defines: source
                .defines
                .iter()
                .map(|d| (d.name.clone(), d.value.clone()))
                .collect(),
        })
    }

    fn is_pipeline_valid(&self, pipeline: &EchoPipeline) -> bool {
        !pipeline.stages.iter().any(|code| code.contains("INVALID"))
    }
}

fn manager(info: PipelineManagerInfo) -> PipelineManager<EchoDevice> {
    PipelineManager::new(Arc::new(EchoDevice), info)
}

fn compute(name: &str, file: &str) -> PipelineCompileInfo<()> {
    PipelineCompileInfo::compute(name, ShaderSource::File(file.to_string()), "main", ())
}

/// Scratch directory unique to one test.
struct TempDir(PathBuf);

impl TempDir {
    fn new(test: &str) -> Self {
        let path = std::env::temp_dir().join(format!("voxel-runtime-{}-{test}", std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.0.join(name), contents).unwrap();
    }

    /// Rewrites a file and pushes its mtime forward so coarse filesystem
    /// timestamps still register the change.
    fn touch(&self, name: &str, contents: &str) {
        let path = self.0.join(name);
        std::fs::write(&path, contents).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

// ============================================================================
// Source Resolution
// ============================================================================

#[test]
fn virtual_includes_are_expanded() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("common.wgsl", "const TILE = 8;"));
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "#include \"common.wgsl\"\nfn main() {}"));

    let pipeline = manager.compile(&compute("clear", "main.wgsl")).unwrap();
    let built = pipeline.get();

    assert_eq!(built.stages.len(), 1);
    assert!(built.stages[0].contains("const TILE = 8;"));
    assert!(built.stages[0].contains("fn main() {}"));
    assert!(!built.stages[0].contains("#include"));
    assert_eq!(pipeline.name(), "clear");
    assert_eq!(manager.pipeline_count(), 1);
}

#[test]
fn inline_code_may_include_virtual_files() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("noise.wgsl", "fn noise() {}"));

    let info = PipelineCompileInfo::raster(
        "sky",
        (ShaderSource::Code("#include <noise.wgsl>\nfn vs() {}".to_string()), "vs"),
        (ShaderSource::Code("fn fs() {}".to_string()), "fs"),
        (),
    );
    let pipeline = manager.compile(&info).unwrap();
    let built = pipeline.get();

    assert!(built.stages[0].contains("fn noise() {}"));
    assert_eq!(built.stages[1].trim(), "fn fs() {}");
}

#[test]
fn files_are_found_under_root_paths() {
    let dir = TempDir::new("root-paths");
    dir.write("lighting.wgsl", "fn light() {}");
    dir.write("main.wgsl", "#include \"lighting.wgsl\"\nfn main() {}");

    let mut manager = manager(PipelineManagerInfo {
        root_paths: vec![dir.0.clone()],
        ..Default::default()
    });
    let pipeline = manager.compile(&compute("lit", "main.wgsl")).unwrap();

    assert!(pipeline.get().stages[0].contains("fn light() {}"));
}

#[test]
fn missing_source_fails_with_pipeline_name() {
    let mut manager = manager(PipelineManagerInfo::default());
    let err = manager.compile(&compute("ghost", "missing/foo.wgsl")).unwrap_err();

    assert!(err.starts_with("ghost: "), "unexpected error: {err}");
    assert!(err.contains("missing/foo.wgsl"));
    assert_eq!(manager.pipeline_count(), 0);
}

#[test]
fn pipeline_defines_override_defaults_by_name() {
    let mut manager = manager(PipelineManagerInfo {
        default_defines: vec![ShaderDefine::new("QUALITY", "1"), ShaderDefine::new("DEBUG", "false")],
        ..Default::default()
    });
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn main() {}"));

    let info = compute("tuned", "main.wgsl").with_define("QUALITY", "3").with_define("TAA", "true");
    let pipeline = manager.compile(&info).unwrap();

    assert_eq!(
        pipeline.get().defines,
        vec![
            ("QUALITY".to_string(), "3".to_string()),
            ("DEBUG".to_string(), "false".to_string()),
            ("TAA".to_string(), "true".to_string()),
        ]
    );
}

// ============================================================================
// Hot Reload
// ============================================================================

#[test]
fn reload_without_changes_is_a_no_op() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn main() {}"));
    let pipeline = manager.compile(&compute("static", "main.wgsl")).unwrap();

    assert_eq!(manager.reload_all(), Ok(ReloadStatus::NoChange));
    assert_eq!(pipeline.generation(), 0);
}

#[test]
fn changed_virtual_include_triggers_reload() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("consts.wgsl", "const K = 1;"));
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "#include \"consts.wgsl\""));
    manager.add_virtual_file(&VirtualFile::new("other.wgsl", "fn other() {}"));

    let dependent = manager.compile(&compute("dependent", "main.wgsl")).unwrap();
    let unrelated = manager.compile(&compute("unrelated", "other.wgsl")).unwrap();
    let before = dependent.get();

    manager.add_virtual_file(&VirtualFile::new("consts.wgsl", "const K = 2;"));
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::Reloaded));

    assert!(dependent.get().stages[0].contains("const K = 2;"));
    assert_eq!(dependent.generation(), 1);
    assert_eq!(unrelated.generation(), 0);
    // Holders of the previous object keep it alive until they let go.
    assert!(before.stages[0].contains("const K = 1;"));
}

#[test]
fn touched_file_triggers_reload() {
    let dir = TempDir::new("mtime");
    dir.write("common.wgsl", "const RADIUS = 1.0;");
    dir.write("blur.wgsl", "#include \"common.wgsl\"\nfn main() {}");

    let mut manager = manager(PipelineManagerInfo {
        root_paths: vec![dir.0.clone()],
        ..Default::default()
    });
    let pipeline = manager.compile(&compute("blur", "blur.wgsl")).unwrap();
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::NoChange));

    dir.touch("common.wgsl", "const RADIUS = 2.0;");
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::Reloaded));
    assert!(pipeline.get().stages[0].contains("const RADIUS = 2.0;"));

    assert_eq!(manager.reload_all(), Ok(ReloadStatus::NoChange));
}

#[test]
fn failed_reload_keeps_the_last_good_pipeline() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn good() {}"));
    let pipeline = manager.compile(&compute("fragile", "main.wgsl")).unwrap();

    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "SYNTAX_ERROR"));
    assert_eq!(manager.reload_all(), Err("fragile: syntax error".to_string()));
    assert!(pipeline.get().stages[0].contains("fn good() {}"));
    assert_eq!(pipeline.generation(), 0);

    // Still stale, so the next reload retries it.
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn fixed() {}"));
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::Reloaded));
    assert!(pipeline.get().stages[0].contains("fn fixed() {}"));
}

#[test]
fn rejected_build_is_not_tracked() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "INVALID"));

    let err = manager.compile(&compute("rejected", "main.wgsl")).unwrap_err();
    assert_eq!(err, "rejected: pipeline compiled but is not valid");
    assert_eq!(manager.pipeline_count(), 0);

    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "INVALID again"));
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::NoChange));
}

#[test]
fn rejected_rebuild_is_not_swapped_in() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn good() {}"));
    let pipeline = manager.compile(&compute("guarded", "main.wgsl")).unwrap();

    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "INVALID"));
    assert_eq!(
        manager.reload_all(),
        Err("guarded: pipeline compiled but is not valid".to_string())
    );
    assert!(pipeline.get().stages[0].contains("fn good() {}"));
    assert_eq!(pipeline.generation(), 0);
}

#[test]
fn virtual_file_shadowing_a_disk_include_triggers_reload() {
    let dir = TempDir::new("shadow");
    dir.write("common.wgsl", "fn disk() {}");
    dir.write("main.wgsl", "#include \"common.wgsl\"\nfn main() {}");

    let mut manager = manager(PipelineManagerInfo {
        root_paths: vec![dir.0.clone()],
        ..Default::default()
    });
    let pipeline = manager.compile(&compute("shadowed", "main.wgsl")).unwrap();
    assert!(pipeline.get().stages[0].contains("fn disk() {}"));

    manager.add_virtual_file(&VirtualFile::new("common.wgsl", "fn override_() {}"));
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::Reloaded));

    let reloaded = pipeline.get();
    let code = &reloaded.stages[0];
    assert!(code.contains("fn override_() {}"));
    assert!(!code.contains("fn disk() {}"));

    // A fresh build agrees with the reloaded one.
    let fresh = manager.compile(&compute("fresh", "main.wgsl")).unwrap();
    assert_eq!(fresh.get().stages, pipeline.get().stages);
}

#[test]
fn removed_pipelines_are_no_longer_reloaded() {
    let mut manager = manager(PipelineManagerInfo::default());
    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn a() {}"));
    let kept = manager.compile(&compute("kept", "main.wgsl")).unwrap();
    let removed = manager.compile(&compute("removed", "main.wgsl")).unwrap();

    manager.remove_pipeline(&removed);
    assert_eq!(manager.pipeline_count(), 1);

    manager.add_virtual_file(&VirtualFile::new("main.wgsl", "fn b() {}"));
    assert_eq!(manager.reload_all(), Ok(ReloadStatus::Reloaded));
    assert_eq!(kept.generation(), 1);
    assert_eq!(removed.generation(), 0);
}

// ============================================================================
// Behind a Build Cache
// ============================================================================

#[test]
fn managers_serve_as_build_slots() {
    let console = Arc::new(ConsoleLog::new());
    let device = Arc::new(EchoDevice);
    let settings = BuildCacheSettings {
        slot_count: 2,
        // Inline builds keep the slot assignment deterministic: 0, 1, 0.
        worker_count: Some(0),
        ..Default::default()
    };
    let Ok(cache) = PipelineBuildCache::new(
        &settings,
        |_| PipelineManager::new(Arc::clone(&device), PipelineManagerInfo::default()),
        Arc::clone(&console) as Arc<dyn LogSink>,
    ) else {
        panic!("cache construction failed");
    };

    cache.add_virtual_file(&VirtualFile::new("shade.wgsl", "const TINT = 0;"));
    let mut first = cache.request_pipeline(compute("first", "shade.wgsl"));
    let mut second = cache.request_pipeline(compute("second", "shade.wgsl"));
    let mut broken = cache.request_pipeline(compute("broken", "nowhere.wgsl"));

    assert!(first.is_valid());
    assert!(second.is_valid());
    assert!(!broken.is_valid());
    assert_eq!(console.len(), 1);
    assert!(console.items()[0].starts_with("broken: "));

    // Both slots own one pipeline, so the last slot reports the reload too.
    cache.add_virtual_file(&VirtualFile::new("shade.wgsl", "const TINT = 1;"));
    assert_eq!(cache.reload_all().ok(), Some(ReloadStatus::Reloaded));
    assert!(first.get().get().stages[0].contains("const TINT = 1;"));
    assert!(second.get().get().stages[0].contains("const TINT = 1;"));
}
