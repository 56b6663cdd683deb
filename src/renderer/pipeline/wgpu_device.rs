//! wgpu Pipeline Device
//!
//! [`PipelineDevice`] implementation over a `wgpu::Device`.
//!
//! Sources are WGSL. Defines are injected as leading `const` declarations,
//! and every stage is parsed and validated with `naga` before `wgpu` sees it,
//! so shader mistakes come back as readable error strings instead of device
//! validation errors.

use crate::renderer::pipeline::manager::{
    PipelineDevice, PipelineSource, ResolvedStage, ShaderDefine, ShaderStage,
};

/// Fixed-function state for a raster pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct WgpuRasterState {
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub topology: wgpu::PrimitiveTopology,
}

impl Default for WgpuRasterState {
    fn default() -> Self {
        Self {
            color_formats: vec![wgpu::TextureFormat::Rgba16Float],
            depth_format: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WgpuPipelineState {
    Compute,
    Render(WgpuRasterState),
}

#[derive(Debug, Clone)]
pub enum WgpuPipeline {
    Compute(wgpu::ComputePipeline),
    Render(wgpu::RenderPipeline),
}

impl WgpuPipeline {
    #[must_use]
    pub fn as_compute(&self) -> Option<&wgpu::ComputePipeline> {
        match self {
            Self::Compute(p) => Some(p),
            Self::Render(_) => None,
        }
    }

    #[must_use]
    pub fn as_render(&self) -> Option<&wgpu::RenderPipeline> {
        match self {
            Self::Render(p) => Some(p),
            Self::Compute(_) => None,
        }
    }
}

/// Compiles WGSL pipelines on a shared `wgpu::Device`.
pub struct WgpuPipelineDevice {
    device: wgpu::Device,
}

impl WgpuPipelineDevice {
    #[must_use]
    pub fn new(device: wgpu::Device) -> Self {
        Self { device }
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn create_module(
        &self,
        pipeline_name: &str,
        stage: &ResolvedStage,
        defines: &[ShaderDefine],
    ) -> Result<wgpu::ShaderModule, String> {
        let code = with_defines(&stage.code, defines);
        validate_wgsl(&code)?;

        Ok(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{pipeline_name} ({:?})", stage.stage)),
            source: wgpu::ShaderSource::Wgsl(code.into()),
        }))
    }
}

impl PipelineDevice for WgpuPipelineDevice {
    type State = WgpuPipelineState;
    type Pipeline = WgpuPipeline;

    fn create_pipeline(
        &self,
        source: &PipelineSource<'_>,
        state: &WgpuPipelineState,
    ) -> Result<WgpuPipeline, String> {
        let find_stage = |wanted: ShaderStage| source.stages.iter().find(|s| s.stage == wanted);

        match state {
            WgpuPipelineState::Compute => {
                let stage = find_stage(ShaderStage::Compute)
                    .ok_or_else(|| "compute pipeline has no compute stage".to_string())?;
                let module = self.create_module(source.name, stage, source.defines)?;

                let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(source.name),
                    layout: None,
                    module: &module,
                    entry_point: Some(&stage.entry_point),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                });
                Ok(WgpuPipeline::Compute(pipeline))
            }
            WgpuPipelineState::Render(raster) => {
                let vertex = find_stage(ShaderStage::Vertex)
                    .ok_or_else(|| "render pipeline has no vertex stage".to_string())?;
                let vertex_module = self.create_module(source.name, vertex, source.defines)?;
                let fragment = find_stage(ShaderStage::Fragment)
                    .map(|stage| {
                        self.create_module(source.name, stage, source.defines)
                            .map(|module| (stage, module))
                    })
                    .transpose()?;

                let targets: Vec<Option<wgpu::ColorTargetState>> = raster
                    .color_formats
                    .iter()
                    .map(|&format| {
                        Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })
                    })
                    .collect();

                let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(source.name),
                    layout: None,
                    vertex: wgpu::VertexState {
                        module: &vertex_module,
                        entry_point: Some(&vertex.entry_point),
                        buffers: &[],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: fragment.as_ref().map(|(stage, module)| wgpu::FragmentState {
                        module,
                        entry_point: Some(&stage.entry_point),
                        targets: &targets,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: raster.topology,
                        ..Default::default()
                    },
                    depth_stencil: raster.depth_format.map(|format| wgpu::DepthStencilState {
                        format,
                        depth_write_enabled: Some(true),
                        depth_compare: Some(wgpu::CompareFunction::LessEqual),
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                });
                Ok(WgpuPipeline::Render(pipeline))
            }
        }
    }
}

/// Prepends each define as a WGSL `const` declaration.
fn with_defines(code: &str, defines: &[ShaderDefine]) -> String {
    let mut out = String::with_capacity(code.len() + defines.len() * 32);
    for define in defines {
        out.push_str("const ");
        out.push_str(&define.name);
        out.push_str(" = ");
        out.push_str(&define.value);
        out.push_str(";\n");
    }
    out.push_str(code);
    out
}

/// Parses and validates WGSL with naga.
pub fn validate_wgsl(code: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(code).map_err(|e| e.emit_to_string(code))?;
    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&module)
        .map_err(|e| e.to_string())?;
    Ok(())
}
