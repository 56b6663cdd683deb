//! wgpu Ping-Pong Kinds
//!
//! [`ResourceKind`] implementations for `wgpu` textures and buffers, plus the
//! owned descriptors used to compare shapes across frames.

use crate::renderer::graph::ping_pong::{PingPongResource, ResourceKind};

/// Ping-pong pair of 2D/3D textures (e.g. reprojection or TAA history).
pub type PingPongImage = PingPongResource<TextureKind>;

/// Ping-pong pair of storage buffers (e.g. exposure or particle state).
pub type PingPongBuffer = PingPongResource<BufferKind>;

// ─── Textures ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct PingPongTextureDesc {
    pub name: String,
    pub size: wgpu::Extent3d,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub mip_level_count: u32,
    pub dimension: wgpu::TextureDimension,
}

impl PingPongTextureDesc {
    /// Single-mip 2D texture.
    #[must_use]
    pub fn new_2d(
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        Self {
            name: name.into(),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            format,
            usage,
            mip_level_count: 1,
            dimension: wgpu::TextureDimension::D2,
        }
    }
}

pub struct TextureKind;

impl ResourceKind for TextureKind {
    type Device = wgpu::Device;
    type Desc = PingPongTextureDesc;
    type Resource = wgpu::Texture;

    fn create(device: &wgpu::Device, desc: &PingPongTextureDesc) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.name),
            size: desc.size,
            mip_level_count: desc.mip_level_count,
            sample_count: 1,
            dimension: desc.dimension,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        })
    }

    fn destroy(_device: &wgpu::Device, resource: wgpu::Texture) {
        resource.destroy();
    }

    fn name(desc: &PingPongTextureDesc) -> &str {
        &desc.name
    }

    fn renamed(desc: &PingPongTextureDesc, name: String) -> PingPongTextureDesc {
        PingPongTextureDesc {
            name,
            ..desc.clone()
        }
    }
}

// ─── Buffers ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PingPongBufferDesc {
    pub name: String,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

pub struct BufferKind;

impl ResourceKind for BufferKind {
    type Device = wgpu::Device;
    type Desc = PingPongBufferDesc;
    type Resource = wgpu::Buffer;

    fn create(device: &wgpu::Device, desc: &PingPongBufferDesc) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.name),
            size: desc.size,
            usage: desc.usage,
            mapped_at_creation: false,
        })
    }

    fn destroy(_device: &wgpu::Device, resource: wgpu::Buffer) {
        resource.destroy();
    }

    fn name(desc: &PingPongBufferDesc) -> &str {
        &desc.name
    }

    fn renamed(desc: &PingPongBufferDesc, name: String) -> PingPongBufferDesc {
        PingPongBufferDesc {
            name,
            ..desc.clone()
        }
    }
}
