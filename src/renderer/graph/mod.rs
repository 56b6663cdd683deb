//! Frame Graph Resources
//!
//! Long-lived resources owned by render passes across frames.
//! - [`PingPongResource`]: current/previous pair with exactly-once allocation
//! - `wgpu_resources`: texture and buffer kinds for `wgpu` (feature `wgpu`)

pub mod ping_pong;
#[cfg(feature = "wgpu")]
pub mod wgpu_resources;

pub use ping_pong::{PingPongResource, ResourceKind, ResourceRole, ResourceView};
#[cfg(feature = "wgpu")]
pub use wgpu_resources::{BufferKind, PingPongBuffer, PingPongBufferDesc, PingPongImage, PingPongTextureDesc, TextureKind};
