//! Destinations for decoded frames.

use crate::transport::{Frame, FrameHandle};

/// Receives the latest frame on every redraw.
pub trait FramePresenter {
    /// Draw `frame`. Called again with the same frame when nothing new
    /// arrived.
    fn present(&mut self, frame: &Frame);
}

/// Presenter that keeps the last frame in memory, for headless use.
#[derive(Debug, Default)]
pub struct RetainedFrame {
    handle: Option<FrameHandle>,
    pixels: Vec<u8>,
    uploads: u64,
}

impl RetainedFrame {
    /// Handle of the retained frame.
    #[must_use]
    pub const fn handle(&self) -> Option<FrameHandle> {
        self.handle
    }

    /// RGBA8 pixels of the retained frame.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of distinct frames copied in.
    #[must_use]
    pub const fn uploads(&self) -> u64 {
        self.uploads
    }
}

impl FramePresenter for RetainedFrame {
    fn present(&mut self, frame: &Frame) {
        if self.handle == Some(frame.handle) {
            return;
        }
        self.pixels.clear();
        self.pixels.extend_from_slice(&frame.pixels);
        self.handle = Some(frame.handle);
        self.uploads += 1;
    }
}

#[cfg(feature = "gpu")]
pub use gpu::TexturePresenter;

#[cfg(feature = "gpu")]
mod gpu {
    use super::FramePresenter;
    use crate::transport::{Frame, FrameHandle};

    /// Frame texture sized to the current resolution.
    struct FrameTexture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
    }

    impl FrameTexture {
        fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Remote Frame"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view =
                texture.create_view(&wgpu::TextureViewDescriptor::default());
            Self {
                texture,
                view,
                width,
                height,
            }
        }
    }

    /// Uploads frames into a sampled `wgpu` texture, recreated on resize.
    pub struct TexturePresenter {
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: Option<FrameTexture>,
        uploaded: Option<FrameHandle>,
    }

    impl TexturePresenter {
        /// Presenter uploading through `queue`.
        #[must_use]
        pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
            Self {
                device,
                queue,
                target: None,
                uploaded: None,
            }
        }

        /// View of the frame texture for binding in the host's draw pass.
        #[must_use]
        pub fn view(&self) -> Option<&wgpu::TextureView> {
            self.target.as_ref().map(|t| &t.view)
        }

        /// Handle of the frame currently in the texture.
        #[must_use]
        pub const fn uploaded(&self) -> Option<FrameHandle> {
            self.uploaded
        }
    }

    impl FramePresenter for TexturePresenter {
        fn present(&mut self, frame: &Frame) {
            if self.uploaded == Some(frame.handle) {
                return;
            }
            let FrameHandle { width, height, .. } = frame.handle;
            if frame.pixels.len() != Frame::byte_len(width, height) {
                log::warn!("Skipping frame with mismatched pixel buffer");
                return;
            }
            let target = match self.target.take() {
                Some(t) if t.width == width && t.height == height => t,
                _ => FrameTexture::new(&self.device, width, height),
            };
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &target.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &frame.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            self.target = Some(target);
            self.uploaded = Some(frame.handle);
        }
    }
}
