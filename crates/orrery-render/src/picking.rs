//! Single-texel readback of the picking target.

use orrery_scene::{BodyId, rgb8_to_id};

use crate::targets::ColorTarget;

/// Bytes per row of the readback copy; wgpu's copy alignment.
const READBACK_ROW_BYTES: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("picking target is multisampled and cannot be read back")]
    Multisampled,
    #[error("failed to map the readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("readback callback was dropped before completing")]
    Disconnected,
}

/// Readback buffer for one texel of a [`ColorTarget`].
pub struct PickTarget {
    readback: wgpu::Buffer,
}

impl PickTarget {
    pub fn new(device: &wgpu::Device) -> Self {
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pick-readback"),
            size: READBACK_ROW_BYTES as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self { readback }
    }

    /// Read the texel at `(x, y)` of `target` and decode it to a body id.
    ///
    /// Returns `Ok(None)` outside the target or on the clear color.
    pub fn read(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &ColorTarget,
        x: u32,
        y: u32,
    ) -> Result<Option<BodyId>, PickError> {
        if target.sample_count() > 1 {
            return Err(PickError::Multisampled);
        }
        if x >= target.width() || y >= target.height() {
            return Ok(None);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pick-readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(READBACK_ROW_BYTES),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });
        rx.recv().map_err(|_| PickError::Disconnected)??;

        let texel = {
            let mapped = slice.get_mapped_range();
            [mapped[0], mapped[1], mapped[2]]
        };
        self.readback.unmap();

        let id = rgb8_to_id(texel);
        Ok((id.get() != 0).then_some(id))
    }
}
