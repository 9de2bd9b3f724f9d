//! GPU device setup and frame targets
//!
//! [`GpuContext`] owns the instance, adapter, device and queue. [`FrameTarget`] is what a
//! frame is drawn into: a window surface, or an offscreen texture when running headless.

use std::sync::Arc;

use wgpu::{Device, Queue, SurfaceTexture, TextureFormat, TextureView};
use winit::window::Window;

use crate::error::{FrameError, InitError, LifeError};
use crate::wgpu_utils::buffers::map_staging;

/// Format of the offscreen target used when no window exists.
pub const OFFSCREEN_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

pub struct GpuContext {
    #[allow(dead_code)]
    instance: wgpu::Instance, // Keep instance alive for the lifetime of the device
    adapter: wgpu::Adapter,
    device: Device,
    queue: Queue,
}

impl GpuContext {
    /// Creates a device that can present to `window`.
    pub async fn for_window(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<(Self, FrameTarget), InitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let context = Self::with_adapter(instance, adapter).await?;

        let surface_capabilities = surface.get_capabilities(&context.adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(InitError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_capabilities
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);

        Ok((context, FrameTarget::Surface { surface, config }))
    }

    /// Creates a device with no window, drawing into an offscreen texture.
    pub async fn headless(width: u32, height: u32) -> Result<(Self, FrameTarget), InitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;

        let context = Self::with_adapter(instance, adapter).await?;
        let target = FrameTarget::offscreen(&context.device, width, height);

        Ok((context, target))
    }

    async fn with_adapter(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
    ) -> Result<Self, InitError> {
        let downlevel_caps = adapter.get_downlevel_capabilities();
        if !downlevel_caps
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(InitError::ComputeUnsupported);
        }

        log::info!("using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Life Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096, // Allow higher resolutions on native
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }
}

/// Where a frame is drawn.
pub enum FrameTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// A target texture acquired for one frame.
pub struct AcquiredFrame {
    pub view: TextureView,
    surface_texture: Option<SurfaceTexture>,
}

impl AcquiredFrame {
    /// Presents to the window, if there is one. Offscreen frames stay in the texture.
    pub fn present(self) {
        if let Some(surface_texture) = self.surface_texture {
            surface_texture.present();
        }
    }
}

impl FrameTarget {
    pub fn offscreen(device: &Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        FrameTarget::Offscreen { texture }
    }

    pub fn format(&self) -> TextureFormat {
        match self {
            FrameTarget::Surface { config, .. } => config.format,
            FrameTarget::Offscreen { texture } => texture.format(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            FrameTarget::Surface { config, .. } => (config.width, config.height),
            FrameTarget::Offscreen { texture } => (texture.width(), texture.height()),
        }
    }

    /// Gets the texture for this frame.
    ///
    /// A lost or outdated surface is reconfigured and reported; the next frame retries.
    pub fn acquire(&mut self, device: &Device) -> Result<AcquiredFrame, FrameError> {
        match self {
            FrameTarget::Surface { surface, config } => {
                let surface_texture = match surface.get_current_texture() {
                    Ok(surface_texture) => surface_texture,
                    Err(err) => {
                        if matches!(err, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
                        {
                            surface.configure(device, config);
                        }
                        return Err(err.into());
                    }
                };
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(AcquiredFrame {
                    view,
                    surface_texture: Some(surface_texture),
                })
            }
            FrameTarget::Offscreen { texture } => Ok(AcquiredFrame {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            }),
        }
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        match self {
            FrameTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
            FrameTarget::Offscreen { .. } => {
                *self = FrameTarget::offscreen(device, width, height);
            }
        }
    }

    /// Reads the offscreen texture back as tightly packed RGBA rows.
    pub fn read_pixels(&self, device: &Device, queue: &Queue) -> Result<Vec<u8>, LifeError> {
        let FrameTarget::Offscreen { texture } = self else {
            return Err(LifeError::Readback(
                "only offscreen targets can be read back".to_string(),
            ));
        };

        let (width, height) = (texture.width(), texture.height());
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen Readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Offscreen Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let padded = map_staging(device, &staging_buffer)?;
        Ok(padded
            .chunks(padded_bytes_per_row as usize)
            .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
            .copied()
            .collect())
    }
}
