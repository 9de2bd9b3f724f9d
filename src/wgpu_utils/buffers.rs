// src/wgpu_utils/buffers.rs
use std::marker::PhantomData;

use crate::error::LifeError;

fn short_type_name<T>() -> &'static str {
    let type_name = std::any::type_name::<T>();
    let pos = type_name.rfind(':').unwrap_or(0);
    if pos > 0 {
        &type_name[(pos + 1)..]
    } else {
        type_name
    }
}

/// Typed uniform buffer holding a single `Content` value
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Create buffer with initial data
    pub fn new_with_data(device: &wgpu::Device, initial_content: &Content) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {}", short_type_name::<Content>())),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: true,
        });

        let mapped_memory = buffer.slice(..);
        mapped_memory
            .get_mapped_range_mut()
            .clone_from_slice(bytemuck::bytes_of(initial_content));
        buffer.unmap();

        UniformBuffer {
            buffer,
            content_type: PhantomData,
        }
    }

    /// Get binding resource
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    /// Get the underlying buffer
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Cell-state buffer readable by compute (storage) and by the vertex stage (instance data).
pub struct CellBuffer {
    buffer: wgpu::Buffer,
    len: usize,
}

impl CellBuffer {
    const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
        .union(wgpu::BufferUsages::VERTEX)
        .union(wgpu::BufferUsages::COPY_DST)
        .union(wgpu::BufferUsages::COPY_SRC);

    /// Allocates without writing; contents are whatever the device zero-fills.
    pub fn new(device: &wgpu::Device, len: usize, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (len * std::mem::size_of::<u32>()) as u64,
            usage: Self::USAGE,
            mapped_at_creation: false,
        });

        Self { buffer, len }
    }

    /// Create cell buffer with initial data
    pub fn new_with_data(device: &wgpu::Device, data: &[u32], label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of_val(data) as u64,
            usage: Self::USAGE,
            mapped_at_creation: true,
        });

        let mapped_memory = buffer.slice(..);
        mapped_memory
            .get_mapped_range_mut()
            .clone_from_slice(bytemuck::cast_slice(data));
        buffer.unmap();

        Self {
            buffer,
            len: data.len(),
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

/// Reads `size` bytes back from `source` (blocking operation)
///
/// Goes through a MAP_READ staging buffer. Used by diagnostics and tests, never by the
/// per-frame path.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>, LifeError> {
    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("staging_buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("copy_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    map_staging(device, &staging_buffer)
}

/// Maps a staging buffer that already has a copy queued into it.
pub(crate) fn map_staging(
    device: &wgpu::Device,
    staging_buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, LifeError> {
    let slice = staging_buffer.slice(..);
    let (tx, rx) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    let _ = device.poll(wgpu::MaintainBase::Wait);

    match futures::executor::block_on(rx) {
        Ok(Ok(())) => {
            let mapped = slice.get_mapped_range();
            let bytes = mapped.to_vec();
            drop(mapped);
            staging_buffer.unmap();
            Ok(bytes)
        }
        Ok(Err(err)) => Err(LifeError::Readback(err.to_string())),
        Err(_) => Err(LifeError::Readback("map callback dropped".to_string())),
    }
}
