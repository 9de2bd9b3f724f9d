//! Instanced cell renderer
//!
//! Draws one quad per grid cell straight from a cell buffer. The buffer is bound as
//! per-instance vertex data, so nothing is copied to the host.

use wgpu::{
    BindGroup, BindGroupLayout, CommandEncoder, Device, RenderPipeline, ShaderStages,
    TextureFormat, TextureView,
};

use super::quad::{cell_instance_desc, QuadGeometry, QuadVertex};
use crate::error::{FrameError, InitError};
use crate::simulation::grid::{BufferRole, GridBuffers};
use crate::wgpu_utils::{layout_entry, uniform, validated};

/// Clear colour behind the cells.
pub const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.2,
    b: 0.3,
    a: 1.0,
};

pub struct RenderStage {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    size_bind_group: Option<BindGroup>,
}

impl RenderStage {
    pub fn new(device: &Device, format: TextureFormat) -> Result<Self, InitError> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cell Render Bind Group Layout"),
            entries: &[layout_entry(0, ShaderStages::VERTEX, uniform())],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cell Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "Cell Render Pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Cell Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("cells.wgsl").into()),
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Cell Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[QuadVertex::desc(), cell_instance_desc()],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                    unclipped_depth: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            })
        })?;

        log::info!("render stage ready ({format:?})");

        Ok(Self {
            pipeline,
            bind_group_layout,
            size_bind_group: None,
        })
    }

    /// Binds the size uniform of a freshly (re)initialized grid.
    pub fn bind(&mut self, device: &Device, grid: &GridBuffers) {
        self.size_bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cell Render Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: grid.size_uniform().binding_resource(),
            }],
        }));
    }

    /// Records a pass that clears `view` and draws every live cell of `source`.
    pub fn draw(
        &self,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        grid: &GridBuffers,
        source: BufferRole,
        quad: &QuadGeometry,
    ) -> Result<(), FrameError> {
        let bind_group = self.size_bind_group.as_ref().ok_or(FrameError::MissingGrid)?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Cell Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(BACKGROUND),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.set_vertex_buffer(0, quad.vertex_buffer().slice(..));
        render_pass.set_vertex_buffer(1, grid.cells(source).buffer().slice(..));
        render_pass.draw(0..quad.vertex_count(), 0..grid.instance_count());

        Ok(())
    }
}
