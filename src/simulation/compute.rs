//! Compute stage: one Game of Life generation per dispatch
//!
//! A pipeline is compiled for every [`WorkgroupSize`] up front, so switching sizes at
//! runtime never compiles shaders. Bind groups are rebuilt whenever the grid buffers are.

use std::collections::HashMap;

use wgpu::{BindGroup, BindGroupLayout, CommandEncoder, ComputePipeline, Device, ShaderStages};

use super::{
    config::WorkgroupSize,
    grid::{BufferRole, GridBuffers},
};
use crate::error::{FrameError, InitError};
use crate::wgpu_utils::{
    layout_entry, storage_buffer_read_only, storage_buffer_read_write, uniform, validated,
};

const LIFE_SHADER: &str = include_str!("life.wgsl");

/// Bind groups for both directions of the ping-pong.
struct PingPongBindGroups {
    a_to_b: BindGroup,
    b_to_a: BindGroup,
}

pub struct ComputeStage {
    bind_group_layout: BindGroupLayout,
    pipelines: HashMap<WorkgroupSize, ComputePipeline>,
    bind_groups: Option<PingPongBindGroups>,
}

impl ComputeStage {
    /// Compiles the life kernel for every workgroup size.
    ///
    /// Any compilation or validation failure is fatal: no partial stage is returned.
    pub fn new(device: &Device) -> Result<Self, InitError> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Life Compute Bind Group Layout"),
            entries: &[
                layout_entry(0, ShaderStages::COMPUTE, storage_buffer_read_only()),
                layout_entry(1, ShaderStages::COMPUTE, storage_buffer_read_write()),
                layout_entry(2, ShaderStages::COMPUTE, uniform()),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Life Compute Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines = HashMap::new();
        for size in WorkgroupSize::ALL {
            let label = format!("Life Compute {size}x{size}");
            let source = LIFE_SHADER.replace("WORKGROUP_SIZE", &size.get().to_string());

            let pipeline = validated(device, &label, || {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                });

                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&label),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                })
            })?;

            pipelines.insert(size, pipeline);
        }

        log::info!(
            "compute stage ready ({} workgroup variants)",
            pipelines.len()
        );

        Ok(Self {
            bind_group_layout,
            pipelines,
            bind_groups: None,
        })
    }

    /// Points the stage at a freshly (re)initialized grid.
    pub fn bind(&mut self, device: &Device, grid: &GridBuffers) {
        let create = |input: BufferRole, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: grid.cells(input).binding_resource(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: grid.cells(input.swap()).binding_resource(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: grid.size_uniform().binding_resource(),
                    },
                ],
            })
        };

        self.bind_groups = Some(PingPongBindGroups {
            a_to_b: create(BufferRole::A, "Life Bind Group A->B"),
            b_to_a: create(BufferRole::B, "Life Bind Group B->A"),
        });
    }

    /// Records one generation: reads `input`, writes the other buffer.
    pub fn dispatch(
        &self,
        encoder: &mut CommandEncoder,
        grid: &GridBuffers,
        input: BufferRole,
        workgroup_size: WorkgroupSize,
    ) -> Result<(), FrameError> {
        let bind_groups = self.bind_groups.as_ref().ok_or(FrameError::MissingGrid)?;
        let bind_group = match input {
            BufferRole::A => &bind_groups.a_to_b,
            BufferRole::B => &bind_groups.b_to_a,
        };
        let pipeline = &self.pipelines[&workgroup_size];
        let (groups_x, groups_y) = grid.descriptor().workgroups(workgroup_size);

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Life Compute Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(pipeline);
        compute_pass.set_bind_group(0, bind_group, &[]);
        compute_pass.dispatch_workgroups(groups_x, groups_y, 1);

        Ok(())
    }
}
