//! The GPU side of the simulation
//!
//! [`LifePipeline`] is everything the controller needs from the GPU: reallocate the grid,
//! wait for in-flight work, and submit one frame. [`GpuPipeline`] implements it with wgpu.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use wgpu::{CommandEncoder, Device, Queue, TextureView};

use super::{
    compute::ComputeStage,
    config::WorkgroupSize,
    grid::{BufferRole, GridBuffers, GridDescriptor, InitialPopulation},
};
use crate::error::{FrameError, InitError, LifeError};
use crate::gfx::{
    context::{FrameTarget, GpuContext},
    rendering::{cell_renderer::RenderStage, quad::QuadGeometry},
};
use crate::wgpu_utils::read_buffer;

/// How often [`GpuPipeline::wait_idle`] polls before giving up.
const MAX_IDLE_POLLS: u32 = 16;

/// A compute step: read `input`, write the other buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub input: BufferRole,
    pub workgroup_size: WorkgroupSize,
}

/// The work recorded into one frame's command buffer.
///
/// Built through [`FrameWork::step`] or [`FrameWork::redraw`], so a step always draws the
/// buffer it just wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameWork {
    dispatch: Option<Dispatch>,
    draw: BufferRole,
}

impl FrameWork {
    /// Advance one generation from `input` and draw the result.
    pub fn step(input: BufferRole, workgroup_size: WorkgroupSize) -> Self {
        Self {
            dispatch: Some(Dispatch {
                input,
                workgroup_size,
            }),
            draw: input.swap(),
        }
    }

    /// Draw `role` without computing anything.
    pub fn redraw(role: BufferRole) -> Self {
        Self {
            dispatch: None,
            draw: role,
        }
    }

    pub fn dispatch(&self) -> Option<Dispatch> {
        self.dispatch
    }

    pub fn draw(&self) -> BufferRole {
        self.draw
    }
}

/// Handed to the overlay callback after the cells are recorded, before submission.
pub struct OverlayPass<'a> {
    pub device: &'a Device,
    pub queue: &'a Queue,
    pub encoder: &'a mut CommandEncoder,
    pub view: &'a TextureView,
}

pub trait LifePipeline {
    /// Replaces the grid buffers. Callers must [`wait_idle`](Self::wait_idle) first.
    fn reinitialize(
        &mut self,
        descriptor: &GridDescriptor,
        workgroup_size: WorkgroupSize,
        population: InitialPopulation,
    ) -> Result<(), LifeError>;

    /// Blocks until every submitted frame has finished on the GPU.
    fn wait_idle(&mut self) -> Result<(), LifeError>;

    /// Records `work` plus the overlay into one command buffer, submits and presents it.
    fn submit_frame(
        &mut self,
        work: FrameWork,
        overlay: &mut dyn FnMut(OverlayPass<'_>),
    ) -> Result<(), FrameError>;
}

/// Counts submissions against completions reported by the queue.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    submitted: u64,
    completed: Arc<AtomicU64>,
}

impl SubmissionTracker {
    /// Call right after `queue.submit`.
    pub fn track(&mut self, queue: &Queue) {
        self.submitted += 1;
        let completed = Arc::clone(&self.completed);
        queue.on_submitted_work_done(move || {
            completed.fetch_add(1, Ordering::Release);
        });
    }

    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed.load(Ordering::Acquire))
    }
}

pub struct GpuPipeline {
    context: GpuContext,
    target: FrameTarget,
    compute: ComputeStage,
    render: RenderStage,
    quad: QuadGeometry,
    grid: Option<GridBuffers>,
    tracker: SubmissionTracker,
}

impl GpuPipeline {
    /// Builds both stages for `target`. Shader problems surface here, not mid-frame.
    pub fn new(context: GpuContext, target: FrameTarget) -> Result<Self, InitError> {
        let device = context.device();
        let compute = ComputeStage::new(device)?;
        let render = RenderStage::new(device, target.format())?;
        let quad = QuadGeometry::new(device);

        Ok(Self {
            context,
            target,
            compute,
            render,
            quad,
            grid: None,
            tracker: SubmissionTracker::default(),
        })
    }

    /// A pipeline drawing into a `width` x `height` offscreen texture.
    pub async fn headless(width: u32, height: u32) -> Result<Self, InitError> {
        let (context, target) = GpuContext::headless(width, height).await?;
        Self::new(context, target)
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target.format()
    }

    pub fn grid(&self) -> Option<&GridBuffers> {
        self.grid.as_ref()
    }

    pub fn in_flight(&self) -> u64 {
        self.tracker.in_flight()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.target.resize(self.context.device(), width, height);
    }

    /// Copies the contents of one grid buffer back to the host.
    pub fn read_cells(&self, role: BufferRole) -> Result<Vec<u32>, LifeError> {
        let grid = self.grid.as_ref().ok_or(FrameError::MissingGrid)?;
        let cells = grid.cells(role);
        let bytes = read_buffer(
            self.context.device(),
            self.context.queue(),
            cells.buffer(),
            cells.size(),
        )?;
        Ok(bytemuck::pod_collect_to_vec(bytes.as_slice()))
    }

    /// RGBA pixels of the offscreen target, row by row.
    pub fn read_target(&self) -> Result<Vec<u8>, LifeError> {
        self.target
            .read_pixels(self.context.device(), self.context.queue())
    }
}

impl LifePipeline for GpuPipeline {
    fn reinitialize(
        &mut self,
        descriptor: &GridDescriptor,
        workgroup_size: WorkgroupSize,
        population: InitialPopulation,
    ) -> Result<(), LifeError> {
        let device = self.context.device();
        let grid = GridBuffers::reinitialize(device, *descriptor, &population)?;

        self.compute.bind(device, &grid);
        self.render.bind(device, &grid);
        self.grid = Some(grid);

        let (groups_x, groups_y) = descriptor.workgroups(workgroup_size);
        log::debug!(
            "dispatching {groups_x}x{groups_y} workgroups of {workgroup_size}x{workgroup_size}"
        );
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), LifeError> {
        for _ in 0..MAX_IDLE_POLLS {
            if self.tracker.in_flight() == 0 {
                return Ok(());
            }
            let _ = self.context.device().poll(wgpu::MaintainBase::Wait);
        }

        match self.tracker.in_flight() {
            0 => Ok(()),
            in_flight => Err(LifeError::DeviceStalled { in_flight }),
        }
    }

    fn submit_frame(
        &mut self,
        work: FrameWork,
        overlay: &mut dyn FnMut(OverlayPass<'_>),
    ) -> Result<(), FrameError> {
        let grid = self.grid.as_ref().ok_or(FrameError::MissingGrid)?;
        let device = self.context.device();
        let queue = self.context.queue();

        let frame = self.target.acquire(device)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Life Frame Encoder"),
        });

        if let Some(dispatch) = work.dispatch() {
            self.compute
                .dispatch(&mut encoder, grid, dispatch.input, dispatch.workgroup_size)?;
        }
        self.render
            .draw(&mut encoder, &frame.view, grid, work.draw(), &self.quad)?;

        overlay(OverlayPass {
            device,
            queue,
            encoder: &mut encoder,
            view: &frame.view,
        });

        queue.submit(std::iter::once(encoder.finish()));
        self.tracker.track(queue);
        frame.present();

        Ok(())
    }
}
