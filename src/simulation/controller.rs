//! Simulation controller
//!
//! Drives a [`LifePipeline`] once per displayed frame. It decides when a generation is due,
//! which buffer is the input, and when the grid has to be rebuilt. All of its state lives
//! on the calling thread; the GPU only ever sees the roles it is handed.

use std::time::Duration;

use super::{
    config::SimulationConfig,
    grid::{BufferRole, GridDescriptor, InitialPopulation, SeedPolicy},
    patterns::Pattern,
    pipeline::{FrameWork, LifePipeline, OverlayPass},
    timing::FixedTimestep,
};
use crate::error::LifeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No grid exists yet.
    Idle,
    /// Grid allocated, no generation computed since.
    Ready,
    /// At least one generation computed.
    Running,
}

/// What a call to [`SimulationController::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing was submitted.
    Skipped,
    /// The grid was rebuilt; nothing was drawn.
    Reinitialized,
    /// One generation was computed and drawn.
    Stepped,
    /// The current generation was drawn again.
    Redrawn,
}

pub struct SimulationController<P: LifePipeline> {
    pipeline: P,
    seed: SeedPolicy,
    pattern: Pattern,
    pending_population: Option<InitialPopulation>,
    config: Option<SimulationConfig>,
    timestep: FixedTimestep,
    state: ControllerState,
    dirty: bool,
    input: BufferRole,
    paused: bool,
    step_requested: bool,
    generation: u64,
}

impl<P: LifePipeline> SimulationController<P> {
    pub fn new(pipeline: P, seed: SeedPolicy, pattern: Pattern) -> Self {
        Self {
            pipeline,
            seed,
            pattern,
            pending_population: None,
            config: None,
            timestep: FixedTimestep::new(SimulationConfig::default().timesteps_per_second()),
            state: ControllerState::Idle,
            dirty: false,
            input: BufferRole::A,
            paused: false,
            step_requested: false,
            generation: 0,
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    pub fn config(&self) -> Option<&SimulationConfig> {
        self.config.as_ref()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The buffer the next dispatch reads, which is also the one last drawn.
    pub fn input(&self) -> BufferRole {
        self.input
    }

    /// Generations computed since the last reinitialization.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Takes a configuration snapshot.
    ///
    /// A new grid layout marks the controller dirty. A new rate applies immediately.
    pub fn update_config(&mut self, snapshot: SimulationConfig) {
        match &self.config {
            None => self.dirty = true,
            Some(current) if current.layout_differs(&snapshot) => {
                log::info!(
                    "grid layout changed to {}x{} (workgroup {})",
                    snapshot.width(),
                    snapshot.height(),
                    snapshot.workgroup_size()
                );
                self.dirty = true;
            }
            Some(_) => {}
        }
        self.timestep.set_rate(snapshot.timesteps_per_second());
        self.config = Some(snapshot);
    }

    /// Rebuilds the grid with `pattern` on the next frame, keeping the layout.
    pub fn request_reset(&mut self, pattern: Pattern) {
        self.pattern = pattern;
        self.pending_population = None;
        self.dirty = true;
    }

    /// Rebuilds the grid with explicit contents on the next frame.
    pub fn request_population(&mut self, population: InitialPopulation) {
        self.pending_population = Some(population);
        self.dirty = true;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Computes one generation on the next frame, paused or not.
    pub fn request_step(&mut self) {
        self.step_requested = true;
    }

    /// Runs one displayed frame.
    ///
    /// Frame errors are logged and the frame is skipped without consuming time. Errors
    /// from reinitialization are returned.
    pub fn frame(
        &mut self,
        elapsed: Duration,
        overlay: &mut dyn FnMut(OverlayPass<'_>),
    ) -> Result<FrameOutcome, LifeError> {
        let Some(config) = self.config else {
            return Ok(FrameOutcome::Skipped);
        };

        if self.state == ControllerState::Idle || self.dirty {
            self.reinitialize(&config)?;
            return Ok(FrameOutcome::Reinitialized);
        }

        if !self.paused {
            self.timestep.accumulate(elapsed);
        }
        let tick_due = !self.paused && self.timestep.is_due();

        if tick_due || self.step_requested {
            let work = FrameWork::step(self.input, config.workgroup_size());
            match self.pipeline.submit_frame(work, overlay) {
                Ok(()) => {
                    if tick_due {
                        self.timestep.consume();
                    }
                    self.step_requested = false;
                    self.input = self.input.swap();
                    self.generation += 1;
                    self.state = ControllerState::Running;
                    Ok(FrameOutcome::Stepped)
                }
                Err(err) => {
                    log::warn!("skipping frame: {err}");
                    Ok(FrameOutcome::Skipped)
                }
            }
        } else {
            match self.pipeline.submit_frame(FrameWork::redraw(self.input), overlay) {
                Ok(()) => Ok(FrameOutcome::Redrawn),
                Err(err) => {
                    log::warn!("skipping frame: {err}");
                    Ok(FrameOutcome::Skipped)
                }
            }
        }
    }

    fn reinitialize(&mut self, config: &SimulationConfig) -> Result<(), LifeError> {
        self.pipeline.wait_idle()?;

        let population = self
            .pending_population
            .take()
            .unwrap_or_else(|| self.seed.population(self.pattern));
        if let InitialPopulation::Random { seed } = population {
            log::info!("seeding grid with {seed}");
        }

        self.pipeline.reinitialize(
            &GridDescriptor::from(config),
            config.workgroup_size(),
            population,
        )?;

        self.input = BufferRole::A;
        self.dirty = false;
        self.generation = 0;
        self.step_requested = false;
        self.timestep.reset();
        self.state = ControllerState::Ready;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AllocationError, FrameError};
    use crate::simulation::config::WorkgroupSize;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        WaitIdle,
        Reinitialize(GridDescriptor, WorkgroupSize, InitialPopulation),
        Submit(FrameWork),
    }

    #[derive(Default)]
    struct RecordingPipeline {
        calls: Vec<Call>,
        fail_submits: u32,
        fail_reinitialize: bool,
    }

    impl RecordingPipeline {
        fn submits(&self) -> Vec<FrameWork> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Submit(work) => Some(*work),
                    _ => None,
                })
                .collect()
        }

        fn reinitializations(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Reinitialize(..)))
                .count()
        }
    }

    impl LifePipeline for RecordingPipeline {
        fn reinitialize(
            &mut self,
            descriptor: &GridDescriptor,
            workgroup_size: WorkgroupSize,
            population: InitialPopulation,
        ) -> Result<(), LifeError> {
            if self.fail_reinitialize {
                return Err(AllocationError::TooLarge {
                    requested: descriptor.byte_len(),
                    limit: 0,
                }
                .into());
            }
            self.calls
                .push(Call::Reinitialize(*descriptor, workgroup_size, population));
            Ok(())
        }

        fn wait_idle(&mut self) -> Result<(), LifeError> {
            self.calls.push(Call::WaitIdle);
            Ok(())
        }

        fn submit_frame(
            &mut self,
            work: FrameWork,
            _overlay: &mut dyn FnMut(OverlayPass<'_>),
        ) -> Result<(), FrameError> {
            if self.fail_submits > 0 {
                self.fail_submits -= 1;
                return Err(FrameError::MissingGrid);
            }
            self.calls.push(Call::Submit(work));
            Ok(())
        }
    }

    const TICK: Duration = Duration::from_millis(250);

    fn controller() -> SimulationController<RecordingPipeline> {
        let mut controller = SimulationController::new(
            RecordingPipeline::default(),
            SeedPolicy::Fixed(7),
            Pattern::Random,
        );
        controller.update_config(SimulationConfig::default());
        controller
    }

    fn frame(
        controller: &mut SimulationController<RecordingPipeline>,
        elapsed: Duration,
    ) -> FrameOutcome {
        controller.frame(elapsed, &mut |_| {}).unwrap()
    }

    #[test]
    fn test_no_config_skips() {
        let mut controller = SimulationController::new(
            RecordingPipeline::default(),
            SeedPolicy::Fixed(7),
            Pattern::Random,
        );
        assert_eq!(frame(&mut controller, TICK), FrameOutcome::Skipped);
        assert!(controller.pipeline().calls.is_empty());
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_first_frame_reinitializes_without_drawing() {
        let mut controller = controller();
        assert_eq!(frame(&mut controller, TICK), FrameOutcome::Reinitialized);
        assert_eq!(controller.state(), ControllerState::Ready);
        assert!(!controller.is_dirty());
        assert_eq!(
            controller.pipeline().calls,
            vec![
                Call::WaitIdle,
                Call::Reinitialize(
                    GridDescriptor::new(64, 64),
                    WorkgroupSize::Eight,
                    InitialPopulation::Random { seed: 7 }
                ),
            ]
        );
    }

    #[test]
    fn test_draw_source_is_dispatch_output_and_roles_swap() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);

        for _ in 0..4 {
            assert_eq!(frame(&mut controller, TICK), FrameOutcome::Stepped);
        }
        assert_eq!(controller.state(), ControllerState::Running);
        assert_eq!(controller.generation(), 4);

        let submits = controller.pipeline().submits();
        let inputs: Vec<_> = submits.iter().map(|w| w.dispatch().unwrap().input).collect();
        assert_eq!(
            inputs,
            vec![BufferRole::A, BufferRole::B, BufferRole::A, BufferRole::B]
        );
        for work in &submits {
            assert_eq!(work.draw(), work.dispatch().unwrap().input.swap());
        }
        assert_eq!(controller.input(), BufferRole::A);
    }

    #[test]
    fn test_idle_frames_redraw_current_input() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);
        frame(&mut controller, TICK);

        assert_eq!(
            frame(&mut controller, Duration::from_millis(10)),
            FrameOutcome::Redrawn
        );
        let last = *controller.pipeline().submits().last().unwrap();
        assert_eq!(last, FrameWork::redraw(BufferRole::B));
        assert_eq!(controller.generation(), 1);
    }

    #[test]
    fn test_at_most_one_dispatch_per_frame() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);
        assert_eq!(frame(&mut controller, TICK * 10), FrameOutcome::Stepped);
        assert_eq!(controller.pipeline().submits().len(), 1);
    }

    #[test]
    fn test_layout_change_marks_dirty_and_skips() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);
        frame(&mut controller, TICK);

        controller.update_config(SimulationConfig::default().with_size(128, 32));
        assert!(controller.is_dirty());

        let before = controller.pipeline().submits().len();
        assert_eq!(frame(&mut controller, TICK), FrameOutcome::Reinitialized);
        assert_eq!(controller.pipeline().submits().len(), before);
        assert_eq!(controller.input(), BufferRole::A);
        assert_eq!(controller.generation(), 0);
        assert_eq!(controller.pipeline().reinitializations(), 2);

        let calls = &controller.pipeline().calls;
        let n = calls.len();
        assert_eq!(calls[n - 2], Call::WaitIdle);
        assert!(matches!(
            calls[n - 1],
            Call::Reinitialize(d, _, _) if d == GridDescriptor::new(128, 32)
        ));
    }

    #[test]
    fn test_workgroup_change_marks_dirty() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);
        controller.update_config(
            SimulationConfig::default().with_workgroup_size(WorkgroupSize::Sixteen),
        );
        assert!(controller.is_dirty());
    }

    #[test]
    fn test_timestep_change_does_not_dirty() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);
        controller.update_config(SimulationConfig::default().with_timesteps_per_second(60));
        assert!(!controller.is_dirty());

        // 60 ticks per second: 20ms is enough for a generation
        assert_eq!(
            frame(&mut controller, Duration::from_millis(20)),
            FrameOutcome::Stepped
        );
        assert_eq!(controller.pipeline().reinitializations(), 1);
    }

    #[test]
    fn test_transient_errors_are_swallowed_without_consuming_time() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);

        controller.pipeline_mut().fail_submits = 1;
        assert_eq!(frame(&mut controller, TICK), FrameOutcome::Skipped);
        assert_eq!(controller.generation(), 0);
        assert_eq!(controller.input(), BufferRole::A);

        // the tick is still due on the next frame
        assert_eq!(frame(&mut controller, Duration::ZERO), FrameOutcome::Stepped);
        assert_eq!(controller.generation(), 1);
    }

    #[test]
    fn test_allocation_errors_propagate() {
        let mut controller = controller();
        controller.pipeline_mut().fail_reinitialize = true;
        let err = controller.frame(TICK, &mut |_| {}).unwrap_err();
        assert!(matches!(err, LifeError::Allocation(_)));
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_pause_and_single_step() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);

        controller.set_paused(true);
        assert!(controller.is_paused());
        assert_eq!(frame(&mut controller, TICK * 4), FrameOutcome::Redrawn);
        assert_eq!(controller.generation(), 0);

        controller.request_step();
        assert_eq!(frame(&mut controller, Duration::ZERO), FrameOutcome::Stepped);
        assert_eq!(frame(&mut controller, Duration::ZERO), FrameOutcome::Redrawn);
        assert_eq!(controller.generation(), 1);
    }

    #[test]
    fn test_reset_uses_pattern() {
        let mut controller = controller();
        frame(&mut controller, Duration::ZERO);
        frame(&mut controller, TICK);

        controller.request_reset(Pattern::Glider);
        assert!(controller.is_dirty());
        assert_eq!(frame(&mut controller, Duration::ZERO), FrameOutcome::Reinitialized);
        assert!(matches!(
            controller.pipeline().calls.last(),
            Some(Call::Reinitialize(_, _, InitialPopulation::Pattern(Pattern::Glider)))
        ));
        assert_eq!(controller.generation(), 0);
    }

    #[test]
    fn test_explicit_population_is_used_once() {
        let mut controller = controller();
        controller.request_population(InitialPopulation::Cells(vec![1, 0, 1]));
        frame(&mut controller, Duration::ZERO);
        assert!(matches!(
            controller.pipeline().calls.last(),
            Some(Call::Reinitialize(_, _, InitialPopulation::Cells(_)))
        ));

        controller.update_config(SimulationConfig::default().with_size(32, 32));
        frame(&mut controller, Duration::ZERO);
        assert!(matches!(
            controller.pipeline().calls.last(),
            Some(Call::Reinitialize(_, _, InitialPopulation::Random { seed: 7 }))
        ));
    }
}
