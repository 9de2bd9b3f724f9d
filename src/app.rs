use std::{sync::Arc, time::Instant};

use anyhow::Context as _;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::error::LifeError;
use crate::gfx::{
    context::GpuContext,
    ui::{
        panel::{ControlPanel, PanelStatus},
        UiManager,
    },
};
use crate::simulation::{
    config::SimulationConfig,
    controller::SimulationController,
    grid::SeedPolicy,
    patterns::Pattern,
    pipeline::GpuPipeline,
};

/// Fixed seed for reproducible runs, e.g. `GPU_LIFE_SEED=42`.
pub const SEED_ENV: &str = "GPU_LIFE_SEED";
/// Initial grid size as `WIDTHxHEIGHT`, e.g. `GPU_LIFE_SIZE=256x128`.
pub const SIZE_ENV: &str = "GPU_LIFE_SIZE";

/// Startup settings for [`LifeApp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeOptions {
    pub config: SimulationConfig,
    pub seed: SeedPolicy,
    pub pattern: Pattern,
}

impl Default for LifeOptions {
    fn default() -> Self {
        Self {
            config: SimulationConfig::default(),
            seed: SeedPolicy::Entropy,
            pattern: Pattern::Random,
        }
    }
}

impl LifeOptions {
    /// Defaults, overridden by [`SEED_ENV`] and [`SIZE_ENV`] when set.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(SEED_ENV).ok().as_deref(),
            std::env::var(SIZE_ENV).ok().as_deref(),
        )
    }

    fn from_vars(seed: Option<&str>, size: Option<&str>) -> Self {
        let mut options = Self::default();

        if let Some(seed) = seed {
            match seed.trim().parse() {
                Ok(seed) => options.seed = SeedPolicy::Fixed(seed),
                Err(_) => log::warn!("ignoring {SEED_ENV}={seed:?}: not an integer"),
            }
        }

        if let Some(size) = size {
            match parse_size(size) {
                Some((width, height)) => options.config = options.config.with_size(width, height),
                None => log::warn!("ignoring {SIZE_ENV}={size:?}: expected WIDTHxHEIGHT"),
            }
        }

        options
    }
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

pub struct LifeApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    options: LifeOptions,
    window: Option<Arc<Window>>,
    controller: Option<SimulationController<GpuPipeline>>,
    ui_manager: Option<UiManager>,
    panel: ControlPanel,
    last_frame: Option<Instant>,
    fatal: Option<anyhow::Error>,
}

impl LifeApp {
    pub fn new(options: LifeOptions) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                options,
                window: None,
                controller: None,
                ui_manager: None,
                panel: ControlPanel::new(&options.config, options.pattern),
                last_frame: None,
                fatal: None,
            },
        })
    }

    /// Runs until the window closes or a fatal error occurs.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .context("event loop failed")?;

        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title("GPU Life")
                    .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
            )
            .context("failed to create window")?;
        let window = Arc::new(window);
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        let (context, target) =
            pollster::block_on(GpuContext::for_window(window.clone(), width, height))?;
        let pipeline = GpuPipeline::new(context, target)?;

        let ui_manager = UiManager::new(
            pipeline.context().device(),
            pipeline.context().queue(),
            pipeline.target_format(),
            &window,
        );

        let mut controller =
            SimulationController::new(pipeline, self.options.seed, self.options.pattern);
        controller.update_config(self.options.config);

        self.ui_manager = Some(ui_manager);
        self.controller = Some(controller);
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), LifeError> {
        let (Some(window), Some(controller), Some(ui_manager)) = (
            self.window.as_ref(),
            self.controller.as_mut(),
            self.ui_manager.as_mut(),
        ) else {
            return Ok(());
        };

        let now = Instant::now();
        let elapsed = self
            .last_frame
            .map(|last| now - last)
            .unwrap_or_default();
        self.last_frame = Some(now);

        let status = PanelStatus {
            generation: controller.generation(),
            state: controller.state(),
            paused: controller.is_paused(),
            grid_size: controller.config().map(|c| (c.width(), c.height())),
        };
        let panel = &mut self.panel;
        let requests = ui_manager.prepare(window, |ui| panel.build(ui, &status));

        if let Some(pattern) = requests.reset {
            controller.request_reset(pattern);
        }
        if requests.toggle_pause {
            controller.set_paused(!controller.is_paused());
        }
        if requests.step {
            controller.request_step();
        }

        let result = controller.frame(elapsed, &mut |pass| ui_manager.render(pass));
        ui_manager.end_frame();
        result?;

        controller.update_config(self.panel.snapshot());
        Ok(())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        // Handle UI input first
        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: winit::event::Event<()> = winit::event::Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            if ui_manager.handle_input(&window, &ui_event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        ..
                    },
                ..
            } => {
                if matches!(key_code, winit::keyboard::KeyCode::Escape) {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.pipeline_mut().resize(width, height);
                }
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err.into());
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
