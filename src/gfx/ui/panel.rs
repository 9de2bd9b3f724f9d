use imgui::Ui;

use crate::simulation::{
    config::{
        SimulationConfig, WorkgroupSize, MAX_DIMENSION, MAX_TIMESTEPS_PER_SECOND, MIN_DIMENSION,
        MIN_TIMESTEPS_PER_SECOND,
    },
    controller::ControllerState,
    patterns::Pattern,
};

/// Read-only facts the panel displays.
#[derive(Debug, Clone, Copy)]
pub struct PanelStatus {
    pub generation: u64,
    pub state: ControllerState,
    pub paused: bool,
    pub grid_size: Option<(u32, u32)>,
}

/// Actions the user asked for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelRequests {
    pub reset: Option<Pattern>,
    pub toggle_pause: bool,
    pub step: bool,
}

/// Editable copy of the configuration. Raw slider values are snapped on the way out.
pub struct ControlPanel {
    width: u32,
    height: u32,
    workgroup_size: WorkgroupSize,
    timesteps_per_second: u32,
    pattern: Pattern,
}

impl ControlPanel {
    pub fn new(config: &SimulationConfig, pattern: Pattern) -> Self {
        Self {
            width: config.width(),
            height: config.height(),
            workgroup_size: config.workgroup_size(),
            timesteps_per_second: config.timesteps_per_second(),
            pattern,
        }
    }

    /// The configuration as currently edited.
    pub fn snapshot(&self) -> SimulationConfig {
        SimulationConfig::clamped(
            self.width,
            self.height,
            self.workgroup_size,
            self.timesteps_per_second,
        )
    }

    pub fn build(&mut self, ui: &Ui, status: &PanelStatus) -> PanelRequests {
        let mut requests = PanelRequests::default();

        ui.window("Game of Life")
            .size([340.0, 420.0], imgui::Condition::FirstUseEver)
            .position([10.0, 10.0], imgui::Condition::FirstUseEver)
            .build(|| {
                if ui.collapsing_header("Grid", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                    ui.slider("Width", MIN_DIMENSION, MAX_DIMENSION, &mut self.width);
                    ui.slider("Height", MIN_DIMENSION, MAX_DIMENSION, &mut self.height);

                    ui.text("Workgroup size:");
                    for size in WorkgroupSize::ALL {
                        ui.same_line();
                        ui.radio_button(
                            format!("{size}x{size}"),
                            &mut self.workgroup_size,
                            size,
                        );
                    }
                }

                if ui.collapsing_header("Timing", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                    ui.slider(
                        "Ticks/s",
                        MIN_TIMESTEPS_PER_SECOND,
                        MAX_TIMESTEPS_PER_SECOND,
                        &mut self.timesteps_per_second,
                    );

                    let label = if status.paused { "Play" } else { "Pause" };
                    if ui.button(label) {
                        requests.toggle_pause = true;
                    }
                    ui.same_line();
                    if ui.button("Step") {
                        requests.step = true;
                    }
                }

                if ui.collapsing_header("Pattern", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                    for pattern in Pattern::ALL {
                        ui.radio_button(pattern.as_str(), &mut self.pattern, pattern);
                    }
                    if ui.button("Reset") {
                        requests.reset = Some(self.pattern);
                    }
                }

                ui.separator();
                ui.text(format!("Generation: {}", status.generation));
                match status.grid_size {
                    Some((width, height)) => ui.text(format!("Grid: {width}x{height}")),
                    None => ui.text("Grid: none"),
                }
                ui.text(format!("State: {:?}", status.state));
            });

        requests
    }
}
