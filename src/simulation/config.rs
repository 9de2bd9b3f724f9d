//! Simulation configuration snapshot
//!
//! [`SimulationConfig`] is an immutable value handed to the controller once per frame.
//! The controller compares it with the previous snapshot to decide whether the grid
//! must be rebuilt; there are no per-field change notifications.

use crate::error::ConfigError;

/// Smallest accepted grid width or height.
pub const MIN_DIMENSION: u32 = 16;
/// Largest accepted grid width or height.
pub const MAX_DIMENSION: u32 = 1024;
/// Width and height must be multiples of this.
pub const DIMENSION_STEP: u32 = 16;
/// Slowest accepted simulation rate.
pub const MIN_TIMESTEPS_PER_SECOND: u32 = 1;
/// Fastest accepted simulation rate.
pub const MAX_TIMESTEPS_PER_SECOND: u32 = 60;

/// Side length of the square compute workgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkgroupSize {
    Four,
    #[default]
    Eight,
    Sixteen,
}

impl WorkgroupSize {
    pub const ALL: [WorkgroupSize; 3] = [Self::Four, Self::Eight, Self::Sixteen];

    pub fn get(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }

    /// Number of workgroups needed along an axis of `extent` cells.
    pub fn groups_for(self, extent: u32) -> u32 {
        extent.div_ceil(self.get())
    }
}

impl TryFrom<u32> for WorkgroupSize {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            other => Err(ConfigError::InvalidWorkgroupSize(other)),
        }
    }
}

impl std::fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A validated configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    width: u32,
    height: u32,
    workgroup_size: WorkgroupSize,
    timesteps_per_second: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            workgroup_size: WorkgroupSize::Eight,
            timesteps_per_second: 4,
        }
    }
}

impl SimulationConfig {
    /// Validates every field, rejecting anything out of range.
    pub fn new(
        width: u32,
        height: u32,
        workgroup_size: u32,
        timesteps_per_second: u32,
    ) -> Result<Self, ConfigError> {
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;
        let workgroup_size = WorkgroupSize::try_from(workgroup_size)?;
        if !(MIN_TIMESTEPS_PER_SECOND..=MAX_TIMESTEPS_PER_SECOND).contains(&timesteps_per_second)
        {
            return Err(ConfigError::TimestepOutOfRange {
                value: timesteps_per_second,
                min: MIN_TIMESTEPS_PER_SECOND,
                max: MAX_TIMESTEPS_PER_SECOND,
            });
        }

        Ok(Self {
            width,
            height,
            workgroup_size,
            timesteps_per_second,
        })
    }

    /// Builds a config from raw UI values, snapping and clamping instead of failing.
    pub fn clamped(
        width: u32,
        height: u32,
        workgroup_size: WorkgroupSize,
        timesteps_per_second: u32,
    ) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
            workgroup_size,
            timesteps_per_second: timesteps_per_second
                .clamp(MIN_TIMESTEPS_PER_SECOND, MAX_TIMESTEPS_PER_SECOND),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn workgroup_size(&self) -> WorkgroupSize {
        self.workgroup_size
    }

    pub fn timesteps_per_second(&self) -> u32 {
        self.timesteps_per_second
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        Self::clamped(width, height, self.workgroup_size, self.timesteps_per_second)
    }

    pub fn with_workgroup_size(mut self, workgroup_size: WorkgroupSize) -> Self {
        self.workgroup_size = workgroup_size;
        self
    }

    pub fn with_timesteps_per_second(self, timesteps_per_second: u32) -> Self {
        Self::clamped(
            self.width,
            self.height,
            self.workgroup_size,
            timesteps_per_second,
        )
    }

    /// True when the two snapshots need different grid buffers. The timestep never counts.
    pub fn layout_differs(&self, other: &SimulationConfig) -> bool {
        self.width != other.width
            || self.height != other.height
            || self.workgroup_size != other.workgroup_size
    }
}

fn validate_dimension(axis: &'static str, value: u32) -> Result<(), ConfigError> {
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(ConfigError::DimensionOutOfRange {
            axis,
            value,
            min: MIN_DIMENSION,
            max: MAX_DIMENSION,
        });
    }
    if value % DIMENSION_STEP != 0 {
        return Err(ConfigError::DimensionNotAligned {
            axis,
            value,
            step: DIMENSION_STEP,
        });
    }
    Ok(())
}

/// Rounds to the nearest step, then clamps into range.
fn clamp_dimension(value: u32) -> u32 {
    let snapped = (value.saturating_add(DIMENSION_STEP / 2) / DIMENSION_STEP) * DIMENSION_STEP;
    snapped.clamp(MIN_DIMENSION, MAX_DIMENSION)
}
