//! Double-buffered cell grid
//!
//! Two equally sized `u32` buffers hold consecutive generations. Which one is the input is
//! decided by a [`BufferRole`] owned by the controller; the buffers themselves never move.

use bytemuck::{Pod, Zeroable};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{config::SimulationConfig, config::WorkgroupSize, patterns::Pattern};
use crate::error::AllocationError;
use crate::wgpu_utils::{CellBuffer, UniformBuffer};

/// Chance that a randomly seeded cell starts alive, as `numerator / denominator`.
pub const ALIVE_RATIO: (u32, u32) = (1, 4);

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDescriptor {
    width: u32,
    height: u32,
}

impl GridDescriptor {
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells, which is also the render instance count.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of one grid buffer.
    pub fn byte_len(&self) -> u64 {
        self.cell_count() as u64 * std::mem::size_of::<u32>() as u64
    }

    /// Row-major index of `(x, y)`, or `None` outside the grid.
    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Workgroup counts along x and y for a dispatch covering the whole grid.
    pub fn workgroups(&self, workgroup_size: WorkgroupSize) -> (u32, u32) {
        (
            workgroup_size.groups_for(self.width),
            workgroup_size.groups_for(self.height),
        )
    }

    pub fn uniform(&self) -> GridSizeUniform {
        GridSizeUniform {
            width: self.width,
            height: self.height,
            _padding: [0; 2],
        }
    }
}

impl From<&SimulationConfig> for GridDescriptor {
    fn from(config: &SimulationConfig) -> Self {
        Self::new(config.width(), config.height())
    }
}

/// GPU mirror of [`GridDescriptor`], padded to 16 bytes for the uniform address space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct GridSizeUniform {
    pub width: u32,
    pub height: u32,
    pub _padding: [u32; 2],
}

/// Names one of the two grid buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferRole {
    #[default]
    A,
    B,
}

impl BufferRole {
    /// The other buffer.
    pub fn swap(self) -> Self {
        match self {
            BufferRole::A => BufferRole::B,
            BufferRole::B => BufferRole::A,
        }
    }
}

/// Where random seeds come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Every reseed uses the same value, so runs are reproducible.
    Fixed(u64),
    /// A fresh seed per reseed.
    Entropy,
}

impl SeedPolicy {
    pub fn seed(&self) -> u64 {
        match self {
            SeedPolicy::Fixed(seed) => *seed,
            SeedPolicy::Entropy => rand::random(),
        }
    }

    /// Population for `pattern`, drawing a seed only when the pattern is random.
    pub fn population(&self, pattern: Pattern) -> InitialPopulation {
        match pattern {
            Pattern::Random => InitialPopulation::Random { seed: self.seed() },
            other => InitialPopulation::Pattern(other),
        }
    }
}

/// Initial contents of grid A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialPopulation {
    Random { seed: u64 },
    Pattern(Pattern),
    /// Explicit contents. Nonzero values count as alive; the length is fitted to the grid.
    Cells(Vec<u32>),
}

impl InitialPopulation {
    pub fn cells(&self, descriptor: &GridDescriptor) -> Vec<u32> {
        match self {
            InitialPopulation::Random { seed } => random_cells(descriptor, *seed),
            InitialPopulation::Pattern(pattern) => pattern.stamp(descriptor),
            InitialPopulation::Cells(cells) => {
                if cells.len() != descriptor.cell_count() {
                    log::warn!(
                        "explicit population has {} cells, grid has {}; fitting",
                        cells.len(),
                        descriptor.cell_count()
                    );
                }
                let mut fitted: Vec<u32> = cells.iter().map(|&c| u32::from(c != 0)).collect();
                fitted.resize(descriptor.cell_count(), 0);
                fitted
            }
        }
    }
}

/// Each cell independently alive with probability [`ALIVE_RATIO`].
pub fn random_cells(descriptor: &GridDescriptor, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..descriptor.cell_count())
        .map(|_| u32::from(rng.random_ratio(ALIVE_RATIO.0, ALIVE_RATIO.1)))
        .collect()
}

/// Rejects grids whose buffers would exceed the device limits.
pub fn check_allocation(byte_len: u64, limits: &wgpu::Limits) -> Result<(), AllocationError> {
    let limit = limits
        .max_buffer_size
        .min(limits.max_storage_buffer_binding_size as u64);
    if byte_len > limit {
        return Err(AllocationError::TooLarge {
            requested: byte_len,
            limit,
        });
    }
    Ok(())
}

/// The ping/pong cell buffers plus the size uniform that describes them.
pub struct GridBuffers {
    descriptor: GridDescriptor,
    cells_a: CellBuffer,
    cells_b: CellBuffer,
    size: UniformBuffer<GridSizeUniform>,
}

impl GridBuffers {
    /// Allocates a fresh pair of buffers and fills A from `population`.
    ///
    /// Either everything is created or an error is returned; the caller keeps its previous
    /// buffers until this succeeds. The caller must also ensure no submitted work still
    /// uses the buffers being replaced.
    pub fn reinitialize(
        device: &wgpu::Device,
        descriptor: GridDescriptor,
        population: &InitialPopulation,
    ) -> Result<Self, AllocationError> {
        let byte_len = descriptor.byte_len();
        check_allocation(byte_len, &device.limits())?;

        let cells = population.cells(&descriptor);

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let cells_a = CellBuffer::new_with_data(device, &cells, "Life Cells A");
        let cells_b = CellBuffer::new(device, descriptor.cell_count(), "Life Cells B");
        let size = UniformBuffer::new_with_data(device, &descriptor.uniform());
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(AllocationError::OutOfMemory {
                requested: byte_len,
                message: error.to_string(),
            });
        }

        log::info!(
            "grid reinitialized: {}x{} ({} bytes per buffer, {} live)",
            descriptor.width(),
            descriptor.height(),
            byte_len,
            cells.iter().filter(|&&c| c == 1).count()
        );

        Ok(Self {
            descriptor,
            cells_a,
            cells_b,
            size,
        })
    }

    pub fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    pub fn cells(&self, role: BufferRole) -> &CellBuffer {
        match role {
            BufferRole::A => &self.cells_a,
            BufferRole::B => &self.cells_b,
        }
    }

    pub fn size_uniform(&self) -> &UniformBuffer<GridSizeUniform> {
        &self.size
    }

    pub fn instance_count(&self) -> u32 {
        self.descriptor.cell_count() as u32
    }
}
