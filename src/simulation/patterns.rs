//! Classic Game of Life starting patterns
//!
//! Patterns are stamped into an otherwise dead grid as `0`/`1` cells.

use super::grid::GridDescriptor;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Pattern {
    #[default]
    Random,
    Glider,
    Blinker,
    GosperGun,
    Clear,
}

impl Pattern {
    pub const ALL: [Pattern; 5] = [
        Pattern::Random,
        Pattern::Glider,
        Pattern::Blinker,
        Pattern::GosperGun,
        Pattern::Clear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Random => "Random",
            Pattern::Glider => "Glider",
            Pattern::Blinker => "Blinker",
            Pattern::GosperGun => "Gosper Gun",
            Pattern::Clear => "Clear",
        }
    }

    /// Live-cell offsets relative to the pattern's top-left corner.
    ///
    /// `Random` has no fixed shape and returns an empty slice.
    pub fn offsets(&self) -> &'static [(u32, u32)] {
        match self {
            Pattern::Glider => &GLIDER,
            Pattern::Blinker => &BLINKER,
            Pattern::GosperGun => &GOSPER_GUN,
            Pattern::Random | Pattern::Clear => &[],
        }
    }

    /// Where the pattern's top-left corner goes in a grid of the given size.
    fn origin(&self, descriptor: &GridDescriptor) -> (u32, u32) {
        match self {
            Pattern::GosperGun => (
                10.min(descriptor.width().saturating_sub(36)),
                (descriptor.height() / 2).saturating_sub(5),
            ),
            _ => (
                (descriptor.width() / 2).saturating_sub(1),
                (descriptor.height() / 2).saturating_sub(1),
            ),
        }
    }

    /// Fills a dead grid with this pattern. Cells that fall outside the grid are dropped.
    pub fn stamp(&self, descriptor: &GridDescriptor) -> Vec<u32> {
        let (origin_x, origin_y) = self.origin(descriptor);
        stamp_at(descriptor, origin_x, origin_y, self.offsets())
    }
}

/// Places `offsets` at `(origin_x, origin_y)` in a dead grid.
pub fn stamp_at(
    descriptor: &GridDescriptor,
    origin_x: u32,
    origin_y: u32,
    offsets: &[(u32, u32)],
) -> Vec<u32> {
    let mut cells = vec![0u32; descriptor.cell_count()];
    for &(dx, dy) in offsets {
        let x = origin_x + dx;
        let y = origin_y + dy;
        if let Some(index) = descriptor.index(x, y) {
            cells[index] = 1;
        }
    }
    cells
}

// Moves one cell right and one cell down every 4 generations.
const GLIDER: [(u32, u32); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

const BLINKER: [(u32, u32); 3] = [(1, 0), (1, 1), (1, 2)];

const GOSPER_GUN: [(u32, u32); 36] = [
    (24, 0),
    (22, 1),
    (24, 1),
    (12, 2),
    (13, 2),
    (20, 2),
    (21, 2),
    (34, 2),
    (35, 2),
    (11, 3),
    (15, 3),
    (20, 3),
    (21, 3),
    (34, 3),
    (35, 3),
    (0, 4),
    (1, 4),
    (10, 4),
    (16, 4),
    (20, 4),
    (21, 4),
    (0, 5),
    (1, 5),
    (10, 5),
    (14, 5),
    (16, 5),
    (17, 5),
    (22, 5),
    (24, 5),
    (10, 6),
    (16, 6),
    (24, 6),
    (11, 7),
    (15, 7),
    (12, 8),
    (13, 8),
];
