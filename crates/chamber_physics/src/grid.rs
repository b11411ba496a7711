//! Uniform collision grid with per-axis bit packing.
//!
//! A cell coordinate along axis `d` occupies `bits[d]` bits starting at
//! `shifts[d]`; OR-ing the shifted coordinates yields one `u32` per cell, so
//! co-located atoms can be grouped with a 1-D sort.

use chamber_core::{ConfigError, DIM, HASH_BITS, Vector};

/// Bits needed to address `cells` cells (at least one, even for a single cell)
pub fn bits_for(cells: u32) -> u32 {
    (u32::BITS - (cells.max(2) - 1).leading_zeros()).max(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    cell_size: f64,
    cells: [u32; DIM],
    shifts: [u32; DIM],
}

impl CellGrid {
    /// Lay a grid of `cell_size` cubes over a box with the given wall lengths
    /// (all in internal units).
    pub fn new(walls: &Vector, cell_size: f64) -> Result<Self, ConfigError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(cell_size));
        }

        let mut cells = [0u32; DIM];
        let mut shifts = [0u32; DIM];
        let mut bits = 0u32;
        for d in 0..DIM {
            let count = (walls[d] / cell_size).ceil();
            // Anything past 2^32 cells cannot be packed anyway.
            if !(count <= u32::MAX as f64) {
                return Err(ConfigError::GridTooFine { bits: u32::MAX });
            }
            cells[d] = (count as u32).max(1);
            shifts[d] = bits;
            bits += bits_for(cells[d]);
        }
        if bits >= HASH_BITS {
            return Err(ConfigError::GridTooFine { bits });
        }

        tracing::info!(
            "Grid dim: {} ({} hash bits)",
            cells.map(|c| c.to_string()).join("*"),
            bits
        );

        Ok(Self {
            cell_size,
            cells,
            shifts,
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cells(&self) -> [u32; DIM] {
        self.cells
    }

    pub fn shifts(&self) -> [u32; DIM] {
        self.shifts
    }

    /// Cell coordinate along `axis`, clamped into the grid.
    ///
    /// Atoms briefly outside the box (or carrying NaN) land in a border cell
    /// instead of spilling into the next axis's bit field.
    pub fn coordinate(&self, axis: usize, x: f64) -> u32 {
        let c = (x / self.cell_size).floor();
        c.clamp(0.0, (self.cells[axis] - 1) as f64) as u32
    }

    pub fn pack(&self, coords: [u32; DIM]) -> u32 {
        let mut hash = 0;
        for d in 0..DIM {
            hash |= coords[d] << self.shifts[d];
        }
        hash
    }

    pub fn hash(&self, position: &Vector) -> u32 {
        self.pack(std::array::from_fn(|d| self.coordinate(d, position[d])))
    }

    /// Write the home-cell hash of every atom in a column slice.
    pub fn hash_columns(&self, positions: [&[f64]; DIM], out: &mut [u32]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.hash(&std::array::from_fn(|d| positions[d][i]));
        }
    }

    /// Call `f` with the hash of every cell an axis-aligned box touches.
    pub fn for_each_cell(&self, min: &Vector, max: &Vector, mut f: impl FnMut(u32)) {
        let lo: [u32; DIM] = std::array::from_fn(|d| self.coordinate(d, min[d]));
        let hi: [u32; DIM] = std::array::from_fn(|d| self.coordinate(d, max[d]));

        let mut coords = lo;
        loop {
            f(self.pack(coords));

            // Odometer increment over the per-axis ranges.
            let mut d = 0;
            loop {
                if d == DIM {
                    return;
                }
                if coords[d] < hi[d] {
                    coords[d] += 1;
                    break;
                }
                coords[d] = lo[d];
                d += 1;
            }
        }
    }
}
