use chamber_core::{AtomError, AtomState, BroadPhaseMode, ConfigError, DIM, UnitScale, Vector};

use crate::broad_phase::BroadPhase;
use crate::grid::CellGrid;
use crate::impulse::WallImpulse;
use crate::narrow_phase::{Pair, PairScan};
use crate::response::{Body, CollisionResponse};
use crate::walls::{AxisShard, EscapeHole, axis_shards};

/// Struct-of-arrays atom storage in internal units.
///
/// Index `i` names the same atom in every column. Deleting an atom moves the
/// last atom into its slot, so indices must not be held across a deletion.
#[derive(Debug)]
pub struct AtomStore {
    positions: [Vec<f64>; DIM],
    velocities: [Vec<f64>; DIM],
    masses: Vec<f64>,
    radii: Vec<f64>,
    /// Box lengths (internal units)
    walls: Vector,
    units: UnitScale,
    broad: BroadPhase,
}

fn validate_box(box_size: &Vector) -> Result<(), ConfigError> {
    for (axis, &value) in box_size.iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::InvalidBoxDimension { axis, value });
        }
    }
    Ok(())
}

fn validate_atom(index: usize, atom: &AtomState) -> Result<(), AtomError> {
    if !(atom.mass.is_finite() && atom.mass >= 0.0) {
        return Err(AtomError::InvalidMass {
            index,
            mass: atom.mass,
        });
    }
    if !(atom.radius.is_finite() && atom.radius > 0.0) {
        return Err(AtomError::InvalidRadius {
            index,
            radius: atom.radius,
        });
    }
    if !atom.is_finite() {
        return Err(AtomError::NonFiniteState { index });
    }
    Ok(())
}

impl AtomStore {
    /// Empty store for a box of `box_size` metres and a grid of `cell_size` metres
    pub fn new(
        box_size: &Vector,
        cell_size: f64,
        units: UnitScale,
        mode: BroadPhaseMode,
    ) -> Result<Self, ConfigError> {
        units.validate()?;
        validate_box(box_size)?;
        let walls = box_size.map(|l| units.length_in(l));
        let grid = CellGrid::new(&walls, units.length_in(cell_size))?;
        Ok(Self {
            positions: Default::default(),
            velocities: Default::default(),
            masses: Vec::new(),
            radii: Vec::new(),
            walls,
            units,
            broad: BroadPhase::new(grid, mode),
        })
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn units(&self) -> UnitScale {
        self.units
    }

    /// Box lengths in internal units
    pub fn walls(&self) -> Vector {
        self.walls
    }

    /// Box lengths in metres
    pub fn box_size(&self) -> Vector {
        self.walls.map(|l| self.units.length_out(l))
    }

    /// Cell edge in metres
    pub fn cell_size(&self) -> f64 {
        self.units.length_out(self.broad.grid().cell_size())
    }

    /// Append `n` atoms produced by `generator` (SI units)
    pub fn add_atoms(
        &mut self,
        n: usize,
        generator: impl FnMut() -> AtomState,
    ) -> Result<(), AtomError> {
        let batch: Vec<AtomState> = std::iter::repeat_with(generator).take(n).collect();
        self.extend_from_slice(&batch)
    }

    /// Append copies of `atoms` (SI units).
    ///
    /// The whole batch is validated before any atom is stored, so a rejected
    /// atom leaves the store unchanged.
    pub fn extend_from_slice(&mut self, atoms: &[AtomState]) -> Result<(), AtomError> {
        let first = self.len();
        for (k, atom) in atoms.iter().enumerate() {
            validate_atom(first + k, atom)?;
        }

        let massless = atoms.iter().filter(|a| a.mass == 0.0).count();
        if massless > 0 {
            tracing::warn!("{} atoms with zero mass; their collisions are skipped", massless);
        }
        if self.broad.mode() == BroadPhaseMode::HomeCell {
            let cell = self.cell_size();
            let oversized = atoms.iter().filter(|a| 2.0 * a.radius > cell).count();
            if oversized > 0 {
                tracing::warn!(
                    "{} atoms are wider than a grid cell; home-cell hashing will miss some of their collisions",
                    oversized
                );
            }
        }

        let n = atoms.len();
        for column in self.positions.iter_mut().chain(self.velocities.iter_mut()) {
            column.reserve(n);
        }
        self.masses.reserve(n);
        self.radii.reserve(n);
        for atom in atoms {
            self.store(atom);
        }
        self.broad.reserve(first + n);
        Ok(())
    }

    /// Append one atom, returning its index
    pub fn push(&mut self, atom: AtomState) -> Result<usize, AtomError> {
        let index = self.len();
        self.extend_from_slice(&[atom])?;
        Ok(index)
    }

    fn store(&mut self, atom: &AtomState) {
        for d in 0..DIM {
            self.positions[d].push(self.units.length_in(atom.position[d]));
            self.velocities[d].push(self.units.velocity_in(atom.velocity[d]));
        }
        self.masses.push(atom.mass);
        self.radii.push(self.units.length_in(atom.radius));
    }

    fn check_index(&self, index: usize) -> Result<(), AtomError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(AtomError::IndexOutOfRange {
                index,
                len: self.len(),
            })
        }
    }

    /// Value copy of atom `index` in SI units
    pub fn atom(&self, index: usize) -> Result<AtomState, AtomError> {
        self.check_index(index)?;
        Ok(self.atom_at(index))
    }

    fn atom_at(&self, i: usize) -> AtomState {
        AtomState {
            position: std::array::from_fn(|d| self.units.length_out(self.positions[d][i])),
            velocity: std::array::from_fn(|d| self.units.velocity_out(self.velocities[d][i])),
            mass: self.masses[i],
            radius: self.units.length_out(self.radii[i]),
        }
    }

    /// Every atom in SI units, in index order
    pub fn atoms(&self) -> Vec<AtomState> {
        (0..self.len()).map(|i| self.atom_at(i)).collect()
    }

    /// Overwrite atom `index` with `state` (SI units)
    pub fn commit(&mut self, index: usize, state: &AtomState) -> Result<(), AtomError> {
        self.check_index(index)?;
        validate_atom(index, state)?;
        for d in 0..DIM {
            self.positions[d][index] = self.units.length_in(state.position[d]);
            self.velocities[d][index] = self.units.velocity_in(state.velocity[d]);
        }
        self.masses[index] = state.mass;
        self.radii[index] = self.units.length_in(state.radius);
        Ok(())
    }

    /// Remove atom `index` in O(1); the former last atom takes its slot.
    pub fn delete_atom(&mut self, index: usize) -> Result<AtomState, AtomError> {
        self.check_index(index)?;
        let removed = self.atom_at(index);
        self.swap_remove(index);
        Ok(removed)
    }

    fn swap_remove(&mut self, i: usize) {
        for column in self.positions.iter_mut().chain(self.velocities.iter_mut()) {
            column.swap_remove(i);
        }
        self.masses.swap_remove(i);
        self.radii.swap_remove(i);
    }

    /// Collision view of atom `i` (internal units)
    pub fn body(&self, i: usize) -> Body {
        Body {
            position: std::array::from_fn(|d| self.positions[d][i]),
            velocity: std::array::from_fn(|d| self.velocities[d][i]),
            mass: self.masses[i],
        }
    }

    pub fn set_velocity(&mut self, i: usize, velocity: &Vector) {
        for d in 0..DIM {
            self.velocities[d][i] = velocity[d];
        }
    }

    pub fn positions(&self) -> [&[f64]; DIM] {
        std::array::from_fn(|d| &self.positions[d][..])
    }

    pub fn velocities(&self) -> [&[f64]; DIM] {
        std::array::from_fn(|d| &self.velocities[d][..])
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad
    }

    pub fn set_broad_phase_mode(&mut self, mode: BroadPhaseMode) {
        self.broad.set_mode(mode);
        self.broad.reserve(self.len());
    }

    /// Read-only atom columns next to the mutable broad phase
    pub fn split_broad_phase(&mut self) -> ([&[f64]; DIM], &[f64], &mut BroadPhase) {
        let positions = std::array::from_fn(|d| &self.positions[d][..]);
        (positions, &self.radii, &mut self.broad)
    }

    /// Per-axis shards of at most `chunk` atoms over the mutable columns
    pub fn axis_shards(&mut self, chunk: usize) -> Vec<AxisShard<'_>> {
        axis_shards(
            &mut self.positions,
            &mut self.velocities,
            &self.radii,
            &self.masses,
            chunk,
        )
    }

    /// Resize the box (metres), keeping the cell size.
    ///
    /// Atoms left outside the new box are pulled back to touch the wall they
    /// crossed.
    pub fn set_walls(&mut self, box_size: &Vector) -> Result<(), ConfigError> {
        validate_box(box_size)?;
        let walls = box_size.map(|l| self.units.length_in(l));
        let grid = CellGrid::new(&walls, self.broad.grid().cell_size())?;
        self.walls = walls;
        self.broad.set_grid(grid);

        for (d, column) in self.positions.iter_mut().enumerate() {
            let length = walls[d];
            for (x, &r) in column.iter_mut().zip(&self.radii) {
                *x = if length < 2.0 * r {
                    length / 2.0
                } else {
                    x.clamp(r, length - r)
                };
            }
        }
        Ok(())
    }

    /// Change the grid cell edge (metres)
    pub fn set_cell_size(&mut self, cell_size: f64) -> Result<(), ConfigError> {
        let grid = CellGrid::new(&self.walls, self.units.length_in(cell_size))?;
        self.broad.set_grid(grid);
        Ok(())
    }

    /// Advance every atom by `dt` internal time units
    pub fn move_atoms(&mut self, dt: f64) {
        for mut shard in self.axis_shards(usize::MAX) {
            shard.integrate(dt);
        }
    }

    /// Reflect atoms off all six walls, recording impulse in `impulse`'s
    /// current slot. Returns the number of reflections.
    pub fn handle_wall_collisions(&mut self, impulse: &mut WallImpulse) -> usize {
        let walls = self.walls;
        let mut count = 0;
        for mut shard in self.axis_shards(usize::MAX) {
            let hits = shard.reflect(walls[shard.axis]);
            impulse.add_hits(shard.axis, &hits);
            count += hits.count;
        }
        count
    }

    /// Indices of atoms leaving through `hole`, ascending
    pub fn find_escapes(&self, hole: &EscapeHole, out: &mut Vec<usize>) {
        hole.find_escapes(self.positions(), &self.radii, out);
    }

    /// Delete every atom leaving through `hole`. Highest index first, so each
    /// swap only moves atoms that are staying. Returns the number removed.
    pub fn remove_escapes(&mut self, hole: &EscapeHole, scratch: &mut Vec<usize>) -> usize {
        self.find_escapes(hole, scratch);
        for &i in scratch.iter().rev() {
            self.swap_remove(i);
        }
        scratch.len()
    }

    /// Single-threaded broad and narrow phase: every overlapping pair, once
    pub fn find_collisions(&mut self, out: &mut Vec<Pair>) {
        out.clear();
        let (positions, radii, broad) = self.split_broad_phase();
        broad.register(positions, radii);
        broad.sort();
        broad.collect_runs();
        PairScan::new(positions, radii, broad).scan_runs(broad.runs(), out);
    }

    /// Apply `response` to each pair in order, re-reading current
    /// velocities. Returns how many pairs changed.
    pub fn resolve_pairs(&mut self, pairs: &[Pair], response: &dyn CollisionResponse) -> usize {
        let mut resolved = 0;
        for &(i, j) in pairs {
            let (i, j) = (i as usize, j as usize);
            if let Some((va, vb)) = response.respond(&self.body(i), &self.body(j)) {
                self.set_velocity(i, &va);
                self.set_velocity(j, &vb);
                resolved += 1;
            }
        }
        resolved
    }
}
