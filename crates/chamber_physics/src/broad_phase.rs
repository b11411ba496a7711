use std::ops::Range;

use chamber_core::{BroadPhaseMode, DIM, Vector};

use crate::grid::CellGrid;
use crate::radix::RadixSorter;

/// Maximal runs of equal values in a sorted hash array
pub struct CellRuns<'a> {
    hashes: &'a [u32],
    start: usize,
}

impl Iterator for CellRuns<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        let l = self.start;
        let first = *self.hashes.get(l)?;
        let len = self.hashes[l..].iter().take_while(|&&h| h == first).count();
        self.start = l + len;
        Some(l..self.start)
    }
}

/// Every maximal run `[l, r)` of equal hashes, in order; together they
/// partition `0..hashes.len()`.
pub fn runs(hashes: &[u32]) -> CellRuns<'_> {
    CellRuns { hashes, start: 0 }
}

/// Runs that can hold a collision (two or more entries)
pub fn candidate_runs(hashes: &[u32], out: &mut Vec<Range<usize>>) {
    out.clear();
    out.extend(runs(hashes).filter(|run| run.len() >= 2));
}

/// Append the grid entries of atoms `offset..offset + radii.len()`.
///
/// `positions` and `radii` are column slices starting at atom `offset`.
pub fn register_atoms(
    grid: &CellGrid,
    mode: BroadPhaseMode,
    positions: [&[f64]; DIM],
    radii: &[f64],
    offset: usize,
    hashes: &mut Vec<u32>,
    atoms: &mut Vec<u32>,
) {
    if mode == BroadPhaseMode::HomeCell {
        let start = hashes.len();
        hashes.resize(start + radii.len(), 0);
        grid.hash_columns(positions, &mut hashes[start..]);
        atoms.extend((0..radii.len()).map(|i| (offset + i) as u32));
        return;
    }
    for (i, &r) in radii.iter().enumerate() {
        let atom = (offset + i) as u32;
        let centre: Vector = std::array::from_fn(|d| positions[d][i]);
        let min = centre.map(|x| x - r);
        let max = centre.map(|x| x + r);
        grid.for_each_cell(&min, &max, |hash| {
            hashes.push(hash);
            atoms.push(atom);
        });
    }
}

/// Per-tick broad-phase state: the grid plus the (hash, atom) entries, their
/// sort scratch and the candidate runs. Owned by the atom store and rebuilt
/// every tick.
#[derive(Debug)]
pub struct BroadPhase {
    grid: CellGrid,
    mode: BroadPhaseMode,
    hashes: Vec<u32>,
    atoms: Vec<u32>,
    sorter: RadixSorter,
    runs: Vec<Range<usize>>,
}

impl BroadPhase {
    pub fn new(grid: CellGrid, mode: BroadPhaseMode) -> Self {
        Self {
            grid,
            mode,
            hashes: Vec::new(),
            atoms: Vec::new(),
            sorter: RadixSorter::new(),
            runs: Vec::new(),
        }
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn set_grid(&mut self, grid: CellGrid) {
        self.grid = grid;
    }

    pub fn mode(&self) -> BroadPhaseMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BroadPhaseMode) {
        self.mode = mode;
    }

    /// Pre-size the entry buffers for `atoms` atoms
    pub fn reserve(&mut self, atoms: usize) {
        let per_atom = match self.mode {
            BroadPhaseMode::HomeCell => 1,
            BroadPhaseMode::Straddling => 2,
        };
        let wanted = atoms * per_atom;
        self.hashes.reserve(wanted.saturating_sub(self.hashes.len()));
        self.atoms.reserve(wanted.saturating_sub(self.atoms.len()));
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
        self.atoms.clear();
        self.runs.clear();
    }

    /// Append entries produced elsewhere (e.g. by a hashing shard)
    pub fn extend(&mut self, hashes: &[u32], atoms: &[u32]) {
        self.hashes.extend_from_slice(hashes);
        self.atoms.extend_from_slice(atoms);
    }

    /// Register every atom; the single-threaded hashing path
    pub fn register(&mut self, positions: [&[f64]; DIM], radii: &[f64]) {
        self.clear();
        register_atoms(
            &self.grid,
            self.mode,
            positions,
            radii,
            0,
            &mut self.hashes,
            &mut self.atoms,
        );
    }

    pub fn sort(&mut self) {
        self.sorter.sort(&mut self.hashes, &mut self.atoms);
    }

    pub fn collect_runs(&mut self) {
        candidate_runs(&self.hashes, &mut self.runs);
    }

    pub fn hashes(&self) -> &[u32] {
        &self.hashes
    }

    /// Atom index of each entry, in sort order once sorted
    pub fn atoms(&self) -> &[u32] {
        &self.atoms
    }

    pub fn runs(&self) -> &[Range<usize>] {
        &self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_runs_partition_index_range() {
        let hashes = [1, 1, 2, 5, 5, 5, 9];
        let all: Vec<_> = runs(&hashes).collect();
        assert_eq!(all, vec![0..2, 2..3, 3..6, 6..7]);

        let mut candidates = Vec::new();
        candidate_runs(&hashes, &mut candidates);
        assert_eq!(candidates, vec![0..2, 3..6]);

        assert_eq!(runs(&[]).count(), 0);
        candidate_runs(&[4], &mut candidates);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_sorted_entries_partition_into_runs() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let walls = [10.0; DIM];
        let n = 2000;
        let columns: [Vec<f64>; DIM] =
            std::array::from_fn(|_| (0..n).map(|_| rng.gen_range(0.2..9.8)).collect());
        let radii = vec![0.2; n];
        let positions = [&columns[0][..], &columns[1][..], &columns[2][..]];

        for mode in [BroadPhaseMode::HomeCell, BroadPhaseMode::Straddling] {
            let grid = CellGrid::new(&walls, 1.0).unwrap();
            let mut broad = BroadPhase::new(grid, mode);
            broad.register(positions, &radii);
            broad.sort();

            let hashes = broad.hashes();
            let mut covered = 0;
            for run in runs(hashes) {
                assert_eq!(run.start, covered);
                assert!(hashes[run.clone()].iter().all(|&h| h == hashes[run.start]));
                if run.end < hashes.len() {
                    assert!(hashes[run.end] > hashes[run.start]);
                }
                covered = run.end;
            }
            assert_eq!(covered, hashes.len());

            if mode == BroadPhaseMode::HomeCell {
                let mut atoms = broad.atoms().to_vec();
                atoms.sort_unstable();
                assert_eq!(atoms, (0..n as u32).collect::<Vec<_>>());
            } else {
                assert!(hashes.len() >= n);
                assert!(hashes.len() <= n * 8);
            }
        }
    }

    #[test]
    fn test_home_cell_registers_one_entry_per_atom() {
        let grid = CellGrid::new(&[4.0; DIM], 1.0).unwrap();
        let x = [0.5, 3.5, 1.2];
        let y = [0.5, 0.5, 2.7];
        let z = [0.5, 2.5, 3.9];
        let (mut hashes, mut atoms) = (vec![7], vec![99]);
        register_atoms(
            &grid,
            BroadPhaseMode::HomeCell,
            [&x, &y, &z],
            &[0.3; 3],
            10,
            &mut hashes,
            &mut atoms,
        );
        assert_eq!(atoms, vec![99, 10, 11, 12]);
        assert_eq!(hashes[0], 7);
        for i in 0..3 {
            assert_eq!(hashes[i + 1], grid.hash(&[x[i], y[i], z[i]]));
        }
    }
}
