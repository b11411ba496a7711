use std::ops::Range;

use chamber_core::{BroadPhaseMode, DIM, Vector};

use crate::broad_phase::BroadPhase;
use crate::grid::CellGrid;

/// Candidate collision between two atom indices
pub type Pair = (u32, u32);

pub fn overlaps(positions: [&[f64]; DIM], radii: &[f64], i: usize, j: usize) -> bool {
    let mut dist2 = 0.0;
    for column in positions {
        let delta = column[i] - column[j];
        dist2 += delta * delta;
    }
    let reach = radii[i] + radii[j];
    dist2 < reach * reach
}

/// Read-only view the narrow phase needs: atom columns plus the sorted
/// broad-phase entries.
#[derive(Clone, Copy)]
pub struct PairScan<'a> {
    pub positions: [&'a [f64]; DIM],
    pub radii: &'a [f64],
    pub grid: &'a CellGrid,
    pub mode: BroadPhaseMode,
    pub hashes: &'a [u32],
    pub atoms: &'a [u32],
}

impl<'a> PairScan<'a> {
    pub fn new(positions: [&'a [f64]; DIM], radii: &'a [f64], broad: &'a BroadPhase) -> Self {
        Self {
            positions,
            radii,
            grid: broad.grid(),
            mode: broad.mode(),
            hashes: broad.hashes(),
            atoms: broad.atoms(),
        }
    }

    /// Cell that reports the pair when atoms are registered in every cell
    /// they touch: the one holding the lower corner of the two bounding
    /// boxes' intersection. Both atoms are registered there.
    fn owner_cell(&self, i: usize, j: usize) -> u32 {
        let corner: Vector = std::array::from_fn(|d| {
            let p = self.positions[d];
            (p[i] - self.radii[i]).max(p[j] - self.radii[j])
        });
        self.grid.hash(&corner)
    }

    /// Test every pair inside one run, appending true overlaps to `out`.
    pub fn scan_run(&self, run: Range<usize>, out: &mut Vec<Pair>) {
        let cell = self.hashes[run.start];
        let members = &self.atoms[run];
        for (k, &a) in members.iter().enumerate() {
            for &b in &members[k + 1..] {
                let (i, j) = (a as usize, b as usize);
                if !overlaps(self.positions, self.radii, i, j) {
                    continue;
                }
                if self.mode == BroadPhaseMode::Straddling && self.owner_cell(i, j) != cell {
                    continue;
                }
                out.push((a, b));
            }
        }
    }

    pub fn scan_runs(&self, runs: &[Range<usize>], out: &mut Vec<Pair>) {
        for run in runs {
            self.scan_run(run.clone(), out);
        }
    }
}

/// All overlapping pairs by exhaustive O(N^2) search; the reference the
/// grid path is checked against.
pub fn brute_force_pairs(positions: [&[f64]; DIM], radii: &[f64]) -> Vec<Pair> {
    let n = radii.len();
    let mut out = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            if overlaps(positions, radii, i, j) {
                out.push((i as u32, j as u32));
            }
        }
    }
    out
}

/// Order-insensitive form of a pair list, for comparisons
pub fn normalized(pairs: &[Pair]) -> Vec<Pair> {
    let mut out: Vec<Pair> = pairs.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect();
    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn grid_pairs(columns: &[Vec<f64>; DIM], radii: &[f64], cell: f64, mode: BroadPhaseMode) -> Vec<Pair> {
        let positions = [&columns[0][..], &columns[1][..], &columns[2][..]];
        let grid = CellGrid::new(&[8.0; DIM], cell).unwrap();
        let mut broad = BroadPhase::new(grid, mode);
        broad.register(positions, radii);
        broad.sort();
        broad.collect_runs();
        let scan = PairScan::new(positions, radii, &broad);
        let mut out = Vec::new();
        scan.scan_runs(broad.runs(), &mut out);
        out
    }

    #[test]
    fn test_overlap_is_strict() {
        let x = [0.0, 0.2];
        let y = [0.0, 0.0];
        let z = [0.0, 0.0];
        assert!(!overlaps([&x, &y, &z], &[0.1, 0.1], 0, 1));
        assert!(overlaps([&x, &y, &z], &[0.1, 0.10001], 0, 1));
    }

    #[test]
    fn test_straddling_pairs_are_found_once() {
        // Pairs placed astride cell faces, edges and corners of a unit grid.
        let centres: Vec<(Vector, Vector)> = vec![
            ([0.95, 0.5, 0.5], [1.05, 0.5, 0.5]),
            ([2.5, 1.96, 2.5], [2.5, 2.04, 2.5]),
            ([3.97, 3.97, 0.5], [4.03, 4.03, 0.5]),
            ([4.98, 4.98, 4.98], [5.02, 5.02, 5.02]),
            ([6.5, 6.5, 6.5], [6.6, 6.5, 6.5]),
        ];
        let mut columns: [Vec<f64>; DIM] = Default::default();
        for (a, b) in &centres {
            for d in 0..DIM {
                columns[d].push(a[d]);
                columns[d].push(b[d]);
            }
        }
        let radii = vec![0.1; columns[0].len()];
        let positions = [&columns[0][..], &columns[1][..], &columns[2][..]];

        let expected = brute_force_pairs(positions, &radii);
        assert_eq!(expected.len(), centres.len());

        let found = grid_pairs(&columns, &radii, 1.0, BroadPhaseMode::Straddling);
        assert_eq!(found.len(), expected.len(), "duplicates or misses: {:?}", found);
        assert_eq!(normalized(&found), expected);

        // The home-cell grid only sees the pair that shares a cell.
        let home = grid_pairs(&columns, &radii, 1.0, BroadPhaseMode::HomeCell);
        assert_eq!(normalized(&home), vec![(8, 9)]);
    }

    #[test]
    fn test_random_gas_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let n = 1500;
        let columns: [Vec<f64>; DIM] =
            std::array::from_fn(|_| (0..n).map(|_| rng.gen_range(0.0..8.0)).collect());
        let radii: Vec<f64> = (0..n).map(|_| rng.gen_range(0.05..0.25)).collect();
        let positions = [&columns[0][..], &columns[1][..], &columns[2][..]];
        let expected = brute_force_pairs(positions, &radii);
        assert!(!expected.is_empty());

        // Cell at least the largest diameter, and a cell finer than that.
        for cell in [0.5, 0.8, 0.3] {
            let found = grid_pairs(&columns, &radii, cell, BroadPhaseMode::Straddling);
            assert_eq!(found.len(), expected.len());
            assert_eq!(normalized(&found), expected);
        }
    }
}
