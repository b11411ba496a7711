use chamber_core::{DIM, HOLE_FRACTION, Vector, Wall};

/// Contiguous slice of one axis's columns, handed to a single worker.
///
/// Shards of the same axis never overlap, and shards of different axes touch
/// different columns, so any set of shards can run concurrently.
pub struct AxisShard<'a> {
    pub axis: usize,
    /// Index of the first atom in this shard
    pub start: usize,
    pub positions: &'a mut [f64],
    pub velocities: &'a mut [f64],
    pub radii: &'a [f64],
    pub masses: &'a [f64],
}

/// Impulse delivered by one shard's reflections
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WallHits {
    /// Near wall (coordinate 0) and far wall (coordinate = box length)
    pub impulse: [f64; 2],
    pub count: usize,
}

impl AxisShard<'_> {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `position += velocity * dt` for every atom in the shard
    pub fn integrate(&mut self, dt: f64) {
        integrate(self.positions, self.velocities, dt);
    }

    /// Mirror atoms that poke through either wall of this axis back inside
    /// and flip their velocity component. The mirrored coordinate is clamped
    /// to `[r, length - r]`.
    pub fn reflect(&mut self, length: f64) -> WallHits {
        let mut hits = WallHits::default();
        for i in 0..self.positions.len() {
            let r = self.radii[i];
            let x = self.positions[i];
            let (mirrored, side) = if x < r {
                (2.0 * r - x, 0)
            } else if x + r > length {
                (2.0 * (length - r) - x, 1)
            } else {
                continue;
            };
            // A mirror alone leaves atoms that crossed more than a box length outside.
            self.positions[i] = if length < 2.0 * r {
                length / 2.0
            } else {
                mirrored.clamp(r, length - r)
            };
            let v = -self.velocities[i];
            self.velocities[i] = v;
            hits.impulse[side] += 2.0 * self.masses[i] * v.abs();
            hits.count += 1;
        }
        hits
    }
}

pub fn integrate(positions: &mut [f64], velocities: &[f64], dt: f64) {
    for (x, v) in positions.iter_mut().zip(velocities) {
        *x += v * dt;
    }
}

/// Split every axis column into chunks of `chunk` atoms.
///
/// Shards come out axis-major, then in index order, so merging their results
/// in sequence is deterministic.
pub fn axis_shards<'a>(
    positions: &'a mut [Vec<f64>; DIM],
    velocities: &'a mut [Vec<f64>; DIM],
    radii: &'a [f64],
    masses: &'a [f64],
    chunk: usize,
) -> Vec<AxisShard<'a>> {
    let chunk = chunk.max(1);
    let mut shards = Vec::new();
    for (axis, (p, v)) in positions.iter_mut().zip(velocities.iter_mut()).enumerate() {
        let parts = p
            .chunks_mut(chunk)
            .zip(v.chunks_mut(chunk))
            .zip(radii.chunks(chunk).zip(masses.chunks(chunk)));
        for (k, ((positions, velocities), (radii, masses))) in parts.enumerate() {
            shards.push(AxisShard {
                axis,
                start: k * chunk,
                positions,
                velocities,
                radii,
                masses,
            });
        }
    }
    shards
}

/// Square aperture centred in the right wall.
///
/// Atoms whose leading edge crosses that wall inside the aperture leave the
/// chamber instead of bouncing back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscapeHole {
    length: f64,
    centre: Vector,
    half_extent: Vector,
}

impl EscapeHole {
    pub const WALL: Wall = Wall::Right;

    pub fn new(walls: &Vector) -> Self {
        Self {
            length: walls[Self::WALL.axis()],
            centre: walls.map(|l| l / 2.0),
            half_extent: walls.map(|l| l * HOLE_FRACTION),
        }
    }

    /// True if `position` projects into the aperture
    pub fn contains(&self, position: &Vector) -> bool {
        (0..DIM)
            .filter(|&d| d != Self::WALL.axis())
            .all(|d| (position[d] - self.centre[d]).abs() < self.half_extent[d])
    }

    pub fn escapes(&self, position: &Vector, radius: f64) -> bool {
        position[Self::WALL.axis()] + radius > self.length && self.contains(position)
    }

    /// Indices of escaping atoms, ascending
    pub fn find_escapes(&self, positions: [&[f64]; DIM], radii: &[f64], out: &mut Vec<usize>) {
        out.clear();
        for (i, &r) in radii.iter().enumerate() {
            let p: Vector = std::array::from_fn(|d| positions[d][i]);
            if self.escapes(&p, r) {
                out.push(i);
            }
        }
    }
}
