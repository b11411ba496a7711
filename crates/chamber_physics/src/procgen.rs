use chamber_core::{AtomState, DALTON, DIM, Vector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic generator for reproducible initial conditions
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// One gas species (SI units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasSpec {
    /// Upper bound on the initial speed (m/s)
    pub max_speed: f64,
    /// kg
    pub mass: f64,
    /// m
    pub radius: f64,
}

impl GasSpec {
    pub fn helium(max_speed: f64) -> Self {
        Self {
            max_speed,
            mass: 4.0 * DALTON,
            radius: 31e-12,
        }
    }

    pub fn xenon(max_speed: f64) -> Self {
        Self {
            max_speed,
            mass: 131.0 * DALTON,
            radius: 108e-12,
        }
    }
}

/// Which half of the x axis a population starts in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Lower,
    Upper,
}

/// Uniformly distributed unit vector
fn random_direction(rng: &mut impl Rng) -> Vector {
    // Spherical coordinates with cos(phi) uniform
    let theta = rng.gen_range(0.0..std::f64::consts::TAU);
    let phi = rng.gen_range(-1.0..1.0f64).acos();
    [phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()]
}

/// Coordinate in `[lo + r, hi - r)`, or the middle when the slab is too thin
fn coordinate_in(rng: &mut impl Rng, lo: f64, hi: f64, radius: f64) -> f64 {
    let (a, b) = (lo + radius, hi - radius);
    if a < b { rng.gen_range(a..b) } else { (lo + hi) / 2.0 }
}

fn position_in(rng: &mut impl Rng, lo: &Vector, hi: &Vector, radius: f64) -> Vector {
    std::array::from_fn(|d| coordinate_in(rng, lo[d], hi[d], radius))
}

/// Atoms spread over the whole box, moving in random directions with
/// speeds uniform in `[0, max_speed)`.
pub fn uniform_gas<R: Rng>(box_size: Vector, spec: GasSpec, mut rng: R) -> impl FnMut() -> AtomState {
    move || {
        let position = position_in(&mut rng, &[0.0; DIM], &box_size, spec.radius);
        let speed = spec.max_speed * rng.gen_range(0.0..1.0);
        let velocity = random_direction(&mut rng).map(|x| x * speed);
        AtomState::new(position, velocity, spec.mass, spec.radius)
    }
}

/// Atoms spread over the whole box, moving only along `axis`
pub fn axis_gas<R: Rng>(
    box_size: Vector,
    spec: GasSpec,
    axis: usize,
    mut rng: R,
) -> impl FnMut() -> AtomState {
    move || {
        let position = position_in(&mut rng, &[0.0; DIM], &box_size, spec.radius);
        let mut velocity = [0.0; DIM];
        velocity[axis] = spec.max_speed * rng.gen_range(-1.0..1.0);
        AtomState::new(position, velocity, spec.mass, spec.radius)
    }
}

/// Like [`uniform_gas`], confined to one half of the x axis. Two of these
/// with different species make a mixing experiment.
pub fn half_gas<R: Rng>(
    box_size: Vector,
    spec: GasSpec,
    half: Half,
    mut rng: R,
) -> impl FnMut() -> AtomState {
    let mid = box_size[0] / 2.0;
    let (mut lo, mut hi) = ([0.0; DIM], box_size);
    match half {
        Half::Lower => hi[0] = mid,
        Half::Upper => lo[0] = mid,
    }
    move || {
        let position = position_in(&mut rng, &lo, &hi, spec.radius);
        let speed = spec.max_speed * rng.gen_range(0.0..1.0);
        let velocity = random_direction(&mut rng).map(|x| x * speed);
        AtomState::new(position, velocity, spec.mass, spec.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: Vector = [2e-8, 1e-8, 3e-8];

    fn inside(atom: &AtomState, lo: &Vector, hi: &Vector) -> bool {
        (0..DIM).all(|d| {
            atom.position[d] >= lo[d] + atom.radius && atom.position[d] <= hi[d] - atom.radius
        })
    }

    #[test]
    fn test_uniform_gas_inside_walls() {
        let spec = GasSpec::helium(4e3);
        let mut generator = uniform_gas(BOX, spec, seeded_rng(1));
        for _ in 0..5000 {
            let atom = generator();
            assert!(inside(&atom, &[0.0; DIM], &BOX));
            assert!(atom.speed() <= spec.max_speed * (1.0 + 1e-12));
            assert_eq!(atom.mass, spec.mass);
        }
    }

    #[test]
    fn test_axis_gas_moves_along_one_axis() {
        let mut generator = axis_gas(BOX, GasSpec::helium(1e3), 1, seeded_rng(2));
        for _ in 0..1000 {
            let atom = generator();
            assert_eq!(atom.velocity[0], 0.0);
            assert_eq!(atom.velocity[2], 0.0);
            assert!(atom.velocity[1].abs() < 1e3);
            assert!(inside(&atom, &[0.0; DIM], &BOX));
        }
    }

    #[test]
    fn test_half_gas_stays_in_its_half() {
        let mid = BOX[0] / 2.0;
        let mut heavy = half_gas(BOX, GasSpec::xenon(3e2), Half::Upper, seeded_rng(3));
        let mut light = half_gas(BOX, GasSpec::helium(5e3), Half::Lower, seeded_rng(4));
        for _ in 0..1000 {
            let xe = heavy();
            let he = light();
            assert!(inside(&xe, &[mid, 0.0, 0.0], &BOX));
            assert!(inside(&he, &[0.0; DIM], &[mid, BOX[1], BOX[2]]));
        }
    }

    #[test]
    fn test_same_seed_same_gas() {
        let spec = GasSpec::xenon(3e2);
        let a: Vec<AtomState> = std::iter::repeat_with(uniform_gas(BOX, spec, seeded_rng(9)))
            .take(100)
            .collect();
        let b: Vec<AtomState> = std::iter::repeat_with(uniform_gas(BOX, spec, seeded_rng(9)))
            .take(100)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_thin_box_centres_atoms() {
        let mut generator = uniform_gas([1e-10, 1e-8, 1e-8], GasSpec::xenon(1.0), seeded_rng(5));
        assert_eq!(generator().position[0], 5e-11);
    }
}
