use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::constants::{DIM, K_B, WALL_COUNT};

/// One value per spatial axis
pub type Vector = [f64; DIM];

pub fn dot(a: &Vector, b: &Vector) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn sub(a: &Vector, b: &Vector) -> Vector {
    std::array::from_fn(|d| a[d] - b[d])
}

pub fn length_squared(a: &Vector) -> f64 {
    dot(a, a)
}

pub fn cross(a: &Vector, b: &Vector) -> Vector {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Value copy of one atom, in SI units.
///
/// The store hands these out and takes them back through `commit`; nothing
/// keeps a live reference into the store's arrays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtomState {
    pub position: Vector,
    pub velocity: Vector,
    pub mass: f64,
    pub radius: f64,
}

impl AtomState {
    pub fn new(position: Vector, velocity: Vector, mass: f64, radius: f64) -> Self {
        Self {
            position,
            velocity,
            mass,
            radius,
        }
    }

    pub fn speed(&self) -> f64 {
        length_squared(&self.velocity).sqrt()
    }

    pub fn kinetic(&self) -> f64 {
        0.5 * self.mass * length_squared(&self.velocity)
    }

    /// Kinetic energy split by axis
    pub fn kinetic_distributed(&self) -> Vector {
        self.velocity.map(|v| 0.5 * self.mass * v * v)
    }

    pub fn impulse(&self) -> Vector {
        self.velocity.map(|v| v * self.mass)
    }

    /// Angular momentum about the chamber's origin corner
    pub fn impulse_moment(&self) -> Vector {
        cross(&self.position, &self.impulse())
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(&self.velocity).all(|x| x.is_finite())
    }
}

/// Chamber faces, two per axis
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wall {
    Left = 0,
    Right = 1,
    Top = 2,
    Bottom = 3,
    Front = 4,
    Back = 5,
}

impl Wall {
    pub const ALL: [Wall; WALL_COUNT] = [
        Wall::Left,
        Wall::Right,
        Wall::Top,
        Wall::Bottom,
        Wall::Front,
        Wall::Back,
    ];

    /// Face at coordinate 0 (`far == false`) or at the box length along `axis`
    pub fn from_axis(axis: usize, far: bool) -> Self {
        Self::ALL[2 * axis + far as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn axis(self) -> usize {
        self.index() / 2
    }

    pub fn is_far(self) -> bool {
        self.index() % 2 == 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

/// Per-atom record laid out for direct upload to a renderer
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AtomSample {
    pub position: [f32; 3],
    pub radius: f32,
    pub velocity: [f32; 3],
    pub mass: f32,
}

impl From<&AtomState> for AtomSample {
    fn from(atom: &AtomState) -> Self {
        Self {
            position: atom.position.map(|x| x as f32),
            radius: atom.radius as f32,
            velocity: atom.velocity.map(|v| v as f32),
            mass: atom.mass as f32,
        }
    }
}

/// Immutable copy of the chamber between two ticks, in SI units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Box lengths (m)
    pub box_size: Vector,
    pub atoms: Vec<AtomState>,
    /// m^3
    pub volume: f64,
    /// Kinetic energy summed per axis (J)
    pub kinetic_energy: Vector,
    /// Pressure on each wall averaged over the measurement window (Pa), indexed by `Wall`
    pub pressure: [f64; WALL_COUNT],
    /// Total momentum (kg m/s)
    pub impulse: Vector,
    /// Total angular momentum about the origin corner (kg m^2/s)
    pub impulse_moment: Vector,
    /// Simulated time (s)
    pub time: f64,
    pub tick: u64,
    /// Pairs resolved during the last tick
    pub collisions: usize,
}

impl Metrics {
    pub fn total_kinetic(&self) -> f64 {
        self.kinetic_energy.iter().sum()
    }

    pub fn pressure_on(&self, wall: Wall) -> f64 {
        self.pressure[wall.index()]
    }

    /// Equipartition temperature of the gas (K)
    pub fn temperature(&self) -> f64 {
        if self.atoms.is_empty() {
            return 0.0;
        }
        let mean = self.total_kinetic() / self.atoms.len() as f64;
        2.0 * mean / (DIM as f64 * K_B)
    }

    pub fn samples(&self) -> Vec<AtomSample> {
        self.atoms.iter().map(AtomSample::from).collect()
    }

    pub fn sample_bytes(samples: &[AtomSample]) -> &[u8] {
        bytemuck::cast_slice(samples)
    }

    /// False if any atom or aggregate carries NaN/Inf
    pub fn is_finite(&self) -> bool {
        self.atoms.iter().all(AtomState::is_finite)
            && self
                .kinetic_energy
                .iter()
                .chain(&self.pressure)
                .chain(&self.impulse)
                .chain(&self.impulse_moment)
                .all(|x| x.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_axis_mapping() {
        for axis in 0..DIM {
            let near = Wall::from_axis(axis, false);
            let far = Wall::from_axis(axis, true);
            assert_eq!(near.axis(), axis);
            assert_eq!(far.axis(), axis);
            assert!(!near.is_far());
            assert!(far.is_far());
        }
        assert_eq!(Wall::from_axis(0, true), Wall::Right);
        assert_eq!(Wall::from_axis(2, false), Wall::Front);
    }

    #[test]
    fn test_atom_mechanics() {
        let atom = AtomState::new([1.0, 0.0, 0.0], [0.0, 2.0, 0.0], 3.0, 0.1);
        assert_eq!(atom.kinetic(), 6.0);
        assert_eq!(atom.kinetic_distributed(), [0.0, 6.0, 0.0]);
        assert_eq!(atom.impulse(), [0.0, 6.0, 0.0]);
        // r x p = (1,0,0) x (0,6,0) = (0,0,6)
        assert_eq!(atom.impulse_moment(), [0.0, 0.0, 6.0]);
    }

    #[test]
    fn test_samples_are_tightly_packed() {
        let metrics = Metrics {
            atoms: vec![AtomState::new([1.0; 3], [2.0; 3], 4.0, 0.5); 3],
            ..Default::default()
        };
        let samples = metrics.samples();
        let bytes = Metrics::sample_bytes(&samples);
        assert_eq!(bytes.len(), 3 * 32);
        assert_eq!(samples[2].radius, 0.5);
    }

    #[test]
    fn test_non_finite_metrics_detected() {
        let mut metrics = Metrics {
            atoms: vec![AtomState::new([0.0; 3], [1.0; 3], 1.0, 0.1)],
            ..Default::default()
        };
        assert!(metrics.is_finite());
        metrics.atoms[0].velocity[1] = f64::NAN;
        assert!(!metrics.is_finite());
    }
}
