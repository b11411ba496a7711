use chamber_core::{DIM, Metrics, Vector, WALL_COUNT, Wall};

use crate::impulse::WallImpulse;
use crate::store::AtomStore;

/// Area of `wall` (m^2)
pub fn wall_area(box_size: &Vector, wall: Wall) -> f64 {
    (0..DIM)
        .filter(|&d| d != wall.axis())
        .map(|d| box_size[d])
        .product()
}

/// Average pressure on every wall over the impulse window (Pa)
pub fn pressures(store: &AtomStore, impulse: &WallImpulse) -> [f64; WALL_COUNT] {
    let units = store.units();
    let box_size = store.box_size();
    let window = units.time_out(impulse.window_time());
    if !(window > 0.0) {
        return [0.0; WALL_COUNT];
    }
    Wall::ALL.map(|wall| {
        // Internal impulse is kg * internal velocity.
        let total = units.velocity_out(impulse.total(wall)).abs();
        total / window / wall_area(&box_size, wall)
    })
}

/// Snapshot the store into SI-unit metrics.
///
/// `time` is the simulated time in seconds, `collisions` the pairs resolved
/// during the last tick.
pub fn measure(
    store: &AtomStore,
    impulse: &WallImpulse,
    time: f64,
    tick: u64,
    collisions: usize,
) -> Metrics {
    let atoms = store.atoms();
    let box_size = store.box_size();

    let mut kinetic_energy = [0.0; DIM];
    let mut total_impulse = [0.0; DIM];
    let mut impulse_moment = [0.0; DIM];
    for atom in &atoms {
        let ke = atom.kinetic_distributed();
        let p = atom.impulse();
        let l = atom.impulse_moment();
        for d in 0..DIM {
            kinetic_energy[d] += ke[d];
            total_impulse[d] += p[d];
            impulse_moment[d] += l[d];
        }
    }

    Metrics {
        box_size,
        volume: box_size.iter().product(),
        kinetic_energy,
        pressure: pressures(store, impulse),
        impulse: total_impulse,
        impulse_moment,
        time,
        tick,
        collisions,
        atoms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamber_core::{AtomState, BroadPhaseMode, UnitScale};

    #[test]
    fn test_wall_area() {
        let box_size = [2.0, 3.0, 5.0];
        assert_eq!(wall_area(&box_size, Wall::Left), 15.0);
        assert_eq!(wall_area(&box_size, Wall::Bottom), 10.0);
        assert_eq!(wall_area(&box_size, Wall::Back), 6.0);
    }

    #[test]
    fn test_measure_sums_atoms() {
        let units = UnitScale::new(1.0, 1.0).unwrap();
        let mut store =
            AtomStore::new(&[2.0, 3.0, 5.0], 0.5, units, BroadPhaseMode::Straddling).unwrap();
        store.push(AtomState::new([1.0, 1.0, 1.0], [1.0, 0.0, 0.0], 2.0, 0.1)).unwrap();
        store.push(AtomState::new([1.0, 2.0, 1.0], [0.0, -2.0, 0.0], 1.0, 0.1)).unwrap();

        let metrics = measure(&store, &WallImpulse::new(), 0.5, 7, 3);
        assert_eq!(metrics.atoms.len(), 2);
        assert_eq!(metrics.volume, 30.0);
        assert_eq!(metrics.kinetic_energy, [1.0, 2.0, 0.0]);
        assert_eq!(metrics.total_kinetic(), 3.0);
        assert_eq!(metrics.impulse, [2.0, -2.0, 0.0]);
        // (1,1,1) x (2,0,0) + (1,2,1) x (0,-2,0)
        assert_eq!(metrics.impulse_moment, [2.0, 2.0, -4.0]);
        assert_eq!(metrics.pressure, [0.0; WALL_COUNT]);
        assert_eq!((metrics.time, metrics.tick, metrics.collisions), (0.5, 7, 3));
    }

    #[test]
    fn test_pressure_is_impulse_over_time_and_area() {
        // Default nanometre/picosecond scales exercise the conversion.
        let units = UnitScale::default();
        let store =
            AtomStore::new(&[2e-9, 4e-9, 5e-9], 1e-9, units, BroadPhaseMode::Straddling).unwrap();
        let mut impulse = WallImpulse::new();
        impulse.advance(units.time_in(1e-12));
        impulse.add(Wall::Right, units.velocity_in(6e-24));
        impulse.advance(units.time_in(2e-12));

        let p = pressures(&store, &impulse);
        let expected = 6e-24 / 3e-12 / (4e-9 * 5e-9);
        assert!((p[Wall::Right.index()] - expected).abs() / expected < 1e-9);
        assert_eq!(p[Wall::Left.index()], 0.0);
    }
}
