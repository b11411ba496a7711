use chamber_core::{MEASUREMENT_SIZE, WALL_COUNT, Wall};

use crate::walls::WallHits;

/// Rolling window of wall impulse, one slot per tick.
///
/// Each slot holds the impulse every wall received during that tick plus the
/// tick's duration, so pressure can be averaged over the last
/// `MEASUREMENT_SIZE` ticks whatever their lengths. Internal units.
#[derive(Debug, Clone)]
pub struct WallImpulse {
    slots: [[f64; WALL_COUNT]; MEASUREMENT_SIZE],
    durations: [f64; MEASUREMENT_SIZE],
    current: usize,
}

impl Default for WallImpulse {
    fn default() -> Self {
        Self {
            slots: [[0.0; WALL_COUNT]; MEASUREMENT_SIZE],
            durations: [0.0; MEASUREMENT_SIZE],
            current: 0,
        }
    }
}

impl WallImpulse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new tick of length `dt`, dropping the oldest slot
    pub fn advance(&mut self, dt: f64) {
        self.current = (self.current + 1) % MEASUREMENT_SIZE;
        self.slots[self.current] = [0.0; WALL_COUNT];
        self.durations[self.current] = dt;
    }

    pub fn add(&mut self, wall: Wall, value: f64) {
        self.slots[self.current][wall.index()] += value;
    }

    /// Record one shard's reflections along `axis`
    pub fn add_hits(&mut self, axis: usize, hits: &WallHits) {
        self.add(Wall::from_axis(axis, false), hits.impulse[0]);
        self.add(Wall::from_axis(axis, true), hits.impulse[1]);
    }

    /// Impulse on `wall` summed over the window
    pub fn total(&self, wall: Wall) -> f64 {
        self.slots.iter().map(|slot| slot[wall.index()]).sum()
    }

    /// Time covered by the window
    pub fn window_time(&self) -> f64 {
        self.durations.iter().sum()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
