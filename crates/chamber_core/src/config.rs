use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DIM, DT};
use crate::error::{ConfigError, ConfigLoadError};
use crate::types::Vector;
use crate::units::UnitScale;

/// How atoms are registered with the collision grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BroadPhaseMode {
    /// One entry per grid cell the atom's bounding box touches; no overlap is missed
    #[default]
    Straddling,
    /// One entry per atom (its centre's cell); pairs straddling a cell face can be missed
    HomeCell,
}

/// How per-tick work is spread over threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Parallelism {
    /// Everything on the calling thread (reference behaviour)
    Sequential,
    /// Work-stealing parallel-for over shards
    DataParallel,
    /// Fixed worker threads, reused every tick, joined by a barrier
    #[default]
    WorkerPool,
}

/// Chamber configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChamberConfig {
    /// Box lengths along each axis (m)
    pub box_size: Vector,
    /// Edge of a collision-grid cell (m); should be at least the largest atom diameter
    pub cell_size: f64,
    pub units: UnitScale,
    /// Timestep (s)
    pub dt: f64,
    pub enable_collisions: bool,
    /// Open the escape aperture in the right wall
    pub enable_hole: bool,
    pub broad_phase: BroadPhaseMode,
    pub parallelism: Parallelism,
    /// Worker threads; 0 picks the hardware concurrency
    pub workers: usize,
    /// Driver delay exponent: the driver waits 1.2^period microseconds between ticks
    pub tick_period: Option<u32>,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            box_size: [2e-8; DIM],
            cell_size: 2.5e-10,
            units: UnitScale::default(),
            dt: DT,
            enable_collisions: true,
            enable_hole: false,
            broad_phase: BroadPhaseMode::default(),
            parallelism: Parallelism::default(),
            workers: 0,
            tick_period: None,
        }
    }
}

impl ChamberConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.units.validate()?;
        for (axis, &value) in self.box_size.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidBoxDimension { axis, value });
            }
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        validate_timestep(self.dt)
    }

    /// Resolved worker count (never zero)
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Load a configuration from a RON file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&contents)?;
        tracing::info!("Loaded chamber config from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(contents: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}

pub fn validate_timestep(dt: f64) -> Result<(), ConfigError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimestep(dt))
    }
}
