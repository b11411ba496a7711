use std::io;

/// Invalid engine configuration; fatal at configuration time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
    #[error("box length along axis {axis} must be positive and finite, got {value}")]
    InvalidBoxDimension { axis: usize, value: f64 },
    #[error("grid needs {bits} hash bits; a packed cell hash holds fewer than 32")]
    GridTooFine { bits: u32 },
    #[error("unit scale must be positive and finite (meter = {meter}, second = {second})")]
    InvalidUnitScale { meter: f64, second: f64 },
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
}

/// Rejected atom data or index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AtomError {
    #[error("atom {index}: mass must be finite and non-negative, got {mass}")]
    InvalidMass { index: usize, mass: f64 },
    #[error("atom {index}: radius must be positive and finite, got {radius}")]
    InvalidRadius { index: usize, radius: f64 },
    #[error("atom {index}: position and velocity must be finite")]
    NonFiniteState { index: usize },
    #[error("atom index {index} out of range for {len} atoms")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}
