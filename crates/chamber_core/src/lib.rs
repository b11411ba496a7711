pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod units;

pub use config::{BroadPhaseMode, ChamberConfig, Parallelism};
pub use constants::*;
pub use error::{AtomError, ConfigError, ConfigLoadError};
pub use types::*;
pub use units::UnitScale;
