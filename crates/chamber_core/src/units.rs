use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Scale factors between SI quantities and the engine's internal units.
///
/// Masses are not rescaled. Internal velocity is `v / meter * second`, so an
/// impulse computed internally converts back with `meter / second`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitScale {
    /// Metres per internal length unit
    pub meter: f64,
    /// Seconds per internal time unit
    pub second: f64,
}

impl Default for UnitScale {
    fn default() -> Self {
        Self {
            meter: 1e-9,
            second: 1e-12,
        }
    }
}

impl UnitScale {
    pub fn new(meter: f64, second: f64) -> Result<Self, ConfigError> {
        let scale = Self { meter, second };
        scale.validate()?;
        Ok(scale)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |x: f64| x.is_finite() && x > 0.0;
        if ok(self.meter) && ok(self.second) {
            Ok(())
        } else {
            Err(ConfigError::InvalidUnitScale {
                meter: self.meter,
                second: self.second,
            })
        }
    }

    pub fn length_in(&self, metres: f64) -> f64 {
        metres / self.meter
    }

    pub fn length_out(&self, internal: f64) -> f64 {
        internal * self.meter
    }

    pub fn velocity_in(&self, metres_per_second: f64) -> f64 {
        metres_per_second / self.meter * self.second
    }

    pub fn velocity_out(&self, internal: f64) -> f64 {
        internal * self.meter / self.second
    }

    pub fn time_in(&self, seconds: f64) -> f64 {
        seconds / self.second
    }

    pub fn time_out(&self, internal: f64) -> f64 {
        internal * self.second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_scale_matches_length_over_time() {
        let units = UnitScale::new(1e-9, 1e-12).unwrap();
        // 1 nm/ps == 1000 m/s
        assert!((units.velocity_in(1000.0) - 1.0).abs() < 1e-12);
        assert!((units.velocity_out(1.0) - 1000.0).abs() < 1e-9);
        let moved = units.length_out(units.velocity_in(1000.0) * units.time_in(1e-12));
        assert!((moved - 1e-9).abs() < 1e-21);
    }

    #[test]
    fn test_rejects_degenerate_scale() {
        assert!(UnitScale::new(0.0, 1.0).is_err());
        assert!(UnitScale::new(1.0, f64::NAN).is_err());
    }
}
