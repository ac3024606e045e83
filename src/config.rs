//! Parser configuration.
//!
//! All knobs that influence a parse are collected here and passed explicitly
//! to each parse call. There is no process-wide default format or other
//! ambient parser state.

use serde::{Deserialize, Serialize};

/// Length units declared by a survey format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnits {
    /// Decimal feet, the Compass native unit
    Feet,
    /// Meters, as exported by PocketTopo
    Meters,
}

impl LengthUnits {
    /// Convert a value in these units to feet.
    pub fn to_feet(self, value: f64) -> f64 {
        match self {
            LengthUnits::Feet => value,
            LengthUnits::Meters => value * 3.28084,
        }
    }

    /// Convert a value in these units to meters.
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            LengthUnits::Feet => value * 0.3048,
            LengthUnits::Meters => value,
        }
    }
}

/// Configuration threaded through every parse call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Maximum tolerated disagreement, in degrees, between a front-sight and
    /// its normalized back-sight before the shot is flagged suspect.
    /// `None` disables the check. Disagreement is never a parse error.
    pub backsight_tolerance: Option<f64>,

    /// Merge PocketTopo duplicate shots (triple-shots and back-sights
    /// between the same station pair) into a single running-mean shot.
    pub merge_duplicate_shots: bool,

    /// Declination applied when a header does not declare one.
    pub default_declination: f64,

    /// Units assumed when a format does not declare any.
    pub default_units: LengthUnits,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            backsight_tolerance: Some(2.0),
            merge_duplicate_shots: false,
            default_declination: 0.0,
            default_units: LengthUnits::Feet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions() {
        assert!((LengthUnits::Meters.to_feet(1.0) - 3.28084).abs() < 1e-9);
        assert!((LengthUnits::Feet.to_meters(1.0) - 0.3048).abs() < 1e-9);
        assert_eq!(LengthUnits::Feet.to_feet(12.5), 12.5);
        assert_eq!(LengthUnits::Meters.to_meters(12.5), 12.5);
    }

    #[test]
    fn test_defaults() {
        let config = ParseConfig::default();
        assert_eq!(config.backsight_tolerance, Some(2.0));
        assert!(!config.merge_duplicate_shots);
        assert_eq!(config.default_declination, 0.0);
        assert_eq!(config.default_units, LengthUnits::Feet);
    }
}
