//! Measurement reconciliation.
//!
//! Collapses one or two compass/clino readings (front-sight plus optional
//! back-sight) into a single corrected azimuth/inclination pair. Back-sights
//! are normalized first (bearing shifted 180°, inclination negated, unless
//! the survey format declares them pre-corrected), front and back are then
//! averaged along the shortest arc of the compass circle, and magnetic
//! declination is applied exactly once to the averaged bearing.
//!
//! Also provides the scalar angle helpers used by the format adapters.

use tracing::warn;

/// Raw readings for one shot, as taken from a record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sights {
    /// Front-sight compass bearing in degrees
    pub bearing: Option<f64>,
    /// Front-sight inclination in degrees
    pub inclination: Option<f64>,
    /// Back-sight compass bearing in degrees
    pub back_bearing: Option<f64>,
    /// Back-sight inclination in degrees
    pub back_inclination: Option<f64>,
}

/// A reconciled, declination-corrected measurement pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reconciled {
    /// Corrected azimuth in `[0, 360)` degrees
    pub azimuth: Option<f64>,
    /// Corrected inclination in degrees
    pub inclination: Option<f64>,
    /// Front and back sights disagreed by more than the configured tolerance
    pub suspect: bool,
}

/// Reconcile front/back sights into one corrected measurement pair.
///
/// `backsights_corrected` is true when the survey format declares that
/// back-sight readings were already flipped by the instrument or software,
/// in which case the 180° shift and inclination negation are skipped.
/// `tolerance` is the maximum front/back disagreement in degrees before the
/// result is flagged suspect; shots are averaged either way.
pub fn reconcile(
    sights: Sights,
    declination: f64,
    backsights_corrected: bool,
    tolerance: Option<f64>,
) -> Reconciled {
    let back_bearing = sights.back_bearing.map(|azm| {
        if backsights_corrected {
            normalize_azimuth(azm)
        } else {
            normalize_azimuth(azm - 180.0)
        }
    });
    let back_inclination = sights.back_inclination.map(|inc| {
        if backsights_corrected { inc } else { -inc }
    });

    let mut suspect = false;
    if let Some(limit) = tolerance {
        if let (Some(front), Some(back)) = (sights.bearing, back_bearing) {
            let delta = angle_delta(front, back);
            if delta > limit {
                warn!(
                    "front/back bearing disagreement of {:.1} degrees ({:.1} vs {:.1})",
                    delta, front, back
                );
                suspect = true;
            }
        }
        if let (Some(front), Some(back)) = (sights.inclination, back_inclination) {
            let delta = (front - back).abs();
            if delta > limit {
                warn!(
                    "front/back inclination disagreement of {:.1} degrees ({:.1} vs {:.1})",
                    delta, front, back
                );
                suspect = true;
            }
        }
    }

    let azimuth = match (sights.bearing, back_bearing) {
        (Some(front), Some(back)) => Some(circular_mean(front, back)),
        (Some(front), None) => Some(normalize_azimuth(front)),
        (None, Some(back)) => Some(back),
        (None, None) => None,
    }
    .map(|azm| normalize_azimuth(azm + declination));

    let inclination = match (sights.inclination, back_inclination) {
        (Some(front), Some(back)) => Some((front + back) / 2.0),
        (Some(front), None) => Some(front),
        (None, Some(back)) => Some(back),
        (None, None) => None,
    };

    Reconciled {
        azimuth,
        inclination,
        suspect,
    }
}

/// Normalize an angle into `[0, 360)` degrees.
pub fn normalize_azimuth(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Mean of two bearings along the shortest arc between them.
///
/// A naive arithmetic mean of 359° and 1° is 180°; the circular mean is 0°.
pub fn circular_mean(a: f64, b: f64) -> f64 {
    let diff = (b - a).rem_euclid(360.0);
    let diff = if diff > 180.0 { diff - 360.0 } else { diff };
    normalize_azimuth(a + diff / 2.0)
}

/// Absolute difference between two angles, in `[0, 180]` degrees.
pub fn angle_delta(a: f64, b: f64) -> f64 {
    180.0 - ((a - b).abs().rem_euclid(360.0) - 180.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both(bearing: f64, back_bearing: f64) -> Sights {
        Sights {
            bearing: Some(bearing),
            back_bearing: Some(back_bearing),
            ..Sights::default()
        }
    }

    #[test]
    fn test_front_sight_only() {
        let sights = Sights {
            bearing: Some(100.0),
            inclination: Some(-12.0),
            ..Sights::default()
        };
        let result = reconcile(sights, 5.0, false, Some(2.0));
        assert_eq!(result.azimuth, Some(105.0));
        assert_eq!(result.inclination, Some(-12.0));
        assert!(!result.suspect);
    }

    #[test]
    fn test_agreeing_backsight_no_averaging_skew() {
        // Back bearing exactly 180 degrees opposite: declination applied once
        let result = reconcile(both(100.0, 280.0), 5.0, false, Some(2.0));
        assert_eq!(result.azimuth, Some(105.0));
        assert!(!result.suspect);
    }

    #[test]
    fn test_circular_mean_across_north() {
        // 359 front, raw 181 back normalizes to 1; mean must be 0, not 180
        let result = reconcile(both(359.0, 181.0), 0.0, false, Some(2.0));
        assert_eq!(result.azimuth, Some(0.0));
    }

    #[test]
    fn test_backsight_inclination_negated_and_averaged() {
        let sights = Sights {
            inclination: Some(10.0),
            back_inclination: Some(-11.0),
            ..Sights::default()
        };
        let result = reconcile(sights, 0.0, false, None);
        assert_eq!(result.inclination, Some(10.5));
    }

    #[test]
    fn test_corrected_backsights_skip_normalization() {
        // Instrument already flipped the back readings
        let sights = Sights {
            bearing: Some(100.0),
            inclination: Some(10.0),
            back_bearing: Some(102.0),
            back_inclination: Some(10.0),
            ..Sights::default()
        };
        let result = reconcile(sights, 0.0, true, None);
        assert_eq!(result.azimuth, Some(101.0));
        assert_eq!(result.inclination, Some(10.0));
    }

    #[test]
    fn test_backsight_only() {
        let sights = Sights {
            back_bearing: Some(10.0),
            back_inclination: Some(5.0),
            ..Sights::default()
        };
        let result = reconcile(sights, 2.0, false, None);
        assert_eq!(result.azimuth, Some(192.0));
        assert_eq!(result.inclination, Some(-5.0));
    }

    #[test]
    fn test_disagreement_flags_suspect() {
        let result = reconcile(both(100.0, 290.0), 0.0, false, Some(2.0));
        assert!(result.suspect);
        // Still averaged, never rejected
        assert_eq!(result.azimuth, Some(105.0));

        let result = reconcile(both(100.0, 290.0), 0.0, false, None);
        assert!(!result.suspect);
    }

    #[test]
    fn test_declination_normalizes_into_range() {
        let sights = Sights {
            bearing: Some(358.0),
            ..Sights::default()
        };
        let result = reconcile(sights, 5.0, false, None);
        assert_eq!(result.azimuth, Some(3.0));
    }

    #[test]
    fn test_angle_delta_wraps() {
        assert_eq!(angle_delta(359.0, 1.0), 2.0);
        assert_eq!(angle_delta(90.0, 270.0), 180.0);
        assert_eq!(angle_delta(10.0, 10.0), 0.0);
    }

    #[test]
    fn test_circular_mean_plain() {
        assert_eq!(circular_mean(90.0, 100.0), 95.0);
        assert_eq!(circular_mean(100.0, 90.0), 95.0);
    }
}
