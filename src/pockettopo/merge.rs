//! Duplicate-shot merging for PocketTopo trips.
//!
//! DistoX crews shoot mainline legs several times in a row, forward or as a
//! backsight. When merging is enabled, a run of consecutive shots between
//! the same two stations collapses into one averaged leg using a running
//! mean, so runs of any length (two, three, four readings) fold correctly.
//! Only the immediately preceding leg is considered.

use tracing::{debug, warn};

use crate::models::{Shot, Survey, SurveyHeader};
use crate::reconcile::{angle_delta, normalize_azimuth};

/// Disagreement beyond these limits between merged readings logs a warning
/// and flags the merged leg suspect.
const AZIMUTH_LIMIT: f64 = 2.0;
const INCLINATION_LIMIT: f64 = 2.0;
const LENGTH_LIMIT: f64 = 1.0;

/// Accumulates one trip's shots, optionally folding duplicate runs.
pub struct TripBuilder {
    header: SurveyHeader,
    merge: bool,
    shots: Vec<Shot>,
    /// Readings already folded into the last shot
    last_count: u32,
}

impl TripBuilder {
    pub fn new(header: SurveyHeader, merge: bool) -> Self {
        Self {
            header,
            merge,
            shots: Vec::new(),
            last_count: 1,
        }
    }

    pub fn designation(&self) -> &str {
        &self.header.designation
    }

    /// Append a shot, folding it into the previous one when it repeats the
    /// same leg (in either direction).
    pub fn add_shot(&mut self, shot: Shot) {
        if self.merge {
            if let Some(prev) = self.shots.last_mut() {
                if let Some(repeat) = repeat_of(prev, &shot) {
                    fold(prev, shot, repeat, self.last_count);
                    self.last_count += 1;
                    return;
                }
            }
        }
        self.shots.push(shot);
        self.last_count = 1;
    }

    /// Build the finished survey, reconciling every shot against the trip's
    /// declination.
    pub fn finish(self, tolerance: Option<f64>) -> Survey {
        let mut survey = Survey::new(self.header);
        for shot in self.shots {
            survey.add_shot_checked(shot, tolerance);
        }
        survey
    }
}

enum Repeat {
    Forward,
    Reversed,
}

/// Does `shot` repeat the same leg as `prev`, and in which direction?
/// Splays never merge.
fn repeat_of(prev: &Shot, shot: &Shot) -> Option<Repeat> {
    let to = shot.to_station.as_deref()?;
    let prev_to = prev.to_station.as_deref()?;
    if prev.from_station == shot.from_station && prev_to == to {
        Some(Repeat::Forward)
    } else if prev.from_station == to && prev_to == shot.from_station {
        Some(Repeat::Reversed)
    } else {
        None
    }
}

/// Fold `shot` into `prev`, which already averages `count` readings.
fn fold(prev: &mut Shot, shot: Shot, repeat: Repeat, count: u32) {
    let (azimuth, inclination) = match repeat {
        Repeat::Forward => (shot.bearing, shot.inclination),
        Repeat::Reversed => (
            shot.bearing.map(|azm| normalize_azimuth(azm + 180.0)),
            shot.inclination.map(|inc| -inc),
        ),
    };

    debug!(
        "merging repeated leg {} -> {:?} ({} readings)",
        prev.from_station,
        prev.to_station,
        count + 1
    );
    let mut suspect = false;
    if let (Some(prev_azm), Some(azm)) = (prev.bearing, azimuth) {
        let delta = angle_delta(prev_azm, azm);
        if delta > AZIMUTH_LIMIT {
            warn!(
                "merged azimuth disagreement of {:.1} degrees on {} -> {:?}",
                delta, prev.from_station, prev.to_station
            );
            suspect = true;
        }
    }
    if let (Some(prev_inc), Some(inc)) = (prev.inclination, inclination) {
        if (prev_inc - inc).abs() > INCLINATION_LIMIT {
            warn!(
                "merged inclination disagreement of {:.1} degrees on {} -> {:?}",
                (prev_inc - inc).abs(),
                prev.from_station,
                prev.to_station
            );
            suspect = true;
        }
    }
    if (prev.length - shot.length).abs() > LENGTH_LIMIT {
        warn!(
            "merged length disagreement of {:.1} on {} -> {:?}",
            (prev.length - shot.length).abs(),
            prev.from_station,
            prev.to_station
        );
        suspect = true;
    }

    let weight = count as f64;
    prev.length = (prev.length * weight + shot.length) / (weight + 1.0);
    prev.bearing = match (prev.bearing, azimuth) {
        (Some(mean), Some(azm)) => Some(running_circular_mean(mean, count, azm)),
        (mean, azm) => mean.or(azm),
    };
    prev.inclination = match (prev.inclination, inclination) {
        (Some(mean), Some(inc)) => Some((mean * weight + inc) / (weight + 1.0)),
        (mean, inc) => mean.or(inc),
    };
    prev.comment = match (prev.comment.take(), shot.comment) {
        (Some(a), Some(b)) => Some(format!("{a} {b}")),
        (a, b) => a.or(b),
    };
    if suspect {
        prev.flags.suspect_backsight = true;
    }
}

/// Fold one more bearing into a running mean of `count` bearings, moving
/// along the shortest arc so runs straddling north average correctly.
fn running_circular_mean(mean: f64, count: u32, value: f64) -> f64 {
    let diff = (value - mean).rem_euclid(360.0);
    let diff = if diff > 180.0 { diff - 360.0 } else { diff };
    normalize_azimuth(mean + diff / (count as f64 + 1.0))
}
