//! Core data structures for cave survey data.
//!
//! Defines the canonical model that every supported input format converges
//! onto: a [`Shot`] is one measured leg, a [`Survey`] is one session of
//! ordered shots, and a [`DatFile`] aggregates surveys under unique
//! designations. Entities are built once during a parse pass; mutation
//! afterward goes through the explicit construction APIs only.

use std::collections::HashMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::LengthUnits;
use crate::error::{Error, Result};
use crate::reconcile::{self, Sights};

/// Compass shot exclusion flag markers as they appear in the `#|…#` bracket.
pub mod flag_markers {
    pub const EXCLUDE_LENGTH: char = 'L';
    pub const EXCLUDE_PLOT: char = 'P';
    pub const EXCLUDE_TOTAL: char = 'X';
    pub const NO_ADJUSTMENT: char = 'C';
}

/// Boolean flags attached to one shot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotFlags {
    /// Excluded from cave length totals (`L`)
    pub exclude_length: bool,
    /// Excluded from plotting (`P`)
    pub exclude_plot: bool,
    /// Excluded from all processing (`X`)
    pub exclude_total: bool,
    /// Excluded from loop-closure adjustment (`C`)
    pub no_adjustment: bool,
    /// Detail shot to an unsurveyed point, no destination station
    pub splay: bool,
    /// Front/back sights disagreed beyond the configured tolerance
    pub suspect_backsight: bool,
}

impl ShotFlags {
    /// Decode a run of Compass flag marker characters.
    ///
    /// Returns the first unrecognized marker, if any; a 2013 Compass bug is
    /// known to leave binary garbage in the flags column.
    pub fn from_markers(markers: &str) -> std::result::Result<Self, char> {
        let mut flags = ShotFlags::default();
        for c in markers.chars() {
            match c {
                flag_markers::EXCLUDE_LENGTH => flags.exclude_length = true,
                flag_markers::EXCLUDE_PLOT => flags.exclude_plot = true,
                flag_markers::EXCLUDE_TOTAL => flags.exclude_total = true,
                flag_markers::NO_ADJUSTMENT => flags.no_adjustment = true,
                other => return Err(other),
            }
        }
        Ok(flags)
    }

    /// Render the Compass marker characters for the set flags.
    pub fn markers(&self) -> String {
        let mut markers = String::new();
        if self.exclude_length {
            markers.push(flag_markers::EXCLUDE_LENGTH);
        }
        if self.exclude_plot {
            markers.push(flag_markers::EXCLUDE_PLOT);
        }
        if self.exclude_total {
            markers.push(flag_markers::EXCLUDE_TOTAL);
        }
        if self.no_adjustment {
            markers.push(flag_markers::NO_ADJUSTMENT);
        }
        markers
    }
}

/// One measured leg (or splay) between survey stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Origin station
    pub from_station: String,
    /// Destination station; `None` for a splay shot
    pub to_station: Option<String>,
    /// Slope distance in the survey's declared length units, never negative
    pub length: f64,
    /// Raw front-sight compass bearing in degrees
    pub bearing: Option<f64>,
    /// Raw front-sight inclination in degrees
    pub inclination: Option<f64>,
    /// Raw back-sight compass bearing in degrees
    pub back_bearing: Option<f64>,
    /// Raw back-sight inclination in degrees
    pub back_inclination: Option<f64>,
    /// Passage dimension at the origin station; `f64::INFINITY` means the
    /// passage continues beyond measurement
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub up: Option<f64>,
    pub down: Option<f64>,
    /// Exclusion and status flags
    pub flags: ShotFlags,
    /// Free-text shot comment
    pub comment: Option<String>,
    /// Vendor-specific columns outside the core schema, in column order
    pub extensions: IndexMap<String, String>,

    // Reconciled values, computed once when the shot joins a survey.
    azimuth: Option<f64>,
    corrected_inclination: Option<f64>,
}

impl Shot {
    /// Create a shot with the given stations and length; all readings unset.
    pub fn new(
        from_station: impl Into<String>,
        to_station: Option<String>,
        length: f64,
    ) -> Self {
        Self {
            from_station: from_station.into(),
            to_station,
            length,
            bearing: None,
            inclination: None,
            back_bearing: None,
            back_inclination: None,
            left: None,
            right: None,
            up: None,
            down: None,
            flags: ShotFlags::default(),
            comment: None,
            extensions: IndexMap::new(),
            azimuth: None,
            corrected_inclination: None,
        }
    }

    /// The reconciled, declination-corrected bearing in `[0, 360)` degrees.
    ///
    /// `None` until the shot has been added to a survey, or when the shot
    /// carries no bearing reading at all.
    pub fn azimuth(&self) -> Option<f64> {
        self.azimuth
    }

    /// The reconciled inclination in degrees, averaging front and normalized
    /// back sights. `None` until the shot has been added to a survey.
    pub fn corrected_inclination(&self) -> Option<f64> {
        self.corrected_inclination
    }

    /// Is this shot a splay (detail shot with no destination station)?
    pub fn is_splay(&self) -> bool {
        self.flags.splay || self.to_station.is_none()
    }

    /// Does this shot count toward included length totals?
    pub fn is_included(&self) -> bool {
        !self.flags.exclude_length && !self.flags.exclude_total
    }

    /// Run the measurement reconciler over this shot's raw sights.
    pub(crate) fn reconcile(
        &mut self,
        declination: f64,
        backsights_corrected: bool,
        tolerance: Option<f64>,
    ) {
        let sights = Sights {
            bearing: self.bearing,
            inclination: self.inclination,
            back_bearing: self.back_bearing,
            back_inclination: self.back_inclination,
        };
        let reconciled = reconcile::reconcile(sights, declination, backsights_corrected, tolerance);
        self.azimuth = reconciled.azimuth;
        self.corrected_inclination = reconciled.inclination;
        if reconciled.suspect {
            self.flags.suspect_backsight = true;
        }
    }
}

/// Survey format declaration, decoded from the Compass `FORMAT:` token.
///
/// The raw token is preserved verbatim so a parsed survey writes back
/// unchanged; only the fields this library acts on are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyFormat {
    /// The format string as declared in the header
    pub raw: String,
    /// Length units for shot distances and LRUD
    pub units: LengthUnits,
    /// Shot records carry back-sight columns
    pub has_backsights: bool,
    /// Back-sight readings are already corrected (no 180° shift or negation)
    pub backsights_corrected: bool,
}

impl SurveyFormat {
    /// Compass format item positions. The second character declares length
    /// units; the twelfth declares back-sights and the thirteenth whether
    /// they are pre-corrected.
    pub fn parse(token: &str, default_units: LengthUnits) -> Self {
        let chars: Vec<char> = token.chars().collect();
        let units = match chars.get(1) {
            Some('M') => LengthUnits::Meters,
            Some(_) => LengthUnits::Feet,
            None => default_units,
        };
        let has_backsights = chars.get(11) == Some(&'B');
        let backsights_corrected = has_backsights && chars.get(12) == Some(&'C');
        Self {
            raw: token.to_string(),
            units,
            has_backsights,
            backsights_corrected,
        }
    }

    /// The documented Compass default format.
    pub fn standard(units: LengthUnits) -> Self {
        let raw = match units {
            LengthUnits::Feet => "DDDDLRUDLADN",
            LengthUnits::Meters => "DMMDLRUDLADN",
        };
        Self {
            raw: raw.to_string(),
            units,
            has_backsights: false,
            backsights_corrected: false,
        }
    }
}

/// Survey-level metadata extracted from a header block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyHeader {
    /// Short identifier unique within a project, e.g. `A1`
    pub designation: String,
    /// Name of the cave this survey belongs to; may be empty
    pub cave_name: String,
    pub date: NaiveDate,
    pub comment: String,
    /// Ordered, duplicate-preserving roster of surveyor names
    pub team: Vec<String>,
    /// Magnetic declination in signed degrees
    pub declination: f64,
    pub format: SurveyFormat,
    /// Compass, clino, and tape instrument corrections
    pub corrections: (f64, f64, f64),
    /// Back-compass and back-clino instrument corrections
    pub corrections2: (f64, f64),
    /// Declared shot column layout, applying to every shot line
    pub columns: Vec<String>,
}

impl SurveyHeader {
    /// Create a header with the given designation and date and all optional
    /// fields at their format defaults.
    pub fn new(designation: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            designation: designation.into(),
            cave_name: String::new(),
            date,
            comment: String::new(),
            team: Vec::new(),
            declination: 0.0,
            format: SurveyFormat::standard(LengthUnits::Feet),
            corrections: (0.0, 0.0, 0.0),
            corrections2: (0.0, 0.0),
            columns: default_columns(),
        }
    }
}

/// The shot column layout Compass writes by default.
pub fn default_columns() -> Vec<String> {
    ["FROM", "TO", "LENGTH", "BEARING", "INC", "LEFT", "UP", "DOWN", "RIGHT", "FLAGS", "COMMENTS"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// One named survey session: a header plus its ordered shots.
///
/// Shot order is survey-significant (the first shot may anchor the survey's
/// origin) and is always preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    header: SurveyHeader,
    shots: Vec<Shot>,
}

impl Survey {
    /// Create an empty survey from a header.
    pub fn new(header: SurveyHeader) -> Self {
        Self {
            header,
            shots: Vec::new(),
        }
    }

    /// Add a shot, reconciling its raw sights with this survey's declination
    /// and format. Programmatic construction path; parsers thread the
    /// configured back-sight tolerance via `add_shot_checked`.
    pub fn add_shot(&mut self, shot: Shot) {
        self.add_shot_checked(shot, None);
    }

    /// Add a shot, flagging it suspect when front and back sights disagree
    /// by more than `tolerance` degrees.
    pub fn add_shot_checked(&mut self, mut shot: Shot, tolerance: Option<f64>) {
        shot.reconcile(
            self.header.declination,
            self.header.format.backsights_corrected,
            tolerance,
        );
        self.shots.push(shot);
    }

    pub fn header(&self) -> &SurveyHeader {
        &self.header
    }

    /// Short identifier unique within a project.
    pub fn designation(&self) -> &str {
        &self.header.designation
    }

    /// The cave name this survey contributes to.
    pub fn name(&self) -> &str {
        &self.header.cave_name
    }

    pub fn date(&self) -> NaiveDate {
        self.header.date
    }

    pub fn comment(&self) -> &str {
        &self.header.comment
    }

    pub fn team(&self) -> &[String] {
        &self.header.team
    }

    pub fn declination(&self) -> f64 {
        self.header.declination
    }

    pub fn format(&self) -> &SurveyFormat {
        &self.header.format
    }

    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    /// Total surveyed length, regardless of exclusion flags.
    pub fn length(&self) -> f64 {
        self.shots.iter().map(|shot| shot.length).sum()
    }

    /// Surveyed length, not counting excluded shots.
    pub fn included_length(&self) -> f64 {
        self.shots
            .iter()
            .filter(|shot| shot.is_included())
            .map(|shot| shot.length)
            .sum()
    }

    /// Surveyed length that does not count toward the included total.
    pub fn excluded_length(&self) -> f64 {
        self.shots
            .iter()
            .filter(|shot| !shot.is_included())
            .map(|shot| shot.length)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Does any shot in this survey touch the named station?
    pub fn contains_station(&self, station: &str) -> bool {
        self.shots.iter().any(|shot| {
            shot.from_station == station || shot.to_station.as_deref() == Some(station)
        })
    }
}

impl<'a> IntoIterator for &'a Survey {
    type Item = &'a Shot;
    type IntoIter = std::slice::Iter<'a, Shot>;

    fn into_iter(self) -> Self::IntoIter {
        self.shots.iter()
    }
}

/// A UTM coordinate fixing a station or a project's base location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtmLocation {
    pub easting: f64,
    pub northing: f64,
    pub elevation: f64,
    pub zone: Option<i32>,
    /// UTM convergence angle in degrees
    pub convergence: Option<f64>,
    /// Geodetic datum name, e.g. `North American 1983`
    pub datum: Option<String>,
    /// Free-text note attached to the coordinate
    pub comment: Option<String>,
}

impl UtmLocation {
    pub fn new(easting: f64, northing: f64, elevation: f64) -> Self {
        Self {
            easting,
            northing,
            elevation,
            zone: None,
            convergence: None,
            datum: None,
            comment: None,
        }
    }
}

/// The full set of surveys read from one or more source files.
///
/// Surveys are held in original file order and indexed by designation;
/// designations are unique, and inserting a duplicate is a fatal structural
/// error rather than a silent overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatFile {
    /// Display name, conventionally derived from the source filename
    pub name: Option<String>,
    /// Base location from the owning `.MAK` project, when known
    pub base_location: Option<UtmLocation>,
    /// Raw `.MAK` file parameter characters, when known
    pub file_params: Option<String>,
    surveys: IndexMap<String, Survey>,
    reference_points: IndexMap<String, UtmLocation>,
}

impl DatFile {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            base_location: None,
            file_params: None,
            surveys: IndexMap::new(),
            reference_points: IndexMap::new(),
        }
    }

    /// Add a survey, failing on designation collision.
    pub fn add_survey(&mut self, survey: Survey) -> Result<()> {
        let designation = survey.designation().to_string();
        if self.surveys.contains_key(&designation) {
            return Err(Error::duplicate_designation(designation));
        }
        self.surveys.insert(designation, survey);
        Ok(())
    }

    /// O(1) lookup by designation.
    pub fn get(&self, designation: &str) -> Result<&Survey> {
        self.surveys
            .get(designation)
            .ok_or_else(|| Error::survey_not_found(designation))
    }

    pub fn contains(&self, designation: &str) -> bool {
        self.surveys.contains_key(designation)
    }

    /// Fix a named station at a UTM coordinate. The first reference point
    /// also anchors the project base location; a repeat of an existing
    /// station keeps the earlier coordinate.
    pub fn add_reference_point(&mut self, station: impl Into<String>, location: UtmLocation) {
        if self.base_location.is_none() {
            self.base_location = Some(location.clone());
        }
        self.reference_points.entry(station.into()).or_insert(location);
    }

    /// Fixed station coordinates in original file order.
    pub fn reference_points(&self) -> impl Iterator<Item = (&str, &UtmLocation)> {
        self.reference_points
            .iter()
            .map(|(station, location)| (station.as_str(), location))
    }

    /// The fixed coordinate for a station, if one was declared.
    pub fn reference_point(&self, station: &str) -> Option<&UtmLocation> {
        self.reference_points.get(station)
    }

    /// Surveys in original file order.
    pub fn iter(&self) -> impl Iterator<Item = &Survey> {
        self.surveys.values()
    }

    pub fn len(&self) -> usize {
        self.surveys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surveys.is_empty()
    }

    /// Total surveyed length across all member surveys.
    pub fn length(&self) -> f64 {
        self.iter().map(Survey::length).sum()
    }

    /// Surveyed length across all members, not counting excluded shots.
    pub fn included_length(&self) -> f64 {
        self.iter().map(Survey::included_length).sum()
    }

    /// Surveyed length that does not count toward the included total.
    pub fn excluded_length(&self) -> f64 {
        self.iter().map(Survey::excluded_length).sum()
    }

    /// Total footage credited to each team member: every member of a
    /// survey's roster is credited with that survey's full length.
    pub fn team_footage(&self) -> HashMap<String, f64> {
        let mut footage: HashMap<String, f64> = HashMap::new();
        for survey in self.iter() {
            for member in survey.team() {
                *footage.entry(member.clone()).or_insert(0.0) += survey.length();
            }
        }
        footage
    }

    /// Move every survey and reference point from `other` into this project,
    /// failing on the first designation collision.
    pub fn merge(&mut self, other: DatFile) -> Result<()> {
        for (station, location) in other.reference_points {
            self.reference_points.entry(station).or_insert(location);
        }
        for (_, survey) in other.surveys {
            self.add_survey(survey)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a DatFile {
    type Item = &'a Survey;
    type IntoIter = indexmap::map::Values<'a, String, Survey>;

    fn into_iter(self) -> Self::IntoIter {
        self.surveys.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey_with_lengths(designation: &str, lengths: &[f64]) -> Survey {
        let date = NaiveDate::from_ymd_opt(2016, 7, 9).unwrap();
        let mut survey = Survey::new(SurveyHeader::new(designation, date));
        for (i, &length) in lengths.iter().enumerate() {
            let shot = Shot::new(format!("{designation}{i}"), Some(format!("{designation}{}", i + 1)), length);
            survey.add_shot(shot);
        }
        survey
    }

    #[test]
    fn test_flag_markers_round_trip() {
        let flags = ShotFlags::from_markers("LX").unwrap();
        assert!(flags.exclude_length);
        assert!(flags.exclude_total);
        assert!(!flags.exclude_plot);
        assert_eq!(flags.markers(), "LX");
    }

    #[test]
    fn test_flag_markers_reject_garbage() {
        assert_eq!(ShotFlags::from_markers("L\u{7f}"), Err('\u{7f}'));
    }

    #[test]
    fn test_exclusion_aggregation() {
        let date = NaiveDate::from_ymd_opt(2016, 7, 9).unwrap();
        let mut survey = Survey::new(SurveyHeader::new("A1", date));
        for (i, &(length, excluded)) in [(10.0, false), (20.0, true), (30.0, false)]
            .iter()
            .enumerate()
        {
            let mut shot = Shot::new(format!("A{i}"), Some(format!("A{}", i + 1)), length);
            shot.flags.exclude_length = excluded;
            survey.add_shot(shot);
        }
        assert_eq!(survey.length(), 60.0);
        assert_eq!(survey.included_length(), 40.0);
        assert_eq!(survey.excluded_length(), 20.0);
    }

    #[test]
    fn test_add_shot_applies_declination() {
        let date = NaiveDate::from_ymd_opt(2016, 7, 9).unwrap();
        let mut header = SurveyHeader::new("A1", date);
        header.declination = 5.0;
        let mut survey = Survey::new(header);

        let mut shot = Shot::new("A1", Some("A2".to_string()), 10.0);
        shot.bearing = Some(100.0);
        shot.back_bearing = Some(280.0);
        survey.add_shot(shot);

        assert_eq!(survey.shots()[0].azimuth(), Some(105.0));
    }

    #[test]
    fn test_splay_detection() {
        let splay = Shot::new("A1", None, 3.2);
        assert!(splay.is_splay());
        let leg = Shot::new("A1", Some("A2".to_string()), 3.2);
        assert!(!leg.is_splay());
    }

    #[test]
    fn test_duplicate_designation_is_fatal() {
        let mut datfile = DatFile::new(None);
        datfile.add_survey(survey_with_lengths("A1", &[10.0])).unwrap();
        let err = datfile
            .add_survey(survey_with_lengths("A1", &[20.0]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDesignation { .. }));
        // The original survey was not overwritten
        assert_eq!(datfile.get("A1").unwrap().length(), 10.0);
    }

    #[test]
    fn test_lookup_miss() {
        let datfile = DatFile::new(None);
        assert!(matches!(
            datfile.get("ZZ"),
            Err(Error::SurveyNotFound { .. })
        ));
    }

    #[test]
    fn test_merge_disjoint_and_ordering() {
        let mut first = DatFile::new(None);
        first.add_survey(survey_with_lengths("A1", &[10.0])).unwrap();
        let mut second = DatFile::new(None);
        second.add_survey(survey_with_lengths("B1", &[5.0])).unwrap();
        second.add_survey(survey_with_lengths("B2", &[7.0])).unwrap();

        first.merge(second).unwrap();
        assert_eq!(first.len(), 3);
        let order: Vec<&str> = first.iter().map(Survey::designation).collect();
        assert_eq!(order, vec!["A1", "B1", "B2"]);
        assert_eq!(first.length(), 22.0);
    }

    #[test]
    fn test_reference_points_kept_in_order() {
        let mut datfile = DatFile::new(None);
        datfile.add_reference_point("A1", UtmLocation::new(1.0, 2.0, 3.0));
        datfile.add_reference_point("B5", UtmLocation::new(4.0, 5.0, 6.0));

        // First point anchors the base location
        assert_eq!(datfile.base_location.as_ref().unwrap().easting, 1.0);
        let stations: Vec<&str> = datfile.reference_points().map(|(station, _)| station).collect();
        assert_eq!(stations, vec!["A1", "B5"]);
        assert_eq!(datfile.reference_point("B5").unwrap().northing, 5.0);

        // A repeat of an existing station keeps the earlier coordinate
        datfile.add_reference_point("A1", UtmLocation::new(9.0, 9.0, 9.0));
        assert_eq!(datfile.reference_point("A1").unwrap().easting, 1.0);
    }

    #[test]
    fn test_team_footage() {
        let date = NaiveDate::from_ymd_opt(2016, 7, 9).unwrap();
        let mut one = Survey::new(SurveyHeader::new("A1", date));
        one.header.team = vec!["Alice".to_string(), "Bob".to_string()];
        one.add_shot(Shot::new("A1", Some("A2".to_string()), 100.0));

        let mut two = Survey::new(SurveyHeader::new("B1", date));
        two.header.team = vec!["Bob".to_string()];
        two.add_shot(Shot::new("B1", Some("B2".to_string()), 50.0));

        let mut datfile = DatFile::new(None);
        datfile.add_survey(one).unwrap();
        datfile.add_survey(two).unwrap();

        let footage = datfile.team_footage();
        assert_eq!(footage["Alice"], 100.0);
        assert_eq!(footage["Bob"], 150.0);
    }

    #[test]
    fn test_format_parsing() {
        let format = SurveyFormat::parse("DMMDLRUDLADBC", LengthUnits::Feet);
        assert_eq!(format.units, LengthUnits::Meters);
        assert!(format.has_backsights);
        assert!(format.backsights_corrected);

        let format = SurveyFormat::parse("DDDDLRUDLADN", LengthUnits::Feet);
        assert_eq!(format.units, LengthUnits::Feet);
        assert!(!format.has_backsights);
        assert!(!format.backsights_corrected);
    }
}
