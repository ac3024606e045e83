//! PocketTopo exported `.TXT` support.
//!
//! A PocketTopo export starts with one line naming the cave and its units,
//! then a block of trip headers (`[id]: date declination "comment"`), then
//! shot rows tagged with the owning trip id in square brackets. Rows with no
//! trip id are reference points fixing a station in UTM space, or junk
//! zero-value placeholders. Everything converges onto the same survey model
//! as the Compass formats, with each trip becoming one survey.
//!
//! PocketTopo convention is to shoot mainline legs two or three times
//! (forward and back); [`ParseConfig::merge_duplicate_shots`] folds those
//! runs into one averaged leg as they stream in.

mod merge;

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info};

use crate::config::{LengthUnits, ParseConfig};
use crate::error::{Error, Result};
use crate::models::{DatFile, Shot, SurveyFormat, SurveyHeader, UtmLocation};
use crate::read_windows_1252;

use merge::TripBuilder;

/// `CaveName (m, 360)`
static FIRST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w\s]*)\(([\w\s]*),([\w\s]*)").expect("first-line pattern"));

/// Read and parse a PocketTopo `.TXT` export.
pub fn read_txt(path: &Path, config: &ParseConfig) -> Result<DatFile> {
    debug!("parsing PocketTopo .TXT file {}", path.display());
    let content = read_windows_1252(path)?;
    let datfile = parse_txt(&content, path, config)?;
    info!(
        "parsed {} trips from {}",
        datfile.len(),
        path.display()
    );
    Ok(datfile)
}

/// Parse `.TXT` text that has already been decoded; `path` is error context.
pub fn parse_txt(content: &str, path: &Path, config: &ParseConfig) -> Result<DatFile> {
    let mut lines = content.lines().enumerate().map(|(index, text)| (index + 1, text));

    let (number, first_line) = lines
        .next()
        .ok_or_else(|| Error::malformed_header(path, 1, "empty file"))?;
    let (cave_name, units) = parse_first_line(first_line, path, number)?;

    let mut datfile = DatFile::new(Some(cave_name.clone()));
    let mut trips: Vec<TripBuilder> = Vec::new();
    let mut in_trip_block = true;

    for (number, raw_line) in lines {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if in_trip_block && line.starts_with('[') {
            let header = parse_trip_header(line, path, number, &cave_name, units)?;
            trips.push(TripBuilder::new(header, config.merge_duplicate_shots));
            continue;
        }
        in_trip_block = false;

        parse_data_row(line, path, number, &mut trips, &mut datfile)?;
    }

    for trip in trips {
        datfile.add_survey(trip.finish(config.backsight_tolerance))?;
    }
    Ok(datfile)
}

/// The first line names the cave and declares length and angle units.
/// Grad-based exports are not supported.
fn parse_first_line(line: &str, path: &Path, number: usize) -> Result<(String, LengthUnits)> {
    let captures = FIRST_LINE.captures(line).ok_or_else(|| {
        Error::malformed_header(path, number, format!("unrecognized first line '{line}'"))
    })?;
    let cave_name = captures[1].trim().to_string();
    let units = match captures[2].trim() {
        "m" => LengthUnits::Meters,
        _ => LengthUnits::Feet,
    };
    if captures[3].trim() != "360" {
        return Err(Error::malformed_header(
            path,
            number,
            format!("unsupported angle units '{}'", captures[3].trim()),
        ));
    }
    Ok((cave_name, units))
}

/// `[id]: YYYY/MM/DD declination "comment"`
fn parse_trip_header(
    line: &str,
    path: &Path,
    number: usize,
    cave_name: &str,
    units: LengthUnits,
) -> Result<SurveyHeader> {
    let (fields, comment) = match line.split_once('"') {
        Some((fields, comment)) => (fields, Some(comment.trim_end_matches('"'))),
        None => (line, None),
    };
    let tokens: Vec<&str> = fields.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Error::malformed_header(
            path,
            number,
            format!("trip header needs id, date, declination, found '{line}'"),
        ));
    }

    let id = tokens[0].trim_matches(['[', ']', ':']);
    let date = NaiveDate::parse_from_str(tokens[1], "%Y/%m/%d").map_err(|_| {
        Error::malformed_header(path, number, format!("bad trip date '{}'", tokens[1]))
    })?;
    let declination = tokens[2].parse::<f64>().map_err(|_| {
        Error::malformed_header(path, number, format!("bad trip declination '{}'", tokens[2]))
    })?;

    let mut header = SurveyHeader::new(id, date);
    header.cave_name = cave_name.to_string();
    header.declination = declination;
    header.format = SurveyFormat::standard(units);
    if let Some(comment) = comment {
        header.comment = comment.trim().to_string();
    }
    Ok(header)
}

/// One data row: a shot or splay tagged `[trip]`, a reference point, or a
/// zero-value placeholder.
fn parse_data_row(
    line: &str,
    path: &Path,
    number: usize,
    trips: &mut [TripBuilder],
    datfile: &mut DatFile,
) -> Result<()> {
    // A trailing quoted comment applies to the whole row
    let (line, comment) = match line.split_once('"') {
        Some((rest, comment)) => (rest, Some(comment.trim_end_matches('"').to_string())),
        None => (line, None),
    };

    let Some((readings, id_part)) = line.split_once('[') else {
        parse_reference_point(line, comment, number, datfile);
        return Ok(());
    };
    let trip_id = id_part.trim().trim_end_matches(']');

    let tokens: Vec<&str> = readings.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Error::malformed_shot(
            path,
            number,
            format!("shot needs length, azimuth, inclination, found '{line}'"),
        ));
    }
    let (stations, values) = tokens.split_at(tokens.len() - 3);
    let mut numbers = [0.0f64; 3];
    for (slot, token) in numbers.iter_mut().zip(values) {
        *slot = token.parse::<f64>().map_err(|_| {
            Error::malformed_shot(path, number, format!("bad shot value '{token}'"))
        })?;
    }
    let [length, azimuth, inclination] = numbers;
    if length < 0.0 {
        return Err(Error::malformed_shot(
            path,
            number,
            format!("negative shot length {length}"),
        ));
    }

    let (from_station, to_station) = match stations {
        [from, to] => (*from, Some(to.to_string())),
        [from] => (*from, None),
        [] if length == 0.0 => return Ok(()), // junk placeholder row
        _ => {
            return Err(Error::malformed_shot(
                path,
                number,
                format!("unrecognized station list in '{line}'"),
            ));
        }
    };

    let mut shot = Shot::new(from_station, to_station, length);
    shot.bearing = Some(azimuth);
    shot.inclination = Some(inclination);
    shot.comment = comment;
    if shot.to_station.is_none() {
        shot.flags.splay = true;
        shot.flags.exclude_length = true;
    }

    let trip = trips
        .iter_mut()
        .find(|trip| trip.designation() == trip_id)
        .ok_or_else(|| {
            Error::malformed_shot(path, number, format!("shot references unknown trip '{trip_id}'"))
        })?;
    trip.add_shot(shot);
    Ok(())
}

/// A row of a station plus three values fixes that station in UTM space;
/// all-zero rows are placeholders PocketTopo emits for unfinished legs.
fn parse_reference_point(
    line: &str,
    comment: Option<String>,
    number: usize,
    datfile: &mut DatFile,
) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 4 {
        debug!("skipping unrecognized row at line {number}: '{line}'");
        return;
    }
    let mut values = [0.0f64; 3];
    for (slot, token) in values.iter_mut().zip(&tokens[1..]) {
        match token.parse::<f64>() {
            Ok(value) => *slot = value,
            Err(_) => {
                debug!("skipping unrecognized row at line {number}: '{line}'");
                return;
            }
        }
    }
    if values[0] == 0.0 {
        debug!("skipping zero-value placeholder at line {number}");
        return;
    }

    let mut location = UtmLocation::new(values[0], values[1], values[2]);
    location.comment = comment;
    debug!("reference point {} at {:?}", tokens[0], location);
    datfile.add_reference_point(tokens[0], location);
}
