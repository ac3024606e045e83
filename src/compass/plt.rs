//! `.PLT` compiled plot adapter.
//!
//! A `.PLT` file is the compiled output of Compass loop closure: line-tagged
//! records where each line starts with a one-character tag. `N` begins a
//! survey segment, `M` moves the plotting pen, `D` draws a leg to the next
//! station, `X` ends the segment, `P` fixes a station, and `Z`/`S`/`G`/`O`
//! carry plot-wide bounds and geodesy. The adapter recovers shot
//! length/bearing/inclination from successive pen positions and feeds them
//! through the same reconciler and survey builder as the raw formats, so a
//! plot parses into the same [`DatFile`] model. Plots are already
//! declination-corrected, so segment declination is zero.
//!
//! Coordinates are read as (north, east, vertical) in plot order.

use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::ParseConfig;
use crate::error::{Error, Result};
use crate::models::{DatFile, Shot, Survey, SurveyHeader, UtmLocation};
use crate::reconcile::normalize_azimuth;
use crate::{name_from_path, read_windows_1252};

/// Read a Compass `.PLT` plot into the shared survey model.
pub fn read_plt(path: &Path, config: &ParseConfig) -> Result<DatFile> {
    debug!("parsing Compass .PLT file {}", path.display());
    let content = read_windows_1252(path)?;
    let mut datfile = parse_plt(&content, path, config)?;
    if datfile.name.is_none() {
        datfile.name = name_from_path(path);
    }
    Ok(datfile)
}

/// The plotting pen: last position and the station that put it there.
#[derive(Debug, Clone)]
struct Pen {
    north: f64,
    east: f64,
    vertical: f64,
    station: String,
}

/// One decoded `M`/`D` command.
struct PenCommand {
    north: f64,
    east: f64,
    vertical: f64,
    station: String,
    left: Option<f64>,
    right: Option<f64>,
    up: Option<f64>,
    down: Option<f64>,
}

/// Parse `.PLT` text that has already been decoded; `path` is error context.
pub fn parse_plt(content: &str, path: &Path, config: &ParseConfig) -> Result<DatFile> {
    let mut datfile = DatFile::new(None);
    let mut utm_zone: Option<i32> = None;
    let mut datum: Option<String> = None;
    let mut fixed_point: Option<UtmLocation> = None;

    let mut segment: Option<Survey> = None;
    let mut pen: Option<Pen> = None;

    for (index, raw_line) in content.lines().enumerate() {
        let number = index + 1;
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let tag = line.chars().next().unwrap_or_default();
        let value = &line[tag.len_utf8()..];

        match tag {
            // Plot- and segment-wide bounds; nothing in the survey model
            'Z' => {}
            'S' => {
                if datfile.name.is_none() {
                    datfile.name = Some(value.trim().to_string());
                }
            }
            'G' => {
                utm_zone = value.trim().parse::<i32>().ok();
            }
            'O' => {
                datum = Some(value.trim().to_string());
            }
            'N' => {
                segment = Some(Survey::new(parse_segment_header(value, path, number)?));
                pen = None;
            }
            'M' => {
                let command = parse_pen_command(value, path, number)?;
                pen = Some(Pen {
                    north: command.north,
                    east: command.east,
                    vertical: command.vertical,
                    station: command.station,
                });
            }
            'D' => {
                let command = parse_pen_command(value, path, number)?;
                let survey = segment.as_mut().ok_or_else(|| {
                    Error::malformed_shot(path, number, "draw command before any segment start")
                })?;
                let origin = pen.as_ref().ok_or_else(|| {
                    Error::malformed_shot(path, number, "draw command before any pen move")
                })?;
                let shot = shot_from_geometry(origin, &command);
                survey.add_shot_checked(shot, config.backsight_tolerance);
                pen = Some(Pen {
                    north: command.north,
                    east: command.east,
                    vertical: command.vertical,
                    station: command.station,
                });
            }
            'X' => {
                // Segment bounds mark the end of the segment
                if let Some(survey) = segment.take() {
                    datfile.add_survey(survey)?;
                }
                pen = None;
            }
            'P' => {
                let location = parse_fixed_point(value, path, number)?;
                if fixed_point.is_none() {
                    fixed_point = Some(location);
                }
            }
            '\x1a' => {} // soft EOF
            other => {
                return Err(Error::unrecognized_token(path, number, other.to_string()));
            }
        }
    }

    if let Some(survey) = segment.take() {
        datfile.add_survey(survey)?;
    }

    if let Some(mut location) = fixed_point {
        location.zone = utm_zone;
        location.datum = datum;
        datfile.base_location = Some(location);
    }

    Ok(datfile)
}

/// `Nname  D  M D Y  Ccomment`
fn parse_segment_header(value: &str, path: &Path, line: usize) -> Result<SurveyHeader> {
    let mut tokens = value.split_whitespace();
    let designation = tokens.next().ok_or_else(|| {
        Error::malformed_header(path, line, "segment with no survey name")
    })?;
    let _duration_flag = tokens.next();

    let mut date_part = |what: &str| -> Result<u32> {
        let token = tokens.next().unwrap_or_default();
        token.parse::<u32>().map_err(|_| {
            Error::malformed_header(path, line, format!("bad segment {what} '{token}'"))
        })
    };
    let month = date_part("month")?;
    let day = date_part("day")?;
    let year = date_part("year")? as i32;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::malformed_header(path, line, format!("invalid segment date {month} {day} {year}"))
    })?;

    let mut header = SurveyHeader::new(designation, date);
    let rest = value
        .split_whitespace()
        .skip(5)
        .collect::<Vec<_>>()
        .join(" ");
    // The comment field carries its own 'C' tag character
    header.comment = rest.strip_prefix('C').unwrap_or(&rest).trim().to_string();
    Ok(header)
}

/// `M/D north east vert Sstation P l u d r I distance`
fn parse_pen_command(value: &str, path: &Path, line: usize) -> Result<PenCommand> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(Error::malformed_shot(
            path,
            line,
            format!("plot command needs coordinates and a station, found '{value}'"),
        ));
    }

    let coordinate = |at: usize| -> Result<f64> {
        tokens[at].parse::<f64>().map_err(|_| {
            Error::malformed_shot(path, line, format!("bad plot coordinate '{}'", tokens[at]))
        })
    };
    let north = coordinate(0)?;
    let east = coordinate(1)?;
    let vertical = coordinate(2)?;

    let station = tokens[3].strip_prefix('S').unwrap_or(tokens[3]).to_string();

    // LRUD follows the P tag in left/up/down/right order; -9 and below
    // mean the dimension was not measured
    let lrud = |at: usize| -> Option<f64> {
        tokens
            .get(at)
            .and_then(|token| token.parse::<f64>().ok())
            .filter(|v| *v >= 0.0)
    };
    let (left, up, down, right) = (lrud(5), lrud(6), lrud(7), lrud(8));

    Ok(PenCommand {
        north,
        east,
        vertical,
        station,
        left,
        right,
        up,
        down,
    })
}

/// Recover a shot's raw readings from the pen displacement, then let the
/// shared reconciler produce the corrected azimuth when the shot joins its
/// survey.
fn shot_from_geometry(origin: &Pen, command: &PenCommand) -> Shot {
    let dn = command.north - origin.north;
    let de = command.east - origin.east;
    let dv = command.vertical - origin.vertical;
    let horizontal = (dn * dn + de * de).sqrt();
    let length = (horizontal * horizontal + dv * dv).sqrt();

    let mut shot = Shot::new(origin.station.clone(), Some(command.station.clone()), length);
    if length > 0.0 {
        shot.bearing = Some(normalize_azimuth(de.atan2(dn).to_degrees()));
        shot.inclination = Some(dv.atan2(horizontal).to_degrees());
    }
    shot.left = command.left;
    shot.right = command.right;
    shot.up = command.up;
    shot.down = command.down;
    shot
}

/// `Pstation north east vert`
fn parse_fixed_point(value: &str, path: &Path, line: usize) -> Result<UtmLocation> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.len() != 4 {
        return Err(Error::malformed_header(
            path,
            line,
            format!("fixed point needs a station and three coordinates, found '{value}'"),
        ));
    }
    let coordinate = |at: usize| -> Result<f64> {
        tokens[at].parse::<f64>().map_err(|_| {
            Error::malformed_header(path, line, format!("bad fixed point coordinate '{}'", tokens[at]))
        })
    };
    // Fixed points are written north, east, vertical like pen commands;
    // UtmLocation wants easting first
    let north = coordinate(1)?;
    let east = coordinate(2)?;
    let vertical = coordinate(3)?;
    Ok(UtmLocation::new(east, north, vertical))
}
