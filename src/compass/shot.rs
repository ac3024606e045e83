//! Shot record parsing.
//!
//! Converts one tokenized shot line into a raw [`Shot`] according to the
//! column layout declared in the survey header. Numeric fields use the
//! Compass sentinels: `-999.00` means no reading, and `-9.90` (or
//! `-9999.00` in some vintages) in an LRUD column means the passage extends
//! beyond measurement. Trailing flags ride in a `#|…#` bracket, followed by
//! an optional free-text comment.

use std::path::Path;

use crate::compass::tokenizer::Line;
use crate::error::{Error, Result};
use crate::models::{Shot, ShotFlags};

/// Marker for a reading that was not taken.
pub const NO_READING: &str = "-999.00";
/// Markers for a passage dimension beyond measurement.
pub const PASSAGE: [&str; 2] = ["-9.90", "-9999.00"];
/// Opening bracket of the flags field.
const FLAGS_OPEN: &str = "#|";

/// Parse one shot line against the survey's declared column layout.
pub fn parse_shot(line: Line<'_>, columns: &[String], path: &Path) -> Result<Shot> {
    // FLAGS and COMMENTS are trailing spare columns; either value may be
    // missing, so they are carved off the tail rather than field-split.
    let value_count = columns
        .iter()
        .filter(|name| *name != "FLAGS" && *name != "COMMENTS")
        .count();

    let (fields, tail) = split_fields(line.text, value_count);
    if fields.len() < value_count {
        return Err(Error::malformed_shot(
            path,
            line.number,
            format!(
                "expected {} fields for columns {:?}, found {}",
                value_count,
                columns,
                fields.len()
            ),
        ));
    }

    let mut shot = Shot::new(String::new(), None, 0.0);

    let mut fields = fields.into_iter();
    for name in columns.iter().filter(|n| *n != "FLAGS" && *n != "COMMENTS") {
        let value = fields.next().unwrap_or_default();
        match name.as_str() {
            "FROM" => shot.from_station = value.to_string(),
            "TO" => shot.to_station = Some(value.to_string()),
            "LENGTH" => {
                let length = number(value, name, path, line.number)?;
                if length < 0.0 {
                    return Err(Error::malformed_shot(
                        path,
                        line.number,
                        format!("negative LENGTH {length}"),
                    ));
                }
                shot.length = length;
            }
            "BEARING" => shot.bearing = angle(value, name, path, line.number)?,
            "AZM2" => shot.back_bearing = angle(value, name, path, line.number)?,
            "INC" => shot.inclination = angle(value, name, path, line.number)?,
            "INC2" => shot.back_inclination = angle(value, name, path, line.number)?,
            "LEFT" => shot.left = lrud(value, name, path, line.number)?,
            "RIGHT" => shot.right = lrud(value, name, path, line.number)?,
            "UP" => shot.up = lrud(value, name, path, line.number)?,
            "DOWN" => shot.down = lrud(value, name, path, line.number)?,
            // Vendor columns outside the core schema are preserved verbatim
            _ => {
                shot.extensions.insert(name.clone(), value.to_string());
            }
        }
    }

    if shot.from_station.is_empty() {
        return Err(Error::malformed_shot(path, line.number, "empty FROM station"));
    }

    if let Some(tail) = tail {
        let (flags, comment) = parse_tail(tail, path, line.number)?;
        shot.flags = flags;
        if !comment.is_empty() {
            shot.comment = Some(comment.to_string());
        }
    }

    Ok(shot)
}

/// Split off `count` whitespace-delimited fields, returning the untouched
/// remainder of the line (the FLAGS/COMMENTS tail) if any.
fn split_fields(text: &str, count: usize) -> (Vec<&str>, Option<&str>) {
    let mut fields = Vec::with_capacity(count);
    let mut rest = text.trim_start();
    for _ in 0..count {
        if rest.is_empty() {
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    let tail = rest.trim_end();
    (fields, if tail.is_empty() { None } else { Some(tail) })
}

/// Split the tail into exclusion flags and a comment.
fn parse_tail<'a>(tail: &'a str, path: &Path, line: usize) -> Result<(ShotFlags, &'a str)> {
    let Some(rest) = tail.strip_prefix(FLAGS_OPEN) else {
        return Ok((ShotFlags::default(), tail));
    };
    // A 2013 Compass bug wrote binary garbage into the flags column; an
    // unterminated or unrecognizable bracket is rejected, not guessed at.
    let Some((markers, comment)) = rest.split_once('#') else {
        return Err(Error::malformed_shot(
            path,
            line,
            format!("unterminated flags bracket '{tail}'"),
        ));
    };
    let flags = ShotFlags::from_markers(markers).map_err(|bad| {
        Error::malformed_shot(path, line, format!("invalid flag marker {bad:?}"))
    })?;
    Ok((flags, comment.trim()))
}

fn number(value: &str, name: &str, path: &Path, line: usize) -> Result<f64> {
    value.parse::<f64>().map_err(|_| {
        Error::malformed_shot(path, line, format!("non-numeric {name} value '{value}'"))
    })
}

/// An angle column, where `-999.00` means the reading was not taken.
fn angle(value: &str, name: &str, path: &Path, line: usize) -> Result<Option<f64>> {
    if value == NO_READING {
        return Ok(None);
    }
    number(value, name, path, line).map(Some)
}

/// An LRUD column: `-999.00` missing, `-9.90`/`-9999.00` open passage.
fn lrud(value: &str, name: &str, path: &Path, line: usize) -> Result<Option<f64>> {
    if value == NO_READING {
        return Ok(None);
    }
    if PASSAGE.contains(&value) {
        return Ok(Some(f64::INFINITY));
    }
    number(value, name, path, line).map(Some)
}
