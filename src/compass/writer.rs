//! `.DAT` serialization.
//!
//! The exact inverse of the header and shot parsers: a survey parsed from a
//! well-formed `.DAT` block writes back to an equivalent block, and any
//! programmatically built model writes to text the parsers accept. Output
//! uses the Compass conventions: `\r\n` line endings, tab-separated shot
//! fields at fixed precision, a form feed after each survey, a `\x1A` soft
//! EOF, and windows-1252 encoding.

use std::path::Path;

use tracing::info;

use crate::compass::shot::{NO_READING, PASSAGE};
use crate::error::{Error, Result};
use crate::models::{DatFile, Shot, Survey};

/// Compass limits station and survey names to 12 characters.
const MAX_NAME_LEN: usize = 12;
/// Widest numeric field the fixed-precision columns accommodate.
const MAX_NUMERIC_LEN: usize = 8;

/// Serialize a whole project to `.DAT` bytes.
pub fn to_bytes(datfile: &DatFile) -> Result<Vec<u8>> {
    let mut text = String::new();
    for survey in datfile.iter() {
        text.push_str(&serialize_survey(survey)?.join("\r\n"));
        text.push_str("\r\n\x0c\r\n");
    }
    text.push('\x1a');
    encode(&text)
}

/// Write a whole project to a `.DAT` file.
pub fn write_datfile(datfile: &DatFile, path: &Path) -> Result<()> {
    let bytes = to_bytes(datfile)?;
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))?;
    info!(
        "wrote {} surveys ({:.1} length) to {}",
        datfile.len(),
        datfile.length(),
        path.display()
    );
    Ok(())
}

/// Write a single survey to a `.DAT` file.
pub fn write_survey(survey: &Survey, path: &Path) -> Result<()> {
    let mut text = serialize_survey(survey)?.join("\r\n");
    text.push_str("\r\n\x0c\r\n\x1a");
    let bytes = encode(&text)?;
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
}

/// Render one survey as `.DAT` lines, without terminators.
pub fn serialize_survey(survey: &Survey) -> Result<Vec<String>> {
    let header = survey.header();

    if header.designation.len() > MAX_NAME_LEN {
        return Err(Error::unrepresentable(
            "designation",
            &header.designation,
            format!("longer than {MAX_NAME_LEN} characters"),
        ));
    }

    let mut lines = vec![
        header.cave_name.clone(),
        format!("SURVEY NAME: {}", header.designation),
        format!(
            "SURVEY DATE: {}  COMMENT:{}",
            header.date.format("%-m %d %Y"),
            if header.comment.is_empty() {
                String::new()
            } else {
                format!(" {}", header.comment)
            }
        ),
        "SURVEY TEAM:".to_string(),
        header.team.join(","),
        format!(
            "DECLINATION: {:7.2}  FORMAT: {}  CORRECTIONS:  {:.2} {:.2} {:.2}  CORRECTIONS2:  {:.2} {:.2}",
            header.declination,
            header.format.raw,
            header.corrections.0,
            header.corrections.1,
            header.corrections.2,
            header.corrections2.0,
            header.corrections2.1,
        ),
        String::new(),
        header.columns.join("\t"),
        String::new(),
    ];

    for shot in survey.shots() {
        lines.push(serialize_shot(shot, &header.columns)?);
    }

    Ok(lines)
}

/// Render one shot line in the survey's declared column order.
fn serialize_shot(shot: &Shot, columns: &[String]) -> Result<String> {
    let mut fields: Vec<String> = Vec::with_capacity(columns.len());

    for name in columns.iter().filter(|n| *n != "FLAGS" && *n != "COMMENTS") {
        let field = match name.as_str() {
            "FROM" => station(&shot.from_station, "FROM")?,
            "TO" => {
                let to = shot.to_station.as_deref().ok_or_else(|| {
                    Error::unrepresentable(
                        "TO",
                        &shot.from_station,
                        "Compass shots require a named TO station; splays must be given one",
                    )
                })?;
                station(to, "TO")?
            }
            "LENGTH" => numeric(Some(shot.length), "LENGTH")?,
            "BEARING" => numeric(shot.bearing, "BEARING")?,
            "AZM2" => numeric(shot.back_bearing, "AZM2")?,
            "INC" => numeric(shot.inclination, "INC")?,
            "INC2" => numeric(shot.back_inclination, "INC2")?,
            "LEFT" => lrud(shot.left, "LEFT")?,
            "RIGHT" => lrud(shot.right, "RIGHT")?,
            "UP" => lrud(shot.up, "UP")?,
            "DOWN" => lrud(shot.down, "DOWN")?,
            other => shot
                .extensions
                .get(other)
                .cloned()
                .unwrap_or_default(),
        };
        fields.push(field);
    }

    let markers = shot.flags.markers();
    let comment = shot.comment.as_deref().unwrap_or("");
    if comment.contains(['\r', '\n']) {
        return Err(Error::unrepresentable(
            "COMMENTS",
            comment,
            "comments cannot span lines",
        ));
    }
    if !markers.is_empty() {
        fields.push(format!("#|{markers}#  {comment}").trim_end().to_string());
    } else if !comment.is_empty() {
        fields.push(comment.to_string());
    }

    Ok(fields.join("\t"))
}

/// Right-justified station name within the Compass length limit.
fn station(name: &str, field: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::unrepresentable(field, name, "empty station name"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::unrepresentable(
            field,
            name,
            format!("longer than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(format!("{name:>6}"))
}

/// Fixed-precision numeric column; absent readings write the `-999.00`
/// sentinel.
fn numeric(value: Option<f64>, field: &str) -> Result<String> {
    let Some(value) = value else {
        return Ok(format!("{:>7}", NO_READING));
    };
    let formatted = format!("{value:7.2}");
    if formatted.len() > MAX_NUMERIC_LEN || !value.is_finite() {
        return Err(Error::unrepresentable(
            field,
            format!("{value}"),
            format!("does not fit a {MAX_NUMERIC_LEN}-character fixed-precision column"),
        ));
    }
    Ok(formatted)
}

/// LRUD column; infinite readings write the open-passage sentinel.
fn lrud(value: Option<f64>, field: &str) -> Result<String> {
    match value {
        Some(v) if v == f64::INFINITY => Ok(format!("{:>7}", PASSAGE[0])),
        other => numeric(other, field),
    }
}

/// Encode for Compass, which reads and writes windows-1252.
fn encode(text: &str) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    if had_errors {
        return Err(Error::unrepresentable(
            "text",
            text.chars().filter(|c| !c.is_ascii()).take(8).collect::<String>(),
            "not representable in windows-1252",
        ));
    }
    Ok(bytes.into_owned())
}
