//! Survey header parsing.
//!
//! Extracts survey-level metadata from the header block of one `.DAT` survey:
//! cave name, designation, date, comment, team roster, the
//! `DECLINATION:/FORMAT:/CORRECTIONS:` line, and the declared shot column
//! layout. Optional fields default per the format; a missing designation or
//! date, or an unparseable date, is a malformed header.

use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::compass::tokenizer::HeaderBlock;
use crate::config::ParseConfig;
use crate::error::{Error, Result};
use crate::models::{SurveyFormat, SurveyHeader};

const NAME_TAG: &str = "SURVEY NAME:";
const DATE_TAG: &str = "SURVEY DATE:";
const COMMENT_TAG: &str = "COMMENT:";
const TEAM_TAG: &str = "SURVEY TEAM:";

/// Parse one header block into a populated [`SurveyHeader`].
pub fn parse_header(
    block: &HeaderBlock<'_>,
    path: &Path,
    config: &ParseConfig,
) -> Result<SurveyHeader> {
    let (column_line, meta_lines) = block.lines.split_last().ok_or_else(|| {
        Error::malformed_header(path, block.first_line(), "empty survey block")
    })?;

    let columns: Vec<String> = column_line
        .text
        .split_whitespace()
        .map(String::from)
        .collect();

    let mut cave_name = String::new();
    let mut designation: Option<String> = None;
    let mut date: Option<NaiveDate> = None;
    let mut comment = String::new();
    let mut team: Vec<String> = Vec::new();
    let mut declination = config.default_declination;
    let mut format = SurveyFormat::standard(config.default_units);
    let mut corrections = (0.0, 0.0, 0.0);
    let mut corrections2 = (0.0, 0.0);

    let mut roster_next = false;
    for line in meta_lines {
        let text = line.text.trim();

        if roster_next {
            roster_next = false;
            if !text.is_empty() {
                team = text.split(',').map(|member| member.trim().to_string()).collect();
            }
            continue;
        }

        if let Some(rest) = text.strip_prefix(NAME_TAG) {
            designation = Some(rest.trim().to_string());
        } else if let Some(rest) = text.strip_prefix(DATE_TAG) {
            let (date_part, comment_part) = match rest.split_once(COMMENT_TAG) {
                Some((date_part, comment_part)) => (date_part, comment_part.trim()),
                None => (rest, ""),
            };
            date = Some(parse_date(date_part, path, line.number)?);
            comment = comment_part.to_string();
        } else if text.starts_with(TEAM_TAG) {
            roster_next = true;
        } else if text.contains("DECLINATION:") || text.contains("FORMAT:") {
            (declination, format, corrections, corrections2) =
                parse_declination_line(text, path, line.number, config)?;
        } else if text.is_empty() {
            continue;
        } else if designation.is_none() && cave_name.is_empty() {
            // The undelimited cave name line; may be absent entirely
            cave_name = text.to_string();
        }
    }

    let designation = designation.ok_or_else(|| {
        Error::malformed_header(path, block.first_line(), "missing SURVEY NAME")
    })?;
    let date = date.ok_or_else(|| {
        Error::malformed_header(path, block.first_line(), "missing SURVEY DATE")
    })?;

    debug!(
        "parsed header: designation={} date={} team={} declination={}",
        designation,
        date,
        team.len(),
        declination
    );

    Ok(SurveyHeader {
        designation,
        cave_name,
        date,
        comment,
        team,
        declination,
        format,
        corrections,
        corrections2,
        columns,
    })
}

/// Compass dates are `M D YYYY`, with 2-digit years in 1990s vintage data.
fn parse_date(text: &str, path: &Path, line: usize) -> Result<NaiveDate> {
    let text = text.trim();
    for fmt in ["%m %d %y", "%m %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(date);
        }
    }
    Err(Error::malformed_header(
        path,
        line,
        format!("unparseable SURVEY DATE '{text}'"),
    ))
}

/// Token-scan the combined declination/format/corrections line.
fn parse_declination_line(
    text: &str,
    path: &Path,
    line: usize,
    config: &ParseConfig,
) -> Result<(f64, SurveyFormat, (f64, f64, f64), (f64, f64))> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut declination = config.default_declination;
    let mut format = SurveyFormat::standard(config.default_units);
    let mut corrections = (0.0, 0.0, 0.0);
    let mut corrections2 = (0.0, 0.0);

    let number = |tokens: &[&str], at: usize| -> Result<f64> {
        let token = tokens.get(at).copied().unwrap_or_default();
        token.parse::<f64>().map_err(|_| {
            Error::malformed_header(path, line, format!("expected a number, found '{token}'"))
        })
    };

    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "DECLINATION:" => declination = number(&tokens, i + 1)?,
            "FORMAT:" => {
                let raw = tokens.get(i + 1).copied().ok_or_else(|| {
                    Error::malformed_header(path, line, "FORMAT: with no value")
                })?;
                format = SurveyFormat::parse(raw, config.default_units);
            }
            "CORRECTIONS:" => {
                corrections = (
                    number(&tokens, i + 1)?,
                    number(&tokens, i + 2)?,
                    number(&tokens, i + 3)?,
                );
            }
            "CORRECTIONS2:" => {
                corrections2 = (number(&tokens, i + 1)?, number(&tokens, i + 2)?);
            }
            _ => {}
        }
    }

    Ok((declination, format, corrections, corrections2))
}
