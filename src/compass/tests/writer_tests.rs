//! Tests for .DAT serialization and round-tripping

use chrono::NaiveDate;

use super::{parse_sample, sample_dat};
use crate::compass::writer::{serialize_survey, to_bytes};
use crate::compass::parse_dat;
use crate::config::ParseConfig;
use crate::error::Error;
use crate::models::{Shot, Survey, SurveyHeader};

#[test]
fn test_round_trip_preserves_model() {
    let original = parse_sample(&sample_dat());

    let bytes = to_bytes(&original).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let reparsed = parse_dat(&text, "sample.dat".as_ref(), &ParseConfig::default()).unwrap();

    assert_eq!(original, reparsed);
}

#[test]
fn test_output_uses_compass_conventions() {
    let datfile = parse_sample(&sample_dat());
    let bytes = to_bytes(&datfile).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.contains("\r\n"));
    assert_eq!(text.matches('\x0c').count(), 2);
    assert!(text.ends_with('\x1a'));
    assert!(text.contains("SURVEY NAME: A"));
    assert!(text.contains("SURVEY DATE: 7 10 1979  COMMENT: Entrance Passage"));
}

#[test]
fn test_sentinels_written_back() {
    let datfile = parse_sample(&sample_dat());
    let lines = serialize_survey(datfile.get("A").unwrap()).unwrap();
    let missing_line = lines.iter().find(|l| l.contains("A3")).unwrap();
    assert!(missing_line.contains("-999.00"));
    let passage_line = lines.iter().find(|l| l.contains("Big Room")).unwrap();
    assert!(passage_line.contains("-9.90"));
}

#[test]
fn test_flags_written_in_canonical_order() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut survey = Survey::new(SurveyHeader::new("A", date));
    let mut shot = Shot::new("A1", Some("A2".to_string()), 10.0);
    shot.bearing = Some(0.0);
    shot.inclination = Some(0.0);
    shot.flags.no_adjustment = true;
    shot.flags.exclude_plot = true;
    shot.flags.exclude_length = true;
    survey.add_shot(shot);

    let lines = serialize_survey(&survey).unwrap();
    assert!(lines.last().unwrap().contains("#|LPC#"));
}

#[test]
fn test_oversized_station_name_rejected() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut survey = Survey::new(SurveyHeader::new("A", date));
    survey.add_shot(Shot::new("THIRTEENCHARS", Some("A2".to_string()), 1.0));

    let err = serialize_survey(&survey).unwrap_err();
    assert!(matches!(err, Error::Unrepresentable { .. }));
}

#[test]
fn test_oversized_numeric_rejected() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut survey = Survey::new(SurveyHeader::new("A", date));
    survey.add_shot(Shot::new("A1", Some("A2".to_string()), 123456789.0));

    assert!(serialize_survey(&survey).is_err());
}

#[test]
fn test_multiline_comment_rejected() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut survey = Survey::new(SurveyHeader::new("A", date));
    let mut shot = Shot::new("A1", Some("A2".to_string()), 1.0);
    shot.comment = Some("line one\nline two".to_string());
    survey.add_shot(shot);

    let err = serialize_survey(&survey).unwrap_err();
    assert!(err.to_string().contains("span lines"));
}

#[test]
fn test_splay_without_station_rejected() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut survey = Survey::new(SurveyHeader::new("A", date));
    survey.add_shot(Shot::new("A1", None, 2.5));

    assert!(serialize_survey(&survey).is_err());
}

#[test]
fn test_non_windows_1252_text_rejected() {
    let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut header = SurveyHeader::new("A", date);
    header.cave_name = "洞穴".to_string();
    let survey = Survey::new(header);
    let mut datfile = crate::models::DatFile::new(None);
    datfile.add_survey(survey).unwrap();

    let err = to_bytes(&datfile).unwrap_err();
    assert!(matches!(err, Error::Unrepresentable { .. }));
}
