//! Tests for .MAK project file parsing

use std::fs;

use tempfile::tempdir;

use super::sample_dat;
use crate::compass::mak::{parse_mak, read_mak};
use crate::config::ParseConfig;
use crate::error::Error;

const PROJECT: &str = "/ Example project file\r\n\
@400080.540,4300000.000,3048.000,13,0.780;\r\n\
&North American 1983;\r\n\
!OT;\r\n\
#FULFORDS.DAT,\r\n\
 A1[F,LF,13.0,57.0,0.0];\r\n\
#BACKSIDE.DAT;\r\n";

#[test]
fn test_manifest_fields() {
    let manifest = parse_mak(PROJECT, "project.mak".as_ref()).unwrap();

    let location = manifest.base_location.unwrap();
    assert_eq!(location.easting, 400080.54);
    assert_eq!(location.northing, 4300000.0);
    assert_eq!(location.elevation, 3048.0);
    assert_eq!(location.zone, Some(13));
    assert_eq!(location.convergence, Some(0.78));
    assert_eq!(location.datum.as_deref(), Some("North American 1983"));

    assert_eq!(manifest.file_params.as_deref(), Some("OT"));
}

#[test]
fn test_linked_files_strip_station_params() {
    let manifest = parse_mak(PROJECT, "project.mak".as_ref()).unwrap();
    assert_eq!(manifest.linked_files, vec!["FULFORDS.DAT", "BACKSIDE.DAT"]);
}

#[test]
fn test_convergence_tag() {
    let content = "@1.0,2.0,3.0;\r\n%0.55;\r\n";
    let manifest = parse_mak(content, "project.mak".as_ref()).unwrap();
    assert_eq!(manifest.base_location.unwrap().convergence, Some(0.55));
}

#[test]
fn test_unrecognized_tag_rejected() {
    let err = parse_mak("?what is this;\r\n", "project.mak".as_ref()).unwrap_err();
    assert!(matches!(err, Error::UnrecognizedToken { .. }));
}

#[test]
fn test_bad_base_location_rejected() {
    assert!(parse_mak("@1.0,oops,3.0;\r\n", "project.mak".as_ref()).is_err());
}

#[test]
fn test_read_project_merges_linked_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("CAVE.DAT"), sample_dat()).unwrap();

    let mak_path = dir.path().join("PROJECT.MAK");
    fs::write(&mak_path, "@1.0,2.0,3.0;\r\n#CAVE.DAT;\r\n").unwrap();

    let project = read_mak(&mak_path, &ParseConfig::default()).unwrap();
    assert_eq!(project.name.as_deref(), Some("PROJECT"));
    assert_eq!(project.len(), 2);
    assert!(project.contains("A"));
    assert!(project.contains("B"));
    assert!(project.base_location.is_some());
}

#[test]
fn test_missing_linked_file_is_io_error() {
    let dir = tempdir().unwrap();
    let mak_path = dir.path().join("PROJECT.MAK");
    fs::write(&mak_path, "#NOPE.DAT;\r\n").unwrap();

    let err = read_mak(&mak_path, &ParseConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_duplicate_designation_across_files_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("ONE.DAT"), sample_dat()).unwrap();
    fs::write(dir.path().join("TWO.DAT"), sample_dat()).unwrap();

    let mak_path = dir.path().join("PROJECT.MAK");
    fs::write(&mak_path, "#ONE.DAT;\r\n#TWO.DAT;\r\n").unwrap();

    let err = read_mak(&mak_path, &ParseConfig::default()).unwrap_err();
    assert!(matches!(err, Error::DuplicateDesignation { .. }));
}
