//! Cave Survey Data Library
//!
//! A Rust library for parsing and writing cave survey data in the formats
//! used by the Compass cave survey software and the PocketTopo pocket PC
//! surveying tool.
//!
//! This library provides tools for:
//! - Parsing Compass `.DAT` survey data files into a typed shot model
//! - Reading `.MAK` project files and merging their linked surveys
//! - Adapting compiled `.PLT` plot files back into survey form
//! - Importing PocketTopo exported `.TXT` files, optionally merging
//!   duplicate triple-shot and backsight readings
//! - Reconciling front and back sights with declination correction
//! - Writing the survey model back out as Compass `.DAT` files
//!
//! All formats converge on the same model: a [`DatFile`] of [`Survey`]s of
//! [`Shot`]s, so downstream code is format-agnostic.
//!
//! ```no_run
//! use compass_survey::{read, ParseConfig};
//!
//! let project = read("FULFORDS.dat".as_ref(), &ParseConfig::default())?;
//! for survey in project.iter() {
//!     println!("{}: {:.1} surveyed", survey.designation(), survey.length());
//! }
//! # Ok::<(), compass_survey::Error>(())
//! ```

pub mod compass;
pub mod config;
pub mod error;
pub mod models;
pub mod pockettopo;
pub mod reconcile;

use std::path::Path;

use tracing::debug;

// Re-export commonly used types
pub use config::{LengthUnits, ParseConfig};
pub use error::{Error, Result};
pub use models::{DatFile, Shot, ShotFlags, Survey, SurveyFormat, SurveyHeader, UtmLocation};

pub use compass::mak::read_mak;
pub use compass::plt::read_plt;
pub use compass::read_dat;
pub use compass::writer::{write_datfile, write_survey};
pub use pockettopo::read_txt;

/// Read any supported survey file, dispatching on its extension:
/// `.dat`, `.mak`, `.plt`, or `.txt` (case-insensitive).
pub fn read(path: &Path, config: &ParseConfig) -> Result<DatFile> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "dat" => compass::read_dat(path, config),
        "mak" => compass::mak::read_mak(path, config),
        "plt" => compass::plt::read_plt(path, config),
        "txt" => pockettopo::read_txt(path, config),
        _ => Err(Error::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unsupported survey file extension '{extension}'"),
            ),
        )),
    }
}

/// Read several survey files into one merged project, failing on any survey
/// designation collision between them.
pub fn read_paths<P: AsRef<Path>>(paths: &[P], config: &ParseConfig) -> Result<DatFile> {
    let mut project = DatFile::new(None);
    for path in paths {
        let datfile = read(path.as_ref(), config)?;
        if project.name.is_none() {
            project.name = datfile.name.clone();
        }
        if project.base_location.is_none() {
            project.base_location = datfile.base_location.clone();
        }
        project.merge(datfile)?;
    }
    Ok(project)
}

/// Write a project to a Compass `.DAT` file.
pub fn write(datfile: &DatFile, path: &Path) -> Result<()> {
    compass::writer::write_datfile(datfile, path)
}

/// Decode a survey file, which Compass and PocketTopo both write as
/// windows-1252 rather than UTF-8.
pub(crate) fn read_windows_1252(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
    debug!("decoded {} bytes from {}", bytes.len(), path.display());
    Ok(text.into_owned())
}

/// Display name for a project, from its filename stem with underscores
/// opened up.
pub(crate) fn name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.replace('_', " "))
}
