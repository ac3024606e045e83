//! `.MAK` project file support.
//!
//! A `.MAK` file lists the `.DAT` files making up a project, together with
//! project-wide settings: a `@` UTM base location, a `&` datum, a `%` UTM
//! convergence angle, and a `!` parameter set. Linked file entries start
//! with `#`, end with `;`, and may continue across lines. Reading a project
//! parses every linked `.DAT` file (resolved relative to the `.MAK` file)
//! and merges the surveys into one [`DatFile`], failing on any designation
//! collision.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ParseConfig;
use crate::error::{Error, Result};
use crate::models::{DatFile, UtmLocation};
use crate::{name_from_path, read_windows_1252};

/// Read a `.MAK` project, parsing and merging all linked `.DAT` files.
pub fn read_mak(path: &Path, config: &ParseConfig) -> Result<DatFile> {
    debug!("parsing Compass .MAK file {}", path.display());
    let content = read_windows_1252(path)?;
    let manifest = parse_mak(&content, path)?;

    let mut project = DatFile::new(name_from_path(path));
    project.base_location = manifest.base_location;
    project.file_params = manifest.file_params;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    for linked in &manifest.linked_files {
        let linked_path = resolve_linked_path(base_dir, linked);
        let datfile = super::read_dat(&linked_path, config)?;
        project.merge(datfile)?;
    }

    info!(
        "parsed project {} with {} linked files, {} surveys",
        path.display(),
        manifest.linked_files.len(),
        project.len()
    );
    Ok(project)
}

/// The raw contents of a `.MAK` file, before linked files are read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MakManifest {
    pub base_location: Option<UtmLocation>,
    pub file_params: Option<String>,
    /// Linked `.DAT` paths as written, in project order
    pub linked_files: Vec<String>,
}

/// Parse `.MAK` text into its manifest; `path` is error context.
pub fn parse_mak(content: &str, path: &Path) -> Result<MakManifest> {
    let mut manifest = MakManifest::default();
    // Linked-file entries continue across lines until the ';' terminator
    let mut pending: Option<String> = None;

    for (index, raw_line) in content.lines().enumerate() {
        let number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line == "\x1a" {
            continue;
        }

        if let Some(prefix) = pending.take() {
            if let Some(complete) = line.strip_suffix(';') {
                manifest
                    .linked_files
                    .push(linked_file_name(&(prefix + complete)));
            } else {
                pending = Some(prefix + line);
            }
            continue;
        }

        let tag = line.chars().next().unwrap_or_default();
        let value = &line[tag.len_utf8()..];
        match tag {
            '/' => {} // comment
            '@' => {
                manifest.base_location =
                    Some(parse_base_location(value.trim_end_matches(';'), path, number)?);
            }
            '&' => {
                if let Some(location) = manifest.base_location.as_mut() {
                    location.datum = Some(value.trim_end_matches(';').to_string());
                }
            }
            '%' => {
                let value = value.trim_end_matches(';');
                let convergence = value.parse::<f64>().map_err(|_| {
                    Error::malformed_header(path, number, format!("bad convergence '{value}'"))
                })?;
                if let Some(location) = manifest.base_location.as_mut() {
                    location.convergence = Some(convergence);
                }
            }
            '!' => {
                manifest.file_params = Some(value.trim_end_matches(';').to_uppercase());
            }
            '#' => {
                if let Some(complete) = value.strip_suffix(';') {
                    manifest.linked_files.push(linked_file_name(complete));
                } else {
                    pending = Some(value.to_string());
                }
            }
            other => {
                return Err(Error::unrecognized_token(path, number, other.to_string()));
            }
        }
    }

    Ok(manifest)
}

/// A linked-file entry may carry link/fixed station parameters after the
/// filename; only the filename is used.
fn linked_file_name(value: &str) -> String {
    value
        .trim_end_matches(';')
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// `@easting,northing,elevation[,zone[,convergence]];`
fn parse_base_location(value: &str, path: &Path, line: usize) -> Result<UtmLocation> {
    let mut numbers = Vec::new();
    for part in value.split(',') {
        let number = part.trim().parse::<f64>().map_err(|_| {
            Error::malformed_header(path, line, format!("bad base location '{value}'"))
        })?;
        numbers.push(number);
    }
    if numbers.len() < 3 {
        return Err(Error::malformed_header(
            path,
            line,
            format!("base location '{value}' needs easting, northing, elevation"),
        ));
    }
    let mut location = UtmLocation::new(numbers[0], numbers[1], numbers[2]);
    location.zone = numbers.get(3).map(|z| *z as i32);
    location.convergence = numbers.get(4).copied();
    Ok(location)
}

/// `.MAK` paths are written with Windows separators relative to the project.
fn resolve_linked_path(base_dir: &Path, linked: &str) -> PathBuf {
    let normalized = linked.replace('\\', "/");
    base_dir.join(normalized)
}
