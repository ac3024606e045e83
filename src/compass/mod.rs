//! Compass survey file support: `.DAT` data files, `.MAK` project files,
//! and compiled `.PLT` plot files.
//!
//! `.DAT` parsing is the primary path: tokenizer, header parser, and shot
//! parser feed the shared measurement reconciler and survey model. The
//! writer inverts the same layout. `.MAK` projects reference `.DAT` files
//! and are merged into a single project on read; `.PLT` plots are adapted
//! back into the same survey model from their compiled geometry.

pub mod header;
pub mod mak;
pub mod plt;
pub mod shot;
pub mod tokenizer;
pub mod writer;

#[cfg(test)]
mod tests;

use std::path::Path;

use tracing::{debug, info};

use crate::config::ParseConfig;
use crate::error::{Error, Result};
use crate::models::{DatFile, Survey};
use crate::{name_from_path, read_windows_1252};
use tokenizer::Record;

/// Read and parse a Compass `.DAT` file.
pub fn read_dat(path: &Path, config: &ParseConfig) -> Result<DatFile> {
    debug!("parsing Compass .DAT file {}", path.display());
    let content = read_windows_1252(path)?;
    let mut datfile = parse_dat(&content, path, config)?;
    datfile.name = name_from_path(path);
    info!(
        "parsed {} surveys ({} shots) from {}",
        datfile.len(),
        datfile.iter().map(Survey::len).sum::<usize>(),
        path.display()
    );
    Ok(datfile)
}

/// Parse `.DAT` text that has already been decoded; `path` is error context.
pub fn parse_dat(content: &str, path: &Path, config: &ParseConfig) -> Result<DatFile> {
    let mut datfile = DatFile::new(None);

    for block in tokenizer::survey_blocks(content) {
        let mut records = block.records();

        let header_block = match records.next() {
            Some(Record::Header(header_block)) => header_block,
            _ => {
                return Err(Error::malformed_header(
                    path,
                    block.first_line(),
                    "survey block has no shot-table column line",
                ));
            }
        };

        let header = header::parse_header(&header_block, path, config)?;
        let columns = header.columns.clone();
        let mut survey = Survey::new(header);

        for record in records {
            if let Record::Shot(line) = record {
                let shot = shot::parse_shot(line, &columns, path)?;
                survey.add_shot_checked(shot, config.backsight_tolerance);
            }
        }

        datfile.add_survey(survey)?;
    }

    Ok(datfile)
}
