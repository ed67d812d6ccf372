use super::{OutputFormat, OutputRow};
use crate::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Reads back a result file written by an earlier run
pub struct ResultReader;

impl ResultReader {
    /// Rows in `path`, or an empty list when the file does not exist yet
    pub fn from_file(path: &Path, format: OutputFormat) -> Result<Vec<OutputRow>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let rows = Self::from_reader(BufReader::new(file), format)?;
        tracing::debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn from_reader<R: Read>(reader: R, format: OutputFormat) -> Result<Vec<OutputRow>> {
        let rows = match format {
            OutputFormat::Csv => csv::Reader::from_reader(reader)
                .deserialize()
                .collect::<std::result::Result<Vec<OutputRow>, _>>()?,
            OutputFormat::Json => serde_json::from_reader(reader)?,
        };
        Ok(rows
            .into_iter()
            .filter(|row| !row.profile_url.trim().is_empty())
            .collect())
    }
}
