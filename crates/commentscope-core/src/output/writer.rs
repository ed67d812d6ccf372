use super::OutputFormat;
use crate::Result;
use crate::types::CommenterAggregate;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const COLUMNS: [&str; 4] = ["profile_url", "display_name", "earliest_comment_at", "headline"];

/// One output row; timestamps are RFC 3339 UTC, empty when unknown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub profile_url: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub earliest_comment_at: String,
    #[serde(default)]
    pub headline: String,
}

impl OutputRow {
    /// Parsed `earliest_comment_at`; `None` when empty or unreadable
    pub fn parsed_earliest(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.earliest_comment_at.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

impl From<&CommenterAggregate> for OutputRow {
    fn from(agg: &CommenterAggregate) -> Self {
        Self {
            profile_url: agg.profile_url.clone(),
            display_name: agg.display_name.clone(),
            earliest_comment_at: agg
                .earliest_comment_at
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default(),
            headline: agg.headline.clone(),
        }
    }
}

pub struct ResultWriter;

impl ResultWriter {
    /// Write aggregates to `path`, creating parent directories as needed.
    ///
    /// An empty result set still produces a file (a header-only CSV or an
    /// empty JSON array).
    pub fn to_file(aggregates: &[CommenterAggregate], path: &Path, format: OutputFormat) -> Result<()> {
        tracing::debug!("Writing {} rows to: {}", aggregates.len(), path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        Self::to_writer(aggregates, BufWriter::new(file), format)?;

        if aggregates.is_empty() {
            tracing::warn!("No commenters to save; wrote empty {}", path.display());
        } else {
            tracing::info!("Saved {} commenters to {}", aggregates.len(), path.display());
        }
        Ok(())
    }

    pub fn to_writer<W: Write>(
        aggregates: &[CommenterAggregate],
        writer: W,
        format: OutputFormat,
    ) -> Result<()> {
        let rows: Vec<OutputRow> = aggregates.iter().map(OutputRow::from).collect();

        match format {
            OutputFormat::Csv => {
                let mut csv_writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(writer);
                csv_writer.write_record(COLUMNS)?;
                for row in &rows {
                    csv_writer.serialize(row)?;
                }
                csv_writer.flush()?;
            }
            OutputFormat::Json => {
                let mut writer = writer;
                serde_json::to_writer_pretty(&mut writer, &rows)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}
