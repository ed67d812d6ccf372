mod reader;
mod writer;

pub use reader::ResultReader;
pub use writer::{OutputRow, ResultWriter, COLUMNS};

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    /// `<dir>/<slug>.<ext>`
    pub fn path_for(&self, dir: &Path, slug: &str) -> PathBuf {
        dir.join(format!("{}.{}", slug, self.extension()))
    }
}
