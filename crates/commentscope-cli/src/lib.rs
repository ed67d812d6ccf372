use clap::ValueEnum;
use commentscope_core::UnresolvedPolicy;
use commentscope_core::output::OutputFormat;

pub mod commands;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// What to do with comments whose timestamp cannot be decoded
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum UnresolvedArg {
    /// Keep them, with an empty timestamp
    Include,
    /// Drop them
    Exclude,
}

impl From<UnresolvedArg> for UnresolvedPolicy {
    fn from(arg: UnresolvedArg) -> Self {
        match arg {
            UnresolvedArg::Include => UnresolvedPolicy::Include,
            UnresolvedArg::Exclude => UnresolvedPolicy::Exclude,
        }
    }
}
