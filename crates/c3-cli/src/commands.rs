//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// C3: render, merge and inspect accumulated end-to-end coverage
#[derive(Parser, Debug)]
#[command(name = "c3")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv); `RUST_LOG` takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a persisted snapshot in one of the report formats
    Report(ReportArgs),

    /// Fold several persisted snapshots into one
    Merge(MergeArgs),

    /// Print file, line and run counts of a snapshot
    Summary(SummaryArgs),

    /// Empty the working directory
    Clear(ProjectArgs),
}

/// Locates the project and its `c3tmp` working directory
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Directory containing codeception.yml
    #[arg(short = 'C', long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Alternate config file name (or absolute path)
    #[arg(long)]
    pub config: Option<String>,
}

/// Report formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    /// HTML pages in a tar archive
    Html,
    /// Clover XML
    Clover,
    /// Crap4J XML
    Crap4j,
    /// The snapshot itself
    Serialized,
    /// PHPUnit XML in a tar archive
    Phpunit,
    /// Cobertura XML
    Cobertura,
}

impl From<FormatArg> for c3::ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => Self::Html,
            FormatArg::Clover => Self::Clover,
            FormatArg::Crap4j => Self::Crap4j,
            FormatArg::Serialized => Self::Serialized,
            FormatArg::Phpunit => Self::Phpunit,
            FormatArg::Cobertura => Self::Cobertura,
        }
    }
}

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Output format
    #[arg(value_enum)]
    pub format: FormatArg,

    /// Project location
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Snapshot to render instead of the project's
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Directory to write the artifact into (default: the working directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep html/phpunit archives uncompressed
    #[arg(long)]
    pub no_gzip: bool,
}

/// Arguments for the merge command
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Snapshots to merge
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Target snapshot, created if missing and merged into otherwise
    #[arg(short = 'o', long)]
    pub into: PathBuf,
}

/// Arguments for the summary command
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Project location
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Snapshot to inspect instead of the project's
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_report() {
        let cli = Cli::try_parse_from(["c3", "report", "clover", "-C", "app", "--no-gzip"]).unwrap();
        let Commands::Report(args) = cli.command else {
            unreachable!("parsed report");
        };
        assert_eq!(args.format, FormatArg::Clover);
        assert_eq!(args.project.config_dir, PathBuf::from("app"));
        assert!(args.no_gzip);
    }

    #[test]
    fn test_parse_merge_requires_inputs() {
        assert!(Cli::try_parse_from(["c3", "merge", "--into", "out.serialized"]).is_err());
        let cli = Cli::try_parse_from(["c3", "merge", "a", "b", "--into", "c"]).unwrap();
        let Commands::Merge(args) = cli.command else {
            unreachable!("parsed merge");
        };
        assert_eq!(args.inputs.len(), 2);
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(c3::ReportFormat::from(FormatArg::Crap4j), c3::ReportFormat::Crap4j);
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["c3", "-vv", "clear"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
