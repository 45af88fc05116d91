//! C3 CLI library
//!
//! Offline tooling over the snapshot a running server accumulates: render
//! reports, fold snapshots from several machines together, inspect totals and
//! reset the working directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, Commands, FormatArg, MergeArgs, ProjectArgs, ReportArgs, SummaryArgs,
};
pub use error::{CliError, CliResult};
pub use output::Reporter;
