//! C3 CLI: offline coverage snapshot tooling
//!
//! ## Usage
//!
//! ```bash
//! c3 summary                          # Totals of tests/_output/c3tmp
//! c3 report clover -C app             # Render a Clover report
//! c3 merge a.serialized b.serialized --into all.serialized
//! c3 clear                            # Empty the working directory
//! ```

use c3_cli::{handlers, Cli, CliResult, Commands, Reporter};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let reporter = Reporter::new(console::colors_enabled(), cli.quiet);

    match cli.command {
        Commands::Report(args) => {
            let path = handlers::execute_report(&args)?;
            reporter.success(&format!("Report written to {}", path.display()));
        }
        Commands::Merge(args) => {
            let outcome = handlers::execute_merge(&args)?;
            reporter.success(&format!(
                "Merged {} snapshot(s) into {} ({} runs)",
                outcome.inputs,
                outcome.target.display(),
                outcome.tests
            ));
        }
        Commands::Summary(args) => {
            let view = handlers::execute_summary(&args)?;
            if args.json {
                reporter.raw(&serde_json::to_string_pretty(&view)?);
            } else {
                view.print(&reporter);
            }
        }
        Commands::Clear(args) => {
            let work_dir = handlers::execute_clear(&args)?;
            reporter.success(&format!("Cleared {}", work_dir.display()));
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
