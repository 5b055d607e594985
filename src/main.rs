//! NZBGet scan-hook binary: host environment in, queue directives out

use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use nzb_scan::{ScanContext, ScanOutcome, run_scan};

fn main() -> ExitCode {
    // Logs go to stderr; stdout is reserved for the [NZB] directives the
    // host parses
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let ctx = match ScanContext::from_env() {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "invalid hook environment");
            return ExitCode::FAILURE;
        }
    };

    match run_scan(&ctx) {
        Ok(ScanOutcome::Directives(directives)) => {
            for directive in &directives {
                println!("{directive}");
            }
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "scan failed");
            ExitCode::FAILURE
        }
    }
}
