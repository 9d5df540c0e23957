//! geocluster CLI: one report render per invocation
//!
//! Loads the sources, clusters the municipality's businesses, writes the map
//! and prints the per-cluster report. Terminal conditions exit with distinct
//! codes and no partial output.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use geocluster::{logging, print_report, render_cluster_map, Args, ReportConfig, ReportSession};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logger(args.verbose);

    let config = match ReportConfig::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    if args.verbose {
        tracing::debug!("Resolved config:\n{}", config.to_toml_string()?);
    }

    let start_time = Instant::now();
    let mut session = ReportSession::new(config);

    let report = match session.render() {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Render stopped: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    render_cluster_map(&report, &session.config().output)?;
    print_report(&report);

    tracing::info!(
        "Report complete in {:.2}s, map saved to {}",
        start_time.elapsed().as_secs_f64(),
        session.config().output.display()
    );

    Ok(())
}
