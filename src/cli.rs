//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

/// Geographic clustering report for a business registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML file with report settings; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the registry CSV file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Path to the village boundary shapefile (.shp)
    #[arg(short, long)]
    pub boundaries: Option<PathBuf>,

    /// Exact municipality value to keep, e.g. "[75] BEKASI"
    #[arg(short, long)]
    pub municipality: Option<String>,

    /// Number of clusters
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Number of dominant values listed per field
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Output path for the cluster map
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
