//! Report configuration: TOML file, defaults and command-line overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::{ReportError, Result};
use crate::model::DEFAULT_CLUSTERS;
use crate::summary::DEFAULT_TOP_N;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Business registry export (CSV with header row).
    pub dataset_path: PathBuf,
    /// Village boundary shapefile (`.shp`, sidecars alongside).
    pub boundary_path: PathBuf,
    /// Exact `Kabupaten/Kota` value to keep.
    pub municipality: String,
    /// Number of Ward clusters to cut the tree into.
    pub n_clusters: usize,
    /// Values listed per frequency table.
    pub top_n: usize,
    /// Map image written by the CLI.
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/dataset.csv"),
            boundary_path: PathBuf::from("data/KOTA BEKASI/ADMINISTRASIDESA_AR_25K.shp"),
            municipality: "[75] BEKASI".to_string(),
            n_clusters: DEFAULT_CLUSTERS,
            top_n: DEFAULT_TOP_N,
            output: PathBuf::from("cluster_map.png"),
        }
    }
}

impl ReportConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ReportError::Config {
                message: format!("config file not found: {}", path.display()),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved settings as TOML, in the same shape `from_file` reads.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ReportError::Config {
            message: format!("cannot serialize config: {}", e),
        })
    }

    /// Config file (or defaults) with command-line values layered on top.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(input) = &args.input {
            config.dataset_path = input.clone();
        }
        if let Some(boundaries) = &args.boundaries {
            config.boundary_path = boundaries.clone();
        }
        if let Some(municipality) = &args.municipality {
            config.municipality = municipality.clone();
        }
        if let Some(clusters) = args.clusters {
            config.n_clusters = clusters;
        }
        if let Some(top) = args.top {
            config.top_n = top;
        }
        if let Some(output) = &args.output {
            config.output = output.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_clusters < 2 {
            return Err(ReportError::Config {
                message: format!("n_clusters must be at least 2, got {}", self.n_clusters),
            });
        }
        if self.top_n == 0 {
            return Err(ReportError::Config {
                message: "top_n must be at least 1".to_string(),
            });
        }
        if self.municipality.trim().is_empty() {
            return Err(ReportError::Config {
                message: "municipality must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
