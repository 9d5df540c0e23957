//! geocluster: geographic clustering of a business registry
//!
//! Loads a registry export and a village boundary layer, keeps the businesses
//! of one municipality, clusters them by location with Ward hierarchical
//! clustering and summarizes each cluster's dominant categories and legal forms.

pub mod boundary;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod geotag;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use boundary::{load_boundaries, BoundaryLayer, BoundaryPolygon};
pub use cli::Args;
pub use config::ReportConfig;
pub use data::{clean_registry, load_registry, BusinessStatus};
pub use error::{ReportError, Result};
pub use geotag::{prepare_geo_layer, GeoLayer, GeoTaggedRecord, WGS84};
pub use model::{cluster_layer, fit_ward, silhouette_score, ClusteringResult, StandardScaler};
pub use pipeline::{Analysis, Report, ReportSession};
pub use summary::{summarize_clusters, ClusterSummary, FrequencyTable, ValueCount};
pub use viz::{print_report, render_cluster_map};
