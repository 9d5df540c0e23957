//! Session orchestration: load, filter, cluster, summarize
//!
//! A [`ReportSession`] owns the memo caches, so repeated renders within one
//! process reuse loaded sources and clustering results. Source files are not
//! watched; a new session is needed to pick up changed data.

use std::path::PathBuf;
use std::sync::Arc;

use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::boundary::{load_boundaries, BoundaryLayer};
use crate::cache::{ClusterKey, LayerFingerprint, MemoCache};
use crate::config::ReportConfig;
use crate::data::load_registry;
use crate::error::{ReportError, Result};
use crate::geotag::prepare_geo_layer;
use crate::model::{cluster_layer, ClusteringResult};
use crate::summary::{summarize_clusters, ClusterSummary};

/// Everything the presenter needs for one render.
#[derive(Debug, Clone)]
pub struct Report {
    pub boundaries: Arc<BoundaryLayer>,
    pub clustering: Arc<ClusteringResult>,
    pub silhouette: f64,
    pub summaries: Vec<ClusterSummary>,
}

/// Registry-derived part of a report.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub clustering: Arc<ClusteringResult>,
    pub summaries: Vec<ClusterSummary>,
}

pub struct ReportSession {
    config: ReportConfig,
    registries: MemoCache<PathBuf, DataFrame>,
    boundaries: MemoCache<PathBuf, BoundaryLayer>,
    clusterings: MemoCache<ClusterKey, ClusteringResult>,
}

impl ReportSession {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            registries: MemoCache::new("registry"),
            boundaries: MemoCache::new("boundary"),
            clusterings: MemoCache::new("clustering"),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Run the pipeline. Any error ends the render; nothing partial is returned.
    pub fn render(&mut self) -> Result<Report> {
        let analysis = self.analyze()?;
        let boundaries = self.backdrop()?;

        Ok(Report {
            boundaries,
            silhouette: analysis.clustering.silhouette,
            clustering: analysis.clustering,
            summaries: analysis.summaries,
        })
    }

    /// Boundary layer for the map, loaded once per session.
    pub fn backdrop(&mut self) -> Result<Arc<BoundaryLayer>> {
        let boundary_path = self.config.boundary_path.clone();
        self.boundaries
            .get_or_try_insert_with(boundary_path.clone(), || load_boundaries(&boundary_path))
    }

    /// Registry side of the pipeline: load, geo-filter, cluster, summarize.
    pub fn analyze(&mut self) -> Result<Analysis> {
        let config = &self.config;

        let registry_path = config.dataset_path.clone();
        let registry = self
            .registries
            .get_or_try_insert_with(registry_path.clone(), || load_registry(&registry_path))?;

        let layer = prepare_geo_layer(&registry, &config.municipality)?;
        if layer.is_empty() {
            warn!(
                "No valid business records for {} after cleaning",
                config.municipality
            );
            return Err(ReportError::NoData {
                municipality: config.municipality.clone(),
            });
        }

        let key = ClusterKey {
            layer: LayerFingerprint::of(&layer),
            n_clusters: config.n_clusters,
        };
        let n_clusters = config.n_clusters;
        let clustering = self
            .clusterings
            .get_or_try_insert_with(key, || cluster_layer(&layer, n_clusters))?;

        let summaries = summarize_clusters(&clustering, config.top_n);
        info!(
            "Analysis ready: {} points, {} clusters, silhouette {:.3}",
            clustering.points.len(),
            summaries.len(),
            clustering.silhouette
        );

        Ok(Analysis {
            clustering,
            summaries,
        })
    }

    /// `(hits, misses)` of the clustering cache.
    pub fn clustering_cache_stats(&self) -> (u64, u64) {
        (self.clusterings.hits(), self.clusterings.misses())
    }

    /// `(hits, misses)` of the registry cache.
    pub fn registry_cache_stats(&self) -> (u64, u64) {
        (self.registries.hits(), self.registries.misses())
    }

    /// `(hits, misses)` of the boundary cache.
    pub fn boundary_cache_stats(&self) -> (u64, u64) {
        (self.boundaries.hits(), self.boundaries.misses())
    }
}
