//! Ward hierarchical clustering of geotagged records

use std::collections::{HashMap, HashSet};

use kodama::{linkage, Method, Step};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{debug, info};

use crate::error::{ReportError, Result};
use crate::geotag::{GeoLayer, GeoTaggedRecord};

/// Cluster count used by the report unless configured otherwise.
pub const DEFAULT_CLUSTERS: usize = 5;

/// Per-column standardization to zero mean and unit variance.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    /// Population standard deviation; constant columns scale by 1.
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on the given records only; nothing is carried across sessions.
    pub fn fit(records: &Array2<f64>) -> Result<Self> {
        let mean = records
            .mean_axis(Axis(0))
            .ok_or_else(|| ReportError::degenerate("cannot standardize an empty feature matrix"))?;
        let scale = records
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > f64::EPSILON { std } else { 1.0 });
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, records: &Array2<f64>) -> Array2<f64> {
        (records - &self.mean) / &self.scale
    }
}

/// One record with its cluster label.
#[derive(Debug, Clone)]
pub struct ClusteredPoint {
    /// The geotagged business, unchanged
    pub record: GeoTaggedRecord,
    /// Cluster label in `0..n_clusters`
    pub cluster: usize,
}

/// Output of clustering one municipality layer.
#[derive(Debug, Clone)]
pub struct ClusteringResult {
    pub municipality: String,
    pub crs: &'static str,
    pub n_clusters: usize,
    pub points: Vec<ClusteredPoint>,
    /// Standardized `[latitude, longitude]` features in record order.
    pub scaled_features: Array2<f64>,
    pub silhouette: f64,
}

impl ClusteringResult {
    pub fn labels(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.cluster).collect()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for point in &self.points {
            sizes[point.cluster] += 1;
        }
        sizes
    }
}

/// Standardize coordinates, cluster them with Ward linkage and score the
/// partition.
///
/// # Arguments
/// * `layer` - Non-empty geotagged layer; it is not modified
/// * `n_clusters` - Target cluster count (at least 2)
///
/// # Returns
/// * Labeled records, standardized features and the silhouette score
pub fn cluster_layer(layer: &GeoLayer, n_clusters: usize) -> Result<ClusteringResult> {
    let features = coordinate_matrix(layer)?;
    let scaler = StandardScaler::fit(&features)?;
    let scaled = scaler.transform(&features);
    debug!(
        "Standardized {} points (mean {:?}, scale {:?})",
        scaled.nrows(),
        scaler.mean.to_vec(),
        scaler.scale.to_vec()
    );

    let labels = fit_ward(&scaled, n_clusters)?;
    let silhouette = silhouette_score(&scaled, &labels)?;

    let points = layer
        .records
        .iter()
        .zip(labels.iter())
        .map(|(record, &cluster)| ClusteredPoint {
            record: record.clone(),
            cluster,
        })
        .collect();

    info!(
        "Clustered {} points into {} clusters, silhouette {:.3}",
        layer.len(),
        n_clusters,
        silhouette
    );

    Ok(ClusteringResult {
        municipality: layer.municipality.clone(),
        crs: layer.crs,
        n_clusters,
        points,
        scaled_features: scaled,
        silhouette,
    })
}

/// `(n, 2)` matrix of `[latitude, longitude]` rows.
fn coordinate_matrix(layer: &GeoLayer) -> Result<Array2<f64>> {
    let mut raw = Vec::with_capacity(layer.len() * 2);
    for (latitude, longitude) in layer.coordinates() {
        raw.extend_from_slice(&[latitude, longitude]);
    }
    Ok(Array2::from_shape_vec((layer.len(), 2), raw)?)
}

/// Agglomerative clustering with Ward linkage on Euclidean distances.
///
/// Labels lie in `0..n_clusters` and are numbered by first appearance in row
/// order. The numbering carries no meaning beyond grouping.
pub fn fit_ward(features: &Array2<f64>, n_clusters: usize) -> Result<Vec<usize>> {
    if n_clusters < 2 {
        return Err(ReportError::degenerate(format!(
            "need at least 2 clusters, got {}",
            n_clusters
        )));
    }

    let distinct = distinct_rows(features);
    if distinct < n_clusters {
        return Err(ReportError::degenerate(format!(
            "{} distinct points cannot form {} clusters",
            distinct, n_clusters
        )));
    }

    let n_samples = features.nrows();
    let mut condensed = Vec::with_capacity(n_samples * (n_samples - 1) / 2);
    for i in 0..n_samples {
        for j in (i + 1)..n_samples {
            condensed.push(euclidean_distance(&features.row(i), &features.row(j)));
        }
    }

    let dendrogram = linkage(&mut condensed, n_samples, Method::Ward);
    Ok(cut_tree(dendrogram.steps(), n_samples, n_clusters))
}

/// Replay the first `n - k` merges and label each observation by its root.
fn cut_tree(steps: &[Step<f64>], n_samples: usize, n_clusters: usize) -> Vec<usize> {
    let merges = n_samples - n_clusters;
    let mut parent: Vec<usize> = (0..n_samples + merges).collect();
    for (i, step) in steps.iter().take(merges).enumerate() {
        let node = n_samples + i;
        parent[step.cluster1] = node;
        parent[step.cluster2] = node;
    }

    let mut roots: HashMap<usize, usize> = HashMap::new();
    (0..n_samples)
        .map(|observation| {
            let mut node = observation;
            while parent[node] != node {
                node = parent[node];
            }
            let next = roots.len();
            *roots.entry(node).or_insert(next)
        })
        .collect()
}

/// Mean silhouette coefficient over all points.
///
/// Points alone in their cluster score 0. Fewer than two labels, or as many
/// labels as points, leave the coefficient undefined and are reported as
/// errors.
pub fn silhouette_score(features: &Array2<f64>, labels: &[usize]) -> Result<f64> {
    let n_samples = features.nrows();
    if labels.len() != n_samples {
        return Err(ReportError::degenerate(format!(
            "{} labels for {} points",
            labels.len(),
            n_samples
        )));
    }

    let n_labels = labels.iter().collect::<HashSet<_>>().len();
    if n_labels < 2 || n_labels >= n_samples {
        return Err(ReportError::degenerate(format!(
            "silhouette needs 2..={} labels, got {}",
            n_samples.saturating_sub(1),
            n_labels
        )));
    }

    let n_slots = labels.iter().max().map_or(0, |&max| max + 1);
    let mut sizes = vec![0usize; n_slots];
    for &label in labels {
        sizes[label] += 1;
    }

    let mut silhouette_sum = 0.0;
    for i in 0..n_samples {
        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }

        let mut distance_sums = vec![0.0; n_slots];
        let point = features.row(i);
        for j in 0..n_samples {
            if i != j {
                distance_sums[labels[j]] += euclidean_distance(&point, &features.row(j));
            }
        }

        let a_i = distance_sums[own] / (sizes[own] - 1) as f64;
        let b_i = (0..n_slots)
            .filter(|&label| label != own && sizes[label] > 0)
            .map(|label| distance_sums[label] / sizes[label] as f64)
            .fold(f64::INFINITY, f64::min);

        let denominator = a_i.max(b_i);
        if denominator > 0.0 {
            silhouette_sum += (b_i - a_i) / denominator;
        }
    }

    Ok(silhouette_sum / n_samples as f64)
}

fn distinct_rows(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotag::WGS84;
    use geo::Point;
    use ndarray::array;

    fn record(latitude: f64, longitude: f64) -> GeoTaggedRecord {
        GeoTaggedRecord {
            business_id: None,
            industry_code: None,
            municipality: "[75] BEKASI".to_string(),
            village: None,
            status: None,
            category: None,
            legal_form: None,
            latitude,
            longitude,
            geometry: Point::new(longitude, latitude),
        }
    }

    fn layer(coords: &[(f64, f64)]) -> GeoLayer {
        GeoLayer {
            municipality: "[75] BEKASI".to_string(),
            crs: WGS84,
            records: coords.iter().map(|&(lat, lon)| record(lat, lon)).collect(),
        }
    }

    fn two_groups() -> GeoLayer {
        layer(&[
            (-6.200, 106.950),
            (-6.201, 106.951),
            (-6.202, 106.949),
            (-6.199, 106.952),
            (-6.200, 106.948),
            (-6.350, 107.100),
            (-6.351, 107.101),
            (-6.349, 107.099),
            (-6.352, 107.102),
            (-6.350, 107.098),
        ])
    }

    #[test]
    fn test_standard_scaler_zero_mean_unit_variance() {
        let raw = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&raw).unwrap();
        let scaled = scaler.transform(&raw);

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        assert!(mean[0].abs() < 1e-12);
        assert!((scaled.column(0).std(0.0) - 1.0).abs() < 1e-12);
        // Constant column is centred but not divided by zero.
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_two_tight_groups_are_separated() {
        let result = cluster_layer(&two_groups(), 2).unwrap();
        let labels = result.labels();

        assert!(labels[..5].iter().all(|&l| l == labels[0]));
        assert!(labels[5..].iter().all(|&l| l == labels[5]));
        assert_ne!(labels[0], labels[5]);
        assert!(result.silhouette > 0.8, "silhouette {}", result.silhouette);
    }

    #[test]
    fn test_label_coverage() {
        let coords: Vec<(f64, f64)> = (0..12)
            .map(|i| (-6.2 - (i % 4) as f64 * 0.03, 106.9 + (i / 4) as f64 * 0.05))
            .collect();
        let input = layer(&coords);
        let result = cluster_layer(&input, DEFAULT_CLUSTERS).unwrap();

        assert_eq!(result.points.len(), input.len());
        assert!(result.labels().iter().all(|&l| l < DEFAULT_CLUSTERS));
        assert_eq!(result.cluster_sizes().iter().sum::<usize>(), input.len());
        assert!(result.cluster_sizes().iter().all(|&size| size > 0));
        assert!((-1.0..=1.0).contains(&result.silhouette));
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let first = cluster_layer(&two_groups(), 3).unwrap();
        let second = cluster_layer(&two_groups(), 3).unwrap();
        assert_eq!(first.labels(), second.labels());
        assert_eq!(first.silhouette, second.silhouette);
    }

    #[test]
    fn test_too_few_distinct_points_is_degenerate() {
        let input = layer(&[(-6.2, 106.9), (-6.2, 106.9), (-6.3, 107.0), (-6.3, 107.0)]);
        let result = cluster_layer(&input, 3);
        assert!(matches!(result, Err(ReportError::DegenerateClustering { .. })));
    }

    #[test]
    fn test_single_cluster_request_is_degenerate() {
        let result = cluster_layer(&two_groups(), 1);
        assert!(matches!(result, Err(ReportError::DegenerateClustering { .. })));
    }

    #[test]
    fn test_silhouette_rejects_single_label() {
        let features = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        assert!(silhouette_score(&features, &[0, 0, 0]).is_err());
        assert!(silhouette_score(&features, &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_silhouette_singleton_scores_zero() {
        let features = array![[0.0, 0.0], [0.0, 1.0], [10.0, 0.0]];
        let score = silhouette_score(&features, &[0, 0, 1]).unwrap();
        // Two members of cluster 0: a = 1, b ≈ 10 and 10.05; the singleton adds 0.
        let expected = ((10.0 - 1.0) / 10.0 + (101.0f64.sqrt() - 1.0) / 101.0f64.sqrt()) / 3.0;
        assert!((score - expected).abs() < 1e-12);
    }
}
