//! Map rendering with Plotters and the textual cluster report
//!
//! The map draws no text, so it renders on hosts without system fonts.
//! Cluster identity is conveyed by colour and spelled out in the text report.

use std::fmt::Write as _;
use std::path::Path;

use geo::LineString;
use plotters::prelude::*;
use tracing::info;

use crate::error::{ReportError, Result};
use crate::pipeline::Report;
use crate::summary::ValueCount;

/// Viridis samples, one per cluster.
const CLUSTER_COLORS: [RGBColor; 5] = [
    RGBColor(68, 1, 84),
    RGBColor(59, 82, 139),
    RGBColor(33, 145, 140),
    RGBColor(94, 201, 98),
    RGBColor(253, 231, 37),
];

const CLUSTER_COLOR_NAMES: [&str; 5] = ["purple", "blue", "teal", "green", "yellow"];

const BOUNDARY_FILL: RGBColor = RGBColor(211, 211, 211);

fn cluster_color(cluster: usize) -> &'static RGBColor {
    &CLUSTER_COLORS[cluster % CLUSTER_COLORS.len()]
}

pub fn cluster_color_name(cluster: usize) -> &'static str {
    CLUSTER_COLOR_NAMES[cluster % CLUSTER_COLOR_NAMES.len()]
}

fn render_error<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Render {
        message: err.to_string(),
    }
}

fn ring_points(ring: &LineString<f64>) -> Vec<(f64, f64)> {
    ring.coords().map(|c| (c.x, c.y)).collect()
}

/// Plot extent covering both layers, padded by 2% on each side.
fn plot_extent(report: &Report) -> Option<((f64, f64), (f64, f64))> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    if let Some(bounds) = report.boundaries.bounds() {
        min_x = bounds.min().x;
        min_y = bounds.min().y;
        max_x = bounds.max().x;
        max_y = bounds.max().y;
    }
    for point in &report.clustering.points {
        min_x = min_x.min(point.record.longitude);
        max_x = max_x.max(point.record.longitude);
        min_y = min_y.min(point.record.latitude);
        max_y = max_y.max(point.record.latitude);
    }

    if !min_x.is_finite() || !min_y.is_finite() {
        return None;
    }
    let pad_x = ((max_x - min_x) * 0.02).max(1e-3);
    let pad_y = ((max_y - min_y) * 0.02).max(1e-3);
    Some(((min_x - pad_x, max_x + pad_x), (min_y - pad_y, max_y + pad_y)))
}

/// Draw gray village polygons with business points coloured by cluster.
///
/// # Arguments
/// * `report` - Rendered pipeline output
/// * `output_path` - Path of the PNG to write
pub fn render_cluster_map(report: &Report, output_path: &Path) -> Result<()> {
    let ((x_min, x_max), (y_min, y_max)) = plot_extent(report).ok_or_else(|| ReportError::Render {
        message: "nothing to draw".to_string(),
    })?;

    let root = BitMapBackend::new(output_path, (1000, 900)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(render_error)?;

    let polygons = report
        .boundaries
        .polygons
        .iter()
        .flat_map(|boundary| boundary.geometry.0.iter());

    for polygon in polygons {
        chart
            .draw_series(std::iter::once(Polygon::new(
                ring_points(polygon.exterior()),
                BOUNDARY_FILL.filled(),
            )))
            .map_err(render_error)?;
        chart
            .draw_series(
                polygon
                    .interiors()
                    .iter()
                    .map(|hole| Polygon::new(ring_points(hole), WHITE.filled())),
            )
            .map_err(render_error)?;
        chart
            .draw_series(
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors().iter())
                    .map(|ring| PathElement::new(ring_points(ring), BLACK.stroke_width(1))),
            )
            .map_err(render_error)?;
    }

    chart
        .draw_series(report.clustering.points.iter().map(|point| {
            Circle::new(
                (point.record.longitude, point.record.latitude),
                3,
                cluster_color(point.cluster).filled(),
            )
        }))
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    info!("Cluster map saved to: {}", output_path.display());

    Ok(())
}

fn format_counts(counts: &[ValueCount]) -> String {
    counts
        .iter()
        .map(|entry| {
            format!(
                "{} ({})",
                entry.value.as_deref().unwrap_or("<missing>"),
                entry.count
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Plain-text report: score, cluster sizes and dominant values per cluster.
pub fn format_report(report: &Report) -> String {
    let clustering = &report.clustering;
    let total = clustering.points.len();
    let mut out = String::new();

    let _ = writeln!(out, "=== Business Clusters in {} ===", clustering.municipality);
    let _ = writeln!(
        out,
        "{} businesses grouped into {} clusters by location ({})",
        total, clustering.n_clusters, clustering.crs
    );
    let _ = writeln!(out, "Silhouette score: {:.3}", report.silhouette);
    let _ = writeln!(out, "Boundary polygons: {}", report.boundaries.len());

    for summary in &report.summaries {
        let percentage = summary.count as f64 / total as f64 * 100.0;
        let _ = writeln!(
            out,
            "\n--- Cluster {} ({}) ---",
            summary.cluster,
            cluster_color_name(summary.cluster)
        );
        let _ = writeln!(out, "  Size: {} businesses ({:.1}%)", summary.count, percentage);
        let _ = writeln!(
            out,
            "  Dominant categories: {}",
            format_counts(summary.top_categories())
        );
        let _ = writeln!(
            out,
            "  Dominant legal forms: {}",
            format_counts(summary.top_legal_forms())
        );
    }

    out
}

pub fn print_report(report: &Report) {
    print!("{}", format_report(report));
}
