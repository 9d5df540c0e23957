//! Administrative boundary layer read from an ESRI shapefile

use std::path::{Path, PathBuf};

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};
use tracing::{debug, info, warn};

use crate::error::{ReportError, Result};

/// Attribute holding the village name in the boundary export.
pub const NAME_FIELD: &str = "NAMOBJ";

/// Sidecar files the reader cannot do without.
const REQUIRED_SIDECARS: [&str; 2] = ["shx", "dbf"];

#[derive(Debug, Clone)]
pub struct BoundaryPolygon {
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Read-only backdrop of village polygons.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    pub polygons: Vec<BoundaryPolygon>,
    /// Contents of the `.prj` sidecar, when shipped.
    pub projection: Option<String>,
}

impl BoundaryLayer {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Bounding rectangle over every polygon, `None` for an empty layer.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.polygons
            .iter()
            .filter_map(|polygon| polygon.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}

/// Load the boundary layer unchanged.
///
/// The `.shp` file and its `.shx`/`.dbf` sidecars must all exist; any absent
/// part is reported as `MissingSource`.
pub fn load_boundaries(path: &Path) -> Result<BoundaryLayer> {
    for required in required_files(path) {
        if !required.is_file() {
            return Err(ReportError::MissingSource { path: required });
        }
    }

    let mut reader = shapefile::Reader::from_path(path)?;
    let mut polygons = Vec::new();
    let mut skipped = 0usize;

    for entry in reader.iter_shapes_and_records() {
        let (shape, record) = entry?;
        let geometry = match shape {
            Shape::Polygon(polygon) => rings_to_multipolygon(polygon.rings(), |p| (p.x, p.y)),
            Shape::PolygonM(polygon) => rings_to_multipolygon(polygon.rings(), |p| (p.x, p.y)),
            Shape::PolygonZ(polygon) => rings_to_multipolygon(polygon.rings(), |p| (p.x, p.y)),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let name = match record.get(NAME_FIELD) {
            Some(FieldValue::Character(value)) => value.clone(),
            _ => None,
        };

        polygons.push(BoundaryPolygon { name, geometry });
    }

    if skipped > 0 {
        warn!("Skipped {} non-polygon shapes in {}", skipped, path.display());
    }

    let projection = std::fs::read_to_string(path.with_extension("prj")).ok();
    debug!("Projection sidecar present: {}", projection.is_some());
    info!(
        "Loaded {} boundary polygons from {}",
        polygons.len(),
        path.display()
    );

    Ok(BoundaryLayer {
        polygons,
        projection,
    })
}

fn required_files(path: &Path) -> Vec<PathBuf> {
    std::iter::once(path.to_path_buf())
        .chain(REQUIRED_SIDECARS.iter().map(|ext| path.with_extension(ext)))
        .collect()
}

/// Outer rings open a new polygon; inner rings become holes of the most
/// recent outer ring. A leading inner ring is promoted to an exterior.
pub fn rings_to_multipolygon<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> (f64, f64),
) -> MultiPolygon<f64> {
    let to_line = |points: &[P]| -> LineString<f64> {
        points
            .iter()
            .map(|p| {
                let (x, y) = xy(p);
                Coord { x, y }
            })
            .collect()
    };

    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => parts.push((to_line(points), Vec::new())),
            PolygonRing::Inner(points) => match parts.last_mut() {
                Some((_, holes)) => holes.push(to_line(points)),
                None => parts.push((to_line(points), Vec::new())),
            },
        }
    }

    MultiPolygon::new(
        parts
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}
