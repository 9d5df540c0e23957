//! Municipality filter and point-geometry construction

use geo::Point;
use polars::prelude::*;
use tracing::{debug, info};

use crate::data::columns;
use crate::error::Result;

/// Coordinate reference system of every point layer built here.
pub const WGS84: &str = "EPSG:4326";

/// A cleaned registry row with a valid position.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTaggedRecord {
    pub business_id: Option<i64>,
    pub industry_code: Option<i64>,
    pub municipality: String,
    pub village: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub legal_form: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Point in (x = longitude, y = latitude) order.
    pub geometry: Point<f64>,
}

/// Point layer for one municipality.
#[derive(Debug, Clone)]
pub struct GeoLayer {
    pub municipality: String,
    pub crs: &'static str,
    pub records: Vec<GeoTaggedRecord>,
}

impl GeoLayer {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Coordinates in record order as `(latitude, longitude)` pairs.
    pub fn coordinates(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.records.iter().map(|r| (r.latitude, r.longitude))
    }
}

/// Restrict the cleaned registry to `municipality` and geotag its rows.
///
/// Rows whose latitude or longitude is missing, unparsable or non-finite are
/// dropped. An empty layer is a valid result; the caller decides whether that
/// ends the render.
pub fn prepare_geo_layer(registry: &DataFrame, municipality: &str) -> Result<GeoLayer> {
    let subset = registry
        .clone()
        .lazy()
        .filter(col(columns::MUNICIPALITY).eq(lit(municipality)))
        .with_columns([
            col(columns::LATITUDE).cast(DataType::Float64),
            col(columns::LONGITUDE).cast(DataType::Float64),
        ])
        .collect()?;

    let latitudes = float_column(&subset, columns::LATITUDE)?;
    let longitudes = float_column(&subset, columns::LONGITUDE)?;
    let municipalities = text_column(&subset, columns::MUNICIPALITY);
    let villages = text_column(&subset, columns::VILLAGE);
    let statuses = text_column(&subset, columns::STATUS);
    let categories = text_column(&subset, columns::CATEGORY);
    let legal_forms = text_column(&subset, columns::LEGAL_FORM);
    let business_ids = integer_column(&subset, columns::BUSINESS_ID);
    let industry_codes = integer_column(&subset, columns::INDUSTRY_CODE);

    let mut records = Vec::with_capacity(subset.height());
    for i in 0..subset.height() {
        let (Some(latitude), Some(longitude)) = (latitudes[i], longitudes[i]) else {
            continue;
        };
        if !latitude.is_finite() || !longitude.is_finite() {
            continue;
        }

        records.push(GeoTaggedRecord {
            business_id: business_ids[i],
            industry_code: industry_codes[i],
            municipality: municipalities[i]
                .clone()
                .unwrap_or_else(|| municipality.to_string()),
            village: villages[i].clone(),
            status: statuses[i].clone(),
            category: categories[i].clone(),
            legal_form: legal_forms[i].clone(),
            latitude,
            longitude,
            geometry: Point::new(longitude, latitude),
        });
    }

    debug!(
        "{} rows matched {}, {} dropped for missing coordinates",
        subset.height(),
        municipality,
        subset.height() - records.len()
    );
    info!("Geotagged {} records in {}", records.len(), municipality);

    Ok(GeoLayer {
        municipality: municipality.to_string(),
        crs: WGS84,
        records,
    })
}

fn float_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(frame.column(name)?.f64()?.into_iter().collect())
}

/// Optional text column; an absent column reads as all-missing.
fn text_column(frame: &DataFrame, name: &str) -> Vec<Option<String>> {
    match frame.column(name).and_then(|series| series.str()) {
        Ok(values) => values
            .into_iter()
            .map(|value| value.map(str::to_owned))
            .collect(),
        Err(_) => vec![None; frame.height()],
    }
}

fn integer_column(frame: &DataFrame, name: &str) -> Vec<Option<i64>> {
    match frame.column(name).and_then(|series| series.i64()) {
        Ok(values) => values.into_iter().collect(),
        Err(_) => vec![None; frame.height()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean_registry;

    fn registry() -> DataFrame {
        let raw = df!(
            "IDSBR" => ["1", "2", "3", "4", "5"],
            "Kabupaten/Kota" => ["[75] BEKASI", "[75] BEKASI", "[75] BEKASI", "[75] BEKASI ", "[71] BOGOR"],
            "Keberadaan Usaha/Perusahaan" => ["Aktif", "Aktif", "Aktif", "Aktif", "Aktif"],
            "Kategori" => [Some("G"), None, Some("F"), Some("F"), Some("C")],
            "Latitude" => [Some("-6.24"), Some("bad"), Some("-6.30"), Some("-6.31"), Some("-6.59")],
            "Longitude" => [Some("106.99"), Some("107.01"), None, Some("107.02"), Some("106.80")]
        )
        .unwrap();
        clean_registry(raw).unwrap()
    }

    #[test]
    fn test_prepare_geo_layer_filters_and_drops_missing() {
        let layer = prepare_geo_layer(&registry(), "[75] BEKASI").unwrap();

        assert_eq!(layer.len(), 1);
        assert_eq!(layer.crs, WGS84);
        let record = &layer.records[0];
        assert_eq!(record.business_id, Some(1));
        assert_eq!(record.category.as_deref(), Some("G"));
        assert_eq!(record.geometry.x(), 106.99);
        assert_eq!(record.geometry.y(), -6.24);
    }

    #[test]
    fn test_coordinate_completeness() {
        let layer = prepare_geo_layer(&registry(), "[75] BEKASI").unwrap();
        for record in &layer.records {
            assert!(record.latitude.is_finite());
            assert!(record.longitude.is_finite());
            assert_eq!(record.municipality, "[75] BEKASI");
        }
    }

    #[test]
    fn test_unknown_municipality_yields_empty_layer() {
        let layer = prepare_geo_layer(&registry(), "[99] NOWHERE").unwrap();
        assert!(layer.is_empty());
        assert_eq!(layer.municipality, "[99] NOWHERE");
    }

    #[test]
    fn test_absent_optional_columns_read_as_missing() {
        let layer = prepare_geo_layer(&registry(), "[75] BEKASI").unwrap();
        assert_eq!(layer.records[0].legal_form, None);
        assert_eq!(layer.records[0].village, None);
    }
}
