//! Registry loading and cleaning using Polars
//!
//! Every column is read as text and then coerced explicitly. Values that do
//! not parse become null instead of failing the load; downstream stages
//! decide what a missing value means.

use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{ReportError, Result};

/// Column names used by the registry export.
pub mod columns {
    pub const BUSINESS_ID: &str = "IDSBR";
    pub const INDUSTRY_CODE: &str = "KBLI";
    pub const MUNICIPALITY: &str = "Kabupaten/Kota";
    /// Village column as it appears in the source file.
    pub const VILLAGE_SOURCE: &str = "Kelurahan/Desa";
    /// Village column after cleaning; matches the boundary layer's name attribute.
    pub const VILLAGE: &str = "NAMOBJ";
    pub const STATUS: &str = "Keberadaan Usaha/Perusahaan";
    pub const CATEGORY: &str = "Kategori";
    pub const LEGAL_FORM: &str = "Bentuk Badan Hukum/Usaha";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";

    /// Export artefacts with no analytical value.
    pub const NOISE: [&str; 10] = [
        "Kode Pos",
        "Sektor Institusi",
        "Unnamed: 17",
        "Sumber Profiling",
        "Catatan Profiling",
        "IDSBR.1",
        "Nama Usaha.1",
        "Kegiatan Usaha",
        "Kategori.1",
        "KBLI.1",
    ];
}

/// Operating status of a business as recorded in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusinessStatus {
    Active,
    Duplicate,
    NotFound,
    Closed,
    TemporarilyClosed,
}

impl BusinessStatus {
    /// Statuses whose rows are removed during cleaning.
    pub const EXCLUDED: [BusinessStatus; 4] = [
        BusinessStatus::Duplicate,
        BusinessStatus::NotFound,
        BusinessStatus::Closed,
        BusinessStatus::TemporarilyClosed,
    ];

    /// Source label for the status. `Active` has no single label in the
    /// export, so any unrecognised value is treated as active.
    pub fn label(self) -> Option<&'static str> {
        match self {
            BusinessStatus::Active => None,
            BusinessStatus::Duplicate => Some("Duplikat"),
            BusinessStatus::NotFound => Some("Tidak Ditemukan"),
            BusinessStatus::Closed => Some("Tutup"),
            BusinessStatus::TemporarilyClosed => Some("Tutup Sementara"),
        }
    }

    /// Case-sensitive exact match against the source labels.
    pub fn from_label(label: &str) -> Self {
        Self::EXCLUDED
            .into_iter()
            .find(|status| status.label() == Some(label))
            .unwrap_or(BusinessStatus::Active)
    }

    pub fn is_excluded(self) -> bool {
        self != BusinessStatus::Active
    }
}

/// Read the registry export and clean it.
///
/// # Arguments
/// * `path` - Path to the delimited registry file (header row required)
///
/// # Returns
/// * The cleaned registry frame, or `MissingSource` if the file is absent
pub fn load_registry(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(ReportError::MissingSource {
            path: path.to_path_buf(),
        });
    }

    // Schema inference is disabled so every column arrives as text.
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    info!(
        "Read {} rows x {} columns from {}",
        raw.height(),
        raw.width(),
        path.display()
    );

    clean_registry(raw)
}

/// Normalize columns and drop rows for businesses that no longer operate.
///
/// Takes the frame by value: callers holding a cached frame pass a clone, which
/// shares column buffers but is never mutated in place.
pub fn clean_registry(raw: DataFrame) -> Result<DataFrame> {
    let before = raw.height();
    let names: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let projection: Vec<Expr> = names
        .iter()
        .filter(|name| !columns::NOISE.contains(&name.as_str()))
        .map(|name| normalize_column(name))
        .collect();

    let keep = BusinessStatus::EXCLUDED
        .iter()
        .filter_map(|status| status.label())
        .fold(lit(true), |acc, label| {
            acc.and(col(columns::STATUS).neq_missing(lit(label)))
        });

    let cleaned = raw.lazy().select(projection).filter(keep).collect()?;

    debug!(
        "Cleaning kept {} of {} rows ({} columns)",
        cleaned.height(),
        before,
        cleaned.width()
    );

    Ok(cleaned)
}

fn normalize_column(name: &str) -> Expr {
    match name {
        columns::BUSINESS_ID | columns::INDUSTRY_CODE => coerce_integer(name),
        columns::VILLAGE_SOURCE => col(name).alias(columns::VILLAGE),
        _ => col(name),
    }
}

/// Non-strict numeric cast: unparsable text becomes null. Going through
/// Float64 accepts exports that write identifiers as `123.0`; values with a
/// fractional part are not identifiers and become null as well.
fn coerce_integer(name: &str) -> Expr {
    let value = col(name).cast(DataType::Float64);
    let integral = value
        .clone()
        .eq(value.clone().cast(DataType::Int64).cast(DataType::Float64));
    when(integral)
        .then(value.cast(DataType::Int64))
        .otherwise(lit(NULL).cast(DataType::Int64))
        .alias(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "IDSBR,KBLI,Kode Pos,Kabupaten/Kota,Kelurahan/Desa,Keberadaan Usaha/Perusahaan,Kategori,Bentuk Badan Hukum/Usaha,Latitude,Longitude").unwrap();
        writeln!(file, "1001,47111,17111,[75] BEKASI,Harapan Jaya,Aktif,G,1. Perseroan,-6.21,106.99").unwrap();
        writeln!(file, "1002,abc,17112,[75] BEKASI,Margahayu,Tutup,F,CV,-6.25,107.00").unwrap();
        writeln!(file, "x1003,41011,17113,[75] BEKASI,Margahayu,Aktif,F,CV,-6.26,107.01").unwrap();
        writeln!(file, "1004,10710,17114,[71] BOGOR,Tegal Gundil,Duplikat,C,CV,-6.58,106.80").unwrap();
        writeln!(file, "1005,10710,17115,[71] BOGOR,Tegal Gundil,tutup,C,CV,-6.59,106.81").unwrap();
        file
    }

    #[test]
    fn test_load_registry_cleans_columns_and_rows() {
        let test_file = create_test_csv();
        let frame = load_registry(test_file.path()).unwrap();

        assert_eq!(frame.height(), 3);
        assert!(frame.column("Kode Pos").is_err());
        assert!(frame.column(columns::VILLAGE_SOURCE).is_err());
        assert!(frame.column(columns::VILLAGE).is_ok());

        let ids: Vec<Option<i64>> = frame
            .column(columns::BUSINESS_ID)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(1001), None, Some(1005)]);
    }

    #[test]
    fn test_status_filter_is_case_sensitive() {
        let test_file = create_test_csv();
        let frame = load_registry(test_file.path()).unwrap();

        let statuses: Vec<Option<&str>> = frame
            .column(columns::STATUS)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert!(statuses.contains(&Some("tutup")));
        for status in statuses.into_iter().flatten() {
            assert!(!BusinessStatus::from_label(status).is_excluded());
        }
    }

    #[test]
    fn test_non_numeric_industry_code_becomes_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "IDSBR,KBLI,Keberadaan Usaha/Perusahaan").unwrap();
        writeln!(file, "7,not-a-code,Aktif").unwrap();
        writeln!(file, "8,47111.0,Aktif").unwrap();

        let frame = load_registry(file.path()).unwrap();
        let codes: Vec<Option<i64>> = frame
            .column(columns::INDUSTRY_CODE)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![None, Some(47111)]);
    }

    #[test]
    fn test_fractional_identifier_becomes_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "IDSBR,KBLI,Keberadaan Usaha/Perusahaan").unwrap();
        writeln!(file, "1.5,47111.0,Aktif").unwrap();
        writeln!(file, "1002,4711.25,Aktif").unwrap();

        let frame = load_registry(file.path()).unwrap();
        let ids: Vec<Option<i64>> = frame
            .column(columns::BUSINESS_ID)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        let codes: Vec<Option<i64>> = frame
            .column(columns::INDUSTRY_CODE)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![None, Some(1002)]);
        assert_eq!(codes, vec![Some(47111), None]);
    }

    #[test]
    fn test_missing_file_is_terminal() {
        let result = load_registry(Path::new("/definitely/not/here/dataset.csv"));
        assert!(matches!(result, Err(ReportError::MissingSource { .. })));
    }

    #[test]
    fn test_status_labels_round_trip() {
        for status in BusinessStatus::EXCLUDED {
            let label = status.label().unwrap();
            assert_eq!(BusinessStatus::from_label(label), status);
        }
        assert_eq!(BusinessStatus::from_label("Aktif"), BusinessStatus::Active);
        assert_eq!(BusinessStatus::from_label("TUTUP"), BusinessStatus::Active);
    }
}
