//! State / province polygon dataset keyed by (ISO code, name).
//!
//! Optional: without it, state-level filters fall back to the country box.

use super::boundary::normalize_iso;
use super::geometry::{self, Feature};
use super::source;
use super::types::{BBox, Dataset, GeoError, Warning};
use geo::Geometry;
use std::collections::HashMap;
use std::time::Duration;

pub const ISO_COLUMNS: &[&str] = &["iso_a2", "ISO_A2", "adm0_a2"];
pub const NAME_COLUMNS: &[&str] = &["name", "NAME", "name_en", "gn_name"];

#[derive(Debug, Clone)]
pub struct SubdivisionBoundary {
    pub iso_code: String,
    pub name: String,
    pub geometry: Option<Geometry<f64>>,
}

pub struct SubdivisionShapeStore {
    /// ISO code → lowercased name → bounds of the first matching record
    index: HashMap<String, HashMap<String, Option<BBox>>>,
    records: usize,
    warnings: Vec<Warning>,
}

impl SubdivisionShapeStore {
    pub fn load(location: &str, timeout: Option<Duration>) -> Result<Self, GeoError> {
        let text = source::read_text(location, timeout)?;
        Self::from_geojson(&text)
    }

    pub fn from_geojson(text: &str) -> Result<Self, GeoError> {
        let features = geometry::parse_features(text, Dataset::Subdivisions)?;

        let iso_col = geometry::pick_column(&features, ISO_COLUMNS).ok_or_else(|| schema("ISO", ISO_COLUMNS))?;
        let name_col = geometry::pick_column(&features, NAME_COLUMNS).ok_or_else(|| schema("name", NAME_COLUMNS))?;

        let records: Vec<SubdivisionBoundary> = features
            .into_iter()
            .filter_map(|f| to_subdivision(f, iso_col, name_col))
            .collect();

        tracing::info!(
            subdivisions = records.len(),
            iso_column = iso_col,
            name_column = name_col,
            "parsed subdivision boundaries"
        );
        Self::from_boundaries(records)
    }

    pub fn from_boundaries(records: Vec<SubdivisionBoundary>) -> Result<Self, GeoError> {
        if records.is_empty() {
            return Err(GeoError::EmptyDataset(Dataset::Subdivisions));
        }

        let mut index: HashMap<String, HashMap<String, Option<BBox>>> = HashMap::new();
        let mut dupes: HashMap<(String, String), usize> = HashMap::new();
        let count = records.len();

        for r in records {
            let key = r.name.to_lowercase();
            let names = index.entry(r.iso_code.clone()).or_default();
            if names.contains_key(&key) {
                *dupes.entry((r.iso_code, key)).or_insert(1) += 1;
                continue;
            }
            names.insert(key, r.geometry.as_ref().and_then(geometry::bounds));
        }

        let mut warnings: Vec<Warning> = dupes
            .into_iter()
            .map(|((iso, name), count)| Warning::AmbiguousMatch {
                dataset: Dataset::Subdivisions,
                key: format!("{}/{}", iso, name),
                count,
            })
            .collect();
        warnings.sort_by(|a, b| a.to_string().cmp(&b.to_string()));

        Ok(Self { index, records: count, warnings })
    }

    /// Case-insensitive on `name`, exact on `iso_code`.
    pub fn bounds_for(&self, iso_code: &str, name: &str) -> Result<BBox, GeoError> {
        let names = self
            .index
            .get(iso_code)
            .ok_or_else(|| GeoError::not_found(format!("subdivisions for country '{}'", iso_code)))?;

        names
            .get(&name.to_lowercase())
            .copied()
            .flatten()
            .ok_or_else(|| GeoError::not_found(format!("subdivision '{}' in '{}'", name, iso_code)))
    }

    pub fn has_country(&self, iso_code: &str) -> bool {
        self.index.contains_key(iso_code)
    }

    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

fn schema(what: &str, candidates: &[&str]) -> GeoError {
    GeoError::Schema {
        dataset: Dataset::Subdivisions,
        detail: format!("no {} column among {:?}", what, candidates),
    }
}

fn to_subdivision(f: Feature, iso_col: &str, name_col: &str) -> Option<SubdivisionBoundary> {
    let iso_code = normalize_iso(f.attr(iso_col)?)?;
    let name = f.attr(name_col)?.to_string();
    Some(SubdivisionBoundary { iso_code, name, geometry: f.geometry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures;

    #[test]
    fn test_case_insensitive_lookup() {
        let store = SubdivisionShapeStore::from_geojson(&fixtures::SUBDIVISIONS_GEOJSON).unwrap();
        let a = store.bounds_for("US", "Illinois").unwrap();
        let b = store.bounds_for("US", "ILLINOIS").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_array(), [-91.5, 37.0, -87.5, 42.5]);
    }

    #[test]
    fn test_unknown_country_or_name() {
        let store = SubdivisionShapeStore::from_geojson(&fixtures::SUBDIVISIONS_GEOJSON).unwrap();
        assert!(store.bounds_for("FR", "Bretagne").unwrap_err().is_not_found());
        assert!(store.bounds_for("US", "Ohio").unwrap_err().is_not_found());
        assert!(!store.has_country("FR"));
    }

    #[test]
    fn test_iso_is_exact() {
        let store = SubdivisionShapeStore::from_geojson(&fixtures::SUBDIVISIONS_GEOJSON).unwrap();
        assert!(store.bounds_for("us", "Illinois").is_err());
    }

    #[test]
    fn test_nameless_records_dropped() {
        let store = SubdivisionShapeStore::from_geojson(&fixtures::SUBDIVISIONS_GEOJSON).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let store = SubdivisionShapeStore::from_boundaries(vec![
            SubdivisionBoundary { iso_code: "US".into(), name: "Texas".into(), geometry: None },
            SubdivisionBoundary { iso_code: "US".into(), name: "TEXAS".into(), geometry: None },
        ])
        .unwrap();
        assert!(store.bounds_for("US", "texas").unwrap_err().is_not_found());
        assert_eq!(store.warnings().len(), 1);
    }

    #[test]
    fn test_missing_columns_are_schema_errors() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Ohio"},"geometry":null}]}"#;
        assert!(matches!(
            SubdivisionShapeStore::from_geojson(text),
            Err(GeoError::Schema { dataset: Dataset::Subdivisions, .. })
        ));
    }
}
