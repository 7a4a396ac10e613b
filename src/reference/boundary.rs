//! Country polygon dataset: display names and per-country bounding boxes.

use super::geometry::{self, Feature};
use super::source;
use super::types::{BBox, Dataset, GeoError, Warning};
use geo::Geometry;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Display-name columns, most specific first.
pub const NAME_COLUMNS: &[&str] = &["ADMIN", "NAME_EN", "NAME", "SOVEREIGNT", "NAME_LONG"];
pub const ISO_COLUMNS: &[&str] = &["ISO_A2", "ADM0_A2", "ISO_A2_EH"];

#[derive(Debug, Clone)]
pub struct CountryBoundary {
    pub display_name: String,
    /// ISO 3166-1 alpha-2 from the dataset itself, if it carried a usable one.
    pub iso_code: Option<String>,
    pub geometry: Option<Geometry<f64>>,
}

pub struct BoundaryStore {
    countries: Vec<CountryBoundary>,
    /// display name → index of its first record
    index: HashMap<String, usize>,
    bounds: Vec<Option<BBox>>,
    has_iso_column: bool,
    warnings: Vec<Warning>,
}

impl BoundaryStore {
    pub fn load(location: &str, timeout: Option<Duration>) -> Result<Self, GeoError> {
        let text = source::read_text(location, timeout)?;
        Self::from_geojson(&text)
    }

    pub fn from_geojson(text: &str) -> Result<Self, GeoError> {
        let features = geometry::parse_features(text, Dataset::Boundaries)?;

        let name_col = geometry::pick_column(&features, NAME_COLUMNS).ok_or_else(|| {
            GeoError::Schema {
                dataset: Dataset::Boundaries,
                detail: format!("none of the name columns {:?} is present", NAME_COLUMNS),
            }
        })?;
        let iso_col = geometry::pick_column(&features, ISO_COLUMNS);

        let raw = features.len();
        let countries: Vec<CountryBoundary> = features
            .into_iter()
            .filter_map(|f| to_boundary(f, name_col, iso_col))
            .collect();

        tracing::info!(
            countries = countries.len(),
            dropped = raw - countries.len(),
            name_column = name_col,
            iso_column = iso_col.unwrap_or("-"),
            "parsed country boundaries"
        );

        let mut store = Self::from_boundaries(countries)?;
        store.has_iso_column = iso_col.is_some();
        if iso_col.is_none() {
            store.warnings.insert(0, Warning::MissingIsoColumn { dataset: Dataset::Boundaries });
        }
        Ok(store)
    }

    /// Build directly from records (fixtures, alternate readers).
    pub fn from_boundaries(countries: Vec<CountryBoundary>) -> Result<Self, GeoError> {
        if countries.is_empty() {
            return Err(GeoError::EmptyDataset(Dataset::Boundaries));
        }

        let mut index = HashMap::with_capacity(countries.len());
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut duplicated: Vec<&str> = Vec::new();
        for (i, c) in countries.iter().enumerate() {
            let seen = counts.entry(c.display_name.as_str()).or_insert(0);
            *seen += 1;
            match *seen {
                1 => {
                    index.insert(c.display_name.clone(), i);
                }
                2 => duplicated.push(&c.display_name),
                _ => {}
            }
        }

        let warnings = duplicated
            .into_iter()
            .map(|key| Warning::AmbiguousMatch {
                dataset: Dataset::Boundaries,
                key: key.to_string(),
                count: counts[key],
            })
            .collect();

        let bounds = countries
            .iter()
            .map(|c| c.geometry.as_ref().and_then(geometry::bounds))
            .collect();

        let has_iso_column = countries.iter().any(|c| c.iso_code.is_some());
        Ok(Self { countries, index, bounds, has_iso_column, warnings })
    }

    /// Distinct display names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.countries.iter().map(|c| c.display_name.as_str()).collect();
        names.into_iter().collect()
    }

    pub fn boundaries(&self) -> &[CountryBoundary] {
        &self.countries
    }

    /// Exact-match lookup; the first record wins on duplicates.
    pub fn get(&self, display_name: &str) -> Option<&CountryBoundary> {
        self.index.get(display_name).map(|&i| &self.countries[i])
    }

    pub fn bounds_for(&self, display_name: &str) -> Result<BBox, GeoError> {
        self.index
            .get(display_name)
            .and_then(|&i| self.bounds[i])
            .ok_or_else(|| GeoError::not_found(format!("country boundary '{}'", display_name)))
    }

    pub fn has_iso_column(&self) -> bool {
        self.has_iso_column
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

fn to_boundary(f: Feature, name_col: &str, iso_col: Option<&str>) -> Option<CountryBoundary> {
    let display_name = f.attr(name_col)?.to_string();
    let iso_code = iso_col.and_then(|c| f.attr(c)).and_then(normalize_iso);
    Some(CountryBoundary { display_name, iso_code, geometry: f.geometry })
}

/// Two ASCII letters, uppercased. Natural Earth writes "-99" for "none".
pub fn normalize_iso(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (raw.len() == 2 && raw.chars().all(|c| c.is_ascii_alphabetic())).then(|| raw.to_ascii_uppercase())
}
