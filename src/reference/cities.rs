//! City gazetteer (GeoNames `citiesNNN.txt`, 19 tab-separated columns).
//!
//! Only six columns are retained. Records are kept in descending population
//! order, so every lookup that says "first" means "most populous".

use super::country_codes::{into_io, tsv_reader};
use super::source;
use super::types::{Dataset, GeoError, Warning};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

const NAME_COL: usize = 1;
const LAT_COL: usize = 4;
const LON_COL: usize = 5;
const COUNTRY_COL: usize = 8;
const ADMIN1_COL: usize = 10;
const POPULATION_COL: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: String,
    pub subdivision_code: String,
    pub population: i64,
}

#[derive(Debug, Default)]
pub struct CityGazetteer {
    records: Vec<CityRecord>,
    /// (country, subdivision) → record indices, population descending
    by_area: HashMap<(String, String), Vec<usize>>,
    warnings: Vec<Warning>,
}

impl CityGazetteer {
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let gazetteer = Self::from_reader(source::open(path)?)?;
        if gazetteer.is_empty() {
            return Err(GeoError::EmptyDataset(Dataset::Cities));
        }
        Ok(gazetteer)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, GeoError> {
        let mut records = Vec::new();
        let mut malformed = 0usize;

        for row in tsv_reader(input).records() {
            let row = match row {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(into_io(e)),
                Err(_) => {
                    malformed += 1;
                    continue;
                }
            };
            match parse_row(&row) {
                Some(r) => records.push(r),
                None => malformed += 1,
            }
        }

        let mut warnings = Vec::new();
        if malformed > 0 {
            warnings.push(Warning::MalformedRows { dataset: Dataset::Cities, count: malformed });
        }
        tracing::info!(cities = records.len(), malformed, "parsed city gazetteer");

        let mut gazetteer = Self::from_records(records);
        gazetteer.warnings = warnings;
        Ok(gazetteer)
    }

    pub fn from_records(mut records: Vec<CityRecord>) -> Self {
        // Stable: equal populations keep file order.
        records.sort_by(|a, b| b.population.cmp(&a.population));

        let mut by_area: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (i, r) in records.iter().enumerate() {
            by_area
                .entry((r.country_code.clone(), r.subdivision_code.clone()))
                .or_default()
                .push(i);
        }
        Self { records, by_area, warnings: Vec::new() }
    }

    fn area(&self, country_code: &str, subdivision_code: &str) -> impl Iterator<Item = &CityRecord> {
        self.by_area
            .get(&(country_code.to_string(), subdivision_code.to_string()))
            .into_iter()
            .flatten()
            .map(|&i| &self.records[i])
    }

    /// Distinct city names in the subdivision, most populous first.
    pub fn cities_in(&self, country_code: &str, subdivision_code: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.area(country_code, subdivision_code)
            .filter(|r| seen.insert(r.name.as_str()))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Exact, case-sensitive name match. Duplicates resolve to the most
    /// populous record, with a warning.
    pub fn coordinates(&self, country_code: &str, subdivision_code: &str, city_name: &str) -> Option<(f64, f64)> {
        let mut matches = self
            .area(country_code, subdivision_code)
            .filter(|r| r.name == city_name);
        let first = matches.next()?;
        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(
                city = city_name,
                country = country_code,
                subdivision = subdivision_code,
                matches = extra + 1,
                "multiple city records, using the most populous"
            );
        }
        Some((first.latitude, first.longitude))
    }

    pub fn records(&self) -> &[CityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

fn parse_row(row: &csv::StringRecord) -> Option<CityRecord> {
    if row.len() <= POPULATION_COL {
        return None;
    }
    let name = row.get(NAME_COL)?.trim();
    if name.is_empty() {
        return None;
    }
    let latitude: f64 = row.get(LAT_COL)?.trim().parse().ok()?;
    let longitude: f64 = row.get(LON_COL)?.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }
    let population = match row.get(POPULATION_COL)?.trim() {
        "" => 0,
        p => p.parse().ok()?,
    };

    Some(CityRecord {
        name: name.to_string(),
        latitude,
        longitude,
        country_code: row.get(COUNTRY_COL)?.trim().to_string(),
        subdivision_code: row.get(ADMIN1_COL)?.trim().to_string(),
        population,
    })
}
