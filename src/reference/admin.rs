//! Admin1 gazetteer: `"<ISO>.<CODE>\t<name>\t..."` grouped per country.

use super::country_codes::{into_io, tsv_reader};
use super::source;
use super::types::{Dataset, GeoError, Warning};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

/// ISO code → subdivision name → subdivision code.
///
/// Names keep the first code seen; later duplicates are reported, not merged.
#[derive(Debug, Clone, Default)]
pub struct AdminHierarchyTable {
    countries: HashMap<String, BTreeMap<String, String>>,
    warnings: Vec<Warning>,
}

impl AdminHierarchyTable {
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let table = Self::from_reader(source::open(path)?)?;
        if table.is_empty() {
            return Err(GeoError::EmptyDataset(Dataset::Admin1));
        }
        Ok(table)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, GeoError> {
        let mut countries: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        let mut warnings = Vec::new();
        let mut skipped = 0usize;

        for row in tsv_reader(input).records() {
            let row = match row {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(into_io(e)),
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            let (Some(full_code), Some(name)) = (row.get(0), row.get(1).map(str::trim)) else {
                skipped += 1;
                continue;
            };
            let Some((iso, code)) = full_code.trim().split_once('.') else {
                skipped += 1;
                continue;
            };
            if name.is_empty() {
                skipped += 1;
                continue;
            }

            let names = countries.entry(iso.to_string()).or_default();
            match names.get(name) {
                Some(kept) => warnings.push(Warning::DuplicateSubdivision {
                    iso_code: iso.to_string(),
                    name: name.to_string(),
                    kept_code: kept.clone(),
                    dropped_code: code.to_string(),
                }),
                None => {
                    names.insert(name.to_string(), code.to_string());
                }
            }
        }

        if skipped > 0 {
            warnings.push(Warning::MalformedRows { dataset: Dataset::Admin1, count: skipped });
        }
        tracing::info!(countries = countries.len(), skipped, "parsed admin1 codes");
        Ok(Self { countries, warnings })
    }

    /// Sorted subdivision names; empty when the country is unknown.
    pub fn names_for(&self, iso_code: &str) -> Vec<&str> {
        self.countries
            .get(iso_code)
            .map(|names| names.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn code_for(&self, iso_code: &str, name: &str) -> Option<&str> {
        self.countries.get(iso_code)?.get(name).map(String::as_str)
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
