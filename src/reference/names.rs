//! Boundary display name → ISO code reconciliation.
//!
//! Order per display name: override → code table, exact name → code table,
//! the boundary's own ISO attribute (if the code table knows it), else
//! unmapped. A name with an override entry only ever resolves through it.
//! Building never fails; unresolved names are reported.

use super::boundary::CountryBoundary;
use super::country_codes::CountryCodeTable;
use super::source;
use super::types::{Dataset, GeoError, Warning};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

const BUILTIN_OVERRIDES: &str = include_str!("../../data/overrides.toml");

/// Curated `boundary display name → gazetteer name` exceptions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideTable {
    pub version: u32,
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl OverrideTable {
    /// The table shipped in `data/overrides.toml`.
    pub fn builtin() -> Result<Self, GeoError> {
        Self::parse(BUILTIN_OVERRIDES)
    }

    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let text = source::read_text(&path.to_string_lossy(), None)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, GeoError> {
        toml::from_str(text).map_err(|e| GeoError::Config(format!("{}: {}", Dataset::Overrides, e)))
    }

    pub fn from_pairs<I, K, V>(version: u32, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            version,
            overrides: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, display_name: &str) -> Option<&str> {
        self.overrides.get(display_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Which step produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Override,
    ExactName,
    BoundaryAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedName {
    pub iso_code: String,
    pub source: MatchSource,
}

/// Immutable `display name → ISO code` map.
#[derive(Debug, Clone, Default)]
pub struct ResolvedNameMap {
    entries: HashMap<String, ResolvedName>,
}

impl ResolvedNameMap {
    pub fn get(&self, display_name: &str) -> Option<&str> {
        self.entries.get(display_name).map(|r| r.iso_code.as_str())
    }

    pub fn entry(&self, display_name: &str) -> Option<&ResolvedName> {
        self.entries.get(display_name)
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.entries.contains_key(display_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by display name.
    pub fn sorted(&self) -> Vec<(&str, &ResolvedName)> {
        let mut v: Vec<_> = self.entries.iter().map(|(k, r)| (k.as_str(), r)).collect();
        v.sort_by(|a, b| a.0.cmp(b.0));
        v
    }
}

/// Output of a build: the map plus everything that did not make it in.
#[derive(Debug, Clone, Default)]
pub struct NameResolution {
    pub map: ResolvedNameMap,
    /// Distinct display names without a code, in boundary order.
    pub unmapped: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub struct NameResolver;

impl NameResolver {
    pub fn build(
        boundaries: &[CountryBoundary],
        codes: &CountryCodeTable,
        overrides: &OverrideTable,
    ) -> NameResolution {
        let names: HashSet<&str> = boundaries.iter().map(|b| b.display_name.as_str()).collect();
        let mut warnings = Vec::new();

        for (display_name, gazetteer_name) in &overrides.overrides {
            if !names.contains(display_name.as_str()) {
                warnings.push(Warning::OverrideUnknownBoundary { display_name: display_name.clone() });
            }
            if codes.code_for(gazetteer_name).is_none() {
                warnings.push(Warning::OverrideUnresolved {
                    display_name: display_name.clone(),
                    gazetteer_name: gazetteer_name.clone(),
                });
            }
        }

        let mut entries = HashMap::with_capacity(names.len());
        let mut unmapped = Vec::new();
        let mut seen = HashSet::with_capacity(names.len());

        for b in boundaries {
            if !seen.insert(b.display_name.as_str()) {
                continue;
            }
            match resolve_one(b, codes, overrides) {
                Some(resolved) => {
                    entries.insert(b.display_name.clone(), resolved);
                }
                None => {
                    unmapped.push(b.display_name.clone());
                    warnings.push(Warning::UnmappedCountry { display_name: b.display_name.clone() });
                }
            }
        }

        tracing::info!(
            mapped = entries.len(),
            unmapped = unmapped.len(),
            overrides = overrides.len(),
            override_version = overrides.version,
            "built country name map"
        );

        NameResolution { map: ResolvedNameMap { entries }, unmapped, warnings }
    }
}

fn resolve_one(b: &CountryBoundary, codes: &CountryCodeTable, overrides: &OverrideTable) -> Option<ResolvedName> {
    let hit = |iso_code: &str, source| Some(ResolvedName { iso_code: iso_code.to_string(), source });

    if let Some(gazetteer_name) = overrides.get(&b.display_name) {
        return codes.code_for(gazetteer_name).and_then(|code| hit(code, MatchSource::Override));
    }
    if let Some(code) = codes.code_for(&b.display_name) {
        return hit(code, MatchSource::ExactName);
    }
    match b.iso_code.as_deref() {
        Some(code) if codes.contains_code(code) => hit(code, MatchSource::BoundaryAttribute),
        _ => None,
    }
}
