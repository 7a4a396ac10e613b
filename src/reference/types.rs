//! Core types for the reference subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Axis-aligned rectangle in degrees: `[minLon, minLat, maxLon, maxLat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Returns `None` unless both extents are strictly positive.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Option<Self> {
        let valid = [min_lon, min_lat, max_lon, max_lat].iter().all(|v| v.is_finite())
            && min_lon < max_lon
            && min_lat < max_lat;
        valid.then_some(Self { min_lon, min_lat, max_lon, max_lat })
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}, {:.4}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// The single geographic filter handed to downstream event APIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoFilter {
    /// No geographic restriction.
    Global,
    BoundingBox { bbox: BBox },
    /// Box of the subdivision polygon itself.
    SubdivisionBox { bbox: BBox },
    Point { lat: f64, lon: f64, radius_km: f64 },
}

/// Requested selection depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveLevel {
    Global,
    Country,
    Subdivision,
    City,
}

impl FromStr for ResolveLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "global" | "world" => Ok(Self::Global),
            "country" => Ok(Self::Country),
            "subdivision" | "state" | "province" | "admin1" => Ok(Self::Subdivision),
            "city" => Ok(Self::City),
            other => Err(format!(
                "Unknown level '{}'. Use global, country, state or city.",
                other
            )),
        }
    }
}

/// The state a resolution actually reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    Global,
    CountrySelected,
    SubdivisionSelected,
    CitySelected,
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "Global"),
            Self::CountrySelected => write!(f, "Country"),
            Self::SubdivisionSelected => write!(f, "Subdivision"),
            Self::CitySelected => write!(f, "City"),
        }
    }
}

/// Filter plus the state it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub filter: GeoFilter,
    pub reached: SelectionState,
}

/// Which reference file a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Boundaries,
    Subdivisions,
    CountryCodes,
    Admin1,
    Cities,
    Overrides,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boundaries => write!(f, "country boundaries"),
            Self::Subdivisions => write!(f, "subdivision boundaries"),
            Self::CountryCodes => write!(f, "country codes"),
            Self::Admin1 => write!(f, "admin1 codes"),
            Self::Cities => write!(f, "cities"),
            Self::Overrides => write!(f, "name overrides"),
        }
    }
}

/// Non-fatal load-time diagnostics, surfaced to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Several records share a key; the first one is used.
    AmbiguousMatch { dataset: Dataset, key: String, count: usize },
    UnmappedCountry { display_name: String },
    OverrideUnknownBoundary { display_name: String },
    OverrideUnresolved { display_name: String, gazetteer_name: String },
    MalformedRows { dataset: Dataset, count: usize },
    DuplicateSubdivision { iso_code: String, name: String, kept_code: String, dropped_code: String },
    MissingIsoColumn { dataset: Dataset },
    SubdivisionShapesMissing,
    TableNotConfigured { dataset: Dataset },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousMatch { dataset, key, count } => {
                write!(f, "{}: '{}' appears {} times, using the first", dataset, key, count)
            }
            Self::UnmappedCountry { display_name } => {
                write!(f, "no ISO code for boundary name '{}'", display_name)
            }
            Self::OverrideUnknownBoundary { display_name } => {
                write!(f, "override key '{}' is not a boundary display name", display_name)
            }
            Self::OverrideUnresolved { display_name, gazetteer_name } => write!(
                f,
                "override '{}' -> '{}' does not resolve in the country code table",
                display_name, gazetteer_name
            ),
            Self::MalformedRows { dataset, count } => {
                write!(f, "{}: skipped {} malformed rows", dataset, count)
            }
            Self::DuplicateSubdivision { iso_code, name, kept_code, dropped_code } => write!(
                f,
                "{}: subdivision '{}' listed twice, kept code {} and dropped {}",
                iso_code, name, kept_code, dropped_code
            ),
            Self::MissingIsoColumn { dataset } => {
                write!(f, "{}: no ISO column, relying on name resolution", dataset)
            }
            Self::SubdivisionShapesMissing => write!(
                f,
                "no subdivision boundaries loaded, state filters use the country box"
            ),
            Self::TableNotConfigured { dataset } => {
                write!(f, "{} not configured, loaded as empty", dataset)
            }
        }
    }
}

/// Reference subsystem errors.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Reference file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Schema error in {dataset}: {detail}")]
    Schema { dataset: Dataset, detail: String },

    #[error("No usable rows in {0}")]
    EmptyDataset(Dataset),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Reference load did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GeoError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
