//! Resolver configuration: which reference files to load and how.
//!
//! Precedence, lowest first: defaults derived from a data directory
//! (`~/.georef/data`), an optional TOML file, command-line flags.

use crate::reference::source::is_url;
use crate::reference::GeoError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CITY_RADIUS_KM: f64 = 100.0;

pub const BOUNDARIES_FILE: &str = "ne_110m_admin_0_countries.geojson";
pub const SUBDIVISIONS_FILE: &str = "ne_10m_admin_1_states_provinces.geojson";
pub const COUNTRY_CODES_FILE: &str = "countryInfo.txt";
pub const ADMIN1_FILE: &str = "admin1CodesASCII.txt";
pub const CITIES_FILE: &str = "cities500.txt";

fn default_radius() -> f64 {
    DEFAULT_CITY_RADIUS_KM
}

/// Fully resolved set of inputs for one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Country polygons: local path or http(s) URL.
    pub boundaries: String,
    /// State / province polygons: local path or http(s) URL.
    #[serde(default)]
    pub subdivisions: Option<String>,
    pub country_codes: PathBuf,
    #[serde(default)]
    pub admin1: Option<PathBuf>,
    #[serde(default)]
    pub cities: Option<PathBuf>,
    /// Replaces the built-in override table.
    #[serde(default)]
    pub overrides: Option<PathBuf>,
    #[serde(default)]
    pub load_timeout_secs: Option<u64>,
    #[serde(default = "default_radius")]
    pub city_radius_km: f64,
}

/// On-disk config file; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub boundaries: Option<String>,
    pub subdivisions: Option<String>,
    pub country_codes: Option<PathBuf>,
    pub admin1: Option<PathBuf>,
    pub cities: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
    pub load_timeout_secs: Option<u64>,
    pub city_radius_km: Option<f64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GeoError::FileNotFound(path.to_path_buf()),
            _ => GeoError::Io(e),
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, GeoError> {
        toml::from_str(text).map_err(|e| GeoError::Config(e.to_string()))
    }
}

impl ResolverConfig {
    /// `~/.georef/data`, or `./.georef/data` without a home directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".georef")
            .join("data")
    }

    /// Conventional file names inside `dir`. Optional tables are only
    /// referenced if their file exists.
    pub fn from_data_dir(dir: &Path) -> Self {
        let existing = |name: &str| Some(dir.join(name)).filter(|p| p.exists());
        Self {
            boundaries: dir.join(BOUNDARIES_FILE).to_string_lossy().into_owned(),
            subdivisions: existing(SUBDIVISIONS_FILE).map(|p| p.to_string_lossy().into_owned()),
            country_codes: dir.join(COUNTRY_CODES_FILE),
            admin1: existing(ADMIN1_FILE),
            cities: existing(CITIES_FILE),
            overrides: None,
            load_timeout_secs: None,
            city_radius_km: DEFAULT_CITY_RADIUS_KM,
        }
    }

    /// Build from an optional config file plus the command-line overrides
    /// (`--data-dir` wins over the file's `data_dir`, `--timeout` over its
    /// `load_timeout_secs`).
    pub fn resolve(
        file: Option<&ConfigFile>,
        data_dir: Option<&Path>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, GeoError> {
        let empty = ConfigFile::default();
        let file = file.unwrap_or(&empty);

        let base = data_dir
            .map(Path::to_path_buf)
            .or_else(|| file.data_dir.clone())
            .unwrap_or_else(Self::default_data_dir);

        let mut cfg = Self::from_data_dir(&base);
        if let Some(b) = &file.boundaries {
            cfg.boundaries = location_in(&base, b);
        }
        if let Some(s) = &file.subdivisions {
            cfg.subdivisions = Some(location_in(&base, s));
        }
        if let Some(p) = &file.country_codes {
            cfg.country_codes = base.join(p);
        }
        if let Some(p) = &file.admin1 {
            cfg.admin1 = Some(base.join(p));
        }
        if let Some(p) = &file.cities {
            cfg.cities = Some(base.join(p));
        }
        if let Some(p) = &file.overrides {
            cfg.overrides = Some(base.join(p));
        }
        if file.load_timeout_secs.is_some() {
            cfg.load_timeout_secs = file.load_timeout_secs;
        }
        if let Some(r) = file.city_radius_km {
            cfg.city_radius_km = r;
        }
        if timeout_secs.is_some() {
            cfg.load_timeout_secs = timeout_secs;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        if self.boundaries.trim().is_empty() {
            return Err(GeoError::Config("boundaries location is empty".into()));
        }
        if !(self.city_radius_km.is_finite() && self.city_radius_km > 0.0) {
            return Err(GeoError::Config(format!(
                "city_radius_km must be positive, got {}",
                self.city_radius_km
            )));
        }
        if self.load_timeout_secs == Some(0) {
            return Err(GeoError::Config("load_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Joins relative paths onto `base`; absolute paths and URLs pass through.
fn location_in(base: &Path, location: &str) -> String {
    if is_url(location) {
        location.to_string()
    } else {
        base.join(location).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_data_dir() {
        let dir = TempDir::new().unwrap();
        let cfg = ResolverConfig::from_data_dir(dir.path());
        assert!(cfg.boundaries.ends_with(BOUNDARIES_FILE));
        assert_eq!(cfg.country_codes, dir.path().join(COUNTRY_CODES_FILE));
        assert_eq!(cfg.subdivisions, None);
        assert_eq!(cfg.admin1, None);
        assert_eq!(cfg.cities, None);
        assert_eq!(cfg.city_radius_km, DEFAULT_CITY_RADIUS_KM);
    }

    #[test]
    fn test_optional_tables_picked_up_when_present() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SUBDIVISIONS_FILE), "{}").unwrap();
        fs::write(dir.path().join(ADMIN1_FILE), "").unwrap();
        let cfg = ResolverConfig::from_data_dir(dir.path());
        assert!(cfg.subdivisions.unwrap().ends_with(SUBDIVISIONS_FILE));
        assert_eq!(cfg.admin1, Some(dir.path().join(ADMIN1_FILE)));
        assert_eq!(cfg.cities, None);
    }

    #[test]
    fn test_file_overlays_defaults() {
        let file = ConfigFile::parse(
            r#"
            data_dir = "/srv/geo"
            boundaries = "https://example.org/countries.geojson"
            cities = "cities15000.txt"
            city_radius_km = 25.0
            load_timeout_secs = 30
            "#,
        )
        .unwrap();
        let cfg = ResolverConfig::resolve(Some(&file), None, None).unwrap();
        assert_eq!(cfg.boundaries, "https://example.org/countries.geojson");
        assert_eq!(cfg.cities, Some(PathBuf::from("/srv/geo/cities15000.txt")));
        assert_eq!(cfg.country_codes, PathBuf::from("/srv/geo").join(COUNTRY_CODES_FILE));
        assert_eq!(cfg.city_radius_km, 25.0);
        assert_eq!(cfg.load_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_cli_data_dir_wins_over_file() {
        let file = ConfigFile::parse(r#"data_dir = "/srv/geo""#).unwrap();
        let cfg = ResolverConfig::resolve(Some(&file), Some(Path::new("/opt/ref")), None).unwrap();
        assert_eq!(cfg.country_codes, PathBuf::from("/opt/ref").join(COUNTRY_CODES_FILE));
    }

    #[test]
    fn test_timeout_flag_overrides_file() {
        let file = ConfigFile::parse("load_timeout_secs = 30").unwrap();
        let dir = Some(Path::new("/x"));
        let cfg = ResolverConfig::resolve(Some(&file), dir, Some(5)).unwrap();
        assert_eq!(cfg.load_timeout(), Some(Duration::from_secs(5)));
        let cfg = ResolverConfig::resolve(Some(&file), dir, None).unwrap();
        assert_eq!(cfg.load_timeout(), Some(Duration::from_secs(30)));
        assert!(matches!(ResolverConfig::resolve(None, dir, Some(0)), Err(GeoError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = ConfigFile::parse("city_radius_km = -1.0").unwrap();
        assert!(matches!(
            ResolverConfig::resolve(Some(&file), Some(Path::new("/x")), None),
            Err(GeoError::Config(_))
        ));
        assert!(matches!(ConfigFile::parse("unknown_key = 1"), Err(GeoError::Config(_))));
    }
}
