//! The GeoResolver facade: one hierarchical query API over every store.
//!
//! Selection flow:  Global → Country → Subdivision → City
//! Each step needs the previous one plus its own lookup; a failed step keeps
//! the filter of the last state reached.

use super::admin::AdminHierarchyTable;
use super::boundary::BoundaryStore;
use super::cache::ParseCounters;
use super::cities::CityGazetteer;
use super::country_codes::CountryCodeTable;
use super::names::{NameResolver, OverrideTable, ResolvedNameMap};
use super::subdivision::SubdivisionShapeStore;
use super::types::{BBox, Dataset, GeoError, GeoFilter, Resolution, ResolveLevel, SelectionState, Warning};
use crate::config::{ResolverConfig, DEFAULT_CITY_RADIUS_KM};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

const FETCH_GRACE: Duration = Duration::from_secs(1);

/// Everything the facade is built from. Lets tests assemble a resolver
/// from in-memory fixtures.
pub struct ReferenceParts {
    pub boundaries: BoundaryStore,
    pub subdivisions: Option<SubdivisionShapeStore>,
    pub codes: CountryCodeTable,
    pub overrides: OverrideTable,
    pub admin: Option<AdminHierarchyTable>,
    pub cities: Option<CityGazetteer>,
    pub city_radius_km: f64,
}

/// What was loaded, for operators.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub loaded_at: DateTime<Utc>,
    pub elapsed_ms: f64,
    pub countries: usize,
    pub mapped_countries: usize,
    pub unmapped_countries: usize,
    pub subdivision_shapes: Option<usize>,
    pub admin1_countries: usize,
    pub cities: usize,
    pub override_version: u32,
    pub warnings: Vec<Warning>,
}

pub struct GeoResolver {
    boundaries: BoundaryStore,
    subdivisions: Option<SubdivisionShapeStore>,
    names: ResolvedNameMap,
    unmapped: Vec<String>,
    admin: AdminHierarchyTable,
    cities: CityGazetteer,
    city_radius_km: f64,
    report: LoadReport,
}

impl GeoResolver {
    /// Load every configured reference file and build the resolver.
    /// Uncached; see `ReferenceCache` for load-once semantics.
    pub fn load(config: &ResolverConfig) -> Result<(Self, Vec<Warning>), GeoError> {
        let resolver = load_with_deadline(config, Arc::new(ParseCounters::default()))?;
        let warnings = resolver.warnings().to_vec();
        Ok((resolver, warnings))
    }

    pub fn from_parts(parts: ReferenceParts) -> Self {
        let ReferenceParts { boundaries, subdivisions, codes, overrides, admin, cities, city_radius_km } = parts;

        let mut warnings: Vec<Warning> = Vec::new();
        warnings.extend_from_slice(boundaries.warnings());
        warnings.extend_from_slice(codes.warnings());

        let resolution = NameResolver::build(boundaries.boundaries(), &codes, &overrides);
        warnings.extend(resolution.warnings);

        match &subdivisions {
            Some(s) => warnings.extend_from_slice(s.warnings()),
            None => warnings.push(Warning::SubdivisionShapesMissing),
        }

        let admin = match admin {
            Some(a) => {
                warnings.extend_from_slice(a.warnings());
                a
            }
            None => {
                warnings.push(Warning::TableNotConfigured { dataset: Dataset::Admin1 });
                AdminHierarchyTable::default()
            }
        };
        let cities = match cities {
            Some(c) => {
                warnings.extend_from_slice(c.warnings());
                c
            }
            None => {
                warnings.push(Warning::TableNotConfigured { dataset: Dataset::Cities });
                CityGazetteer::default()
            }
        };

        for w in &warnings {
            tracing::warn!("{}", w);
        }

        let report = LoadReport {
            loaded_at: Utc::now(),
            elapsed_ms: 0.0,
            countries: boundaries.list().len(),
            mapped_countries: resolution.map.len(),
            unmapped_countries: resolution.unmapped.len(),
            subdivision_shapes: subdivisions.as_ref().map(SubdivisionShapeStore::len),
            admin1_countries: admin.country_count(),
            cities: cities.len(),
            override_version: overrides.version,
            warnings,
        };

        Self {
            boundaries,
            subdivisions,
            names: resolution.map,
            unmapped: resolution.unmapped,
            admin,
            cities,
            city_radius_km: if city_radius_km > 0.0 { city_radius_km } else { DEFAULT_CITY_RADIUS_KM },
            report,
        }
    }

    // ─── Hierarchy ───────────────────────────────────────────────

    /// Boundary display names, sorted.
    pub fn countries(&self) -> Vec<&str> {
        self.boundaries.list()
    }

    pub fn iso_code_for(&self, display_name: &str) -> Option<&str> {
        self.names.get(display_name)
    }

    /// `iso_code_for`, with an unmapped name as `NotFound`.
    pub fn require_iso(&self, display_name: &str) -> Result<&str, GeoError> {
        self.iso_code_for(display_name)
            .ok_or_else(|| GeoError::not_found(format!("ISO code for country '{}'", display_name)))
    }

    pub fn require_subdivision_code(&self, iso_code: &str, name: &str) -> Result<&str, GeoError> {
        self.subdivision_code(iso_code, name)
            .ok_or_else(|| GeoError::not_found(format!("subdivision '{}' in {}", name, iso_code)))
    }

    pub fn name_map(&self) -> &ResolvedNameMap {
        &self.names
    }

    /// Boundary names the name map could not resolve.
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    pub fn subdivisions_of(&self, iso_code: &str) -> Vec<&str> {
        self.admin.names_for(iso_code)
    }

    pub fn subdivision_code(&self, iso_code: &str, name: &str) -> Option<&str> {
        self.admin.code_for(iso_code, name)
    }

    pub fn cities_in(&self, iso_code: &str, subdivision_code: &str) -> Vec<&str> {
        self.cities.cities_in(iso_code, subdivision_code)
    }

    // ─── Geometry ────────────────────────────────────────────────

    pub fn bounds_for_country(&self, display_name: &str) -> Result<BBox, GeoError> {
        self.boundaries.bounds_for(display_name)
    }

    pub fn bounds_for_subdivision(&self, iso_code: &str, name: &str) -> Result<BBox, GeoError> {
        match &self.subdivisions {
            Some(s) => s.bounds_for(iso_code, name),
            None => Err(GeoError::not_found("subdivision boundaries (none loaded)")),
        }
    }

    pub fn city_coordinates(&self, iso_code: &str, subdivision_code: &str, name: &str) -> Result<(f64, f64), GeoError> {
        self.cities
            .coordinates(iso_code, subdivision_code, name)
            .ok_or_else(|| GeoError::not_found(format!("city '{}' in {}.{}", name, iso_code, subdivision_code)))
    }

    pub fn has_subdivision_shapes(&self) -> bool {
        self.subdivisions.is_some()
    }

    // ─── Resolution ──────────────────────────────────────────────

    pub fn resolve(
        &self,
        level: ResolveLevel,
        country: &str,
        subdivision: Option<&str>,
        city: Option<&str>,
    ) -> GeoFilter {
        self.resolve_detailed(level, country, subdivision, city).filter
    }

    /// Like `resolve`, also reporting the state reached.
    pub fn resolve_detailed(
        &self,
        level: ResolveLevel,
        country: &str,
        subdivision: Option<&str>,
        city: Option<&str>,
    ) -> Resolution {
        let global = Resolution { filter: GeoFilter::Global, reached: SelectionState::Global };
        if level == ResolveLevel::Global {
            return global;
        }

        let Ok(country_box) = self.boundaries.bounds_for(country) else {
            return global;
        };
        let country_state = Resolution {
            filter: GeoFilter::BoundingBox { bbox: country_box },
            reached: SelectionState::CountrySelected,
        };
        if level == ResolveLevel::Country {
            return country_state;
        }

        let (Some(iso), Some(sub_name)) = (self.names.get(country), subdivision) else {
            return country_state;
        };
        let sub_filter = match self.subdivisions.as_ref().map(|s| s.bounds_for(iso, sub_name)) {
            Some(Ok(bbox)) => GeoFilter::SubdivisionBox { bbox },
            _ => GeoFilter::BoundingBox { bbox: country_box },
        };
        let sub_state = Resolution { filter: sub_filter, reached: SelectionState::SubdivisionSelected };
        if level == ResolveLevel::Subdivision {
            return sub_state;
        }

        let (Some(code), Some(city_name)) = (self.admin.code_for(iso, sub_name), city) else {
            return sub_state;
        };
        match self.cities.coordinates(iso, code, city_name) {
            Some((lat, lon)) => Resolution {
                filter: GeoFilter::Point { lat, lon, radius_km: self.city_radius_km },
                reached: SelectionState::CitySelected,
            },
            None => sub_state,
        }
    }

    // ─── Diagnostics ─────────────────────────────────────────────

    pub fn warnings(&self) -> &[Warning] {
        &self.report.warnings
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Load all stores, concurrently. Boundaries and country codes must both
/// finish before the name map is built.
pub(crate) fn load_now(config: &ResolverConfig, counters: &ParseCounters) -> Result<GeoResolver, GeoError> {
    let started = Instant::now();
    // The caller's deadline fires first; the fetch timeout only reaps the
    // detached worker.
    let timeout = config.load_timeout().map(|t| t + FETCH_GRACE);

    let parts = thread::scope(|s| -> Result<ReferenceParts, GeoError> {
        let boundaries = s.spawn(|| {
            counters.record(Dataset::Boundaries);
            BoundaryStore::load(&config.boundaries, timeout)
        });
        let codes = s.spawn(|| {
            counters.record(Dataset::CountryCodes);
            CountryCodeTable::load(&config.country_codes)
        });
        let subdivisions = s.spawn(|| {
            config
                .subdivisions
                .as_deref()
                .map(|loc| {
                    counters.record(Dataset::Subdivisions);
                    SubdivisionShapeStore::load(loc, timeout)
                })
                .transpose()
        });
        let admin = s.spawn(|| {
            config
                .admin1
                .as_deref()
                .map(|p| {
                    counters.record(Dataset::Admin1);
                    AdminHierarchyTable::load(p)
                })
                .transpose()
        });
        let cities = s.spawn(|| {
            config
                .cities
                .as_deref()
                .map(|p| {
                    counters.record(Dataset::Cities);
                    CityGazetteer::load(p)
                })
                .transpose()
        });

        let overrides = match &config.overrides {
            Some(p) => OverrideTable::load(p)?,
            None => OverrideTable::builtin()?,
        };

        Ok(ReferenceParts {
            boundaries: join_store(boundaries)?,
            codes: join_store(codes)?,
            subdivisions: join_store(subdivisions)?,
            admin: join_store(admin)?,
            cities: join_store(cities)?,
            overrides,
            city_radius_km: config.city_radius_km,
        })
    })?;

    let mut resolver = GeoResolver::from_parts(parts);
    resolver.report.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        countries = resolver.report.countries,
        cities = resolver.report.cities,
        warnings = resolver.report.warnings.len(),
        elapsed_ms = resolver.report.elapsed_ms,
        "reference data loaded"
    );
    Ok(resolver)
}

fn join_store<T>(handle: thread::ScopedJoinHandle<'_, Result<T, GeoError>>) -> Result<T, GeoError> {
    handle.join().unwrap_or_else(|p| std::panic::resume_unwind(p))
}

/// `load_now` bounded by the configured timeout. On expiry the worker's
/// eventual result is discarded.
pub(crate) fn load_with_deadline(config: &ResolverConfig, counters: Arc<ParseCounters>) -> Result<GeoResolver, GeoError> {
    let Some(timeout) = config.load_timeout() else {
        return load_now(config, &counters);
    };

    let (tx, rx) = mpsc::channel();
    let cfg = config.clone();
    thread::Builder::new()
        .name("georef-load".into())
        .spawn(move || {
            let _ = tx.send(load_now(&cfg, &counters));
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::error!(?timeout, "reference load timed out");
            Err(GeoError::Timeout(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(GeoError::Io(std::io::Error::other(
            "reference loader exited without a result",
        ))),
    }
}
