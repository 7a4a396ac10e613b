//! Process-lifetime cache of the loaded reference data.
//!
//! The first `load_all` parses every file; concurrent callers block on the
//! same slot and share the result. A failed load leaves the slot empty so
//! the next call retries from scratch.

use super::resolver::{self, GeoResolver};
use super::types::{Dataset, GeoError};
use crate::config::ResolverConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How many times each file was parsed.
#[derive(Debug, Default)]
pub struct ParseCounters {
    boundaries: AtomicUsize,
    subdivisions: AtomicUsize,
    country_codes: AtomicUsize,
    admin1: AtomicUsize,
    cities: AtomicUsize,
}

impl ParseCounters {
    fn counter(&self, dataset: Dataset) -> Option<&AtomicUsize> {
        match dataset {
            Dataset::Boundaries => Some(&self.boundaries),
            Dataset::Subdivisions => Some(&self.subdivisions),
            Dataset::CountryCodes => Some(&self.country_codes),
            Dataset::Admin1 => Some(&self.admin1),
            Dataset::Cities => Some(&self.cities),
            Dataset::Overrides => None,
        }
    }

    pub(crate) fn record(&self, dataset: Dataset) {
        if let Some(c) = self.counter(dataset) {
            c.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn get(&self, dataset: Dataset) -> usize {
        self.counter(dataset).map_or(0, |c| c.load(Ordering::SeqCst))
    }
}

pub struct ReferenceCache {
    config: ResolverConfig,
    slot: Mutex<Option<Arc<GeoResolver>>>,
    counters: Arc<ParseCounters>,
}

impl ReferenceCache {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
            counters: Arc::new(ParseCounters::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<GeoResolver>>> {
        // The slot only ever holds a complete resolver or nothing.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load once, then serve from memory.
    pub fn load_all(&self) -> Result<Arc<GeoResolver>, GeoError> {
        let mut slot = self.lock();
        if let Some(resolver) = slot.as_ref() {
            tracing::debug!("reference cache hit");
            return Ok(Arc::clone(resolver));
        }

        tracing::debug!("reference cache miss, loading");
        match resolver::load_with_deadline(&self.config, Arc::clone(&self.counters)) {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                *slot = Some(Arc::clone(&loaded));
                Ok(loaded)
            }
            Err(e) => {
                tracing::error!(error = %e, "reference load failed");
                Err(e)
            }
        }
    }

    /// The cached resolver, without triggering a load.
    pub fn get(&self) -> Option<Arc<GeoResolver>> {
        self.lock().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    pub fn parse_count(&self, dataset: Dataset) -> usize {
        self.counters.get(dataset)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}
