//! Geometry join cache.
//!
//! Memoizes `join value → geometry` for the lifetime of one job. The first
//! lookup of a key issues a single exact-match query to the geography
//! provider; later lookups of the same key never reach the provider again.
//! Misses are logged once and remembered, so the provider sees one query per
//! distinct key. A failed query is logged but not remembered: the next row
//! with that key asks the provider again.
//!
//! The cache is single-threaded. A concurrent version would have to
//! deduplicate in-flight queries per key to keep that guarantee.

use std::collections::{HashMap, HashSet};

use crate::geography::{where_clause, GeographyProvider, Geometry};
use crate::logs::JobLog;

/// Outcome of resolving one join value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Geometry),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn into_geometry(self) -> Option<Geometry> {
        match self {
            Resolution::Found(g) => Some(g),
            Resolution::NotFound => None,
        }
    }
}

/// Lookup counters for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Queries issued to the provider.
    pub queries: usize,
    /// Lookups answered from memory.
    pub hits: usize,
    /// Distinct keys with no geometry.
    pub not_found: usize,
    /// Queries that failed.
    pub failures: usize,
}

/// Job-scoped memoizing resolver over a geography provider.
pub struct GeometryCache<'p> {
    provider: &'p dyn GeographyProvider,
    /// Field of the geography layer matched against join values.
    field: String,
    found: HashMap<String, Geometry>,
    missing: HashSet<String>,
    stats: CacheStats,
    log: JobLog,
}

impl<'p> GeometryCache<'p> {
    pub fn new(provider: &'p dyn GeographyProvider, field: impl Into<String>, log: JobLog) -> Self {
        Self {
            provider,
            field: field.into(),
            found: HashMap::new(),
            missing: HashSet::new(),
            stats: CacheStats::default(),
            log,
        }
    }

    /// Resolve a (post-transform) join value.
    pub fn resolve(&mut self, key: &str) -> Resolution {
        if let Some(geometry) = self.found.get(key) {
            self.stats.hits += 1;
            return Resolution::Found(geometry.clone());
        }
        if self.missing.contains(key) {
            self.stats.hits += 1;
            return Resolution::NotFound;
        }

        self.stats.queries += 1;
        match self.provider.find(&self.field, key) {
            Ok(Some(hit)) => {
                self.found.insert(key.to_string(), hit.geometry.clone());
                Resolution::Found(hit.geometry)
            }
            Ok(None) => {
                self.stats.not_found += 1;
                self.log.warning(format!(
                    "Unable to get geometry from geography layer. The where clause {} did not return results.",
                    where_clause(&self.field, key)
                ));
                self.missing.insert(key.to_string());
                Resolution::NotFound
            }
            Err(e) => {
                self.stats.failures += 1;
                self.log.warning(format!("Geometry lookup failed: {}", e));
                Resolution::NotFound
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of keys with a memoized geometry.
    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}
