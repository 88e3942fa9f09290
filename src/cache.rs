//! LRU cache of analysis results
//!
//! Results are keyed by a content hash of the samples, the sample rate and
//! the serialized configuration, so identical requests skip the pipeline.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::{analyze, AnalysisResult};
use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

/// Cached result with the request shape it was computed for
struct CacheEntry {
    n_samples: usize,
    sample_rate: u32,
    result: AnalysisResult,
}

/// Bounded cache in front of [`analyze`]
///
/// A hit must match the hashed key and also the buffer length and sample
/// rate, so a key collision between different requests reanalyses instead of
/// returning the other request's result.
pub struct AnalysisCache {
    entries: LruCache<u64, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl AnalysisCache {
    /// Cache holding at most `capacity` results (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached result for this request, analysing on a miss
    ///
    /// # Errors
    ///
    /// Propagates errors from [`analyze`]; failed analyses are not cached.
    pub fn analyze(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        config: &AnalysisConfig,
    ) -> Result<AnalysisResult, AnalysisError> {
        let key = cache_key(samples, sample_rate, config)?;
        match self.entries.get(&key) {
            Some(entry) if entry.n_samples == samples.len() && entry.sample_rate == sample_rate => {
                self.hits += 1;
                log::debug!("Analysis cache hit ({:016x})", key);
                return Ok(entry.result.clone());
            }
            Some(_) => log::warn!("Analysis cache key collision ({:016x}), reanalysing", key),
            None => {}
        }

        self.misses += 1;
        let result = analyze(samples, sample_rate, config)?;
        self.entries.put(
            key,
            CacheEntry {
                n_samples: samples.len(),
                sample_rate,
                result: result.clone(),
            },
        );
        Ok(result)
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Drop every cached result
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Content hash of a request
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the configuration cannot be
/// serialized.
pub fn cache_key(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<u64, AnalysisError> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| AnalysisError::ProcessingError(format!("Cannot serialize config: {}", e)))?;

    let mut hasher = DefaultHasher::new();
    samples.len().hash(&mut hasher);
    for s in samples {
        s.to_bits().hash(&mut hasher);
    }
    sample_rate.hash(&mut hasher);
    config_json.hash(&mut hasher);
    Ok(hasher.finish())
}
