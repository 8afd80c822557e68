//! Feature-name to column-identifier mapping.
//!
//! Pipelines generate feature names such as
//! `Mean_Nuclei_Intensity_IntegratedIntensityEdge_OrigBlue` that can exceed
//! the identifier limit of the target database. [`NameMapper`] assigns every
//! registered feature name a column identifier that is
//!
//! - at most `max_len` characters,
//! - distinct from every other registered name's identifier, and
//! - stable: once assigned it never changes for the mapper's lifetime.
//!
//! # Shortening
//!
//! ```text
//! name > max_len ──► thin: drop lowercase vowels, then lowercase consonants,
//!                    │      then uppercase letters, scanning right to left
//!                    ├─ fits and unused ──► done
//!                    └─ otherwise ──► delete random characters from the
//!                                     original until it fits and is unused
//!                                     (bounded by max_attempts)
//! ```
//!
//! Scanning from the end thins the most specific trailing segment first,
//! keeping the object-class prefix readable.

use mx_common::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Default bound on column identifiers.
pub const DEFAULT_MAX_LEN: usize = 64;

/// Default number of randomized attempts per name.
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

fn is_lower_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_lower_consonant(c: char) -> bool {
    c.is_ascii_lowercase() && !is_lower_vowel(c)
}

fn is_upper(c: char) -> bool {
    c.is_ascii_uppercase()
}

/// Remove up to `excess` characters from `name`, in three right-to-left
/// passes: lowercase vowels, lowercase consonants, uppercase letters.
///
/// The result can still be longer than intended when the name is mostly
/// digits and punctuation.
pub fn thin_name(name: &str, excess: usize) -> String {
    let mut chars: Vec<char> = name.chars().collect();
    let mut removed = 0;
    let passes: [fn(char) -> bool; 3] = [is_lower_vowel, is_lower_consonant, is_upper];
    for in_class in passes {
        let mut i = chars.len();
        while i > 0 && removed < excess {
            i -= 1;
            if in_class(chars[i]) {
                chars.remove(i);
                removed += 1;
            }
        }
        if removed == excess {
            break;
        }
    }
    chars.into_iter().collect()
}

/// Registry assigning bounded, collision-free column identifiers.
///
/// Resolution is lazy: identifiers are computed on the first
/// [`resolve`](Self::resolve) after a registration and memoized until the
/// next new registration. Already-assigned identifiers are never
/// recomputed.
pub struct NameMapper<R = StdRng> {
    max_len: usize,
    max_attempts: usize,
    rng: R,
    /// Registered names in registration order.
    names: Vec<String>,
    registered: HashSet<String>,
    /// Feature name → identifier for every resolved name.
    mapping: HashMap<String, String>,
    /// Identifiers handed out so far.
    assigned: HashSet<String>,
    mapped: bool,
}

impl NameMapper<StdRng> {
    /// Mapper with OS-seeded randomness for the fallback shortening.
    pub fn new(max_len: usize) -> Self {
        Self::with_rng(max_len, StdRng::from_os_rng())
    }

    /// Mapper whose fallback shortening is reproducible.
    pub fn with_seed(max_len: usize, seed: u64) -> Self {
        Self::with_rng(max_len, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NameMapper<R> {
    pub fn with_rng(max_len: usize, rng: R) -> Self {
        Self {
            max_len,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rng,
            names: Vec::new(),
            registered: HashSet::new(),
            mapping: HashMap::new(),
            assigned: HashSet::new(),
            mapped: true,
        }
    }

    /// Cap on randomized attempts per name before giving up.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Record a feature name. Registering the same name twice is a no-op.
    pub fn register(&mut self, feature_name: impl Into<String>) {
        let name = feature_name.into();
        if self.registered.insert(name.clone()) {
            self.names.push(name);
            self.mapped = false;
        }
    }

    pub fn is_registered(&self, feature_name: &str) -> bool {
        self.registered.contains(feature_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column identifier for a registered feature name.
    pub fn resolve(&mut self, feature_name: &str) -> Result<&str> {
        self.map_pending()?;
        self.mapping
            .get(feature_name)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownFeature(feature_name.to_string()))
    }

    /// Assign identifiers to every name registered since the last mapping.
    pub fn map_pending(&mut self) -> Result<()> {
        if self.mapped {
            return Ok(());
        }
        let pending: Vec<String> = self
            .names
            .iter()
            .filter(|n| !self.mapping.contains_key(*n))
            .cloned()
            .collect();

        // Names that already fit claim themselves before any shortened
        // name can take their spelling.
        let mut deferred = Vec::new();
        for name in &pending {
            if name.chars().count() <= self.max_len {
                if self.assigned.contains(name) {
                    deferred.push(name.clone());
                } else {
                    self.assign(name.clone(), name.clone());
                }
            }
        }

        let max_len = self.max_len;
        for name in pending.iter().filter(|n| n.chars().count() > max_len) {
            let excess = name.chars().count() - max_len;
            let thinned = thin_name(name, excess);
            if thinned.chars().count() <= max_len && !self.assigned.contains(&thinned) {
                debug!(feature = %name, column = %thinned, "shortened column name");
                self.assign(name.clone(), thinned);
            } else {
                let column = self.randomized(name, 0)?;
                warn!(
                    feature = %name,
                    column = %column,
                    "column name collided after shortening; used random deletion"
                );
                self.assign(name.clone(), column);
            }
        }

        for name in deferred {
            let column = self.randomized(&name, 1)?;
            warn!(
                feature = %name,
                column = %column,
                "column name already taken; used random deletion"
            );
            self.assign(name, column);
        }

        self.mapped = true;
        Ok(())
    }

    /// Resolve everything and hand back an immutable map for the run.
    pub fn freeze(mut self) -> Result<ColumnNameMap> {
        self.map_pending()?;
        Ok(ColumnNameMap {
            max_len: self.max_len,
            mapping: self.mapping,
        })
    }

    fn assign(&mut self, feature_name: String, column: String) {
        self.assigned.insert(column.clone());
        self.mapping.insert(feature_name, column);
    }

    /// Delete uniformly random characters from `original` until it fits
    /// (and at least `min_deletions` are gone), retrying while the result
    /// is taken.
    fn randomized(&mut self, original: &str, min_deletions: usize) -> Result<String> {
        let chars: Vec<char> = original.chars().collect();
        let target = self.max_len.min(chars.len().saturating_sub(min_deletions));
        for _ in 0..self.max_attempts {
            let mut candidate = chars.clone();
            while candidate.len() > target {
                let index = self.rng.random_range(0..candidate.len());
                candidate.remove(index);
            }
            let candidate: String = candidate.into_iter().collect();
            if !candidate.is_empty() && !self.assigned.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(Error::NameCollision {
            feature: original.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Frozen feature-name to identifier map, shared read-only for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnNameMap {
    max_len: usize,
    mapping: HashMap<String, String>,
}

impl ColumnNameMap {
    pub fn get(&self, feature_name: &str) -> Option<&str> {
        self.mapping.get(feature_name).map(String::as_str)
    }

    pub fn resolve(&self, feature_name: &str) -> Result<&str> {
        self.get(feature_name)
            .ok_or_else(|| Error::UnknownFeature(feature_name.to_string()))
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// (feature name, identifier) pairs sorted by feature name.
    pub fn sorted_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self
            .mapping
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}
