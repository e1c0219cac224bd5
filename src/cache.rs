//! Per-session cache of loaded stylesheets and resolved classes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::styles::StyleDeclarations;
use crate::variables::VariableTable;

/// Outcome of resolving one base utility
#[derive(Debug, Clone, PartialEq)]
pub enum ClassResolution {
    /// The compiler emitted a rule; the declarations may be empty
    Resolved(StyleDeclarations),
    /// No rule for this class
    NotFound,
}

/// Everything derived from one stylesheet path
#[derive(Debug)]
pub struct CachedStylesheet {
    /// Stylesheet source with imports inlined
    pub source: String,
    /// Theme variables of the zero-class compile plus theme overrides
    pub variables: VariableTable,
    /// Cache generation this entry was computed in
    pub generation: u64,
    resolved: RwLock<HashMap<String, ClassResolution>>,
}

impl CachedStylesheet {
    pub fn new(source: String, variables: VariableTable, generation: u64) -> Self {
        Self {
            source,
            variables,
            generation,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    pub fn memoized(&self, class: &str) -> Option<ClassResolution> {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(class)
            .cloned()
    }

    /// Record a resolution unless one exists; entries never change once set
    pub fn memoize(&self, class: &str, resolution: ClassResolution) {
        self.resolved
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(class.to_string())
            .or_insert(resolution);
    }

    pub fn memoized_count(&self) -> usize {
        self.resolved.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Explicit cache handle owned by the caller, shared between resolvers.
///
/// `clear` drops every entry and bumps the generation under the write lock;
/// a computation that started before a `clear` is returned to its caller
/// but never stored, so reads after `clear` are always cold.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: RwLock<HashMap<PathBuf, Arc<CachedStylesheet>>>,
    generation: AtomicU64,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<CachedStylesheet>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Return the entry for `path`, computing it outside any lock on a miss.
    /// `compute` receives the generation it runs in.
    pub fn get_or_compute<F>(&self, path: &Path, compute: F) -> Arc<CachedStylesheet>
    where
        F: FnOnce(u64) -> CachedStylesheet,
    {
        if let Some(entry) = self.get(path) {
            log::debug!("Stylesheet cache hit: {}", path.display());
            return entry;
        }

        log::debug!("Stylesheet cache miss: {}", path.display());
        let generation = self.generation();
        let computed = Arc::new(compute(generation));

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation() != generation {
            return computed;
        }
        entries.entry(path.to_path_buf()).or_insert(computed).clone()
    }

    /// Invalidate everything
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
