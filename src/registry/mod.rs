//! Live statement registry.
//!
//! Stand-in for the execution engine's configuration registry. Documents are
//! loaded into an immutable, versioned [`RegistryState`] and published through
//! an [`ArcSwap`]. Readers grab the current state with one atomic load and keep
//! it as long as they like; a reload prepares the next state off to the side and
//! swaps the pointer, so no reader ever observes a namespace whose statements
//! were removed but not yet reinserted.

mod loader;

pub use loader::{CacheDecl, KeyGenerator, MappedStatement, SqlCommand, SqlFragment, TypeMap, load_document};

use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::constants::LOADED_NAMESPACE_PREFIX;
use crate::core::Result;
use crate::document::{DocumentSet, PrimaryKeyTable};

/// One immutable generation of the registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
    pub version: u64,
    pub statements: BTreeMap<String, Arc<MappedStatement>>,
    pub result_maps: BTreeMap<String, Arc<TypeMap>>,
    pub parameter_maps: BTreeMap<String, Arc<TypeMap>>,
    pub sql_fragments: BTreeMap<String, Arc<SqlFragment>>,
    /// Keyed by namespace.
    pub caches: BTreeMap<String, Arc<CacheDecl>>,
    pub key_generators: BTreeMap<String, Arc<KeyGenerator>>,
    /// Loaded markers (`namespace:<ns>` and resource names) to their namespace.
    pub loaded_resources: BTreeMap<String, String>,
    pub primary_keys: PrimaryKeyTable,
}

impl RegistryState {
    pub fn statement(&self, id: &str) -> Option<&Arc<MappedStatement>> {
        self.statements.get(id)
    }

    /// Statements of one namespace, ordered by id.
    pub fn statements_in<'a>(&'a self, namespace: &str) -> impl Iterator<Item = &'a MappedStatement> + 'a {
        let prefix = format!("{namespace}.");
        self.statements
            .iter()
            .filter(move |(key, _)| key.starts_with(&prefix))
            .map(|(_, statement)| statement.as_ref())
    }

    pub fn is_namespace_loaded(&self, namespace: &str) -> bool {
        self.loaded_resources
            .contains_key(&format!("{LOADED_NAMESPACE_PREFIX}{namespace}"))
    }

    /// Every loaded namespace.
    pub fn namespaces(&self) -> Vec<&str> {
        self.loaded_resources
            .keys()
            .filter_map(|marker| marker.strip_prefix(LOADED_NAMESPACE_PREFIX))
            .collect()
    }

    /// Drop every entry of `namespace` together with its loaded markers.
    pub fn remove_namespace(&mut self, namespace: &str) {
        let prefix = format!("{namespace}.");
        let keep = |key: &String| !key.starts_with(&prefix);
        self.statements.retain(|k, _| keep(k));
        self.result_maps.retain(|k, _| keep(k));
        self.parameter_maps.retain(|k, _| keep(k));
        self.sql_fragments.retain(|k, _| keep(k));
        self.key_generators.retain(|k, _| keep(k));
        self.caches.remove(namespace);
        self.loaded_resources.retain(|_, ns| ns.as_str() != namespace);
    }

    /// Load a whole document set on top of this state.
    pub fn load_set(&mut self, set: &DocumentSet) -> Result<()> {
        for doc in &set.documents {
            load_document(self, doc)?;
        }
        self.primary_keys = set.primary_keys.clone();
        Ok(())
    }
}

/// The published registry.
#[derive(Debug, Default)]
pub struct LiveRegistry {
    current: ArcSwap<RegistryState>,
    // serializes writers; readers never take it
    write_lock: Mutex<()>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state. The snapshot stays valid across later swaps.
    pub fn snapshot(&self) -> Arc<RegistryState> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    pub fn statement(&self, id: &str) -> Option<Arc<MappedStatement>> {
        self.current.load().statement(id).cloned()
    }

    /// Load a document set into the registry and publish the result.
    pub fn install(&self, set: &DocumentSet) -> Result<u64> {
        self.replace(&[], set)
    }

    /// Replace the entries of `previous` namespaces with the documents of `set`.
    ///
    /// The next state is derived from a copy of the current one. On failure
    /// nothing is published and the current state stays in place.
    pub fn replace(&self, previous: &[String], set: &DocumentSet) -> Result<u64> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = RegistryState::clone(&self.current.load());
        for namespace in previous {
            next.remove_namespace(namespace);
        }
        next.load_set(set)?;
        next.version += 1;

        let version = next.version;
        tracing::info!(
            "Publishing registry version {version}: {} statements in {} namespaces",
            next.statements.len(),
            next.namespaces().len()
        );
        self.current.store(Arc::new(next));
        Ok(version)
    }
}
