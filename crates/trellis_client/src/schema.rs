//! Versioned object store and index metadata.

use crate::types::{IndexIdentifier, ObjectStoreIdentifier};
use std::collections::HashMap;
use trellis_codec::KeyPath;

/// Options for creating an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexParameters {
    /// Whether the index enforces key uniqueness.
    pub unique: bool,
    /// Whether array index keys expand to one entry per element.
    pub multi_entry: bool,
}

/// Metadata describing an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    identifier: IndexIdentifier,
    object_store_identifier: ObjectStoreIdentifier,
    name: String,
    key_path: KeyPath,
    unique: bool,
    multi_entry: bool,
}

impl IndexInfo {
    /// Creates new index metadata.
    #[must_use]
    pub fn new(
        identifier: IndexIdentifier,
        object_store_identifier: ObjectStoreIdentifier,
        name: impl Into<String>,
        key_path: KeyPath,
        unique: bool,
        multi_entry: bool,
    ) -> Self {
        Self {
            identifier,
            object_store_identifier,
            name: name.into(),
            key_path,
            unique,
            multi_entry,
        }
    }

    /// Returns the index identifier.
    #[must_use]
    pub fn identifier(&self) -> IndexIdentifier {
        self.identifier
    }

    /// Returns the identifier of the owning object store.
    #[must_use]
    pub fn object_store_identifier(&self) -> ObjectStoreIdentifier {
        self.object_store_identifier
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the index key path.
    #[must_use]
    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    /// Returns true if the index enforces key uniqueness.
    #[must_use]
    pub fn unique(&self) -> bool {
        self.unique
    }

    /// Returns true if array keys expand to one entry per element.
    #[must_use]
    pub fn multi_entry(&self) -> bool {
        self.multi_entry
    }
}

/// Metadata describing an object store.
///
/// The operation façade keeps two copies: the current info, mutated during
/// a version-change transaction, and the snapshot taken at construction
/// that an aborted version change rolls back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreInfo {
    identifier: ObjectStoreIdentifier,
    name: String,
    key_path: Option<KeyPath>,
    auto_increment: bool,
    max_index_identifier: u64,
    indexes: HashMap<String, IndexInfo>,
}

impl ObjectStoreInfo {
    /// Creates new object store metadata with no indexes.
    #[must_use]
    pub fn new(
        identifier: ObjectStoreIdentifier,
        name: impl Into<String>,
        key_path: Option<KeyPath>,
        auto_increment: bool,
    ) -> Self {
        Self {
            identifier,
            name: name.into(),
            key_path,
            auto_increment,
            max_index_identifier: 0,
            indexes: HashMap::new(),
        }
    }

    /// Returns the store identifier.
    #[must_use]
    pub fn identifier(&self) -> ObjectStoreIdentifier {
        self.identifier
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the in-line key path, if the store uses one.
    #[must_use]
    pub fn key_path(&self) -> Option<&KeyPath> {
        self.key_path.as_ref()
    }

    /// Returns true if the store has a key generator.
    #[must_use]
    pub fn auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Returns true if an index with this name exists.
    #[must_use]
    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Looks up metadata for an existing index.
    #[must_use]
    pub fn info_for_existing_index(&self, name: &str) -> Option<&IndexInfo> {
        self.indexes.get(name)
    }

    /// Returns the index names, sorted.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registers a new index and returns its metadata.
    ///
    /// The caller is responsible for checking name uniqueness first.
    pub fn create_new_index(
        &mut self,
        name: &str,
        key_path: KeyPath,
        parameters: IndexParameters,
    ) -> IndexInfo {
        self.max_index_identifier += 1;
        let info = IndexInfo::new(
            IndexIdentifier::new(self.max_index_identifier),
            self.identifier,
            name,
            key_path,
            parameters.unique,
            parameters.multi_entry,
        );
        self.indexes.insert(name.to_string(), info.clone());
        info
    }

    /// Removes an index from the metadata.
    pub fn delete_index(&mut self, name: &str) {
        self.indexes.remove(name);
    }
}

/// Connection-side view of a database: its name, version, and stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    name: String,
    version: u64,
    object_stores: HashMap<ObjectStoreIdentifier, ObjectStoreInfo>,
}

impl DatabaseInfo {
    /// Creates a new database description with no stores.
    #[must_use]
    pub fn new(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            version,
            object_stores: HashMap::new(),
        }
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the database version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if a store with this name exists.
    #[must_use]
    pub fn has_object_store(&self, name: &str) -> bool {
        self.object_stores.values().any(|info| info.name() == name)
    }

    /// Looks up store metadata by name.
    #[must_use]
    pub fn object_store_named(&self, name: &str) -> Option<&ObjectStoreInfo> {
        self.object_stores.values().find(|info| info.name() == name)
    }

    /// Looks up store metadata by identifier.
    #[must_use]
    pub fn object_store_by_identifier(
        &self,
        identifier: ObjectStoreIdentifier,
    ) -> Option<&ObjectStoreInfo> {
        self.object_stores.get(&identifier)
    }

    /// Returns the store names, sorted.
    #[must_use]
    pub fn object_store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .object_stores
            .values()
            .map(|info| info.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Adds a store to the description.
    pub fn add_object_store(&mut self, info: ObjectStoreInfo) {
        self.object_stores.insert(info.identifier(), info);
    }

    /// Removes a store from the description.
    pub fn remove_object_store(&mut self, identifier: ObjectStoreIdentifier) {
        self.object_stores.remove(&identifier);
    }

    /// Updates the version during a version change.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Records a newly created index.
    pub fn did_create_index(&mut self, info: &IndexInfo) {
        if let Some(store) = self.object_stores.get_mut(&info.object_store_identifier()) {
            store
                .indexes
                .insert(info.name().to_string(), info.clone());
        }
    }

    /// Records a deleted index.
    pub fn did_delete_index(&mut self, info: &IndexInfo) {
        if let Some(store) = self.object_stores.get_mut(&info.object_store_identifier()) {
            store.indexes.remove(info.name());
        }
    }
}
