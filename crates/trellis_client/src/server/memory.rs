//! In-memory backing store.
//!
//! Records live in ordered maps keyed by the record key, so range scans
//! and cursors fall out of the key ordering directly. Index entries are
//! derived from the stored values on demand rather than materialized.

use crate::error::{ClientError, ClientResult};
use crate::key_range::KeyRange;
use crate::request::CursorHandle;
use crate::schema::{IndexInfo, ObjectStoreInfo};
use crate::server::StoreServer;
use crate::transaction::{CursorDirection, OverwriteMode};
use crate::types::{CursorIdentifier, IndexIdentifier, ObjectStoreIdentifier};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use trellis_codec::{deserialize, Key, SerializedValue, Value};

#[derive(Debug)]
struct MemoryStore {
    info: ObjectStoreInfo,
    records: BTreeMap<Key, Value>,
    /// Next key the generator will hand out.
    key_generator: u64,
    indexes: HashMap<IndexIdentifier, IndexInfo>,
}

impl MemoryStore {
    fn new(info: ObjectStoreInfo) -> Self {
        MemoryStore {
            info,
            records: BTreeMap::new(),
            key_generator: 1,
            indexes: HashMap::new(),
        }
    }

    /// Index keys a value contributes to an index: a multi-entry index
    /// gets one entry per distinct valid array element, anything else one
    /// entry for a valid extracted key, and none otherwise.
    fn index_keys_for(info: &IndexInfo, value: &Value) -> Vec<Key> {
        let Some(extracted) = info.key_path().extract(value) else {
            return Vec::new();
        };
        if info.multi_entry() {
            if let Key::Array(elements) = extracted {
                let mut keys: Vec<Key> = Vec::new();
                for element in elements {
                    if element.is_valid() && !keys.contains(&element) {
                        keys.push(element);
                    }
                }
                return keys;
            }
        }
        if extracted.is_valid() {
            vec![extracted]
        } else {
            Vec::new()
        }
    }

    /// Checks that storing `value` under `primary` would not collide with
    /// another record in any unique index.
    fn check_unique_indexes(&self, primary: &Key, value: &Value) -> ClientResult<()> {
        for info in self.indexes.values().filter(|info| info.unique()) {
            let new_keys = Self::index_keys_for(info, value);
            if new_keys.is_empty() {
                continue;
            }
            for (existing_key, existing_value) in &self.records {
                if existing_key == primary {
                    continue;
                }
                for existing in Self::index_keys_for(info, existing_value) {
                    if new_keys.contains(&existing) {
                        return Err(ClientError::constraint(format!(
                            "unique index '{}' already contains this key",
                            info.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn maybe_update_key_generator(&mut self, key: &Key) {
        if let Key::Number(n) = key {
            if n.is_finite() && *n >= self.key_generator as f64 {
                self.key_generator = (n.floor() as u64).saturating_add(1);
            }
        }
    }
}

#[derive(Debug)]
struct MemoryCursor {
    store: ObjectStoreIdentifier,
    /// Keys captured when the cursor opened, in traversal order.
    keys: Vec<Key>,
    position: usize,
}

/// A backing store holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryServer {
    stores: HashMap<ObjectStoreIdentifier, MemoryStore>,
    cursors: HashMap<CursorIdentifier, MemoryCursor>,
    next_cursor: u64,
}

impl MemoryServer {
    /// Creates an empty backing store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, identifier: ObjectStoreIdentifier) -> ClientResult<&MemoryStore> {
        self.stores
            .get(&identifier)
            .ok_or_else(|| ClientError::unknown(format!("no backing store for {identifier}")))
    }

    fn store_mut(&mut self, identifier: ObjectStoreIdentifier) -> ClientResult<&mut MemoryStore> {
        self.stores
            .get_mut(&identifier)
            .ok_or_else(|| ClientError::unknown(format!("no backing store for {identifier}")))
    }

    /// Resolves a cursor position to a live record, skipping keys deleted
    /// since the cursor opened. Returns the adjusted position.
    fn resolve_position(
        store: &MemoryStore,
        keys: &[Key],
        mut position: usize,
    ) -> Option<(usize, Key, Value)> {
        while let Some(key) = keys.get(position) {
            if let Some(value) = store.records.get(key) {
                return Some((position, key.clone(), value.clone()));
            }
            position += 1;
        }
        None
    }
}

impl StoreServer for MemoryServer {
    fn register_object_store(&mut self, info: &ObjectStoreInfo) -> ClientResult<()> {
        debug!(store = %info.identifier(), name = info.name(), "register store");
        self.stores
            .insert(info.identifier(), MemoryStore::new(info.clone()));
        Ok(())
    }

    fn delete_object_store(&mut self, store: ObjectStoreIdentifier) -> ClientResult<()> {
        self.stores.remove(&store);
        self.cursors.retain(|_, cursor| cursor.store != store);
        Ok(())
    }

    fn get_record(
        &mut self,
        store: ObjectStoreIdentifier,
        range: &KeyRange,
    ) -> ClientResult<Option<Value>> {
        let store = self.store(store)?;
        Ok(store
            .records
            .range(range.bounds())
            .next()
            .map(|(_, value)| value.clone()))
    }

    fn put_or_add(
        &mut self,
        store: ObjectStoreIdentifier,
        key: Option<Key>,
        value: &SerializedValue,
        overwrite: OverwriteMode,
    ) -> ClientResult<Key> {
        let mut value = deserialize(value)
            .map_err(|e| ClientError::unknown(format!("stored value is unreadable: {e}")))?;

        let store = self.store_mut(store)?;
        let key = match key {
            Some(key) => {
                store.maybe_update_key_generator(&key);
                key
            }
            None => {
                let generated = Key::Number(store.key_generator as f64);
                store.key_generator += 1;
                if let Some(key_path) = store.info.key_path() {
                    if !key_path.inject(&mut value, &generated) {
                        return Err(ClientError::unknown(
                            "failed to inject the generated key into the value",
                        ));
                    }
                }
                generated
            }
        };

        if overwrite == OverwriteMode::NoOverwrite && store.records.contains_key(&key) {
            return Err(ClientError::constraint(
                "a record with this key already exists",
            ));
        }
        store.check_unique_indexes(&key, &value)?;

        store.records.insert(key.clone(), value);
        Ok(key)
    }

    fn delete_record(
        &mut self,
        store: ObjectStoreIdentifier,
        range: &KeyRange,
    ) -> ClientResult<()> {
        let store = self.store_mut(store)?;
        let doomed: Vec<Key> = store
            .records
            .range(range.bounds())
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            store.records.remove(&key);
        }
        Ok(())
    }

    fn clear_object_store(&mut self, store: ObjectStoreIdentifier) -> ClientResult<()> {
        self.store_mut(store)?.records.clear();
        Ok(())
    }

    fn count(
        &mut self,
        store: ObjectStoreIdentifier,
        index: Option<IndexIdentifier>,
        range: &KeyRange,
    ) -> ClientResult<u64> {
        let store = self.store(store)?;
        let count = match index {
            None => store.records.range(range.bounds()).count() as u64,
            Some(index) => {
                let info = store.indexes.get(&index).ok_or_else(|| {
                    ClientError::unknown(format!("no backing index for {index}"))
                })?;
                store
                    .records
                    .values()
                    .map(|value| {
                        MemoryStore::index_keys_for(info, value)
                            .iter()
                            .filter(|key| range.contains(key))
                            .count() as u64
                    })
                    .sum()
            }
        };
        Ok(count)
    }

    fn create_index(&mut self, info: &IndexInfo) -> ClientResult<()> {
        let store = self.store_mut(info.object_store_identifier())?;

        // Backfill check: a unique index over existing records must not
        // start out with duplicates.
        if info.unique() {
            let mut seen: Vec<Key> = Vec::new();
            for value in store.records.values() {
                for key in MemoryStore::index_keys_for(info, value) {
                    if seen.contains(&key) {
                        return Err(ClientError::constraint(format!(
                            "existing records violate the unique index '{}'",
                            info.name()
                        )));
                    }
                    seen.push(key);
                }
            }
        }

        debug!(index = %info.identifier(), name = info.name(), "create index");
        store.indexes.insert(info.identifier(), info.clone());
        Ok(())
    }

    fn delete_index(
        &mut self,
        store: ObjectStoreIdentifier,
        index: IndexIdentifier,
    ) -> ClientResult<()> {
        self.store_mut(store)?.indexes.remove(&index);
        Ok(())
    }

    fn open_cursor(
        &mut self,
        store: ObjectStoreIdentifier,
        range: &KeyRange,
        direction: CursorDirection,
    ) -> ClientResult<Option<CursorHandle>> {
        let memory_store = self.store(store)?;
        let mut keys: Vec<Key> = memory_store
            .records
            .range(range.bounds())
            .map(|(key, _)| key.clone())
            .collect();
        if matches!(
            direction,
            CursorDirection::Previous | CursorDirection::PreviousUnique
        ) {
            keys.reverse();
        }

        let Some((position, key, value)) = Self::resolve_position(memory_store, &keys, 0) else {
            return Ok(None);
        };

        self.next_cursor += 1;
        let identifier = CursorIdentifier::new(self.next_cursor);
        self.cursors.insert(
            identifier,
            MemoryCursor {
                store,
                keys,
                position,
            },
        );
        Ok(Some(CursorHandle {
            cursor: identifier,
            key,
            value,
        }))
    }

    fn iterate_cursor(
        &mut self,
        cursor: CursorIdentifier,
        count: u32,
    ) -> ClientResult<Option<CursorHandle>> {
        let state = self
            .cursors
            .get_mut(&cursor)
            .ok_or_else(|| ClientError::unknown(format!("no open cursor for {cursor}")))?;
        let store = self
            .stores
            .get(&state.store)
            .ok_or_else(|| ClientError::unknown("the cursor's store is gone"))?;

        let steps = count.max(1) as usize;
        let target = state.position + steps;
        match Self::resolve_position(store, &state.keys, target) {
            Some((position, key, value)) => {
                state.position = position;
                Ok(Some(CursorHandle {
                    cursor,
                    key,
                    value,
                }))
            }
            None => {
                self.cursors.remove(&cursor);
                Ok(None)
            }
        }
    }
}
