//! In-memory store adapter. Used by tests and `stowage_cli`; a real
//! persistent backend is out of scope here. Serializability is realized
//! by totally ordering writes to the same container via one
//! `parking_lot::Mutex` per
//! container id, acquired in ascending id order before the transaction
//! body runs; disjoint-container transactions only then contend on the
//! (comparatively short) global state lock for the actual write.

use crate::container::ContainerRecord;
use crate::error::{StoreError, StowageResult};
use crate::ids::{ContainerId, ItemId};
use crate::item::Item;
use crate::log::LogRecord;
use crate::store::{Store, TransactionCtx};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct StoreState {
    containers: HashMap<ContainerId, ContainerRecord>,
    items: HashMap<ItemId, Item>,
    logs: Vec<LogRecord>,
}

pub struct InMemoryStore {
    state: RwLock<StoreState>,
    container_locks: Mutex<HashMap<ContainerId, Arc<Mutex<()>>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            state: RwLock::new(StoreState::default()),
            container_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a container directly, bypassing the transaction machinery.
    /// Convenient for test/CLI setup.
    pub fn seed_container(&self, record: ContainerRecord) {
        self.state.write().containers.insert(record.id.clone(), record);
    }

    /// Seed an item directly, bypassing the transaction machinery.
    pub fn seed_item(&self, item: Item) {
        self.state.write().items.insert(item.id.clone(), item);
    }

    fn lock_for(&self, id: &ContainerId) -> Arc<Mutex<()>> {
        self.container_locks
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Buffered writes applied to `StoreState` only if the enclosing
/// transaction's closure returns `Ok`: atomic commit, rollback on any
/// predicate violation.
struct MemoryTransaction<'s> {
    store: &'s InMemoryStore,
    put_containers: Vec<ContainerRecord>,
    removed_containers: Vec<ContainerId>,
    put_items: Vec<Item>,
    removed_items: Vec<ItemId>,
    appended_logs: Vec<LogRecord>,
}

impl<'s> MemoryTransaction<'s> {
    fn new(store: &'s InMemoryStore) -> Self {
        MemoryTransaction {
            store,
            put_containers: Vec::new(),
            removed_containers: Vec::new(),
            put_items: Vec::new(),
            removed_items: Vec::new(),
            appended_logs: Vec::new(),
        }
    }

    fn apply(self) {
        let mut state = self.store.state.write();
        for id in self.removed_containers {
            state.containers.remove(&id);
        }
        for record in self.put_containers {
            state.containers.insert(record.id.clone(), record);
        }
        for id in self.removed_items {
            state.items.remove(&id);
        }
        for item in self.put_items {
            state.items.insert(item.id.clone(), item);
        }
        state.logs.extend(self.appended_logs);
    }
}

impl<'s> TransactionCtx for MemoryTransaction<'s> {
    fn get_container(&self, id: &ContainerId) -> StowageResult<ContainerRecord> {
        if let Some(r) = self.put_containers.iter().rev().find(|r| &r.id == id) {
            return Ok(r.clone());
        }
        if self.removed_containers.contains(id) {
            return Err(StoreError::UnknownContainer(id.clone()).into());
        }
        self.store
            .state
            .read()
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownContainer(id.clone()).into())
    }

    fn get_item(&self, id: &ItemId) -> StowageResult<Item> {
        if let Some(i) = self.put_items.iter().rev().find(|i| &i.id == id) {
            return Ok(i.clone());
        }
        if self.removed_items.contains(id) {
            return Err(StoreError::UnknownItem(id.clone()).into());
        }
        self.store
            .state
            .read()
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownItem(id.clone()).into())
    }

    fn items_in_container(&self, id: &ContainerId) -> Vec<Item> {
        let base = self.store.state.read();
        let mut by_id: HashMap<ItemId, Item> = base
            .items
            .values()
            .filter(|i| i.placement.as_ref().map(|p| &p.container) == Some(id))
            .map(|i| (i.id.clone(), i.clone()))
            .collect();
        for removed in &self.removed_items {
            by_id.remove(removed);
        }
        for item in &self.put_items {
            match &item.placement {
                Some(p) if &p.container == id => {
                    by_id.insert(item.id.clone(), item.clone());
                }
                _ => {
                    by_id.remove(&item.id);
                }
            }
        }
        by_id.into_values().collect()
    }

    fn all_items(&self) -> Vec<Item> {
        let base = self.store.state.read();
        let mut by_id: HashMap<ItemId, Item> = base.items.clone();
        for removed in &self.removed_items {
            by_id.remove(removed);
        }
        for item in &self.put_items {
            by_id.insert(item.id.clone(), item.clone());
        }
        by_id.into_values().collect()
    }

    fn put_container(&mut self, record: ContainerRecord) -> StowageResult<()> {
        self.put_containers.push(record);
        Ok(())
    }

    fn remove_container(&mut self, id: &ContainerId) -> StowageResult<()> {
        if !self.items_in_container(id).is_empty() {
            return Err(crate::error::PlacementError::ContainerNotEmpty(id.clone()).into());
        }
        self.removed_containers.push(id.clone());
        Ok(())
    }

    fn put_item(&mut self, item: Item) -> StowageResult<()> {
        self.put_items.push(item);
        Ok(())
    }

    fn remove_item(&mut self, id: &ItemId) -> StowageResult<()> {
        self.removed_items.push(id.clone());
        Ok(())
    }

    fn append_log(&mut self, record: LogRecord) -> StowageResult<()> {
        self.appended_logs.push(record);
        Ok(())
    }
}

impl Store for InMemoryStore {
    fn get_container(&self, id: &ContainerId) -> StowageResult<ContainerRecord> {
        self.state
            .read()
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownContainer(id.clone()).into())
    }

    fn get_item(&self, id: &ItemId) -> StowageResult<Item> {
        self.state
            .read()
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownItem(id.clone()).into())
    }

    fn list_containers(&self) -> Vec<ContainerRecord> {
        self.state.read().containers.values().cloned().collect()
    }

    fn list_items(&self) -> Vec<Item> {
        self.state.read().items.values().cloned().collect()
    }

    fn items_in_container(&self, id: &ContainerId) -> Vec<Item> {
        self.state
            .read()
            .items
            .values()
            .filter(|i| i.placement.as_ref().map(|p| &p.container) == Some(id))
            .cloned()
            .collect()
    }

    fn items_waste(&self) -> Vec<Item> {
        self.state.read().items.values().filter(|i| i.waste).cloned().collect()
    }

    fn items_expiring_before(&self, at: DateTime<Utc>) -> Vec<Item> {
        self.state
            .read()
            .items
            .values()
            .filter(|i| matches!(i.expiry, Some(e) if e <= at))
            .cloned()
            .collect()
    }

    fn find_items_by_name(&self, name: &str) -> Vec<Item> {
        self.state.read().items.values().filter(|i| i.name == name).cloned().collect()
    }

    fn logs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<LogRecord> {
        self.state
            .read()
            .logs
            .iter()
            .filter(|l| l.timestamp >= start && l.timestamp <= end)
            .cloned()
            .collect()
    }

    fn latest_log_timestamp(&self) -> Option<DateTime<Utc>> {
        self.state.read().logs.iter().map(|l| l.timestamp).max()
    }

    fn transaction<'s, F, T>(&'s self, container_ids: &[ContainerId], f: F) -> StowageResult<T>
    where
        F: FnOnce(&mut dyn TransactionCtx) -> StowageResult<T>,
    {
        let mut sorted: Vec<ContainerId> = container_ids.to_vec();
        sorted.sort();
        sorted.dedup();
        let _guards: Vec<_> = sorted.iter().map(|id| self.lock_for(id)).collect();
        let _locked: Vec<_> = _guards.iter().map(|m| m.lock()).collect();

        let mut txn = MemoryTransaction::new(self);
        match f(&mut txn) {
            Ok(value) => {
                txn.apply();
                Ok(value)
            }
            Err(e) => {
                log::warn!("transaction on {:?} rolled back: {e}", sorted);
                Err(e)
            }
        }
    }
}
