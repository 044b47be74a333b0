//! Transactional store contract. The geometry, placement, retrieval,
//! lifecycle, and waste modules read and write state exclusively
//! through this trait; `store_memory` provides the one concrete adapter
//! this crate ships — a real persistent adapter is out of scope here.

use crate::container::ContainerRecord;
use crate::error::StowageResult;
use crate::ids::{ContainerId, ItemId};
use crate::item::Item;
use crate::log::LogRecord;
use chrono::{DateTime, Utc};

/// Mutations available inside an open transaction. Implementors buffer
/// or apply writes as they see fit; what matters is that none of them
/// are visible outside the transaction until the closure passed to
/// [`Store::transaction`] returns `Ok`.
pub trait TransactionCtx {
    fn get_container(&self, id: &ContainerId) -> StowageResult<ContainerRecord>;
    fn get_item(&self, id: &ItemId) -> StowageResult<Item>;
    fn items_in_container(&self, id: &ContainerId) -> Vec<Item>;
    /// Every item visible to this transaction, regardless of container,
    /// including items this transaction has already written.
    fn all_items(&self) -> Vec<Item>;

    fn put_container(&mut self, record: ContainerRecord) -> StowageResult<()>;
    fn remove_container(&mut self, id: &ContainerId) -> StowageResult<()>;
    fn put_item(&mut self, item: Item) -> StowageResult<()>;
    fn remove_item(&mut self, id: &ItemId) -> StowageResult<()>;
    fn append_log(&mut self, record: LogRecord) -> StowageResult<()>;
}

/// The store contract every backing adapter implements.
pub trait Store: Send + Sync {
    fn get_container(&self, id: &ContainerId) -> StowageResult<ContainerRecord>;
    fn get_item(&self, id: &ItemId) -> StowageResult<Item>;
    fn list_containers(&self) -> Vec<ContainerRecord>;
    fn list_items(&self) -> Vec<Item>;
    fn items_in_container(&self, id: &ContainerId) -> Vec<Item>;
    fn items_waste(&self) -> Vec<Item>;
    fn items_expiring_before(&self, at: DateTime<Utc>) -> Vec<Item>;
    fn find_items_by_name(&self, name: &str) -> Vec<Item>;
    fn logs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<LogRecord>;
    fn latest_log_timestamp(&self) -> Option<DateTime<Utc>>;

    /// Run `f` inside a single logical transaction that has locked
    /// `container_ids` (ascending order, to avoid deadlock). If `f`
    /// returns `Err`, every write it made is discarded; if it
    /// returns `Ok`, all writes commit atomically together with any log
    /// record appended.
    fn transaction<'s, F, T>(&'s self, container_ids: &[ContainerId], f: F) -> StowageResult<T>
    where
        F: FnOnce(&mut dyn TransactionCtx) -> StowageResult<T>;
}
