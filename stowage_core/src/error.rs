//! Error taxonomy. One `thiserror` enum per subsystem with a
//! genuinely distinct failure mode, composed into [`StowageError`] via
//! `#[from]` so callers can match on a single type while subsystem code
//! still returns its own narrow error.

use crate::ids::{ContainerId, ItemId};
use thiserror::Error;

/// Validation failures caught before any mutation is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("dimension must be non-negative, got {field} = {value}")]
    NegativeDimension { field: &'static str, value: i64 },
    #[error("duplicate item id {0} within one request")]
    DuplicateItemId(ItemId),
    #[error("duplicate container id {0} within one request")]
    DuplicateContainerId(ContainerId),
    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),
}

/// Failures raised while attempting to place or move an item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("position for item {item} lies outside container {container}")]
    OutsideContainer { item: ItemId, container: ContainerId },
    #[error("position for item {item} overlaps existing item {other} in container {container}")]
    Overlaps {
        item: ItemId,
        other: ItemId,
        container: ContainerId,
    },
    #[error("container {0} is not empty and cannot be destroyed")]
    ContainerNotEmpty(ContainerId),
}

/// Failures raised while planning or executing a retrieval.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("no item matches id or name {0:?}")]
    NotFound(String),
    #[error("item {0} is not currently placed in any container")]
    NotPlaced(ItemId),
}

/// Failures surfaced by the store adapter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown item id {0}")]
    UnknownItem(ItemId),
    #[error("unknown container id {0}")]
    UnknownContainer(ContainerId),
    #[error("transaction on container {0} conflicted with a concurrent writer")]
    Conflict(ContainerId),
    #[error("backing store I/O failure: {0}")]
    Io(String),
}

/// The single error type returned by every core entry point.
#[derive(Debug, Error)]
pub enum StowageError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("requested entity was not found: {0}")]
    NotFound(String),
    #[error("operation was cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

pub type StowageResult<T> = Result<T, StowageError>;
