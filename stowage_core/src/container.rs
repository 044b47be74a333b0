//! Container: interior dimensions, zone, and the occupancy index that
//! tracks what's placed inside it.

use crate::geometry::Aabb;
use crate::ids::{ContainerId, ItemId};
use crate::occupancy::{new_index, OccupancyIndex};
use serde::{Deserialize, Serialize};

/// Immutable container identity and dimensions, plus its live occupancy
/// index. The index is not `Serialize`/`Deserialize` — persistence
/// round-trips `ContainerRecord` and rebuilds the index from placements.
pub struct Container {
    pub id: ContainerId,
    pub zone: String,
    pub interior: (u32, u32, u32),
    index: Box<dyn OccupancyIndex + Send>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("zone", &self.zone)
            .field("interior", &self.interior)
            .field("occupied_items", &self.index.iterate().len())
            .finish()
    }
}

/// Plain serializable projection of a container, used at the store/wire
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub zone: String,
    pub width: u32,
    pub depth: u32,
    pub height: u32,
}

impl Container {
    pub fn new(record: ContainerRecord) -> Self {
        let interior = (record.width, record.depth, record.height);
        Container {
            id: record.id,
            zone: record.zone,
            interior,
            index: new_index(interior),
        }
    }

    /// Build a transaction-scoped container by replaying every item
    /// currently placed in it. Occupancy indices are transaction-scoped
    /// clones of persisted state and are discarded on commit/rollback.
    pub fn from_items(record: ContainerRecord, items: &[crate::item::Item]) -> Self {
        let mut container = Container::new(record.clone());
        for item in items {
            if let Some(placement) = &item.placement {
                if placement.container == record.id {
                    container.insert(item.id.clone(), placement.aabb(item.base_dims()));
                }
            }
        }
        container
    }

    pub fn to_record(&self) -> ContainerRecord {
        ContainerRecord {
            id: self.id.clone(),
            zone: self.zone.clone(),
            width: self.interior.0,
            depth: self.interior.1,
            height: self.interior.2,
        }
    }

    pub fn volume(&self) -> u64 {
        self.interior.0 as u64 * self.interior.1 as u64 * self.interior.2 as u64
    }

    pub fn used_volume(&self) -> u64 {
        self.index.iterate().iter().map(|(_, aabb)| aabb.volume()).sum()
    }

    pub fn free_volume(&self) -> u64 {
        self.volume().saturating_sub(self.used_volume())
    }

    pub fn is_empty(&self) -> bool {
        self.index.iterate().is_empty()
    }

    pub fn is_free(&self, region: &Aabb) -> bool {
        self.index.is_free(region)
    }

    pub fn first_fit(&self, dims: (u32, u32, u32)) -> Option<(u32, u32, u32)> {
        self.index.first_fit(dims)
    }

    pub fn overlappers(&self, region: &Aabb) -> Vec<ItemId> {
        self.index.overlappers(region)
    }

    pub fn insert(&mut self, item: ItemId, region: Aabb) {
        self.index.insert(item, region);
    }

    pub fn remove(&mut self, item: &ItemId) -> Option<Aabb> {
        self.index.remove(item)
    }

    pub fn iterate(&self) -> Vec<(ItemId, Aabb)> {
        self.index.iterate()
    }
}
