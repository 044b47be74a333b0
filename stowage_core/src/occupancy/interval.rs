//! Interval-pruned backend for containers too large for a dense bitmap.
//! Items are kept sorted by their x-interval start so
//! overlap queries can skip boxes that start after the query region
//! ends, without paying the memory cost of a per-cm bitmap.

use super::OccupancyIndex;
use crate::geometry::Aabb;
use crate::ids::ItemId;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct IntervalIndex {
    interior: (u32, u32, u32),
    items: BTreeMap<ItemId, Aabb>,
    /// `(x_start, item)` kept sorted for the overlap-query pruning pass.
    by_x: Vec<(u32, ItemId)>,
}

impl IntervalIndex {
    pub fn new(interior: (u32, u32, u32)) -> Self {
        IntervalIndex {
            interior,
            items: BTreeMap::new(),
            by_x: Vec::new(),
        }
    }

    fn reindex(&mut self) {
        self.by_x = self.items.iter().map(|(id, aabb)| (aabb.x, id.clone())).collect();
        self.by_x.sort_by_key(|(x, _)| *x);
    }
}

impl OccupancyIndex for IntervalIndex {
    fn interior(&self) -> (u32, u32, u32) {
        self.interior
    }

    fn is_free(&self, region: &Aabb) -> bool {
        if !region.contains_within(self.interior) {
            return false;
        }
        // Only boxes whose x-interval starts before region's x-end can
        // possibly overlap on x; boxes starting at or after it cannot.
        let cutoff = region.x + region.w;
        for (x_start, id) in &self.by_x {
            if *x_start >= cutoff {
                break;
            }
            if let Some(aabb) = self.items.get(id) {
                if aabb.overlaps(region) {
                    return false;
                }
            }
        }
        true
    }

    fn overlappers(&self, region: &Aabb) -> Vec<ItemId> {
        let cutoff = region.x + region.w;
        let mut hits: Vec<ItemId> = self
            .by_x
            .iter()
            .take_while(|(x_start, _)| *x_start < cutoff)
            .filter_map(|(_, id)| {
                let aabb = self.items.get(id)?;
                aabb.overlaps(region).then(|| id.clone())
            })
            .collect();
        hits.sort();
        hits
    }

    fn insert(&mut self, item: ItemId, region: Aabb) {
        self.items.insert(item, region);
        self.reindex();
    }

    fn remove(&mut self, item: &ItemId) -> Option<Aabb> {
        let region = self.items.remove(item)?;
        self.reindex();
        Some(region)
    }

    fn iterate(&self) -> Vec<(ItemId, Aabb)> {
        self.items.iter().map(|(id, aabb)| (id.clone(), *aabb)).collect()
    }
}
