//! Dense 1cm-resolution bitmap backend, one bit per interior cell —
//! sufficient for typical container sizes without the pointer chasing
//! of an interval tree.

use super::OccupancyIndex;
use crate::geometry::Aabb;
use crate::ids::ItemId;
use bitvec::vec::BitVec;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct BitmapIndex {
    interior: (u32, u32, u32),
    occupied: BitVec,
    items: BTreeMap<ItemId, Aabb>,
}

impl BitmapIndex {
    pub fn new(interior: (u32, u32, u32)) -> Self {
        let (w, d, h) = interior;
        let cells = w as usize * d as usize * h as usize;
        BitmapIndex {
            interior,
            occupied: BitVec::repeat(false, cells),
            items: BTreeMap::new(),
        }
    }

    fn cell(&self, x: u32, y: u32, z: u32) -> usize {
        let (w, d, _h) = self.interior;
        z as usize * (w as usize * d as usize) + y as usize * w as usize + x as usize
    }

    fn set_region(&mut self, aabb: &Aabb, value: bool) {
        for z in aabb.z..aabb.z + aabb.h {
            for y in aabb.y..aabb.y + aabb.d {
                for x in aabb.x..aabb.x + aabb.w {
                    let idx = self.cell(x, y, z);
                    self.occupied.set(idx, value);
                }
            }
        }
    }
}

impl OccupancyIndex for BitmapIndex {
    fn interior(&self) -> (u32, u32, u32) {
        self.interior
    }

    fn is_free(&self, region: &Aabb) -> bool {
        if !region.contains_within(self.interior) {
            return false;
        }
        for z in region.z..region.z + region.h {
            for y in region.y..region.y + region.d {
                for x in region.x..region.x + region.w {
                    if self.occupied[self.cell(x, y, z)] {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn overlappers(&self, region: &Aabb) -> Vec<ItemId> {
        let mut hits: Vec<ItemId> = self
            .items
            .iter()
            .filter(|(_, aabb)| aabb.overlaps(region))
            .map(|(id, _)| id.clone())
            .collect();
        hits.sort();
        hits
    }

    fn insert(&mut self, item: ItemId, region: Aabb) {
        self.set_region(&region, true);
        self.items.insert(item, region);
    }

    fn remove(&mut self, item: &ItemId) -> Option<Aabb> {
        let region = self.items.remove(item)?;
        self.set_region(&region, false);
        Some(region)
    }

    fn iterate(&self) -> Vec<(ItemId, Aabb)> {
        self.items.iter().map(|(id, aabb)| (id.clone(), *aabb)).collect()
    }
}
