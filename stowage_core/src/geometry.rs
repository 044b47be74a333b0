//! Axis-aligned boxes, orientations, and the overlap/containment/support/
//! blocker predicates. All coordinates are 1cm-discretized non-negative
//! integers; every predicate here is exact integer math, no floating
//! point, so there is no accumulated rounding error to reason about.

use crate::ids::ItemId;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// One of the six orientations an item may be placed in. The effective
/// dimension triple is a permutation of the item's base `(w, d, h)`;
/// orientation ids are persisted, so the mapping here must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Identity: `(w, d, h)`.
    Identity = 0,
    /// Swaps w and d: `(d, w, h)`.
    SwapWidthDepth = 1,
    /// Swaps w and h: `(h, d, w)`.
    SwapWidthHeight = 2,
    /// `(w, d, h) -> (h, w, d)`.
    RotateHwd = 3,
    /// `(w, d, h) -> (d, h, w)`.
    RotateDhw = 4,
    /// `(w, d, h) -> (h, d, w)`.
    RotateHdw = 5,
}

/// All six orientations, in the fixed order the placement planner tries
/// them: identity first, then permutations of increasing anisotropy.
pub const ALL_ORIENTATIONS: [Orientation; 6] = [
    Orientation::Identity,
    Orientation::SwapWidthDepth,
    Orientation::SwapWidthHeight,
    Orientation::RotateHwd,
    Orientation::RotateDhw,
    Orientation::RotateHdw,
];

impl Orientation {
    /// Apply this orientation to a base `(w, d, h)` triple.
    pub fn effective_dims(self, base: (u32, u32, u32)) -> (u32, u32, u32) {
        let (w, d, h) = base;
        match self {
            Orientation::Identity => (w, d, h),
            Orientation::SwapWidthDepth => (d, w, h),
            Orientation::SwapWidthHeight => (h, d, w),
            Orientation::RotateHwd => (h, w, d),
            Orientation::RotateDhw => (d, h, w),
            Orientation::RotateHdw => (h, d, w),
        }
    }

    /// Recover the orientation from its persisted id (0..=5).
    pub fn from_id(id: u8) -> Option<Self> {
        ALL_ORIENTATIONS.get(id as usize).copied()
    }

    /// The persisted id for this orientation.
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// An oriented axis-aligned bounding box in container-local centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aabb {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub w: u32,
    pub d: u32,
    pub h: u32,
}

impl Aabb {
    pub fn new(origin: (u32, u32, u32), dims: (u32, u32, u32)) -> Self {
        Aabb {
            x: origin.0,
            y: origin.1,
            z: origin.2,
            w: dims.0,
            d: dims.1,
            h: dims.2,
        }
    }

    pub fn origin(&self) -> (u32, u32, u32) {
        (self.x, self.y, self.z)
    }

    pub fn dims(&self) -> (u32, u32, u32) {
        (self.w, self.d, self.h)
    }

    pub fn volume(&self) -> u64 {
        self.w as u64 * self.d as u64 * self.h as u64
    }

    /// `box` is wholly inside `(W, D, H)` interior.
    pub fn contains_within(&self, interior: (u32, u32, u32)) -> bool {
        let (cw, cd, ch) = interior;
        self.x.saturating_add(self.w) <= cw
            && self.y.saturating_add(self.d) <= cd
            && self.z.saturating_add(self.h) <= ch
    }

    fn axis_overlap(a0: u32, a1: u32, b0: u32, b1: u32) -> bool {
        a0 < b1 && b0 < a1
    }

    fn axis_overlap_len(a0: u32, a1: u32, b0: u32, b1: u32) -> u64 {
        let lo = a0.max(b0);
        let hi = a1.min(b1);
        hi.saturating_sub(lo) as u64
    }

    /// Strict open-interval intersection on all axes.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        Aabb::axis_overlap(self.x, self.x + self.w, other.x, other.x + other.w)
            && Aabb::axis_overlap(self.y, self.y + self.d, other.y, other.y + other.d)
            && Aabb::axis_overlap(self.z, self.z + self.h, other.z, other.z + other.h)
    }

    /// `blocker` is strictly in front of `target` on the depth axis and
    /// their xz-projections onto the front face overlap.
    pub fn blocks(&self, target: &Aabb) -> bool {
        self.y < target.y
            && Aabb::axis_overlap(self.x, self.x + self.w, target.x, target.x + target.w)
            && Aabb::axis_overlap(self.z, self.z + self.h, target.z, target.z + target.h)
    }

    /// Flush z-contact and xy-footprint overlap covering at least 50%
    /// of `above`'s footprint area.
    pub fn supports(&self, above: &Aabb) -> bool {
        if self.z + self.h != above.z {
            return false;
        }
        let overlap_w = Aabb::axis_overlap_len(self.x, self.x + self.w, above.x, above.x + above.w);
        let overlap_d = Aabb::axis_overlap_len(self.y, self.y + self.d, above.y, above.y + above.d);
        let overlap_area = overlap_w * overlap_d;
        let above_area = above.w as u64 * above.d as u64;
        // area >= 0.5 * w * d, compared as 2*overlap >= w*d to stay integral.
        2 * overlap_area >= above_area
    }

    /// Whether this box rests directly on the container floor (z = 0).
    pub fn on_floor(&self) -> bool {
        self.z == 0
    }
}

/// The canonical tie-break order `(y, -z, x, id)`. `z` cannot be
/// negative once discretized, so descending-z is realized with
/// `Reverse`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlacementOrderKey(pub u32, pub Reverse<u32>, pub u32, pub ItemId);

impl PlacementOrderKey {
    pub fn for_item(aabb: &Aabb, id: ItemId) -> Self {
        PlacementOrderKey(aabb.y, Reverse(aabb.z), aabb.x, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_orientation_is_noop() {
        assert_eq!(Orientation::Identity.effective_dims((3, 4, 5)), (3, 4, 5));
    }

    #[test]
    fn swap_width_depth() {
        assert_eq!(Orientation::SwapWidthDepth.effective_dims((3, 4, 5)), (4, 3, 5));
    }

    #[test]
    fn contains_within_respects_bounds() {
        let b = Aabb::new((0, 0, 0), (10, 10, 10));
        assert!(b.contains_within((10, 10, 10)));
        let b2 = Aabb::new((1, 0, 0), (10, 10, 10));
        assert!(!b2.contains_within((10, 10, 10)));
    }

    #[test]
    fn overlap_is_strict() {
        let a = Aabb::new((0, 0, 0), (10, 10, 10));
        let touching = Aabb::new((10, 0, 0), (5, 5, 5));
        assert!(!a.overlaps(&touching));
        let overlapping = Aabb::new((9, 0, 0), (5, 5, 5));
        assert!(a.overlaps(&overlapping));
    }

    #[test]
    fn blocks_requires_front_and_projection_overlap() {
        let target = Aabb::new((10, 20, 0), (10, 10, 10));
        let blocker = Aabb::new((10, 0, 0), (10, 20, 10));
        assert!(blocker.blocks(&target));
        let non_blocker = Aabb::new((10, 25, 0), (10, 10, 10));
        assert!(!non_blocker.blocks(&target));
    }

    #[test]
    fn supports_needs_half_footprint() {
        let below = Aabb::new((0, 0, 0), (10, 10, 10));
        let fully_above = Aabb::new((0, 0, 10), (10, 10, 10));
        assert!(below.supports(&fully_above));
        let half_above = Aabb::new((5, 0, 10), (10, 10, 10));
        assert!(below.supports(&half_above));
        let quarter_above = Aabb::new((8, 8, 10), (10, 10, 10));
        assert!(!below.supports(&quarter_above));
    }

    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use rand::Rng;

    impl Arbitrary for Aabb {
        fn arbitrary(g: &mut Gen) -> Self {
            let origin = (
                g.rng().gen_range(0..50),
                g.rng().gen_range(0..50),
                g.rng().gen_range(0..50),
            );
            let dims = (
                g.rng().gen_range(1..20),
                g.rng().gen_range(1..20),
                g.rng().gen_range(1..20),
            );
            Aabb::new(origin, dims)
        }
    }

    #[quickcheck]
    fn overlaps_is_symmetric(a: Aabb, b: Aabb) -> bool {
        a.overlaps(&b) == b.overlaps(&a)
    }

    #[quickcheck]
    fn every_box_overlaps_itself(a: Aabb) -> bool {
        a.overlaps(&a)
    }

    #[quickcheck]
    fn contains_within_implies_no_negative_coordinates(a: Aabb) -> bool {
        let big_interior = (1000, 1000, 1000);
        !a.contains_within(big_interior) || (a.x + a.w <= 1000 && a.y + a.d <= 1000 && a.z + a.h <= 1000)
    }
}
