//! Per-container spatial index answering "is region free?", "what
//! overlaps region R?", and first-fit search. Two backends share one trait so
//! a container can pick whichever is appropriate for its size; the
//! contract — not the representation — is what callers depend on.

mod bitmap;
mod interval;

pub use bitmap::BitmapIndex;
pub use interval::IntervalIndex;

use crate::geometry::Aabb;
use crate::ids::ItemId;

/// Interior volume (cm^3) above which a container prefers the interval
/// backend over a dense bitmap.
pub const BITMAP_VOLUME_THRESHOLD: u64 = 2_000_000;

/// The occupancy-index contract shared by both backends.
pub trait OccupancyIndex: std::fmt::Debug {
    /// Interior dimensions this index was built for.
    fn interior(&self) -> (u32, u32, u32);

    /// Whether `region` is entirely free (and within bounds).
    fn is_free(&self, region: &Aabb) -> bool;

    /// Every item whose box overlaps `region`.
    fn overlappers(&self, region: &Aabb) -> Vec<ItemId>;

    /// Record that `item` now occupies `region`. Caller is responsible
    /// for having checked `is_free` first; this never overlap-checks.
    fn insert(&mut self, item: ItemId, region: Aabb);

    /// Remove `item`, returning its box if it was present.
    fn remove(&mut self, item: &ItemId) -> Option<Aabb>;

    /// All `(item, box)` pairs currently recorded, in insertion-agnostic
    /// but deterministic order (sorted by item id).
    fn iterate(&self) -> Vec<(ItemId, Aabb)>;

    /// First free origin that fits `dims`, scanning in the canonical
    /// lexicographic `(z, y, x)` order. This default
    /// implementation is correct for any backend implementing `is_free`;
    /// backends are free to override it with a smarter search.
    fn first_fit(&self, dims: (u32, u32, u32)) -> Option<(u32, u32, u32)> {
        let (cw, cd, ch) = self.interior();
        let (w, d, h) = dims;
        if w > cw || d > cd || h > ch {
            return None;
        }
        for z in 0..=(ch - h) {
            for y in 0..=(cd - d) {
                for x in 0..=(cw - w) {
                    let candidate = Aabb::new((x, y, z), dims);
                    if self.is_free(&candidate) {
                        return Some((x, y, z));
                    }
                }
            }
        }
        None
    }
}

/// Build the occupancy index appropriate for a container's interior
/// volume, substituting the interval-pruned backend once a container's
/// volume crosses [`BITMAP_VOLUME_THRESHOLD`].
pub fn new_index(interior: (u32, u32, u32)) -> Box<dyn OccupancyIndex + Send> {
    let (w, d, h) = interior;
    let volume = w as u64 * d as u64 * h as u64;
    if volume <= BITMAP_VOLUME_THRESHOLD {
        Box::new(BitmapIndex::new(interior))
    } else {
        Box::new(IntervalIndex::new(interior))
    }
}
