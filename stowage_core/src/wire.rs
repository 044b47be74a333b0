//! Wire-facing position shapes: `{startCoordinates, endCoordinates}` in
//! container-local centimeters. These are the typed target a future
//! CSV/JSON import-export adapter would populate; this crate performs
//! no parsing itself.

use crate::geometry::{Aabb, Orientation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub width: u32,
    pub depth: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub start_coordinates: Coordinates,
    pub end_coordinates: Coordinates,
}

impl Position {
    /// `end - start` equals the effective oriented dimensions; orientation
    /// itself is not serialized, it's derived.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Position {
            start_coordinates: Coordinates {
                width: aabb.x,
                depth: aabb.y,
                height: aabb.z,
            },
            end_coordinates: Coordinates {
                width: aabb.x + aabb.w,
                depth: aabb.y + aabb.d,
                height: aabb.z + aabb.h,
            },
        }
    }

    pub fn to_aabb(&self) -> Option<Aabb> {
        let w = self.end_coordinates.width.checked_sub(self.start_coordinates.width)?;
        let d = self.end_coordinates.depth.checked_sub(self.start_coordinates.depth)?;
        let h = self.end_coordinates.height.checked_sub(self.start_coordinates.height)?;
        Some(Aabb::new(
            (self.start_coordinates.width, self.start_coordinates.depth, self.start_coordinates.height),
            (w, d, h),
        ))
    }

    /// Recover the orientation implied by `(w, d, h)` against an item's
    /// base dimensions, if any of the six orientations match exactly.
    pub fn derive_orientation(&self, base_dims: (u32, u32, u32)) -> Option<Orientation> {
        let aabb = self.to_aabb()?;
        crate::geometry::ALL_ORIENTATIONS
            .into_iter()
            .find(|o| o.effective_dims(base_dims) == aabb.dims())
    }
}
