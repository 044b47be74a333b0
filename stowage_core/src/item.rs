//! Item lifecycle record.

use crate::geometry::{Aabb, Orientation};
use crate::ids::{ContainerId, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an item currently sits, once placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub container: ContainerId,
    pub origin: (u32, u32, u32),
    pub orientation: Orientation,
}

impl Placement {
    /// The effective oriented box this placement occupies, given the
    /// item's base dimensions.
    pub fn aabb(&self, base_dims: (u32, u32, u32)) -> Aabb {
        Aabb::new(self.origin, self.orientation.effective_dims(base_dims))
    }
}

/// A stowed or stowable piece of cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Base (unoriented) dimensions in centimeters.
    pub width: u32,
    pub depth: u32,
    pub height: u32,
    /// Mass in grams, kept integral like every other discretized quantity.
    pub mass_g: u64,
    /// Priority in `[0, 100]`.
    pub priority: u8,
    pub expiry: Option<DateTime<Utc>>,
    pub usage_limit: u32,
    pub remaining_uses: u32,
    pub preferred_zone: String,
    pub waste: bool,
    pub placement: Option<Placement>,
}

impl Item {
    pub fn base_dims(&self) -> (u32, u32, u32) {
        (self.width, self.depth, self.height)
    }

    pub fn volume(&self) -> u64 {
        self.width as u64 * self.depth as u64 * self.height as u64
    }

    /// The oriented box this item currently occupies.
    pub fn placed_aabb(&self) -> Option<Aabb> {
        self.placement.as_ref().map(|p| p.aabb(self.base_dims()))
    }

    /// `remaining_uses <= usage_limit && remaining_uses >= 0`.
    /// `remaining_uses` is unsigned so only the upper bound needs checking.
    pub fn usage_invariant_holds(&self) -> bool {
        self.remaining_uses <= self.usage_limit
    }

    /// Decrement the usage counter by one, saturating at zero, and mark
    /// waste. Waste is monotone, so this never clears the flag.
    /// Returns `true` if this decrement just depleted the item.
    pub fn decrement_usage(&mut self) -> bool {
        debug_assert!(self.usage_invariant_holds());
        if self.remaining_uses > 0 {
            self.remaining_uses -= 1;
        }
        let depleted = self.remaining_uses == 0 && !self.waste;
        if depleted {
            self.waste = true;
        }
        debug_assert!(self.usage_invariant_holds());
        depleted
    }

    /// Expiry sweep predicate.
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        matches!(self.expiry, Some(e) if e <= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use rand::Rng;

    fn item_with(usage_limit: u32, remaining_uses: u32, waste: bool) -> Item {
        Item {
            id: ItemId::from("I"),
            name: "I".to_string(),
            width: 5,
            depth: 5,
            height: 5,
            mass_g: 100,
            priority: 10,
            expiry: None,
            usage_limit,
            remaining_uses,
            preferred_zone: "Z".to_string(),
            waste,
            placement: None,
        }
    }

    #[derive(Clone, Debug)]
    struct ArbUsage {
        usage_limit: u32,
        decrements: u8,
    }

    impl Arbitrary for ArbUsage {
        fn arbitrary(g: &mut Gen) -> Self {
            ArbUsage {
                usage_limit: g.rng().gen_range(0..20),
                decrements: g.rng().gen_range(0..30),
            }
        }
    }

    /// Repeated decrements never take `remaining_uses` negative (it's
    /// unsigned, so this also means it never underflows), and once
    /// `waste` flips true it never flips back, regardless of how many
    /// more decrements follow.
    #[quickcheck]
    fn decrement_is_non_negative_and_waste_is_monotone(usage: ArbUsage) -> bool {
        let mut item = item_with(usage.usage_limit, usage.usage_limit, false);
        let mut waste_seen = false;
        for _ in 0..usage.decrements {
            item.decrement_usage();
            if item.waste {
                waste_seen = true;
            } else if waste_seen {
                return false;
            }
            if !item.usage_invariant_holds() {
                return false;
            }
        }
        true
    }

    #[test]
    fn decrement_usage_reports_depletion_exactly_once() {
        let mut item = item_with(1, 1, false);
        assert!(item.decrement_usage());
        assert_eq!(item.remaining_uses, 0);
        assert!(item.waste);
        assert!(!item.decrement_usage());
    }
}
