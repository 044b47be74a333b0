//! Pure scoring functions over an arrangement. These take
//! already-loaded containers/items rather than a store, so callers
//! (including tests) can score a hypothetical arrangement without a
//! transaction.

use crate::container::Container;
use crate::geometry::Aabb;
use crate::item::Item;

/// Used volume over interior volume, in `[0, 1]`.
pub fn space_utilization(container: &Container) -> f64 {
    if container.volume() == 0 {
        return 0.0;
    }
    container.used_volume() as f64 / container.volume() as f64
}

/// `1 / (1 + |blockers|)` for one item; `1.0` when nothing blocks it.
pub fn accessibility(target: &Aabb, others: &[Aabb]) -> f64 {
    let blockers = others.iter().filter(|o| o.blocks(target)).count();
    1.0 / (1.0 + blockers as f64)
}

/// Mean per-item accessibility across every placed item in `items`.
pub fn container_accessibility(items: &[Item]) -> f64 {
    let placed: Vec<Aabb> = items.iter().filter_map(|i| i.placed_aabb()).collect();
    if placed.is_empty() {
        return 1.0;
    }
    let sum: f64 = placed
        .iter()
        .map(|target| {
            let others: Vec<Aabb> = placed.iter().filter(|a| **a != *target).copied().collect();
            accessibility(target, &others)
        })
        .sum();
    sum / placed.len() as f64
}

/// `1` if the item rests on the floor or on a supporting item, else `0`.
pub fn stability(target: &Aabb, others: &[Aabb]) -> f64 {
    if target.on_floor() || others.iter().any(|o| o.supports(target)) {
        1.0
    } else {
        0.0
    }
}

/// Mean stability across every placed item.
pub fn container_stability(items: &[Item]) -> f64 {
    let placed: Vec<Aabb> = items.iter().filter_map(|i| i.placed_aabb()).collect();
    if placed.is_empty() {
        return 1.0;
    }
    let sum: f64 = placed
        .iter()
        .map(|target| {
            let others: Vec<Aabb> = placed.iter().filter(|a| **a != *target).copied().collect();
            stability(target, &others)
        })
        .sum();
    sum / placed.len() as f64
}

/// `mean over items of (1 - z/H) * (priority/100)`: rewards
/// high-priority items sitting low and near the front.
pub fn priority_distribution_score(items: &[Item], container_height: u32) -> f64 {
    if container_height == 0 {
        return 0.0;
    }
    let scored: Vec<f64> = items
        .iter()
        .filter_map(|i| {
            i.placed_aabb().map(|aabb| {
                let depth_term = 1.0 - (aabb.z as f64 / container_height as f64);
                depth_term * (i.priority as f64 / 100.0)
            })
        })
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().sum::<f64>() / scored.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerRecord;
    use crate::geometry::Orientation;
    use crate::ids::{ContainerId, ItemId};
    use crate::item::Placement;

    fn item(id: &str, origin: (u32, u32, u32), dims: (u32, u32, u32), priority: u8) -> Item {
        Item {
            id: ItemId::from(id),
            name: id.to_string(),
            width: dims.0,
            depth: dims.1,
            height: dims.2,
            mass_g: 100,
            priority,
            expiry: None,
            usage_limit: 1,
            remaining_uses: 1,
            preferred_zone: "Z".to_string(),
            waste: false,
            placement: Some(Placement {
                container: ContainerId::from("A"),
                origin,
                orientation: Orientation::Identity,
            }),
        }
    }

    #[test]
    fn space_utilization_matches_fraction_filled() {
        let record = ContainerRecord {
            id: ContainerId::from("A"),
            zone: "Z".to_string(),
            width: 10,
            depth: 10,
            height: 10,
        };
        let items = vec![item("I", (0, 0, 0), (5, 10, 10), 50)];
        let container = Container::from_items(record, &items);
        assert!((space_utilization(&container) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unblocked_item_is_fully_accessible() {
        let target = Aabb::new((0, 0, 0), (10, 10, 10));
        assert_eq!(accessibility(&target, &[]), 1.0);
    }

    #[test]
    fn floor_item_is_stable() {
        let target = Aabb::new((0, 0, 0), (10, 10, 10));
        assert_eq!(stability(&target, &[]), 1.0);
    }

    #[test]
    fn floating_unsupported_item_is_unstable() {
        let target = Aabb::new((0, 0, 10), (10, 10, 10));
        assert_eq!(stability(&target, &[]), 0.0);
    }

    #[test]
    fn priority_distribution_rewards_low_high_priority_items() {
        let items = vec![item("hi", (0, 0, 0), (5, 5, 5), 100)];
        let score = priority_distribution_score(&items, 10);
        assert!((score - 1.0).abs() < 1e-9);
    }
}
