//! Placement planner: assigns items to containers by priority and zone
//! affinity, invoking single-swap rearrangement when an item doesn't fit
//! anywhere as-is.

use crate::cancel::CancellationToken;
use crate::config::StowageConfig;
use crate::container::{Container, ContainerRecord};
use crate::error::{InvalidInputError, StowageError, StowageResult};
use crate::geometry::{Orientation, ALL_ORIENTATIONS};
use crate::ids::{ContainerId, ItemId};
use crate::item::{Item, Placement};
use crate::log::{ActionKind, LogRecord};
use crate::store::{Store, TransactionCtx};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One placement decision: item `item_id` now sits at `position` with
/// `orientation` inside `container_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub item_id: ItemId,
    pub container_id: ContainerId,
    pub position: (u32, u32, u32),
    pub orientation: Orientation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RearrangementAction {
    Remove,
    Place,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RearrangementStep {
    pub step: u32,
    pub action: RearrangementAction,
    pub item_id: ItemId,
    pub from_container: Option<ContainerId>,
    pub to_container: Option<ContainerId>,
    pub position: Option<(u32, u32, u32)>,
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementOutcome {
    pub placements: Vec<PlacementRecord>,
    pub rearrangements: Vec<RearrangementStep>,
}

/// Candidate container for one item: its record plus the items currently
/// placed in it, as seen by the in-progress transaction.
struct Candidate {
    record: ContainerRecord,
    items: Vec<Item>,
}

impl Candidate {
    fn free_volume(&self) -> u64 {
        let container = Container::from_items(self.record.clone(), &self.items);
        container.free_volume()
    }

    fn try_fit(&self, dims: (u32, u32, u32)) -> Option<((u32, u32, u32), Orientation)> {
        let container = Container::from_items(self.record.clone(), &self.items);
        for orientation in ALL_ORIENTATIONS {
            let effective = orientation.effective_dims(dims);
            if let Some(origin) = container.first_fit(effective) {
                return Some((origin, orientation));
            }
        }
        None
    }
}

/// Evaluate every candidate (already sorted by descending free volume,
/// so `index` is the tie-break that matters) across a bounded worker
/// pool, then merge with a stable `min`-by-index selector so the result
/// is identical to a serial left-to-right scan — reducing with a stable
/// argmax rather than racing the first worker to finish.
fn evaluate_candidates_parallel(
    candidates: &[Candidate],
    dims: (u32, u32, u32),
    pool_size: usize,
) -> Option<(usize, (u32, u32, u32), Orientation)> {
    if candidates.is_empty() {
        return None;
    }
    let workers = pool_size.max(1).min(candidates.len());
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::scope(|scope| {
        let chunk_size = (candidates.len() + workers - 1) / workers;
        for (chunk_idx, chunk) in candidates.chunks(chunk_size).enumerate() {
            let tx = tx.clone();
            let base = chunk_idx * chunk_size;
            scope.spawn(move || {
                for (offset, candidate) in chunk.iter().enumerate() {
                    if let Some((origin, orientation)) = candidate.try_fit(dims) {
                        tx.send(Some((base + offset, origin, orientation))).ok();
                        return;
                    }
                }
                tx.send(None).ok();
            });
        }
    });
    drop(tx);
    rx.iter()
        .flatten()
        .min_by_key(|(idx, _, _)| *idx)
}

fn sort_candidates_by_free_volume(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.free_volume()
            .cmp(&a.free_volume())
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    candidates
}

fn load_candidates(
    ctx: &dyn TransactionCtx,
    container_ids: &[ContainerId],
    preferred_zone: &str,
) -> StowageResult<Vec<Candidate>> {
    let mut all = Vec::new();
    for id in container_ids {
        let record = ctx.get_container(id)?;
        let items = ctx.items_in_container(id);
        all.push(Candidate { record, items });
    }
    let zoned: Vec<Candidate> = all
        .iter()
        .filter(|c| c.record.zone == preferred_zone)
        .map(|c| Candidate {
            record: c.record.clone(),
            items: c.items.clone(),
        })
        .collect();
    Ok(sort_candidates_by_free_volume(if zoned.is_empty() { all } else { zoned }))
}

fn worker_pool_size(config: &StowageConfig) -> usize {
    config
        .worker_pool_size
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
}

/// Attempt single-swap rearrangement for `item`, which didn't fit
/// anywhere as-is. Returns the steps and the final placement if a victim
/// could be displaced and re-homed; `None` if no victim works, in which
/// case `item` stays unplaced — that outcome is not an error.
fn try_rearrangement(
    ctx: &mut dyn TransactionCtx,
    item: &Item,
    container_ids: &[ContainerId],
    max_victims: usize,
) -> StowageResult<Option<(Vec<RearrangementStep>, PlacementRecord)>> {
    let mut victims: Vec<Item> = Vec::new();
    for id in container_ids {
        for candidate in ctx.items_in_container(id) {
            if candidate.priority < item.priority {
                victims.push(candidate);
            }
        }
    }
    victims.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    if victims.len() > max_victims {
        log::warn!(
            "rearrangement search for {} truncated to {max_victims} of {} eligible victims",
            item.id,
            victims.len(),
        );
        victims.truncate(max_victims);
    }

    for victim in victims {
        let victim_placement = match &victim.placement {
            Some(p) => p.clone(),
            None => continue,
        };
        let home_id = victim_placement.container.clone();

        // Retry the new item with the victim conceptually removed.
        let mut items_without_victim = ctx.items_in_container(&home_id);
        items_without_victim.retain(|i| i.id != victim.id);
        let home_record = ctx.get_container(&home_id)?;
        let home_candidate = Candidate {
            record: home_record.clone(),
            items: items_without_victim,
        };
        let Some((new_origin, new_orientation)) = home_candidate.try_fit(item.base_dims()) else {
            continue;
        };

        // Find an alternate home for the victim, any container but this one.
        let mut alt_found = None;
        for alt_id in container_ids {
            if *alt_id == home_id {
                continue;
            }
            let alt_record = ctx.get_container(alt_id)?;
            let alt_items = ctx.items_in_container(alt_id);
            let alt_candidate = Candidate {
                record: alt_record,
                items: alt_items,
            };
            if let Some((alt_origin, alt_orientation)) = alt_candidate.try_fit(victim.base_dims()) {
                alt_found = Some((alt_id.clone(), alt_origin, alt_orientation));
                break;
            }
        }

        let Some((alt_id, alt_origin, alt_orientation)) = alt_found else {
            continue;
        };

        let mut new_item = item.clone();
        new_item.placement = Some(Placement {
            container: home_id.clone(),
            origin: new_origin,
            orientation: new_orientation,
        });
        let mut moved_victim = victim.clone();
        moved_victim.placement = Some(Placement {
            container: alt_id.clone(),
            origin: alt_origin,
            orientation: alt_orientation,
        });

        ctx.put_item(moved_victim)?;
        ctx.put_item(new_item)?;

        let steps = vec![
            RearrangementStep {
                step: 1,
                action: RearrangementAction::Remove,
                item_id: victim.id.clone(),
                from_container: Some(home_id.clone()),
                to_container: None,
                position: Some(victim_placement.origin),
                orientation: Some(victim_placement.orientation),
            },
            RearrangementStep {
                step: 2,
                action: RearrangementAction::Place,
                item_id: item.id.clone(),
                from_container: None,
                to_container: Some(home_id.clone()),
                position: Some(new_origin),
                orientation: Some(new_orientation),
            },
            RearrangementStep {
                step: 3,
                action: RearrangementAction::Place,
                item_id: victim.id.clone(),
                from_container: None,
                to_container: Some(alt_id.clone()),
                position: Some(alt_origin),
                orientation: Some(alt_orientation),
            },
        ];
        let placement = PlacementRecord {
            item_id: item.id.clone(),
            container_id: home_id,
            position: new_origin,
            orientation: new_orientation,
        };
        return Ok(Some((steps, placement)));
    }
    Ok(None)
}

fn validate_request(items: &[Item]) -> StowageResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id.clone()) {
            return Err(InvalidInputError::DuplicateItemId(item.id.clone()).into());
        }
    }
    Ok(())
}

/// Plan and execute placement for a batch of unplaced items against a
/// fixed set of already-registered containers.
pub fn place_items(
    store: &dyn Store,
    items: Vec<Item>,
    container_ids: &[ContainerId],
    now: DateTime<Utc>,
    cancel: &CancellationToken,
    config: &StowageConfig,
) -> StowageResult<PlacementOutcome> {
    validate_request(&items)?;

    let mut sorted_items = items;
    sorted_items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.volume().cmp(&a.volume()))
            .then_with(|| a.id.cmp(&b.id))
    });

    let pool_size = worker_pool_size(config);

    store.transaction(container_ids, |ctx| {
        let mut outcome = PlacementOutcome::default();

        for item in &sorted_items {
            if cancel.is_cancelled() {
                return Err(StowageError::Cancelled);
            }

            let candidates = load_candidates(ctx, container_ids, &item.preferred_zone)?;
            if let Some((idx, origin, orientation)) =
                evaluate_candidates_parallel(&candidates, item.base_dims(), pool_size)
            {
                let container_id = candidates[idx].record.id.clone();
                let mut placed = item.clone();
                placed.placement = Some(Placement {
                    container: container_id.clone(),
                    origin,
                    orientation,
                });
                ctx.put_item(placed)?;
                ctx.append_log(
                    LogRecord::new(now, "planner", ActionKind::Placement, format!("placed {} in {container_id}", item.id))
                        .with_subject(item.id.clone())
                        .with_to(container_id.clone()),
                )?;
                log::info!("placed {} in {container_id}", item.id);
                outcome.placements.push(PlacementRecord {
                    item_id: item.id.clone(),
                    container_id,
                    position: origin,
                    orientation,
                });
                continue;
            }

            if let Some((steps, placement)) =
                try_rearrangement(ctx, item, container_ids, config.max_rearrangement_victims)?
            {
                ctx.append_log(
                    LogRecord::new(now, "planner", ActionKind::Rearrangement, format!("rearranged to place {}", item.id))
                        .with_subject(item.id.clone())
                        .with_to(placement.container_id.clone()),
                )?;
                log::info!("rearranged to place {}", item.id);
                outcome.rearrangements.extend(steps);
                outcome.placements.push(placement);
            } else {
                log::debug!("no rearrangement victim freed room for {}", item.id);
            }
        }

        Ok(outcome)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Aabb;
    use crate::store_memory::InMemoryStore;

    fn container(id: &str, zone: &str, dims: (u32, u32, u32)) -> ContainerRecord {
        ContainerRecord {
            id: ContainerId::from(id),
            zone: zone.to_string(),
            width: dims.0,
            depth: dims.1,
            height: dims.2,
        }
    }

    fn item(id: &str, dims: (u32, u32, u32), priority: u8, zone: &str) -> Item {
        Item {
            id: ItemId::from(id),
            name: id.to_string(),
            width: dims.0,
            depth: dims.1,
            height: dims.2,
            mass_g: 1000,
            priority,
            expiry: None,
            usage_limit: 10,
            remaining_uses: 10,
            preferred_zone: zone.to_string(),
            waste: false,
            placement: None,
        }
    }

    #[test]
    fn trivial_placement() {
        let store = InMemoryStore::new();
        store.seed_container(container("A", "Z", (100, 100, 100)));
        let cfg = StowageConfig::default();
        let outcome = place_items(
            &store,
            vec![item("I", (10, 10, 10), 80, "Z")],
            &[ContainerId::from("A")],
            Utc::now(),
            &CancellationToken::new(),
            &cfg,
        )
        .unwrap();
        assert_eq!(outcome.placements.len(), 1);
        let p = &outcome.placements[0];
        assert_eq!(p.container_id, ContainerId::from("A"));
        assert_eq!(p.position, (0, 0, 0));
        assert_eq!(p.orientation, Orientation::Identity);
        assert!(outcome.rearrangements.is_empty());
    }

    #[test]
    fn zone_fallback() {
        let store = InMemoryStore::new();
        store.seed_container(container("A", "X", (100, 100, 100)));
        let cfg = StowageConfig::default();
        let outcome = place_items(
            &store,
            vec![item("I", (10, 10, 10), 50, "Y")],
            &[ContainerId::from("A")],
            Utc::now(),
            &CancellationToken::new(),
            &cfg,
        )
        .unwrap();
        assert_eq!(outcome.placements[0].container_id, ContainerId::from("A"));
    }

    #[test]
    fn rearrangement_swaps_lower_priority_victim() {
        let store = InMemoryStore::new();
        store.seed_container(container("A", "Z", (30, 30, 30)));
        store.seed_container(container("B", "Z", (30, 30, 30)));
        let mut low = item("L", (30, 30, 30), 10, "Z");
        low.placement = Some(Placement {
            container: ContainerId::from("A"),
            origin: (0, 0, 0),
            orientation: Orientation::Identity,
        });
        store.seed_item(low);

        let cfg = StowageConfig::default();
        let outcome = place_items(
            &store,
            vec![item("H", (30, 30, 30), 90, "Z")],
            &[ContainerId::from("A"), ContainerId::from("B")],
            Utc::now(),
            &CancellationToken::new(),
            &cfg,
        )
        .unwrap();

        assert_eq!(outcome.rearrangements.len(), 3);
        assert_eq!(outcome.placements.len(), 1);
        let placed = &outcome.placements[0];
        assert_eq!(placed.item_id, ItemId::from("H"));
        assert_eq!(placed.container_id, ContainerId::from("A"));

        let moved_low = store.get_item(&ItemId::from("L")).unwrap();
        assert_eq!(moved_low.placement.unwrap().container, ContainerId::from("B"));
    }

    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use rand::Rng;

    #[derive(Clone, Debug)]
    struct ArbItemSpec {
        width: u32,
        depth: u32,
        height: u32,
        priority: u8,
    }

    impl Arbitrary for ArbItemSpec {
        fn arbitrary(g: &mut Gen) -> Self {
            ArbItemSpec {
                width: g.rng().gen_range(1..10),
                depth: g.rng().gen_range(1..10),
                height: g.rng().gen_range(1..10),
                priority: g.rng().gen_range(0..100),
            }
        }
    }

    /// Every placement `place_items` produces stays within its
    /// container's interior and never overlaps another placement, no
    /// matter the item batch fed in.
    #[quickcheck]
    fn placements_never_overlap_or_escape_container(specs: Vec<ArbItemSpec>) -> bool {
        let specs: Vec<ArbItemSpec> = specs.into_iter().take(12).collect();
        if specs.is_empty() {
            return true;
        }
        let store = InMemoryStore::new();
        let dims = (40, 40, 40);
        store.seed_container(container("A", "Z", dims));
        let items: Vec<Item> = specs
            .iter()
            .enumerate()
            .map(|(i, s)| item(&format!("I{i}"), (s.width, s.depth, s.height), s.priority, "Z"))
            .collect();
        let cfg = StowageConfig::default();
        let outcome = place_items(
            &store,
            items,
            &[ContainerId::from("A")],
            Utc::now(),
            &CancellationToken::new(),
            &cfg,
        )
        .unwrap();

        let placed: Vec<Aabb> = outcome
            .placements
            .iter()
            .map(|p| store.get_item(&p.item_id).unwrap().placed_aabb().unwrap())
            .collect();

        let within = placed.iter().all(|aabb| aabb.contains_within(dims));
        let no_overlap = placed
            .iter()
            .enumerate()
            .all(|(i, a)| placed.iter().skip(i + 1).all(|b| !a.overlaps(b)));

        within && no_overlap
    }
}
