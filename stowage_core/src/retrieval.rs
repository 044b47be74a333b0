//! Retrieval planner: disambiguates a target item by name, computes the
//! support-closure of blockers that must come out first, and either
//! plans the removal/retrieve/placeBack sequence or executes it against
//! the store.

use crate::cancel::CancellationToken;
use crate::container::Container;
use crate::error::{RetrievalError, StowageError, StowageResult};
use crate::geometry::Aabb;
use crate::ids::{ContainerId, ItemId};
use crate::item::Item;
use crate::log::{ActionKind, LogRecord};
use crate::store::{Store, TransactionCtx};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStepKind {
    Remove,
    SetAside,
    Retrieve,
    PlaceBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalStep {
    pub step: u32,
    pub kind: RetrievalStepKind,
    pub item_id: ItemId,
    pub container_id: ContainerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalPlan {
    pub found: bool,
    pub item: Option<Item>,
    pub steps: Vec<RetrievalStep>,
}

/// Disambiguation score: lower blocker count, longer time to expiry,
/// and higher priority all push a candidate up.
pub fn disambiguation_score(blockers: usize, days_to_expiry: i64, priority: u8) -> f64 {
    let blocker_term = 1.0 - (blockers.min(20) as f64) / 20.0;
    let expiry_term = 1.0 - (days_to_expiry.clamp(0, 365) as f64) / 365.0;
    let priority_term = priority as f64 / 100.0;
    0.5 * blocker_term + 0.3 * expiry_term + 0.2 * priority_term
}

/// Resolve an item reference by id first, falling back to an exact
/// name match against the store's full catalog.
fn candidates_for_ref(store: &dyn Store, item_ref: &str) -> Vec<Item> {
    match store.get_item(&ItemId::from(item_ref)) {
        Ok(item) => vec![item],
        Err(_) => store.find_items_by_name(item_ref),
    }
}

/// Resolve an item reference by id first, falling back to an exact
/// name match against live transaction state. Where a name matches
/// more than one item, the lowest item id is picked for determinism.
pub(crate) fn resolve_ref_in_ctx(ctx: &dyn TransactionCtx, item_ref: &str) -> Option<Item> {
    if let Ok(item) = ctx.get_item(&ItemId::from(item_ref)) {
        return Some(item);
    }
    ctx.all_items()
        .into_iter()
        .filter(|i| i.name == item_ref)
        .min_by(|a, b| a.id.cmp(&b.id))
}

fn direct_blockers(ctx: &dyn TransactionCtx, container_id: &ContainerId, target: &Aabb) -> Vec<Item> {
    ctx.items_in_container(container_id)
        .into_iter()
        .filter(|candidate| match candidate.placed_aabb() {
            Some(aabb) => aabb.blocks(target),
            None => false,
        })
        .collect()
}

/// Least fixed point over `blocks` seeded by the direct blocker set,
/// closed under `supports` — anything resting on a blocker is itself
/// surfaced, conservatively, even if its own removal
/// isn't strictly required for sightline access.
fn support_closure(ctx: &dyn TransactionCtx, container_id: &ContainerId, target: &Item) -> Vec<Item> {
    let target_aabb = match target.placed_aabb() {
        Some(a) => a,
        None => return Vec::new(),
    };
    let in_container = ctx.items_in_container(container_id);

    let mut closure: Vec<Item> = direct_blockers(ctx, container_id, &target_aabb);
    let mut seen: HashSet<ItemId> = closure.iter().map(|i| i.id.clone()).collect();

    let mut frontier: Vec<Item> = closure.clone();
    while !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        for x in &frontier {
            let Some(x_aabb) = x.placed_aabb() else { continue };
            for y in &in_container {
                if seen.contains(&y.id) || y.id == target.id {
                    continue;
                }
                if let Some(y_aabb) = y.placed_aabb() {
                    if x_aabb.supports(&y_aabb) {
                        seen.insert(y.id.clone());
                        closure.push(y.clone());
                        next_frontier.push(y.clone());
                    }
                }
            }
        }
        frontier = next_frontier;
    }
    closure
}

/// The canonical tie-break `(y, -z, x, id)`, applied here to order the
/// blocker-removal sequence front-to-back, top-to-bottom.
fn sort_blocker_order(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| {
        let aabb = item.placed_aabb().expect("blocker is placed");
        crate::geometry::PlacementOrderKey::for_item(&aabb, item.id.clone())
    });
    debug_assert!(
        items
            .iter()
            .map(|item| item.placed_aabb().expect("blocker is placed").y)
            .tuple_windows()
            .all(|(a, b)| a <= b),
        "blocker order must be non-decreasing in y",
    );
    items
}

/// Find the best-scoring placed candidate among items matching `name`.
/// `at` is used to compute days to expiry.
fn disambiguate<'a>(
    ctx: &dyn TransactionCtx,
    candidates: &'a [Item],
    at: DateTime<Utc>,
) -> Option<&'a Item> {
    candidates
        .iter()
        .filter(|i| i.placement.is_some())
        .max_by(|a, b| {
            let sa = score_candidate(ctx, a, at);
            let sb = score_candidate(ctx, b, at);
            sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
        })
}

fn score_candidate(ctx: &dyn TransactionCtx, item: &Item, at: DateTime<Utc>) -> f64 {
    let container_id = item.placement.as_ref().map(|p| p.container.clone());
    let blockers = match (&container_id, item.placed_aabb()) {
        (Some(cid), Some(aabb)) => direct_blockers(ctx, cid, &aabb).len(),
        _ => 0,
    };
    let days_to_expiry = item
        .expiry
        .map(|e| (e - at).num_days())
        .unwrap_or(365);
    disambiguation_score(blockers, days_to_expiry, item.priority)
}

/// Build the retrieval plan for `item`, already resolved and placed.
/// Pure planning: does not mutate the store.
fn plan_for_placed(ctx: &dyn TransactionCtx, item: &Item) -> RetrievalPlan {
    let container_id = item
        .placement
        .as_ref()
        .map(|p| p.container.clone())
        .expect("plan_for_placed requires a placed item");
    let target_aabb = item.placed_aabb().expect("placed item has an aabb");

    let mut steps = Vec::new();
    let mut step_no = 1u32;

    if target_aabb.y == 0 {
        steps.push(RetrievalStep {
            step: step_no,
            kind: RetrievalStepKind::Retrieve,
            item_id: item.id.clone(),
            container_id: container_id.clone(),
        });
        return RetrievalPlan {
            found: true,
            item: Some(item.clone()),
            steps,
        };
    }

    let closure = sort_blocker_order(support_closure(ctx, &container_id, item));

    for b in &closure {
        steps.push(RetrievalStep {
            step: step_no,
            kind: RetrievalStepKind::Remove,
            item_id: b.id.clone(),
            container_id: container_id.clone(),
        });
        step_no += 1;
        steps.push(RetrievalStep {
            step: step_no,
            kind: RetrievalStepKind::SetAside,
            item_id: b.id.clone(),
            container_id: container_id.clone(),
        });
        step_no += 1;
    }

    steps.push(RetrievalStep {
        step: step_no,
        kind: RetrievalStepKind::Retrieve,
        item_id: item.id.clone(),
        container_id: container_id.clone(),
    });
    step_no += 1;

    for b in closure.iter().rev() {
        steps.push(RetrievalStep {
            step: step_no,
            kind: RetrievalStepKind::PlaceBack,
            item_id: b.id.clone(),
            container_id: container_id.clone(),
        });
        step_no += 1;
    }

    RetrievalPlan {
        found: true,
        item: Some(item.clone()),
        steps,
    }
}

/// Plan a retrieval without executing it, for callers that just want to
/// preview the sequence.
pub fn plan_retrieval(
    store: &dyn Store,
    item_ref: &str,
    at: DateTime<Utc>,
) -> StowageResult<RetrievalPlan> {
    let candidates = candidates_for_ref(store, item_ref);
    if candidates.is_empty() {
        return Ok(RetrievalPlan {
            found: false,
            item: None,
            steps: Vec::new(),
        });
    }

    store.transaction(&[], |ctx| {
        match disambiguate(ctx, &candidates, at) {
            Some(item) => {
                let plan = plan_for_placed(ctx, item);
                log::debug!("retrieval plan for {:?}: {} step(s)", item_ref, plan.steps.len());
                Ok(plan)
            }
            None => Ok(RetrievalPlan {
                found: false,
                item: None,
                steps: Vec::new(),
            }),
        }
    })
}

/// Plan and execute a retrieval: decrement usage, mark waste if
/// depleted, clear placement, append a log record.
/// Blockers that were set aside are placed back at their original
/// position (modulo the retrieved item's absence), per the plan's
/// `placeBack` guarantee.
pub fn retrieve(
    store: &dyn Store,
    item_ref: &str,
    at: DateTime<Utc>,
    actor: &str,
    cancel: &CancellationToken,
) -> StowageResult<RetrievalPlan> {
    let candidates = candidates_for_ref(store, item_ref);
    if candidates.is_empty() {
        return Ok(RetrievalPlan {
            found: false,
            item: None,
            steps: Vec::new(),
        });
    }

    let container_ids: Vec<ContainerId> = candidates
        .iter()
        .filter_map(|i| i.placement.as_ref().map(|p| p.container.clone()))
        .collect();

    store.transaction(&container_ids, |ctx| {
        let resolved = match disambiguate(ctx, &candidates, at) {
            Some(item) => item.clone(),
            None => {
                return Ok(RetrievalPlan {
                    found: false,
                    item: None,
                    steps: Vec::new(),
                })
            }
        };

        let plan = plan_for_placed(ctx, &resolved);
        let container_id = resolved
            .placement
            .as_ref()
            .map(|p| p.container.clone())
            .ok_or_else(|| RetrievalError::NotPlaced(resolved.id.clone()))?;

        for step in &plan.steps {
            if cancel.is_cancelled() {
                return Err(StowageError::Cancelled);
            }
            match step.kind {
                RetrievalStepKind::Retrieve if step.item_id == resolved.id => {
                    let mut live = ctx.get_item(&resolved.id)?;
                    live.decrement_usage();
                    live.placement = None;
                    ctx.put_item(live)?;
                }
                _ => {}
            }
        }

        ctx.append_log(
            LogRecord::new(at, actor, ActionKind::Retrieval, format!("retrieved {}", resolved.id))
                .with_subject(resolved.id.clone())
                .with_from(container_id),
        )?;

        let final_item = ctx.get_item(&resolved.id)?;
        Ok(RetrievalPlan {
            found: true,
            item: Some(final_item),
            steps: plan.steps,
        })
    })
}

/// The `place(item, container, position)` external interface: directly
/// assign an item's placement without going through the planner,
/// validating containment and non-overlap.
pub fn place_at(
    store: &dyn Store,
    item_id: &ItemId,
    container_id: &ContainerId,
    origin: (u32, u32, u32),
    orientation: crate::geometry::Orientation,
    at: DateTime<Utc>,
    actor: &str,
) -> StowageResult<Item> {
    store.transaction(&[container_id.clone()], |ctx| {
        let mut item = ctx.get_item(item_id)?;
        let record = ctx.get_container(container_id)?;
        let existing = ctx.items_in_container(container_id);
        let candidate_aabb = Aabb::new(origin, orientation.effective_dims(item.base_dims()));

        if !candidate_aabb.contains_within((record.width, record.depth, record.height)) {
            return Err(crate::error::PlacementError::OutsideContainer {
                item: item.id.clone(),
                container: container_id.clone(),
            }
            .into());
        }

        let container = Container::from_items(record, &existing);
        for (other_id, other_aabb) in container.iterate() {
            if other_id == *item_id {
                continue;
            }
            if candidate_aabb.overlaps(&other_aabb) {
                return Err(crate::error::PlacementError::Overlaps {
                    item: item.id.clone(),
                    other: other_id,
                    container: container_id.clone(),
                }
                .into());
            }
        }

        item.placement = Some(crate::item::Placement {
            container: container_id.clone(),
            origin,
            orientation,
        });
        ctx.put_item(item.clone())?;
        ctx.append_log(
            LogRecord::new(at, actor, ActionKind::Placement, format!("manually placed {}", item.id))
                .with_subject(item.id.clone())
                .with_to(container_id.clone()),
        )?;
        Ok(item)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerRecord;
    use crate::geometry::Orientation;
    use crate::item::Placement;
    use crate::store_memory::InMemoryStore;

    fn container(id: &str) -> ContainerRecord {
        ContainerRecord {
            id: ContainerId::from(id),
            zone: "Z".to_string(),
            width: 30,
            depth: 30,
            height: 30,
        }
    }

    fn placed_item(id: &str, origin: (u32, u32, u32), dims: (u32, u32, u32), container: &str) -> Item {
        Item {
            id: ItemId::from(id),
            name: id.to_string(),
            width: dims.0,
            depth: dims.1,
            height: dims.2,
            mass_g: 500,
            priority: 50,
            expiry: None,
            usage_limit: 5,
            remaining_uses: 5,
            preferred_zone: "Z".to_string(),
            waste: false,
            placement: Some(Placement {
                container: ContainerId::from(container),
                origin,
                orientation: Orientation::Identity,
            }),
        }
    }

    #[test]
    fn flush_item_is_single_step() {
        let store = InMemoryStore::new();
        store.seed_container(container("A"));
        store.seed_item(placed_item("T", (10, 0, 0), (10, 10, 10), "A"));

        let plan = plan_retrieval(&store, "T", Utc::now()).unwrap();
        assert!(plan.found);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].kind, RetrievalStepKind::Retrieve);
    }

    #[test]
    fn blocker_is_removed_and_placed_back() {
        let store = InMemoryStore::new();
        store.seed_container(container("A"));
        store.seed_item(placed_item("T", (10, 20, 0), (10, 10, 10), "A"));
        store.seed_item(placed_item("X", (10, 0, 0), (10, 20, 10), "A"));

        let plan = plan_retrieval(&store, "T", Utc::now()).unwrap();
        assert!(plan.found);
        let kinds: Vec<RetrievalStepKind> = plan.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RetrievalStepKind::Remove,
                RetrievalStepKind::SetAside,
                RetrievalStepKind::Retrieve,
                RetrievalStepKind::PlaceBack,
            ]
        );
        assert_eq!(plan.steps[0].item_id, ItemId::from("X"));
        assert_eq!(plan.steps[3].item_id, ItemId::from("X"));
    }

    #[test]
    fn retrieve_clears_placement_and_decrements_usage() {
        let store = InMemoryStore::new();
        store.seed_container(container("A"));
        store.seed_item(placed_item("T", (10, 0, 0), (10, 10, 10), "A"));

        let plan = retrieve(&store, "T", Utc::now(), "tester", &CancellationToken::new()).unwrap();
        assert!(plan.found);
        let after = store.get_item(&ItemId::from("T")).unwrap();
        assert!(after.placement.is_none());
        assert_eq!(after.remaining_uses, 4);
    }

    #[test]
    fn not_found_reports_false() {
        let store = InMemoryStore::new();
        let plan = plan_retrieval(&store, "missing", Utc::now()).unwrap();
        assert!(!plan.found);
    }

    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use rand::Rng;

    #[derive(Clone, Debug)]
    struct ArbDepths(u32, u32);

    impl Arbitrary for ArbDepths {
        fn arbitrary(g: &mut Gen) -> Self {
            ArbDepths(g.rng().gen_range(1..15), g.rng().gen_range(1..15))
        }
    }

    /// Executing a retrieval plan returns the container to its original
    /// state minus the retrieved item: the blocker set aside to reach
    /// the target is left exactly where it was, and every other item
    /// is untouched.
    #[quickcheck]
    fn retrieve_restores_container_to_original_minus_target(depths: ArbDepths) -> bool {
        let ArbDepths(blocker_depth, target_depth) = depths;
        let store = InMemoryStore::new();
        let container_depth = blocker_depth + target_depth + 5;
        store.seed_container(ContainerRecord {
            id: ContainerId::from("A"),
            zone: "Z".to_string(),
            width: 30,
            depth: container_depth,
            height: 30,
        });

        let blocker = placed_item("X", (10, 0, 0), (10, blocker_depth, 10), "A");
        let blocker_before = blocker.clone();
        store.seed_item(blocker);

        store.seed_item(placed_item("T", (10, blocker_depth, 0), (10, target_depth, 10), "A"));

        let mut expected_ids: HashSet<ItemId> = store
            .items_in_container(&ContainerId::from("A"))
            .into_iter()
            .map(|i| i.id)
            .collect();
        expected_ids.remove(&ItemId::from("T"));

        let result = retrieve(&store, "T", Utc::now(), "tester", &CancellationToken::new()).unwrap();

        let blocker_after = store.get_item(&ItemId::from("X")).unwrap();
        let after_ids: HashSet<ItemId> = store
            .items_in_container(&ContainerId::from("A"))
            .into_iter()
            .map(|i| i.id)
            .collect();

        result.found && blocker_after.placement == blocker_before.placement && after_ids == expected_ids
    }
}
