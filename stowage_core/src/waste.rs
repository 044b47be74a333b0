//! Waste return planner: identify waste items, select a subset for
//! undocking under mass/volume caps, concatenate their retrieval plans,
//! and complete undocking by removing them from the store.

use crate::config::{KnapsackMode, StowageConfig};
use crate::error::StowageResult;
use crate::ids::{ContainerId, ItemId};
use crate::item::Item;
use crate::log::{ActionKind, LogRecord};
use crate::retrieval::{self, RetrievalStep};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub fn identify_waste(store: &dyn Store) -> Vec<Item> {
    store.items_waste()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteSelection {
    pub item_id: ItemId,
    pub mass_g: u64,
    pub volume: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnPlan {
    pub selected: Vec<WasteSelection>,
    pub retrieval_steps: Vec<RetrievalStep>,
    pub total_volume: u64,
    pub total_mass_g: u64,
}

/// Greedy knapsack over waste items sorted by mass descending, bounded
/// by `max_mass_g` and the undocking container's interior volume.
/// [`KnapsackMode::DynamicProgramming`] is
/// available as an opt-in alternative; the greedy baseline is what the
/// test suite pins.
fn select_greedy(mut waste: Vec<Item>, max_mass_g: u64, max_volume: u64) -> Vec<Item> {
    waste.sort_by(|a, b| b.mass_g.cmp(&a.mass_g).then_with(|| a.id.cmp(&b.id)));
    let mut mass_used = 0u64;
    let mut volume_used = 0u64;
    let mut selected = Vec::new();
    for item in waste {
        let mass_g = item.mass_g;
        let volume = item.volume();
        if mass_used + mass_g <= max_mass_g && volume_used + volume <= max_volume {
            mass_used += mass_g;
            volume_used += volume;
            log::debug!("return plan selects {}", item.id);
            selected.push(item);
        } else {
            log::debug!("return plan skips {} (over mass or volume cap)", item.id);
        }
    }
    selected
}

/// 0/1 knapsack by dynamic programming over mass, maximizing count of
/// items selected within the mass cap, then filtered again by the
/// volume cap in mass-descending order (volume isn't part of the DP
/// state to keep the table a single integer axis).
fn select_dynamic_programming(waste: Vec<Item>, max_mass_g: u64, max_volume: u64) -> Vec<Item> {
    let capacity = max_mass_g.min(u32::MAX as u64) as usize;
    let n = waste.len();
    let mut dp = vec![vec![0u64; capacity + 1]; n + 1];
    for i in 1..=n {
        let w = (waste[i - 1].mass_g.min(capacity as u64)) as usize;
        let v = waste[i - 1].mass_g;
        for c in 0..=capacity {
            dp[i][c] = dp[i - 1][c];
            if w <= c {
                dp[i][c] = dp[i][c].max(dp[i - 1][c - w] + v);
            }
        }
    }

    let mut chosen = vec![false; n];
    let mut c = capacity;
    for i in (1..=n).rev() {
        if dp[i][c] != dp[i - 1][c] {
            chosen[i - 1] = true;
            let w = (waste[i - 1].mass_g.min(capacity as u64)) as usize;
            c = c.saturating_sub(w);
        }
    }

    let picked: Vec<Item> = waste
        .into_iter()
        .zip(chosen)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect();
    select_greedy(picked, max_mass_g, max_volume)
}

/// Build the return manifest: select waste items and concatenate each
/// selected item's retrieval plan into one monotone step sequence.
pub fn create_return_plan(
    store: &dyn Store,
    undocking_container: &ContainerId,
    at: DateTime<Utc>,
    max_mass_g: u64,
    config: &StowageConfig,
) -> StowageResult<ReturnPlan> {
    let container = store.get_container(undocking_container)?;
    let max_volume = container.width as u64 * container.depth as u64 * container.height as u64;

    let waste = store.items_waste();
    let selected_items = match config.knapsack_mode {
        KnapsackMode::GreedyMassDescending => select_greedy(waste, max_mass_g, max_volume),
        KnapsackMode::DynamicProgramming => select_dynamic_programming(waste, max_mass_g, max_volume),
    };

    let mut selected = Vec::new();
    let mut retrieval_steps = Vec::new();
    let mut total_volume = 0u64;
    let mut total_mass_g = 0u64;
    let mut step_no = 1u32;

    for item in &selected_items {
        let plan = retrieval::plan_retrieval(store, item.id.as_str(), at)?;
        for mut step in plan.steps {
            step.step = step_no;
            step_no += 1;
            retrieval_steps.push(step);
        }
        total_volume += item.volume();
        total_mass_g += item.mass_g;
        selected.push(WasteSelection {
            item_id: item.id.clone(),
            mass_g: item.mass_g,
            volume: item.volume(),
        });
    }

    Ok(ReturnPlan {
        selected,
        retrieval_steps,
        total_volume,
        total_mass_g,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndockingResult {
    pub removed_item_count: usize,
}

/// Remove every waste item currently in `undocking_container`,
/// appending one disposal log per item.
pub fn complete_undocking(
    store: &dyn Store,
    undocking_container: &ContainerId,
    at: DateTime<Utc>,
    actor: &str,
) -> StowageResult<UndockingResult> {
    store.transaction(&[undocking_container.clone()], |ctx| {
        let items = ctx.items_in_container(undocking_container);
        let mut removed = 0usize;
        for item in items {
            if !item.waste {
                continue;
            }
            ctx.remove_item(&item.id)?;
            ctx.append_log(
                LogRecord::new(at, actor, ActionKind::Disposal, format!("undocked {}", item.id))
                    .with_subject(item.id.clone())
                    .with_from(undocking_container.clone()),
            )?;
            removed += 1;
        }
        log::info!("undocking completed: {removed} waste item(s) removed from {undocking_container}");
        Ok(UndockingResult { removed_item_count: removed })
    })
}
