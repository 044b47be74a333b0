//! Thin CLI over `stowage_core`'s `InMemoryStore`, demonstrating the
//! engine's request surface as subcommands: one `StructOpt` enum of
//! subcommands, `figment` config layering, `env_logger` for logging,
//! `anyhow` at the top level so `main` can just `?` its way through.

use anyhow::{Context, Result};
use chrono::Utc;
use stowage_core::container::ContainerRecord;
use stowage_core::item::Item;
use stowage_core::store_memory::InMemoryStore;
use stowage_core::{CancellationToken, ContainerId, Store, StowageConfig};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "stowage_cli", about = "Station cargo stowage engine")]
enum Command {
    /// Seed a container from a JSON `ContainerRecord` file and place items
    /// from a JSON `Vec<Item>` file against it.
    Place {
        #[structopt(long)]
        containers: std::path::PathBuf,
        #[structopt(long)]
        items: std::path::PathBuf,
    },
    /// Preview a retrieval plan for an item by id or name.
    Search {
        #[structopt(long)]
        containers: std::path::PathBuf,
        #[structopt(long)]
        items: std::path::PathBuf,
        item_ref: String,
    },
    /// List the current waste items.
    WasteIdentify {
        #[structopt(long)]
        containers: std::path::PathBuf,
        #[structopt(long)]
        items: std::path::PathBuf,
    },
    /// Advance the simulated clock by one or more days with no usages.
    SimulateDays {
        #[structopt(long)]
        containers: std::path::PathBuf,
        #[structopt(long)]
        items: std::path::PathBuf,
        #[structopt(long, default_value = "1")]
        days: u32,
    },
}

fn load_store(containers_path: &std::path::Path, items_path: &std::path::Path) -> Result<InMemoryStore> {
    let store = InMemoryStore::new();
    let containers: Vec<ContainerRecord> = serde_json::from_str(
        &std::fs::read_to_string(containers_path).context("reading containers file")?,
    )
    .context("parsing containers file")?;
    for c in containers {
        store.seed_container(c);
    }
    let items: Vec<Item> =
        serde_json::from_str(&std::fs::read_to_string(items_path).context("reading items file")?)
            .context("parsing items file")?;
    for i in items {
        store.seed_item(i);
    }
    Ok(store)
}

fn main() -> Result<()> {
    env_logger::init();
    let config: StowageConfig = StowageConfig::figment().extract().context("loading configuration")?;
    let cancel = CancellationToken::new();
    let now = Utc::now();

    match Command::from_args() {
        Command::Place { containers, items } => {
            let store = load_store(&containers, &items)?;
            let unplaced: Vec<Item> = store.list_items().into_iter().filter(|i| i.placement.is_none()).collect();
            let ids: Vec<ContainerId> = store.list_containers().into_iter().map(|c| c.id).collect();
            let outcome = stowage_core::place_items(&store, unplaced, &ids, now, &cancel, &config)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Search { containers, items, item_ref } => {
            let store = load_store(&containers, &items)?;
            let plan = stowage_core::search(&store, &item_ref, now)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::WasteIdentify { containers, items } => {
            let store = load_store(&containers, &items)?;
            let waste = stowage_core::identify_waste(&store);
            println!("{}", serde_json::to_string_pretty(&waste)?);
        }
        Command::SimulateDays { containers, items, days } => {
            let store = load_store(&containers, &items)?;
            let outcome = stowage_core::simulate_days(
                &store,
                stowage_core::lifecycle::SimulationTarget::Days(days),
                &[],
                now,
                "cli",
                &cancel,
            )?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
