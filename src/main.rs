//! Demo harness: load an authored world and let it run
//!
//! Loads the data bundle, wires the scripted policy provider as the
//! default brain, runs the simulation for a fixed number of ticks, and
//! prints what happened in the world as readable narration.

use clap::Parser;
use hollowden::core::config::SimulationConfig;
use hollowden::data::load_data_bundle;
use hollowden::event::Event;
use hollowden::providers::SimplePolicyProvider;
use hollowden::sim::WorldManager;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hollowden", about = "Data-driven sandbox world simulation")]
struct Args {
    /// Directory containing (or being) the data directory
    #[arg(long, default_value = "demos")]
    data_dir: PathBuf,

    /// Stop once the clock reaches this many ticks
    #[arg(long, default_value_t = 65)]
    max_ticks: u64,

    /// Optional TOML file overriding simulation constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log internals alongside the narration
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "hollowden=debug"
    } else {
        "hollowden=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = match &args.config {
        Some(path) => SimulationConfig::from_toml(&fs::read_to_string(path)?)?,
        None => SimulationConfig::default(),
    };

    let bundle = load_data_bundle(&args.data_dir)?;
    tracing::info!(
        templates = bundle.entity_templates.len(),
        recipes = bundle.recipes.len(),
        locations = bundle.world.locations.len(),
        "data bundle loaded"
    );

    let mut manager = WorldManager::from_bundle(bundle, config)?
        .with_default_provider(Box::new(SimplePolicyProvider));

    let events = manager.run(args.max_ticks);

    println!("=== simulation log ===");
    for event in &events {
        match event {
            Event::TickAdvanced { total_ticks, time } if total_ticks % 10 == 0 => {
                println!("[tick {total_ticks}] {time}");
            }
            Event::TickAdvanced { .. } => {}
            Event::ExecutorError { message } => println!("  !! {message}"),
            other => println!("  {other:?}"),
        }
    }

    // Narrate what each controlled actor saw happen around it.
    println!("\n=== recent activity ===");
    let actor_ids: Vec<_> = manager.world.entity_ids().to_vec();
    for actor_id in &actor_ids {
        let Some(actor) = manager.world.entity(actor_id) else {
            continue;
        };
        if actor.resolve_enabled_controller().is_none() {
            continue;
        }
        println!("{} ({}):", actor.name, actor_id);
        let views = manager.perception().visible_interactions(
            &manager.world,
            Some(manager.engine()),
            actor_id,
        );
        if views.is_empty() {
            println!("  (nothing recent)");
        }
        for view in views {
            println!("  [tick {}] {}", view.tick, view.text);
        }
    }

    Ok(())
}
