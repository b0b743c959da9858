//! crawl - headless dungeon NPC simulation.
//!
//! Single binary that provides:
//! - `crawl run` - simulate a populated dungeon and print its final hash
//! - `crawl verify` - replay the same scenario twice and compare every tick
//! - `crawl inspect` - dump one agent's state from a save file
//! - `crawl init` - write default config and definitions to edit

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use crawl_core::{AgentId, DeterministicRng, Facing, SplitMix64, Tile};
use crawl_sim::{Definitions, Formation, ReplayHarness, SaveGame, SimConfig, Simulation};
use crawl_world::{default_map, parse_map, render_map, GridWorld};

#[derive(Parser)]
#[command(name = "crawl")]
#[command(about = "Deterministic dungeon NPC simulation", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the scenario comes from. Shared by `run` and `verify`.
#[derive(clap::Args, Clone)]
struct Scenario {
    /// Dungeon seed (overrides the config file)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// ASCII map file; the built-in 16×16 dungeon when absent
    #[arg(long)]
    map: Option<PathBuf>,

    /// Creature/faction/behavior definitions (YAML); the built-in bestiary when absent
    #[arg(long)]
    defs: Option<PathBuf>,

    /// Simulation config (YAML); defaults when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Creatures to scatter over free floor tiles
    #[arg(long, default_value_t = 8)]
    creatures: usize,

    /// Also place the player party (it idles without commands)
    #[arg(long)]
    party: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        #[arg(long, default_value_t = 100)]
        ticks: u64,

        #[command(flatten)]
        scenario: Scenario,

        /// Resume from a save instead of building a fresh scenario
        #[arg(long, conflicts_with = "map")]
        load: Option<PathBuf>,

        /// Write a save file when done
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the world hash after every tick
        #[arg(long)]
        hashes: bool,

        /// Print the final map
        #[arg(long)]
        render: bool,
    },

    /// Replay a scenario twice and fail on the first diverging tick
    Verify {
        #[arg(long, default_value_t = 100)]
        ticks: u64,

        #[command(flatten)]
        scenario: Scenario,
    },

    /// Dump one agent from a save file as JSON
    Inspect {
        #[arg(long)]
        save: PathBuf,

        #[arg(long)]
        agent: u64,

        /// Definitions the save was written with
        #[arg(long)]
        defs: Option<PathBuf>,
    },

    /// Write default config and definitions files
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            ticks,
            scenario,
            load,
            save,
            hashes,
            render,
        } => run_simulation(&scenario, ticks, load.as_deref(), save.as_deref(), hashes, render),
        Commands::Verify { ticks, scenario } => verify(&scenario, ticks),
        Commands::Inspect { save, agent, defs } => inspect(&save, AgentId(agent), defs.as_deref()),
        Commands::Init { dir } => init_files(&dir),
    }
}

fn load_defs(path: Option<&Path>) -> Result<Definitions> {
    let defs = match path {
        Some(path) => Definitions::load(path)
            .with_context(|| format!("loading definitions from {}", path.display()))?,
        None => Definitions::builtin()?,
    };
    Ok(defs)
}

fn load_map(path: Option<&Path>) -> Result<GridWorld> {
    let world = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading map {}", path.display()))?;
            let rows: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
            parse_map(&rows)?
        }
        None => parse_map(&default_map())?,
    };
    Ok(world)
}

fn build(scenario: &Scenario) -> Result<Simulation> {
    let config = match &scenario.config {
        Some(path) => SimConfig::load_or_default(path)?,
        None => SimConfig::default(),
    }
    .with_seed(scenario.seed);
    let defs = load_defs(scenario.defs.as_deref())?;
    let world = load_map(scenario.map.as_deref())?;

    let mut sim = Simulation::new(config, defs, world);
    populate(&mut sim, scenario)?;
    Ok(sim)
}

/// Scatter creatures over free floor tiles, drawn from a stream derived from the seed so the
/// same scenario always lands the same way.
fn populate(sim: &mut Simulation, scenario: &Scenario) -> Result<()> {
    let mut rng = SplitMix64::new(scenario.seed ^ 0x5eed_5ca7);
    let mut free: Vec<Tile> = sim
        .world()
        .tiles()
        .filter(|(_, t)| t.is_walkable() && t.trap.is_none() && t.teleport.is_none())
        .map(|(tile, _)| tile)
        .collect();
    let kinds: Vec<String> = sim.definitions().creatures.keys().cloned().collect();
    if kinds.is_empty() && scenario.creatures > 0 {
        bail!("definitions contain no creatures");
    }

    if scenario.party {
        if let Some(index) = rng.pick_index(free.len()) {
            let tile = free.swap_remove(index);
            let id = sim.spawn_party(Formation::standard(), tile, Facing::East, "party")?;
            tracing::info!(agent = %id, ?tile, "party placed");
        }
    }

    for n in 0..scenario.creatures {
        let Some(index) = rng.pick_index(free.len()) else {
            tracing::warn!(placed = n, "ran out of free tiles");
            break;
        };
        let tile = free.swap_remove(index);
        let kind = &kinds[n % kinds.len()];
        let facing = Facing::ALL[rng.range_inclusive(0, 3) as usize];
        // Large footprints may not fit every free tile.
        match sim.spawn(kind, tile, facing) {
            Ok(id) => tracing::debug!(agent = %id, %kind, ?tile, "placed"),
            Err(err) => tracing::warn!(%kind, ?tile, error = %err, "could not place creature"),
        }
    }
    Ok(())
}

fn run_simulation(
    scenario: &Scenario,
    ticks: u64,
    load: Option<&Path>,
    save: Option<&Path>,
    hashes: bool,
    render: bool,
) -> Result<()> {
    let mut sim = match load {
        Some(path) => {
            let save = SaveGame::load_from(path)
                .with_context(|| format!("reading save {}", path.display()))?;
            Simulation::from_save(save, load_defs(scenario.defs.as_deref())?)?
        }
        None => build(scenario)?,
    };
    tracing::info!(
        seed = sim.config().seed,
        agents = sim.agents().count(),
        ticks,
        "starting simulation"
    );

    for _ in 0..ticks {
        sim.step_once();
        if hashes {
            println!("{:>6} {:016x}", sim.tick(), sim.world_hash());
        }
    }

    let living = sim.living().count();
    println!("Simulation finished");
    println!("===================");
    println!("Tick:      {}", sim.tick());
    println!("Agents:    {} ({} alive)", sim.agents().count(), living);
    println!("Events:    {}", sim.bus().published_total());
    println!("Hash:      {:016x}", sim.world_hash());
    if render {
        println!();
        for row in render_map(sim.world()) {
            println!("{row}");
        }
    }

    if let Some(path) = save {
        sim.to_save()
            .save_to(path)
            .with_context(|| format!("writing save {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved");
    }
    Ok(())
}

fn verify(scenario: &Scenario, ticks: u64) -> Result<()> {
    // Fail on a bad scenario before replaying it.
    build(scenario)?;
    let harness = ReplayHarness::new(|| {
        build(scenario).map_err(|e| crawl_core::SimError::data_integrity("scenario", e.to_string()))
    });
    let hash = harness.run(ticks)?;
    println!("deterministic over {ticks} ticks, final hash {hash:016x}");
    Ok(())
}

fn inspect(save: &Path, agent: AgentId, defs: Option<&Path>) -> Result<()> {
    let game = SaveGame::load_from(save).with_context(|| format!("reading save {}", save.display()))?;
    let sim = Simulation::from_save(game, load_defs(defs)?)?;
    let Some(dump) = sim.inspect(agent) else {
        bail!("no agent {agent} in {}", save.display());
    };
    println!("{}", dump.to_json()?);
    Ok(())
}

fn init_files(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let config_path = dir.join("crawl.yaml");
    if !config_path.exists() {
        std::fs::write(&config_path, serde_yaml::to_string(&SimConfig::default())?)?;
    }
    let defs_path = dir.join("dungeon.yaml");
    if !defs_path.exists() {
        std::fs::write(&defs_path, Definitions::builtin()?.to_yaml_string()?)?;
    }
    let map_path = dir.join("dungeon.map");
    if !map_path.exists() {
        std::fs::write(&map_path, default_map().join("\n") + "\n")?;
    }

    println!("Initialized crawl files in {}", dir.display());
    println!();
    println!("Created:");
    println!("  crawl.yaml   - simulation config");
    println!("  dungeon.yaml - creatures, factions, loot and behaviors");
    println!("  dungeon.map  - ASCII map");
    println!();
    println!("Next steps:");
    println!("  crawl run --map dungeon.map --defs dungeon.yaml --config crawl.yaml --ticks 200");

    Ok(())
}
