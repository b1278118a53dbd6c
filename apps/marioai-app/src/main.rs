//! MarioAI simulator client CLI.
//!
//! Provides three modes of operation:
//! - `run`: Launch (or connect to) the simulator and play episodes
//! - `show-config`: Print the default configuration as TOML
//! - `info`: Print workspace crate versions

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use marioai_agents::prelude::*;
use marioai_core::prelude::*;
use marioai_env::prelude::*;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Client harness for the MarioAI platform-game simulator.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play episodes against the simulator and print their results.
    Run {
        /// TOML configuration file. Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of episodes (overrides the configuration).
        #[arg(short = 'n', long)]
        episodes: Option<u32>,

        /// Agent to play with.
        #[arg(short, long, value_enum, default_value_t = AgentKind::Random)]
        agent: AgentKind,

        /// Seed for the random agents.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Simulator host (overrides the configuration).
        #[arg(long)]
        host: Option<String>,

        /// Simulator port (overrides the configuration).
        #[arg(long)]
        port: Option<u16>,

        /// Connect to an already running simulator instead of starting one.
        #[arg(long)]
        no_launch: bool,

        /// Write every per-frame reward and episode summary to this file as
        /// JSON.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print the default configuration.
    ShowConfig,

    /// Print crate information.
    Info,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AgentKind {
    /// Hold forward.
    Forward,
    /// Run forward, jumping and speeding at random.
    Random,
    /// Uniform over the currently legal canonical actions.
    Pool,
}

impl AgentKind {
    fn build(self, seed: u64) -> Box<dyn Agent> {
        match self {
            Self::Forward => Box::new(ConstantAgent::forward()),
            Self::Random => Box::new(RandomAgent::new(seed)),
            Self::Pool => Box::new(RandomPoolAgent::new(seed)),
        }
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

struct RunArgs {
    config: Option<PathBuf>,
    episodes: Option<u32>,
    agent: AgentKind,
    seed: u64,
    host: Option<String>,
    port: Option<u16>,
    no_launch: bool,
    json: Option<PathBuf>,
}

fn load_config(args: &RunArgs) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.experiment.episodes = episodes;
    }
    if let Some(host) = &args.host {
        config.session.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.session.port = port;
    }
    if args.no_launch {
        config.simulator.launch = false;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_episodes(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;
    let agent = args.agent.build(args.seed);
    info!(
        agent = agent.name(),
        episodes = config.experiment.episodes,
        "starting experiment"
    );

    let mut runner = Runner::launch(&config, agent).context("failed to reach the simulator")?;
    let rewards = runner.run().context("experiment failed")?;

    for (i, summary) in runner.summaries().iter().enumerate() {
        println!(
            "episode {}: steps={}, status={}, distance={:.1}, time_left={}, coins={}",
            i + 1,
            summary.steps,
            summary.fitness.status,
            summary.fitness.distance,
            summary.fitness.time_left,
            summary.fitness.coins
        );
    }

    if let Some(path) = &args.json {
        write_json(path, &rewards, runner.summaries())?;
        println!("rewards written to {}", path.display());
    }
    Ok(())
}

fn write_json(path: &Path, rewards: &[Vec<Fitness>], summaries: &[EpisodeSummary]) -> Result<()> {
    let episodes: Vec<_> = rewards
        .iter()
        .zip(summaries)
        .map(|(frames, summary)| {
            serde_json::json!({
                "steps": summary.steps,
                "cum_reward": summary.cum_reward,
                "fitness": summary.fitness,
                "rewards": frames,
            })
        })
        .collect();
    let text = serde_json::to_string_pretty(&episodes)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn show_config() -> Result<()> {
    print!("{}", HarnessConfig::default().to_toml_string()?);
    Ok(())
}

fn run_info() {
    println!("marioai v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  marioai-core     {}", env!("CARGO_PKG_VERSION"));
    println!("  marioai-gym      {}", env!("CARGO_PKG_VERSION"));
    println!("  marioai-env      {}", env!("CARGO_PKG_VERSION"));
    println!("  marioai-agents   {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("action pool: {} canonical actions", ACTION_POOL.len());
    println!("scene: {SCENE_SIZE}x{SCENE_SIZE} cells");
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            config,
            episodes,
            agent,
            seed,
            host,
            port,
            no_launch,
            json,
        }) => run_episodes(&RunArgs {
            config,
            episodes,
            agent,
            seed,
            host,
            port,
            no_launch,
            json,
        }),
        Some(Commands::ShowConfig) => show_config(),
        Some(Commands::Info) | None => {
            run_info();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
