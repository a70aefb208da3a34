use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use homestead::{
    config::{ConfigLoader, PersistenceConfig},
    engine::{EngineBuilder, EngineSettings},
    persistence::{Autosave, PersistenceGateway, StoreBackend},
    web,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Homestead idle settlement simulation")]
struct Cli {
    /// Path to the game config YAML file
    #[arg(long, global = true, default_value = "config/homestead.yaml")]
    config: PathBuf,

    /// Override the world seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Keep saves as files in this directory
    #[arg(long, global = true)]
    save_dir: Option<PathBuf>,

    /// Keep saves in a Redis-compatible store at this URL
    #[arg(long, global = true, conflicts_with = "save_dir")]
    remote_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the game server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
    /// Advance a user's saved game headlessly, then save it
    Simulate {
        #[arg(long)]
        user: String,

        #[arg(long, default_value_t = 60)]
        ticks: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::new(".").load(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(dir) = cli.save_dir {
        config.persistence = PersistenceConfig::Local { dir };
    }
    if let Some(url) = cli.remote_url {
        config.persistence = PersistenceConfig::Remote { url };
    }

    let store = StoreBackend::connect(&config.persistence).await?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            web::run(config, store).await
        }
        Command::Simulate { user, ticks } => {
            let gateway = PersistenceGateway::new(store);
            let autosave_interval = config.autosave_interval_ticks;
            let mut engine = EngineBuilder::standard(EngineSettings::new(config)).build();
            let mut world = match gateway.load_snapshot(&user).await? {
                Some(mut world) => {
                    engine.restore(&mut world);
                    world
                }
                None => engine.new_world(),
            };
            info!(user = %user, tick = world.tick(), ticks, "Simulating");

            let mut autosave = Autosave::new(autosave_interval, world.tick());
            for _ in 0..ticks {
                engine.tick(&mut world)?;
                if autosave.should_save(world.tick()) {
                    gateway.save_snapshot(&user, &world).await?;
                    autosave.mark_saved(world.tick());
                }
            }
            gateway.save_snapshot(&user, &world).await?;

            let ledger = world.ledger();
            println!(
                "'{}' advanced to tick {}: food {:.1}, wood {:.1}, stone {:.1}, iron {:.1}, gold {:.1}, population {}/{}, tiles discovered {}/{}",
                user,
                world.tick(),
                ledger.food,
                ledger.wood,
                ledger.stone,
                ledger.iron,
                ledger.gold,
                ledger.population,
                ledger.population_limit,
                world.map().discovered_count(),
                world.map().len(),
            );
            Ok(())
        }
    }
}
