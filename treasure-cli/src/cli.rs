use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use tracing::{debug, info};
use treasure_core::{
    Config, Coordinate, ProviderId, Treasure, TreasureFinder, WeatherService,
    geolocator_from_config,
};

use crate::{dates::parse_when, output};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "treasure", version, about = "Weather, geolocation and treasure hunting")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,

        /// Also make this the default provider.
        #[arg(long)]
        default: bool,
    },

    /// Show weather for an address, or for the current position.
    Weather {
        /// Address or location name.
        #[arg(required_unless_present = "here", conflicts_with = "here")]
        address: Option<String>,

        /// Use the current position instead of an address.
        #[arg(long)]
        here: bool,

        /// Optional date/time; if absent, means "now".
        #[arg(long)]
        date: Option<String>,
    },

    /// Print the current position.
    Whereami,

    /// Manage stored treasures.
    Treasures {
        #[command(subcommand)]
        action: TreasureAction,
    },

    /// Show how far each treasure is, closest first.
    Hunt {
        /// Only this treasure.
        name: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TreasureAction {
    /// Add or move a treasure.
    Add {
        name: String,

        /// Position as "lat,lon" in decimal degrees.
        #[arg(allow_hyphen_values = true)]
        position: Coordinate,
    },

    /// Forget a treasure.
    Remove { name: String },

    /// List stored treasures.
    List,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider, default } => configure(&provider, default),
            Command::Weather { address, here, date } => weather(address, here, date).await,
            Command::Whereami => whereami().await,
            Command::Treasures { action } => treasures(action),
            Command::Hunt { name } => hunt(name).await,
        }
    }
}

fn configure(provider: &str, make_default: bool) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.upsert_provider_api_key(id, api_key);
    if make_default {
        config.set_default_provider(id);
    }
    config.save()?;

    info!(provider = %id, "provider configured");
    println!("Saved API key for {id} to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn weather(address: Option<String>, here: bool, date: Option<String>) -> anyhow::Result<()> {
    let when = date.as_deref().map(parse_when).transpose()?;
    let config = Config::load()?;
    let service = WeatherService::from_config(&config)?;

    let reading = if here {
        let position = geolocator_from_config(&config)?.locate().await?;
        debug!(%position, "using current position");
        service.at_coordinate(position, when).await?
    } else {
        let address = address.ok_or_else(|| anyhow!("Provide an address or use --here"))?;
        service.at(&address, when).await?
    };

    println!("{}", output::weather(&reading));
    Ok(())
}

async fn whereami() -> anyhow::Result<()> {
    let config = Config::load()?;
    let position = geolocator_from_config(&config)?.locate().await?;

    println!("{position}");
    Ok(())
}

fn treasures(action: TreasureAction) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    match action {
        TreasureAction::Add { name, position } => {
            let replaced = config.add_treasure(Treasure::new(name.clone(), position));
            config.save()?;
            let verb = if replaced { "Moved" } else { "Added" };
            println!("{verb} '{name}' at {position}");
        }
        TreasureAction::Remove { name } => {
            if !config.remove_treasure(&name) {
                return Err(anyhow!("No treasure named '{name}'"));
            }
            config.save()?;
            println!("Removed '{name}'");
        }
        TreasureAction::List => {
            if config.treasures.is_empty() {
                println!("No treasures stored. Hint: `treasure treasures add <name> <lat,lon>`.");
            }
            for treasure in &config.treasures {
                println!("{:<20} {}", treasure.name, treasure.location);
            }
        }
    }

    Ok(())
}

async fn hunt(name: Option<String>) -> anyhow::Result<()> {
    let config = Config::load()?;

    let targets: Vec<Treasure> = match &name {
        Some(name) => vec![
            config
                .treasure(name)
                .cloned()
                .ok_or_else(|| anyhow!("No treasure named '{name}'"))?,
        ],
        None => config.treasures.clone(),
    };

    if targets.is_empty() {
        println!("Nothing to hunt. Hint: `treasure treasures add <name> <lat,lon>`.");
        return Ok(());
    }

    let finder = TreasureFinder::with_geolocator(geolocator_from_config(&config)?)
        .with_thresholds(config.proximity);

    for sighting in finder.survey(&targets).await? {
        println!("{}", output::sighting(&sighting));
    }

    Ok(())
}
