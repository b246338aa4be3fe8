use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Password, Select};
use std::sync::Arc;
use weather_core::{
    Config, Coordinates, DisplayUnit, FileStore, FixedPosition, Geolocator, KeyValueStore,
    NoGeolocation, Orchestrator, PreferenceController, SavedCities, provider_from_config,
};

use crate::{interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookup client")]
pub struct Cli {
    /// Log debug detail to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Display units for this run: metric or imperial.
    #[arg(long, global = true)]
    pub units: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default units.
    Configure,

    /// Show current weather and forecast for a city.
    Show {
        /// City name, e.g. `weather show new york`.
        #[arg(required = true, num_args = 1..)]
        city: Vec<String>,
    },

    /// Show weather for the current location (flags, else `[home]` in config).
    Here {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Manage saved cities.
    Cities {
        #[command(subcommand)]
        action: CitiesAction,
    },

    /// Dark mode and accent colour.
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Menu-driven session: search, saved cities, units, theme.
    Interactive,
}

#[derive(Debug, Subcommand)]
pub enum CitiesAction {
    List,
    Remove { name: String },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ThemeAction {
    Show,
    Toggle,
    /// Set the accent colour, e.g. `#ff8800`.
    Accent { hex: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;
        let units = match &self.units {
            Some(raw) => DisplayUnit::try_from(raw.as_str())?,
            None => config.units(),
        };

        match self.command {
            Command::Configure => configure(config),
            Command::Show { city } => {
                let store = open_store(&config)?;
                let prefs = PreferenceController::load(store.clone(), system_prefers_dark());
                let app = build_orchestrator(&config, store, units, Arc::new(NoGeolocation))?;

                app.submit(&city.join(" ")).await?;
                print!("{}", render::view(&app.view(), prefs.state()));
                Ok(())
            }
            Command::Here { lat, lon } => {
                let store = open_store(&config)?;
                let prefs = PreferenceController::load(store.clone(), system_prefers_dark());
                let position = match (lat, lon) {
                    (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
                    _ => config.home,
                };
                let app = build_orchestrator(&config, store, units, geolocator_for(position))?;

                app.use_current_location().await?;
                print!("{}", render::view(&app.view(), prefs.state()));
                Ok(())
            }
            Command::Cities { action } => {
                let store = open_store(&config)?;
                let mut cities = SavedCities::load(store.as_ref());
                match action {
                    CitiesAction::List => print!("{}", render::saved_cities(&cities)),
                    CitiesAction::Remove { name } => {
                        if cities.remove(store.as_ref(), &name)? {
                            println!("Removed {name}.");
                        } else {
                            println!("{name} is not in your saved cities.");
                        }
                    }
                    CitiesAction::Clear => {
                        cities.clear(store.as_ref())?;
                        println!("Cleared all saved cities.");
                    }
                }
                Ok(())
            }
            Command::Theme { action } => {
                let store = open_store(&config)?;
                let mut prefs = PreferenceController::load(store, system_prefers_dark());
                match action {
                    ThemeAction::Show => {}
                    ThemeAction::Toggle => {
                        prefs.toggle_dark_mode()?;
                    }
                    ThemeAction::Accent { hex } => prefs.set_accent_color(&hex)?,
                }
                print!("{}", render::preferences(prefs.state()));
                Ok(())
            }
            Command::Interactive => {
                let store = open_store(&config)?;
                let mut prefs = PreferenceController::load(store.clone(), system_prefers_dark());
                let app = build_orchestrator(&config, store, units, geolocator_for(config.home))?;
                interactive::run(app, &mut prefs).await
            }
        }
    }
}

fn configure(mut config: Config) -> Result<()> {
    let help = if config.is_configured() {
        "A key is already set; leave blank to keep it"
    } else {
        "Get one at https://home.openweathermap.org/api_keys"
    };
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message(help)
        .prompt()?;

    let units = Select::new("Default units:", vec![DisplayUnit::Metric, DisplayUnit::Imperial])
        .prompt()?;

    let api_key = api_key.trim();
    if !api_key.is_empty() {
        config.set_api_key(api_key.to_string());
    } else if !config.is_configured() {
        anyhow::bail!("An API key is required");
    }
    config.default_units = Some(units);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let path = config.store_file_path()?;
    let store = FileStore::open(&path)
        .with_context(|| format!("Failed to open preference store: {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_orchestrator(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    units: DisplayUnit,
    geolocator: Arc<dyn Geolocator>,
) -> Result<Orchestrator> {
    let provider = provider_from_config(config)?;
    Ok(Orchestrator::builder(Arc::from(provider), store)
        .geolocator(geolocator)
        .display_unit(units)
        .build())
}

fn geolocator_for(position: Option<Coordinates>) -> Arc<dyn Geolocator> {
    match position {
        Some(coords) => Arc::new(FixedPosition(coords)),
        None => Arc::new(NoGeolocation),
    }
}

/// Terminals that export `COLORFGBG` ("fg;bg") tell us the background colour;
/// ANSI 0-6 and 8 are dark.
fn system_prefers_dark() -> bool {
    std::env::var("COLORFGBG").map(|value| colorfgbg_is_dark(&value)).unwrap_or(false)
}

fn colorfgbg_is_dark(value: &str) -> bool {
    value
        .rsplit(';')
        .next()
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg <= 6 || bg == 8)
}
