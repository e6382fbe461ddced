use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use tracing::{debug, info};
use wxsync_core::{
    Config, Coordinate, Engine, Provider, ProviderId, Update, WeatherState,
    provider::{self, outlook},
    units::{DistanceUnit, PressureUnit, SpeedUnit, TemperatureUnit},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wxsync", version, about = "Reconciled weather from several sources")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the one-call API key and display units.
    Configure,

    /// Current conditions, forecast and alerts for a location.
    Show {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Convective outlook for the next days.
    Outlook {
        #[command(flatten)]
        location: LocationArgs,

        /// Number of days (1-3).
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=3))]
        days: u8,
    },

    /// Active alerts for a location.
    Alerts {
        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Place name, e.g. "Peoria, IL".
    pub place: Option<String>,

    #[arg(long, allow_hyphen_values = true, requires = "lon", conflicts_with = "place")]
    pub lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "lat", conflicts_with = "place")]
    pub lon: Option<f64>,
}

impl LocationArgs {
    async fn resolve(&self, config: &Config) -> anyhow::Result<Coordinate> {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            let at = Coordinate::new(lat, lon);
            if !at.is_valid() {
                bail!("Coordinate {lat},{lon} is out of range.");
            }
            return Ok(at);
        }

        let Some(place) = self.place.as_deref() else {
            bail!("Give a place name or both --lat and --lon.");
        };

        let geocoder = provider::geocoder_from_config(config)?;
        let matches = geocoder
            .search(place)
            .await
            .with_context(|| format!("Failed to look up '{place}'"))?;

        let Some(best) = matches.into_iter().next() else {
            bail!("No place matched '{place}'.");
        };
        info!(place = %best, "resolved location");
        println!("{best}");
        Ok(best.coordinate)
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location } => show(&location).await,
            Command::Outlook { location, days } => show_outlook(&location, days).await,
            Command::Alerts { location } => show_alerts(&location).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("OpenWeatherMap One Call API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;
    if !key.trim().is_empty() {
        config.upsert_provider_api_key(ProviderId::OneCall, key.trim().to_string());
    }

    config.units.temperature = pick(
        "Temperature unit:",
        &TemperatureUnit::ALL,
        config.units.temperature,
        |u| u.symbol(),
    )?;
    config.units.pressure = pick(
        "Pressure unit:",
        &PressureUnit::ALL,
        config.units.pressure,
        |u| u.symbol(),
    )?;
    config.units.distance = pick(
        "Distance unit:",
        &DistanceUnit::ALL,
        config.units.distance,
        |u| u.symbol(),
    )?;
    config.units.speed = pick("Speed unit:", &SpeedUnit::ALL, config.units.speed, |u| {
        u.symbol()
    })?;

    config.save()?;
    println!(
        "Configuration saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn pick<T: Copy + PartialEq>(
    message: &str,
    all: &[T],
    current: T,
    label: impl Fn(T) -> &'static str,
) -> anyhow::Result<T> {
    let labels: Vec<&str> = all.iter().map(|u| label(*u)).collect();
    let start = all.iter().position(|u| *u == current).unwrap_or(0);

    let choice = Select::new(message, labels)
        .with_starting_cursor(start)
        .raw_prompt()?;
    all.get(choice.index)
        .copied()
        .context("Selected unit is out of range")
}

async fn show(location: &LocationArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let at = location.resolve(&config).await?;
    let units = config.units;

    if !config.is_provider_configured(ProviderId::OneCall) {
        eprintln!("No one-call API key configured; run `wxsync configure` for full coverage.");
    }

    let engine = Engine::new(provider::providers_from_config(&config)?, config.engine_settings());
    let mut state = WeatherState::new();
    let mut cycle = engine.start(at);
    state.begin(&cycle);

    if let Some(placeholder) = state.display(units) {
        println!("{}", render::conditions(&placeholder, state.conditions.as_ref()));
    }

    while let Some(delivery) = cycle.updates.recv().await {
        let update = delivery.update.clone();
        if !state.apply(delivery) {
            debug!("dropped stale delivery");
            continue;
        }
        match update {
            Update::Conditions(_) => {
                if let Some(shown) = state.display(units) {
                    println!("{}", render::conditions(&shown, state.conditions.as_ref()));
                }
            }
            Update::Forecast(bundle) => println!("{}", render::forecast(&bundle, units)),
            Update::Alerts(alerts) => println!("{}", render::alerts(&alerts)),
            Update::TimedOut => eprintln!(
                "Some sources are still loading after {} s; showing what has arrived.",
                engine.settings().delivery_timeout.as_secs()
            ),
        }
    }

    Ok(())
}

async fn show_outlook(location: &LocationArgs, days: u8) -> anyhow::Result<()> {
    let config = Config::load()?;
    let at = location.resolve(&config).await?;

    let client = provider::outlook_from_config(&config)?;
    let horizon: Vec<u8> = outlook::DAYS.take(days as usize).collect();
    let outlooks = client.fetch_days(at, &horizon).await;

    println!("{}", render::outlooks(&outlooks));
    Ok(())
}

async fn show_alerts(location: &LocationArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let at = location.resolve(&config).await?;

    let providers = provider::providers_from_config(&config)?;
    let alerts = providers
        .alerts
        .fetch(at)
        .await
        .context("Failed to fetch active alerts")?;

    println!("{}", render::alerts(&alerts));
    Ok(())
}
