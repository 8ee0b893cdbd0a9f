//! greenwave: capture traffic light green phases and project their schedule.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use greenwave_lib::{
    db::{TrafficLightInput, TrafficLightUpdate},
    init_logging,
    settings::SettingsPatch,
    AppState,
};

#[derive(Parser)]
#[command(
    name = "greenwave",
    about = "Record traffic light green phases and infer their cycle",
    version
)]
struct Cli {
    /// Path to the SQLite database.
    #[arg(long, env = "GREENWAVE_DB_PATH", default_value = "data/greenwave.sqlite3")]
    db: PathBuf,

    /// Path to the JSON settings file.
    #[arg(long, env = "GREENWAVE_SETTINGS_PATH", default_value = "data/settings.json")]
    settings: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage traffic lights.
    #[command(subcommand)]
    Light(LightCommand),

    /// Record, list and delete green-phase captures.
    #[command(subcommand)]
    Capture(CaptureCommand),

    /// Summarize a light's captures and project its next green phase.
    Pattern { traffic_light_id: String },

    /// Predict green/red intervals over a window.
    Timeline {
        traffic_light_id: String,

        /// Window start (RFC 3339). Defaults to now.
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Window length in hours. Defaults to the configured timeline length.
        #[arg(long)]
        hours: Option<u32>,
    },

    /// Check how many recent captures the inferred cycle explains.
    Validate {
        traffic_light_id: String,

        /// How far back to replay captures. Defaults to the configured lookback.
        #[arg(long)]
        lookback_hours: Option<u32>,
    },

    /// Current predicted state and time until it changes.
    Countdown { traffic_light_id: String },

    /// Show or change the settings file.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
enum LightCommand {
    Add {
        #[arg(long)]
        location: String,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    Remove {
        id: String,
    },
    /// Delete every traffic light and all captures.
    Clear,
}

#[derive(Subcommand)]
enum CaptureCommand {
    Record {
        traffic_light_id: String,

        /// When the light turned green (RFC 3339).
        #[arg(long)]
        start: DateTime<Utc>,

        /// When the light left green (RFC 3339).
        #[arg(long)]
        end: DateTime<Utc>,
    },
    List {
        traffic_light_id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the effective settings.
    Show,
    /// Change individual settings and save them.
    Set {
        /// Default timeline length in hours.
        #[arg(long)]
        timeline_hours: Option<u32>,
        /// Default validation lookback in hours.
        #[arg(long)]
        validation_lookback_hours: Option<u32>,
        #[arg(long)]
        consistent_max_variation: Option<f64>,
        #[arg(long)]
        variable_max_variation: Option<f64>,
        #[arg(long)]
        validation_match_threshold: Option<f64>,
        /// Longest timeline window accepted, in hours.
        #[arg(long)]
        max_window_hours: Option<u32>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_light(state: &AppState, command: LightCommand) -> Result<()> {
    match command {
        LightCommand::Add {
            location,
            latitude,
            longitude,
            notes,
        } => {
            let light = state
                .db
                .create_traffic_light(TrafficLightInput {
                    location,
                    latitude,
                    longitude,
                    notes,
                })
                .await?;
            print_json(&light)
        }
        LightCommand::List => print_json(&state.db.list_traffic_lights().await?),
        LightCommand::Show { id } => {
            let light = state
                .db
                .get_traffic_light(&id)
                .await?
                .ok_or_else(|| anyhow!("Traffic light {id} not found"))?;
            print_json(&light)
        }
        LightCommand::Update {
            id,
            location,
            latitude,
            longitude,
            notes,
        } => {
            let update = TrafficLightUpdate {
                location,
                latitude,
                longitude,
                notes,
            };
            let light = state
                .db
                .update_traffic_light(&id, update)
                .await?
                .ok_or_else(|| anyhow!("Traffic light {id} not found"))?;
            print_json(&light)
        }
        LightCommand::Remove { id } => {
            if !state.db.delete_traffic_light(&id).await? {
                return Err(anyhow!("Traffic light {id} not found"));
            }
            println!("Traffic light {id} deleted");
            Ok(())
        }
        LightCommand::Clear => {
            let removed = state.db.delete_all_traffic_lights().await?;
            println!("Deleted {removed} traffic lights");
            Ok(())
        }
    }
}

async fn run_capture(state: &AppState, command: CaptureCommand) -> Result<()> {
    match command {
        CaptureCommand::Record {
            traffic_light_id,
            start,
            end,
        } => {
            let observation = state.recorder.record(&traffic_light_id, start, end).await?;
            print_json(&observation)
        }
        CaptureCommand::List { traffic_light_id } => {
            print_json(&state.schedules.observations(&traffic_light_id).await?)
        }
        CaptureCommand::Delete { id } => {
            if !state.recorder.delete(&id).await? {
                return Err(anyhow!("Capture {id} not found"));
            }
            println!("Capture {id} deleted");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let state = AppState::open(cli.db, cli.settings)?;
    let now = Utc::now();

    match cli.command {
        Commands::Light(command) => run_light(&state, command).await,
        Commands::Capture(command) => run_capture(&state, command).await,
        Commands::Pattern { traffic_light_id } => {
            print_json(&state.schedules.pattern(&traffic_light_id, now).await?)
        }
        Commands::Timeline {
            traffic_light_id,
            from,
            hours,
        } => print_json(
            &state
                .schedules
                .timeline(&traffic_light_id, now, from, hours)
                .await?,
        ),
        Commands::Validate {
            traffic_light_id,
            lookback_hours,
        } => print_json(
            &state
                .schedules
                .validate(&traffic_light_id, now, lookback_hours)
                .await?,
        ),
        Commands::Countdown { traffic_light_id } => {
            print_json(&state.schedules.countdown(&traffic_light_id, now).await?)
        }
        Commands::Settings(SettingsCommand::Show) => print_json(&state.settings.current()),
        Commands::Settings(SettingsCommand::Set {
            timeline_hours,
            validation_lookback_hours,
            consistent_max_variation,
            variable_max_variation,
            validation_match_threshold,
            max_window_hours,
        }) => print_json(&state.settings.patch(SettingsPatch {
            timeline_hours,
            validation_lookback_hours,
            consistent_max_variation,
            variable_max_variation,
            validation_match_threshold,
            max_window_hours,
        })?),
    }
}
