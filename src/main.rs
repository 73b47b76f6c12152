mod api;
mod cli;
mod config;
mod engine;
mod error;
mod models;

use clap::Parser;
use cli::{AqiArgs, App, Cli, CityArgs, Commands, LiveArgs, OverviewArgs};
use colored::*;
use config::AppConfig;
use dialoguer::{theme::ColorfulTheme, Select};
use error::Result;
use models::Pollutant;
use std::env;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Default, PartialEq)]
struct LogSettings {
    json: bool,
    dir: Option<String>,
}

impl LogSettings {
    /// `LOG_FORMAT=json` switches to JSON lines and `LOG_DIR` adds a daily-rolling
    /// log file.
    fn from_env() -> Self {
        Self {
            json: env::var("LOG_FORMAT")
                .map(|v| v.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            dir: env::var("LOG_DIR")
                .ok()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

/// Console logs go to stderr. Expects `.env` to be loaded already.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let settings = LogSettings::from_env();

    let (file_layer, guard) = match settings.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "aqi-dashboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        },
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if settings.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG and the LOG_* variables may come from `.env`.
    dotenv::dotenv().ok();
    let _log_guard = init_tracing();
    let cli = Cli::parse();

    info!("Initializing AQI analytics engine...");

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let app = match App::new(&config) {
        Ok(app) => {
            info!("Application initialized successfully.");
            app
        },
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!(
                "{}",
                "Error: Failed to initialize application. Check logs.".red()
            );
            return Err(e);
        },
    };

    if let Some(command) = cli.command {
        return app.run_command(command).await;
    }

    println!("{}", "Welcome to the AQI Analytics CLI!".cyan().bold());

    loop {
        let options = &[
            "City Analysis",
            "Multi-City Overview",
            "City Forecast",
            "Live Snapshots",
            "AQI Calculator",
            "List Cities",
            "Clear Cached Results",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()?
            .unwrap_or(options.len() - 1);

        println!("\n---\n");

        let command = match selection {
            0 | 2 => {
                let args = cli::prompt_city(app.catalog())
                    .and_then(|city| Ok(CityArgs { city, window: cli::prompt_window()? }));
                match args {
                    Ok(args) if selection == 0 => Commands::Analysis(args),
                    Ok(args) => Commands::Forecast(args),
                    Err(e) => {
                        println!("{} {}", "Failed to get input:".red(), e);
                        continue;
                    },
                }
            },
            1 => {
                let args = cli::prompt_cities(app.catalog())
                    .and_then(|cities| Ok(OverviewArgs { cities, window: cli::prompt_window()? }));
                match args {
                    Ok(args) => Commands::Overview(args),
                    Err(e) => {
                        println!("{} {}", "Failed to get input:".red(), e);
                        continue;
                    },
                }
            },
            3 => match cli::prompt_cities(app.catalog()) {
                Ok(cities) => Commands::Live(LiveArgs { cities }),
                Err(e) => {
                    println!("{} {}", "Failed to get cities:".red(), e);
                    continue;
                },
            },
            4 => match prompt_aqi_args() {
                Ok(args) => Commands::Aqi(args),
                Err(e) => {
                    println!("{} {}", "Failed to get concentrations:".red(), e);
                    continue;
                },
            },
            5 => Commands::Cities,
            6 => Commands::Reload,
            7 => {
                println!("{}", "Exiting application. Goodbye!".green());
                break;
            },
            _ => unreachable!(),
        };

        if let Err(e) = app.run_command(command).await {
            error!("Command execution failed: {:?}", e);
            println!(
                "{} {}",
                "Error executing command:".red(),
                e.to_string().red()
            );
        }

        println!("\n---\n");
    }

    Ok(())
}

fn prompt_aqi_args() -> Result<AqiArgs> {
    Ok(AqiArgs {
        pm25: cli::prompt_concentration(Pollutant::Pm25)?,
        pm10: cli::prompt_concentration(Pollutant::Pm10)?,
        no2: cli::prompt_concentration(Pollutant::No2)?,
        so2: cli::prompt_concentration(Pollutant::So2)?,
        o3: cli::prompt_concentration(Pollutant::O3)?,
        co: cli::prompt_concentration(Pollutant::Co)?,
    })
}
