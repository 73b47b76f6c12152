use crate::api::{
    AnalyticsService, CityAnalysisParams, LiveMetrics, OverviewParams, QueryResult,
    RefreshController, SupabaseClient,
};
use crate::config::AppConfig;
use crate::engine::catalog::DEFAULT_CITY_ID;
use crate::engine::{aqi, AnalysisDispatcher, CityCatalog, SnapshotCache};
use crate::error::{AppError, Result};
use crate::models::{AnalysisSnapshot, MultiCityOverview, Pollutant, Window};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::display;

/// AQI analytics and synthetic data engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Full single-city analysis for a time window
    Analysis(CityArgs),

    /// Comparative overview across a cohort of cities
    Overview(OverviewArgs),

    /// Trend and forecast for a single city
    Forecast(CityArgs),

    /// Current per-city snapshots
    Live(LiveArgs),

    /// Compute the AQI for a set of pollutant concentrations
    Aqi(AqiArgs),

    /// List the known cities
    Cities,

    /// Drop memoized results so the next query refetches
    #[command(hide = true)]
    Reload,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CityArgs {
    /// City id (e.g. delhi, mumbai)
    #[arg(short, long, default_value = DEFAULT_CITY_ID)]
    pub city: String,

    /// Time window: 24h, 7d or 30d
    #[arg(short, long, default_value = "24h", value_parser = parse_window)]
    pub window: Window,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct OverviewArgs {
    /// Comma-separated city ids (default cohort when omitted)
    #[arg(short, long, value_delimiter = ',')]
    pub cities: Vec<String>,

    /// Time window: 24h, 7d or 30d
    #[arg(short, long, default_value = "24h", value_parser = parse_window)]
    pub window: Window,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct LiveArgs {
    /// Comma-separated city ids (default cohort when omitted)
    #[arg(short, long, value_delimiter = ',')]
    pub cities: Vec<String>,
}

/// Concentrations in µg/m³; omitted pollutants are treated as not measured.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct AqiArgs {
    #[arg(long)]
    pub pm25: Option<f64>,
    #[arg(long)]
    pub pm10: Option<f64>,
    #[arg(long)]
    pub no2: Option<f64>,
    #[arg(long)]
    pub so2: Option<f64>,
    #[arg(long)]
    pub o3: Option<f64>,
    #[arg(long)]
    pub co: Option<f64>,
}

impl AqiArgs {
    pub fn readings(&self) -> [(Pollutant, Option<f64>); 6] {
        [
            (Pollutant::Pm25, self.pm25),
            (Pollutant::Pm10, self.pm10),
            (Pollutant::No2, self.no2),
            (Pollutant::So2, self.so2),
            (Pollutant::O3, self.o3),
            (Pollutant::Co, self.co),
        ]
    }
}

fn parse_window(raw: &str) -> std::result::Result<Window, String> {
    raw.parse::<Window>().map_err(|e| e.to_string())
}

/// CLI application
pub struct App {
    catalog: Arc<CityCatalog>,
    analytics: AnalyticsService<SupabaseClient>,
    live: LiveMetrics<SupabaseClient>,
    analysis_view: Mutex<RefreshController<CityAnalysisParams, QueryResult<AnalysisSnapshot>>>,
    overview_view: Mutex<RefreshController<OverviewParams, QueryResult<MultiCityOverview>>>,
}

impl App {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let backend = match &config.remote {
            Some(remote) => {
                info!("Remote backend configured at {}", remote.url);
                Some(Arc::new(SupabaseClient::new(
                    &remote.url,
                    remote.anon_key.clone(),
                    config.remote_timeout,
                )?))
            },
            None => None,
        };

        let catalog = Arc::new(CityCatalog::load());
        let dispatcher = AnalysisDispatcher::new(catalog.clone(), config.dispatcher());
        let analytics = AnalyticsService::new(backend.clone(), catalog.clone(), dispatcher);
        let live = LiveMetrics::new(
            backend,
            catalog.clone(),
            SnapshotCache::new(config.snapshot_ttl),
        );

        Ok(Self {
            catalog,
            analytics,
            live,
            analysis_view: Mutex::new(RefreshController::new()),
            overview_view: Mutex::new(RefreshController::new()),
        })
    }

    pub fn catalog(&self) -> &CityCatalog {
        &self.catalog
    }

    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Analysis(args) => {
                self.check_city(&args.city)?;
                let params = CityAnalysisParams::new(&args.city, args.window).normalized();
                let spinner = display::spinner(&format!("Analysing {} ({})", params.city_id, params.window))?;
                let result = self
                    .analysis_view
                    .lock()
                    .await
                    .refresh(params, |p| async move { self.analytics.fetch_city_analysis(&p).await })
                    .await;
                spinner.finish_and_clear();
                display::print_analysis(&result);
            },
            Commands::Overview(args) => {
                let spinner = display::spinner("Building multi-city overview")?;
                let params = OverviewParams::new(&args.cities, args.window).normalized();
                let result = self
                    .overview_view
                    .lock()
                    .await
                    .refresh(params, |p| async move {
                        self.analytics.fetch_multi_city_overview(&p).await
                    })
                    .await;
                spinner.finish_and_clear();
                display::print_overview(&result);
            },
            Commands::Forecast(args) => {
                self.check_city(&args.city)?;
                let spinner = display::spinner(&format!("Forecasting {}", args.city))?;
                let result = self
                    .analytics
                    .fetch_city_forecast_summary(&CityAnalysisParams::new(&args.city, args.window))
                    .await;
                spinner.finish_and_clear();
                display::print_forecast(&result);
            },
            Commands::Live(args) => {
                let pruned = self.live.prune();
                if pruned > 0 {
                    info!("Pruned {} expired live snapshot(s)", pruned);
                }
                let spinner = display::spinner("Fetching live snapshots")?;
                let result = self.live.fetch_live_snapshots(&args.cities).await;
                spinner.finish_and_clear();
                debug!("{} live snapshot(s) held in cache", self.live.cached_entries());
                display::print_live(&result);
            },
            Commands::Aqi(args) => {
                let summary = aqi::summarize(args.readings());
                display::print_aqi(&summary);
            },
            Commands::Cities => {
                display::print_cities(self.catalog.all());
            },
            Commands::Reload => {
                self.analysis_view.lock().await.invalidate();
                self.overview_view.lock().await.invalidate();
                let cleared = self.live.clear_cache();
                info!("Dropped memoized views and {} cached snapshot(s)", cleared);
                println!("Cached results cleared; the next query will refetch.");
            },
        }

        Ok(())
    }

    /// Unknown ids would silently resolve to the default city; reject them up front instead.
    fn check_city(&self, city_id: &str) -> Result<()> {
        if self.catalog.get(city_id.trim()).is_some() {
            return Ok(());
        }
        warn!("Unknown city id requested: {}", city_id);
        let known: Vec<&str> = self.catalog.all().iter().map(|c| c.id.as_str()).collect();
        Err(AppError::Cli(format!(
            "Unknown city '{}'. Must be one of: {:?}",
            city_id, known
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_app() -> App {
        App::new(&AppConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_analysis_command() {
        let cli = Cli::try_parse_from(["aqi-dashboard-engine", "analysis", "-c", "mumbai", "-w", "7d"])
            .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Analysis(CityArgs {
                city: "mumbai".to_string(),
                window: Window::Days7,
            }))
        );
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["aqi-dashboard-engine", "forecast"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Forecast(CityArgs {
                city: "delhi".to_string(),
                window: Window::Hours24,
            }))
        );
        let cli = Cli::try_parse_from(["aqi-dashboard-engine"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_cohort_list() {
        let cli = Cli::try_parse_from([
            "aqi-dashboard-engine",
            "overview",
            "--cities",
            "delhi,pune,jaipur",
            "--window",
            "30d",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Overview(args)) => {
                assert_eq!(args.cities, vec!["delhi", "pune", "jaipur"]);
                assert_eq!(args.window, Window::Days30);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        assert!(Cli::try_parse_from(["aqi-dashboard-engine", "analysis", "-w", "1y"]).is_err());
    }

    #[test]
    fn test_aqi_args_readings() {
        let cli = Cli::try_parse_from([
            "aqi-dashboard-engine",
            "aqi",
            "--pm25",
            "25.9",
            "--no2",
            "120",
        ])
        .unwrap();
        let Some(Commands::Aqi(args)) = cli.command else {
            panic!("expected aqi command");
        };
        let summary = aqi::summarize(args.readings());
        assert_eq!(summary.aqi, 120);
        assert_eq!(summary.dominant_pollutant, Some(Pollutant::No2));
    }

    #[tokio::test]
    async fn test_unknown_city_is_a_cli_error() {
        let app = local_app();
        let result = app
            .run_command(Commands::Analysis(CityArgs {
                city: "atlantis".to_string(),
                window: Window::Hours24,
            }))
            .await;
        assert!(matches!(result, Err(AppError::Cli(_))));
    }

    #[tokio::test]
    async fn test_repeated_analysis_is_memoized() {
        let app = local_app();
        let args = CityArgs {
            city: "Delhi".to_string(),
            window: Window::Days7,
        };
        app.run_command(Commands::Analysis(args.clone())).await.unwrap();
        app.run_command(Commands::Analysis(CityArgs {
            city: "delhi".to_string(),
            ..args.clone()
        }))
        .await
        .unwrap();
        assert_eq!(app.analysis_view.lock().await.fetch_count(), 1);

        app.run_command(Commands::Reload).await.unwrap();
        app.run_command(Commands::Analysis(args)).await.unwrap();
        assert_eq!(app.analysis_view.lock().await.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_local_commands_run_without_backend() {
        let app = local_app();
        app.run_command(Commands::Cities).await.unwrap();
        app.run_command(Commands::Aqi(AqiArgs::default())).await.unwrap();
        app.run_command(Commands::Forecast(CityArgs {
            city: "Pune".to_string(),
            window: Window::Days7,
        }))
        .await
        .unwrap();
        app.run_command(Commands::Live(LiveArgs {
            cities: vec!["delhi".to_string()],
        }))
        .await
        .unwrap();
    }
}
