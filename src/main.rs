use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hydromet_extractor::config::Config;
use hydromet_extractor::{DataExtractor, ForecastShape, StationQuery};

#[derive(Parser)]
#[command(name = "hydromet-extractor")]
#[command(about = "Fetch and validate PEGELONLINE and DWD hydrometeorological data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List PEGELONLINE gauges
    PegelonlineStations {
        /// Restrict to these water bodies (repeatable), e.g. --water RHEIN
        #[arg(long = "water")]
        waters: Vec<String>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },
    /// Current water level of one gauge
    PegelonlineCurrent {
        /// Gauge UUID
        uuid: String,
    },
    /// Water level forecasts and estimates of one gauge
    PegelonlineForecast {
        /// Gauge UUID
        uuid: String,
    },
    /// MOSMIX station catalog
    MosmixStations,
    /// Latest MOSMIX-L forecast for one station
    MosmixForecast {
        station_id: String,

        #[arg(long, value_enum, default_value_t = Shape::Series)]
        shape: Shape,
    },
    /// Stations of the 10-minute precipitation network
    PrecipitationStations,
    /// Recent 10-minute precipitation for one station
    Precipitation { station_id: String },
    /// Stations of the 10-minute air temperature network
    TemperatureStations,
    /// Recent 10-minute air temperature for one station
    Temperature { station_id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Series,
    Points,
}

impl From<Shape> for ForecastShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Series => ForecastShape::Series,
            Shape::Points => ForecastShape::Points,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hydromet_extractor=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!("Starting hydromet extractor with config: {:?}", config);

    let extractor = DataExtractor::new(&config)?;

    match cli.command {
        Command::PegelonlineStations {
            waters,
            limit,
            offset,
        } => {
            let query = StationQuery {
                waters,
                limit,
                offset,
            };
            print_json(&extractor.fetch_pegelonline_stations(&query).await?)
        }
        Command::PegelonlineCurrent { uuid } => {
            print_json(&extractor.fetch_pegelonline_current_water_level(&uuid).await?)
        }
        Command::PegelonlineForecast { uuid } => {
            print_json(&extractor.fetch_pegelonline_forecasted_water_level(&uuid).await?)
        }
        Command::MosmixStations => print_json(&extractor.fetch_dwd_mosmix_stations().await?),
        Command::MosmixForecast { station_id, shape } => print_json(
            &extractor
                .fetch_dwd_mosmix_forecast(&station_id, shape.into())
                .await?,
        ),
        Command::PrecipitationStations => {
            print_json(&extractor.fetch_dwd_precipitation_stations().await?)
        }
        Command::Precipitation { station_id } => {
            print_json(&extractor.fetch_dwd_precipitation_data(&station_id).await?)
        }
        Command::TemperatureStations => {
            print_json(&extractor.fetch_dwd_temperature_stations().await?)
        }
        Command::Temperature { station_id } => {
            print_json(&extractor.fetch_dwd_temperature_data(&station_id).await?)
        }
    }
}
