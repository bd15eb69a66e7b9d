// Typed records and their rule tables, one module per provider

pub mod dwd;
pub mod pegelonline;

pub use dwd::{
    ClimateStation, ForecastIssue, ForecastPoint, ForecastSeries, MosmixStation,
    PrecipitationMeasurement, TemperatureMeasurement,
};
pub use pegelonline::{CurrentWaterLevel, GaugeStation, WaterLevelForecast};
