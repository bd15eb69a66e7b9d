pub mod config;
pub mod container;
pub mod error;
pub mod extract;
pub mod fetch_error;
pub mod fetcher;
pub mod kml;
pub mod records;
pub mod schema;
pub mod table;
pub mod utils;
pub mod validator;

pub use container::parse_container;
pub use error::ExtractError;
pub use extract::{DataExtractor, StationQuery};
pub use kml::parse_kml_forecast;
pub use table::{parse_table, write_delimited};
pub use validator::{
    render_row, validate, validate_forecast, validate_one, ForecastOutput, ForecastShape,
    SchemaViolation, ValidationContext,
};
