// Extraction orchestration: fetch -> container -> table/KML -> validate
//
// Every operation is a fixed pipeline over the stage functions; no parsing
// happens here.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::container::{parse_container, ContainerKind, Encoding, RawPayload};
use crate::error::ExtractError;
use crate::fetcher::{Provider, ProviderClients};
use crate::kml::parse_kml_document;
use crate::records::{
    ClimateStation, CurrentWaterLevel, ForecastPoint, GaugeStation, MosmixStation,
    PrecipitationMeasurement, TemperatureMeasurement, WaterLevelForecast,
};
use crate::schema::Record;
use crate::table::{parse_table, Row, TableError, TableFormat};
use crate::utils::{pad_station_id, DWD_STATION_ID_WIDTH};
use crate::validator::{
    validate, validate_forecast, validate_one, ForecastOutput, ForecastShape, ValidationContext,
};

pub const MOSMIX_STATIONS_ENDPOINT: &str =
    "DE/leistungen/met_verfahren_mosmix/mosmix_stationskatalog.cfg?view=nasPublication";

const MOSMIX_SINGLE_STATIONS: &str = "weather/local_forecasts/mos/MOSMIX_L/single_stations";

const TEN_MINUTES_NOW: &str = "climate_environment/CDC/observations_germany/climate/10_minutes";

/// Where a tabular dataset comes from and how its payload is laid out
#[derive(Debug, Clone, Copy)]
struct Source {
    provider: Provider,
    container: ContainerKind,
    encoding: Encoding,
    format: TableFormat,
}

const PEGELONLINE_JSON: Source = Source {
    provider: Provider::Pegelonline,
    container: ContainerKind::None,
    encoding: Encoding::Utf8,
    format: TableFormat::JsonRecords,
};

const MOSMIX_CATALOG: Source = Source {
    provider: Provider::Dwd,
    container: ContainerKind::None,
    encoding: Encoding::Latin1,
    format: TableFormat::FixedWidth,
};

const CLIMATE_STATIONS: Source = Source {
    provider: Provider::DwdOpendata,
    container: ContainerKind::None,
    encoding: Encoding::Latin1,
    format: TableFormat::StationText,
};

const CLIMATE_SERIES: Source = Source {
    provider: Provider::DwdOpendata,
    container: ContainerKind::Zip,
    encoding: Encoding::Latin1,
    format: TableFormat::Delimited,
};

/// Query parameters of the PEGELONLINE station listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationQuery {
    /// Water body long names (e.g. "RHEIN"); also enforced on the response
    pub waters: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl StationQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if !self.waters.is_empty() {
            query.push(("waters".to_string(), self.waters.join(",")));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        query
    }

    pub fn context(&self) -> ValidationContext {
        if self.waters.is_empty() {
            ValidationContext::new()
        } else {
            ValidationContext::new().with_waters(self.waters.iter().cloned())
        }
    }
}

#[derive(Clone)]
pub struct DataExtractor {
    clients: ProviderClients,
}

impl DataExtractor {
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        Ok(Self {
            clients: ProviderClients::from_config(config)?,
        })
    }

    pub fn with_clients(clients: ProviderClients) -> Self {
        Self { clients }
    }

    #[instrument(skip(self))]
    pub async fn fetch_pegelonline_stations(
        &self,
        query: &StationQuery,
    ) -> Result<Vec<GaugeStation>, ExtractError> {
        self.extract_table(PEGELONLINE_JSON, "stations.json", &query.to_query(), &query.context())
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch_pegelonline_current_water_level(
        &self,
        uuid: &str,
    ) -> Result<CurrentWaterLevel, ExtractError> {
        let uuid = gauge_uuid(uuid)?;
        let endpoint = format!("stations/{uuid}/W/currentmeasurement.json");
        let ctx = ValidationContext::new().with_gauge_uuid(uuid.to_string());
        self.extract_single(PEGELONLINE_JSON, &endpoint, &ctx).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_pegelonline_forecasted_water_level(
        &self,
        uuid: &str,
    ) -> Result<Vec<WaterLevelForecast>, ExtractError> {
        let uuid = gauge_uuid(uuid)?;
        let endpoint = format!("stations/{uuid}/WV/measurements.json");
        let ctx = ValidationContext::new().with_gauge_uuid(uuid.to_string());
        self.extract_table(PEGELONLINE_JSON, &endpoint, &[], &ctx).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_dwd_mosmix_stations(&self) -> Result<Vec<MosmixStation>, ExtractError> {
        self.extract_table(MOSMIX_CATALOG, MOSMIX_STATIONS_ENDPOINT, &[], &ValidationContext::new())
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch_dwd_mosmix_forecast(
        &self,
        station_id: &str,
        shape: ForecastShape,
    ) -> Result<ForecastOutput, ExtractError> {
        let id = mosmix_station_id(station_id)?;
        let endpoint = format!("{MOSMIX_SINGLE_STATIONS}/{id}/kml/MOSMIX_L_LATEST_{id}.kmz");

        let dataset = ForecastPoint::SCHEMA.dataset;
        let bytes = self.fetch_raw(Provider::DwdOpendata, &endpoint).await?;
        let kml = parse_container(&bytes, ContainerKind::Kmz)
            .map_err(|source| ExtractError::Container { dataset, source })?;
        let raw = parse_kml_document(&kml).map_err(|source| ExtractError::Kml { dataset, source })?;

        let ctx = ValidationContext::new().with_station_id(id);
        let forecast = validate_forecast(&raw, shape, &ctx)?;

        info!("Extracted MOSMIX forecast with {} time steps", raw.len());
        Ok(forecast)
    }

    #[instrument(skip(self))]
    pub async fn fetch_dwd_precipitation_stations(
        &self,
    ) -> Result<Vec<ClimateStation>, ExtractError> {
        let endpoint = format!("{TEN_MINUTES_NOW}/precipitation/now/zehn_now_rr_Beschreibung_Stationen.txt");
        self.extract_table(CLIMATE_STATIONS, &endpoint, &[], &ValidationContext::new())
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch_dwd_precipitation_data(
        &self,
        station_id: &str,
    ) -> Result<Vec<PrecipitationMeasurement>, ExtractError> {
        let id = climate_station_id(station_id)?;
        let endpoint = format!("{TEN_MINUTES_NOW}/precipitation/now/10minutenwerte_nieder_{id}_now.zip");
        let ctx = ValidationContext::new().with_station_id(id);
        self.extract_table(CLIMATE_SERIES, &endpoint, &[], &ctx).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_dwd_temperature_stations(
        &self,
    ) -> Result<Vec<ClimateStation>, ExtractError> {
        let endpoint = format!("{TEN_MINUTES_NOW}/air_temperature/now/zehn_now_tu_Beschreibung_Stationen.txt");
        self.extract_table(CLIMATE_STATIONS, &endpoint, &[], &ValidationContext::new())
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch_dwd_temperature_data(
        &self,
        station_id: &str,
    ) -> Result<Vec<TemperatureMeasurement>, ExtractError> {
        let id = climate_station_id(station_id)?;
        let endpoint = format!("{TEN_MINUTES_NOW}/air_temperature/now/10minutenwerte_TU_{id}_now.zip");
        let ctx = ValidationContext::new().with_station_id(id);
        self.extract_table(CLIMATE_SERIES, &endpoint, &[], &ctx).await
    }

    /// Raw response bytes of any provider endpoint
    pub async fn fetch_raw(&self, provider: Provider, endpoint: &str) -> Result<Vec<u8>, ExtractError> {
        Ok(self.clients.get(provider).fetch(endpoint, &[]).await?)
    }

    async fn extract_table<R: Record>(
        &self,
        source: Source,
        endpoint: &str,
        query: &[(String, String)],
        ctx: &ValidationContext,
    ) -> Result<Vec<R>, ExtractError> {
        let rows = self.fetch_rows::<R>(source, endpoint, query).await?;
        let records = validate::<R>(&rows, ctx)?;

        info!("Extracted {} {} records", records.len(), R::SCHEMA.dataset);
        Ok(records)
    }

    async fn extract_single<R: Record>(
        &self,
        source: Source,
        endpoint: &str,
        ctx: &ValidationContext,
    ) -> Result<R, ExtractError> {
        let rows = self.fetch_rows::<R>(source, endpoint, &[]).await?;

        match rows.as_slice() {
            [row] => Ok(validate_one::<R>(row, ctx)?),
            _ => Err(ExtractError::Table {
                dataset: R::SCHEMA.dataset,
                source: TableError::NotRecords,
            }),
        }
    }

    async fn fetch_rows<R: Record>(
        &self,
        source: Source,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Row>, ExtractError> {
        let dataset = R::SCHEMA.dataset;
        let bytes = self.clients.get(source.provider).fetch(endpoint, query).await?;

        let text = RawPayload::new(bytes, source.container)
            .with_encoding(source.encoding)
            .extract_text()
            .map_err(|source| ExtractError::Container { dataset, source })?;

        parse_table(&text, source.format).map_err(|source| ExtractError::Table { dataset, source })
    }
}

fn climate_station_id(value: &str) -> Result<String, ExtractError> {
    pad_station_id(value, DWD_STATION_ID_WIDTH).map_err(|reason| ExtractError::InvalidRequest {
        name: "station_id",
        reason: reason.to_string(),
    })
}

fn gauge_uuid(value: &str) -> Result<Uuid, ExtractError> {
    Uuid::parse_str(value.trim()).map_err(|e| ExtractError::InvalidRequest {
        name: "uuid",
        reason: e.to_string(),
    })
}

/// Numeric MOSMIX ids are padded like climate ids; alphanumeric ones pass through
fn mosmix_station_id(value: &str) -> Result<String, ExtractError> {
    let id = value.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ExtractError::InvalidRequest {
            name: "station_id",
            reason: "MOSMIX station ID must be alphanumeric".to_string(),
        });
    }
    if id.chars().all(|c| c.is_ascii_digit()) {
        return climate_station_id(id);
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_query_parameters() {
        let query = StationQuery {
            waters: vec!["RHEIN".to_string(), "ELBE".to_string()],
            limit: Some(10),
            offset: None,
        };

        assert_eq!(
            query.to_query(),
            vec![
                ("waters".to_string(), "RHEIN,ELBE".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
        assert_eq!(
            query.context(),
            ValidationContext::new().with_waters(["RHEIN", "ELBE"])
        );
    }

    #[test]
    fn test_empty_station_query_has_no_allow_list() {
        let query = StationQuery::default();
        assert!(query.to_query().is_empty());
        assert_eq!(query.context(), ValidationContext::new());
    }

    #[test]
    fn test_station_id_normalization() {
        assert_eq!(climate_station_id("44").unwrap(), "00044");
        assert!(matches!(
            climate_station_id("4a"),
            Err(ExtractError::InvalidRequest { .. })
        ));
        assert_eq!(mosmix_station_id("10015").unwrap(), "10015");
        assert_eq!(mosmix_station_id(" P0489 ").unwrap(), "P0489");
        assert!(mosmix_station_id("../x").is_err());
    }

    #[test]
    fn test_gauge_uuid_validation() {
        let uuid = gauge_uuid(" 593647aa-9fea-43ec-a7d6-6476a76ae868 ").unwrap();
        assert_eq!(uuid.to_string(), "593647aa-9fea-43ec-a7d6-6476a76ae868");

        match gauge_uuid("../x") {
            Err(ExtractError::InvalidRequest { name, .. }) => assert_eq!(name, "uuid"),
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
    }
}
