// PEGELONLINE (Federal Waterways and Shipping Administration) gauge data
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{
    AllowList, ContextKey, FieldIssue, FieldKind, FieldRule, Fields, Record, Schema, TimeFormat,
    TzPolicy,
};

/// Empty JSON values (missing key or `null`) mean "not published"
const NOT_PUBLISHED: &[&str] = &[""];

const OFFSET_TIMESTAMP: FieldKind = FieldKind::Timestamp {
    format: TimeFormat::IsoOffset,
    policy: TzPolicy::ConvertToUtc,
};

/// One gauge from `stations.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeStation {
    pub uuid: Uuid,
    pub number: i64,
    pub shortname: String,
    pub longname: String,
    /// River kilometre
    pub km: Option<f64>,
    pub agency: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub water_shortname: String,
    pub water_longname: String,
}

const GAUGE_STATION_FIELDS: &[FieldRule] = &[
    FieldRule::new("uuid", FieldKind::Uuid),
    FieldRule::new("number", FieldKind::Integer),
    FieldRule::new("shortname", FieldKind::Text),
    FieldRule::new("longname", FieldKind::Text),
    FieldRule::new("km", FieldKind::Float).sentinels(NOT_PUBLISHED),
    FieldRule::new("agency", FieldKind::Text),
    FieldRule::new("longitude", FieldKind::Float)
        .sentinels(NOT_PUBLISHED)
        .range(-180.0, 180.0),
    FieldRule::new("latitude", FieldKind::Float)
        .sentinels(NOT_PUBLISHED)
        .range(-90.0, 90.0),
    FieldRule::new("water_shortname", FieldKind::Text).from_column("water.shortname"),
    FieldRule::new("water_longname", FieldKind::Text)
        .from_column("water.longname")
        .allow(AllowList::Waters),
];

impl Record for GaugeStation {
    const SCHEMA: Schema = Schema {
        dataset: "pegelonline_stations",
        fields: GAUGE_STATION_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            uuid: fields.uuid("uuid")?,
            number: fields.integer("number")?,
            shortname: fields.text("shortname")?,
            longname: fields.text("longname")?,
            km: fields.opt_float("km")?,
            agency: fields.text("agency")?,
            longitude: fields.opt_float("longitude")?,
            latitude: fields.opt_float("latitude")?,
            water_shortname: fields.text("water_shortname")?,
            water_longname: fields.text("water_longname")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("uuid", self.uuid)
            .with("number", self.number)
            .with("shortname", self.shortname.clone())
            .with("longname", self.longname.clone())
            .with("km", self.km)
            .with("agency", self.agency.clone())
            .with("longitude", self.longitude)
            .with("latitude", self.latitude)
            .with("water_shortname", self.water_shortname.clone())
            .with("water_longname", self.water_longname.clone())
    }
}

/// Latest water level (`W`) of one gauge, in cm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWaterLevel {
    /// Gauge the measurement belongs to, injected from the request
    pub uuid: Uuid,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(rename = "stateMnwMhw")]
    pub state_mnw_mhw: String,
    #[serde(rename = "stateNswHsw")]
    pub state_nsw_hsw: String,
}

const CURRENT_WATER_LEVEL_FIELDS: &[FieldRule] = &[
    FieldRule::new("uuid", FieldKind::Uuid).bind(ContextKey::GaugeUuid),
    FieldRule::new("timestamp", OFFSET_TIMESTAMP),
    FieldRule::new("value", FieldKind::Float),
    FieldRule::new("state_mnw_mhw", FieldKind::Text).from_column("stateMnwMhw"),
    FieldRule::new("state_nsw_hsw", FieldKind::Text).from_column("stateNswHsw"),
];

impl Record for CurrentWaterLevel {
    const SCHEMA: Schema = Schema {
        dataset: "pegelonline_current_water_level",
        fields: CURRENT_WATER_LEVEL_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            uuid: fields.uuid("uuid")?,
            timestamp: fields.timestamp("timestamp")?,
            value: fields.float("value")?,
            state_mnw_mhw: fields.text("state_mnw_mhw")?,
            state_nsw_hsw: fields.text("state_nsw_hsw")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("uuid", self.uuid)
            .with("timestamp", self.timestamp)
            .with("value", self.value)
            .with("state_mnw_mhw", self.state_mnw_mhw.clone())
            .with("state_nsw_hsw", self.state_nsw_hsw.clone())
    }
}

/// Water level forecast or estimate (`WV`) for one gauge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterLevelForecast {
    pub uuid: Uuid,
    /// When the forecast run was initialized
    pub initialized: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// `forecast` or `estimate`
    #[serde(rename = "type")]
    pub kind: String,
}

pub const FORECAST_KINDS: &[&str] = &["forecast", "estimate"];

const WATER_LEVEL_FORECAST_FIELDS: &[FieldRule] = &[
    FieldRule::new("uuid", FieldKind::Uuid).bind(ContextKey::GaugeUuid),
    FieldRule::new("initialized", OFFSET_TIMESTAMP),
    FieldRule::new("timestamp", OFFSET_TIMESTAMP),
    FieldRule::new("value", FieldKind::Float),
    FieldRule::new("kind", FieldKind::OneOf(FORECAST_KINDS)).from_column("type"),
];

impl Record for WaterLevelForecast {
    const SCHEMA: Schema = Schema {
        dataset: "pegelonline_water_level_forecast",
        fields: WATER_LEVEL_FORECAST_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            uuid: fields.uuid("uuid")?,
            initialized: fields.timestamp("initialized")?,
            timestamp: fields.timestamp("timestamp")?,
            value: fields.float("value")?,
            kind: fields.text("kind")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("uuid", self.uuid)
            .with("initialized", self.initialized)
            .with("timestamp", self.timestamp)
            .with("value", self.value)
            .with("kind", self.kind.clone())
    }
}
