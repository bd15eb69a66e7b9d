// Deutscher Wetterdienst records: MOSMIX forecasts and 10-minute climate data

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schema::{
    ContextKey, FieldIssue, FieldKind, FieldRule, Fields, Record, Schema, TimeFormat, TzPolicy,
};
use crate::utils::DWD_STATION_ID_WIDTH;

/// Missing-value marker of the 10-minute climate products
pub const MISSING_MEASUREMENT: &[&str] = &["-999", "-999.0", "-999.00", "-999.000"];

/// Missing-value marker inside MOSMIX value strings
pub const MISSING_FORECAST: &[&str] = &["-"];

pub const BUNDESLAENDER: &[&str] = &[
    "Baden-Württemberg",
    "Bayern",
    "Berlin",
    "Brandenburg",
    "Bremen",
    "Hamburg",
    "Hessen",
    "Mecklenburg-Vorpommern",
    "Niedersachsen",
    "Nordrhein-Westfalen",
    "Rheinland-Pfalz",
    "Saarland",
    "Sachsen",
    "Sachsen-Anhalt",
    "Schleswig-Holstein",
    "Thüringen",
];

const STATION_ID: FieldKind = FieldKind::StationId {
    width: DWD_STATION_ID_WIDTH,
};

/// MOSMIX identifiers are alphanumeric ("10015", "P0489", "K428") but always carry a digit
const MOSMIX_ID: FieldKind = FieldKind::Pattern(r"^[0-9A-Z_]*[0-9][0-9A-Z_]*$");

const MEASURED_AT: FieldKind = FieldKind::Timestamp {
    format: TimeFormat::Minute,
    policy: TzPolicy::RequireUtc,
};

const ZULU: FieldKind = FieldKind::Timestamp {
    format: TimeFormat::IsoZulu,
    policy: TzPolicy::RequireUtc,
};

const DAY: FieldKind = FieldKind::Timestamp {
    format: TimeFormat::Day,
    policy: TzPolicy::RequireUtc,
};

/// One line of the MOSMIX station catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MosmixStation {
    pub id: String,
    pub icao: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: i64,
}

const MOSMIX_STATION_FIELDS: &[FieldRule] = &[
    FieldRule::new("id", MOSMIX_ID).from_column("ID"),
    FieldRule::new("icao", FieldKind::Text)
        .from_column("ICAO")
        .sentinels(&["----"]),
    FieldRule::new("name", FieldKind::Text).from_column("NAME"),
    FieldRule::new("latitude", FieldKind::Float)
        .from_column("LAT")
        .range(-90.0, 90.0),
    FieldRule::new("longitude", FieldKind::Float)
        .from_column("LON")
        .range(-180.0, 180.0),
    FieldRule::new("elevation", FieldKind::Integer).from_column("ELEV"),
];

impl Record for MosmixStation {
    const SCHEMA: Schema = Schema {
        dataset: "dwd_mosmix_stations",
        fields: MOSMIX_STATION_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            id: fields.text("id")?,
            icao: fields.opt_text("icao")?,
            name: fields.text("name")?,
            latitude: fields.float("latitude")?,
            longitude: fields.float("longitude")?,
            elevation: fields.integer("elevation")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("id", self.id.clone())
            .with("icao", self.icao.clone())
            .with("name", self.name.clone())
            .with("latitude", self.latitude)
            .with("longitude", self.longitude)
            .with("elevation", self.elevation)
    }
}

/// Station of the 10-minute precipitation / air temperature networks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateStation {
    pub station_id: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub elevation: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    /// Federal state
    pub state: String,
    /// Release status, `None` when the catalog line carries none
    pub release: Option<String>,
}

const CLIMATE_STATION_FIELDS: &[FieldRule] = &[
    FieldRule::new("station_id", STATION_ID).from_column("Stations_id"),
    FieldRule::new("valid_from", DAY).from_column("von_datum"),
    FieldRule::new("valid_to", DAY).from_column("bis_datum"),
    FieldRule::new("elevation", FieldKind::Integer).from_column("Stationshoehe"),
    FieldRule::new("latitude", FieldKind::Float)
        .from_column("geoBreite")
        .range(-90.0, 90.0),
    FieldRule::new("longitude", FieldKind::Float)
        .from_column("geoLaenge")
        .range(-180.0, 180.0),
    FieldRule::new("name", FieldKind::Text).from_column("Stationsname"),
    FieldRule::new("state", FieldKind::OneOf(BUNDESLAENDER)).from_column("Bundesland"),
    FieldRule::new("release", FieldKind::OneOf(&["Frei"]))
        .from_column("Abgabe")
        .sentinels(&["-"]),
];

impl Record for ClimateStation {
    const SCHEMA: Schema = Schema {
        dataset: "dwd_10min_stations",
        fields: CLIMATE_STATION_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            station_id: fields.text("station_id")?,
            valid_from: fields.timestamp("valid_from")?,
            valid_to: fields.timestamp("valid_to")?,
            elevation: fields.integer("elevation")?,
            latitude: fields.float("latitude")?,
            longitude: fields.float("longitude")?,
            name: fields.text("name")?,
            state: fields.text("state")?,
            release: fields.opt_text("release")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("station_id", self.station_id.clone())
            .with("valid_from", self.valid_from)
            .with("valid_to", self.valid_to)
            .with("elevation", self.elevation)
            .with("latitude", self.latitude)
            .with("longitude", self.longitude)
            .with("name", self.name.clone())
            .with("state", self.state.clone())
            .with("release", self.release.clone())
    }

    fn check(&self) -> Result<(), (&'static str, String)> {
        if self.valid_from > self.valid_to {
            return Err((
                "valid_to",
                format!(
                    "validity ends {} before it starts {}",
                    self.valid_to.date_naive(),
                    self.valid_from.date_naive()
                ),
            ));
        }
        Ok(())
    }
}

/// One 10-minute precipitation value (`10minutenwerte_nieder_*_now.zip`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationMeasurement {
    pub station_id: String,
    pub measured_at: DateTime<Utc>,
    pub quality_level: Option<i64>,
    /// Precipitation duration within the interval (min)
    pub duration: Option<i64>,
    /// Precipitation height (mm)
    pub precipitation_height: Option<f64>,
    pub precipitation_indicator: Option<i64>,
}

const PRECIPITATION_FIELDS: &[FieldRule] = &[
    FieldRule::new("station_id", STATION_ID)
        .from_column("STATIONS_ID")
        .bind(ContextKey::StationId),
    FieldRule::new("measured_at", MEASURED_AT).from_column("MESS_DATUM"),
    FieldRule::new("quality_level", FieldKind::Integer)
        .from_column("QN")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("duration", FieldKind::Integer)
        .from_column("RWS_DAU_10")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("precipitation_height", FieldKind::Float)
        .from_column("RWS_10")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("precipitation_indicator", FieldKind::Integer)
        .from_column("RWS_IND_10")
        .sentinels(MISSING_MEASUREMENT),
];

impl Record for PrecipitationMeasurement {
    const SCHEMA: Schema = Schema {
        dataset: "dwd_10min_precipitation",
        fields: PRECIPITATION_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            station_id: fields.text("station_id")?,
            measured_at: fields.timestamp("measured_at")?,
            quality_level: fields.opt_integer("quality_level")?,
            duration: fields.opt_integer("duration")?,
            precipitation_height: fields.opt_float("precipitation_height")?,
            precipitation_indicator: fields.opt_integer("precipitation_indicator")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("station_id", self.station_id.clone())
            .with("measured_at", self.measured_at)
            .with("quality_level", self.quality_level)
            .with("duration", self.duration)
            .with("precipitation_height", self.precipitation_height)
            .with("precipitation_indicator", self.precipitation_indicator)
    }
}

/// One 10-minute air temperature observation (`10minutenwerte_TU_*_now.zip`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureMeasurement {
    pub station_id: String,
    pub measured_at: DateTime<Utc>,
    pub quality_level: Option<i64>,
    /// Air pressure at station height (hPa)
    pub pressure: Option<f64>,
    /// Air temperature 2 m above ground (°C)
    pub air_temperature: Option<f64>,
    /// Air temperature 5 cm above ground (°C)
    pub ground_temperature: Option<f64>,
    /// Relative humidity (%)
    pub relative_humidity: Option<f64>,
    pub dew_point: Option<f64>,
}

const TEMPERATURE_FIELDS: &[FieldRule] = &[
    FieldRule::new("station_id", STATION_ID)
        .from_column("STATIONS_ID")
        .bind(ContextKey::StationId),
    FieldRule::new("measured_at", MEASURED_AT).from_column("MESS_DATUM"),
    FieldRule::new("quality_level", FieldKind::Integer)
        .from_column("QN")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("pressure", FieldKind::Float)
        .from_column("PP_10")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("air_temperature", FieldKind::Float)
        .from_column("TT_10")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("ground_temperature", FieldKind::Float)
        .from_column("TM5_10")
        .sentinels(MISSING_MEASUREMENT),
    FieldRule::new("relative_humidity", FieldKind::Float)
        .from_column("RF_10")
        .sentinels(MISSING_MEASUREMENT)
        .range(0.0, 100.0),
    FieldRule::new("dew_point", FieldKind::Float)
        .from_column("TD_10")
        .sentinels(MISSING_MEASUREMENT),
];

impl Record for TemperatureMeasurement {
    const SCHEMA: Schema = Schema {
        dataset: "dwd_10min_air_temperature",
        fields: TEMPERATURE_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            station_id: fields.text("station_id")?,
            measured_at: fields.timestamp("measured_at")?,
            quality_level: fields.opt_integer("quality_level")?,
            pressure: fields.opt_float("pressure")?,
            air_temperature: fields.opt_float("air_temperature")?,
            ground_temperature: fields.opt_float("ground_temperature")?,
            relative_humidity: fields.opt_float("relative_humidity")?,
            dew_point: fields.opt_float("dew_point")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("station_id", self.station_id.clone())
            .with("measured_at", self.measured_at)
            .with("quality_level", self.quality_level)
            .with("pressure", self.pressure)
            .with("air_temperature", self.air_temperature)
            .with("ground_temperature", self.ground_temperature)
            .with("relative_humidity", self.relative_humidity)
            .with("dew_point", self.dew_point)
    }
}

/// Header of a MOSMIX forecast document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastIssue {
    pub station_id: String,
    pub issue_time: DateTime<Utc>,
}

const FORECAST_ISSUE_FIELDS: &[FieldRule] = &[
    FieldRule::new("station_id", MOSMIX_ID).bind(ContextKey::StationId),
    FieldRule::new("issue_time", ZULU),
];

impl Record for ForecastIssue {
    const SCHEMA: Schema = Schema {
        dataset: "dwd_mosmix_forecast",
        fields: FORECAST_ISSUE_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            station_id: fields.text("station_id")?,
            issue_time: fields.timestamp("issue_time")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("station_id", self.station_id.clone())
            .with("issue_time", self.issue_time)
    }
}

/// Forecast values for one time step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub station_id: String,
    pub issue_time: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    /// Precipitation during the last hour (kg/m2)
    #[serde(rename = "RR1c")]
    pub rr1c: Option<f64>,
    /// Precipitation during the last 3 hours (kg/m2)
    #[serde(rename = "RR3c")]
    pub rr3c: Option<f64>,
    /// Temperature 2 m above surface (K)
    #[serde(rename = "TTT")]
    pub ttt: Option<f64>,
}

const FORECAST_POINT_FIELDS: &[FieldRule] = &[
    FieldRule::new("station_id", MOSMIX_ID).bind(ContextKey::StationId),
    FieldRule::new("issue_time", ZULU),
    FieldRule::new("timestamp", ZULU),
    FieldRule::new("rr1c", FieldKind::Float)
        .from_column("RR1c")
        .sentinels(MISSING_FORECAST),
    FieldRule::new("rr3c", FieldKind::Float)
        .from_column("RR3c")
        .sentinels(MISSING_FORECAST),
    FieldRule::new("ttt", FieldKind::Float)
        .from_column("TTT")
        .sentinels(MISSING_FORECAST),
];

impl Record for ForecastPoint {
    const SCHEMA: Schema = Schema {
        dataset: "dwd_mosmix_forecast",
        fields: FORECAST_POINT_FIELDS,
    };

    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue> {
        Ok(Self {
            station_id: fields.text("station_id")?,
            issue_time: fields.timestamp("issue_time")?,
            timestamp: fields.timestamp("timestamp")?,
            rr1c: fields.opt_float("rr1c")?,
            rr3c: fields.opt_float("rr3c")?,
            ttt: fields.opt_float("ttt")?,
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("station_id", self.station_id.clone())
            .with("issue_time", self.issue_time)
            .with("timestamp", self.timestamp)
            .with("rr1c", self.rr1c)
            .with("rr3c", self.rr3c)
            .with("ttt", self.ttt)
    }
}

/// Whole forecast as parallel sequences, one entry per time step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub station_id: String,
    pub issue_time: DateTime<Utc>,
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(rename = "RR1c")]
    pub rr1c: Vec<Option<f64>>,
    #[serde(rename = "RR3c")]
    pub rr3c: Vec<Option<f64>>,
    #[serde(rename = "TTT")]
    pub ttt: Vec<Option<f64>>,
}

impl ForecastSeries {
    pub fn from_points(issue: ForecastIssue, points: &[ForecastPoint]) -> Self {
        Self {
            station_id: issue.station_id,
            issue_time: issue.issue_time,
            timestamps: points.iter().map(|p| p.timestamp).collect(),
            rr1c: points.iter().map(|p| p.rr1c).collect(),
            rr3c: points.iter().map(|p| p.rr3c).collect(),
            ttt: points.iter().map(|p| p.ttt).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{parse_table, Row, TableFormat};
    use crate::validator::{validate, validate_one, ValidationContext, ViolationKind};
    use chrono::TimeZone;

    #[test]
    fn test_mosmix_catalog_validation() {
        let text = "\
ID    ICAO NAME                 LAT    LON     ELEV
----- ---- -------------------- ------ ------- -----
10015 EDXH HELGOLAND             54.11    7.54     4
P0489 ---- MUENSTER              52.08    7.42    48
";
        let rows = parse_table(text, TableFormat::FixedWidth).unwrap();
        let stations: Vec<MosmixStation> = validate(&rows, &ValidationContext::new()).unwrap();

        assert_eq!(stations[0].icao.as_deref(), Some("EDXH"));
        assert_eq!(stations[1].icao, None);
        assert_eq!(stations[1].elevation, 48);
    }

    #[test]
    fn test_mosmix_id_needs_a_digit() {
        let row = Row::from_pairs([
            ("ID", "ABCDE"),
            ("ICAO", "----"),
            ("NAME", "X"),
            ("LAT", "1.0"),
            ("LON", "1.0"),
            ("ELEV", "1"),
        ]);
        let err = validate_one::<MosmixStation>(&row, &ValidationContext::new()).unwrap_err();
        assert_eq!(err.field, "id");
    }

    #[test]
    fn test_climate_station_release_defaults_to_absent() {
        let text = "\
Stations_id von_datum bis_datum Stationshoehe geoBreite geoLaenge Stationsname Bundesland Abgabe
----------- --------- --------- ------------- --------- --------- ------------ ---------- ------
00073 20070215 20240101            374     48.6183   13.0620 Aldersbach-Kramersepp                    Bayern
";
        let rows = parse_table(text, TableFormat::StationText).unwrap();
        let stations: Vec<ClimateStation> = validate(&rows, &ValidationContext::new()).unwrap();

        assert_eq!(stations[0].release, None);
        assert_eq!(stations[0].state, "Bayern");
        assert_eq!(
            stations[0].valid_from,
            Utc.with_ymd_and_hms(2007, 2, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_climate_station_unknown_state() {
        let text = "h\n--\n00073 20070215 20240101 374 48.6183 13.0620 Aldersbach Kramersepp\n";
        let rows = parse_table(text, TableFormat::StationText).unwrap();

        let err = validate::<ClimateStation>(&rows, &ValidationContext::new()).unwrap_err();
        assert_eq!(err.field, "state");
        assert_eq!(err.actual, "Kramersepp");
    }

    #[test]
    fn test_temperature_sentinels() {
        let text = "\
STATIONS_ID;MESS_DATUM;  QN;PP_10;TT_10;TM5_10;RF_10;TD_10;eor
       1048;202401010000;    3;   -999;   2.1;   1.3;  93.0;   1.1;eor
";
        let rows = parse_table(text, TableFormat::Delimited).unwrap();
        let ctx = ValidationContext::new().with_station_id("01048");
        let values: Vec<TemperatureMeasurement> = validate(&rows, &ctx).unwrap();

        assert_eq!(values[0].station_id, "01048");
        assert_eq!(values[0].pressure, None);
        assert_eq!(values[0].air_temperature, Some(2.1));
    }

    #[test]
    fn test_forecast_point_requires_utc() {
        let row = Row::from_pairs([
            ("station_id", "10015"),
            ("issue_time", "2024-01-01T03:00:00.000Z"),
            ("timestamp", "2024-01-01T04:00:00+01:00"),
            ("RR1c", "-"),
            ("RR3c", "-"),
            ("TTT", "276.85"),
        ]);
        let err = validate_one::<ForecastPoint>(&row, &ValidationContext::new()).unwrap_err();
        assert_eq!(err.kind, ViolationKind::NotUtc);
        assert_eq!(err.field, "timestamp");
    }

    #[test]
    fn test_series_from_points() {
        let issue_time = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let point = |hour, rr1c| ForecastPoint {
            station_id: "10015".to_string(),
            issue_time,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            rr1c,
            rr3c: None,
            ttt: None,
        };
        let issue = ForecastIssue {
            station_id: "10015".to_string(),
            issue_time,
        };

        let series = ForecastSeries::from_points(issue, &[point(4, Some(0.1)), point(5, None)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.rr1c, vec![Some(0.1), None]);
        assert_eq!(series.rr3c, vec![None, None]);
    }
}
