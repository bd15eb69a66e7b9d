// MOSMIX-L single station forecasts (KML inside KMZ)
//
// Relevant document skeleton, namespace prefixes omitted:
//
//   kml/Document/ExtendedData/ProductDefinition/IssueTime
//   kml/Document/ExtendedData/ProductDefinition/ForecastTimeSteps/TimeStep*
//   kml/Document/Placemark/name
//   kml/Document/Placemark/ExtendedData/Forecast[@elementName]/value

use std::collections::BTreeMap;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, instrument};

use crate::container::{parse_container, ContainerError, ContainerKind};
use crate::table::Row;

/// Literal used by DWD (and by the backfill) for a missing forecast value
pub const ABSENT_VALUE: &str = "-";

/// Forecast parameters extracted from MOSMIX-L, in output column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForecastParameter {
    /// Total precipitation during the last hour (kg/m2)
    RR1c,
    /// Total precipitation during the last 3 hours (kg/m2)
    RR3c,
    /// Temperature 2m above surface (K)
    TTT,
}

impl ForecastParameter {
    pub const ALL: [ForecastParameter; 3] = [
        ForecastParameter::RR1c,
        ForecastParameter::RR3c,
        ForecastParameter::TTT,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ForecastParameter::RR1c => "RR1c",
            ForecastParameter::RR3c => "RR3c",
            ForecastParameter::TTT => "TTT",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KmlError {
    #[error("Failed to unwrap KMZ: {0}")]
    Container(#[from] ContainerError),

    #[error("Missing or empty element: {0}")]
    MissingField(String),

    #[error("No forecasts found for parameters RR1c, RR3c or TTT")]
    NoData,

    #[error("Malformed forecast document: {0}")]
    Malformed(String),
}

/// Parsed forecast before validation: parallel sequences of raw strings.
///
/// Every parameter sequence has exactly `timestamps.len()` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawForecast {
    pub station: Option<String>,
    pub issue_time: String,
    pub timestamps: Vec<String>,
    pub values: BTreeMap<ForecastParameter, Vec<String>>,
}

pub const FORECAST_ROW_COLUMNS: [&str; 6] =
    ["station_id", "issue_time", "timestamp", "RR1c", "RR3c", "TTT"];

impl RawForecast {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn series(&self, parameter: ForecastParameter) -> &[String] {
        self.values.get(&parameter).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exploded shape: one row per timestamp
    pub fn to_rows(&self) -> Vec<Row> {
        let columns: Arc<[String]> = FORECAST_ROW_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .into();
        let station = self.station.clone().unwrap_or_default();

        self.timestamps
            .iter()
            .enumerate()
            .map(|(i, timestamp)| {
                let mut values = vec![station.clone(), self.issue_time.clone(), timestamp.clone()];
                for parameter in ForecastParameter::ALL {
                    let value = self
                        .series(parameter)
                        .get(i)
                        .map_or(ABSENT_VALUE, String::as_str);
                    values.push(value.to_string());
                }
                Row::new(columns.clone(), values)
            })
            .collect()
    }
}

/// Unwrap a MOSMIX-L KMZ and extract issue time, time steps and forecast values
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn parse_kml_forecast(bytes: &[u8]) -> Result<RawForecast, KmlError> {
    let kml = parse_container(bytes, ContainerKind::Kmz)?;
    parse_kml_document(&kml)
}

/// Parse an already extracted KML document
pub fn parse_kml_document(kml: &str) -> Result<RawForecast, KmlError> {
    let mut reader = Reader::from_str(kml);
    reader.trim_text(true);

    let mut state = DocumentState::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.open(&e)?,
            Ok(Event::Empty(e)) => {
                state.open(&e)?;
                state.close()?;
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| KmlError::Malformed(e.to_string()))?;
                state.text.push_str(&text);
            }
            Ok(Event::CData(t)) => {
                state.text.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::End(_)) => state.close()?,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(KmlError::Malformed(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    state.finish()
}

#[derive(Default)]
struct DocumentState {
    path: Vec<String>,
    text: String,
    issue_time: Option<String>,
    time_steps_seen: bool,
    timestamps: Vec<String>,
    placemarks: usize,
    station: Option<String>,
    // Parameter of the enclosing allow-listed Forecast element, if any
    forecast: Option<ForecastParameter>,
    forecast_value_seen: bool,
    values: BTreeMap<ForecastParameter, Vec<String>>,
}

impl DocumentState {
    fn open(&mut self, element: &BytesStart) -> Result<(), KmlError> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        self.text.clear();

        match name.as_str() {
            "Placemark" => {
                self.placemarks += 1;
                if self.placemarks > 1 {
                    return Err(KmlError::Malformed(
                        "expected exactly one Placemark".to_string(),
                    ));
                }
            }
            "ForecastTimeSteps" => self.time_steps_seen = true,
            "Forecast" if self.within("Placemark") => {
                self.forecast = element_name(element)?
                    .as_deref()
                    .and_then(ForecastParameter::from_code);
                self.forecast_value_seen = false;
            }
            _ => {}
        }

        self.path.push(name);
        Ok(())
    }

    fn close(&mut self) -> Result<(), KmlError> {
        let name = self.path.pop().unwrap_or_default();
        let parent = self.path.last().map(String::as_str);
        let text = std::mem::take(&mut self.text);
        let text = text.trim();

        match (name.as_str(), parent) {
            ("IssueTime", _) => {
                if !text.is_empty() {
                    self.issue_time = Some(text.to_string());
                }
            }
            ("TimeStep", Some("ForecastTimeSteps")) => {
                if text.is_empty() {
                    return Err(KmlError::MissingField("TimeStep".to_string()));
                }
                self.timestamps.push(text.to_string());
            }
            ("name", Some("Placemark")) if !text.is_empty() => {
                self.station = Some(text.to_string());
            }
            ("value", Some("Forecast")) => {
                if let Some(parameter) = self.forecast {
                    if !text.is_empty() {
                        self.forecast_value_seen = true;
                        self.values.insert(
                            parameter,
                            text.split_whitespace().map(str::to_string).collect(),
                        );
                    }
                }
            }
            ("Forecast", _) => {
                if let Some(parameter) = self.forecast.take() {
                    if !self.forecast_value_seen {
                        return Err(KmlError::MissingField(format!(
                            "value of {}",
                            parameter.code()
                        )));
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn within(&self, element: &str) -> bool {
        self.path.iter().any(|p| p == element)
    }

    fn finish(self) -> Result<RawForecast, KmlError> {
        let issue_time = self
            .issue_time
            .ok_or_else(|| KmlError::MissingField("IssueTime".to_string()))?;
        if !self.time_steps_seen {
            return Err(KmlError::MissingField("ForecastTimeSteps".to_string()));
        }
        if self.placemarks == 0 {
            return Err(KmlError::MissingField("Placemark".to_string()));
        }
        if self.values.is_empty() {
            return Err(KmlError::NoData);
        }

        let steps = self.timestamps.len();
        let mut values = self.values;
        for parameter in ForecastParameter::ALL {
            let series = values.entry(parameter).or_default();
            if series.len() > steps {
                return Err(KmlError::Malformed(format!(
                    "{} has {} values for {} time steps",
                    parameter.code(),
                    series.len(),
                    steps
                )));
            }
            series.resize(steps, ABSENT_VALUE.to_string());
        }

        debug!(
            "Parsed forecast issued {} with {} time steps",
            issue_time, steps
        );

        Ok(RawForecast {
            station: self.station,
            issue_time,
            timestamps: self.timestamps,
            values,
        })
    }
}

fn element_name(element: &BytesStart) -> Result<Option<String>, KmlError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| KmlError::Malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() == b"elementName" {
            let value = attr
                .unescape_value()
                .map_err(|e| KmlError::Malformed(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
