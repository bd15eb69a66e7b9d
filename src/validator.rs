// Generic, rule-table driven validation of parsed rows into typed records

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::kml::RawForecast;
use crate::records::dwd::{ForecastIssue, ForecastPoint, ForecastSeries};
use crate::schema::{
    AllowList, ContextKey, FieldIssue, FieldKind, FieldRule, FieldValue, Fields, Record, Schema,
    TimeFormat, TzPolicy,
};
use crate::table::Row;
use crate::utils::pad_station_id;

/// Expected identifiers and allow-lists supplied by the caller of one validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    station_id: Option<String>,
    gauge_uuid: Option<String>,
    waters: Option<Vec<String>>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_station_id(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }

    pub fn with_gauge_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.gauge_uuid = Some(uuid.into());
        self
    }

    pub fn with_waters<I, S>(mut self, waters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.waters = Some(waters.into_iter().map(Into::into).collect());
        self
    }

    pub fn bound(&self, key: ContextKey) -> Option<&str> {
        match key {
            ContextKey::StationId => self.station_id.as_deref(),
            ContextKey::GaugeUuid => self.gauge_uuid.as_deref(),
        }
    }

    pub fn allowed(&self, list: AllowList) -> Option<&[String]> {
        match list {
            AllowList::Waters => self.waters.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Missing,
    InvalidValue,
    NotUtc,
    ContextMismatch,
    NotAllowed,
    OutOfRange,
    Inconsistent,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ViolationKind::Missing => "missing value",
            ViolationKind::InvalidValue => "invalid value",
            ViolationKind::NotUtc => "timestamp is not UTC",
            ViolationKind::ContextMismatch => "does not match the requested resource",
            ViolationKind::NotAllowed => "value not in the requested allow-list",
            ViolationKind::OutOfRange => "value out of range",
            ViolationKind::Inconsistent => "inconsistent record",
        };
        f.write_str(text)
    }
}

/// A row failed its record type's rules
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{dataset} row {row}, field '{field}': {kind} (expected {expected}, got {actual:?})")]
pub struct SchemaViolation {
    pub dataset: &'static str,
    pub row: usize,
    pub field: String,
    pub kind: ViolationKind,
    pub expected: String,
    pub actual: String,
}

/// Requested forecast output shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForecastShape {
    /// One object with parallel sequences
    #[default]
    Series,
    /// One record per timestamp
    Points,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForecastOutput {
    Series(ForecastSeries),
    Points(Vec<ForecastPoint>),
}

/// Validate every row into `R`; the first violation aborts the whole call
#[instrument(skip(rows, ctx), fields(dataset = R::SCHEMA.dataset, rows = rows.len()))]
pub fn validate<R: Record>(rows: &[Row], ctx: &ValidationContext) -> Result<Vec<R>, SchemaViolation> {
    let rules = CompiledRules::new(R::SCHEMA)?;

    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| rules.record::<R>(index, row, ctx))
        .collect::<Result<Vec<R>, _>>()?;

    debug!("Validated {} {} records", records.len(), R::SCHEMA.dataset);
    Ok(records)
}

pub fn validate_one<R: Record>(row: &Row, ctx: &ValidationContext) -> Result<R, SchemaViolation> {
    CompiledRules::new(R::SCHEMA)?.record::<R>(0, row, ctx)
}

/// Render a record back into a row in its provider's source layout
pub fn render_row<R: Record>(record: &R) -> Row {
    let schema = R::SCHEMA;
    let fields = record.to_fields();

    let columns: Arc<[String]> = schema
        .fields
        .iter()
        .map(|rule| rule.source.to_string())
        .collect::<Vec<_>>()
        .into();
    let values = schema
        .fields
        .iter()
        .map(|rule| render_value(rule, fields.get(rule.name)))
        .collect();

    Row::new(columns, values)
}

pub fn render_rows<R: Record>(records: &[R]) -> Vec<Row> {
    records.iter().map(render_row).collect()
}

/// Validate a parsed MOSMIX forecast and emit it in the requested shape
#[instrument(skip(raw, ctx), fields(steps = raw.len()))]
pub fn validate_forecast(
    raw: &RawForecast,
    shape: ForecastShape,
    ctx: &ValidationContext,
) -> Result<ForecastOutput, SchemaViolation> {
    let header = Row::from_pairs([
        ("station_id", raw.station.clone().unwrap_or_default()),
        ("issue_time", raw.issue_time.clone()),
    ]);
    let issue: ForecastIssue = validate_one(&header, ctx)?;
    let points: Vec<ForecastPoint> = validate(&raw.to_rows(), ctx)?;

    Ok(match shape {
        ForecastShape::Points => ForecastOutput::Points(points),
        ForecastShape::Series => ForecastOutput::Series(ForecastSeries::from_points(issue, &points)),
    })
}

struct CompiledRules {
    schema: Schema,
    patterns: Vec<Option<Regex>>,
}

impl CompiledRules {
    fn new(schema: Schema) -> Result<Self, SchemaViolation> {
        let patterns = schema
            .fields
            .iter()
            .map(|rule| match rule.kind {
                FieldKind::Pattern(pattern) => Regex::new(pattern).map(Some).map_err(|e| SchemaViolation {
                    dataset: schema.dataset,
                    row: 0,
                    field: rule.name.to_string(),
                    kind: ViolationKind::InvalidValue,
                    expected: "valid regular expression".to_string(),
                    actual: e.to_string(),
                }),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { schema, patterns })
    }

    fn record<R: Record>(&self, index: usize, row: &Row, ctx: &ValidationContext) -> Result<R, SchemaViolation> {
        let fields = self.fields(index, row, ctx)?;

        let record = R::from_fields(&fields).map_err(|issue| self.issue_violation(index, issue))?;
        record.check().map_err(|(field, reason)| self.violation(
            index,
            field,
            ViolationKind::Inconsistent,
            reason,
            String::new(),
        ))?;

        Ok(record)
    }

    fn fields(&self, index: usize, row: &Row, ctx: &ValidationContext) -> Result<Fields, SchemaViolation> {
        let mut fields = Fields::new();

        for (rule, pattern) in self.schema.fields.iter().zip(&self.patterns) {
            let raw = row.get(rule.source).unwrap_or_default().trim();
            let bound = rule.bind.and_then(|key| ctx.bound(key));
            let coerce_text = |text: &str| {
                coerce(rule, pattern.as_ref(), text)
                    .map_err(|(kind, expected)| self.violation(index, rule.name, kind, expected, text.to_string()))
            };

            let no_value = raw.is_empty() || rule.is_sentinel(raw);
            let value = match (no_value, bound) {
                // Inject the caller's identifier
                (true, Some(expected)) => coerce_text(expected.trim())?,
                (true, None) if rule.is_sentinel(raw) => FieldValue::Absent,
                (true, None) => {
                    return Err(self.violation(
                        index,
                        rule.name,
                        ViolationKind::Missing,
                        rule.kind.describe(),
                        raw.to_string(),
                    ))
                }
                (false, None) => coerce_text(raw)?,
                (false, Some(expected)) => {
                    let value = coerce_text(raw)?;
                    let expected = coerce_text(expected.trim())?;
                    if value != expected {
                        return Err(self.violation(
                            index,
                            rule.name,
                            ViolationKind::ContextMismatch,
                            format!("{} {}", rule.bind.map_or("", ContextKey::label), render_value(rule, &expected)),
                            raw.to_string(),
                        ));
                    }
                    value
                }
            };

            if let Some(allowed) = rule.allow.and_then(|list| ctx.allowed(list)) {
                let permitted = matches!(&value, FieldValue::Text(text) if allowed.contains(text));
                if !permitted {
                    return Err(self.violation(
                        index,
                        rule.name,
                        ViolationKind::NotAllowed,
                        format!("one of {allowed:?}"),
                        raw.to_string(),
                    ));
                }
            }

            if let Some((min, max)) = rule.range {
                let number = match &value {
                    FieldValue::Integer(i) => Some(*i as f64),
                    FieldValue::Float(f) => Some(*f),
                    _ => None,
                };
                if number.is_some_and(|n| n < min || n > max) {
                    return Err(self.violation(
                        index,
                        rule.name,
                        ViolationKind::OutOfRange,
                        format!("value within [{min}, {max}]"),
                        raw.to_string(),
                    ));
                }
            }

            fields.insert(rule.name, value);
        }

        Ok(fields)
    }

    fn violation(
        &self,
        row: usize,
        field: &str,
        kind: ViolationKind,
        expected: String,
        actual: String,
    ) -> SchemaViolation {
        SchemaViolation {
            dataset: self.schema.dataset,
            row,
            field: field.to_string(),
            kind,
            expected,
            actual,
        }
    }

    fn issue_violation(&self, row: usize, issue: FieldIssue) -> SchemaViolation {
        let kind = if issue.actual == "absent" {
            ViolationKind::Missing
        } else {
            ViolationKind::InvalidValue
        };
        self.violation(row, &issue.field, kind, issue.expected, issue.actual)
    }
}

type Coercion = Result<FieldValue, (ViolationKind, String)>;

fn coerce(rule: &FieldRule, pattern: Option<&Regex>, raw: &str) -> Coercion {
    let invalid = || (ViolationKind::InvalidValue, rule.kind.describe());

    match rule.kind {
        FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
        FieldKind::Pattern(_) => match pattern {
            Some(re) if re.is_match(raw) => Ok(FieldValue::Text(raw.to_string())),
            _ => Err(invalid()),
        },
        FieldKind::OneOf(values) => {
            if values.contains(&raw) {
                Ok(FieldValue::Text(raw.to_string()))
            } else {
                Err(invalid())
            }
        }
        FieldKind::Integer => raw.parse::<i64>().map(FieldValue::Integer).map_err(|_| invalid()),
        FieldKind::Float => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(FieldValue::Float(value)),
            _ => Err(invalid()),
        },
        FieldKind::StationId { width } => pad_station_id(raw, width)
            .map(FieldValue::Text)
            .map_err(|_| invalid()),
        FieldKind::Uuid => Uuid::parse_str(raw).map(FieldValue::Uuid).map_err(|_| invalid()),
        FieldKind::Timestamp { format, policy } => parse_timestamp(raw, format, policy).map(FieldValue::Timestamp),
    }
}

fn parse_timestamp(raw: &str, format: TimeFormat, policy: TzPolicy) -> Result<DateTime<Utc>, (ViolationKind, String)> {
    let invalid = || (ViolationKind::InvalidValue, format.describe().to_string());

    match format {
        TimeFormat::Minute => NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| invalid()),
        TimeFormat::Day => NaiveDate::parse_from_str(raw, "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(invalid),
        TimeFormat::IsoZulu | TimeFormat::IsoOffset => {
            let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?;

            if parsed.offset().local_minus_utc() != 0 && policy == TzPolicy::RequireUtc {
                return Err((ViolationKind::NotUtc, "UTC offset".to_string()));
            }
            if format == TimeFormat::IsoZulu && !raw.ends_with('Z') {
                return Err(invalid());
            }

            Ok(parsed.with_timezone(&Utc))
        }
    }
}

/// Provider text for one value; absence renders as the first sentinel
fn render_value(rule: &FieldRule, value: &FieldValue) -> String {
    match value {
        FieldValue::Absent => rule.sentinels.first().map(|s| s.to_string()).unwrap_or_default(),
        FieldValue::Text(text) => text.clone(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Uuid(u) => u.hyphenated().to_string(),
        FieldValue::Timestamp(t) => match rule.kind {
            FieldKind::Timestamp { format: TimeFormat::Minute, .. } => t.format("%Y%m%d%H%M").to_string(),
            FieldKind::Timestamp { format: TimeFormat::Day, .. } => t.format("%Y%m%d").to_string(),
            FieldKind::Timestamp { format: TimeFormat::IsoZulu, .. } => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            _ => t.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        },
    }
}
