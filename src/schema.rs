// Declarative field rules shared by every record type
//
// A record type is described by a `Schema`: one `FieldRule` per field, naming
// the source column, how the raw string is coerced, which literals mean
// "no value" and how the field relates to the validation context.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Which context value a bound field is injected from / checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKey {
    StationId,
    GaugeUuid,
}

impl ContextKey {
    pub fn label(self) -> &'static str {
        match self {
            ContextKey::StationId => "station_id",
            ContextKey::GaugeUuid => "gauge_uuid",
        }
    }
}

/// Which context allow-list restricts a categorical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowList {
    Waters,
}

/// Source layout of a timestamp field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `YYYYMMDDHHMM`, no offset, UTC per DWD documentation
    Minute,
    /// `YYYYMMDD`, midnight UTC
    Day,
    /// ISO-8601 ending in `Z`
    IsoZulu,
    /// ISO-8601 with an explicit numeric offset
    IsoOffset,
}

impl TimeFormat {
    pub fn describe(self) -> &'static str {
        match self {
            TimeFormat::Minute => "YYYYMMDDHHMM timestamp",
            TimeFormat::Day => "YYYYMMDD date",
            TimeFormat::IsoZulu => "ISO-8601 timestamp with Z suffix",
            TimeFormat::IsoOffset => "ISO-8601 timestamp with offset",
        }
    }
}

/// Post-condition on offset-carrying timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TzPolicy {
    /// Input must already be UTC; anything else is provider format drift
    RequireUtc,
    /// Input may carry any offset and is converted
    ConvertToUtc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text that must contain a match of the regex
    Pattern(&'static str),
    /// Text restricted to a closed vocabulary
    OneOf(&'static [&'static str]),
    Integer,
    /// Finite floating point number
    Float,
    /// Numeric identifier, zero-padded to `width` before any comparison
    StationId { width: usize },
    Uuid,
    Timestamp { format: TimeFormat, policy: TzPolicy },
}

impl FieldKind {
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Text => "text".to_string(),
            FieldKind::Pattern(pattern) => format!("text matching /{pattern}/"),
            FieldKind::OneOf(values) => format!("one of {values:?}"),
            FieldKind::Integer => "integer".to_string(),
            FieldKind::Float => "finite float".to_string(),
            FieldKind::StationId { width } => format!("numeric station id of at most {width} digits"),
            FieldKind::Uuid => "UUID".to_string(),
            FieldKind::Timestamp { format, .. } => format.describe().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Field name in the typed record
    pub name: &'static str,
    /// Column name in the provider row
    pub source: &'static str,
    pub kind: FieldKind,
    /// Literals the provider uses for "no value"; the first one is used when rendering
    pub sentinels: &'static [&'static str],
    pub bind: Option<ContextKey>,
    pub allow: Option<AllowList>,
    /// Inclusive bounds for numeric fields
    pub range: Option<(f64, f64)>,
}

impl FieldRule {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            source: name,
            kind,
            sentinels: &[],
            bind: None,
            allow: None,
            range: None,
        }
    }

    pub const fn from_column(mut self, source: &'static str) -> Self {
        self.source = source;
        self
    }

    pub const fn sentinels(mut self, sentinels: &'static [&'static str]) -> Self {
        self.sentinels = sentinels;
        self
    }

    pub const fn bind(mut self, key: ContextKey) -> Self {
        self.bind = Some(key);
        self
    }

    pub const fn allow(mut self, list: AllowList) -> Self {
        self.allow = Some(list);
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn is_sentinel(&self, raw: &str) -> bool {
        self.sentinels.contains(&raw)
    }
}

/// Rule table of one record type
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Dataset label used in violations and logs
    pub dataset: &'static str,
    pub fields: &'static [FieldRule],
}

impl Schema {
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|rule| rule.name == name)
    }
}

/// A coerced field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Sentinel-mapped or otherwise missing value
    Absent,
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Absent => "absent",
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Uuid(_) => "UUID",
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Text)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Integer)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Float)
    }
}

impl From<Option<DateTime<Utc>>> for FieldValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Timestamp)
    }
}

/// Failure to read a typed value out of [`Fields`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl FieldIssue {
    fn new(field: &str, expected: &str, actual: &FieldValue) -> Self {
        Self {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }
}

static ABSENT: FieldValue = FieldValue::Absent;

/// Validated values of one row, keyed by rule name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(&'static str, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value.into());
        self
    }

    pub fn insert(&mut self, name: &'static str, value: FieldValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Missing entries read as [`FieldValue::Absent`]
    pub fn get(&self, name: &str) -> &FieldValue {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .unwrap_or(&ABSENT)
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<String>, FieldIssue> {
        match self.get(name) {
            FieldValue::Absent => Ok(None),
            FieldValue::Text(s) => Ok(Some(s.clone())),
            other => Err(FieldIssue::new(name, "text", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<String, FieldIssue> {
        self.opt_text(name)?
            .ok_or_else(|| FieldIssue::new(name, "text", &FieldValue::Absent))
    }

    pub fn opt_integer(&self, name: &str) -> Result<Option<i64>, FieldIssue> {
        match self.get(name) {
            FieldValue::Absent => Ok(None),
            FieldValue::Integer(i) => Ok(Some(*i)),
            other => Err(FieldIssue::new(name, "integer", other)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, FieldIssue> {
        self.opt_integer(name)?
            .ok_or_else(|| FieldIssue::new(name, "integer", &FieldValue::Absent))
    }

    pub fn opt_float(&self, name: &str) -> Result<Option<f64>, FieldIssue> {
        match self.get(name) {
            FieldValue::Absent => Ok(None),
            FieldValue::Float(f) => Ok(Some(*f)),
            other => Err(FieldIssue::new(name, "float", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, FieldIssue> {
        self.opt_float(name)?
            .ok_or_else(|| FieldIssue::new(name, "float", &FieldValue::Absent))
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>, FieldIssue> {
        match self.get(name) {
            FieldValue::Timestamp(t) => Ok(*t),
            other => Err(FieldIssue::new(name, "timestamp", other)),
        }
    }

    pub fn uuid(&self, name: &str) -> Result<Uuid, FieldIssue> {
        match self.get(name) {
            FieldValue::Uuid(u) => Ok(*u),
            other => Err(FieldIssue::new(name, "UUID", other)),
        }
    }
}

/// A typed record described by a rule table
pub trait Record: Sized {
    const SCHEMA: Schema;

    /// Build the record from values that already passed every field rule
    fn from_fields(fields: &Fields) -> Result<Self, FieldIssue>;

    /// Field values for re-rendering the record as a provider row
    fn to_fields(&self) -> Fields;

    /// Cross-field rules; `Err` carries the offending field and a reason
    fn check(&self) -> Result<(), (&'static str, String)> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builders() {
        const RULE: FieldRule = FieldRule::new("station_id", FieldKind::StationId { width: 5 })
            .from_column("STATIONS_ID")
            .sentinels(&["-999"])
            .bind(ContextKey::StationId);

        assert_eq!(RULE.source, "STATIONS_ID");
        assert!(RULE.is_sentinel("-999"));
        assert!(!RULE.is_sentinel("-999.0"));
        assert_eq!(RULE.bind, Some(ContextKey::StationId));
        assert_eq!(RULE.range, None);
    }

    #[test]
    fn test_fields_typed_access() {
        let fields = Fields::new()
            .with("name", Some("HELGOLAND".to_string()))
            .with("elevation", Some(4i64))
            .with("rain", None::<f64>);

        assert_eq!(fields.text("name").unwrap(), "HELGOLAND");
        assert_eq!(fields.integer("elevation").unwrap(), 4);
        assert_eq!(fields.opt_float("rain").unwrap(), None);
        assert!(fields.float("rain").is_err());
        assert!(fields.integer("name").is_err());
        assert!(fields.get("unknown").is_absent());
    }

    #[test]
    fn test_fields_insert_replaces() {
        let mut fields = Fields::new().with("a", Some(1i64));
        fields.insert("a", FieldValue::Integer(2));
        assert_eq!(fields.integer("a").unwrap(), 2);
    }

    #[test]
    fn test_kind_descriptions() {
        assert_eq!(FieldKind::Integer.describe(), "integer");
        assert_eq!(
            FieldKind::Timestamp {
                format: TimeFormat::Minute,
                policy: TzPolicy::RequireUtc
            }
            .describe(),
            "YYYYMMDDHHMM timestamp"
        );
    }
}
