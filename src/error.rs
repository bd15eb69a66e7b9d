use crate::container::ContainerError;
use crate::fetch_error::FetchError;
use crate::kml::KmlError;
use crate::table::TableError;
use crate::validator::SchemaViolation;

/// Failure of one extraction, tagged with the stage that failed
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error("Container stage failed for {dataset}: {source}")]
    Container {
        dataset: &'static str,
        #[source]
        source: ContainerError,
    },

    #[error("Table stage failed for {dataset}: {source}")]
    Table {
        dataset: &'static str,
        #[source]
        source: TableError,
    },

    #[error("KML stage failed for {dataset}: {source}")]
    Kml {
        dataset: &'static str,
        #[source]
        source: KmlError,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] SchemaViolation),

    #[error("Invalid request parameter '{name}': {reason}")]
    InvalidRequest { name: &'static str, reason: String },
}

impl ExtractError {
    /// Short label of the failing stage
    pub fn stage(&self) -> &'static str {
        match self {
            ExtractError::Transport(_) => "transport",
            ExtractError::Container { .. } => "container",
            ExtractError::Table { .. } => "table",
            ExtractError::Kml { .. } => "kml",
            ExtractError::Validation(_) => "validation",
            ExtractError::InvalidRequest { .. } => "request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let err = ExtractError::Table {
            dataset: "dwd_mosmix_stations",
            source: TableError::MissingHeader,
        };
        assert_eq!(err.stage(), "table");
        assert_eq!(
            err.to_string(),
            "Table stage failed for dwd_mosmix_stations: Missing header line"
        );

        let err = ExtractError::from(FetchError::NotFound("http://x/y".to_string()));
        assert_eq!(err.stage(), "transport");
        assert_eq!(err.to_string(), "Resource not found (404): http://x/y");
    }
}
