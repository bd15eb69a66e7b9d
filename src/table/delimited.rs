// Semicolon-delimited header CSV, as shipped inside DWD 10-minute archives:
//
//   STATIONS_ID;MESS_DATUM;  QN;RWS_DAU_10;RWS_10;RWS_IND_10;eor
//            44;202401010000;    3;   0;   0.00;   0;eor

use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::{Row, TableError};

pub const DELIMITER: u8 = b';';

/// End-of-record marker column appended by DWD
pub const END_OF_RECORD: &str = "eor";

fn is_dropped_column(name: &str) -> bool {
    name.is_empty() || name == END_OF_RECORD
}

pub fn parse(text: &str) -> Result<Vec<Row>, TableError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(TableError::MissingHeader);
    }

    // Indices of the columns that survive into rows
    let kept: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !is_dropped_column(h.trim_start()))
        .map(|(i, _)| i)
        .collect();

    let columns: Arc<[String]> = kept
        .iter()
        .map(|&i| headers[i].trim_start().to_string())
        .collect::<Vec<_>>()
        .into();

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let values = kept
            .iter()
            .map(|&i| record.get(i).unwrap_or_default().trim_start().to_string())
            .collect();
        rows.push(Row::new(columns.clone(), values));
    }

    Ok(rows)
}

/// Serialize rows back to `;`-separated text, header first, in row column order
pub fn write_delimited(rows: &[Row]) -> Result<String, TableError> {
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(Vec::new());

    if let Some(first) = rows.first() {
        writer.write_record(first.columns())?;
        for row in rows {
            writer.write_record(row.values())?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TableError::Csv(csv::Error::from(e.into_error())))?;

    // Input rows are valid UTF-8 strings, so the output is too
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRECIPITATION: &str = "\
STATIONS_ID;MESS_DATUM;  QN;RWS_DAU_10;RWS_10;RWS_IND_10;eor
         44;202401010000;    3;   0;   0.00;   0;eor
         44;202401010010;    3;  10;   0.12;   1;eor
";

    #[test]
    fn test_parse_drops_eor_and_leading_whitespace() {
        let rows = parse(PRECIPITATION).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].columns(),
            &["STATIONS_ID", "MESS_DATUM", "QN", "RWS_DAU_10", "RWS_10", "RWS_IND_10"]
                .map(String::from)
        );
        assert_eq!(rows[0].get("STATIONS_ID"), Some("44"));
        assert_eq!(rows[1].get("RWS_10"), Some("0.12"));
        assert_eq!(rows[1].get("eor"), None);
    }

    #[test]
    fn test_parse_drops_empty_trailing_column() {
        let text = "STATIONS_ID;TT_10;\n44;12.5;\n";
        let rows = parse(text).unwrap();

        assert_eq!(rows[0].columns(), &["STATIONS_ID".to_string(), "TT_10".to_string()]);
        assert_eq!(rows[0].get("TT_10"), Some("12.5"));
    }

    #[test]
    fn test_ragged_record_is_an_error() {
        let text = "A;B\n1;2;3\n";
        assert!(matches!(parse(text), Err(TableError::Csv(_))));
    }

    #[test]
    fn test_empty_input_has_no_header() {
        assert!(matches!(parse(""), Err(TableError::MissingHeader)));
    }

    #[test]
    fn test_write_then_parse_reproduces_rows() {
        let rows = parse(PRECIPITATION).unwrap();
        let text = write_delimited(&rows).unwrap();

        assert!(text.starts_with("STATIONS_ID;MESS_DATUM;QN;"));
        assert_eq!(parse(&text).unwrap(), rows);
    }

    #[test]
    fn test_write_empty_rows() {
        assert_eq!(write_delimited(&[]).unwrap(), "");
    }
}
