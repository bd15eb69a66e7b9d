// Fixed-width column parser
//
// The layout is declared by the file itself:
// ```text
// ID    ICAO NAME                 LAT    LON     ELEV
// ----- ---- -------------------- ------ ------- -----
// 10015 EDXH HELGOLAND             54.11    7.54     4
// ```
// Every maximal run of dashes on the separator line is one column span,
// measured in characters (not bytes, the catalog contains umlauts).
use std::sync::Arc;

use tracing::debug;

use super::{Row, TableError};

/// Character span of one column; `end == None` runs to end of line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: Option<usize>,
}

/// Column spans from a separator line of dash runs separated by blanks
pub fn column_spans(separator: &str) -> Result<Vec<ColumnSpan>, TableError> {
    // Trailing blanks close the last run; only the line terminator goes
    let chars: Vec<char> = separator.trim_end_matches(['\r', '\n']).chars().collect();

    if !chars.contains(&'-') || chars.iter().any(|c| *c != '-' && !c.is_whitespace()) {
        return Err(TableError::MissingSeparator(separator.to_string()));
    }

    let mut spans = Vec::new();
    let mut start = None;

    for (i, c) in chars.iter().enumerate() {
        match (*c == '-', start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push(ColumnSpan {
                    start: s,
                    end: Some(i),
                });
                start = None;
            }
            _ => {}
        }
    }

    // A run touching the end of the separator is open-ended
    if let Some(s) = start {
        spans.push(ColumnSpan {
            start: s,
            end: None,
        });
    }

    Ok(spans)
}

/// Slice one line at the given spans; short lines yield empty cells
pub fn slice_line(line: &str, spans: &[ColumnSpan]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();

    spans
        .iter()
        .map(|span| {
            if span.start >= chars.len() {
                return String::new();
            }
            let end = span.end.map_or(chars.len(), |e| e.min(chars.len()));
            chars[span.start..end]
                .iter()
                .collect::<String>()
                .trim()
                .to_string()
        })
        .collect()
}

pub fn parse(text: &str) -> Result<Vec<Row>, TableError> {
    let mut lines = text.lines();

    let header = lines
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or(TableError::MissingHeader)?;
    let separator = lines
        .next()
        .ok_or_else(|| TableError::MissingSeparator(String::new()))?;

    let headers: Vec<String> = header.split_whitespace().map(str::to_string).collect();
    let mut spans = column_spans(separator)?;

    if spans.len() < headers.len() {
        return Err(TableError::HeaderMismatch {
            headers: headers.len(),
            columns: spans.len(),
        });
    }
    if spans.len() > headers.len() {
        // Some separators carry a spurious trailing dash run
        debug!(
            "Dropping {} surplus column spans beyond the header",
            spans.len() - headers.len()
        );
        spans.truncate(headers.len());
    }

    let columns: Arc<[String]> = headers.into();
    let rows = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| Row::new(columns.clone(), slice_line(line, &spans)))
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "\
ID    ICAO NAME                 LAT    LON     ELEV
----- ---- -------------------- ------ ------- -----
01001 ENJA JAN MAYEN             70.56   -8.40    10
10015 EDXH HELGOLAND             54.11    7.54     4

P0489 ---- MÜNSTER/OSNABRÜCK     52.08    7.42    48
";

    #[test]
    fn test_column_spans_closed_and_open() {
        let spans = column_spans("----- ---  --").unwrap();
        assert_eq!(
            spans,
            vec![
                ColumnSpan { start: 0, end: Some(5) },
                ColumnSpan { start: 6, end: Some(9) },
                ColumnSpan { start: 11, end: None },
            ]
        );
    }

    #[test]
    fn test_column_spans_rejects_non_separator() {
        assert!(matches!(
            column_spans("ID    ICAO"),
            Err(TableError::MissingSeparator(_))
        ));
        assert!(matches!(column_spans("   "), Err(TableError::MissingSeparator(_))));
    }

    #[test]
    fn test_parse_catalog() {
        let rows = parse(CATALOG).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("ID"), Some("01001"));
        assert_eq!(rows[0].get("NAME"), Some("JAN MAYEN"));
        assert_eq!(rows[1].get("LAT"), Some("54.11"));
        assert_eq!(rows[2].get("ICAO"), Some("----"));
        assert_eq!(rows[2].get("NAME"), Some("MÜNSTER/OSNABRÜCK"));
        assert_eq!(rows[2].get("ELEV"), Some("48"));
    }

    #[test]
    fn test_open_last_column_reads_to_end_of_line() {
        let text = "A  B\n-- --\nx  long-value-beyond-separator\n";
        let rows = parse(text).unwrap();
        assert_eq!(rows[0].get("B"), Some("long-value-beyond-separator"));
    }

    #[test]
    fn test_trailing_blanks_close_last_column() {
        let spans = column_spans("-- --  ").unwrap();
        assert_eq!(spans[1], ColumnSpan { start: 3, end: Some(5) });

        let rows = parse("A  B\n-- --  \nx  abcdefgh\n").unwrap();
        assert_eq!(rows[0].get("B"), Some("ab"));

        let rows = parse("A  B\r\n-- --\r\nx  abcdefgh\r\n").unwrap();
        assert_eq!(rows[0].get("B"), Some("abcdefgh"));
    }

    #[test]
    fn test_short_line_yields_empty_cells() {
        let text = "ID    NAME  ELEV\n----- ----- ----\n01001 X\n";
        let rows = parse(text).unwrap();

        assert_eq!(rows[0].get("NAME"), Some("X"));
        assert_eq!(rows[0].get("ELEV"), Some(""));
    }

    #[test]
    fn test_surplus_spans_are_dropped() {
        let text = "ID NAME\n-- ---- --\n01 abcd zz\n";
        let rows = parse(text).unwrap();

        assert_eq!(rows[0].columns(), &["ID".to_string(), "NAME".to_string()]);
        assert_eq!(rows[0].get("NAME"), Some("abcd"));
    }

    #[test]
    fn test_fewer_spans_than_headers() {
        let text = "ID NAME ELEV\n-- ----\n";
        assert!(matches!(
            parse(text),
            Err(TableError::HeaderMismatch { headers: 3, columns: 2 })
        ));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(parse(""), Err(TableError::MissingHeader)));
    }
}
