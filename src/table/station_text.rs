// DWD station description files (`*_Beschreibung_Stationen.txt`)
//
// The header names columns but the data lines are not aligned to it: the
// station name is free text of variable width. Lines are tokenized on
// whitespace and the name is whatever sits between the six leading fixed
// tokens and the trailing region (plus optional release) tokens.

use std::sync::Arc;

use super::{Row, TableError};

pub const COLUMNS: [&str; 9] = [
    "Stations_id",
    "von_datum",
    "bis_datum",
    "Stationshoehe",
    "geoBreite",
    "geoLaenge",
    "Stationsname",
    "Bundesland",
    "Abgabe",
];

/// Release literals recognized in the trailing `Abgabe` position
pub const RELEASE_VALUES: &[&str] = &["Frei"];

/// Value of `Abgabe` when the line carries no release token
pub const NO_RELEASE: &str = "-";

const FIXED_TOKENS: usize = 6;

pub fn parse(text: &str) -> Result<Vec<Row>, TableError> {
    let columns: Arc<[String]> = COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .into();

    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(TableError::MissingHeader);
    }
    match lines.get(1) {
        Some((_, separator)) if separator.starts_with('-') => {}
        other => {
            return Err(TableError::MissingSeparator(
                other.map(|(_, l)| l.to_string()).unwrap_or_default(),
            ))
        }
    }

    lines
        .iter()
        .skip(2)
        .map(|&(number, line)| parse_line(number, line).map(|v| Row::new(columns.clone(), v)))
        .collect()
}

fn parse_line(number: usize, line: &str) -> Result<Vec<String>, TableError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let has_release = tokens
        .last()
        .is_some_and(|last| RELEASE_VALUES.contains(last));
    let trailing = if has_release { 2 } else { 1 };

    // An empty name is allowed; the region token is not optional
    if tokens.len() < FIXED_TOKENS + trailing {
        return Err(TableError::MalformedLine {
            line: number,
            reason: format!(
                "expected at least {} whitespace-separated tokens, found {}",
                FIXED_TOKENS + trailing,
                tokens.len()
            ),
        });
    }

    let region_index = tokens.len() - trailing;
    let mut values: Vec<String> = tokens[..FIXED_TOKENS]
        .iter()
        .map(|t| t.to_string())
        .collect();
    values.push(tokens[FIXED_TOKENS..region_index].join(" "));
    values.push(tokens[region_index].to_string());
    values.push(if has_release {
        tokens[region_index + 1].to_string()
    } else {
        NO_RELEASE.to_string()
    });

    Ok(values)
}
