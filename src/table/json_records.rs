// PEGELONLINE REST responses flattened into rows
//
// `{"uuid": "...", "water": {"shortname": "RHEIN", "longname": "RHEIN"}}`
// becomes the columns `uuid`, `water.shortname`, `water.longname`.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{Row, TableError};

const KEY_SEPARATOR: char = '.';

pub fn parse(text: &str) -> Result<Vec<Row>, TableError> {
    let value: Value = serde_json::from_str(text)?;

    let objects = match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(TableError::NotRecords),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(map) => vec![map],
        _ => return Err(TableError::NotRecords),
    };

    let flattened: Vec<Vec<(String, String)>> = objects
        .iter()
        .map(|object| {
            let mut pairs = Vec::new();
            flatten(object, None, &mut pairs);
            pairs
        })
        .collect();

    // Union of keys, in the order they are first seen
    let mut column_list: Vec<String> = Vec::new();
    for pairs in &flattened {
        for (key, _) in pairs {
            if !column_list.contains(key) {
                column_list.push(key.clone());
            }
        }
    }
    let columns: Arc<[String]> = column_list.into();

    let rows = flattened
        .into_iter()
        .map(|pairs| {
            let values = columns
                .iter()
                .map(|column| {
                    pairs
                        .iter()
                        .find(|(key, _)| key == column)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default()
                })
                .collect();
            Row::new(columns.clone(), values)
        })
        .collect();

    Ok(rows)
}

fn flatten(object: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{prefix}{KEY_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten(nested, Some(&name), out),
            other => out.push((name, scalar_text(other))),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays stay as compact JSON text
        other => other.to_string(),
    }
}
