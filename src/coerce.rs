use log::{debug, warn};
use serde_json::Value;

use crate::catalog::{FieldSpec, FieldType, TableSpec};
use crate::error::sql_err;
use crate::types::{SqlValue, parse_service_date, parse_time_of_day};

/// Binds a JSON object to the table's editor field set, in catalog order.
/// Every editor field must be present, and required fields must be non-null;
/// offenders are collected across the whole object and reported in one error.
pub(crate) fn bind_editor_fields(
    table: &TableSpec,
    payload: &serde_json::Map<String, Value>,
) -> anyhow::Result<Vec<(&'static str, SqlValue)>> {
    let mut bound = Vec::new();
    let mut missing: Vec<&str> = Vec::new();
    for field in table.editor_fields() {
        match payload.get(field.name) {
            None => missing.push(field.name),
            Some(Value::Null) if field.required => missing.push(field.name),
            Some(Value::Null) => bound.push((field.name, SqlValue::Null)),
            Some(value) => bound.push((field.name, coerce_field(table.name, field, value)?)),
        }
    }
    if !missing.is_empty() {
        return Err(sql_err(
            "23502",
            format!(
                "{} object is missing required field(s): {}",
                table.name,
                missing.join(", ")
            ),
        ));
    }
    Ok(bound)
}

/// Converts one non-null JSON value into the bound value for one field.
pub(crate) fn coerce_field(
    table: &str,
    field: &FieldSpec,
    value: &Value,
) -> anyhow::Result<SqlValue> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    if let Value::Array(items) = value {
        let mut texts = Vec::with_capacity(items.len());
        for item in items {
            let Some(text) = scalar_text(item) else {
                return Err(sql_err(
                    "22P02",
                    format!("{table}.{}: array element {item} is not scalar", field.name),
                ));
            };
            texts.push(text);
        }
        if field.field_type == FieldType::TextArray {
            return Ok(SqlValue::TextArray(texts));
        }
        // scalar fields receive arrays comma-joined
        return parse_scalar(table, field, &texts.join(","));
    }
    let Some(text) = scalar_text(value) else {
        return Err(sql_err(
            "22P02",
            format!("{table}.{}: cannot bind {value}", field.name),
        ));
    };
    parse_scalar(table, field, &text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_scalar(table: &str, field: &FieldSpec, text: &str) -> anyhow::Result<SqlValue> {
    let parsed: Result<SqlValue, String> = match field.field_type {
        FieldType::Text => Ok(SqlValue::Text(text.to_string())),
        FieldType::Integer | FieldType::Enumerated => text
            .trim()
            .parse::<i64>()
            .map(SqlValue::Int)
            .map_err(|e| e.to_string()),
        FieldType::Double => text
            .trim()
            .parse::<f64>()
            .map(SqlValue::Double)
            .map_err(|e| e.to_string()),
        FieldType::Date => parse_service_date(text).map(SqlValue::Date),
        FieldType::Time => parse_time_of_day(text).map(SqlValue::Int),
        FieldType::TextArray => Ok(SqlValue::TextArray(vec![text.to_string()])),
    };
    match parsed {
        Ok(value) => Ok(value),
        Err(reason) => {
            if field.name.contains("_time") {
                // editors send time-of-day values as integer seconds
                warn!(
                    "could not bind {table}.{} as declared type, trying integer seconds",
                    field.name
                );
                if let Ok(seconds) = text.trim().parse::<i64>() {
                    debug!("bound {table}.{}={seconds} as seconds", field.name);
                    return Ok(SqlValue::Int(seconds));
                }
            }
            Err(sql_err(
                "22P02",
                format!("cannot coerce {table}.{}={text}: {reason}", field.name),
            ))
        }
    }
}
