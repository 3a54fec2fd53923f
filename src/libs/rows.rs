//! Decoding of untyped result rows into JSON objects.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row};

/// Try each supported Rust type in turn; `null` when nothing fits.
fn decode_value(row: &PgRow, col_name: &str) -> Value {
    if let Ok(v) = row.try_get::<Option<i32>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(col_name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(col_name) {
        return v
            .map(|ts| Value::from(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(col_name) {
        return v
            .map(|ts| Value::from(ts.to_rfc3339()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(col_name) {
        return v.map(|d| Value::from(d.to_string())).unwrap_or(Value::Null);
    }
    Value::Null
}

/// One JSON object per row, keys in column order.
pub fn rows_to_json(rows: &[PgRow]) -> Vec<Map<String, Value>> {
    rows.iter()
        .map(|r| {
            let mut map = Map::new();
            for col in r.columns() {
                let col_name = col.name();
                map.insert(col_name.to_string(), decode_value(r, col_name));
            }
            map
        })
        .collect()
}
