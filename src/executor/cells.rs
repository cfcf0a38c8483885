//! Postgres metadata and cell decoding into JSON values.
//!
//! Decoding is keyed on the Postgres type name with a conservative fallback
//! chain; anything undecodable becomes `null` rather than an error, so one
//! odd column never sinks an otherwise valid result set. SQL NULL is JSON
//! `null`.

use serde_json::{Number, Value};
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::types::time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Row, TypeInfo};
use time::format_description::well_known::Rfc3339;

use super::{FieldDescriptor, RowObject};

pub(super) fn field_descriptors(columns: &[PgColumn]) -> Vec<FieldDescriptor> {
    columns
        .iter()
        .map(|col| FieldDescriptor {
            name: col.name().to_string(),
            data_type: col.type_info().name().to_string(),
        })
        .collect()
}

pub(super) fn row_fields(row: &PgRow) -> Vec<FieldDescriptor> {
    field_descriptors(row.columns())
}

/// Shapes one row as an ordered column-name → value map. Insertion order is
/// column order; `serde_json`'s `preserve_order` feature keeps it on the wire.
pub(super) fn row_object(row: &PgRow) -> RowObject {
    let mut object = RowObject::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let value = cell_to_json(row, idx, col.type_info().name());
        object.insert(col.name().to_string(), value);
    }
    object
}

fn cell_to_json(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .ok()
            .flatten()
            .map(|v| Value::from(i64::from(v)))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .ok()
            .flatten()
            .map(|v| Value::from(i64::from(v)))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .and_then(|v| Number::from_f64(f64::from(v)))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "NUMERIC" => match row.try_get::<Option<Decimal>, _>(idx).ok().flatten() {
            Some(decimal) => {
                let text = decimal.to_string();
                text.parse::<Number>()
                    .map(Value::Number)
                    .unwrap_or_else(|_| Value::String(text))
            }
            None => Value::Null,
        },
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<Date>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null),
        "TIME" => row
            .try_get::<Option<Time>, _>(idx)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => match row.try_get::<Option<PrimitiveDateTime>, _>(idx).ok().flatten() {
            Some(dt) => dt
                .assume_utc()
                .format(&Rfc3339)
                .map(Value::String)
                .unwrap_or(Value::Null),
            None => Value::Null,
        },
        "TIMESTAMPTZ" => match row.try_get::<Option<OffsetDateTime>, _>(idx).ok().flatten() {
            Some(dt) => dt
                .format(&Rfc3339)
                .map(Value::String)
                .unwrap_or(Value::Null),
            None => Value::Null,
        },
        _ => {
            if let Ok(v) = row.try_get::<Option<&str>, _>(idx) {
                return v.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                return v.map(Value::from).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
                return v
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
                return v.map(Value::Bool).unwrap_or(Value::Null);
            }
            Value::Null
        }
    }
}
