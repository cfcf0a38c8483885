//! Wire-shape tests for the execution result envelope.
//!
//! The calling layer and ultimately the client depend on these exact field
//! names; a rename here is a breaking API change.

#![allow(missing_docs)]

use std::time::Duration;

use serde_json::{json, Value};
use sqlpen::executor::{ExecutionResult, FieldDescriptor, RowObject};

fn sample_success() -> ExecutionResult {
    let mut row = RowObject::new();
    row.insert("z_last".to_string(), json!(1));
    row.insert("a_first".to_string(), json!("alpha"));

    ExecutionResult::success(
        vec![row],
        vec![
            FieldDescriptor {
                name: "z_last".to_string(),
                data_type: "INT4".to_string(),
            },
            FieldDescriptor {
                name: "a_first".to_string(),
                data_type: "TEXT".to_string(),
            },
        ],
        Duration::from_millis(12),
    )
}

#[test]
fn success_envelope_shape() {
    let value = serde_json::to_value(sample_success()).expect("serialize");

    assert_eq!(value["success"], json!(true));
    assert_eq!(value["rowCount"], json!(1));
    assert_eq!(value["executionTime"], json!(12));
    assert_eq!(value["rows"][0]["z_last"], json!(1));
    assert_eq!(
        value["fields"],
        json!([
            { "name": "z_last", "dataType": "INT4" },
            { "name": "a_first", "dataType": "TEXT" }
        ])
    );
    assert!(value.get("error").is_none());
}

#[test]
fn failure_envelope_shape() {
    let envelope =
        ExecutionResult::failure("only SELECT queries are allowed", Duration::from_millis(5));
    let value = serde_json::to_value(envelope).expect("serialize");

    assert_eq!(
        value,
        json!({
            "success": false,
            "error": "only SELECT queries are allowed",
            "executionTime": 5
        })
    );
}

#[test]
fn row_objects_keep_column_order_on_the_wire() {
    let text = serde_json::to_string(&sample_success()).expect("serialize");
    let z = text.find("z_last").expect("first column present");
    let a = text.find("a_first").expect("second column present");
    assert!(z < a, "column order must survive serialization: {text}");
}

#[test]
fn accessors_cover_both_variants() {
    let success = sample_success();
    assert!(success.is_success());
    assert_eq!(success.execution_time(), 12);
    assert_eq!(success.error(), None);

    let failure = ExecutionResult::failure("boom", Duration::from_millis(7));
    assert!(!failure.is_success());
    assert_eq!(failure.execution_time(), 7);
    assert_eq!(failure.error(), Some("boom"));
}

#[test]
fn sub_millisecond_timings_round_down_to_zero() {
    let envelope = ExecutionResult::failure("boom", Duration::from_micros(900));
    assert_eq!(envelope.execution_time(), 0);
    let value = serde_json::to_value(envelope).expect("serialize");
    assert_eq!(value["executionTime"], json!(0));
}

#[test]
fn empty_result_sets_serialize_with_fields_and_zero_rows() {
    let envelope = ExecutionResult::success(
        Vec::new(),
        vec![FieldDescriptor {
            name: "id".to_string(),
            data_type: "INT8".to_string(),
        }],
        Duration::from_millis(3),
    );
    let value = serde_json::to_value(envelope).expect("serialize");

    assert_eq!(value["success"], json!(true));
    assert_eq!(value["rows"], json!([]));
    assert_eq!(value["rowCount"], json!(0));
    assert_eq!(value["fields"][0]["name"], json!("id"));
}

#[test]
fn null_cells_serialize_as_json_null() {
    let mut row = RowObject::new();
    row.insert("maybe".to_string(), Value::Null);
    let envelope = ExecutionResult::success(
        vec![row],
        vec![FieldDescriptor {
            name: "maybe".to_string(),
            data_type: "TEXT".to_string(),
        }],
        Duration::from_millis(1),
    );
    let value = serde_json::to_value(envelope).expect("serialize");
    assert_eq!(value["rows"][0]["maybe"], Value::Null);
}
