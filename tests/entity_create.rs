mod common;

use gtfsedit::SqlValue;
use serde_json::json;

#[test]
fn create_returns_payload_with_fresh_id() {
    let store = common::store();
    let saved = common::writer(&store, "routes")
        .create(&common::route_json("R1"), true)
        .expect("create route");
    assert_eq!(common::entity_id(&saved), 1);
    assert_eq!(saved["route_id"], json!("R1"));
    assert_eq!(common::count(&store, "routes"), 1);
    let rows = common::rows_matching(&store, "routes", "route_id", "R1");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["route_type"], SqlValue::Int(3));
}

#[test]
fn bogus_id_in_create_payload_is_ignored() {
    let store = common::store();
    let mut payload = common::route_json("R1");
    payload["id"] = json!(55);
    let saved = common::writer(&store, "routes")
        .create(&payload, true)
        .expect("create route");
    assert_eq!(common::entity_id(&saved), 1);
}

#[test]
fn duplicate_key_is_refused_and_nothing_is_written() {
    let store = common::store();
    common::create(&store, "routes", common::route_json("R1"));
    let err = common::writer(&store, "routes")
        .create(&common::route_json("R1"), true)
        .expect_err("duplicate route_id");
    common::assert_code(&err, "23505");
    assert_eq!(common::count(&store, "routes"), 1);
}

#[test]
fn null_trip_id_is_repaired_with_a_generated_key() {
    let store = common::store();
    let saved = common::writer(&store, "trips")
        .create(&common::trip_json(json!(null), "R1", "P1", "WK"), true)
        .expect("create trip");
    let trip_id = saved["trip_id"].as_str().expect("generated trip_id");
    assert_eq!(trip_id.len(), 36);
    assert_eq!(common::rows_matching(&store, "trips", "trip_id", trip_id).len(), 1);
}

#[test]
fn null_key_on_a_required_key_table_is_refused() {
    let store = common::store();
    let mut payload = common::route_json("R1");
    payload["route_id"] = json!(null);
    let err = common::writer(&store, "routes")
        .create(&payload, true)
        .expect_err("null route_id");
    common::assert_code(&err, "23502");
    assert_eq!(common::count(&store, "routes"), 0);
}

#[test]
fn agency_key_may_be_null_only_for_the_first_row() {
    let store = common::store();
    common::writer(&store, "agency")
        .create(&common::agency_json(json!(null)), true)
        .expect("first agency without id");
    let err = common::writer(&store, "agency")
        .create(&common::agency_json(json!(null)), true)
        .expect_err("second agency without id");
    common::assert_code(&err, "23502");
    // an explicit key is still fine alongside the keyless row
    common::writer(&store, "agency")
        .create(&common::agency_json(json!("A2")), true)
        .expect("agency with explicit id");
    assert_eq!(common::count(&store, "agency"), 2);
}

#[test]
fn every_missing_field_is_reported_at_once() {
    let store = common::store();
    let err = common::writer(&store, "routes")
        .create(&json!({"route_id": "R1"}), true)
        .expect_err("bare payload");
    common::assert_code(&err, "23502");
    let message = err.to_string();
    assert!(message.contains("route_type"), "message was: {message}");
    assert!(message.contains("route_long_name"), "message was: {message}");
}

#[test]
fn array_payload_creates_one_entity_per_element() {
    let store = common::store();
    let payload = json!([common::route_json("R1"), common::route_json("R2")]);
    let saved = common::writer(&store, "routes")
        .create(&payload, true)
        .expect("create batch");
    let saved = saved.as_array().expect("array echo");
    assert_eq!(saved.len(), 2);
    assert_eq!(common::entity_id(&saved[0]), 1);
    assert_eq!(common::entity_id(&saved[1]), 2);
    assert_eq!(common::count(&store, "routes"), 2);
}

#[test]
fn one_bad_element_rolls_back_the_whole_batch() {
    let store = common::store();
    let payload = json!([common::route_json("R1"), {"route_id": "R2"}]);
    let err = common::writer(&store, "routes")
        .create(&payload, true)
        .expect_err("incomplete second element");
    common::assert_code(&err, "23502");
    assert_eq!(common::count(&store, "routes"), 0);
}

#[test]
fn scalar_payload_is_malformed() {
    let store = common::store();
    let err = common::writer(&store, "routes")
        .create(&json!("R1"), true)
        .expect_err("string payload");
    common::assert_code(&err, "22023");
}

#[test]
fn deferred_commit_publishes_only_on_commit() {
    let store = common::store();
    let mut writer = common::writer(&store, "routes");
    writer
        .create(&common::route_json("R1"), false)
        .expect("create without commit");
    assert_eq!(common::count(&store, "routes"), 0);
    writer.commit().expect("commit");
    assert_eq!(common::count(&store, "routes"), 1);
}

#[test]
fn dropping_an_uncommitted_writer_discards_its_work() {
    let store = common::store();
    {
        let mut writer = common::writer(&store, "routes");
        writer
            .create(&common::route_json("R1"), false)
            .expect("create without commit");
    }
    assert_eq!(common::count(&store, "routes"), 0);
}

#[test]
fn unknown_table_and_bad_namespace_are_rejected() {
    let store = common::store();
    let err = gtfsedit::EntityWriter::new(
        common::catalog(),
        "velocipedes",
        common::NS,
        gtfsedit::MemoryBackend::new(store.clone()),
    )
    .err()
    .expect("unknown table");
    common::assert_code(&err, "42P01");
    let err = gtfsedit::EntityWriter::new(
        common::catalog(),
        "routes",
        "bad; drop schema",
        gtfsedit::MemoryBackend::new(store.clone()),
    )
    .err()
    .expect("bad namespace");
    common::assert_code(&err, "42602");
}
