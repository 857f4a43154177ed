mod common;

use gtfsedit::SqlValue;
use serde_json::json;

#[test]
fn route_accessibility_propagates_to_its_trips() {
    let store = common::store();
    let saved = common::create(&store, "routes", common::route_json("R1"));
    common::create(&store, "routes", common::route_json("R2"));
    common::create(&store, "trips", common::trip_json(json!("T1"), "R1", "P1", "WK"));
    common::create(&store, "trips", common::trip_json(json!("T2"), "R1", "P1", "WK"));
    common::create(&store, "trips", common::trip_json(json!("T3"), "R2", "P2", "WK"));

    let mut payload = common::route_json("R1");
    payload["wheelchair_accessible"] = json!(1);
    common::writer(&store, "routes")
        .update(Some(common::entity_id(&saved)), &payload, true)
        .expect("update route");

    for trip_id in ["T1", "T2"] {
        let rows = common::rows_matching(&store, "trips", "trip_id", trip_id);
        assert_eq!(rows[0]["wheelchair_accessible"], SqlValue::Int(1));
    }
    let other = common::rows_matching(&store, "trips", "trip_id", "T3");
    assert_eq!(other[0]["wheelchair_accessible"], SqlValue::Null);
}

#[test]
fn a_null_linked_value_propagates_as_null() {
    let store = common::store();
    let saved = common::create(&store, "routes", common::route_json("R1"));
    let mut trip = common::trip_json(json!("T1"), "R1", "P1", "WK");
    trip["wheelchair_accessible"] = json!(2);
    common::create(&store, "trips", trip);

    common::writer(&store, "routes")
        .update(Some(common::entity_id(&saved)), &common::route_json("R1"), true)
        .expect("update route with null accessibility");

    let rows = common::rows_matching(&store, "trips", "trip_id", "T1");
    assert_eq!(rows[0]["wheelchair_accessible"], SqlValue::Null);
}

#[test]
fn pattern_direction_propagates_to_its_trips() {
    let store = common::store();
    common::create(&store, "routes", common::route_json("R1"));
    let saved = common::create(&store, "patterns", common::pattern_json("P1", "R1"));
    common::create(&store, "trips", common::trip_json(json!("T1"), "R1", "P1", "WK"));

    let mut payload = common::pattern_json("P1", "R1");
    payload["direction_id"] = json!(1);
    common::writer(&store, "patterns")
        .update(Some(common::entity_id(&saved)), &payload, true)
        .expect("update pattern");

    let rows = common::rows_matching(&store, "trips", "trip_id", "T1");
    assert_eq!(rows[0]["direction_id"], SqlValue::Int(1));
}

#[test]
fn pattern_stop_defaults_mirror_onto_matching_stop_times() {
    let store = common::store();
    common::create(&store, "routes", common::route_json("R1"));
    let saved = common::create(&store, "patterns", common::pattern_json("P1", "R1"));
    common::create(&store, "patterns", common::pattern_json("P2", "R1"));
    for (trip_id, pattern) in [("T1", "P1"), ("T2", "P1"), ("T3", "P2")] {
        let mut trip = common::trip_json(json!(trip_id), "R1", pattern, "WK");
        trip["stop_times"] = json!([
            common::stop_time_json("S1", 1),
            common::stop_time_json("S2", 2),
        ]);
        common::create(&store, "trips", trip);
    }

    let mut payload = common::pattern_json("P1", "R1");
    let mut first = common::pattern_stop_json("S1", 1);
    first["timepoint"] = json!(1);
    first["drop_off_type"] = json!(2);
    first["pickup_type"] = json!(3);
    first["shape_dist_traveled"] = json!(12.5);
    payload["pattern_stops"] = json!([first, common::pattern_stop_json("S2", 9)]);
    common::writer(&store, "patterns")
        .update(Some(common::entity_id(&saved)), &payload, true)
        .expect("update pattern stops");

    // sequence 1 on both of the pattern's trips picks up the defaults
    for trip_id in ["T1", "T2"] {
        let rows = common::rows_matching(&store, "stop_times", "trip_id", trip_id);
        let first = rows
            .iter()
            .find(|r| r["stop_sequence"] == SqlValue::Int(1))
            .expect("sequence 1");
        assert_eq!(first["timepoint"], SqlValue::Int(1));
        assert_eq!(first["drop_off_type"], SqlValue::Int(2));
        assert_eq!(first["pickup_type"], SqlValue::Int(3));
        assert_eq!(first["shape_dist_traveled"], SqlValue::Double(12.5));
        // sequence 9 matches no stop_times row, sequence 2 keeps its values
        let second = rows
            .iter()
            .find(|r| r["stop_sequence"] == SqlValue::Int(2))
            .expect("sequence 2");
        assert_eq!(second["timepoint"], SqlValue::Int(0));
    }
    // trips of other patterns never see the change
    let rows = common::rows_matching(&store, "stop_times", "trip_id", "T3");
    for row in &rows {
        assert_eq!(row["timepoint"], SqlValue::Int(0));
    }
}
