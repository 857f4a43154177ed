#![allow(dead_code)]

use std::sync::Arc;

use gtfsedit::{
    Catalog, EntityWriter, MemoryBackend, MemoryStore, SharedStore, SqlValue, error_code,
    gtfs_editor_catalog,
};
use serde_json::{Value, json};

pub const NS: &str = "editor_feed";

pub fn catalog() -> Arc<Catalog> {
    Arc::new(gtfs_editor_catalog())
}

pub fn store() -> SharedStore {
    MemoryStore::shared()
}

pub fn writer(store: &SharedStore, table: &str) -> EntityWriter<MemoryBackend> {
    EntityWriter::new(catalog(), table, NS, MemoryBackend::new(store.clone())).expect("writer")
}

pub fn qualified(table: &str) -> String {
    format!("{NS}.{table}")
}

// create through the writer and commit, for seeding
pub fn create(store: &SharedStore, table: &str, payload: Value) -> Value {
    writer(store, table)
        .create(&payload, true)
        .expect("seed entity")
}

pub fn entity_id(saved: &Value) -> i64 {
    saved["id"].as_i64().expect("saved id")
}

pub fn count(store: &SharedStore, table: &str) -> usize {
    store.read().count(&qualified(table))
}

pub fn rows_matching(
    store: &SharedStore,
    table: &str,
    field: &str,
    value: &str,
) -> Vec<std::collections::HashMap<String, SqlValue>> {
    store.read().rows_matching(&qualified(table), field, value)
}

pub fn assert_code(err: &anyhow::Error, code: &str) {
    assert_eq!(error_code(err), Some(code), "unexpected error: {err}");
}

pub fn agency_json(agency_id: Value) -> Value {
    json!({
        "agency_id": agency_id,
        "agency_name": "Metro Transit",
        "agency_url": "https://metro.example.com",
        "agency_timezone": "America/Chicago",
        "agency_lang": null,
        "agency_phone": null,
        "agency_fare_url": null,
        "agency_email": null,
    })
}

pub fn calendar_json(service_id: &str) -> Value {
    json!({
        "service_id": service_id,
        "monday": 1, "tuesday": 1, "wednesday": 1, "thursday": 1, "friday": 1,
        "saturday": 0, "sunday": 0,
        "start_date": "20260101",
        "end_date": "20261231",
        "description": "weekday service",
    })
}

pub fn exception_json(name: &str, added_service: Value) -> Value {
    json!({
        "name": name,
        "dates": ["20260704"],
        "exemplar": 9,
        "custom_schedule": null,
        "added_service": added_service,
        "removed_service": [],
    })
}

pub fn stop_json(stop_id: &str) -> Value {
    json!({
        "stop_id": stop_id,
        "stop_code": null,
        "stop_name": "Main St",
        "stop_desc": null,
        "stop_lat": 44.97,
        "stop_lon": -93.27,
        "zone_id": null,
        "stop_url": null,
        "location_type": 0,
        "parent_station": null,
        "stop_timezone": null,
        "wheelchair_boarding": null,
    })
}

pub fn route_json(route_id: &str) -> Value {
    json!({
        "route_id": route_id,
        "agency_id": null,
        "route_short_name": "10",
        "route_long_name": "Central",
        "route_desc": null,
        "route_type": 3,
        "route_url": null,
        "route_color": null,
        "route_text_color": null,
        "wheelchair_accessible": null,
    })
}

pub fn fare_json(fare_id: &str, route_id: &str) -> Value {
    json!({
        "fare_id": fare_id,
        "price": 2.5,
        "currency_type": "USD",
        "payment_method": 0,
        "transfers": null,
        "transfer_duration": null,
        "fare_rules": [{
            "fare_id": null,
            "route_id": route_id,
            "origin_id": null,
            "destination_id": null,
            "contains_id": null,
        }],
    })
}

pub fn pattern_json(pattern_id: &str, route_id: &str) -> Value {
    json!({
        "pattern_id": pattern_id,
        "route_id": route_id,
        "name": "inbound",
        "direction_id": 0,
        "use_frequency": 0,
        "shape_id": null,
        "shapes": [],
        "pattern_stops": [],
    })
}

pub fn pattern_stop_json(stop_id: &str, stop_sequence: i64) -> Value {
    json!({
        "pattern_id": null,
        "stop_sequence": stop_sequence,
        "stop_id": stop_id,
        "default_travel_time": 60,
        "default_dwell_time": 0,
        "timepoint": 1,
        "drop_off_type": 0,
        "pickup_type": 0,
        "shape_dist_traveled": null,
    })
}

pub fn shape_point_json(stop_sequence: i64) -> Value {
    json!({
        "shape_id": null,
        "shape_pt_lat": 44.97,
        "shape_pt_lon": -93.27,
        "shape_pt_sequence": stop_sequence,
        "shape_dist_traveled": null,
    })
}

pub fn trip_json(trip_id: Value, route_id: &str, pattern_id: &str, service_id: &str) -> Value {
    json!({
        "trip_id": trip_id,
        "route_id": route_id,
        "pattern_id": pattern_id,
        "service_id": service_id,
        "trip_headsign": "Downtown",
        "trip_short_name": null,
        "direction_id": 0,
        "block_id": null,
        "shape_id": null,
        "wheelchair_accessible": null,
        "bikes_allowed": null,
        "stop_times": [],
        "frequencies": [],
    })
}

pub fn stop_time_json(stop_id: &str, stop_sequence: i64) -> Value {
    json!({
        "trip_id": null,
        "stop_sequence": stop_sequence,
        "stop_id": stop_id,
        "arrival_time": 28800 + stop_sequence * 300,
        "departure_time": 28830 + stop_sequence * 300,
        "stop_headsign": null,
        "pickup_type": 0,
        "drop_off_type": 0,
        "shape_dist_traveled": null,
        "timepoint": 0,
    })
}

pub fn frequency_json() -> Value {
    json!({
        "trip_id": null,
        "start_time": "06:00:00",
        "end_time": "09:00:00",
        "headway_secs": 600,
        "exact_times": 0,
    })
}
