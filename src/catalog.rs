use std::collections::HashMap;

use crate::error::sql_err;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Double,
    Date,
    Time,
    Enumerated,
    TextArray,
}

/// How the natural key of a table behaves when the payload leaves it null.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Null key is a hard error.
    Required,
    /// Null key is repaired with a fresh random token (trips).
    Generated,
    /// Null key tolerated while the table holds at most one row (agency).
    SingletonNullable,
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub editor: bool,
    /// Table whose key field this field references.
    pub reference: Option<&'static str>,
}

impl FieldSpec {
    fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            editor: true,
            reference: None,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn references(mut self, table: &'static str) -> Self {
        self.reference = Some(table);
        self
    }

    // present in the schema (bulk loader writes it) but not part of a full
    // editor write
    fn loader_only(mut self) -> Self {
        self.editor = false;
        self
    }
}

fn text(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Text)
}
fn int(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Integer)
}
fn double(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Double)
}
fn date(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Date)
}
fn time(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Time)
}
fn enumerated(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Enumerated)
}
fn text_array(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::TextArray)
}

#[derive(Clone, Debug)]
pub struct TableSpec {
    pub name: &'static str,
    /// Business identifier column, unique per table at any instant.
    pub key_field: &'static str,
    pub key_policy: KeyPolicy,
    /// Sequencing column for per-position child rows (stop_sequence and the
    /// like), used by linked-field propagation.
    pub order_field: Option<&'static str>,
    /// Owning table whose writes rewrite this table's rows wholesale.
    pub parent: Option<&'static str>,
    /// Rows of this table may not be deleted while anything references them.
    pub cascade_delete_restricted: bool,
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn editor_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.editor)
    }
}

/// One inbound reference: `table.field` holds key values of the referenced
/// table.
#[derive(Clone, Debug)]
pub struct ReferenceEdge {
    pub table: &'static str,
    pub field: &'static str,
    pub is_array: bool,
}

#[derive(Debug)]
pub struct Catalog {
    tables: Vec<TableSpec>,
    by_name: HashMap<&'static str, usize>,
    // reverse adjacency: referenced table -> inbound reference edges, built
    // once so rename/delete propagation never rescans the schema
    referencers: HashMap<&'static str, Vec<ReferenceEdge>>,
}

impl Catalog {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        let mut by_name = HashMap::new();
        for (index, table) in tables.iter().enumerate() {
            by_name.insert(table.name, index);
        }
        let mut referencers: HashMap<&'static str, Vec<ReferenceEdge>> = HashMap::new();
        for table in &tables {
            for field in &table.fields {
                let Some(target) = field.reference else {
                    continue;
                };
                if target == table.name {
                    // self references (parent_station) never propagate
                    continue;
                }
                referencers.entry(target).or_default().push(ReferenceEdge {
                    table: table.name,
                    field: field.name,
                    is_array: field.field_type == FieldType::TextArray,
                });
            }
        }
        Self {
            tables,
            by_name,
            referencers,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.by_name.get(name).map(|i| &self.tables[*i])
    }

    pub fn require(&self, name: &str) -> anyhow::Result<&TableSpec> {
        self.table(name)
            .ok_or_else(|| sql_err("42P01", format!("no such table {name}")))
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Inbound reference edges for a table, in catalog order.
    pub fn referencers_of(&self, name: &str) -> &[ReferenceEdge] {
        self.referencers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tables owned by the given parent, in catalog order.
    pub fn children_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a TableSpec> {
        self.tables.iter().filter(move |t| t.parent == Some(parent))
    }
}

/// The transit editor schema. Field subsets mirror what a full editor write
/// carries; loader-only columns stay out of the bound parameter set.
pub fn gtfs_editor_catalog() -> Catalog {
    Catalog::new(vec![
        TableSpec {
            name: "agency",
            key_field: "agency_id",
            key_policy: KeyPolicy::SingletonNullable,
            order_field: None,
            parent: None,
            cascade_delete_restricted: false,
            fields: vec![
                text("agency_id"),
                text("agency_name").required(),
                text("agency_url").required(),
                text("agency_timezone").required(),
                text("agency_lang"),
                text("agency_phone"),
                text("agency_fare_url"),
                text("agency_email"),
            ],
        },
        TableSpec {
            name: "calendar",
            key_field: "service_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: None,
            cascade_delete_restricted: true,
            fields: vec![
                text("service_id").required(),
                enumerated("monday").required(),
                enumerated("tuesday").required(),
                enumerated("wednesday").required(),
                enumerated("thursday").required(),
                enumerated("friday").required(),
                enumerated("saturday").required(),
                enumerated("sunday").required(),
                date("start_date").required(),
                date("end_date").required(),
                text("description"),
            ],
        },
        TableSpec {
            name: "schedule_exceptions",
            key_field: "name",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: None,
            cascade_delete_restricted: false,
            fields: vec![
                text("name").required(),
                text_array("dates").required(),
                enumerated("exemplar").required(),
                text_array("custom_schedule").references("calendar"),
                text_array("added_service").references("calendar"),
                text_array("removed_service").references("calendar"),
            ],
        },
        TableSpec {
            name: "stops",
            key_field: "stop_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: None,
            cascade_delete_restricted: true,
            fields: vec![
                text("stop_id").required(),
                text("stop_code"),
                text("stop_name"),
                text("stop_desc"),
                double("stop_lat").required(),
                double("stop_lon").required(),
                text("zone_id"),
                text("stop_url"),
                enumerated("location_type"),
                text("parent_station").references("stops"),
                text("stop_timezone"),
                enumerated("wheelchair_boarding"),
                text("platform_code").loader_only(),
            ],
        },
        TableSpec {
            name: "routes",
            key_field: "route_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: None,
            cascade_delete_restricted: false,
            fields: vec![
                text("route_id").required(),
                text("agency_id").references("agency"),
                text("route_short_name"),
                text("route_long_name"),
                text("route_desc"),
                enumerated("route_type").required(),
                text("route_url"),
                text("route_color"),
                text("route_text_color"),
                enumerated("wheelchair_accessible"),
                int("route_sort_order").loader_only(),
            ],
        },
        TableSpec {
            name: "fare_attributes",
            key_field: "fare_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: None,
            cascade_delete_restricted: false,
            fields: vec![
                text("fare_id").required(),
                double("price").required(),
                text("currency_type").required(),
                enumerated("payment_method").required(),
                enumerated("transfers"),
                int("transfer_duration"),
            ],
        },
        TableSpec {
            name: "fare_rules",
            key_field: "fare_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: Some("fare_attributes"),
            cascade_delete_restricted: false,
            fields: vec![
                text("fare_id").required().references("fare_attributes"),
                text("route_id").references("routes"),
                text("origin_id"),
                text("destination_id"),
                text("contains_id"),
            ],
        },
        TableSpec {
            name: "shapes",
            key_field: "shape_id",
            key_policy: KeyPolicy::Required,
            order_field: Some("shape_pt_sequence"),
            parent: Some("patterns"),
            cascade_delete_restricted: false,
            fields: vec![
                text("shape_id").required(),
                double("shape_pt_lat").required(),
                double("shape_pt_lon").required(),
                int("shape_pt_sequence").required(),
                double("shape_dist_traveled"),
            ],
        },
        TableSpec {
            name: "patterns",
            key_field: "pattern_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: None,
            cascade_delete_restricted: false,
            fields: vec![
                text("pattern_id").required(),
                text("route_id").required().references("routes"),
                text("name"),
                enumerated("direction_id"),
                enumerated("use_frequency"),
                text("shape_id").references("shapes"),
            ],
        },
        TableSpec {
            name: "pattern_stops",
            key_field: "pattern_id",
            key_policy: KeyPolicy::Required,
            order_field: Some("stop_sequence"),
            parent: Some("patterns"),
            cascade_delete_restricted: false,
            fields: vec![
                text("pattern_id").required().references("patterns"),
                int("stop_sequence").required(),
                text("stop_id").required().references("stops"),
                int("default_travel_time"),
                int("default_dwell_time"),
                enumerated("timepoint"),
                enumerated("drop_off_type"),
                enumerated("pickup_type"),
                double("shape_dist_traveled"),
            ],
        },
        TableSpec {
            name: "trips",
            key_field: "trip_id",
            key_policy: KeyPolicy::Generated,
            order_field: None,
            parent: None,
            cascade_delete_restricted: false,
            fields: vec![
                text("trip_id").required(),
                text("route_id").required().references("routes"),
                text("pattern_id").required().references("patterns"),
                text("service_id").required().references("calendar"),
                text("trip_headsign"),
                text("trip_short_name"),
                enumerated("direction_id"),
                text("block_id"),
                text("shape_id").references("shapes"),
                enumerated("wheelchair_accessible"),
                enumerated("bikes_allowed"),
            ],
        },
        TableSpec {
            name: "stop_times",
            key_field: "trip_id",
            key_policy: KeyPolicy::Required,
            order_field: Some("stop_sequence"),
            parent: Some("trips"),
            cascade_delete_restricted: false,
            fields: vec![
                text("trip_id").required().references("trips"),
                int("stop_sequence").required(),
                text("stop_id").required().references("stops"),
                time("arrival_time"),
                time("departure_time"),
                text("stop_headsign"),
                enumerated("pickup_type"),
                enumerated("drop_off_type"),
                double("shape_dist_traveled"),
                enumerated("timepoint"),
            ],
        },
        TableSpec {
            name: "frequencies",
            key_field: "trip_id",
            key_policy: KeyPolicy::Required,
            order_field: None,
            parent: Some("trips"),
            cascade_delete_restricted: false,
            fields: vec![
                text("trip_id").required().references("trips"),
                time("start_time").required(),
                time("end_time").required(),
                int("headway_secs").required(),
                enumerated("exact_times"),
            ],
        },
    ])
}
