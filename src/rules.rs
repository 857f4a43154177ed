//! Table-specific propagation rules. The orchestrator stays generic; tables
//! register their extra behavior here instead of being special-cased by name
//! in the write path.

/// Join leg for propagation into a table that is not keyed directly by the
/// source table's key (stop_times reach their pattern only through trips).
pub(crate) struct LinkedJoin {
    pub(crate) via: &'static str,
    pub(crate) join_field: &'static str,
    pub(crate) order_field: &'static str,
}

/// Denormalized field copies kept in sync outside the wholesale child
/// replace.
pub(crate) struct LinkedRule {
    pub(crate) target: &'static str,
    /// Match column holding the source table's key value. With a join, the
    /// column lives on the join table.
    pub(crate) key_field: &'static str,
    pub(crate) fields: &'static [&'static str],
    pub(crate) join: Option<LinkedJoin>,
}

/// Rows to remove through a join before inbound references are rewritten or
/// deleted. Stop times and frequencies hang off trips and are unreachable by
/// the pattern key once the trips are gone.
pub(crate) struct PreCascade {
    pub(crate) via: &'static str,
    pub(crate) join_field: &'static str,
    pub(crate) match_field: &'static str,
    pub(crate) targets: &'static [&'static str],
}

const ROUTE_LINKS: &[LinkedRule] = &[LinkedRule {
    target: "trips",
    key_field: "route_id",
    fields: &["wheelchair_accessible"],
    join: None,
}];

const PATTERN_LINKS: &[LinkedRule] = &[LinkedRule {
    target: "trips",
    key_field: "pattern_id",
    fields: &["direction_id"],
    join: None,
}];

const PATTERN_STOP_LINK: LinkedRule = LinkedRule {
    target: "stop_times",
    key_field: "pattern_id",
    fields: &[
        "timepoint",
        "drop_off_type",
        "pickup_type",
        "shape_dist_traveled",
    ],
    join: Some(LinkedJoin {
        via: "trips",
        join_field: "trip_id",
        order_field: "stop_sequence",
    }),
};

const PATTERN_PRE_CASCADE: PreCascade = PreCascade {
    via: "trips",
    join_field: "trip_id",
    match_field: "pattern_id",
    targets: &["stop_times", "frequencies"],
};

/// Rules fired after the main row write of the named table.
pub(crate) fn linked_on_update(table: &str) -> &'static [LinkedRule] {
    match table {
        "routes" => ROUTE_LINKS,
        "patterns" => PATTERN_LINKS,
        _ => &[],
    }
}

/// Rule fired once per element while synchronizing the named child table.
pub(crate) fn linked_per_element(table: &str) -> Option<&'static LinkedRule> {
    match table {
        "pattern_stops" => Some(&PATTERN_STOP_LINK),
        _ => None,
    }
}

/// Join deletes to run before reference propagation touches the named table.
pub(crate) fn pre_cascade(table: &str) -> Option<&'static PreCascade> {
    match table {
        "patterns" => Some(&PATTERN_PRE_CASCADE),
        _ => None,
    }
}
