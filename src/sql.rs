//! Statement text for every write the editor performs. All statements use
//! numbered placeholders and qualified table names; values are bound by the
//! backend, never spliced into the text.

fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn insert_sql(table: &str, columns: &[&str]) -> String {
    format!(
        "insert into {table} ({}) values ({}) returning id",
        columns.join(", "),
        placeholders(1, columns.len())
    )
}

/// Insert form used for child batches, where generated ids are not read
/// back.
pub(crate) fn insert_rows_sql(table: &str, columns: &[&str]) -> String {
    format!(
        "insert into {table} ({}) values ({})",
        columns.join(", "),
        placeholders(1, columns.len())
    )
}

pub(crate) fn update_by_id_sql(table: &str, columns: &[&str]) -> String {
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "update {table} set {assignments} where id = ${}",
        columns.len() + 1
    )
}

pub(crate) fn delete_by_id_sql(table: &str) -> String {
    format!("delete from {table} where id = $1")
}

pub(crate) fn select_ids_sql(table: &str, field: &str) -> String {
    format!("select id from {table} where {field} = $1")
}

pub(crate) fn select_field_by_id_sql(table: &str, field: &str) -> String {
    format!("select {field} from {table} where id = $1")
}

pub(crate) fn count_sql(table: &str) -> String {
    format!("select count(*) from {table}")
}

/// Removes rows referencing a key. Array-typed reference fields match by
/// containment rather than equality.
pub(crate) fn delete_references_sql(table: &str, field: &str, is_array: bool) -> String {
    if is_array {
        format!("delete from {table} where {field} @> ARRAY[$1]::text[]")
    } else {
        format!("delete from {table} where {field} = $1")
    }
}

/// Rewrites references from an old key to a new one. Binds new first, old
/// second, in both forms.
pub(crate) fn rewrite_references_sql(table: &str, field: &str, is_array: bool) -> String {
    if is_array {
        format!(
            "update {table} set {field} = array_replace({field}, $2, $1) \
             where {field} @> ARRAY[$2]::text[]"
        )
    } else {
        format!("update {table} set {field} = $1 where {field} = $2")
    }
}

/// Removes rows of `table` joined through `via` on `join_field`, selected by
/// a key on the via table. Used where the dependent rows carry no key of
/// their own for the matched table.
pub(crate) fn delete_via_sql(table: &str, via: &str, join_field: &str, match_field: &str) -> String {
    format!(
        "delete from {table} c using {via} j \
         where c.{join_field} = j.{join_field} and j.{match_field} = $1"
    )
}

pub(crate) fn set_fields_sql(table: &str, fields: &[&str], key_field: &str) -> String {
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, field)| format!("{field} = ${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "update {table} set {assignments} where {key_field} = ${}",
        fields.len() + 1
    )
}

/// Single-statement propagation into a dependent table reached through a
/// join, narrowed by a key on the joined table and an order column on the
/// target rows.
pub(crate) fn set_fields_via_sql(
    table: &str,
    via: &str,
    join_field: &str,
    fields: &[&str],
    match_field: &str,
    order_field: &str,
) -> String {
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, field)| format!("{field} = ${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "update {table} c set {assignments} from {via} j \
         where c.{join_field} = j.{join_field} and j.{match_field} = ${} and c.{order_field} = ${}",
        fields.len() + 1,
        fields.len() + 2
    )
}
