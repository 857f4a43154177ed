//! Propagation of denormalized field copies. Each rule pushes values from
//! the row just written into rows of another table in one statement; a null
//! value propagates as null.

use log::{debug, info, warn};

use crate::backend::Backend;
use crate::catalog::TableSpec;
use crate::error::sql_err;
use crate::rules::{self, LinkedRule};
use crate::types::SqlValue;
use crate::writer::qualify;

fn bound_value<'a>(bound: &'a [(&'static str, SqlValue)], name: &str) -> Option<&'a SqlValue> {
    bound.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
}

fn assignments_for(
    rule: &LinkedRule,
    bound: &[(&'static str, SqlValue)],
) -> anyhow::Result<Vec<(&'static str, SqlValue)>> {
    rule.fields
        .iter()
        .map(|field| {
            bound_value(bound, field)
                .cloned()
                .map(|value| (*field, value))
                .ok_or_else(|| {
                    sql_err("XX000", format!("bound row is missing linked field {field}"))
                })
        })
        .collect()
}

/// Rules fired once after a parent row write (route and pattern fields
/// copied onto their trips).
pub(crate) fn apply_update_links<B: Backend>(
    backend: &mut B,
    namespace: &str,
    table: &TableSpec,
    bound: &[(&'static str, SqlValue)],
) -> anyhow::Result<()> {
    for rule in rules::linked_on_update(table.name) {
        let Some(SqlValue::Text(key)) = bound_value(bound, rule.key_field) else {
            warn!(
                "skipping linked update into {}: {} carries no {} value",
                rule.target, table.name, rule.key_field
            );
            continue;
        };
        let assignments = assignments_for(rule, bound)?;
        let changed = backend.set_fields(
            &qualify(namespace, rule.target),
            &assignments,
            rule.key_field,
            key,
        )?;
        if changed > 0 {
            info!(
                "propagated {:?} to {changed} {} rows for {}={key}",
                rule.fields, rule.target, rule.key_field
            );
        }
    }
    Ok(())
}

/// Rule fired per child element during synchronization (pattern stop
/// defaults mirrored onto stop times at the same sequence).
pub(crate) fn apply_per_element_link<B: Backend>(
    backend: &mut B,
    namespace: &str,
    rule: &LinkedRule,
    key: &str,
    bound: &[(&'static str, SqlValue)],
) -> anyhow::Result<()> {
    let assignments = assignments_for(rule, bound)?;
    let Some(join) = &rule.join else {
        backend.set_fields(
            &qualify(namespace, rule.target),
            &assignments,
            rule.key_field,
            key,
        )?;
        return Ok(());
    };
    let Some(SqlValue::Int(order)) = bound_value(bound, join.order_field) else {
        return Err(sql_err(
            "XX000",
            format!("bound row is missing order field {}", join.order_field),
        ));
    };
    let changed = backend.set_fields_via(
        &qualify(namespace, rule.target),
        &qualify(namespace, join.via),
        join.join_field,
        &assignments,
        rule.key_field,
        key,
        join.order_field,
        *order,
    )?;
    if changed > 0 {
        debug!(
            "propagated {:?} to {changed} {} rows at {}={order}",
            rule.fields, rule.target, join.order_field
        );
    }
    Ok(())
}
