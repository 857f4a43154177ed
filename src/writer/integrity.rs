//! Business-key integrity. The backend schema does not constrain natural
//! keys, so key uniqueness, repair of null keys, and the ripple effects of
//! renames and deletes are all enforced here, inside the write transaction.

use log::{debug, info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::Backend;
use crate::catalog::{Catalog, KeyPolicy, TableSpec};
use crate::error::sql_err;
use crate::rules;
use crate::writer::qualify;

/// Validates the payload's natural key before the row write. May repair the
/// payload (generated keys) and may rewrite inbound references (key
/// renames).
pub(crate) fn ensure_referential_integrity<B: Backend>(
    backend: &mut B,
    catalog: &Catalog,
    namespace: &str,
    table: &TableSpec,
    payload: &mut serde_json::Map<String, Value>,
    id: Option<i64>,
) -> anyhow::Result<()> {
    let qualified = qualify(namespace, table.name);
    let supplied = match payload.get(table.key_field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(sql_err(
                "22P02",
                format!("{}.{} cannot hold {other}", table.name, table.key_field),
            ));
        }
    };
    let key = match supplied {
        Some(key) => key,
        None => match table.key_policy {
            KeyPolicy::Generated => {
                let generated = Uuid::new_v4().to_string();
                debug!(
                    "generated {}.{}={generated} for a null key",
                    table.name, table.key_field
                );
                payload.insert(table.key_field.to_string(), Value::String(generated.clone()));
                generated
            }
            KeyPolicy::SingletonNullable => {
                let rows = backend.count_rows(&qualified)?;
                // a second row would make the null key ambiguous
                if rows > 1 || (id.is_none() && rows > 0) {
                    return Err(sql_err(
                        "23502",
                        format!(
                            "null {} is only allowed while {} holds a single row",
                            table.key_field, table.name
                        ),
                    ));
                }
                return Ok(());
            }
            KeyPolicy::Required => {
                return Err(sql_err(
                    "23502",
                    format!("key field {} must not be null", table.key_field),
                ));
            }
        },
    };
    let ids = backend.ids_for_value(&qualified, table.key_field, &key)?;
    if ids.len() > 1 {
        return Err(sql_err(
            "XX001",
            format!(
                "more than one {} row shares {}={key}; uniqueness is corrupted",
                table.name, table.key_field
            ),
        ));
    }
    match id {
        // an absent id is a create: any holder of the key is a conflict
        None => match ids.first() {
            Some(_) => Err(sql_err(
                "23505",
                format!("{} with {}={key} already exists", table.name, table.key_field),
            )),
            None => Ok(()),
        },
        Some(my_id) => match ids.first() {
            Some(holder) if *holder == my_id => Ok(()),
            Some(_) => Err(sql_err(
                "23505",
                format!("{} with {}={key} already exists", table.name, table.key_field),
            )),
            // key changed hands: rewrite everything referencing the old value
            None => propagate_key_change(backend, catalog, namespace, table, my_id, Some(&key)),
        },
    }
}

/// Walks every inbound reference to the entity's current key and either
/// rewrites it to `new_key` or deletes the referencing rows. Shared by key
/// renames and entity deletes; a delete is a rename to nothing.
pub(crate) fn propagate_key_change<B: Backend>(
    backend: &mut B,
    catalog: &Catalog,
    namespace: &str,
    table: &TableSpec,
    id: i64,
    new_key: Option<&str>,
) -> anyhow::Result<()> {
    let qualified = qualify(namespace, table.name);
    let Some(old_key) = backend.value_for_id(&qualified, table.key_field, id)? else {
        warn!(
            "{} {id} has no {} value, skipping reference handling",
            table.name, table.key_field
        );
        return Ok(());
    };
    if let Some(pre) = rules::pre_cascade(table.name) {
        for target in pre.targets {
            let removed = backend.delete_via(
                &qualify(namespace, target),
                &qualify(namespace, pre.via),
                pre.join_field,
                pre.match_field,
                &old_key,
            )?;
            if removed > 0 {
                info!(
                    "removed {removed} {target} rows reached through {} {}={old_key}",
                    pre.via, pre.match_field
                );
            }
        }
    }
    for edge in catalog.referencers_of(table.name) {
        let referencing = qualify(namespace, edge.table);
        match new_key {
            Some(new_key) => {
                let changed = backend.rewrite_references(
                    &referencing,
                    edge.field,
                    edge.is_array,
                    &old_key,
                    new_key,
                )?;
                if changed > 0 {
                    info!(
                        "rewrote {changed} {}.{} references {old_key} -> {new_key}",
                        edge.table, edge.field
                    );
                }
            }
            None => {
                let removed =
                    backend.delete_references(&referencing, edge.field, edge.is_array, &old_key)?;
                if removed > 0 {
                    if table.cascade_delete_restricted {
                        return Err(sql_err(
                            "23503",
                            format!(
                                "cannot delete {} {}={old_key}: {removed} {} rows reference it",
                                table.name, table.key_field, edge.table
                            ),
                        ));
                    }
                    info!(
                        "removed {removed} {} rows referencing {} {}={old_key}",
                        edge.table, table.name, table.key_field
                    );
                }
            }
        }
    }
    Ok(())
}
