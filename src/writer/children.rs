//! Wholesale child synchronization. A parent write carries the complete
//! replacement state of each child table; rows are never patched in place.

use log::{debug, info};
use serde_json::Value;

use crate::backend::Backend;
use crate::catalog::TableSpec;
use crate::coerce;
use crate::error::sql_err;
use crate::rules;
use crate::types::SqlValue;
use crate::writer::{linked, qualify};

pub(crate) const INSERT_BATCH_SIZE: usize = 500;

/// Replaces every child row owned by the parent entity with the given
/// elements. Elements are mutated in place where the owner's key is
/// injected, so the caller can echo them back.
pub(crate) fn sync_child_table<B: Backend>(
    backend: &mut B,
    namespace: &str,
    parent: &TableSpec,
    parent_id: i64,
    creating: bool,
    child: &TableSpec,
    elements: &mut [Value],
) -> anyhow::Result<()> {
    let qualified_child = qualify(namespace, child.name);
    // ownership key lives on the parent row, in the column named after the
    // child's key field (patterns.shape_id for shapes)
    let key = backend.value_for_id(
        &qualify(namespace, parent.name),
        child.key_field,
        parent_id,
    )?;
    let Some(key) = key else {
        if elements.is_empty() {
            return Ok(());
        }
        return Err(sql_err(
            "23502",
            format!(
                "cannot attach {}: {}.{} is null",
                child.name, parent.name, child.key_field
            ),
        ));
    };
    if !creating {
        let removed = backend.delete_references(&qualified_child, child.key_field, false, &key)?;
        debug!(
            "removed {removed} prior {} rows for {}={key}",
            child.name, child.key_field
        );
    }
    let per_element = rules::linked_per_element(child.name);
    if elements.is_empty() {
        // rows mirroring the cleared children would otherwise go stale
        if let Some(rule) = per_element {
            if let Some(join) = &rule.join {
                let removed = backend.delete_via(
                    &qualify(namespace, rule.target),
                    &qualify(namespace, join.via),
                    join.join_field,
                    rule.key_field,
                    &key,
                )?;
                if removed > 0 {
                    info!(
                        "removed {removed} {} rows mirroring cleared {}",
                        rule.target, child.name
                    );
                }
            }
        }
        return Ok(());
    }
    let columns: Vec<&'static str> = child.editor_fields().map(|f| f.name).collect();
    let mut batch: Vec<Vec<SqlValue>> = Vec::new();
    let mut written = 0u64;
    for element in elements.iter_mut() {
        let Value::Object(map) = element else {
            return Err(sql_err(
                "22023",
                format!("{} entries must be JSON objects", child.name),
            ));
        };
        match map.get(child.key_field) {
            None | Some(Value::Null) => {
                map.insert(child.key_field.to_string(), Value::String(key.clone()));
            }
            Some(_) => {}
        }
        let bound = coerce::bind_editor_fields(child, map)?;
        if let Some(rule) = per_element {
            linked::apply_per_element_link(backend, namespace, rule, &key, &bound)?;
        }
        batch.push(bound.into_iter().map(|(_, value)| value).collect());
        if batch.len() == INSERT_BATCH_SIZE {
            written += backend.insert_batch(&qualified_child, &columns, &batch)?;
            debug!("inserted batch of {INSERT_BATCH_SIZE} {}", child.name);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        written += backend.insert_batch(&qualified_child, &columns, &batch)?;
    }
    info!(
        "wrote {written} {} rows for {}={key}",
        child.name, child.key_field
    );
    Ok(())
}
