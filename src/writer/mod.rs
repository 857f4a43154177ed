//! The write engine. An [`EntityWriter`] binds one catalog table to one
//! editing namespace and pushes JSON payloads through validation, key
//! integrity, the row write itself, child synchronization and linked-field
//! propagation, all inside a single backend transaction.

mod children;
mod integrity;
mod linked;

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;

use crate::backend::Backend;
use crate::catalog::{Catalog, TableSpec};
use crate::coerce;
use crate::error::sql_err;
use crate::types::SqlValue;

pub(crate) fn qualify(namespace: &str, table: &str) -> String {
    format!("{namespace}.{table}")
}

fn valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct EntityWriter<B: Backend> {
    catalog: Arc<Catalog>,
    table: TableSpec,
    namespace: String,
    backend: B,
}

impl<B: Backend> EntityWriter<B> {
    pub fn new(
        catalog: Arc<Catalog>,
        table: &str,
        namespace: &str,
        backend: B,
    ) -> anyhow::Result<Self> {
        if !valid_namespace(namespace) {
            return Err(sql_err("42602", format!("invalid namespace {namespace}")));
        }
        let table = catalog.require(table)?.clone();
        Ok(Self {
            catalog,
            table,
            namespace: namespace.to_string(),
            backend,
        })
    }

    /// Inserts the payload as one entity or, for an array payload, one
    /// entity per element. Returns the payload with definitive ids and any
    /// repaired keys written back.
    pub fn create(&mut self, payload: &Value, auto_commit: bool) -> anyhow::Result<Value> {
        self.run_save(None, payload, true, auto_commit)
    }

    /// Rewrites an existing entity, or creates one when `id` is `None`. For
    /// an array payload the id is taken from each element instead; elements
    /// without one are created.
    pub fn update(
        &mut self,
        id: Option<i64>,
        payload: &Value,
        auto_commit: bool,
    ) -> anyhow::Result<Value> {
        self.run_save(id, payload, false, auto_commit)
    }

    /// Deletes one entity by surrogate id, first cascading or refusing
    /// according to the inbound references on its key.
    pub fn delete(&mut self, id: i64, auto_commit: bool) -> anyhow::Result<u64> {
        match self.delete_one(id) {
            Ok(affected) => self.finish(affected, auto_commit),
            Err(err) => self.abort(err),
        }
    }

    /// Deletes every entity whose field matches the value, each with full
    /// reference handling. Returns the number deleted; zero matches is not
    /// an error.
    pub fn delete_where(
        &mut self,
        field: &str,
        value: &str,
        auto_commit: bool,
    ) -> anyhow::Result<u64> {
        match self.delete_matching(field, value) {
            Ok(deleted) => self.finish(deleted, auto_commit),
            Err(err) => self.abort(err),
        }
    }

    /// Commits buffered work and consumes the writer.
    pub fn commit(mut self) -> anyhow::Result<()> {
        self.backend.commit()
    }

    /// Releases the backend, e.g. to hand the open transaction to a writer
    /// for another table.
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn run_save(
        &mut self,
        id: Option<i64>,
        payload: &Value,
        creating: bool,
        auto_commit: bool,
    ) -> anyhow::Result<Value> {
        match self.save(id, payload, creating) {
            Ok(saved) => self.finish(saved, auto_commit),
            Err(err) => self.abort(err),
        }
    }

    fn finish<T>(&mut self, value: T, auto_commit: bool) -> anyhow::Result<T> {
        if auto_commit {
            if let Err(err) = self.backend.commit() {
                return self.abort(err);
            }
        }
        Ok(value)
    }

    fn abort<T>(&mut self, err: anyhow::Error) -> anyhow::Result<T> {
        if let Err(rollback_err) = self.backend.rollback() {
            warn!("rollback after failed write also failed: {rollback_err}");
        }
        Err(err)
    }

    fn save(&mut self, id: Option<i64>, payload: &Value, creating: bool) -> anyhow::Result<Value> {
        match payload {
            Value::Array(elements) => {
                let mut saved = Vec::with_capacity(elements.len());
                for element in elements {
                    // while updating, an element without an id is created
                    let element_id = if creating {
                        None
                    } else {
                        element.get("id").and_then(Value::as_i64)
                    };
                    saved.push(self.save_one(element_id, element)?);
                }
                Ok(Value::Array(saved))
            }
            Value::Object(_) => self.save_one(id, payload),
            _ => Err(sql_err(
                "22023",
                format!("{} payload must be a JSON object or array", self.table.name),
            )),
        }
    }

    // an absent id signals creation
    fn save_one(&mut self, id: Option<i64>, payload: &Value) -> anyhow::Result<Value> {
        let Value::Object(map) = payload else {
            return Err(sql_err(
                "22023",
                format!("{} entries must be JSON objects", self.table.name),
            ));
        };
        let mut map = map.clone();
        integrity::ensure_referential_integrity(
            &mut self.backend,
            &self.catalog,
            &self.namespace,
            &self.table,
            &mut map,
            id,
        )?;
        let bound = coerce::bind_editor_fields(&self.table, &map)?;
        let columns: Vec<&'static str> = bound.iter().map(|(name, _)| *name).collect();
        let row: Vec<SqlValue> = bound.iter().map(|(_, value)| value.clone()).collect();
        let qualified = qualify(&self.namespace, self.table.name);
        let entity_id = match id {
            None => {
                let new_id = self.backend.insert_returning_id(&qualified, &columns, &row)?;
                debug!("created {} {new_id}", self.table.name);
                new_id
            }
            Some(id) => {
                let affected = self.backend.update_by_id(&qualified, &columns, &row, id)?;
                if affected == 0 {
                    return Err(sql_err(
                        "P0002",
                        format!("no {} row with id {id}", self.table.name),
                    ));
                }
                id
            }
        };
        let catalog = self.catalog.clone();
        for child in catalog.children_of(self.table.name) {
            let Some(Value::Array(mut elements)) = map.remove(child.name) else {
                return Err(sql_err(
                    "22023",
                    format!(
                        "child entities {} must be an array and not null",
                        child.name
                    ),
                ));
            };
            children::sync_child_table(
                &mut self.backend,
                &self.namespace,
                &self.table,
                entity_id,
                id.is_none(),
                child,
                &mut elements,
            )?;
            map.insert(child.name.to_string(), Value::Array(elements));
        }
        linked::apply_update_links(&mut self.backend, &self.namespace, &self.table, &bound)?;
        map.insert("id".to_string(), Value::from(entity_id));
        Ok(Value::Object(map))
    }

    fn delete_one(&mut self, id: i64) -> anyhow::Result<u64> {
        integrity::propagate_key_change(
            &mut self.backend,
            &self.catalog,
            &self.namespace,
            &self.table,
            id,
            None,
        )?;
        let qualified = qualify(&self.namespace, self.table.name);
        let affected = self.backend.delete_by_id(&qualified, id)?;
        if affected == 0 {
            return Err(sql_err(
                "P0002",
                format!("no {} row with id {id}", self.table.name),
            ));
        }
        info!("deleted {} {id}", self.table.name);
        Ok(affected)
    }

    fn delete_matching(&mut self, field: &str, value: &str) -> anyhow::Result<u64> {
        if self.table.field(field).is_none() {
            return Err(sql_err(
                "42703",
                format!("{} has no field {field}", self.table.name),
            ));
        }
        let qualified = qualify(&self.namespace, self.table.name);
        let ids = self.backend.ids_for_value(&qualified, field, value)?;
        for id in &ids {
            self.delete_one(*id)?;
        }
        if !ids.is_empty() {
            info!(
                "deleted {} {} rows matching {field}={value}",
                ids.len(),
                self.table.name
            );
        }
        Ok(ids.len() as u64)
    }
}
