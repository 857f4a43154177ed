use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::Backend;
use crate::types::SqlValue;

/// Rows of one table, keyed by surrogate id. Ids count up from 1 and are
/// never reused.
#[derive(Clone, Debug)]
pub struct MemoryTable {
    pub rows: BTreeMap<i64, HashMap<String, SqlValue>>,
    pub next_id: i64,
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryTable {
    fn alloc_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub tables: HashMap<String, MemoryTable>,
}

pub type SharedStore = Arc<RwLock<MemoryStore>>;

impl MemoryStore {
    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(MemoryStore::default()))
    }

    /// Inserts a row directly, bypassing the writer. Test seam.
    pub fn insert_raw(&mut self, table: &str, values: &[(&str, SqlValue)]) -> i64 {
        let table = self.tables.entry(table.to_string()).or_default();
        let id = table.alloc_id();
        let row = values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        table.rows.insert(id, row);
        id
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }

    pub fn row(&self, table: &str, id: i64) -> Option<HashMap<String, SqlValue>> {
        self.tables.get(table).and_then(|t| t.rows.get(&id)).cloned()
    }

    /// Cloned rows whose field matches the given text form.
    pub fn rows_matching(
        &self,
        table: &str,
        field: &str,
        value: &str,
    ) -> Vec<HashMap<String, SqlValue>> {
        let Some(table) = self.tables.get(table) else {
            return Vec::new();
        };
        table
            .rows
            .values()
            .filter(|row| row.get(field).is_some_and(|v| value_matches(v, value)))
            .cloned()
            .collect()
    }
}

fn value_matches(value: &SqlValue, text: &str) -> bool {
    match value {
        SqlValue::Text(s) => s == text,
        SqlValue::Int(i) => i.to_string() == text,
        SqlValue::Double(d) => d.to_string() == text,
        SqlValue::Date(_) => value.as_text().is_some_and(|s| s == text),
        SqlValue::TextArray(_) | SqlValue::Null => false,
    }
}

fn array_contains(value: &SqlValue, text: &str) -> bool {
    matches!(value, SqlValue::TextArray(items) if items.iter().any(|item| item == text))
}

/// Transactional view over a [`SharedStore`]. The first operation snapshots
/// the shared state; commit publishes the snapshot back, rollback drops it.
/// Writers racing on one store resolve as last commit wins.
pub struct MemoryBackend {
    shared: SharedStore,
    working: Option<MemoryStore>,
}

impl MemoryBackend {
    pub fn new(shared: SharedStore) -> Self {
        Self {
            shared,
            working: None,
        }
    }

    fn store(&mut self) -> &mut MemoryStore {
        self.working
            .get_or_insert_with(|| self.shared.read().clone())
    }
}

impl Backend for MemoryBackend {
    fn insert_returning_id(
        &mut self,
        table: &str,
        columns: &[&str],
        row: &[SqlValue],
    ) -> anyhow::Result<i64> {
        let table = self.store().tables.entry(table.to_string()).or_default();
        let id = table.alloc_id();
        let values = columns
            .iter()
            .zip(row)
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        table.rows.insert(id, values);
        Ok(id)
    }

    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> anyhow::Result<u64> {
        for row in rows {
            self.insert_returning_id(table, columns, row)?;
        }
        Ok(rows.len() as u64)
    }

    fn update_by_id(
        &mut self,
        table: &str,
        columns: &[&str],
        row: &[SqlValue],
        id: i64,
    ) -> anyhow::Result<u64> {
        let table = self.store().tables.entry(table.to_string()).or_default();
        let Some(stored) = table.rows.get_mut(&id) else {
            return Ok(0);
        };
        // assigns only the listed columns; others keep their stored values
        for (name, value) in columns.iter().zip(row) {
            stored.insert(name.to_string(), value.clone());
        }
        Ok(1)
    }

    fn delete_by_id(&mut self, table: &str, id: i64) -> anyhow::Result<u64> {
        let table = self.store().tables.entry(table.to_string()).or_default();
        Ok(table.rows.remove(&id).map_or(0, |_| 1))
    }

    fn ids_for_value(
        &mut self,
        table: &str,
        field: &str,
        value: &str,
    ) -> anyhow::Result<Vec<i64>> {
        let Some(table) = self.store().tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .iter()
            .filter(|(_, row)| row.get(field).is_some_and(|v| value_matches(v, value)))
            .map(|(id, _)| *id)
            .collect())
    }

    fn value_for_id(
        &mut self,
        table: &str,
        field: &str,
        id: i64,
    ) -> anyhow::Result<Option<String>> {
        let Some(table) = self.store().tables.get(table) else {
            return Ok(None);
        };
        Ok(table
            .rows
            .get(&id)
            .and_then(|row| row.get(field))
            .and_then(|value| value.as_text()))
    }

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64> {
        Ok(self.store().tables.get(table).map_or(0, |t| t.rows.len() as u64))
    }

    fn delete_references(
        &mut self,
        table: &str,
        field: &str,
        is_array: bool,
        value: &str,
    ) -> anyhow::Result<u64> {
        let table = self.store().tables.entry(table.to_string()).or_default();
        let before = table.rows.len();
        table.rows.retain(|_, row| {
            let Some(stored) = row.get(field) else {
                return true;
            };
            if is_array {
                !array_contains(stored, value)
            } else {
                !value_matches(stored, value)
            }
        });
        Ok((before - table.rows.len()) as u64)
    }

    fn rewrite_references(
        &mut self,
        table: &str,
        field: &str,
        is_array: bool,
        old: &str,
        new: &str,
    ) -> anyhow::Result<u64> {
        let table = self.store().tables.entry(table.to_string()).or_default();
        let mut changed = 0;
        for row in table.rows.values_mut() {
            let Some(stored) = row.get_mut(field) else {
                continue;
            };
            if is_array {
                let SqlValue::TextArray(items) = stored else {
                    continue;
                };
                if items.iter().any(|item| item == old) {
                    for item in items.iter_mut() {
                        if item == old {
                            *item = new.to_string();
                        }
                    }
                    changed += 1;
                }
            } else if value_matches(stored, old) {
                *stored = SqlValue::Text(new.to_string());
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn delete_via(
        &mut self,
        table: &str,
        via: &str,
        join_field: &str,
        match_field: &str,
        value: &str,
    ) -> anyhow::Result<u64> {
        let store = self.store();
        let join_keys: HashSet<String> = store
            .tables
            .get(via)
            .map(|t| {
                t.rows
                    .values()
                    .filter(|row| {
                        row.get(match_field).is_some_and(|v| value_matches(v, value))
                    })
                    .filter_map(|row| row.get(join_field).and_then(|v| v.as_text()))
                    .collect()
            })
            .unwrap_or_default();
        let table = store.tables.entry(table.to_string()).or_default();
        let before = table.rows.len();
        table.rows.retain(|_, row| {
            !row.get(join_field)
                .and_then(|v| v.as_text())
                .is_some_and(|key| join_keys.contains(&key))
        });
        Ok((before - table.rows.len()) as u64)
    }

    fn set_fields(
        &mut self,
        table: &str,
        assignments: &[(&str, SqlValue)],
        key_field: &str,
        key: &str,
    ) -> anyhow::Result<u64> {
        let table = self.store().tables.entry(table.to_string()).or_default();
        let mut changed = 0;
        for row in table.rows.values_mut() {
            if !row.get(key_field).is_some_and(|v| value_matches(v, key)) {
                continue;
            }
            for (name, value) in assignments {
                row.insert(name.to_string(), value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    fn set_fields_via(
        &mut self,
        table: &str,
        via: &str,
        join_field: &str,
        assignments: &[(&str, SqlValue)],
        match_field: &str,
        key: &str,
        order_field: &str,
        order: i64,
    ) -> anyhow::Result<u64> {
        let store = self.store();
        let join_keys: HashSet<String> = store
            .tables
            .get(via)
            .map(|t| {
                t.rows
                    .values()
                    .filter(|row| row.get(match_field).is_some_and(|v| value_matches(v, key)))
                    .filter_map(|row| row.get(join_field).and_then(|v| v.as_text()))
                    .collect()
            })
            .unwrap_or_default();
        let table = store.tables.entry(table.to_string()).or_default();
        let mut changed = 0;
        for row in table.rows.values_mut() {
            let joined = row
                .get(join_field)
                .and_then(|v| v.as_text())
                .is_some_and(|k| join_keys.contains(&k));
            let ordered = row
                .get(order_field)
                .is_some_and(|v| matches!(v, SqlValue::Int(n) if *n == order));
            if !(joined && ordered) {
                continue;
            }
            for (name, value) in assignments {
                row.insert(name.to_string(), value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        if let Some(working) = self.working.take() {
            *self.shared.write() = working;
        }
        Ok(())
    }

    fn rollback(&mut self) -> anyhow::Result<()> {
        self.working = None;
        Ok(())
    }
}
