//! Storage seam for the writer. One implementation speaks to a live
//! Postgres connection, the other keeps rows in process memory so the write
//! paths can be exercised without a server. Table names arrive already
//! qualified with the editing namespace.

mod memory;
mod postgres;

pub use memory::{MemoryBackend, MemoryStore, SharedStore};
pub use postgres::PgBackend;

use crate::types::SqlValue;

pub trait Backend {
    /// Inserts one row and returns its surrogate id.
    fn insert_returning_id(
        &mut self,
        table: &str,
        columns: &[&str],
        row: &[SqlValue],
    ) -> anyhow::Result<i64>;

    /// Inserts many rows with a shared column list.
    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> anyhow::Result<u64>;

    /// Rewrites one row by surrogate id, returning the affected count.
    fn update_by_id(
        &mut self,
        table: &str,
        columns: &[&str],
        row: &[SqlValue],
        id: i64,
    ) -> anyhow::Result<u64>;

    fn delete_by_id(&mut self, table: &str, id: i64) -> anyhow::Result<u64>;

    /// Surrogate ids of rows whose field equals the given text value.
    fn ids_for_value(&mut self, table: &str, field: &str, value: &str)
    -> anyhow::Result<Vec<i64>>;

    /// Text form of one field of one row, `None` when the row is absent or
    /// the field is null.
    fn value_for_id(
        &mut self,
        table: &str,
        field: &str,
        id: i64,
    ) -> anyhow::Result<Option<String>>;

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64>;

    /// Deletes rows referencing a key; array fields match by containment.
    fn delete_references(
        &mut self,
        table: &str,
        field: &str,
        is_array: bool,
        value: &str,
    ) -> anyhow::Result<u64>;

    /// Points references at a renamed key; array fields replace the element.
    fn rewrite_references(
        &mut self,
        table: &str,
        field: &str,
        is_array: bool,
        old: &str,
        new: &str,
    ) -> anyhow::Result<u64>;

    /// Deletes rows of `table` whose `join_field` matches a row in `via`
    /// selected by `match_field = value`.
    fn delete_via(
        &mut self,
        table: &str,
        via: &str,
        join_field: &str,
        match_field: &str,
        value: &str,
    ) -> anyhow::Result<u64>;

    /// Assigns fields on every row keyed by `key_field = key`.
    fn set_fields(
        &mut self,
        table: &str,
        assignments: &[(&str, SqlValue)],
        key_field: &str,
        key: &str,
    ) -> anyhow::Result<u64>;

    /// Assigns fields on rows reached through a join, narrowed by an order
    /// column on the target rows.
    #[allow(clippy::too_many_arguments)]
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
    ) -> anyhow::Result<u64>;

    fn commit(&mut self) -> anyhow::Result<()>;

    fn rollback(&mut self) -> anyhow::Result<()>;
}
