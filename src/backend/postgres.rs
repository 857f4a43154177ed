use bytes::BytesMut;
use log::debug;
use postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use postgres::{Client, NoTls};

use crate::backend::Backend;
use crate::sql;
use crate::types::SqlValue;

/// Writer backend over a live Postgres connection. A transaction is opened
/// lazily on the first statement and closed by commit or rollback, so a
/// writer that only reads never holds one open.
pub struct PgBackend {
    client: Client,
    in_tx: bool,
}

impl PgBackend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            in_tx: false,
        }
    }

    /// Connects with a libpq-style parameter string, e.g.
    /// `host=localhost user=editor dbname=gtfs`.
    pub fn connect(params: &str) -> anyhow::Result<Self> {
        Ok(Self::new(Client::connect(params, NoTls)?))
    }

    fn begin_if_needed(&mut self) -> anyhow::Result<()> {
        if !self.in_tx {
            self.client.batch_execute("begin")?;
            self.in_tx = true;
        }
        Ok(())
    }

    fn run(&mut self, statement: &str, params: &[SqlValue]) -> anyhow::Result<u64> {
        self.begin_if_needed()?;
        debug!("{statement}");
        let params: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(self.client.execute(statement, &refs)?)
    }

    fn query(&mut self, statement: &str, params: &[SqlValue]) -> anyhow::Result<Vec<postgres::Row>> {
        self.begin_if_needed()?;
        debug!("{statement}");
        let params: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(self.client.query(statement, &refs)?)
    }
}

/// Adapter binding [`SqlValue`] against whatever column type the server
/// declares, narrowing integers and floats to the declared width. Values
/// that do not fit the declared width are refused.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Int(n) => {
                if *ty == Type::INT2 {
                    i16::try_from(*n)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*n)?.to_sql(ty, out)
                } else {
                    n.to_sql(ty, out)
                }
            }
            SqlValue::Double(d) => {
                if *ty == Type::FLOAT4 {
                    let narrowed = *d as f32;
                    if narrowed.is_infinite() && d.is_finite() {
                        return Err(format!("{d} is out of range for a real column").into());
                    }
                    narrowed.to_sql(ty, out)
                } else {
                    d.to_sql(ty, out)
                }
            }
            SqlValue::Text(s) => s.to_sql(ty, out),
            SqlValue::Date(d) => d.to_sql(ty, out),
            SqlValue::TextArray(items) => items.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl Backend for PgBackend {
    fn insert_returning_id(
        &mut self,
        table: &str,
        columns: &[&str],
        row: &[SqlValue],
    ) -> anyhow::Result<i64> {
        let statement = sql::insert_sql(table, columns);
        let rows = self.query(&statement, row)?;
        let Some(first) = rows.first() else {
            anyhow::bail!("insert into {table} returned no id");
        };
        Ok(first.try_get::<_, i32>(0)? as i64)
    }

    fn insert_batch(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.begin_if_needed()?;
        let statement = sql::insert_rows_sql(table, columns);
        debug!("{statement} ({} rows)", rows.len());
        let prepared = self.client.prepare(&statement)?;
        for row in rows {
            let params: Vec<PgParam<'_>> = row.iter().map(PgParam).collect();
            let refs: Vec<&(dyn ToSql + Sync)> =
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
            self.client.execute(&prepared, &refs)?;
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
        let statement = sql::update_by_id_sql(table, columns);
        let mut params = row.to_vec();
        params.push(SqlValue::Int(id));
        self.run(&statement, &params)
    }

    fn delete_by_id(&mut self, table: &str, id: i64) -> anyhow::Result<u64> {
        self.run(&sql::delete_by_id_sql(table), &[SqlValue::Int(id)])
    }

    fn ids_for_value(
        &mut self,
        table: &str,
        field: &str,
        value: &str,
    ) -> anyhow::Result<Vec<i64>> {
        let statement = sql::select_ids_sql(table, field);
        let rows = self.query(&statement, &[SqlValue::Text(value.to_string())])?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(row.try_get::<_, i32>(0)? as i64);
        }
        Ok(ids)
    }

    fn value_for_id(
        &mut self,
        table: &str,
        field: &str,
        id: i64,
    ) -> anyhow::Result<Option<String>> {
        let statement = sql::select_field_by_id_sql(table, field);
        let rows = self.query(&statement, &[SqlValue::Int(id)])?;
        let Some(first) = rows.first() else {
            return Ok(None);
        };
        Ok(first.try_get::<_, Option<String>>(0)?)
    }

    fn count_rows(&mut self, table: &str) -> anyhow::Result<u64> {
        let rows = self.query(&sql::count_sql(table), &[])?;
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        Ok(first.try_get::<_, i64>(0)? as u64)
    }

    fn delete_references(
        &mut self,
        table: &str,
        field: &str,
        is_array: bool,
        value: &str,
    ) -> anyhow::Result<u64> {
        let statement = sql::delete_references_sql(table, field, is_array);
        self.run(&statement, &[SqlValue::Text(value.to_string())])
    }

    fn rewrite_references(
        &mut self,
        table: &str,
        field: &str,
        is_array: bool,
        old: &str,
        new: &str,
    ) -> anyhow::Result<u64> {
        let statement = sql::rewrite_references_sql(table, field, is_array);
        self.run(
            &statement,
            &[
                SqlValue::Text(new.to_string()),
                SqlValue::Text(old.to_string()),
            ],
        )
    }

    fn delete_via(
        &mut self,
        table: &str,
        via: &str,
        join_field: &str,
        match_field: &str,
        value: &str,
    ) -> anyhow::Result<u64> {
        let statement = sql::delete_via_sql(table, via, join_field, match_field);
        self.run(&statement, &[SqlValue::Text(value.to_string())])
    }

    fn set_fields(
        &mut self,
        table: &str,
        assignments: &[(&str, SqlValue)],
        key_field: &str,
        key: &str,
    ) -> anyhow::Result<u64> {
        let fields: Vec<&str> = assignments.iter().map(|(name, _)| *name).collect();
        let statement = sql::set_fields_sql(table, &fields, key_field);
        let mut params: Vec<SqlValue> =
            assignments.iter().map(|(_, value)| value.clone()).collect();
        params.push(SqlValue::Text(key.to_string()));
        self.run(&statement, &params)
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
        let fields: Vec<&str> = assignments.iter().map(|(name, _)| *name).collect();
        let statement =
            sql::set_fields_via_sql(table, via, join_field, &fields, match_field, order_field);
        let mut params: Vec<SqlValue> =
            assignments.iter().map(|(_, value)| value.clone()).collect();
        params.push(SqlValue::Text(key.to_string()));
        params.push(SqlValue::Int(order));
        self.run(&statement, &params)
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        if self.in_tx {
            self.client.batch_execute("commit")?;
            self.in_tx = false;
        }
        Ok(())
    }

    fn rollback(&mut self) -> anyhow::Result<()> {
        if self.in_tx {
            self.client.batch_execute("rollback")?;
            self.in_tx = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_integer_columns_reject_out_of_range_values() {
        let mut out = BytesMut::new();
        let beyond_smallint = SqlValue::Int(100_000);
        let param = PgParam(&beyond_smallint);
        assert!(param.to_sql(&Type::INT2, &mut out).is_err());
        assert!(param.to_sql(&Type::INT4, &mut out).is_ok());
        let beyond_integer = SqlValue::Int(i64::from(i32::MAX) + 1);
        let param = PgParam(&beyond_integer);
        assert!(param.to_sql(&Type::INT4, &mut out).is_err());
        assert!(param.to_sql(&Type::INT8, &mut out).is_ok());
    }

    #[test]
    fn real_columns_reject_doubles_past_their_range() {
        let mut out = BytesMut::new();
        let beyond_real = SqlValue::Double(1e39);
        let param = PgParam(&beyond_real);
        assert!(param.to_sql(&Type::FLOAT4, &mut out).is_err());
        assert!(param.to_sql(&Type::FLOAT8, &mut out).is_ok());
    }
}
