//! Catalog introspection.
//!
//! Reads a connection's catalog and builds a normalized [`SchemaModel`].
//! Either the whole model is built or an error is returned; a failed catalog
//! read never yields a partial snapshot.

use tracing::{debug, info};

use crate::connection::{ColumnRow, ForeignKeyRow, SchemaConnection};
use crate::error::{Result, SyncError};
use crate::schema::{
    normalize_current_timestamp, ColumnModel, DefaultValue, ForeignKeyAction, ForeignKeyModel,
    SchemaModel, SqlType, TableModel,
};

/// Builds schema snapshots from a live catalog.
pub struct Introspector;

impl Introspector {
    /// Introspects every base table of the connection's database.
    pub async fn introspect<C>(conn: &C) -> Result<SchemaModel>
    where
        C: SchemaConnection + ?Sized,
    {
        let role = conn.role();
        conn.ping()
            .await
            .map_err(|source| SyncError::Connection { role, source })?;

        let names = conn
            .table_names()
            .await
            .map_err(|source| SyncError::Introspection {
                role,
                object: "table list".to_string(),
                source,
            })?;

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            tables.push(Self::read_table(conn, name).await?);
        }

        info!(%role, tables = tables.len(), "Introspected schema");
        Ok(SchemaModel::new(tables))
    }

    /// Introspects a single table. Returns `None` if it does not exist.
    pub async fn table<C>(conn: &C, name: &str) -> Result<Option<TableModel>>
    where
        C: SchemaConnection + ?Sized,
    {
        let role = conn.role();
        let names = conn
            .table_names()
            .await
            .map_err(|source| SyncError::Introspection {
                role,
                object: "table list".to_string(),
                source,
            })?;

        if !names.iter().any(|n| n == name) {
            return Ok(None);
        }
        Self::read_table(conn, name).await.map(Some)
    }

    async fn read_table<C>(conn: &C, name: &str) -> Result<TableModel>
    where
        C: SchemaConnection + ?Sized,
    {
        let role = conn.role();

        let columns = conn
            .columns(name)
            .await
            .map_err(|source| SyncError::Introspection {
                role,
                object: format!("columns of `{name}`"),
                source,
            })?;

        let foreign_keys =
            conn.foreign_keys(name)
                .await
                .map_err(|source| SyncError::Introspection {
                    role,
                    object: format!("foreign keys of `{name}`"),
                    source,
                })?;

        debug!(
            %role,
            table = %name,
            columns = columns.len(),
            foreign_keys = foreign_keys.len(),
            "Read table"
        );

        Ok(TableModel {
            name: name.to_string(),
            columns: columns.iter().map(column_from_row).collect(),
            foreign_keys: group_foreign_keys(name, &foreign_keys),
        })
    }
}

/// Normalizes one catalog column row.
#[must_use]
pub fn column_from_row(row: &ColumnRow) -> ColumnModel {
    let extra = row.extra.to_ascii_lowercase();
    let nullable = row.is_nullable.eq_ignore_ascii_case("YES");
    let sql_type = SqlType::parse(&row.column_type);

    let default = DefaultValue::from_catalog(row.default.as_deref(), &row.extra, &sql_type);
    let on_update = extra
        .find("on update ")
        .and_then(|at| normalize_current_timestamp(&extra[at + "on update ".len()..]));

    ColumnModel {
        name: row.name.clone(),
        sql_type,
        nullable,
        default,
        auto_increment: extra.contains("auto_increment"),
        primary_key: row.column_key.eq_ignore_ascii_case("PRI"),
        on_update,
    }
}

/// Groups per-column foreign key rows into constraints, keeping row order.
#[must_use]
pub fn group_foreign_keys(table: &str, rows: &[ForeignKeyRow]) -> Vec<ForeignKeyModel> {
    let mut keys: Vec<ForeignKeyModel> = Vec::new();

    for row in rows {
        match keys.iter_mut().find(|fk| fk.name == row.constraint_name) {
            Some(fk) => {
                fk.columns.push(row.column_name.clone());
                fk.references_columns.push(row.referenced_column.clone());
            }
            None => keys.push(
                ForeignKeyModel::new(
                    table,
                    row.column_name.clone(),
                    row.referenced_table.clone(),
                    row.referenced_column.clone(),
                )
                .named(row.constraint_name.clone())
                .on_delete(ForeignKeyAction::parse(&row.delete_rule))
                .on_update(ForeignKeyAction::parse(&row.update_rule)),
            ),
        }
    }

    keys
}
