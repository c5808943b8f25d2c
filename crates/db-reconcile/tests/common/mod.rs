//! Scripted in-memory connection for integration tests.
//!
//! Catalog rows are rendered from [`TableModel`]s the way MySQL reports
//! them. Executed statements are recorded, and statements matching a
//! scripted pattern are rejected with a given engine message.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use db_reconcile::prelude::{
    ColumnModel, ColumnRow, DatabaseRole, DefaultValue, ForeignKeyModel, ForeignKeyRow,
    SchemaConnection, TableModel,
};

struct Rejection {
    pattern: String,
    message: String,
    remaining: Option<usize>,
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, TableModel>,
    indexes: BTreeMap<String, BTreeSet<String>>,
    executed: Vec<String>,
    rejections: Vec<Rejection>,
    broken_tables: BTreeSet<String>,
    unreachable: bool,
}

pub struct FakeConnection {
    role: DatabaseRole,
    state: Mutex<State>,
}

impl FakeConnection {
    pub fn new(role: DatabaseRole, tables: Vec<TableModel>) -> Self {
        let state = State {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
            ..State::default()
        };
        Self {
            role,
            state: Mutex::new(state),
        }
    }

    pub fn source(tables: Vec<TableModel>) -> Self {
        Self::new(DatabaseRole::Source, tables)
    }

    pub fn target(tables: Vec<TableModel>) -> Self {
        Self::new(DatabaseRole::Target, tables)
    }

    /// Rejects every statement containing `pattern`.
    pub fn reject(self, pattern: &str, message: &str) -> Self {
        self.push_rejection(pattern, message, None)
    }

    /// Rejects the first statement containing `pattern`.
    pub fn reject_once(self, pattern: &str, message: &str) -> Self {
        self.push_rejection(pattern, message, Some(1))
    }

    /// Fails every catalog read for `table`.
    pub fn break_table(self, table: &str) -> Self {
        self.state.lock().unwrap().broken_tables.insert(table.to_string());
        self
    }

    /// Fails the ping.
    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    pub fn with_index(self, table: &str, index: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .indexes
            .entry(table.to_string())
            .or_default()
            .insert(index.to_string());
        self
    }

    /// Statements executed so far, including rejected ones.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    fn push_rejection(self, pattern: &str, message: &str, remaining: Option<usize>) -> Self {
        self.state.lock().unwrap().rejections.push(Rejection {
            pattern: pattern.to_string(),
            message: message.to_string(),
            remaining,
        });
        self
    }

    fn check_table(&self, table: &str) -> Result<(), sqlx::Error> {
        if self.state.lock().unwrap().broken_tables.contains(table) {
            return Err(sqlx::Error::Protocol(format!("lost connection reading `{table}`")));
        }
        Ok(())
    }
}

fn column_row(column: &ColumnModel) -> ColumnRow {
    let mut extra = Vec::new();
    let default = match &column.default {
        DefaultValue::None => None,
        DefaultValue::Literal(value) => Some(value.clone()),
        DefaultValue::Expression(expr) => {
            extra.push("DEFAULT_GENERATED".to_string());
            Some(expr.clone())
        }
    };
    if column.auto_increment {
        extra.push("auto_increment".to_string());
    }
    if let Some(on_update) = &column.on_update {
        extra.push(format!("on update {on_update}"));
    }

    ColumnRow {
        name: column.name.clone(),
        column_type: column.sql_type.to_sql(),
        is_nullable: if column.nullable { "YES" } else { "NO" }.to_string(),
        default,
        column_key: if column.primary_key { "PRI" } else { "" }.to_string(),
        extra: extra.join(" "),
    }
}

fn foreign_key_rows(fk: &ForeignKeyModel) -> Vec<ForeignKeyRow> {
    fk.columns
        .iter()
        .zip(&fk.references_columns)
        .map(|(column, referenced)| ForeignKeyRow {
            constraint_name: fk.name.clone(),
            column_name: column.clone(),
            referenced_table: fk.references_table.clone(),
            referenced_column: referenced.clone(),
            delete_rule: fk.on_delete.to_sql().to_string(),
            update_rule: fk.on_update.to_sql().to_string(),
        })
        .collect()
}

#[async_trait]
impl SchemaConnection for FakeConnection {
    fn role(&self) -> DatabaseRole {
        self.role
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.state.lock().unwrap().unreachable {
            return Err(sqlx::Error::Protocol("connection refused".into()));
        }
        Ok(())
    }

    async fn table_names(&self) -> Result<Vec<String>, sqlx::Error> {
        Ok(self.state.lock().unwrap().tables.keys().cloned().collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnRow>, sqlx::Error> {
        self.check_table(table)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(column_row).collect())
            .unwrap_or_default())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRow>, sqlx::Error> {
        self.check_table(table)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(table)
            .map(|t| t.foreign_keys.iter().flat_map(foreign_key_rows).collect())
            .unwrap_or_default())
    }

    async fn index_names(&self, table: &str) -> Result<Vec<String>, sqlx::Error> {
        self.check_table(table)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .indexes
            .get(table)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(statement.to_string());

        let rejection = state.rejections.iter_mut().find(|r| {
            statement.contains(&r.pattern) && r.remaining.is_none_or(|left| left > 0)
        });
        if let Some(rejection) = rejection {
            if let Some(left) = rejection.remaining.as_mut() {
                *left -= 1;
            }
            return Err(sqlx::Error::Protocol(rejection.message.clone()));
        }
        Ok(())
    }
}
