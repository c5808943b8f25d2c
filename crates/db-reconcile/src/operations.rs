//! Reconciliation operations.
//!
//! An [`Operation`] is one structural change to the target database. The
//! orderer produces them, the dialect renders them to MySQL statements, and
//! [`simulate`] can apply them to a snapshot without touching a database.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnModel, ForeignKeyModel, SchemaModel, TableModel};
use crate::special::SpecialCases;

/// Where an added column is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnPosition {
    /// Before every existing column.
    First,
    /// Directly after the named column.
    After(String),
}

/// A single structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a table. Only `inline_foreign_keys` are declared in the
    /// statement; the rest of `table.foreign_keys` are attached separately.
    CreateTable {
        /// Full table definition.
        table: TableModel,
        /// Foreign keys declared in the CREATE TABLE statement.
        inline_foreign_keys: Vec<ForeignKeyModel>,
    },

    /// Add a column to an existing table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnModel,
        /// Placement.
        position: ColumnPosition,
    },

    /// Redefine an existing column.
    ModifyColumn {
        /// Table name.
        table: String,
        /// New column definition.
        column: ColumnModel,
    },

    /// Rename a column and redefine it in one step.
    RenameColumn {
        /// Table name.
        table: String,
        /// Current column name.
        old_name: String,
        /// New column definition (carries the new name).
        column: ColumnModel,
    },

    /// Add a unique index.
    AddUniqueIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
        /// Indexed columns.
        columns: Vec<String>,
    },

    /// Attach a foreign key constraint to an existing table.
    AttachForeignKey {
        /// Table name.
        table: String,
        /// Foreign key definition.
        foreign_key: ForeignKeyModel,
    },

    /// Drop a foreign key constraint (the columns and rows are kept).
    DropForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        constraint_name: String,
    },

    /// Reconcile a special-cased table. Expanded into concrete operations by
    /// [`SpecialCases::handle`] at execution time.
    Special {
        /// The source definition of the table.
        table: TableModel,
    },
}

impl Operation {
    /// Creates a CreateTable operation with every foreign key inline.
    #[must_use]
    pub fn create_table(table: TableModel) -> Self {
        let inline_foreign_keys = table.foreign_keys.clone();
        Self::CreateTable {
            table,
            inline_foreign_keys,
        }
    }

    /// Creates a CreateTable operation with no foreign keys inline.
    #[must_use]
    pub fn create_table_bare(table: TableModel) -> Self {
        Self::CreateTable {
            table,
            inline_foreign_keys: Vec::new(),
        }
    }

    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnModel, position: ColumnPosition) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
            position,
        }
    }

    /// Creates a ModifyColumn operation.
    #[must_use]
    pub fn modify_column(table: impl Into<String>, column: ColumnModel) -> Self {
        Self::ModifyColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a RenameColumn operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        column: ColumnModel,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            old_name: old_name.into(),
            column,
        }
    }

    /// Creates an AttachForeignKey operation.
    #[must_use]
    pub fn attach_foreign_key(table: impl Into<String>, foreign_key: ForeignKeyModel) -> Self {
        Self::AttachForeignKey {
            table: table.into(),
            foreign_key,
        }
    }

    /// Creates a DropForeignKey operation.
    #[must_use]
    pub fn drop_foreign_key(table: impl Into<String>, constraint_name: impl Into<String>) -> Self {
        Self::DropForeignKey {
            table: table.into(),
            constraint_name: constraint_name.into(),
        }
    }

    /// Returns the table this operation targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::CreateTable { table, .. } | Self::Special { table } => &table.name,
            Self::AddColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AddUniqueIndex { table, .. }
            | Self::AttachForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => table,
        }
    }

    /// Returns the column this operation targets, if it is column-level.
    #[must_use]
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Self::AddColumn { column, .. }
            | Self::ModifyColumn { column, .. }
            | Self::RenameColumn { column, .. } => Some(&column.name),
            _ => None,
        }
    }

    /// Returns true for operations that change a column definition.
    #[must_use]
    pub fn is_column_change(&self) -> bool {
        self.column_name().is_some()
    }

    /// Short human-readable description, used in logs and reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("create table `{}`", table.name),
            Self::AddColumn { table, column, .. } => {
                format!("add column `{}`.`{}`", table, column.name)
            }
            Self::ModifyColumn { table, column } => {
                format!("modify column `{}`.`{}`", table, column.name)
            }
            Self::RenameColumn {
                table,
                old_name,
                column,
            } => format!("rename column `{}`.`{}` to `{}`", table, old_name, column.name),
            Self::AddUniqueIndex { table, name, .. } => {
                format!("add unique index `{name}` on `{table}`")
            }
            Self::AttachForeignKey { table, foreign_key } => {
                format!(
                    "attach foreign key `{}` on `{}` -> `{}`",
                    foreign_key.name, table, foreign_key.references_table
                )
            }
            Self::DropForeignKey {
                table,
                constraint_name,
            } => format!("drop foreign key `{constraint_name}` on `{table}`"),
            Self::Special { table } => format!("reconcile special table `{}`", table.name),
        }
    }
}

/// Applies `operations` to `target` and returns the resulting snapshot.
///
/// Special-table operations are expanded with [`SpecialCases::plan`] against
/// the simulated table, assuming no indexes exist. Operations that would fail
/// on a real database (unknown table, duplicate column) are skipped.
#[must_use]
pub fn simulate(target: &SchemaModel, operations: &[Operation]) -> SchemaModel {
    let mut tables: BTreeMap<String, TableModel> = target
        .tables()
        .map(|t| (t.name.clone(), t.clone()))
        .collect();

    for operation in operations {
        if let Operation::Special { table } = operation {
            let expanded =
                SpecialCases::plan(table, tables.get(&table.name), &BTreeSet::new());
            for op in &expanded {
                apply_one(&mut tables, op);
            }
        } else {
            apply_one(&mut tables, operation);
        }
    }

    SchemaModel::new(tables.into_values())
}

fn apply_one(tables: &mut BTreeMap<String, TableModel>, operation: &Operation) {
    match operation {
        Operation::CreateTable {
            table,
            inline_foreign_keys,
        } => {
            if !tables.contains_key(&table.name) {
                let created = TableModel {
                    foreign_keys: inline_foreign_keys.clone(),
                    ..table.clone()
                };
                tables.insert(table.name.clone(), created);
            }
        }
        Operation::AddColumn {
            table,
            column,
            position,
        } => {
            let Some(t) = tables.get_mut(table) else {
                return;
            };
            if t.get_column(&column.name).is_some() {
                return;
            }
            let index = match position {
                ColumnPosition::First => 0,
                ColumnPosition::After(prev) => t
                    .columns
                    .iter()
                    .position(|c| &c.name == prev)
                    .map_or(t.columns.len(), |i| i + 1),
            };
            t.columns.insert(index, column.clone());
        }
        Operation::ModifyColumn { table, column } => {
            if let Some(existing) = tables
                .get_mut(table)
                .and_then(|t| t.columns.iter_mut().find(|c| c.name == column.name))
            {
                let primary_key = existing.primary_key;
                *existing = ColumnModel {
                    primary_key,
                    ..column.clone()
                };
            }
        }
        Operation::RenameColumn {
            table,
            old_name,
            column,
        } => {
            if let Some(existing) = tables
                .get_mut(table)
                .and_then(|t| t.columns.iter_mut().find(|c| &c.name == old_name))
            {
                let primary_key = existing.primary_key;
                *existing = ColumnModel {
                    primary_key,
                    ..column.clone()
                };
            }
        }
        Operation::AttachForeignKey { table, foreign_key } => {
            if let Some(t) = tables.get_mut(table) {
                t.foreign_keys.push(foreign_key.clone());
            }
        }
        Operation::DropForeignKey {
            table,
            constraint_name,
        } => {
            if let Some(t) = tables.get_mut(table) {
                t.foreign_keys.retain(|fk| &fk.name != constraint_name);
            }
        }
        // Indexes are not part of the model.
        Operation::AddUniqueIndex { .. } | Operation::Special { .. } => {}
    }
}
