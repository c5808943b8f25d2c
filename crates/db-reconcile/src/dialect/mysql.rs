//! MySQL dialect.
//!
//! Renders each [`Operation`] to the statements that perform it. Column
//! definitions never carry `PRIMARY KEY`; keys are declared at table level on
//! creation and are not altered afterwards.

use crate::operations::{ColumnPosition, Operation};
use crate::schema::{ColumnModel, ForeignKeyModel, TableModel};

use super::{quote_identifier, quote_list};

/// MySQL statement generator.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the dialect name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        "mysql"
    }

    /// Generates the statements for an operation.
    ///
    /// [`Operation::Special`] yields nothing: it is expanded by the executor.
    #[must_use]
    pub fn generate_sql(&self, operation: &Operation) -> Vec<String> {
        match operation {
            Operation::CreateTable {
                table,
                inline_foreign_keys,
            } => vec![self.create_table_sql(table, inline_foreign_keys)],

            Operation::AddColumn {
                table,
                column,
                position,
            } => {
                let placement = match position {
                    ColumnPosition::First => "FIRST".to_string(),
                    ColumnPosition::After(prev) => format!("AFTER {}", quote_identifier(prev)),
                };
                vec![format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote_identifier(table),
                    self.column_definition(column),
                    placement
                )]
            }

            Operation::ModifyColumn { table, column } => vec![format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                quote_identifier(table),
                self.column_definition(column)
            )],

            Operation::RenameColumn {
                table,
                old_name,
                column,
            } => vec![format!(
                "ALTER TABLE {} CHANGE COLUMN {} {}",
                quote_identifier(table),
                quote_identifier(old_name),
                self.column_definition(column)
            )],

            Operation::AddUniqueIndex {
                table,
                name,
                columns,
            } => vec![format!(
                "ALTER TABLE {} ADD UNIQUE INDEX {} ({})",
                quote_identifier(table),
                quote_identifier(name),
                quote_list(columns)
            )],

            Operation::AttachForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} ADD {}",
                quote_identifier(table),
                self.foreign_key_clause(foreign_key)
            )],

            Operation::DropForeignKey {
                table,
                constraint_name,
            } => vec![format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                quote_identifier(table),
                quote_identifier(constraint_name)
            )],

            Operation::Special { .. } => Vec::new(),
        }
    }

    /// Generates SQL for creating a table.
    fn create_table_sql(&self, table: &TableModel, foreign_keys: &[ForeignKeyModel]) -> String {
        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        let primary_key: Vec<String> = table.primary_key().into_iter().map(String::from).collect();
        if !primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", quote_list(&primary_key)));
        }

        parts.extend(foreign_keys.iter().map(|fk| self.foreign_key_clause(fk)));

        format!(
            "CREATE TABLE {} (\n  {}\n) ENGINE=InnoDB",
            quote_identifier(&table.name),
            parts.join(",\n  ")
        )
    }

    /// Generates a column definition (without key clauses).
    #[must_use]
    pub fn column_definition(&self, column: &ColumnModel) -> String {
        let mut parts = vec![quote_identifier(&column.name), column.sql_type.to_sql()];

        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(default_sql) = column.default.to_sql() {
            parts.push(format!("DEFAULT {default_sql}"));
        }

        if let Some(ref on_update) = column.on_update {
            parts.push(format!("ON UPDATE {on_update}"));
        }

        if column.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }

        parts.join(" ")
    }

    /// Generates a `CONSTRAINT ... FOREIGN KEY ... REFERENCES ...` clause.
    #[must_use]
    pub fn foreign_key_clause(&self, fk: &ForeignKeyModel) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quote_identifier(&fk.name),
            quote_list(&fk.columns),
            quote_identifier(&fk.references_table),
            quote_list(&fk.references_columns),
            fk.on_delete.to_sql(),
            fk.on_update.to_sql()
        )
    }

    /// Generates SQL that adds a plain index over `columns`.
    #[must_use]
    pub fn add_index_sql(&self, table: &str, columns: &[String]) -> String {
        format!(
            "ALTER TABLE {} ADD INDEX ({})",
            quote_identifier(table),
            quote_list(columns)
        )
    }

    /// Generates SQL that toggles foreign-key enforcement for the session.
    #[must_use]
    pub fn foreign_key_checks_sql(&self, enabled: bool) -> String {
        format!("SET FOREIGN_KEY_CHECKS={}", u8::from(enabled))
    }
}
