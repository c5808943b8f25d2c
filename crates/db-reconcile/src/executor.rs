//! Sync executor.
//!
//! Applies ordered operations to the target database. Foreign key checks are
//! switched off for the run and switched back on at the end. A rejected
//! statement never stops the run: it is logged, recorded in the
//! [`SyncReport`], and execution continues with the next operation.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::connection::SchemaConnection;
use crate::dialect::MySqlDialect;
use crate::error::{Result, SyncError, SyncOperationError};
use crate::operations::Operation;
use crate::special::SpecialCases;

/// Outcome of one executor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Tables created.
    pub created_tables: usize,
    /// Columns added, modified or renamed.
    pub altered_columns: usize,
    /// Foreign keys attached after creation.
    pub attached_constraints: usize,
    /// Descriptions of every applied operation, in order.
    pub applied: Vec<String>,
    /// Every rejected operation, in order.
    pub failures: Vec<SyncOperationError>,
}

impl SyncReport {
    /// Returns true if every operation was applied.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, operation: &Operation) {
        match operation {
            Operation::CreateTable { .. } => self.created_tables += 1,
            Operation::AttachForeignKey { .. } => self.attached_constraints += 1,
            op if op.is_column_change() => self.altered_columns += 1,
            _ => {}
        }
        self.applied.push(operation.describe());
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tables created:        {}", self.created_tables)?;
        writeln!(f, "Columns altered:       {}", self.altered_columns)?;
        writeln!(f, "Constraints attached:  {}", self.attached_constraints)?;
        writeln!(f, "Operations applied:    {}", self.applied.len())?;
        write!(f, "Operations failed:     {}", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// Holds `FOREIGN_KEY_CHECKS=0` on the target session until released.
struct ForeignKeyChecksGuard<'a, C: SchemaConnection + ?Sized> {
    conn: &'a C,
    restore: String,
    released: bool,
}

impl<'a, C: SchemaConnection + ?Sized> ForeignKeyChecksGuard<'a, C> {
    async fn acquire(conn: &'a C, dialect: &MySqlDialect) -> Result<Self> {
        conn.execute(&dialect.foreign_key_checks_sql(false))
            .await
            .map_err(|source| SyncError::ForeignKeyChecks { value: 0, source })?;
        debug!("Foreign key checks disabled");
        Ok(Self {
            conn,
            restore: dialect.foreign_key_checks_sql(true),
            released: false,
        })
    }

    async fn release(mut self) -> std::result::Result<(), sqlx::Error> {
        self.released = true;
        self.conn.execute(&self.restore).await?;
        debug!("Foreign key checks restored");
        Ok(())
    }
}

impl<C: SchemaConnection + ?Sized> Drop for ForeignKeyChecksGuard<'_, C> {
    fn drop(&mut self) {
        if !self.released {
            warn!("Foreign key checks were not restored; the target session still has them off");
        }
    }
}

/// Applies operations to the target database.
pub struct SyncExecutor<'a, C: SchemaConnection + ?Sized> {
    conn: &'a C,
    dialect: MySqlDialect,
    dry_run: bool,
}

impl<'a, C: SchemaConnection + ?Sized> SyncExecutor<'a, C> {
    /// Creates a new executor over the target connection.
    pub fn new(conn: &'a C) -> Self {
        Self {
            conn,
            dialect: MySqlDialect::new(),
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &MySqlDialect {
        &self.dialect
    }

    /// Generates the statements the operations would run. Special tables are
    /// planned against the target's current state, which is only read.
    pub async fn sql_for(&self, operations: &[Operation]) -> Result<Vec<String>> {
        let mut all_sql = Vec::new();
        for operation in operations {
            match operation {
                Operation::Special { table } => {
                    for expanded in SpecialCases::handle(table, self.conn).await? {
                        all_sql.extend(self.dialect.generate_sql(&expanded));
                    }
                }
                op => all_sql.extend(self.dialect.generate_sql(op)),
            }
        }
        Ok(all_sql)
    }

    /// Applies every operation in order and reports the outcome.
    ///
    /// Fails only if foreign key checks cannot be disabled, in which case
    /// nothing has been executed.
    pub async fn execute(&self, operations: &[Operation]) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let guard = if self.dry_run {
            info!("Dry run mode - SQL will be printed but not executed.");
            None
        } else {
            Some(ForeignKeyChecksGuard::acquire(self.conn, &self.dialect).await?)
        };

        for operation in operations {
            match operation {
                Operation::Special { table } => {
                    match SpecialCases::handle(table, self.conn).await {
                        Ok(expanded) => {
                            for op in &expanded {
                                self.apply(op, &mut report).await;
                            }
                        }
                        Err(e) => {
                            error!(table = %table.name, error = %e, "Special table planning failed");
                            report.failures.push(SyncOperationError {
                                operation: operation.describe(),
                                table: table.name.clone(),
                                column: None,
                                statement: None,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                op => self.apply(op, &mut report).await,
            }
        }

        if let Some(guard) = guard {
            if let Err(e) = guard.release().await {
                error!(error = %e, "Failed to restore foreign key checks");
                report.failures.push(SyncOperationError {
                    operation: "restore foreign key checks".to_string(),
                    table: String::new(),
                    column: None,
                    statement: Some(self.dialect.foreign_key_checks_sql(true)),
                    message: e.to_string(),
                });
            }
        }

        info!(
            created_tables = report.created_tables,
            altered_columns = report.altered_columns,
            attached_constraints = report.attached_constraints,
            failures = report.failures.len(),
            "Sync finished"
        );
        Ok(report)
    }

    /// Runs one operation. Stops at its first rejected statement.
    async fn apply(&self, operation: &Operation, report: &mut SyncReport) {
        for sql in self.dialect.generate_sql(operation) {
            debug!(sql = %sql, "Executing SQL");

            if self.dry_run {
                println!("{sql};");
                continue;
            }

            if let Err(e) = self.run(operation, &sql).await {
                error!(
                    table = %operation.table_name(),
                    column = operation.column_name().unwrap_or_default(),
                    sql = %sql,
                    error = %e,
                    "Operation failed"
                );
                report.failures.push(SyncOperationError {
                    operation: operation.describe(),
                    table: operation.table_name().to_string(),
                    column: operation.column_name().map(String::from),
                    statement: Some(sql),
                    message: e.to_string(),
                });
                return;
            }
        }

        info!(operation = %operation.describe(), "Applied");
        report.record(operation);
    }

    /// Executes a statement. A foreign key rejected for a missing index on
    /// the referenced columns gets the index and one retry.
    async fn run(&self, operation: &Operation, sql: &str) -> std::result::Result<(), sqlx::Error> {
        let Err(e) = self.conn.execute(sql).await else {
            return Ok(());
        };

        let Operation::AttachForeignKey { foreign_key, .. } = operation else {
            return Err(e);
        };
        if !e.to_string().contains("Missing index") {
            return Err(e);
        }

        warn!(
            table = %foreign_key.references_table,
            columns = %foreign_key.references_columns.join(", "),
            "Creating missing index for foreign key"
        );
        let index_sql = self
            .dialect
            .add_index_sql(&foreign_key.references_table, &foreign_key.references_columns);
        self.conn.execute(&index_sql).await?;
        self.conn.execute(sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        use crate::schema::{ColumnModel, ForeignKeyModel, SqlType, TableModel};

        let mut report = SyncReport::default();
        report.record(&Operation::create_table(TableModel::new("students")));
        report.record(&Operation::modify_column(
            "students",
            ColumnModel::new("name", SqlType::Varchar(100)),
        ));
        report.record(&Operation::attach_foreign_key(
            "krs",
            ForeignKeyModel::new("krs", "nim", "students", "nim"),
        ));

        assert_eq!(report.created_tables, 1);
        assert_eq!(report.altered_columns, 1);
        assert_eq!(report.attached_constraints, 1);
        assert_eq!(report.applied.len(), 3);
        assert!(report.is_success());
    }

    #[test]
    fn test_report_display_lists_failures() {
        let report = SyncReport {
            failures: vec![SyncOperationError {
                operation: "add column `t`.`c`".into(),
                table: "t".into(),
                column: Some("c".into()),
                statement: None,
                message: "Duplicate column name 'c'".into(),
            }],
            ..SyncReport::default()
        };

        let text = report.to_string();
        assert!(text.contains("Operations failed:     1"));
        assert!(text.contains("add column `t`.`c` failed: Duplicate column name 'c'"));
    }
}
