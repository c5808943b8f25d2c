//! The reconcile pipeline.
//!
//! [`plan`] introspects both databases, diffs them and orders the result;
//! [`apply`] executes a plan against the target. Nothing in [`plan`] writes
//! to either database.

use std::fmt;

use tracing::info;

use crate::connection::SchemaConnection;
use crate::differ::{ColumnDelta, DifferOptions, SchemaDelta, SchemaDiffer};
use crate::error::Result;
use crate::executor::{SyncExecutor, SyncReport};
use crate::introspect::Introspector;
use crate::operations::{simulate, Operation};
use crate::orderer::DependencyOrderer;
use crate::schema::SchemaModel;

/// Everything computed before the target is touched.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Source snapshot.
    pub source: SchemaModel,
    /// Target snapshot.
    pub target: SchemaModel,
    /// What the target lacks.
    pub delta: SchemaDelta,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
}

impl SyncPlan {
    /// Returns true if the target already matches the source.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    /// The target schema as it would look after a fully successful run.
    #[must_use]
    pub fn preview(&self) -> SchemaModel {
        simulate(&self.target, &self.operations)
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delta = &self.delta;

        if !delta.create.is_empty() {
            writeln!(f, "Tables missing in target database:")?;
            for table in &delta.create {
                writeln!(f, "- {}", table.name)?;
            }
        }

        if !delta.alter.is_empty() {
            writeln!(f, "Tables with different structures:")?;
            for (table, changes) in &delta.alter {
                writeln!(f, "- {table}")?;
                for change in changes {
                    match change {
                        ColumnDelta::Add { column, .. } => {
                            writeln!(f, "    add {} {}", column.name, column.sql_type)?;
                        }
                        ColumnDelta::Modify { column, current } => writeln!(
                            f,
                            "    modify {} ({} -> {})",
                            column.name, current.sql_type, column.sql_type
                        )?,
                    }
                }
            }
        }

        if !delta.foreign_keys.is_empty() {
            writeln!(f, "Foreign keys missing in target database:")?;
            for (table, keys) in &delta.foreign_keys {
                for fk in keys {
                    writeln!(
                        f,
                        "- {table}.{} -> {}",
                        fk.columns.join(", "),
                        fk.references_table
                    )?;
                }
            }
        }

        if !delta.special.is_empty() {
            writeln!(f, "Special tables to reconcile:")?;
            for table in &delta.special {
                writeln!(f, "- {}", table.name)?;
            }
        }

        if !delta.review.is_empty() {
            writeln!(f, "Needs manual review (not changed automatically):")?;
            for item in &delta.review {
                writeln!(f, "- {item}")?;
            }
        }

        Ok(())
    }
}

/// Introspects both sides, diffs them and orders the operations.
pub async fn plan<S, T>(source: &S, target: &T, options: DifferOptions) -> Result<SyncPlan>
where
    S: SchemaConnection + ?Sized,
    T: SchemaConnection + ?Sized,
{
    let source_schema = Introspector::introspect(source).await?;
    let target_schema = Introspector::introspect(target).await?;

    let delta = SchemaDiffer::with_options(options).diff(&source_schema, &target_schema);
    info!(
        create = delta.create.len(),
        alter = delta.alter.len(),
        columns = delta.column_change_count(),
        special = delta.special.len(),
        review = delta.review.len(),
        "Computed schema delta"
    );

    let operations = DependencyOrderer::order(&delta)?;

    Ok(SyncPlan {
        source: source_schema,
        target: target_schema,
        delta,
        operations,
    })
}

/// Executes a plan against the target.
pub async fn apply<T>(target: &T, plan: &SyncPlan, dry_run: bool) -> Result<SyncReport>
where
    T: SchemaConnection + ?Sized,
{
    SyncExecutor::new(target)
        .dry_run(dry_run)
        .execute(&plan.operations)
        .await
}
