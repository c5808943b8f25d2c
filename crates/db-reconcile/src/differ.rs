//! Schema differ.
//!
//! Compares a source and a target [`SchemaModel`] and computes the
//! [`SchemaDelta`] that brings the target in line with the source. The differ
//! only ever adds or redefines: anything present in the target but not in the
//! source is reported as a [`ReviewItem`] and left alone.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operations::ColumnPosition;
use crate::schema::{ColumnModel, ForeignKeyModel, SchemaModel, TableModel};
use crate::special::SpecialCases;

/// Options for the differ.
#[derive(Debug, Clone)]
pub struct DifferOptions {
    /// Route the special-cased tables to their overrides instead of diffing
    /// them generically.
    pub intercept_special_cases: bool,
}

impl Default for DifferOptions {
    fn default() -> Self {
        Self {
            intercept_special_cases: true,
        }
    }
}

impl DifferOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs the special-cased tables like any other table.
    #[must_use]
    pub fn without_special_cases(mut self) -> Self {
        self.intercept_special_cases = false;
        self
    }
}

/// A column-level change on an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnDelta {
    /// Column present in source only.
    Add {
        /// Source definition.
        column: ColumnModel,
        /// Placement, following the source column order.
        position: ColumnPosition,
    },
    /// Column present on both sides with a different definition.
    Modify {
        /// Source definition.
        column: ColumnModel,
        /// Current target definition.
        current: ColumnModel,
    },
}

impl ColumnDelta {
    /// The column this change targets.
    #[must_use]
    pub fn column(&self) -> &ColumnModel {
        match self {
            Self::Add { column, .. } | Self::Modify { column, .. } => column,
        }
    }
}

/// A difference that is reported but never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewItem {
    /// A table exists only in the target.
    TargetOnlyTable {
        /// Table name.
        table: String,
    },
    /// A column exists only in the target.
    TargetOnlyColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// A column's primary-key membership differs. `MODIFY COLUMN` cannot
    /// change it, so the key has to be rebuilt by hand.
    PrimaryKeyChange {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Membership in the source.
        source: bool,
    },
    /// The target has a different foreign key on the same columns as a
    /// source foreign key.
    ForeignKeyMismatch {
        /// Table name.
        table: String,
        /// Source definition.
        source: ForeignKeyModel,
        /// Conflicting target definition.
        target: ForeignKeyModel,
    },
}

impl fmt::Display for ReviewItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetOnlyTable { table } => {
                write!(f, "table `{table}` exists only in target (not dropped)")
            }
            Self::TargetOnlyColumn { table, column } => {
                write!(f, "column `{table}`.`{column}` exists only in target (not dropped)")
            }
            Self::PrimaryKeyChange {
                table,
                column,
                source,
            } => {
                let state = if *source { "is" } else { "is not" };
                write!(
                    f,
                    "column `{table}`.`{column}` {state} part of the source primary key; \
                     primary keys are not altered"
                )
            }
            Self::ForeignKeyMismatch {
                table,
                source,
                target,
            } => write!(
                f,
                "foreign key `{}` on `{table}` ({}) differs from source `{}`",
                target.name,
                target.columns.join(", "),
                source.name
            ),
        }
    }
}

/// Structural difference between two schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDelta {
    /// Tables to create, in name order.
    pub create: Vec<TableModel>,
    /// Column changes per existing table.
    pub alter: BTreeMap<String, Vec<ColumnDelta>>,
    /// Source foreign keys missing from existing tables.
    pub foreign_keys: BTreeMap<String, Vec<ForeignKeyModel>>,
    /// Special-cased tables that need their override, in registry order.
    pub special: Vec<TableModel>,
    /// Differences left for a human.
    pub review: Vec<ReviewItem>,
}

impl SchemaDelta {
    /// Returns true if nothing would be changed. Review items do not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.alter.is_empty()
            && self.foreign_keys.is_empty()
            && self.special.is_empty()
    }

    /// Number of column changes across all altered tables.
    #[must_use]
    pub fn column_change_count(&self) -> usize {
        self.alter.values().map(Vec::len).sum()
    }
}

/// Computes the delta between a source and a target schema.
#[derive(Debug, Default)]
pub struct SchemaDiffer {
    options: DifferOptions,
}

impl SchemaDiffer {
    /// Creates a new differ with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new differ with custom options.
    #[must_use]
    pub fn with_options(options: DifferOptions) -> Self {
        Self { options }
    }

    /// Compares two schemas and returns what the target lacks.
    #[must_use]
    pub fn diff(&self, source: &SchemaModel, target: &SchemaModel) -> SchemaDelta {
        let mut delta = SchemaDelta::default();

        for table in source.tables() {
            let special = self.options.intercept_special_cases && SpecialCases::applies(&table.name);

            match target.get_table(&table.name) {
                None if special => delta.special.push(table.clone()),
                None => delta.create.push(table.clone()),
                Some(current) if special => {
                    if needs_override(table, current) {
                        delta.special.push(table.clone());
                    }
                    report_target_only_columns(
                        table,
                        current,
                        SpecialCases::renames(&table.name),
                        &mut delta,
                    );
                }
                Some(current) => self.diff_table(table, current, &mut delta),
            }
        }

        for name in target.table_names() {
            if !source.contains(name) {
                delta.review.push(ReviewItem::TargetOnlyTable {
                    table: name.to_string(),
                });
            }
        }

        delta
            .special
            .sort_by_key(|t| SpecialCases::registry_index(&t.name));
        delta
    }

    fn diff_table(&self, source: &TableModel, target: &TableModel, delta: &mut SchemaDelta) {
        let table = &source.name;
        let mut changes = Vec::new();

        for (i, column) in source.columns.iter().enumerate() {
            match target.get_column(&column.name) {
                None => changes.push(ColumnDelta::Add {
                    column: column.clone(),
                    position: match i {
                        0 => ColumnPosition::First,
                        _ => ColumnPosition::After(source.columns[i - 1].name.clone()),
                    },
                }),
                Some(current) => {
                    if !column.same_definition(current) {
                        changes.push(ColumnDelta::Modify {
                            column: column.clone(),
                            current: current.clone(),
                        });
                    }
                    if column.primary_key != current.primary_key {
                        delta.review.push(ReviewItem::PrimaryKeyChange {
                            table: table.clone(),
                            column: column.name.clone(),
                            source: column.primary_key,
                        });
                    }
                }
            }
        }

        report_target_only_columns(source, target, &[], delta);

        let mut missing = Vec::new();
        for fk in &source.foreign_keys {
            if target.foreign_keys.iter().any(|t| t.is_equivalent(fk)) {
                continue;
            }
            match target.foreign_keys.iter().find(|t| t.columns == fk.columns) {
                Some(conflict) => delta.review.push(ReviewItem::ForeignKeyMismatch {
                    table: table.clone(),
                    source: fk.clone(),
                    target: conflict.clone(),
                }),
                None => missing.push(fk.clone()),
            }
        }

        if !changes.is_empty() {
            delta.alter.insert(table.clone(), changes);
        }
        if !missing.is_empty() {
            delta.foreign_keys.insert(table.clone(), missing);
        }
    }
}

/// Flags target columns the source lacks, except legacy columns that
/// `renames` will turn into a missing source column.
fn report_target_only_columns(
    source: &TableModel,
    target: &TableModel,
    renames: &[(&str, &str)],
    delta: &mut SchemaDelta,
) {
    let renamed = |name: &str| {
        renames.iter().any(|(old, new)| {
            *old == name && source.get_column(new).is_some() && target.get_column(new).is_none()
        })
    };

    for column in &target.columns {
        if source.get_column(&column.name).is_none() && !renamed(&column.name) {
            delta.review.push(ReviewItem::TargetOnlyColumn {
                table: source.name.clone(),
                column: column.name.clone(),
            });
        }
    }
}

/// A special table needs its override when the target lacks a source column,
/// defines one differently, or lacks a source foreign key.
fn needs_override(source: &TableModel, target: &TableModel) -> bool {
    let columns_differ = source.columns.iter().any(|column| {
        target
            .get_column(&column.name)
            .is_none_or(|current| !column.same_definition(current))
    });
    let keys_missing = source
        .foreign_keys
        .iter()
        .any(|fk| !target.foreign_keys.iter().any(|t| t.is_equivalent(fk)));

    columns_differ || keys_missing
}
