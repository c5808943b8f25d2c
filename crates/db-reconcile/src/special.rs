//! Special-cased tables.
//!
//! Two tables carry legacy column names from an older schema and cannot be
//! reconciled by a literal structural copy. Each has an override function
//! that plans its own operations from the source definition and the current
//! target table. The set is closed: the registry below is the whole of it.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::connection::SchemaConnection;
use crate::error::{Result, SyncError};
use crate::introspect::Introspector;
use crate::operations::{ColumnPosition, Operation};
use crate::schema::TableModel;

/// Plans operations for one special table from its source definition, the
/// current target table (if any) and the target's index names.
type OverrideFn = fn(&TableModel, Option<&TableModel>, &BTreeSet<String>) -> Vec<Operation>;

/// Registry of overrides, in execution order.
const OVERRIDES: &[(&str, OverrideFn)] = &[
    ("dosen", dosen),
    ("dosen_wali_prodi", dosen_wali_prodi),
];

/// Legacy target column → source column.
const DOSEN_RENAMES: &[(&str, &str)] = &[("nama_dosen", "nama"), ("nip_dosen", "nip")];

const DOSEN_WALI_PRODI_RENAMES: &[(&str, &str)] =
    &[("dosen_nidn", "nidn"), ("id_prodi", "prodi_id")];

/// `dosen_wali_prodi.nidn` references `dosen.nidn`, which needs a unique index.
const DOSEN_NIDN_INDEX: &str = "idx_dosen_nidn";

/// Entry point for the special-cased tables.
pub struct SpecialCases;

impl SpecialCases {
    /// Returns true if `table` has an override.
    #[must_use]
    pub fn applies(table: &str) -> bool {
        Self::registry_index(table).is_some()
    }

    /// Position of `table` in the registry.
    #[must_use]
    pub fn registry_index(table: &str) -> Option<usize> {
        OVERRIDES.iter().position(|(name, _)| *name == table)
    }

    /// Names of all special tables, in registry order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        OVERRIDES.iter().map(|(name, _)| *name)
    }

    /// Legacy target column → source column renames of `table`.
    #[must_use]
    pub fn renames(table: &str) -> &'static [(&'static str, &'static str)] {
        match table {
            "dosen" => DOSEN_RENAMES,
            "dosen_wali_prodi" => DOSEN_WALI_PRODI_RENAMES,
            _ => &[],
        }
    }

    /// Reads the current state of `table` from the target and plans its
    /// operations.
    pub async fn handle<C>(table: &TableModel, conn: &C) -> Result<Vec<Operation>>
    where
        C: SchemaConnection + ?Sized,
    {
        let current = Introspector::table(conn, &table.name).await?;
        let indexes = match &current {
            Some(_) => conn
                .index_names(&table.name)
                .await
                .map_err(|source| SyncError::Introspection {
                    role: conn.role(),
                    object: format!("indexes of `{}`", table.name),
                    source,
                })?
                .into_iter()
                .collect(),
            None => BTreeSet::new(),
        };

        let operations = Self::plan(table, current.as_ref(), &indexes);
        info!(
            table = %table.name,
            exists = current.is_some(),
            operations = operations.len(),
            "Planned special table"
        );
        Ok(operations)
    }

    /// Plans operations for `table` against an already-read target state.
    /// Tables without an override get nothing.
    #[must_use]
    pub fn plan(
        table: &TableModel,
        current: Option<&TableModel>,
        indexes: &BTreeSet<String>,
    ) -> Vec<Operation> {
        OVERRIDES
            .iter()
            .find(|(name, _)| *name == table.name)
            .map(|(_, handler)| handler(table, current, indexes))
            .unwrap_or_default()
    }
}

/// Faculty members. Legacy `nama_dosen` / `nip_dosen` become `nama` / `nip`,
/// and `nidn` gets the unique index the advisory mapping references.
fn dosen(
    source: &TableModel,
    current: Option<&TableModel>,
    indexes: &BTreeSet<String>,
) -> Vec<Operation> {
    let mut operations = match current {
        None => vec![Operation::create_table_bare(source.clone())],
        Some(current) => reconcile_columns(source, current, DOSEN_RENAMES).operations,
    };

    let indexed = indexes.contains(DOSEN_NIDN_INDEX) || indexes.contains("nidn");
    if source.get_column("nidn").is_some() && !indexed {
        operations.push(Operation::AddUniqueIndex {
            table: source.name.clone(),
            name: DOSEN_NIDN_INDEX.to_string(),
            columns: vec!["nidn".to_string()],
        });
    }

    operations.extend(missing_foreign_keys(source, current));
    operations
}

/// Faculty-advisory mapping. Legacy `dosen_nidn` / `id_prodi` become
/// `nidn` / `prodi_id`. Target foreign keys on those columns are dropped
/// before the columns change and re-attached under the source names.
fn dosen_wali_prodi(
    source: &TableModel,
    current: Option<&TableModel>,
    _indexes: &BTreeSet<String>,
) -> Vec<Operation> {
    let Some(current) = current else {
        let mut operations = vec![Operation::create_table_bare(source.clone())];
        operations.extend(missing_foreign_keys(source, None));
        return operations;
    };

    let columns = reconcile_columns(source, current, DOSEN_WALI_PRODI_RENAMES);

    let mut kept = Vec::new();
    let mut operations = Vec::new();
    for fk in &current.foreign_keys {
        let touched = fk.columns.iter().any(|c| columns.touched.contains(c));
        let matches_source = source.foreign_keys.iter().any(|s| s.is_equivalent(fk));
        let conflicts = source
            .foreign_keys
            .iter()
            .any(|s| !s.is_equivalent(fk) && (s.name == fk.name || s.columns == fk.columns));

        if touched || (conflicts && !matches_source) {
            debug!(table = %source.name, constraint = %fk.name, "Dropping conflicting foreign key");
            operations.push(Operation::drop_foreign_key(source.name.clone(), fk.name.clone()));
        } else {
            kept.push(fk.clone());
        }
    }

    operations.extend(columns.operations);

    let remaining = TableModel {
        foreign_keys: kept,
        ..current.clone()
    };
    operations.extend(missing_foreign_keys(source, Some(&remaining)));
    operations
}

struct ColumnPlan {
    operations: Vec<Operation>,
    /// Target column names that are renamed or redefined.
    touched: BTreeSet<String>,
}

/// Renames legacy columns, then adds and modifies the rest in source order.
fn reconcile_columns(
    source: &TableModel,
    current: &TableModel,
    renames: &[(&str, &str)],
) -> ColumnPlan {
    let mut operations = Vec::new();
    let mut touched = BTreeSet::new();
    let mut renamed = BTreeSet::new();

    for (old, new) in renames {
        let Some(column) = source.get_column(new) else {
            continue;
        };
        if current.get_column(old).is_some() && current.get_column(new).is_none() {
            operations.push(Operation::rename_column(
                source.name.clone(),
                *old,
                column.clone(),
            ));
            touched.insert((*old).to_string());
            renamed.insert((*new).to_string());
        }
    }

    for (i, column) in source.columns.iter().enumerate() {
        if renamed.contains(&column.name) {
            continue;
        }
        match current.get_column(&column.name) {
            Some(existing) if existing.same_definition(column) => {}
            Some(_) => {
                operations.push(Operation::modify_column(source.name.clone(), column.clone()));
                touched.insert(column.name.clone());
            }
            None => {
                let position = match i {
                    0 => ColumnPosition::First,
                    _ => ColumnPosition::After(source.columns[i - 1].name.clone()),
                };
                operations.push(Operation::add_column(
                    source.name.clone(),
                    column.clone(),
                    position,
                ));
            }
        }
    }

    ColumnPlan {
        operations,
        touched,
    }
}

/// Attaches every source foreign key the current table lacks.
fn missing_foreign_keys(source: &TableModel, current: Option<&TableModel>) -> Vec<Operation> {
    source
        .foreign_keys
        .iter()
        .filter(|fk| current.is_none_or(|t| !t.foreign_keys.iter().any(|c| c.is_equivalent(fk))))
        .map(|fk| Operation::attach_foreign_key(source.name.clone(), fk.clone()))
        .collect()
}
