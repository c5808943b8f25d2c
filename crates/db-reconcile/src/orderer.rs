//! Dependency orderer.
//!
//! Turns a [`SchemaDelta`] into an executable sequence of [`Operation`]s:
//!
//! 1. table creations, referenced tables first, each carrying its foreign
//!    keys inline;
//! 2. column additions and modifications, per table in name order;
//! 3. special-table overrides, in registry order;
//! 4. deferred foreign key attachments.
//!
//! Foreign keys between tables being created form a graph. Inside a cycle,
//! every edge whose referencing columns accept NULL or have a default is
//! removed from the graph and attached in phase 4 instead. If a cycle of
//! non-deferrable edges remains, ordering fails and nothing is executed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::{debug, info};

use crate::differ::{ColumnDelta, SchemaDelta};
use crate::error::{Result, SyncError};
use crate::operations::Operation;
use crate::schema::{ForeignKeyModel, TableModel};

/// Identifies a foreign key by table and position in `foreign_keys`.
type ForeignKeyRef = (usize, usize);

/// Orders delta operations so that constraints never precede what they
/// reference.
pub struct DependencyOrderer;

impl DependencyOrderer {
    /// Orders the operations of a delta.
    pub fn order(delta: &SchemaDelta) -> Result<Vec<Operation>> {
        let tables = &delta.create;
        let special: HashSet<&str> = delta.special.iter().map(|t| t.name.as_str()).collect();

        // Nodes are added in name order so ties in the sort stay by name.
        let mut by_name: Vec<usize> = (0..tables.len()).collect();
        by_name.sort_by(|a, b| tables[*a].name.cmp(&tables[*b].name));

        let mut graph: DiGraph<usize, ForeignKeyRef> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for &i in &by_name {
            nodes.insert(tables[i].name.as_str(), graph.add_node(i));
        }

        // Foreign keys attached after phase 3 (special or late columns).
        let mut late: BTreeSet<ForeignKeyRef> = BTreeSet::new();

        for (t, table) in tables.iter().enumerate() {
            for (f, fk) in table.foreign_keys.iter().enumerate() {
                if fk.references_table == table.name {
                    continue;
                }
                if special.contains(fk.references_table.as_str())
                    || references_added_column(delta, fk)
                {
                    late.insert((t, f));
                    continue;
                }
                if let Some(&referenced) = nodes.get(fk.references_table.as_str()) {
                    let referencing = nodes[table.name.as_str()];
                    graph.add_edge(referenced, referencing, (t, f));
                }
            }
        }

        let deferred = break_cycles(&mut graph, tables)?;
        let creation_order = sort_by_dependency(&graph);

        let mut operations = Vec::new();

        // Phase 1: creations.
        for node in &creation_order {
            let t = graph[*node];
            let table = &tables[t];
            let inline = table
                .foreign_keys
                .iter()
                .enumerate()
                .filter(|(f, _)| !deferred.contains(&(t, *f)) && !late.contains(&(t, *f)))
                .map(|(_, fk)| fk.clone())
                .collect();
            operations.push(Operation::CreateTable {
                table: table.clone(),
                inline_foreign_keys: inline,
            });
        }

        // Phase 2: column changes.
        for (table, changes) in &delta.alter {
            for change in changes {
                operations.push(match change {
                    ColumnDelta::Add { column, position } => {
                        Operation::add_column(table.clone(), column.clone(), position.clone())
                    }
                    ColumnDelta::Modify { column, .. } => {
                        Operation::modify_column(table.clone(), column.clone())
                    }
                });
            }
        }

        // Phase 3: special tables.
        for table in &delta.special {
            operations.push(Operation::Special {
                table: table.clone(),
            });
        }

        // Phase 4: deferred attachments.
        let attach = |(t, f): &ForeignKeyRef| {
            let table = &tables[*t];
            Operation::attach_foreign_key(table.name.clone(), table.foreign_keys[*f].clone())
        };
        for node in &creation_order {
            let t = graph[*node];
            operations.extend(deferred.iter().filter(|r| r.0 == t).map(attach));
        }
        for node in &creation_order {
            let t = graph[*node];
            operations.extend(late.iter().filter(|r| r.0 == t).map(attach));
        }
        for (table, keys) in &delta.foreign_keys {
            for fk in keys {
                operations.push(Operation::attach_foreign_key(table.clone(), fk.clone()));
            }
        }

        info!(
            operations = operations.len(),
            deferred = deferred.len() + late.len(),
            "Ordered operations"
        );
        Ok(operations)
    }
}

/// True if `fk` references a column that phase 2 adds to an existing table.
fn references_added_column(delta: &SchemaDelta, fk: &ForeignKeyModel) -> bool {
    delta.alter.get(&fk.references_table).is_some_and(|changes| {
        changes.iter().any(|change| {
            matches!(change, ColumnDelta::Add { column, .. }
                if fk.references_columns.contains(&column.name))
        })
    })
}

/// Removes deferrable edges from every cycle and returns them.
fn break_cycles(
    graph: &mut DiGraph<usize, ForeignKeyRef>,
    tables: &[TableModel],
) -> Result<BTreeSet<ForeignKeyRef>> {
    let mut deferred = BTreeSet::new();

    for component in tarjan_scc(&*graph) {
        if component.len() < 2 {
            continue;
        }
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let mut removable: Vec<EdgeIndex> = Vec::new();

        for edge in graph.edge_references() {
            if !members.contains(&edge.source()) || !members.contains(&edge.target()) {
                continue;
            }
            let (t, f) = *edge.weight();
            let table = &tables[t];
            if table.can_defer(&table.foreign_keys[f]) {
                removable.push(edge.id());
                deferred.insert((t, f));
            }
        }

        // Removal swaps the last edge into the hole, so remove from the back.
        removable.sort();
        for edge in removable.into_iter().rev() {
            graph.remove_edge(edge);
        }
    }

    let mut stuck: Vec<String> = tarjan_scc(&*graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .flatten()
        .map(|node| tables[graph[node]].name.clone())
        .collect();

    if !stuck.is_empty() {
        stuck.sort();
        return Err(SyncError::CycleUnresolvable { tables: stuck });
    }

    if !deferred.is_empty() {
        debug!(count = deferred.len(), "Deferred foreign keys to break cycles");
    }
    Ok(deferred)
}

/// Topological sort of an acyclic graph, always taking the ready table with
/// the smallest name next.
fn sort_by_dependency(graph: &DiGraph<usize, ForeignKeyRef>) -> Vec<NodeIndex> {
    let mut pending: BTreeMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|node| {
            let incoming = graph
                .edges_directed(node, Direction::Incoming)
                .filter(|e| e.source() != node)
                .count();
            (node, incoming)
        })
        .collect();

    // Node indices follow name order.
    let mut ready: BTreeSet<NodeIndex> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(node) = ready.pop_first() {
        pending.remove(&node);
        order.push(node);
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            if let Some(count) = pending.get_mut(&edge.target()) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(edge.target());
                }
            }
        }
    }

    order
}
