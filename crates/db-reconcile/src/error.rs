//! Error types for the reconciliation engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the comparison a database is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseRole {
    /// The database whose structure is the reference.
    Source,
    /// The database being reconciled.
    Target,
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Fatal errors. Any of these halts the pipeline before the target is touched.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The database is unreachable or rejected the credentials.
    #[error("Cannot connect to {role} database: {source}")]
    Connection {
        /// Which database failed.
        role: DatabaseRole,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A catalog query failed partway through introspection.
    #[error("Failed to read {object} from {role} catalog: {source}")]
    Introspection {
        /// Which database was being read.
        role: DatabaseRole,
        /// What was being read (e.g. "columns of `dosen`").
        object: String,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The foreign-key graph of the tables to create cannot be linearized,
    /// even with deferred constraint attachment.
    #[error(
        "Cannot order creation of tables [{}]: their foreign keys form a cycle of NOT NULL columns without defaults",
        .tables.join(", ")
    )]
    CycleUnresolvable {
        /// Tables on the unresolvable cycle, sorted by name.
        tables: Vec<String>,
    },

    /// Toggling foreign-key enforcement on the target failed.
    #[error("Failed to set FOREIGN_KEY_CHECKS={value}: {source}")]
    ForeignKeyChecks {
        /// The value being set.
        value: u8,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// IO error (log file, prompt).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single rejected operation. Collected into the
/// [`SyncReport`](crate::executor::SyncReport); never aborts a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct SyncOperationError {
    /// Human-readable description of the operation.
    pub operation: String,
    /// Table the operation targeted.
    pub table: String,
    /// Column the operation targeted, if any.
    pub column: Option<String>,
    /// Statement that was rejected, if one was issued.
    pub statement: Option<String>,
    /// Engine error message.
    pub message: String,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;
