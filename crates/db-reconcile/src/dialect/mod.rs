//! SQL generation for the target engine.
//!
//! Only the MySQL family is supported; MariaDB accepts the same DDL.

mod mysql;

pub use mysql::MySqlDialect;

/// Quotes an identifier with backticks, doubling embedded backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes and joins a list of identifiers.
#[must_use]
pub fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}
