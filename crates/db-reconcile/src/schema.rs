//! Schema representation types.
//!
//! These types are the normalized, in-memory view of a database catalog. Both
//! sides of a comparison are introspected into a [`SchemaModel`], and the
//! differ only ever compares canonical values: type synonyms, display widths
//! and default spellings that differ between MySQL and MariaDB versions are
//! folded away before a model is built.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static COLUMN_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z][a-z ]*?)\s*(?:\((.*)\))?((?:\s+(?:unsigned|signed|zerofill))*)\s*$")
        .expect("column type pattern is valid")
});

/// Canonical SQL data types.
///
/// Integer display widths are not part of the type: `int(11)` and `int`
/// parse to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// `tinyint(1)`, `bool` and `boolean`.
    Boolean,
    TinyInt { unsigned: bool },
    SmallInt { unsigned: bool },
    MediumInt { unsigned: bool },
    Int { unsigned: bool },
    BigInt { unsigned: bool },
    /// Fixed point with precision and scale.
    Decimal { precision: u32, scale: u32, unsigned: bool },
    /// Single precision, with optional `(M,D)` display precision.
    Float { precision: Option<(u32, u32)>, unsigned: bool },
    Double { precision: Option<(u32, u32)>, unsigned: bool },
    Bit(u32),
    Char(u32),
    Varchar(u32),
    TinyText,
    Text,
    MediumText,
    LongText,
    Binary(u32),
    VarBinary(u32),
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Date,
    /// Date and time with fractional seconds precision.
    DateTime(u8),
    Timestamp(u8),
    Time(u8),
    Year,
    Json,
    Enum(Vec<String>),
    Set(Vec<String>),
    /// Anything the normalizer does not recognise, kept verbatim (lowercased).
    Other(String),
}

impl SqlType {
    /// Parses a catalog `COLUMN_TYPE` string into its canonical type.
    #[must_use]
    pub fn parse(column_type: &str) -> Self {
        let Some(caps) = COLUMN_TYPE.captures(column_type) else {
            return Self::Other(column_type.trim().to_ascii_lowercase());
        };

        let base = caps[1].to_ascii_lowercase();
        let args = caps.get(2).map(|m| m.as_str());
        let flags = caps
            .get(3)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let unsigned = flags.contains("unsigned");
        let numbers = args.map(parse_numbers).unwrap_or_default();
        let first = numbers.first().copied();
        let pair = match numbers.as_slice() {
            [m, d] => Some((*m, *d)),
            _ => None,
        };

        match base.as_str() {
            "bool" | "boolean" => Self::Boolean,
            "tinyint" if first == Some(1) && !unsigned => Self::Boolean,
            "tinyint" | "int1" => Self::TinyInt { unsigned },
            "smallint" | "int2" => Self::SmallInt { unsigned },
            "mediumint" | "int3" | "middleint" => Self::MediumInt { unsigned },
            "int" | "integer" | "int4" => Self::Int { unsigned },
            "bigint" | "int8" => Self::BigInt { unsigned },
            "decimal" | "dec" | "numeric" | "fixed" => Self::Decimal {
                precision: first.unwrap_or(10),
                scale: numbers.get(1).copied().unwrap_or(0),
                unsigned,
            },
            // `float(p)` is a double above 24 bits of precision.
            "float" | "float4" if pair.is_none() && first.is_some_and(|p| p > 24) => {
                Self::Double {
                    precision: None,
                    unsigned,
                }
            }
            "float" | "float4" => Self::Float {
                precision: pair,
                unsigned,
            },
            "double" | "double precision" | "real" | "float8" => Self::Double {
                precision: pair,
                unsigned,
            },
            "bit" => Self::Bit(first.unwrap_or(1)),
            "char" | "character" => Self::Char(first.unwrap_or(1)),
            "varchar" | "character varying" => Self::Varchar(first.unwrap_or(255)),
            "tinytext" => Self::TinyText,
            "text" => Self::Text,
            "mediumtext" | "long varchar" => Self::MediumText,
            "longtext" => Self::LongText,
            "binary" => Self::Binary(first.unwrap_or(1)),
            "varbinary" => Self::VarBinary(first.unwrap_or(255)),
            "tinyblob" => Self::TinyBlob,
            "blob" => Self::Blob,
            "mediumblob" | "long varbinary" => Self::MediumBlob,
            "longblob" => Self::LongBlob,
            "date" => Self::Date,
            "datetime" => Self::DateTime(fsp(first)),
            "timestamp" => Self::Timestamp(fsp(first)),
            "time" => Self::Time(fsp(first)),
            "year" => Self::Year,
            "json" => Self::Json,
            "enum" => Self::Enum(args.map(parse_values).unwrap_or_default()),
            "set" => Self::Set(args.map(parse_values).unwrap_or_default()),
            _ => Self::Other(column_type.trim().to_ascii_lowercase()),
        }
    }

    /// Returns the MySQL spelling of this type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        fn sign(name: &str, unsigned: bool) -> String {
            if unsigned {
                format!("{name} unsigned")
            } else {
                name.to_string()
            }
        }
        fn precise(name: &str, fsp: u8) -> String {
            if fsp == 0 {
                name.to_string()
            } else {
                format!("{name}({fsp})")
            }
        }
        fn approximate(name: &str, precision: Option<(u32, u32)>) -> String {
            match precision {
                Some((m, d)) => format!("{name}({m},{d})"),
                None => name.to_string(),
            }
        }
        fn values(name: &str, values: &[String]) -> String {
            let quoted: Vec<String> = values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect();
            format!("{name}({})", quoted.join(","))
        }

        match self {
            Self::Boolean => "tinyint(1)".to_string(),
            Self::TinyInt { unsigned } => sign("tinyint", *unsigned),
            Self::SmallInt { unsigned } => sign("smallint", *unsigned),
            Self::MediumInt { unsigned } => sign("mediumint", *unsigned),
            Self::Int { unsigned } => sign("int", *unsigned),
            Self::BigInt { unsigned } => sign("bigint", *unsigned),
            Self::Decimal {
                precision,
                scale,
                unsigned,
            } => sign(&format!("decimal({precision},{scale})"), *unsigned),
            Self::Float {
                precision,
                unsigned,
            } => sign(&approximate("float", *precision), *unsigned),
            Self::Double {
                precision,
                unsigned,
            } => sign(&approximate("double", *precision), *unsigned),
            Self::Bit(len) => format!("bit({len})"),
            Self::Char(len) => format!("char({len})"),
            Self::Varchar(len) => format!("varchar({len})"),
            Self::TinyText => "tinytext".to_string(),
            Self::Text => "text".to_string(),
            Self::MediumText => "mediumtext".to_string(),
            Self::LongText => "longtext".to_string(),
            Self::Binary(len) => format!("binary({len})"),
            Self::VarBinary(len) => format!("varbinary({len})"),
            Self::TinyBlob => "tinyblob".to_string(),
            Self::Blob => "blob".to_string(),
            Self::MediumBlob => "mediumblob".to_string(),
            Self::LongBlob => "longblob".to_string(),
            Self::Date => "date".to_string(),
            Self::DateTime(fsp) => precise("datetime", *fsp),
            Self::Timestamp(fsp) => precise("timestamp", *fsp),
            Self::Time(fsp) => precise("time", *fsp),
            Self::Year => "year".to_string(),
            Self::Json => "json".to_string(),
            Self::Enum(v) => values("enum", v),
            Self::Set(v) => values("set", v),
            Self::Other(raw) => raw.clone(),
        }
    }

    /// Returns true for the types whose default can be `CURRENT_TIMESTAMP`.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::DateTime(_) | Self::Timestamp(_))
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn fsp(value: Option<u32>) -> u8 {
    value.and_then(|v| u8::try_from(v).ok()).unwrap_or(0)
}

fn parse_numbers(args: &str) -> Vec<u32> {
    args.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// Splits an `enum('a','b''c')` argument list into its values.
fn parse_values(args: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = args.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quote && chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            '\'' if in_quote => {
                values.push(std::mem::take(&mut current));
                in_quote = false;
            }
            '\'' => in_quote = true,
            _ if in_quote => current.push(c),
            _ => {}
        }
    }

    values
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DefaultValue {
    /// No default (for a nullable column this is the same as `DEFAULT NULL`).
    #[default]
    None,
    /// A literal value, stored unquoted.
    Literal(String),
    /// A SQL expression such as `CURRENT_TIMESTAMP`.
    Expression(String),
}

impl DefaultValue {
    /// Normalizes a catalog `COLUMN_DEFAULT` value.
    ///
    /// MariaDB reports string defaults quoted and `NULL` as the literal text
    /// `NULL`; MySQL reports them bare and flags expression defaults with
    /// `DEFAULT_GENERATED` in `EXTRA`. Timestamp spellings are only folded
    /// for expression defaults and temporal columns, so a `varchar` default
    /// of `'now'` stays a literal.
    #[must_use]
    pub fn from_catalog(raw: Option<&str>, extra: &str, sql_type: &SqlType) -> Self {
        let Some(raw) = raw else {
            return Self::None;
        };
        let trimmed = raw.trim();
        let generated = extra.to_ascii_lowercase().contains("default_generated");

        if trimmed.eq_ignore_ascii_case("null") {
            return Self::None;
        }
        if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
            let inner = &trimmed[1..trimmed.len() - 1];
            return Self::Literal(inner.replace("''", "'"));
        }
        if is_prefixed_literal(trimmed) {
            return Self::Expression(trimmed.to_string());
        }
        if generated || sql_type.is_temporal() {
            if let Some(expr) = normalize_current_timestamp(trimmed) {
                return Self::Expression(expr);
            }
        }
        if generated {
            return Self::Expression(trimmed.to_string());
        }
        Self::Literal(raw.to_string())
    }

    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Literal(value) => Some(format!("'{}'", value.replace('\'', "''"))),
            Self::Expression(expr)
                if expr.starts_with("CURRENT_TIMESTAMP") || is_prefixed_literal(expr) =>
            {
                Some(expr.clone())
            }
            Self::Expression(expr) if expr.starts_with('(') => Some(expr.clone()),
            Self::Expression(expr) => Some(format!("({expr})")),
        }
    }
}

/// Bit and hex literals (`b'0'`, `x'1F'`), which are written unquoted.
fn is_prefixed_literal(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 3
        && matches!(bytes[0], b'b' | b'B' | b'x' | b'X')
        && bytes[1] == b'\''
        && bytes[bytes.len() - 1] == b'\''
}

/// Folds the `CURRENT_TIMESTAMP` spellings (`current_timestamp()`, `now()`,
/// `current_timestamp(3)`, ...) into one form.
pub(crate) fn normalize_current_timestamp(raw: &str) -> Option<String> {
    let lower = raw.trim().to_ascii_lowercase();
    let rest = ["current_timestamp", "localtimestamp", "now"]
        .iter()
        .find_map(|name| lower.strip_prefix(name))?;

    match rest.trim() {
        "" | "()" => Some("CURRENT_TIMESTAMP".to_string()),
        args => {
            let inner = args.strip_prefix('(')?.strip_suffix(')')?.trim();
            match inner.parse::<u8>() {
                Ok(0) => Some("CURRENT_TIMESTAMP".to_string()),
                Ok(precision) => Some(format!("CURRENT_TIMESTAMP({precision})")),
                Err(_) => None,
            }
        }
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted/updated).
    NoAction,
    /// Restrict, the InnoDB default.
    #[default]
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Parses a `REFERENTIAL_CONSTRAINTS` rule. Unknown rules map to the default.
    #[must_use]
    pub fn parse(rule: &str) -> Self {
        match rule.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Self::NoAction,
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            _ => Self::Restrict,
        }
    }

    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnModel {
    /// Column name.
    pub name: String,
    /// Canonical data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default value.
    pub default: DefaultValue,
    /// Whether this column auto-increments.
    pub auto_increment: bool,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// `ON UPDATE` expression, if any.
    pub on_update: Option<String>,
}

impl ColumnModel {
    /// Creates a new nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            default: DefaultValue::None,
            auto_increment: false,
            primary_key: false,
            on_update: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Marks the column as (part of) the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are always NOT NULL
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the `ON UPDATE` expression.
    #[must_use]
    pub fn on_update(mut self, expr: impl Into<String>) -> Self {
        self.on_update = Some(expr.into());
        self
    }

    /// Two columns are equivalent when every attribute matches.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.name == other.name
            && self.primary_key == other.primary_key
            && self.same_definition(other)
    }

    /// Compares everything `MODIFY COLUMN` can change: all attributes except
    /// the name and primary-key membership.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.sql_type == other.sql_type
            && self.nullable == other.nullable
            && self.default == other.default
            && self.auto_increment == other.auto_increment
            && self.on_update == other.on_update
    }
}

/// Schema definition for a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyModel {
    /// Constraint name.
    pub name: String,
    /// Column(s) in the referencing table.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub references_table: String,
    /// Referenced column(s).
    pub references_columns: Vec<String>,
    /// Action on delete.
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    pub on_update: ForeignKeyAction,
}

impl ForeignKeyModel {
    /// Creates a single-column foreign key with a synthesized name
    /// (`fk_<table>_<referenced table>_<column>`).
    #[must_use]
    pub fn new(
        table: &str,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        let column = column.into();
        let references_table = references_table.into();
        Self {
            name: synthesize_name(table, &references_table, &column),
            columns: vec![column],
            references_table,
            references_columns: vec![references_column.into()],
            on_delete: ForeignKeyAction::default(),
            on_update: ForeignKeyAction::default(),
        }
    }

    /// Overrides the constraint name. An empty name keeps the synthesized one.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = name;
        }
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    /// Structural equality; constraint names are ignored because engines
    /// auto-name constraints differently.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.references_table == other.references_table
            && self.references_columns == other.references_columns
            && self.on_delete == other.on_delete
            && self.on_update == other.on_update
    }
}

pub(crate) fn synthesize_name(table: &str, references_table: &str, column: &str) -> String {
    format!("fk_{table}_{references_table}_{column}")
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableModel {
    /// Table name.
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<ColumnModel>,
    /// Foreign key definitions.
    pub foreign_keys: Vec<ForeignKeyModel>,
}

impl TableModel {
    /// Creates a new table model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnModel) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyModel) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key column names in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Returns true if `fk` can be attached after creation: at least one of
    /// its columns accepts NULL or has a default.
    #[must_use]
    pub fn can_defer(&self, fk: &ForeignKeyModel) -> bool {
        fk.columns.iter().any(|name| {
            self.get_column(name)
                .is_none_or(|c| c.nullable || c.default != DefaultValue::None)
        })
    }
}

/// An immutable snapshot of a database schema, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    tables: BTreeMap<String, TableModel>,
}

impl SchemaModel {
    /// Builds a snapshot from a set of tables.
    #[must_use]
    pub fn new(tables: impl IntoIterator<Item = TableModel>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableModel> {
        self.tables.get(name)
    }

    /// Returns true if the table exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterates tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &TableModel> {
        self.tables.values()
    }

    /// Returns table names in order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_display_width_ignored() {
        assert_eq!(SqlType::parse("int(11)"), SqlType::parse("int"));
        assert_eq!(SqlType::parse("INTEGER"), SqlType::Int { unsigned: false });
        assert_eq!(
            SqlType::parse("bigint(20) unsigned"),
            SqlType::BigInt { unsigned: true }
        );
        assert_eq!(
            SqlType::parse("int(10) unsigned zerofill"),
            SqlType::Int { unsigned: true }
        );
    }

    #[test]
    fn test_boolean_synonyms() {
        assert_eq!(SqlType::parse("tinyint(1)"), SqlType::Boolean);
        assert_eq!(SqlType::parse("bool"), SqlType::Boolean);
        assert_eq!(SqlType::parse("boolean"), SqlType::Boolean);
        assert_eq!(SqlType::parse("tinyint(4)"), SqlType::TinyInt { unsigned: false });
    }

    #[test]
    fn test_decimal_and_float_synonyms() {
        let expected = SqlType::Decimal {
            precision: 10,
            scale: 2,
            unsigned: false,
        };
        assert_eq!(SqlType::parse("decimal(10,2)"), expected);
        assert_eq!(SqlType::parse("numeric(10, 2)"), expected);
        assert_eq!(SqlType::parse("decimal"), SqlType::parse("decimal(10,0)"));
        assert_eq!(SqlType::parse("double precision"), SqlType::parse("real"));
        assert_eq!(SqlType::parse("float(30)"), SqlType::parse("double"));
    }

    #[test]
    fn test_float_precision_is_kept() {
        let parsed = SqlType::parse("double(10,2) unsigned");
        assert_eq!(
            parsed,
            SqlType::Double {
                precision: Some((10, 2)),
                unsigned: true,
            }
        );
        assert_eq!(parsed.to_sql(), "double(10,2) unsigned");
        assert_ne!(SqlType::parse("double(10,2)"), SqlType::parse("double"));
        assert_eq!(SqlType::parse("float(7,3)").to_sql(), "float(7,3)");
        assert_eq!(SqlType::parse("float").to_sql(), "float");
    }

    #[test]
    fn test_string_and_temporal_types() {
        assert_eq!(SqlType::parse("varchar(50)"), SqlType::Varchar(50));
        assert_eq!(SqlType::parse("character varying(50)"), SqlType::Varchar(50));
        assert_eq!(SqlType::parse("timestamp"), SqlType::parse("timestamp(0)"));
        assert_eq!(SqlType::parse("datetime(3)"), SqlType::DateTime(3));
        assert_eq!(SqlType::parse("geometry"), SqlType::Other("geometry".into()));
    }

    #[test]
    fn test_enum_values_keep_case_and_quotes() {
        let parsed = SqlType::parse("enum('Ganjil','Genap','it''s')");
        assert_eq!(
            parsed,
            SqlType::Enum(vec!["Ganjil".into(), "Genap".into(), "it's".into()])
        );
        assert_eq!(parsed.to_sql(), "enum('Ganjil','Genap','it''s')");
    }

    #[test]
    fn test_sql_type_rendering() {
        assert_eq!(SqlType::Int { unsigned: true }.to_sql(), "int unsigned");
        assert_eq!(SqlType::Boolean.to_sql(), "tinyint(1)");
        assert_eq!(SqlType::Timestamp(0).to_sql(), "timestamp");
        assert_eq!(SqlType::DateTime(6).to_sql(), "datetime(6)");
    }

    #[test]
    fn test_default_normalization() {
        let stamp = SqlType::Timestamp(0);
        let text = SqlType::Varchar(10);

        assert_eq!(DefaultValue::from_catalog(None, "", &text), DefaultValue::None);
        assert_eq!(
            DefaultValue::from_catalog(Some("NULL"), "", &text),
            DefaultValue::None
        );
        assert_eq!(
            DefaultValue::from_catalog(Some("current_timestamp()"), "", &stamp),
            DefaultValue::from_catalog(Some("CURRENT_TIMESTAMP"), "DEFAULT_GENERATED", &stamp),
        );
        assert_eq!(
            DefaultValue::from_catalog(Some("'aktif'"), "", &text),
            DefaultValue::from_catalog(Some("aktif"), "", &text),
        );
        assert_eq!(
            DefaultValue::from_catalog(Some("current_timestamp(3)"), "", &SqlType::DateTime(3)),
            DefaultValue::Expression("CURRENT_TIMESTAMP(3)".into())
        );
        assert_eq!(
            DefaultValue::from_catalog(Some("uuid()"), "DEFAULT_GENERATED", &SqlType::Char(36)),
            DefaultValue::Expression("uuid()".into())
        );
    }

    #[test]
    fn test_timestamp_words_in_text_defaults_stay_literal() {
        let text = SqlType::Varchar(10);
        assert_eq!(
            DefaultValue::from_catalog(Some("now"), "", &text),
            DefaultValue::Literal("now".into())
        );
        assert_eq!(
            DefaultValue::from_catalog(Some("current_timestamp"), "", &text),
            DefaultValue::Literal("current_timestamp".into())
        );
        assert_eq!(
            DefaultValue::from_catalog(Some("'now()'"), "", &SqlType::DateTime(0)),
            DefaultValue::Literal("now()".into())
        );
        assert_eq!(
            DefaultValue::Literal("now".into()).to_sql(),
            Some("'now'".to_string())
        );
    }

    #[test]
    fn test_bit_default_is_unquoted() {
        let default = DefaultValue::from_catalog(Some("b'0'"), "", &SqlType::Bit(1));
        assert_eq!(default, DefaultValue::Expression("b'0'".into()));
        assert_eq!(default.to_sql(), Some("b'0'".to_string()));
        assert_eq!(
            DefaultValue::from_catalog(Some("x'1F'"), "", &SqlType::Binary(1)).to_sql(),
            Some("x'1F'".to_string())
        );
    }

    #[test]
    fn test_default_value_to_sql() {
        assert_eq!(DefaultValue::None.to_sql(), None);
        assert_eq!(
            DefaultValue::Literal("it's".into()).to_sql(),
            Some("'it''s'".to_string())
        );
        assert_eq!(
            DefaultValue::Expression("CURRENT_TIMESTAMP".into()).to_sql(),
            Some("CURRENT_TIMESTAMP".to_string())
        );
        assert_eq!(
            DefaultValue::Expression("uuid()".into()).to_sql(),
            Some("(uuid())".to_string())
        );
    }

    #[test]
    fn test_column_equivalence() {
        let a = ColumnModel::new("name", SqlType::Varchar(50)).not_null();
        let b = ColumnModel::new("name", SqlType::parse("varchar(50)")).not_null();
        assert!(a.is_equivalent(&b));

        let c = ColumnModel::new("name", SqlType::Varchar(100)).not_null();
        assert!(!a.is_equivalent(&c));

        let pk = a.clone().primary_key();
        assert!(!a.is_equivalent(&pk));
        assert!(a.same_definition(&pk));
    }

    #[test]
    fn test_foreign_key_name_synthesized() {
        let fk = ForeignKeyModel::new("mahasiswa", "prodi_id", "prodi", "id_prodi");
        assert_eq!(fk.name, "fk_mahasiswa_prodi_prodi_id");
        assert_eq!(fk.clone().named("").name, fk.name);

        let renamed = fk.clone().named("mahasiswa_ibfk_1");
        assert!(renamed.is_equivalent(&fk));
        assert!(!fk.clone().on_delete(ForeignKeyAction::Cascade).is_equivalent(&fk));
    }

    #[test]
    fn test_can_defer() {
        let table = TableModel::new("a")
            .column(ColumnModel::new("b_id", SqlType::Int { unsigned: false }).not_null())
            .column(ColumnModel::new("c_id", SqlType::Int { unsigned: false }));
        assert!(!table.can_defer(&ForeignKeyModel::new("a", "b_id", "b", "id")));
        assert!(table.can_defer(&ForeignKeyModel::new("a", "c_id", "c", "id")));
    }

    #[test]
    fn test_schema_model_is_ordered() {
        let schema = SchemaModel::new(vec![TableModel::new("b"), TableModel::new("a")]);
        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(schema.contains("a"));
        assert_eq!(schema.len(), 2);
    }
}
