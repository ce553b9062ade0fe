mod mysql;
mod oci;
mod pgsql;
mod sqlite;
mod sqlsrv;

use crate::error::RenderError;
use daogen_schema::{
    parse::{DefaultTypeMapper, TypeMapper},
    types::UnifiedType,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Dialect
///
/// The closed set of supported SQL dialects. Every dialect-specific
/// decision is a method here, dispatching to per-dialect tables and
/// functions; adding a dialect means adding a module and a variant, not
/// subclassing a generator.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Dialect {
    Mysql,
    Pgsql,
    Sqlite,
    Oci,
    Sqlsrv,
}

///
/// DialectInfo
///
/// Static per-dialect rendering facts.
///

pub(crate) struct DialectInfo {
    pub quote_open: &'static str,
    pub quote_close: &'static str,

    /// Keyword between a select expression and its alias.
    pub alias_keyword: &'static str,

    /// Alias every select field even when the alias equals the column.
    pub always_alias_select: bool,

    /// No JOIN clauses: joined tables go in the FROM list and outer
    /// joins are expressed with `(+)` markers in the WHERE clause.
    pub inline_outer_joins: bool,

    /// COUNT(DISTINCT a, b) is not accepted; wrap in a subselect.
    pub count_distinct_subselect: bool,

    pub true_literal: &'static str,
    pub false_literal: &'static str,

    /// Backslash starts an escape sequence inside string literals.
    pub backslash_escapes: bool,
}

impl Dialect {
    pub const ALL: [Self; 5] = [Self::Mysql, Self::Pgsql, Self::Sqlite, Self::Oci, Self::Sqlsrv];

    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mysqli" => Some(Self::Mysql),
            "pgsql" | "postgres" | "postgresql" => Some(Self::Pgsql),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "oci" | "oracle" => Some(Self::Oci),
            "sqlsrv" | "mssql" => Some(Self::Sqlsrv),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Pgsql => "pgsql",
            Self::Sqlite => "sqlite",
            Self::Oci => "oci",
            Self::Sqlsrv => "sqlsrv",
        }
    }

    pub(crate) const fn info(self) -> &'static DialectInfo {
        match self {
            Self::Mysql => &mysql::INFO,
            Self::Pgsql => &pgsql::INFO,
            Self::Sqlite => &sqlite::INFO,
            Self::Oci => &oci::INFO,
            Self::Sqlsrv => &sqlsrv::INFO,
        }
    }

    /// Quote an identifier, doubling any embedded closing quote.
    #[must_use]
    pub fn quote(self, ident: &str) -> String {
        let info = self.info();
        let escaped = ident.replace(info.quote_close, &info.quote_close.repeat(2));

        format!("{}{escaped}{}", info.quote_open, info.quote_close)
    }

    /// Quote a table reference, keeping an explicit schema prefix as two
    /// quoted parts.
    #[must_use]
    pub fn quote_table(self, name: &str) -> String {
        match name.split_once('.') {
            Some((schema, table)) => format!("{}.{}", self.quote(schema), self.quote(table)),
            None => self.quote(name),
        }
    }

    /// Escape a text literal into a quoted SQL string.
    #[must_use]
    pub fn escape_text(self, text: &str) -> String {
        let mut escaped = text.replace('\'', "''");
        if self.info().backslash_escapes {
            escaped = escaped.replace('\\', "\\\\");
        }

        format!("'{escaped}'")
    }

    #[must_use]
    pub fn quote_binary(self, bytes: &[u8]) -> String {
        match self {
            Self::Mysql => mysql::quote_binary(bytes),
            Self::Pgsql => pgsql::quote_binary(bytes),
            Self::Sqlite => sqlite::quote_binary(bytes),
            Self::Oci => oci::quote_binary(bytes),
            Self::Sqlsrv => sqlsrv::quote_binary(bytes),
        }
    }

    /// Render an offset/count pair as this dialect's row limiting clause,
    /// including the leading space.
    #[must_use]
    pub fn limit_clause(self, offset: u64, count: u64) -> String {
        match self {
            Self::Mysql => mysql::limit_clause(offset, count),
            Self::Pgsql => pgsql::limit_clause(offset, count),
            Self::Sqlite => sqlite::limit_clause(offset, count),
            Self::Oci => oci::limit_clause(offset, count),
            Self::Sqlsrv => sqlsrv::limit_clause(offset, count),
        }
    }

    /// Default sequence name for an auto incremented column, where the
    /// dialect has a naming convention.
    #[must_use]
    pub fn default_sequence(self, table_real_name: &str, field_name: &str) -> Option<String> {
        match self {
            Self::Pgsql => Some(format!("{table_real_name}_{field_name}_seq")),
            _ => None,
        }
    }

    /// Coerce a bound value into an inline SQL literal according to the
    /// column's portable type. LIKE operands are always escaped as text,
    /// whatever the column type.
    pub fn escape_value(
        self,
        unified: UnifiedType,
        value: &Value,
        for_like: bool,
        parameter: &str,
    ) -> Result<String, RenderError> {
        if value.is_null() {
            return Ok("NULL".to_string());
        }
        if for_like {
            return Ok(self.escape_text(&value.to_string()));
        }

        let literal = match unified {
            UnifiedType::Integer => value
                .as_int()
                .ok_or_else(|| bad_type(parameter, "an integer"))?
                .to_string(),
            UnifiedType::Numeric => value
                .as_float()
                .ok_or_else(|| bad_type(parameter, "a number"))?
                .to_string(),
            UnifiedType::Boolean => {
                let info = self.info();
                if value.as_bool().ok_or_else(|| bad_type(parameter, "a boolean"))? {
                    info.true_literal.to_string()
                } else {
                    info.false_literal.to_string()
                }
            }
            UnifiedType::Binary => match value {
                Value::Bytes(bytes) => self.quote_binary(bytes),
                other => self.quote_binary(other.to_string().as_bytes()),
            },
            UnifiedType::Json => match value {
                Value::Json(json) => self.escape_text(&json.to_string()),
                Value::Text(text) => self.escape_text(text),
                other => self.escape_text(
                    &serde_json::to_string(other)
                        .map_err(|_| bad_type(parameter, "a json value"))?,
                ),
            },
            UnifiedType::Varchar | UnifiedType::Text | UnifiedType::Datetime => {
                self.escape_text(&value.to_string())
            }
        };

        Ok(literal)
    }
}

impl TypeMapper for Dialect {
    fn unified_type(&self, datatype: &str) -> Option<UnifiedType> {
        let extra = match self {
            Self::Mysql => mysql::unified_type(datatype),
            Self::Pgsql => pgsql::unified_type(datatype),
            Self::Sqlite => sqlite::unified_type(datatype),
            Self::Oci => oci::unified_type(datatype),
            Self::Sqlsrv => sqlsrv::unified_type(datatype),
        };

        extra.or_else(|| DefaultTypeMapper.unified_type(datatype))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn bad_type(parameter: &str, expected: &str) -> RenderError {
    RenderError::BadParameterType {
        parameter: parameter.to_string(),
        expected: expected.to_string(),
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_quoting_per_dialect() {
        assert_eq!(Dialect::Mysql.quote("price"), "`price`");
        assert_eq!(Dialect::Pgsql.quote("price"), "\"price\"");
        assert_eq!(Dialect::Sqlsrv.quote("price"), "[price]");
        assert_eq!(Dialect::Sqlsrv.quote("we]ird"), "[we]]ird]");
    }

    #[test]
    fn schema_qualified_table_quoting() {
        assert_eq!(Dialect::Pgsql.quote_table("shop.products"), "\"shop\".\"products\"");
    }

    #[test]
    fn text_escaping() {
        assert_eq!(Dialect::Pgsql.escape_text("it's"), "'it''s'");
        assert_eq!(Dialect::Mysql.escape_text(r"a\b"), r"'a\\b'");
        assert_eq!(Dialect::Sqlite.escape_text(r"a\b"), r"'a\b'");
    }

    #[test]
    fn null_always_renders_null() {
        for dialect in Dialect::ALL {
            let rendered = dialect
                .escape_value(UnifiedType::Integer, &Value::Null, false, "p")
                .unwrap();
            assert_eq!(rendered, "NULL");
        }
    }

    #[test]
    fn boolean_literals_differ() {
        let t = Value::Bool(true);
        assert_eq!(
            Dialect::Mysql
                .escape_value(UnifiedType::Boolean, &t, false, "p")
                .unwrap(),
            "1"
        );
        assert_eq!(
            Dialect::Pgsql
                .escape_value(UnifiedType::Boolean, &t, false, "p")
                .unwrap(),
            "TRUE"
        );
    }

    #[test]
    fn like_operands_are_text_even_on_numeric_columns() {
        let rendered = Dialect::Mysql
            .escape_value(UnifiedType::Integer, &Value::Text("12%".into()), true, "p")
            .unwrap();
        assert_eq!(rendered, "'12%'");
    }

    proptest::proptest! {
        #[test]
        fn escaped_text_never_leaks_a_quote(s in ".*") {
            for dialect in Dialect::ALL {
                let quoted = dialect.escape_text(&s);
                proptest::prop_assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
                let interior = &quoted[1..quoted.len() - 1];
                proptest::prop_assert!(!interior.replace("''", "").contains('\''));
            }
        }
    }

    #[test]
    fn non_numeric_integer_binding_fails() {
        let err = Dialect::Mysql
            .escape_value(UnifiedType::Integer, &Value::Text("abc".into()), false, "p")
            .unwrap_err();
        assert!(matches!(err, RenderError::BadParameterType { .. }));
    }
}
