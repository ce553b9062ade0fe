use serde::{Deserialize, Serialize};

///
/// TableUsage
///
/// How a table participates in the generated select. The primary table
/// owns the insert/update/delete surface; foreign tables exist only to
/// contribute joined columns to selects.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TableUsage {
    #[default]
    Primary,
    InnerJoined,
    OuterJoined,
}

impl TableUsage {
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Primary)
    }

    #[must_use]
    pub const fn is_outer(self) -> bool {
        matches!(self, Self::OuterJoined)
    }
}

///
/// Table
///
/// A resolved table declaration. `name` is the descriptor alias used in
/// generated SQL; `real_name` is the actual table name in the database.
/// For joined tables, `foreign_keys` pairs positionally with the primary
/// table's `primary_key`.
///

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub real_name: String,
    pub schema: Option<String>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub usage: TableUsage,

    /// Property names (not field names) attached to this table, in
    /// declaration order.
    pub fields: Vec<String>,
}

impl Table {
    /// Real name qualified by the schema when one is declared.
    #[must_use]
    pub fn qualified_real_name(&self) -> String {
        match &self.schema {
            Some(schema) if !schema.is_empty() => format!("{schema}.{}", self.real_name),
            _ => self.real_name.clone(),
        }
    }

    /// Field names are matched case-insensitively, as databases commonly
    /// fold identifier case.
    #[must_use]
    pub fn is_pk_field(&self, field_name: &str) -> bool {
        self.primary_key
            .iter()
            .any(|pk| pk.eq_ignore_ascii_case(field_name))
    }
}
