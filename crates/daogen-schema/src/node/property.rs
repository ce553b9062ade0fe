use crate::types::{JsonCodec, UnifiedType};
use serde::{Deserialize, Serialize};

///
/// Property
///
/// A resolved record property. Carries everything the generator needs to
/// emit the column into selects, inserts and updates, plus the validation
/// facts (required, lengths, regexp) replayed into the compiled artifact.
///

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Property {
    /// Logical property name, unique across the record.
    pub name: String,

    /// Column name in the owning table. Defaults to `name`.
    pub field_name: String,

    /// Alias of the owning table.
    pub table: String,

    /// Raw datatype as declared in the descriptor.
    pub datatype: String,

    /// Portable type category derived from `datatype`.
    pub unified_type: UnifiedType,

    pub is_pk: bool,
    pub is_fk: bool,
    pub of_primary_table: bool,

    pub required: bool,
    /// Required when the property appears in method conditions. Primary
    /// keys with autoincrement are not required on insert but still are
    /// in conditions.
    pub required_in_conditions: bool,

    pub auto_increment: bool,
    pub sequence_name: Option<String>,

    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub regexp: Option<String>,

    pub default_value: Option<String>,

    /// SQL expression pattern with `%s` standing for the column. `%s`
    /// alone means the bare column.
    pub select_pattern: String,
    pub insert_pattern: String,
    pub update_pattern: String,

    pub json_encoder: Option<JsonCodec>,
    pub json_decoder: Option<JsonCodec>,

    pub comment: Option<String>,
}

impl Property {
    /// Whether the select pattern is the identity pattern. Non-identity
    /// patterns force an alias in dialects that would otherwise omit it.
    #[must_use]
    pub fn has_plain_select(&self) -> bool {
        self.select_pattern == "%s"
    }

    /// An empty select pattern keeps the property out of select clauses
    /// entirely.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.select_pattern.is_empty()
    }

    /// Expand a `%s` pattern around an already quoted column expression.
    #[must_use]
    pub fn apply_pattern(pattern: &str, column: &str) -> String {
        pattern.replace("%s", column)
    }

    /// Updatable means: owned by the primary table and not part of the
    /// primary key.
    #[must_use]
    pub const fn is_updatable(&self) -> bool {
        self.of_primary_table && !self.is_pk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_expansion() {
        assert_eq!(Property::apply_pattern("%s", "\"t\".\"price\""), "\"t\".\"price\"");
        assert_eq!(
            Property::apply_pattern("ROUND(%s, 2)", "\"t\".\"price\""),
            "ROUND(\"t\".\"price\", 2)"
        );
    }

    #[test]
    fn pk_of_primary_table_is_not_updatable() {
        let prop = Property {
            is_pk: true,
            of_primary_table: true,
            ..Default::default()
        };
        assert!(!prop.is_updatable());
    }
}
