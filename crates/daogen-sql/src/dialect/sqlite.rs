use super::{DialectInfo, hex};
use daogen_schema::types::UnifiedType;

pub(super) const INFO: DialectInfo = DialectInfo {
    quote_open: "\"",
    quote_close: "\"",
    alias_keyword: " AS ",
    // column names of joined selects are unpredictable otherwise
    always_alias_select: true,
    inline_outer_joins: false,
    count_distinct_subselect: true,
    true_literal: "1",
    false_literal: "0",
    backslash_escapes: false,
};

pub(super) fn unified_type(datatype: &str) -> Option<UnifiedType> {
    match datatype.trim().to_ascii_lowercase().as_str() {
        // affinity catch-alls
        "unsigned big int" | "int8" | "int2" => Some(UnifiedType::Integer),
        _ => None,
    }
}

pub(super) fn quote_binary(bytes: &[u8]) -> String {
    format!("X'{}'", hex(bytes))
}

pub(super) fn limit_clause(offset: u64, count: u64) -> String {
    format!(" LIMIT {count} OFFSET {offset}")
}
