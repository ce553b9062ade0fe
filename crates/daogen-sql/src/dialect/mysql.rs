use super::{DialectInfo, hex};
use daogen_schema::types::UnifiedType;

pub(super) const INFO: DialectInfo = DialectInfo {
    quote_open: "`",
    quote_close: "`",
    alias_keyword: " AS ",
    always_alias_select: false,
    inline_outer_joins: false,
    count_distinct_subselect: false,
    true_literal: "1",
    false_literal: "0",
    backslash_escapes: true,
};

pub(super) fn unified_type(datatype: &str) -> Option<UnifiedType> {
    let ty = match datatype.trim().to_ascii_lowercase().as_str() {
        "enum" | "set" => UnifiedType::Varchar,
        "year" => UnifiedType::Integer,
        "unsigned" | "int unsigned" | "bigint unsigned" => UnifiedType::Integer,
        _ => return None,
    };

    Some(ty)
}

pub(super) fn quote_binary(bytes: &[u8]) -> String {
    format!("X'{}'", hex(bytes))
}

pub(super) fn limit_clause(offset: u64, count: u64) -> String {
    format!(" LIMIT {offset}, {count}")
}
