use super::{DialectInfo, hex};
use daogen_schema::types::UnifiedType;

pub(super) const INFO: DialectInfo = DialectInfo {
    quote_open: "\"",
    quote_close: "\"",
    alias_keyword: " AS ",
    always_alias_select: false,
    inline_outer_joins: false,
    count_distinct_subselect: false,
    true_literal: "TRUE",
    false_literal: "FALSE",
    backslash_escapes: false,
};

pub(super) fn unified_type(datatype: &str) -> Option<UnifiedType> {
    let ty = match datatype.trim().to_ascii_lowercase().as_str() {
        "int2" | "int4" | "int8" | "oid" => UnifiedType::Integer,
        "float4" | "float8" => UnifiedType::Numeric,
        "uuid" | "cidr" | "inet" | "macaddr" => UnifiedType::Varchar,
        "timestamptz" | "timetz" => UnifiedType::Datetime,
        _ => return None,
    };

    Some(ty)
}

pub(super) fn quote_binary(bytes: &[u8]) -> String {
    format!("decode('{}', 'hex')", hex(bytes))
}

pub(super) fn limit_clause(offset: u64, count: u64) -> String {
    format!(" LIMIT {count} OFFSET {offset}")
}
