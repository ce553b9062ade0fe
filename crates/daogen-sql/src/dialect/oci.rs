use super::{DialectInfo, hex};
use daogen_schema::types::UnifiedType;

pub(super) const INFO: DialectInfo = DialectInfo {
    quote_open: "\"",
    quote_close: "\"",
    // AS is rejected on table aliases
    alias_keyword: " ",
    always_alias_select: false,
    inline_outer_joins: true,
    count_distinct_subselect: false,
    true_literal: "1",
    false_literal: "0",
    backslash_escapes: false,
};

pub(super) fn unified_type(datatype: &str) -> Option<UnifiedType> {
    let ty = match datatype.trim().to_ascii_lowercase().as_str() {
        "varchar2" | "nvarchar2" | "rowid" => UnifiedType::Varchar,
        "binary_float" | "binary_double" => UnifiedType::Numeric,
        "raw" | "long raw" => UnifiedType::Binary,
        "long" => UnifiedType::Text,
        _ => return None,
    };

    Some(ty)
}

pub(super) fn quote_binary(bytes: &[u8]) -> String {
    format!("hextoraw('{}')", hex(bytes))
}

pub(super) fn limit_clause(offset: u64, count: u64) -> String {
    format!(" OFFSET {offset} ROWS FETCH NEXT {count} ROWS ONLY")
}
