use super::{DialectInfo, hex};
use daogen_schema::types::UnifiedType;

pub(super) const INFO: DialectInfo = DialectInfo {
    quote_open: "[",
    quote_close: "]",
    alias_keyword: " AS ",
    always_alias_select: false,
    inline_outer_joins: false,
    // COUNT(DISTINCT ...) only accepts a single expression
    count_distinct_subselect: true,
    true_literal: "1",
    false_literal: "0",
    backslash_escapes: false,
};

pub(super) fn unified_type(datatype: &str) -> Option<UnifiedType> {
    let ty = match datatype.trim().to_ascii_lowercase().as_str() {
        "uniqueidentifier" | "sysname" => UnifiedType::Varchar,
        "smallmoney" => UnifiedType::Numeric,
        "datetime2" | "smalldatetime" | "datetimeoffset" => UnifiedType::Datetime,
        _ => return None,
    };

    Some(ty)
}

pub(super) fn quote_binary(bytes: &[u8]) -> String {
    format!("0x{}", hex(bytes))
}

pub(super) fn limit_clause(offset: u64, count: u64) -> String {
    format!(" OFFSET {offset} ROWS FETCH NEXT {count} ROWS ONLY")
}
