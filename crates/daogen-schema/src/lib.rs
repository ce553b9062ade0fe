pub mod condition;
pub mod descriptor;
pub mod error;
pub mod node;
pub mod parse;
pub mod types;
pub mod value;

/// Descriptor file suffix expected by resolvers.
pub const DESCRIPTOR_SUFFIX: &str = ".dao.json";

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        condition::{CompareOp, Condition, ConditionGroup, Conditions, GlueOp, OrderDirection,
            OrderItem},
        error::{ParseError, ParseErrorKind, SchemaIdentity},
        node::*,
        parse::{DefaultTypeMapper, ImportResolver, NoImports, Parser, TypeMapper},
        types::{JsonCodec, UnifiedType},
        value::Value,
    };
    pub use serde::{Deserialize, Serialize};
}
