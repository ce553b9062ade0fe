use crate::{condition::ConditionError, types::JsonCodecError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// SchemaIdentity
///
/// Logical descriptor name plus source path, appended to every parse
/// failure so errors can be traced back to the offending descriptor even
/// when parsing happens deep inside an import chain.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SchemaIdentity {
    pub name: String,
    pub path: String,
}

impl SchemaIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for SchemaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema: {}, file: {}", self.name, self.path)
    }
}

///
/// ParseError
///
/// A parse failure is fatal to the whole descriptor: no partial model is
/// ever returned. Every variant carries a stable numeric code for
/// programmatic matching; the code space is kept stable across releases.
///

#[derive(Debug, ThisError)]
#[error("({code}) {kind} ({identity})", code = .kind.code())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub identity: SchemaIdentity,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, identity: SchemaIdentity) -> Self {
        Self { kind, identity }
    }

    #[must_use]
    pub const fn code(&self) -> u16 {
        self.kind.code()
    }
}

///
/// ParseErrorKind
///

#[derive(Debug, ThisError)]
pub enum ParseErrorKind {
    #[error("cannot read descriptor: {reason}")]
    UnreadableDescriptor { reason: String },

    #[error("descriptor is not valid: {reason}")]
    MalformedDescriptor { reason: String },

    #[error("table is missing")]
    MissingPrimaryTable,

    #[error("table name is missing")]
    MissingTableName,

    #[error("primary key name is missing")]
    MissingPrimaryKey,

    #[error("foreign key name is missing on a join")]
    BadForeignKey,

    #[error("no defined property")]
    NoProperties,

    #[error("unknown table name \"{table}\" on the property \"{property}\"")]
    UnknownTableOnProperty { table: String, property: String },

    #[error("property \"{property}\" already defined")]
    DuplicateProperty { property: String },

    #[error("invalid syntax in the property name \"{property}\"")]
    BadPropertyName { property: String },

    #[error("attribute \"datatype\" is missing or empty on property \"{property}\"")]
    MissingDatatype { property: String },

    #[error("unknown datatype \"{datatype}\" on property \"{property}\"")]
    UnknownDatatype { datatype: String, property: String },

    #[error("property \"{property}\" non numeric cannot be auto incremented")]
    NonNumericAutoIncrement { property: String },

    #[error("json codec error: {0}")]
    JsonCodec(#[from] JsonCodecError),

    #[error("method \"{method}\" is already defined")]
    DuplicateMethod { method: String },

    #[error("method \"{method}\", parameter name is missing")]
    MissingParameterName { method: String },

    #[error("method \"{method}\", the sign $ in the parameter name \"{parameter}\" is not authorized")]
    BadParameterName { method: String, parameter: String },

    #[error("procedure call name is missing on method \"{method}\"")]
    MissingProcedureCall { method: String },

    #[error("update method \"{method}\" is forbidden because the main table contains only primary keys")]
    UpdateOnPkOnlyTable { method: String },

    #[error("method \"{method}\" of \"update\" type should contain a \"value\" entry")]
    MissingUpdateValues { method: String },

    #[error("method \"{method}\", unknown property \"{property}\"")]
    UnknownProperty { method: String, property: String },

    #[error("method \"{method}\", unknown condition \"{op}\"")]
    UnknownConditionOp { method: String, op: String },

    #[error("method \"{method}\", conditions on foreign-table properties are not allowed here")]
    ConditionOnForeignProperty { method: String },

    #[error("method \"{method}\", no value and expression at the same time on condition \"{op}\"")]
    ValueAndExpr { method: String, op: String },

    #[error("method \"{method}\", value or expr are not allowed on condition \"{op}\"")]
    ValueOnNullTest { method: String, op: String },

    #[error("method \"{method}\", value or expression is missing on condition \"{op}\"")]
    MissingConditionValue { method: String, op: String },

    #[error("method \"{method}\", condition \"{op}\": operator is missing")]
    MissingCustomOperator { method: String, op: String },

    #[error(
        "method \"{method}\", the expression for the in/notin operator should be a simple parameter name"
    )]
    BadInExpression { method: String },

    #[error("method \"{method}\", the property \"{property}\" should be owned by the primary table")]
    ValueOnForeignProperty { method: String, property: String },

    #[error("method \"{method}\", primary key properties like \"{property}\" are not allowed as update targets")]
    ValueOnPrimaryKey { method: String, property: String },

    #[error("method \"{method}\", property on order item \"{property}\" is unknown")]
    UnknownOrderProperty { method: String, property: String },

    #[error("method \"{method}\", order item is missing a property")]
    MissingOrderProperty { method: String },

    #[error("method \"{method}\", unknown parameter \"{parameter}\" in the order clause")]
    UnknownOrderParameter { method: String, parameter: String },

    #[error("method \"{method}\", limit is allowed only on a select method")]
    LimitOnNonSelect { method: String },

    #[error("method \"{method}\", unknown parameter \"{parameter}\" in the limit clause")]
    UnknownLimitParameter { method: String, parameter: String },

    #[error("method \"{method}\", bad value \"{value}\" on the limit clause")]
    BadLimitValue { method: String, value: String },

    #[error("the \"distinct\" attribute is not allowed on method \"{method}\" in this context")]
    DistinctNotAllowed { method: String },

    #[error("generated method bodies are not supported, method \"{method}\"")]
    UnsupportedBodyMethod { method: String },

    #[error("{0}")]
    Condition(#[from] ConditionError),
}

impl ParseErrorKind {
    /// Stable numeric error code (the descriptor error code space).
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::UnreadableDescriptor { .. } => 510,
            Self::MalformedDescriptor { .. } => 511,
            Self::Condition(_) => 503,
            Self::DistinctNotAllowed { .. } => 515,
            Self::MissingPrimaryTable => 520,
            Self::MissingTableName => 522,
            Self::MissingPrimaryKey => 523,
            Self::BadForeignKey => 524,
            Self::NoProperties => 530,
            Self::UnknownTableOnProperty { .. } => 531,
            Self::BadPropertyName { .. } => 532,
            Self::DuplicateProperty { .. } => 533,
            Self::NonNumericAutoIncrement { .. } => 535,
            Self::MissingDatatype { .. } | Self::MissingParameterName { .. } => 512,
            Self::UnknownDatatype { .. } => 516,
            Self::JsonCodec(_) => 518,
            Self::MissingProcedureCall { .. } => 541,
            Self::UnsupportedBodyMethod { .. } => 542,
            Self::MissingUpdateValues { .. } => 543,
            Self::LimitOnNonSelect { .. } => 544,
            Self::DuplicateMethod { .. } => 545,
            Self::UnknownConditionOp { .. } => 546,
            Self::UnknownProperty { .. } => 547,
            Self::ConditionOnForeignProperty { .. } => 548,
            Self::ValueAndExpr { .. } => 549,
            Self::ValueOnNullTest { .. } => 550,
            Self::MissingConditionValue { .. } => 551,
            Self::UnknownOrderProperty { .. } => 552,
            Self::MissingOrderProperty { .. } => 553,
            Self::ValueOnForeignProperty { .. } => 555,
            Self::ValueOnPrimaryKey { .. } => 556,
            Self::UnknownLimitParameter { .. } => 558,
            Self::BadLimitValue { .. } => 559,
            Self::BadInExpression { .. } => 560,
            Self::UnknownOrderParameter { .. } => 563,
            Self::UpdateOnPkOnlyTable { .. } => 564,
            Self::BadParameterName { .. } => 565,
            Self::MissingCustomOperator { .. } => 567,
        }
    }
}
