use thiserror::Error as ThisError;

///
/// GenerateError
///
/// Failures while compiling a schema model into a dao artifact. These are
/// descriptor-level mistakes surfaced at compile time, never at render
/// time.
///

#[derive(Debug, ThisError)]
pub enum GenerateError {
    #[error(
        "property \"{property}\" is auto incremented but declares no sequence, which {dialect} requires"
    )]
    AutoIncrementWithoutSequence { property: String, dialect: String },

    #[error("method \"{method}\" references property \"{property}\" which has no selectable column")]
    UnselectableProperty { method: String, property: String },

    #[error("dao has no primary key to generate key-based access for")]
    MissingPrimaryKey,

    #[error("static value \"{value}\" on property \"{property}\" cannot be written as a literal")]
    BadConditionValue { property: String, value: String },
}

///
/// RenderError
///
/// Failures while binding call-time parameters into a compiled template.
///

#[derive(Debug, ThisError)]
pub enum RenderError {
    #[error("parameter \"{parameter}\" is not bound and has no default")]
    MissingParameter { parameter: String },

    #[error("parameter \"{parameter}\" cannot be read as {expected}")]
    BadParameterType { parameter: String, expected: String },

    #[error("parameter \"{parameter}\" is not a valid limit value")]
    BadLimitValue { parameter: String },
}
