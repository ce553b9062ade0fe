use serde::{Deserialize, Serialize};
use std::fmt;

///
/// UnifiedType
///
/// Portable type category abstracting over dialect-specific raw column
/// types. Dialect strategies map raw datatype names onto this set; all
/// value coercion and escaping decisions key off it.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum UnifiedType {
    Integer,
    Numeric,
    Boolean,
    #[default]
    Varchar,
    Text,
    Binary,
    Datetime,
    Json,
}

impl UnifiedType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Numeric)
    }

    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Binary)
    }

    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Varchar | Self::Text)
    }
}

impl fmt::Display for UnifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Integer => "integer",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Datetime => "datetime",
            Self::Json => "json",
        };
        write!(f, "{label}")
    }
}

///
/// JsonCodec
///
/// Encoder/decoder directive attached to a json-typed property. Resolved
/// once at parse time; the generator only replays it into the record
/// modifier, never re-parses the directive.
///
/// Accepted directive forms:
/// - `raw`                  -> no transformation
/// - `func_name`            -> free function
/// - `Class::staticMethod`  -> associated/static call
/// - `Class->method`        -> call on a fresh instance
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JsonCodec {
    Raw,
    Function { name: String },
    StaticMethod { class: String, method: String },
    InstanceMethod { class: String, method: String },
}

impl JsonCodec {
    /// Parse a directive string. Empty directives mean "generic decode".
    pub fn parse(directive: &str) -> Result<Option<Self>, JsonCodecError> {
        let directive = directive.trim();
        if directive.is_empty() {
            return Ok(None);
        }
        if directive == "raw" {
            return Ok(Some(Self::Raw));
        }
        if let Some((class, method)) = directive.split_once("::") {
            return Self::split_target(class, method, directive)
                .map(|(class, method)| Some(Self::StaticMethod { class, method }));
        }
        if let Some((class, method)) = directive.split_once("->") {
            return Self::split_target(class, method, directive)
                .map(|(class, method)| Some(Self::InstanceMethod { class, method }));
        }
        if !is_symbol(directive) {
            return Err(JsonCodecError::BadDirective {
                directive: directive.to_string(),
            });
        }
        Ok(Some(Self::Function {
            name: directive.to_string(),
        }))
    }

    fn split_target(
        class: &str,
        method: &str,
        directive: &str,
    ) -> Result<(String, String), JsonCodecError> {
        let class = class.trim();
        let method = method.trim();
        if class.is_empty() {
            return Err(JsonCodecError::MissingTargetClass {
                method: method.to_string(),
            });
        }
        if method.is_empty() || !is_path(class) || !is_symbol(method) {
            return Err(JsonCodecError::BadDirective {
                directive: directive.to_string(),
            });
        }
        Ok((class.to_string(), method.to_string()))
    }
}

///
/// JsonCodecError
///

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum JsonCodecError {
    #[error("invalid json codec directive '{directive}'")]
    BadDirective { directive: String },

    #[error("json codec method '{method}' has no target class")]
    MissingTargetClass { method: String },
}

fn is_symbol(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_path(s: &str) -> bool {
    s.split('\\')
        .chain(s.split('.'))
        .all(|part| part.is_empty() || is_symbol(part))
        && !s.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_directive_means_no_transform() {
        assert_eq!(JsonCodec::parse("raw").unwrap(), Some(JsonCodec::Raw));
    }

    #[test]
    fn empty_directive_is_generic() {
        assert_eq!(JsonCodec::parse("  ").unwrap(), None);
    }

    #[test]
    fn bare_function_directive() {
        assert_eq!(
            JsonCodec::parse("decode_geometry").unwrap(),
            Some(JsonCodec::Function {
                name: "decode_geometry".to_string()
            })
        );
    }

    #[test]
    fn static_and_instance_forms() {
        assert_eq!(
            JsonCodec::parse("GeoPoint::fromJson").unwrap(),
            Some(JsonCodec::StaticMethod {
                class: "GeoPoint".to_string(),
                method: "fromJson".to_string()
            })
        );
        assert_eq!(
            JsonCodec::parse("GeoPoint->hydrate").unwrap(),
            Some(JsonCodec::InstanceMethod {
                class: "GeoPoint".to_string(),
                method: "hydrate".to_string()
            })
        );
    }

    #[test]
    fn malformed_directives_rejected() {
        assert_eq!(
            JsonCodec::parse("::fromJson").unwrap_err(),
            JsonCodecError::MissingTargetClass {
                method: "fromJson".to_string()
            }
        );
        assert!(JsonCodec::parse("A::").is_err());
        assert!(JsonCodec::parse("not a symbol").is_err());
    }
}
