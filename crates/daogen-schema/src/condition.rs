use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Condition model
///
/// Boolean filter tree for declarative access methods, plus ordering
/// clauses. Built imperatively (the descriptor parser and ad-hoc runtime
/// filters use the same builder surface), immutable once the descriptor
/// compile completes. No SQL semantics live here; the generator walks the
/// tree and renders per dialect.
///

///
/// GlueOp
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum GlueOp {
    #[default]
    And,
    Or,
}

impl GlueOp {
    pub fn parse(s: &str) -> Result<Self, ConditionError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(ConditionError::InvalidOperator {
                operator: other.to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for GlueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

///
/// CompareOp
///
/// Whitelisted leaf operators, with an escape hatch for an arbitrary
/// dialect-specific operator supplied explicitly by the caller. Custom
/// tokens must be punctuation-only (no identifiers, digits, whitespace,
/// semicolons or parentheses), which keeps the escape hatch injection-safe.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
    NotLike,
    ILike,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Match,
    Regexp,
    NotRegexp,
    Tilde,
    NotTilde,
    TildeCi,
    NotTildeCi,
    RLike,
    SoundsLike,
    Between,
    Custom(String),
}

impl CompareOp {
    /// Parse an operator token. Whitelisted words map to their variant;
    /// anything else is accepted only as a punctuation-only custom token.
    pub fn parse(token: &str) -> Result<Self, ConditionError> {
        let upper = token.trim().to_ascii_uppercase();
        let op = match upper.as_str() {
            "=" => Self::Eq,
            "<>" | "!=" => Self::Ne,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "ILIKE" => Self::ILike,
            "IS NULL" => Self::IsNull,
            "IS NOT NULL" => Self::IsNotNull,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "MATCH" => Self::Match,
            "REGEXP" => Self::Regexp,
            "NOT REGEXP" => Self::NotRegexp,
            "~" => Self::Tilde,
            "!~" => Self::NotTilde,
            "~*" => Self::TildeCi,
            "!~*" => Self::NotTildeCi,
            "RLIKE" => Self::RLike,
            "SOUNDS LIKE" => Self::SoundsLike,
            "BETWEEN" => Self::Between,
            _ => {
                if is_punctuation_token(&upper) {
                    Self::Custom(upper)
                } else {
                    return Err(ConditionError::InvalidOperator {
                        operator: token.to_string(),
                    });
                }
            }
        };
        Ok(op)
    }

    #[must_use]
    pub fn as_sql(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::ILike => "ILIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Match => "MATCH",
            Self::Regexp => "REGEXP",
            Self::NotRegexp => "NOT REGEXP",
            Self::Tilde => "~",
            Self::NotTilde => "!~",
            Self::TildeCi => "~*",
            Self::NotTildeCi => "!~*",
            Self::RLike => "RLIKE",
            Self::SoundsLike => "SOUNDS LIKE",
            Self::Between => "BETWEEN",
            Self::Custom(tok) => tok,
        }
    }

    #[must_use]
    pub const fn is_set_membership(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    #[must_use]
    pub const fn is_null_test(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    #[must_use]
    pub const fn is_like(&self) -> bool {
        matches!(self, Self::Like | Self::NotLike)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

fn is_punctuation_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, ';' | '(' | ')'))
}

///
/// Condition
///
/// A leaf: `property op value`. The value is either a literal string
/// (escaped per the property's unified type at generation time) or a raw
/// expression that may embed `$param` references. An optional rendering
/// pattern wraps the field (`%s` placeholder), and an optional dialect
/// guard skips the leaf entirely when compiling for another dialect.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub property: String,
    pub op: CompareOp,
    pub value: String,
    pub is_expr: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect_guard: Option<String>,
}

///
/// ConditionGroup
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub glue: GlueOp,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ConditionGroup>,
}

impl ConditionGroup {
    #[must_use]
    pub const fn new(glue: GlueOp) -> Self {
        Self {
            glue,
            conditions: Vec::new(),
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.is_empty()
    }
}

///
/// OrderDirection
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
    /// Direction bound to a method parameter (`$sortDir`), normalized to
    /// asc/desc at render time.
    Param(String),
}

impl OrderDirection {
    pub fn parse(way: &str, allow_any_way: bool) -> Result<Self, ConditionError> {
        if let Some(param) = way.strip_prefix('$') {
            if allow_any_way {
                return Ok(Self::Param(param.to_string()));
            }
        }
        match way.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ if allow_any_way => Ok(Self::Asc),
            _ => Err(ConditionError::InvalidOperator {
                operator: way.to_string(),
            }),
        }
    }
}

///
/// OrderItem
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub property: String,
    pub direction: OrderDirection,
}

///
/// Conditions
///
/// The builder and the result in one: a root group, an order list, and a
/// cursor stack used only during construction. `end_group` attaches the
/// closed group to its parent only when non-empty; empty groups are pruned
/// silently, never emitted as `()`.
///

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    root: ConditionGroup,
    pub order: Vec<OrderItem>,

    #[serde(skip)]
    open: Vec<ConditionGroup>,
}

impl Default for Conditions {
    fn default() -> Self {
        Self::new(GlueOp::And)
    }
}

impl Conditions {
    #[must_use]
    pub const fn new(glue: GlueOp) -> Self {
        Self {
            root: ConditionGroup::new(glue),
            order: Vec::new(),
            open: Vec::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> &ConditionGroup {
        &self.root
    }

    /// Replace the glue operator of the outermost group.
    pub const fn set_root_glue(&mut self, glue: GlueOp) {
        self.root.glue = glue;
    }

    /// Open a nested group; subsequent conditions land inside it.
    pub fn start_group(&mut self, glue: GlueOp) {
        self.open.push(ConditionGroup::new(glue));
    }

    /// Close the current group. A non-empty group is attached to its
    /// parent; an empty one is dropped. Popping past the root is a no-op.
    pub fn end_group(&mut self) {
        if let Some(closed) = self.open.pop() {
            if !closed.is_empty() {
                self.current_mut().groups.push(closed);
            }
        }
    }

    /// Append a leaf to the current group. The operator token is validated
    /// here, not at generation time.
    pub fn add_condition(
        &mut self,
        property: impl Into<String>,
        operator: &str,
        value: impl Into<String>,
        pattern: impl Into<String>,
        is_expr: bool,
        dialect_guard: Option<String>,
    ) -> Result<(), ConditionError> {
        let op = CompareOp::parse(operator)?;
        self.current_mut().conditions.push(Condition {
            property: property.into(),
            op,
            value: value.into(),
            is_expr,
            pattern: pattern.into(),
            dialect_guard,
        });
        Ok(())
    }

    /// Append an order clause. The direction must be ASC/DESC unless the
    /// caller explicitly opts out (parameter-bound directions).
    pub fn add_item_order(
        &mut self,
        property: impl Into<String>,
        way: &str,
        allow_any_way: bool,
    ) -> Result<(), ConditionError> {
        let direction = OrderDirection::parse(way, allow_any_way)?;
        self.order.push(OrderItem {
            property: property.into(),
            direction,
        });
        Ok(())
    }

    /// True when neither conditions nor order clauses exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_conditions() && self.order.is_empty()
    }

    #[must_use]
    pub fn has_conditions(&self) -> bool {
        !self.root.is_empty() || self.open.iter().any(|g| !g.is_empty())
    }

    fn current_mut(&mut self) -> &mut ConditionGroup {
        self.open.last_mut().unwrap_or(&mut self.root)
    }
}

///
/// ConditionError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ConditionError {
    #[error("invalid given operator \"{operator}\"")]
    InvalidOperator { operator: String },
}

impl ConditionError {
    /// Stable numeric code, aligned with the descriptor error code space.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidOperator { .. } => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(conds: &mut Conditions, prop: &str, value: &str) {
        conds
            .add_condition(prop, "=", value, "", false, None)
            .unwrap();
    }

    #[test]
    fn builder_nests_groups() {
        let mut c = Conditions::new(GlueOp::Or);
        c.start_group(GlueOp::And);
        eq(&mut c, "a", "1");
        eq(&mut c, "b", "2");
        c.end_group();
        c.start_group(GlueOp::And);
        eq(&mut c, "c", "3");
        c.end_group();

        assert_eq!(c.root().groups.len(), 2);
        assert_eq!(c.root().groups[0].conditions.len(), 2);
        assert!(c.root().conditions.is_empty());
        assert!(c.has_conditions());
    }

    #[test]
    fn empty_group_is_pruned() {
        let mut c = Conditions::default();
        c.start_group(GlueOp::Or);
        c.end_group();
        assert!(c.root().groups.is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn end_group_past_root_is_noop() {
        let mut c = Conditions::default();
        c.end_group();
        c.end_group();
        eq(&mut c, "a", "1");
        assert_eq!(c.root().conditions.len(), 1);
    }

    #[test]
    fn unknown_operator_fails_fast() {
        let mut c = Conditions::default();
        let err = c
            .add_condition("a", "EXPLODES", "1", "", false, None)
            .unwrap_err();
        assert_eq!(err.code(), 503);
    }

    #[test]
    fn punctuation_custom_operator_allowed() {
        assert_eq!(
            CompareOp::parse("@>").unwrap(),
            CompareOp::Custom("@>".to_string())
        );
        assert!(CompareOp::parse("DROP TABLE").is_err());
        assert!(CompareOp::parse("(;)").is_err());
    }

    #[test]
    fn order_direction_validation() {
        let mut c = Conditions::default();
        c.add_item_order("name", "desc", false).unwrap();
        assert_eq!(c.order[0].direction, OrderDirection::Desc);

        assert!(c.add_item_order("name", "sideways", false).is_err());

        c.add_item_order("name", "$dir", true).unwrap();
        assert_eq!(
            c.order[1].direction,
            OrderDirection::Param("dir".to_string())
        );
    }

    #[test]
    fn order_counts_toward_emptiness() {
        let mut c = Conditions::default();
        c.add_item_order("name", "asc", false).unwrap();
        assert!(!c.is_empty());
        assert!(!c.has_conditions());
    }
}
