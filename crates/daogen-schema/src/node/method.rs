use crate::condition::Conditions;
use serde::{Deserialize, Serialize};

///
/// MethodType
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum MethodType {
    #[default]
    Select,
    SelectFirst,
    Count,
    Update,
    Delete,
    /// Stored procedure call declared with `call`.
    RawSql,
}

impl MethodType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "select" => Some(Self::Select),
            "selectfirst" => Some(Self::SelectFirst),
            "count" => Some(Self::Count),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "sql" => Some(Self::RawSql),
            _ => None,
        }
    }

    /// Returns rows, so joins, order and limit make sense.
    #[must_use]
    pub const fn is_select_like(self) -> bool {
        matches!(self, Self::Select | Self::SelectFirst)
    }

    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

///
/// Parameter
///
/// A method parameter. Defaults are kept as their descriptor spelling;
/// coercion to the column type happens at render time.
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub default: Option<String>,
}

///
/// LimitPart
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LimitPart {
    Literal(u64),
    Param(String),
}

///
/// LimitClause
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitClause {
    pub offset: LimitPart,
    pub count: LimitPart,
}

///
/// UpdateValue
///
/// One assignment of an update method. Exactly one of `value` / `expr`
/// is set; the parser enforces this.
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateValue {
    pub property: String,
    pub value: Option<String>,
    pub expr: Option<String>,
}

///
/// Method
///
/// A resolved factory method. Conditions carry both the where tree and
/// the order items; the generator derives the SQL plan purely from this
/// struct.
///

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub method_type: MethodType,
    pub parameters: Vec<Parameter>,
    pub conditions: Conditions,
    pub limit: Option<LimitClause>,
    pub values: Vec<UpdateValue>,
    pub distinct: bool,
    /// Property counted distinctly, for `count` methods only.
    pub distinct_property: Option<String>,
    pub event_before: bool,
    pub event_after: bool,
    pub procedure_call: Option<String>,
}

impl Method {
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }
}
