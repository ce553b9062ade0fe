use crate::{dialect::Dialect, error::RenderError};
use daogen_schema::{condition::CompareOp, types::UnifiedType, value::Value};
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Params
///
/// Call-time parameter bindings, by name. Defaults declared on the method
/// are merged in by the caller before rendering; the template itself only
/// ever reads.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, IntoIterator, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    fn require(&self, name: &str) -> Result<&Value, RenderError> {
        self.0.get(name).ok_or_else(|| RenderError::MissingParameter {
            parameter: name.to_string(),
        })
    }
}

///
/// LimitBind
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LimitBind {
    Literal(u64),
    Param(String),
}

///
/// Frag
///
/// One fragment of a compiled statement. Literal text is fixed at compile
/// time; the parameterized variants are resolved against [`Params`] when
/// the statement is rendered. There is no string splicing of raw user
/// input anywhere: every bound value goes through the dialect escaper.
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Frag {
    Lit(String),

    /// `column op value`, switching to `IS NULL` / `IS NOT NULL` when an
    /// equality operand is bound to null.
    Comparison {
        column: String,
        op: CompareOp,
        parameter: String,
        unified: UnifiedType,
    },

    /// A bare escaped value slot, used inside VALUES lists, SET clauses
    /// and descriptor expressions.
    Value {
        parameter: String,
        unified: UnifiedType,
        for_like: bool,
    },

    /// `column IN (..)` over a bound list.
    SetMembership {
        column: String,
        negated: bool,
        parameter: String,
        unified: UnifiedType,
    },

    /// ASC/DESC resolved from a bound parameter, defaulting to ASC.
    OrderDirection { parameter: String },

    /// An order column chosen by a bound parameter, restricted to the
    /// properties known at compile time.
    OrderField {
        parameter: String,
        choices: BTreeMap<String, String>,
    },

    /// Dialect row limiting clause over bound or literal offset/count.
    Limit { offset: LimitBind, count: LimitBind },
}

///
/// SqlTemplate
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SqlTemplate {
    pub dialect: Dialect,
    frags: Vec<Frag>,
}

impl SqlTemplate {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            frags: Vec::new(),
        }
    }

    /// Append literal SQL, merging into a trailing literal fragment.
    pub fn push_lit(&mut self, sql: impl AsRef<str>) {
        let sql = sql.as_ref();
        if sql.is_empty() {
            return;
        }
        if let Some(Frag::Lit(tail)) = self.frags.last_mut() {
            tail.push_str(sql);
        } else {
            self.frags.push(Frag::Lit(sql.to_string()));
        }
    }

    pub fn push(&mut self, frag: Frag) {
        match frag {
            Frag::Lit(sql) => self.push_lit(sql),
            other => self.frags.push(other),
        }
    }

    pub fn append(&mut self, other: Self) {
        for frag in other.frags {
            self.push(frag);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frags.is_empty()
    }

    #[must_use]
    pub fn frags(&self) -> &[Frag] {
        &self.frags
    }

    /// The statement text when nothing is parameterized.
    #[must_use]
    pub fn static_sql(&self) -> Option<String> {
        let mut sql = String::new();
        for frag in &self.frags {
            match frag {
                Frag::Lit(text) => sql.push_str(text),
                _ => return None,
            }
        }

        Some(sql)
    }

    /// Render the statement with the given bindings.
    pub fn render(&self, params: &Params) -> Result<String, RenderError> {
        let mut sql = String::new();

        for frag in &self.frags {
            match frag {
                Frag::Lit(text) => sql.push_str(text),

                Frag::Comparison {
                    column,
                    op,
                    parameter,
                    unified,
                } => {
                    let value = params.require(parameter)?;
                    sql.push_str(&self.render_comparison(column, op, parameter, *unified, value)?);
                }

                Frag::Value {
                    parameter,
                    unified,
                    for_like,
                } => {
                    let value = params.require(parameter)?;
                    sql.push_str(&self.dialect.escape_value(
                        *unified,
                        value,
                        *for_like,
                        parameter,
                    )?);
                }

                Frag::SetMembership {
                    column,
                    negated,
                    parameter,
                    unified,
                } => {
                    let value = params.require(parameter)?;
                    sql.push_str(&self.render_set(column, *negated, parameter, *unified, value)?);
                }

                Frag::OrderDirection { parameter } => {
                    let value = params.require(parameter)?;
                    let desc = value
                        .as_text()
                        .is_some_and(|way| way.eq_ignore_ascii_case("desc"));
                    sql.push_str(if desc { "DESC" } else { "ASC" });
                }

                Frag::OrderField { parameter, choices } => {
                    let value = params.require(parameter)?;
                    let name = value.as_text().unwrap_or_default();
                    let column =
                        choices
                            .get(name)
                            .ok_or_else(|| RenderError::BadParameterType {
                                parameter: parameter.clone(),
                                expected: "a sortable property name".to_string(),
                            })?;
                    sql.push_str(column);
                }

                Frag::Limit { offset, count } => {
                    let offset = self.resolve_limit(offset, params)?;
                    let count = self.resolve_limit(count, params)?;
                    sql.push_str(&self.dialect.limit_clause(offset, count));
                }
            }
        }

        Ok(sql)
    }

    fn render_comparison(
        &self,
        column: &str,
        op: &CompareOp,
        parameter: &str,
        unified: UnifiedType,
        value: &Value,
    ) -> Result<String, RenderError> {
        if value.is_null() {
            match op {
                CompareOp::Eq => return Ok(format!("{column} IS NULL")),
                CompareOp::Ne => return Ok(format!("{column} IS NOT NULL")),
                _ => {}
            }
        }

        let for_like = op.is_like() || matches!(op, CompareOp::ILike);
        let literal = self
            .dialect
            .escape_value(unified, value, for_like, parameter)?;

        Ok(format!("{column} {} {literal}", op.as_sql()))
    }

    fn render_set(
        &self,
        column: &str,
        negated: bool,
        parameter: &str,
        unified: UnifiedType,
        value: &Value,
    ) -> Result<String, RenderError> {
        let items: Vec<&Value> = match value {
            Value::List(items) => items.iter().collect(),
            single => vec![single],
        };

        // an empty set matches nothing, rather than emitting `IN ()`
        if items.is_empty() {
            return Ok(if negated { "1=1" } else { "0=1" }.to_string());
        }

        let mut literals = Vec::with_capacity(items.len());
        for item in items {
            literals.push(self.dialect.escape_value(unified, item, false, parameter)?);
        }

        let op = if negated { "NOT IN" } else { "IN" };

        Ok(format!("{column} {op} ({})", literals.join(", ")))
    }

    fn resolve_limit(&self, bind: &LimitBind, params: &Params) -> Result<u64, RenderError> {
        match bind {
            LimitBind::Literal(n) => Ok(*n),
            LimitBind::Param(name) => {
                let value = params.require(name)?;
                value
                    .as_int()
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| RenderError::BadLimitValue {
                        parameter: name.clone(),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> SqlTemplate {
        SqlTemplate::new(Dialect::Mysql)
    }

    #[test]
    fn adjacent_literals_merge() {
        let mut t = template();
        t.push_lit("SELECT ");
        t.push_lit("1");
        assert_eq!(t.frags().len(), 1);
        assert_eq!(t.static_sql().as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn null_binding_switches_equality_to_is_null() {
        let mut t = template();
        t.push_lit("SELECT * FROM `p` WHERE ");
        t.push(Frag::Comparison {
            column: "`p`.`name`".to_string(),
            op: CompareOp::Eq,
            parameter: "name".to_string(),
            unified: UnifiedType::Varchar,
        });

        let mut params = Params::new();
        params.set("name", Value::Null);
        assert_eq!(
            t.render(&params).unwrap(),
            "SELECT * FROM `p` WHERE `p`.`name` IS NULL"
        );

        params.set("name", "it's");
        assert_eq!(
            t.render(&params).unwrap(),
            "SELECT * FROM `p` WHERE `p`.`name` = 'it''s'"
        );
    }

    #[test]
    fn null_binding_switches_inequality_to_is_not_null() {
        let mut t = template();
        t.push(Frag::Comparison {
            column: "`a`".to_string(),
            op: CompareOp::Ne,
            parameter: "a".to_string(),
            unified: UnifiedType::Integer,
        });

        let mut params = Params::new();
        params.set("a", Value::Null);
        assert_eq!(t.render(&params).unwrap(), "`a` IS NOT NULL");
    }

    #[test]
    fn integer_binding_is_cast_not_quoted() {
        let mut t = template();
        t.push(Frag::Comparison {
            column: "`id`".to_string(),
            op: CompareOp::Gt,
            parameter: "id".to_string(),
            unified: UnifiedType::Integer,
        });

        let mut params = Params::new();
        params.set("id", Value::Text("42".into()));
        assert_eq!(t.render(&params).unwrap(), "`id` > 42");
    }

    #[test]
    fn set_membership_over_a_list() {
        let mut t = template();
        t.push(Frag::SetMembership {
            column: "`id`".to_string(),
            negated: false,
            parameter: "ids".to_string(),
            unified: UnifiedType::Integer,
        });

        let mut params = Params::new();
        params.set("ids", Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(t.render(&params).unwrap(), "`id` IN (1, 2)");

        params.set("ids", Value::List(vec![]));
        assert_eq!(t.render(&params).unwrap(), "0=1");
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let mut t = template();
        t.push(Frag::OrderDirection {
            parameter: "dir".to_string(),
        });
        assert!(matches!(
            t.render(&Params::new()),
            Err(RenderError::MissingParameter { .. })
        ));
    }

    #[test]
    fn limit_binds_and_validates() {
        let mut t = template();
        t.push_lit("SELECT 1");
        t.push(Frag::Limit {
            offset: LimitBind::Literal(0),
            count: LimitBind::Param("count".to_string()),
        });

        let mut params = Params::new();
        params.set("count", 10_i64);
        assert_eq!(t.render(&params).unwrap(), "SELECT 1 LIMIT 0, 10");

        params.set("count", -1_i64);
        assert!(matches!(
            t.render(&params),
            Err(RenderError::BadLimitValue { .. })
        ));
    }
}
