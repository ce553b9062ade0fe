use crate::{
    dialect::Dialect,
    error::GenerateError,
    template::{Frag, SqlTemplate},
};
use daogen_schema::{
    condition::{CompareOp, Condition, ConditionGroup, GlueOp},
    node::{Property, SchemaModel},
    types::UnifiedType,
    value::Value,
};

///
/// Condition rendering
///
/// Walks a condition tree and appends WHERE fragments. Literal values are
/// escaped at compile time; `$param` expressions become typed slots bound
/// at render time.
///
/// Parenthesization: the outermost group is emitted without surrounding
/// parentheses only when its glue is AND. OR-rooted and nested groups are
/// always parenthesized, so operator precedence can never reassociate a
/// descriptor's tree.
///

pub(crate) struct ConditionContext<'a> {
    pub dialect: Dialect,
    pub model: &'a SchemaModel,
    /// Prefix columns with their table alias. Off for single-table
    /// UPDATE/DELETE statements.
    pub qualify: bool,
}

impl ConditionContext<'_> {
    /// Append the tree to `template`. Returns false when nothing was
    /// emitted (everything pruned or empty).
    pub fn push_tree(
        &self,
        root: &ConditionGroup,
        template: &mut SqlTemplate,
    ) -> Result<bool, GenerateError> {
        let Some(pruned) = self.prune(root) else {
            return Ok(false);
        };

        let parenthesize = pruned.glue == GlueOp::Or;
        self.push_group(&pruned, template, parenthesize)?;

        Ok(true)
    }

    /// Whether the tree would emit anything once pruned for this dialect.
    pub fn has_output(&self, root: &ConditionGroup) -> bool {
        self.prune(root).is_some()
    }

    /// Drop leaves guarded for other dialects, then any group left empty.
    fn prune(&self, group: &ConditionGroup) -> Option<ConditionGroup> {
        let conditions: Vec<Condition> = group
            .conditions
            .iter()
            .filter(|c| self.guard_matches(c.dialect_guard.as_deref()))
            .cloned()
            .collect();

        let groups: Vec<ConditionGroup> =
            group.groups.iter().filter_map(|g| self.prune(g)).collect();

        if conditions.is_empty() && groups.is_empty() {
            return None;
        }

        Some(ConditionGroup {
            glue: group.glue,
            conditions,
            groups,
        })
    }

    fn guard_matches(&self, guard: Option<&str>) -> bool {
        match guard {
            None => true,
            Some(list) => list
                .split(',')
                .any(|token| Dialect::parse(token) == Some(self.dialect)),
        }
    }

    fn push_group(
        &self,
        group: &ConditionGroup,
        template: &mut SqlTemplate,
        parenthesize: bool,
    ) -> Result<(), GenerateError> {
        if parenthesize {
            template.push_lit("(");
        }

        let glue = format!(" {} ", group.glue.as_sql());
        let mut first = true;
        let mut separate = |template: &mut SqlTemplate| {
            if first {
                first = false;
            } else {
                template.push_lit(&glue);
            }
        };

        for condition in &group.conditions {
            separate(template);
            self.push_leaf(condition, template)?;
        }
        for nested in &group.groups {
            separate(template);
            self.push_group(nested, template, true)?;
        }

        if parenthesize {
            template.push_lit(")");
        }

        Ok(())
    }

    fn push_leaf(
        &self,
        condition: &Condition,
        template: &mut SqlTemplate,
    ) -> Result<(), GenerateError> {
        let property = self
            .model
            .property(&condition.property)
            .unwrap_or_else(|| unreachable!("parser validated condition properties"));
        let column = self.column(property, &condition.pattern);

        if condition.op.is_null_test() {
            template.push_lit(format!("{column} {}", condition.op.as_sql()));
            return Ok(());
        }

        let for_like = is_like_family(&condition.op);

        if condition.is_expr {
            let expr = condition.value.trim();

            if let Some(parameter) = simple_param(expr) {
                let frag = if condition.op.is_set_membership() {
                    Frag::SetMembership {
                        column,
                        negated: condition.op == CompareOp::NotIn,
                        parameter: parameter.to_string(),
                        unified: property.unified_type,
                    }
                } else {
                    Frag::Comparison {
                        column,
                        op: condition.op.clone(),
                        parameter: parameter.to_string(),
                        unified: property.unified_type,
                    }
                };
                template.push(frag);
                return Ok(());
            }

            template.push_lit(format!("{column} {} ", condition.op.as_sql()));
            push_expr(template, expr, property.unified_type, for_like);
            return Ok(());
        }

        // a literal IN list: every comma-separated entry escaped on its own
        if condition.op.is_set_membership() {
            let mut entries = Vec::new();
            for raw in condition.value.split(',') {
                let entry = self
                    .dialect
                    .escape_value(
                        property.unified_type,
                        &Value::Text(raw.trim().to_string()),
                        false,
                        &property.name,
                    )
                    .map_err(|_| GenerateError::BadConditionValue {
                        property: property.name.clone(),
                        value: condition.value.clone(),
                    })?;
                entries.push(entry);
            }
            template.push_lit(format!(
                "{column} {} ({})",
                condition.op.as_sql(),
                entries.join(", ")
            ));
            return Ok(());
        }

        // static value, escaped once at compile time
        let literal = self
            .dialect
            .escape_value(
                property.unified_type,
                &Value::Text(condition.value.clone()),
                for_like,
                &property.name,
            )
            .map_err(|_| GenerateError::BadConditionValue {
                property: property.name.clone(),
                value: condition.value.clone(),
            })?;
        template.push_lit(format!("{column} {} {literal}", condition.op.as_sql()));

        Ok(())
    }

    /// Quoted, optionally table-qualified column with the condition
    /// pattern applied.
    pub fn column(&self, property: &Property, pattern: &str) -> String {
        let quoted = if self.qualify {
            format!(
                "{}.{}",
                self.dialect.quote(&property.table),
                self.dialect.quote(&property.field_name)
            )
        } else {
            self.dialect.quote(&property.field_name)
        };

        if pattern.is_empty() || pattern == "%s" {
            quoted
        } else {
            Property::apply_pattern(pattern, &quoted)
        }
    }
}

/// `$name` and nothing else.
fn simple_param(expr: &str) -> Option<&str> {
    let rest = expr.strip_prefix('$')?;
    let ok = !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    ok.then_some(rest)
}

fn is_like_family(op: &CompareOp) -> bool {
    op.is_like() || matches!(op, CompareOp::ILike)
}

/// Split a descriptor expression into literal SQL and `$param` slots.
pub(crate) fn push_expr(
    template: &mut SqlTemplate,
    expr: &str,
    unified: UnifiedType,
    for_like: bool,
) {
    let mut literal = String::new();
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }

        if name.is_empty() {
            literal.push('$');
            continue;
        }

        template.push_lit(&literal);
        literal.clear();
        template.push(Frag::Value {
            parameter: name,
            unified,
            for_like,
        });
    }

    template.push_lit(&literal);
}
