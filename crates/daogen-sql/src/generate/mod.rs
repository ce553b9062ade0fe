mod conditions;


pub(crate) use conditions::push_expr;

use crate::{
    artifact::{
        CompiledDao, InsertPlan, KeyRetrieval, MethodPlan, PlanParameter, RecordProperty,
        RecordModifier,
    },
    dialect::Dialect,
    error::GenerateError,
    generate::conditions::ConditionContext,
    template::{Frag, LimitBind, SqlTemplate},
};
use daogen_schema::{
    condition::{CompareOp, OrderDirection},
    node::{LimitPart, Method, MethodType, Property, SchemaModel, Table},
    types::UnifiedType,
    value::Value,
};
use std::collections::BTreeMap;

///
/// Generator
///
/// Compiles a resolved schema model into a [`CompiledDao`] for one
/// dialect. Pure: no IO, no caching; the facade crate owns persistence.
///

#[derive(Clone, Copy, Debug)]
pub struct Generator {
    dialect: Dialect,
}

impl Generator {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn compile(&self, model: &SchemaModel) -> Result<CompiledDao, GenerateError> {
        if model.pk_properties().next().is_none() {
            return Err(GenerateError::MissingPrimaryKey);
        }

        let (from, join_where) = self.from_clause(model);

        let mut select_all = self.new_template();
        select_all.push_lit(format!("SELECT {} FROM {from}", self.select_fields(model)));
        if let Some(joins) = &join_where {
            select_all.push_lit(format!(" WHERE {joins}"));
        }

        let mut select_by_pk = select_all.clone();
        self.push_pk_where(&mut select_by_pk, model, true, join_where.is_some());

        let mut count_all = self.new_template();
        count_all.push_lit(format!("SELECT COUNT(*) FROM {from}"));
        if let Some(joins) = &join_where {
            count_all.push_lit(format!(" WHERE {joins}"));
        }

        let insert = self.insert_plan(model)?;
        let update_by_pk = self.update_by_pk(model)?;
        let delete_by_pk = self.delete_by_pk(model);

        let mut methods = Vec::with_capacity(model.methods.len());
        for method in &model.methods {
            methods.push(self.method_plan(model, method, &from, join_where.as_deref())?);
        }

        Ok(CompiledDao {
            identity: model.identity.clone(),
            dialect: self.dialect,
            record_extends: model.record_extends.clone(),
            events: model.events.clone(),
            properties: model.properties.iter().map(|p| self.record_property(p)).collect(),
            primary_key: model.pk_properties().map(|p| p.name.clone()).collect(),
            select_all,
            select_by_pk,
            count_all,
            insert,
            update_by_pk,
            delete_by_pk,
            methods,
            sources: Vec::new(),
        })
    }

    fn new_template(&self) -> SqlTemplate {
        SqlTemplate::new(self.dialect)
    }

    //
    // select surface
    //

    fn select_fields(&self, model: &SchemaModel) -> String {
        let info = self.dialect.info();

        let fields: Vec<String> = model
            .properties
            .iter()
            .filter(|p| p.is_selectable())
            .map(|property| {
                let column = self.qualified_column(property);
                let expr = if property.has_plain_select() {
                    column
                } else {
                    Property::apply_pattern(&property.select_pattern, &column)
                };

                let needs_alias = info.always_alias_select
                    || !property.has_plain_select()
                    || property.field_name != property.name;
                if needs_alias {
                    format!(
                        "{expr}{}{}",
                        info.alias_keyword,
                        self.dialect.quote(&property.name)
                    )
                } else {
                    expr
                }
            })
            .collect();

        fields.join(", ")
    }

    /// FROM clause plus, for dialects without JOIN syntax, the join
    /// predicates destined for the WHERE clause.
    fn from_clause(&self, model: &SchemaModel) -> (String, Option<String>) {
        let info = self.dialect.info();
        let primary = model.primary_table();
        let primary_ref = self.table_ref(primary);

        if info.inline_outer_joins {
            let mut from = vec![primary_ref];
            let mut joins = Vec::new();

            for table in model.tables.iter().filter(|t| !t.usage.is_primary()) {
                from.push(self.table_ref(table));
                let marker = if table.usage.is_outer() { " (+)" } else { "" };
                for (fk, pk) in table.foreign_keys.iter().zip(&table.primary_key) {
                    joins.push(format!(
                        "{}.{} = {}.{}{marker}",
                        self.dialect.quote(&primary.name),
                        self.dialect.quote(fk),
                        self.dialect.quote(&table.name),
                        self.dialect.quote(pk),
                    ));
                }
            }

            let join_where = (!joins.is_empty()).then(|| joins.join(" AND "));
            return (from.join(", "), join_where);
        }

        let mut from = primary_ref;
        for table in model.tables.iter().filter(|t| !t.usage.is_primary()) {
            let keyword = if table.usage.is_outer() {
                "LEFT JOIN"
            } else {
                "INNER JOIN"
            };
            let on: Vec<String> = table
                .foreign_keys
                .iter()
                .zip(&table.primary_key)
                .map(|(fk, pk)| {
                    format!(
                        "{}.{} = {}.{}",
                        self.dialect.quote(&primary.name),
                        self.dialect.quote(fk),
                        self.dialect.quote(&table.name),
                        self.dialect.quote(pk),
                    )
                })
                .collect();
            from.push_str(&format!(
                " {keyword} {} ON ({})",
                self.table_ref(table),
                on.join(" AND ")
            ));
        }

        (from, None)
    }

    fn table_ref(&self, table: &Table) -> String {
        let real = self.dialect.quote_table(&table.qualified_real_name());
        if table.real_name == table.name && table.schema.is_none() {
            real
        } else {
            format!(
                "{real}{}{}",
                self.dialect.info().alias_keyword,
                self.dialect.quote(&table.name)
            )
        }
    }

    fn qualified_column(&self, property: &Property) -> String {
        format!(
            "{}.{}",
            self.dialect.quote(&property.table),
            self.dialect.quote(&property.field_name)
        )
    }

    fn push_pk_where(
        &self,
        template: &mut SqlTemplate,
        model: &SchemaModel,
        qualify: bool,
        has_where: bool,
    ) {
        template.push_lit(if has_where { " AND " } else { " WHERE " });

        let mut first = true;
        for property in model.pk_properties() {
            if !first {
                template.push_lit(" AND ");
            }
            first = false;

            let column = if qualify {
                self.qualified_column(property)
            } else {
                self.dialect.quote(&property.field_name)
            };
            template.push(Frag::Comparison {
                column,
                op: CompareOp::Eq,
                parameter: property.name.clone(),
                unified: property.unified_type,
            });
        }
    }

    //
    // write surface
    //

    fn insert_plan(&self, model: &SchemaModel) -> Result<InsertPlan, GenerateError> {
        let primary = model.primary_table();
        let mut key_retrieval = KeyRetrieval::None;

        // (column sql, value renderer)
        let mut columns = Vec::new();
        let mut values: Vec<ValueSlot> = Vec::new();

        for property in model.primary_properties() {
            if property.auto_increment {
                match self.dialect {
                    Dialect::Oci => {
                        let Some(sequence) = property.sequence_name.clone() else {
                            return Err(GenerateError::AutoIncrementWithoutSequence {
                                property: property.name.clone(),
                                dialect: self.dialect.to_string(),
                            });
                        };
                        columns.push(self.dialect.quote(&property.field_name));
                        values.push(ValueSlot::Lit(format!("{sequence}.NEXTVAL")));
                        if property.is_pk {
                            key_retrieval = KeyRetrieval::SequenceCurrval { sequence };
                        }
                    }
                    Dialect::Pgsql => {
                        // column omitted, the default nextval applies
                        let sequence = property.sequence_name.clone().unwrap_or_else(|| {
                            self.dialect
                                .default_sequence(&primary.real_name, &property.field_name)
                                .unwrap_or_default()
                        });
                        if property.is_pk {
                            key_retrieval = KeyRetrieval::SequenceCurrval { sequence };
                        }
                    }
                    _ => {
                        if property.is_pk {
                            key_retrieval = KeyRetrieval::LastInsertId;
                        }
                    }
                }
                continue;
            }

            // an empty insert pattern keeps the column out of the insert
            if property.insert_pattern.is_empty() {
                continue;
            }

            columns.push(self.dialect.quote(&property.field_name));
            values.push(ValueSlot::Pattern {
                pattern: property.insert_pattern.clone(),
                parameter: property.name.clone(),
                unified: property.unified_type,
            });
        }

        let mut template = self.new_template();
        template.push_lit(format!(
            "INSERT INTO {} ({}) VALUES (",
            self.dialect.quote_table(&primary.qualified_real_name()),
            columns.join(", ")
        ));
        for (i, slot) in values.iter().enumerate() {
            if i > 0 {
                template.push_lit(", ");
            }
            slot.push_to(&mut template);
        }
        template.push_lit(")");

        Ok(InsertPlan {
            template,
            key_retrieval,
        })
    }

    fn update_by_pk(&self, model: &SchemaModel) -> Result<Option<SqlTemplate>, GenerateError> {
        if model.has_only_primary_keys() {
            return Ok(None);
        }

        // an empty update pattern keeps the column out of the update
        let updatable: Vec<&Property> = model
            .primary_properties()
            .filter(|p| p.is_updatable() && !p.update_pattern.is_empty())
            .collect();
        if updatable.is_empty() {
            return Ok(None);
        }

        let primary = model.primary_table();
        let mut template = self.new_template();
        template.push_lit(format!(
            "UPDATE {} SET ",
            self.dialect.quote_table(&primary.qualified_real_name())
        ));

        let mut first = true;
        for property in updatable {
            if !first {
                template.push_lit(", ");
            }
            first = false;

            template.push_lit(format!("{} = ", self.dialect.quote(&property.field_name)));
            ValueSlot::Pattern {
                pattern: property.update_pattern.clone(),
                parameter: property.name.clone(),
                unified: property.unified_type,
            }
            .push_to(&mut template);
        }

        self.push_pk_where(&mut template, model, false, false);

        Ok(Some(template))
    }

    fn delete_by_pk(&self, model: &SchemaModel) -> SqlTemplate {
        let primary = model.primary_table();
        let mut template = self.new_template();
        template.push_lit(format!(
            "DELETE FROM {}",
            self.dialect.quote_table(&primary.qualified_real_name())
        ));
        self.push_pk_where(&mut template, model, false, false);

        template
    }

    //
    // methods
    //

    fn method_plan(
        &self,
        model: &SchemaModel,
        method: &Method,
        from: &str,
        join_where: Option<&str>,
    ) -> Result<MethodPlan, GenerateError> {
        let template = match method.method_type {
            MethodType::Select | MethodType::SelectFirst => {
                self.select_method(model, method, from, join_where)?
            }
            MethodType::Count => self.count_method(model, method, from, join_where)?,
            MethodType::Update => self.update_method(model, method)?,
            MethodType::Delete => self.delete_method(model, method)?,
            MethodType::RawSql => self.call_method(method),
        };

        Ok(MethodPlan {
            name: method.name.clone(),
            kind: method.method_type,
            parameters: method
                .parameters
                .iter()
                .map(|p| PlanParameter {
                    name: p.name.clone(),
                    default: p.default.clone(),
                })
                .collect(),
            template,
            event_before: method.event_before,
            event_after: method.event_after,
        })
    }

    fn select_method(
        &self,
        model: &SchemaModel,
        method: &Method,
        from: &str,
        join_where: Option<&str>,
    ) -> Result<SqlTemplate, GenerateError> {
        let mut template = self.new_template();
        let head = if method.distinct { "SELECT DISTINCT" } else { "SELECT" };
        template.push_lit(format!("{head} {} FROM {from}", self.select_fields(model)));

        self.push_method_where(&mut template, model, method, join_where, true)?;
        self.push_order(&mut template, model, method);

        match (&method.limit, method.method_type) {
            (Some(limit), _) => {
                template.push(Frag::Limit {
                    offset: limit_bind(&limit.offset),
                    count: limit_bind(&limit.count),
                });
            }
            (None, MethodType::SelectFirst) => {
                template.push(Frag::Limit {
                    offset: LimitBind::Literal(0),
                    count: LimitBind::Literal(1),
                });
            }
            _ => {}
        }

        Ok(template)
    }

    fn count_method(
        &self,
        model: &SchemaModel,
        method: &Method,
        from: &str,
        join_where: Option<&str>,
    ) -> Result<SqlTemplate, GenerateError> {
        let mut template = self.new_template();

        match &method.distinct_property {
            Some(name) => {
                let property = model
                    .property(name)
                    .unwrap_or_else(|| unreachable!("parser validated the counted property"));
                if !property.is_selectable() {
                    return Err(GenerateError::UnselectableProperty {
                        method: method.name.clone(),
                        property: property.name.clone(),
                    });
                }
                let column = self.qualified_column(property);

                if self.dialect.info().count_distinct_subselect {
                    template.push_lit(format!(
                        "SELECT COUNT(*) FROM (SELECT DISTINCT {column} FROM {from}"
                    ));
                    self.push_method_where(&mut template, model, method, join_where, true)?;
                    template.push_lit(format!(
                        "){}{}",
                        self.dialect.info().alias_keyword,
                        self.dialect.quote("counted")
                    ));
                    return Ok(template);
                }

                template.push_lit(format!("SELECT COUNT(DISTINCT {column}) FROM {from}"));
            }
            None => template.push_lit(format!("SELECT COUNT(*) FROM {from}")),
        }

        self.push_method_where(&mut template, model, method, join_where, true)?;

        Ok(template)
    }

    fn update_method(
        &self,
        model: &SchemaModel,
        method: &Method,
    ) -> Result<SqlTemplate, GenerateError> {
        let primary = model.primary_table();
        let mut template = self.new_template();
        template.push_lit(format!(
            "UPDATE {} SET ",
            self.dialect.quote_table(&primary.qualified_real_name())
        ));

        for (i, value) in method.values.iter().enumerate() {
            let property = model
                .property(&value.property)
                .unwrap_or_else(|| unreachable!("parser validated update targets"));

            if i > 0 {
                template.push_lit(", ");
            }
            template.push_lit(format!("{} = ", self.dialect.quote(&property.field_name)));

            if let Some(expr) = &value.expr {
                push_expr(&mut template, expr, property.unified_type, false);
            } else {
                let raw = value.value.clone().unwrap_or_default();
                let literal = self
                    .dialect
                    .escape_value(
                        property.unified_type,
                        &Value::Text(raw.clone()),
                        false,
                        &property.name,
                    )
                    .map_err(|_| GenerateError::BadConditionValue {
                        property: property.name.clone(),
                        value: raw,
                    })?;
                template.push_lit(literal);
            }
        }

        self.push_method_where(&mut template, model, method, None, false)?;

        Ok(template)
    }

    fn delete_method(
        &self,
        model: &SchemaModel,
        method: &Method,
    ) -> Result<SqlTemplate, GenerateError> {
        let primary = model.primary_table();
        let mut template = self.new_template();
        template.push_lit(format!(
            "DELETE FROM {}",
            self.dialect.quote_table(&primary.qualified_real_name())
        ));
        self.push_method_where(&mut template, model, method, None, false)?;

        Ok(template)
    }

    fn call_method(&self, method: &Method) -> SqlTemplate {
        let mut template = self.new_template();
        let procedure = method.procedure_call.clone().unwrap_or_default();

        let mut args = SqlTemplate::new(self.dialect);
        for (i, parameter) in method.parameters.iter().enumerate() {
            if i > 0 {
                args.push_lit(", ");
            }
            args.push(Frag::Value {
                parameter: parameter.name.clone(),
                unified: UnifiedType::Varchar,
                for_like: false,
            });
        }

        match self.dialect {
            Dialect::Pgsql => {
                template.push_lit(format!("SELECT * FROM {procedure}("));
                template.append(args);
                template.push_lit(")");
            }
            Dialect::Sqlsrv => {
                template.push_lit(format!("EXEC {procedure} "));
                template.append(args);
            }
            Dialect::Oci => {
                template.push_lit(format!("BEGIN {procedure}("));
                template.append(args);
                template.push_lit("); END;");
            }
            Dialect::Mysql | Dialect::Sqlite => {
                template.push_lit(format!("CALL {procedure}("));
                template.append(args);
                template.push_lit(")");
            }
        }

        template
    }

    fn push_method_where(
        &self,
        template: &mut SqlTemplate,
        model: &SchemaModel,
        method: &Method,
        join_where: Option<&str>,
        qualify: bool,
    ) -> Result<(), GenerateError> {
        let ctx = ConditionContext {
            dialect: self.dialect,
            model,
            qualify,
        };
        let root = method.conditions.root();
        let has_conditions = ctx.has_output(root);

        match (join_where, has_conditions) {
            (Some(joins), true) => {
                template.push_lit(format!(" WHERE {joins} AND ("));
                ctx.push_tree(root, template)?;
                template.push_lit(")");
            }
            (Some(joins), false) => template.push_lit(format!(" WHERE {joins}")),
            (None, true) => {
                template.push_lit(" WHERE ");
                ctx.push_tree(root, template)?;
            }
            (None, false) => {}
        }

        Ok(())
    }

    fn push_order(&self, template: &mut SqlTemplate, model: &SchemaModel, method: &Method) {
        if method.conditions.order.is_empty() {
            return;
        }

        template.push_lit(" ORDER BY ");
        for (i, item) in method.conditions.order.iter().enumerate() {
            if i > 0 {
                template.push_lit(", ");
            }

            if let Some(parameter) = item.property.strip_prefix('$') {
                let choices: BTreeMap<String, String> = model
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), self.qualified_column(p)))
                    .collect();
                template.push(Frag::OrderField {
                    parameter: parameter.to_string(),
                    choices,
                });
            } else {
                let property = model
                    .property(&item.property)
                    .unwrap_or_else(|| unreachable!("parser validated order properties"));
                template.push_lit(self.qualified_column(property));
            }

            template.push_lit(" ");
            match &item.direction {
                OrderDirection::Asc => template.push_lit("ASC"),
                OrderDirection::Desc => template.push_lit("DESC"),
                OrderDirection::Param(parameter) => template.push(Frag::OrderDirection {
                    parameter: parameter.clone(),
                }),
            }
        }
    }

    //
    // record metadata
    //

    fn record_property(&self, property: &Property) -> RecordProperty {
        let modifier = if property.unified_type == UnifiedType::Json {
            Some(RecordModifier::DecodeJson)
        } else if property.unified_type.is_binary() && self.dialect == Dialect::Pgsql {
            Some(RecordModifier::UnescapeBinary)
        } else {
            None
        };

        RecordProperty {
            name: property.name.clone(),
            field_name: property.field_name.clone(),
            unified: property.unified_type,
            is_pk: property.is_pk,
            required: property.required,
            auto_increment: property.auto_increment,
            min_length: property.min_length,
            max_length: property.max_length,
            regexp: property.regexp.clone(),
            default_value: property.default_value.clone(),
            json_encoder: property.json_encoder.clone(),
            json_decoder: property.json_decoder.clone(),
            modifier,
        }
    }
}

///
/// ValueSlot
///
/// A VALUES/SET entry: either fixed SQL or a parameter slot wrapped in
/// the property's write pattern.
///

enum ValueSlot {
    Lit(String),
    Pattern {
        pattern: String,
        parameter: String,
        unified: UnifiedType,
    },
}

impl ValueSlot {
    fn push_to(&self, template: &mut SqlTemplate) {
        match self {
            Self::Lit(sql) => template.push_lit(sql),
            Self::Pattern {
                pattern,
                parameter,
                unified,
            } => {
                let slot = Frag::Value {
                    parameter: parameter.clone(),
                    unified: *unified,
                    for_like: false,
                };
                match pattern.split_once("%s") {
                    Some((before, after)) => {
                        template.push_lit(before);
                        template.push(slot);
                        template.push_lit(after);
                    }
                    // a pattern without a placeholder is a fixed expression
                    None if !pattern.is_empty() => template.push_lit(pattern),
                    None => template.push(slot),
                }
            }
        }
    }
}

fn limit_bind(part: &LimitPart) -> LimitBind {
    match part {
        LimitPart::Literal(n) => LimitBind::Literal(*n),
        LimitPart::Param(name) => LimitBind::Param(name.clone()),
    }
}
