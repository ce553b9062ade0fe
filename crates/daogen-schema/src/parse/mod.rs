use crate::{
    condition::{CompareOp, Conditions, GlueOp},
    descriptor::{
        ConditionLeafDecl, ConditionNode, ConditionsDecl, Datasource, Descriptor, LimitDecl,
        MethodDecl, PropertyDecl, TableDecl, ValueDecl,
    },
    error::{ParseError, ParseErrorKind, SchemaIdentity},
    node::{
        LimitClause, LimitPart, Method, MethodType, Parameter, Property, SchemaModel, Table,
        TableUsage, UpdateValue,
    },
    types::{JsonCodec, UnifiedType},
};
use std::collections::HashSet;

///
/// Descriptor parser
///
/// Resolves a raw [`Descriptor`] into a validated [`SchemaModel`]. All
/// structural and semantic checks happen here; the generator can assume a
/// model it receives is internally consistent. Failures are fatal and
/// carry the stable numeric codes of [`ParseErrorKind`].
///

const MAX_IMPORT_DEPTH: usize = 8;

///
/// TypeMapper
///
/// Maps a raw column datatype name onto a portable type category. Dialect
/// strategies provide their own mapping; [`DefaultTypeMapper`] covers the
/// common names shared by every supported database.
///

pub trait TypeMapper {
    fn unified_type(&self, datatype: &str) -> Option<UnifiedType>;
}

///
/// DefaultTypeMapper
///

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTypeMapper;

impl TypeMapper for DefaultTypeMapper {
    fn unified_type(&self, datatype: &str) -> Option<UnifiedType> {
        let ty = match datatype.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "serial"
            | "bigserial" | "autoincrement" | "bigautoincrement" | "number" => {
                UnifiedType::Integer
            }
            "float" | "double" | "real" | "numeric" | "decimal" | "money" => UnifiedType::Numeric,
            "bool" | "boolean" | "bit" => UnifiedType::Boolean,
            "varchar" | "varchar2" | "char" | "character" | "nvarchar" | "name" | "string" => {
                UnifiedType::Varchar
            }
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" | "nclob" | "ntext" => {
                UnifiedType::Text
            }
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" | "bytea"
            | "image" => UnifiedType::Binary,
            "date" | "time" | "datetime" | "timestamp" | "utcdatetime" | "utctimestamp" => {
                UnifiedType::Datetime
            }
            "json" | "jsonb" => UnifiedType::Json,
            _ => return None,
        };

        Some(ty)
    }
}

///
/// ImportResolver
///
/// Loads the parent descriptor named by an `import` directive. The
/// facade crate wires this to the schema search path; tests use in-memory
/// maps.
///

pub trait ImportResolver {
    fn resolve(&self, logical_name: &str) -> Result<(SchemaIdentity, Descriptor), String>;
}

///
/// NoImports
///
/// Resolver for contexts where import directives are not available.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&self, logical_name: &str) -> Result<(SchemaIdentity, Descriptor), String> {
        Err(format!("no resolver available for import \"{logical_name}\""))
    }
}

///
/// Parser
///

pub struct Parser<'a> {
    identity: SchemaIdentity,
    types: &'a dyn TypeMapper,
    imports: &'a dyn ImportResolver,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(
        identity: SchemaIdentity,
        types: &'a dyn TypeMapper,
        imports: &'a dyn ImportResolver,
    ) -> Self {
        Self {
            identity,
            types,
            imports,
        }
    }

    /// Parse a JSON descriptor body into a validated model.
    pub fn parse_str(&self, body: &str) -> Result<SchemaModel, ParseError> {
        let descriptor: Descriptor =
            serde_json::from_str(body).map_err(|e| {
                self.err(ParseErrorKind::MalformedDescriptor {
                    reason: e.to_string(),
                })
            })?;

        self.parse(descriptor)
    }

    pub fn parse(&self, descriptor: Descriptor) -> Result<SchemaModel, ParseError> {
        let (merged, imported_from) = self.resolve_imports(descriptor)?;

        let mut model = SchemaModel {
            identity: self.identity.clone(),
            imported_from,
            ..SchemaModel::default()
        };

        self.parse_datasource(&merged, &mut model)?;
        self.parse_record(&merged, &mut model)?;
        self.parse_factory(&merged, &mut model)?;

        Ok(model)
    }

    //
    // imports
    //

    /// Walk the import chain. Inherited declarations seed each section and
    /// local declarations layer on top: a table, property or method with
    /// the same name replaces the inherited one in place, new names append.
    fn resolve_imports(
        &self,
        descriptor: Descriptor,
    ) -> Result<(Descriptor, Vec<String>), ParseError> {
        let mut chain = Vec::new();
        let mut merged = descriptor;
        let mut depth = 0;

        while let Some(parent_name) = merged.import.take() {
            depth += 1;
            if depth > MAX_IMPORT_DEPTH {
                return Err(self.err(ParseErrorKind::UnreadableDescriptor {
                    reason: format!("import chain exceeds {MAX_IMPORT_DEPTH} levels"),
                }));
            }
            if chain.contains(&parent_name) {
                return Err(self.err(ParseErrorKind::UnreadableDescriptor {
                    reason: format!("import cycle through \"{parent_name}\""),
                }));
            }

            let (_, mut parent) = self.imports.resolve(&parent_name).map_err(|reason| {
                self.err(ParseErrorKind::UnreadableDescriptor { reason })
            })?;
            chain.push(parent_name);

            merged.import = parent.import.take();
            merge_under(&mut merged, parent);
        }

        Ok((merged, chain))
    }

    //
    // datasource
    //

    fn parse_datasource(
        &self,
        descriptor: &Descriptor,
        model: &mut SchemaModel,
    ) -> Result<(), ParseError> {
        let Some(ds) = &descriptor.datasource else {
            return Err(self.err(ParseErrorKind::MissingPrimaryTable));
        };

        let primary = self.parse_table(&ds.primary_table, TableUsage::Primary)?;
        if primary.primary_key.is_empty() {
            return Err(self.err(ParseErrorKind::MissingPrimaryKey));
        }
        model.tables.push(primary);

        for decl in &ds.foreign_tables {
            model.tables.push(self.parse_table(decl, TableUsage::InnerJoined)?);
        }
        for decl in &ds.optional_foreign_tables {
            model.tables.push(self.parse_table(decl, TableUsage::OuterJoined)?);
        }

        let mut seen = HashSet::new();
        for table in &model.tables {
            if !seen.insert(table.name.clone()) {
                return Err(self.err(ParseErrorKind::MalformedDescriptor {
                    reason: format!("table \"{}\" declared twice", table.name),
                }));
            }
        }

        Ok(())
    }

    fn parse_table(&self, decl: &TableDecl, usage: TableUsage) -> Result<Table, ParseError> {
        if decl.name.trim().is_empty() {
            return Err(self.err(ParseErrorKind::MissingTableName));
        }

        if !usage.is_primary() {
            if decl.primary_key.is_empty() {
                return Err(self.err(ParseErrorKind::MissingPrimaryKey));
            }
            if decl.on_foreign_key.is_empty()
                || decl.on_foreign_key.len() != decl.primary_key.len()
            {
                return Err(self.err(ParseErrorKind::BadForeignKey));
            }
        }

        Ok(Table {
            name: decl.name.clone(),
            real_name: decl.realname.clone().unwrap_or_else(|| decl.name.clone()),
            schema: decl.schema.clone(),
            primary_key: decl.primary_key.clone(),
            foreign_keys: decl.on_foreign_key.clone(),
            usage,
            fields: Vec::new(),
        })
    }

    //
    // record
    //

    fn parse_record(
        &self,
        descriptor: &Descriptor,
        model: &mut SchemaModel,
    ) -> Result<(), ParseError> {
        let Some(record) = &descriptor.record else {
            return Err(self.err(ParseErrorKind::NoProperties));
        };
        if record.properties.is_empty() {
            return Err(self.err(ParseErrorKind::NoProperties));
        }

        model.record_extends = record.extends.clone();

        // foreign-key columns of the primary table, across all joins,
        // matched case-insensitively like primary keys
        let fk_fields: HashSet<String> = model
            .tables
            .iter()
            .filter(|t| !t.usage.is_primary())
            .flat_map(|t| t.foreign_keys.iter())
            .map(|f| f.to_ascii_lowercase())
            .collect();

        for decl in &record.properties {
            let property = self.parse_property(decl, model, &fk_fields)?;

            if model.property(&property.name).is_some() {
                return Err(self.err(ParseErrorKind::DuplicateProperty {
                    property: property.name,
                }));
            }

            let table = model
                .tables
                .iter_mut()
                .find(|t| t.name == property.table)
                .unwrap_or_else(|| unreachable!("table resolved above"));
            table.fields.push(property.name.clone());

            model.properties.push(property);
        }

        Ok(())
    }

    fn parse_property(
        &self,
        decl: &PropertyDecl,
        model: &SchemaModel,
        fk_fields: &HashSet<String>,
    ) -> Result<Property, ParseError> {
        if !is_identifier(&decl.name) {
            return Err(self.err(ParseErrorKind::BadPropertyName {
                property: decl.name.clone(),
            }));
        }

        let primary_name = model.primary_table().name.clone();
        let table_name = decl.table.clone().unwrap_or(primary_name);
        let Some(table) = model.table(&table_name) else {
            return Err(self.err(ParseErrorKind::UnknownTableOnProperty {
                table: table_name,
                property: decl.name.clone(),
            }));
        };
        let of_primary_table = table.usage.is_primary();

        let datatype = decl.datatype.clone().unwrap_or_default();
        if datatype.trim().is_empty() {
            return Err(self.err(ParseErrorKind::MissingDatatype {
                property: decl.name.clone(),
            }));
        }
        let Some(unified_type) = self.types.unified_type(&datatype) else {
            return Err(self.err(ParseErrorKind::UnknownDatatype {
                datatype,
                property: decl.name.clone(),
            }));
        };

        let field_name = decl.fieldname.clone().unwrap_or_else(|| decl.name.clone());
        let is_pk = of_primary_table && table.is_pk_field(&field_name);
        let is_fk = of_primary_table && fk_fields.contains(&field_name.to_ascii_lowercase());

        let auto_increment = truthy(decl.autoincrement.as_ref())
            || matches!(
                datatype.to_ascii_lowercase().as_str(),
                "autoincrement" | "bigautoincrement" | "serial" | "bigserial"
            );
        if auto_increment && !unified_type.is_numeric() {
            return Err(self.err(ParseErrorKind::NonNumericAutoIncrement {
                property: decl.name.clone(),
            }));
        }

        let declared_required = truthy(decl.required.as_ref());
        let (required, required_in_conditions) = if auto_increment {
            (false, true)
        } else {
            (declared_required, declared_required || is_pk)
        };

        let json_encoder = self.parse_codec(decl.jsonencoder.as_deref())?;
        let json_decoder = self.parse_codec(decl.jsondecoder.as_deref())?;

        let write_pattern = |pattern: &Option<String>| {
            if of_primary_table {
                pattern.clone().unwrap_or_else(|| "%s".to_string())
            } else {
                String::new()
            }
        };
        // primary keys are never rewritten by updates, whatever the
        // descriptor declares
        let update_pattern = if is_pk {
            String::new()
        } else {
            write_pattern(&decl.updatepattern)
        };

        Ok(Property {
            name: decl.name.clone(),
            field_name,
            table: table_name,
            datatype,
            unified_type,
            is_pk,
            is_fk,
            of_primary_table,
            required,
            required_in_conditions,
            auto_increment,
            sequence_name: decl.sequence.clone(),
            min_length: decl.minlength,
            max_length: decl.maxlength,
            regexp: decl.regexp.clone(),
            default_value: decl.default.as_ref().map(scalar_to_string),
            select_pattern: decl
                .selectpattern
                .clone()
                .unwrap_or_else(|| "%s".to_string()),
            insert_pattern: write_pattern(&decl.insertpattern),
            update_pattern,
            json_encoder,
            json_decoder,
            comment: decl.comment.clone(),
        })
    }

    fn parse_codec(&self, directive: Option<&str>) -> Result<Option<JsonCodec>, ParseError> {
        match directive {
            None => Ok(None),
            Some(d) => JsonCodec::parse(d).map_err(|e| self.err(ParseErrorKind::JsonCodec(e))),
        }
    }

    //
    // factory
    //

    fn parse_factory(
        &self,
        descriptor: &Descriptor,
        model: &mut SchemaModel,
    ) -> Result<(), ParseError> {
        let Some(factory) = &descriptor.factory else {
            return Ok(());
        };

        model.events = factory.events.clone();

        for decl in &factory.methods {
            let method = self.parse_method(decl, model)?;
            if model.method(&method.name).is_some() {
                return Err(self.err(ParseErrorKind::DuplicateMethod {
                    method: method.name,
                }));
            }
            model.methods.push(method);
        }

        Ok(())
    }

    #[expect(clippy::too_many_lines)]
    fn parse_method(&self, decl: &MethodDecl, model: &SchemaModel) -> Result<Method, ParseError> {
        let name = decl.name.clone();

        if decl.body.is_some() {
            return Err(self.err(ParseErrorKind::UnsupportedBodyMethod { method: name }));
        }

        let type_token = decl.r#type.as_deref().unwrap_or("select");
        let Some(method_type) = MethodType::parse(type_token) else {
            return Err(self.err(ParseErrorKind::MalformedDescriptor {
                reason: format!("unknown type \"{type_token}\" on method \"{name}\""),
            }));
        };

        if method_type == MethodType::RawSql
            && decl.call.as_deref().is_none_or(|c| c.trim().is_empty())
        {
            return Err(self.err(ParseErrorKind::MissingProcedureCall { method: name }));
        }

        let mut parameters = Vec::with_capacity(decl.parameters.len());
        for param in &decl.parameters {
            if param.name.trim().is_empty() {
                return Err(self.err(ParseErrorKind::MissingParameterName { method: name }));
            }
            if param.name.contains('$') {
                return Err(self.err(ParseErrorKind::BadParameterName {
                    method: name,
                    parameter: param.name.clone(),
                }));
            }
            parameters.push(Parameter {
                name: param.name.clone(),
                default: param.default.as_ref().map(scalar_to_string),
            });
        }

        let mut method = Method {
            name,
            method_type,
            parameters,
            procedure_call: decl.call.clone(),
            event_before: decl.eventbefore.unwrap_or(false),
            event_after: decl.eventafter.unwrap_or(false),
            ..Method::default()
        };

        // distinct: a flag on selects, a counted property on counts
        if let Some(distinct) = &decl.distinct {
            match method_type {
                MethodType::Select => method.distinct = truthy(Some(distinct)),
                MethodType::Count => {
                    let property = scalar_to_string(distinct);
                    if model.property(&property).is_none() {
                        return Err(self.err(ParseErrorKind::UnknownProperty {
                            method: method.name,
                            property,
                        }));
                    }
                    method.distinct = true;
                    method.distinct_property = Some(property);
                }
                _ => {
                    return Err(self.err(ParseErrorKind::DistinctNotAllowed {
                        method: method.name,
                    }));
                }
            }
        }

        if let Some(conds) = &decl.conditions {
            method.conditions = self.parse_conditions(conds, &method, model)?;
        }

        for order in &decl.order {
            let Some(property) = order.property.as_deref().filter(|p| !p.trim().is_empty())
            else {
                return Err(self.err(ParseErrorKind::MissingOrderProperty {
                    method: method.name,
                }));
            };

            if let Some(param) = property.strip_prefix('$') {
                if !method.has_parameter(param) {
                    return Err(self.err(ParseErrorKind::UnknownOrderParameter {
                        method: method.name,
                        parameter: param.to_string(),
                    }));
                }
            } else if model.property(property).is_none() {
                return Err(self.err(ParseErrorKind::UnknownOrderProperty {
                    method: method.name,
                    property: property.to_string(),
                }));
            }

            let way = order.way.as_deref().unwrap_or("asc");
            if let Some(param) = way.strip_prefix('$') {
                if !method.has_parameter(param) {
                    return Err(self.err(ParseErrorKind::UnknownOrderParameter {
                        method: method.name,
                        parameter: param.to_string(),
                    }));
                }
            }
            method
                .conditions
                .add_item_order(property, way, way.starts_with('$'))
                .map_err(|e| self.err(ParseErrorKind::Condition(e)))?;
        }

        if let Some(limit) = &decl.limit {
            if !method_type.is_select_like() {
                return Err(self.err(ParseErrorKind::LimitOnNonSelect {
                    method: method.name,
                }));
            }
            method.limit = Some(self.parse_limit(limit, &method)?);
        }

        if method_type == MethodType::Update {
            if model.has_only_primary_keys() {
                return Err(self.err(ParseErrorKind::UpdateOnPkOnlyTable {
                    method: method.name,
                }));
            }
            if decl.values.is_empty() {
                return Err(self.err(ParseErrorKind::MissingUpdateValues {
                    method: method.name,
                }));
            }
            for value in &decl.values {
                method.values.push(self.parse_update_value(value, &method, model)?);
            }
        }

        Ok(method)
    }

    fn parse_limit(&self, decl: &LimitDecl, method: &Method) -> Result<LimitClause, ParseError> {
        let part = |raw: &serde_json::Value| -> Result<LimitPart, ParseError> {
            let text = scalar_to_string(raw);
            if let Some(param) = text.strip_prefix('$') {
                if !method.has_parameter(param) {
                    return Err(self.err(ParseErrorKind::UnknownLimitParameter {
                        method: method.name.clone(),
                        parameter: param.to_string(),
                    }));
                }
                return Ok(LimitPart::Param(param.to_string()));
            }
            text.trim().parse::<u64>().map(LimitPart::Literal).map_err(|_| {
                self.err(ParseErrorKind::BadLimitValue {
                    method: method.name.clone(),
                    value: text,
                })
            })
        };

        Ok(LimitClause {
            offset: part(&decl.offset)?,
            count: part(&decl.count)?,
        })
    }

    fn parse_update_value(
        &self,
        decl: &ValueDecl,
        method: &Method,
        model: &SchemaModel,
    ) -> Result<UpdateValue, ParseError> {
        let Some(property) = model.property(&decl.property) else {
            return Err(self.err(ParseErrorKind::UnknownProperty {
                method: method.name.clone(),
                property: decl.property.clone(),
            }));
        };
        if !property.of_primary_table {
            return Err(self.err(ParseErrorKind::ValueOnForeignProperty {
                method: method.name.clone(),
                property: decl.property.clone(),
            }));
        }
        if property.is_pk {
            return Err(self.err(ParseErrorKind::ValueOnPrimaryKey {
                method: method.name.clone(),
                property: decl.property.clone(),
            }));
        }
        if decl.value.is_some() && decl.expr.is_some() {
            return Err(self.err(ParseErrorKind::ValueAndExpr {
                method: method.name.clone(),
                op: "value".to_string(),
            }));
        }

        Ok(UpdateValue {
            property: decl.property.clone(),
            value: decl.value.as_ref().map(scalar_to_string),
            expr: decl.expr.clone(),
        })
    }

    //
    // conditions
    //

    fn parse_conditions(
        &self,
        decl: &ConditionsDecl,
        method: &Method,
        model: &SchemaModel,
    ) -> Result<Conditions, ParseError> {
        let glue = self.parse_glue(decl.logic.as_deref(), method)?;
        let mut conditions = Conditions::new(glue);

        for item in &decl.items {
            self.parse_condition_node(item, method, model, &mut conditions)?;
        }

        Ok(conditions)
    }

    fn parse_condition_node(
        &self,
        node: &ConditionNode,
        method: &Method,
        model: &SchemaModel,
        conditions: &mut Conditions,
    ) -> Result<(), ParseError> {
        match node {
            ConditionNode::Group(group) => {
                let glue = self.parse_glue(group.logic.as_deref(), method)?;
                conditions.start_group(glue);
                for item in &group.items {
                    self.parse_condition_node(item, method, model, conditions)?;
                }
                conditions.end_group();
                Ok(())
            }
            ConditionNode::Leaf(leaf) => self.parse_condition_leaf(leaf, method, model, conditions),
        }
    }

    fn parse_condition_leaf(
        &self,
        leaf: &ConditionLeafDecl,
        method: &Method,
        model: &SchemaModel,
        conditions: &mut Conditions,
    ) -> Result<(), ParseError> {
        // `binary_op` requires the operator token in a separate field
        let op_token = if matches!(leaf.op.as_str(), "binary_op" | "binaryop") {
            leaf.operator.as_deref().filter(|o| !o.trim().is_empty()).ok_or_else(|| {
                self.err(ParseErrorKind::MissingCustomOperator {
                    method: method.name.clone(),
                    op: leaf.op.clone(),
                })
            })?
        } else {
            leaf.op.as_str()
        };

        let op = CompareOp::parse(op_token).map_err(|_| {
            self.err(ParseErrorKind::UnknownConditionOp {
                method: method.name.clone(),
                op: op_token.to_string(),
            })
        })?;

        let Some(property_name) = leaf.property.as_deref().filter(|p| !p.trim().is_empty())
        else {
            return Err(self.err(ParseErrorKind::UnknownProperty {
                method: method.name.clone(),
                property: String::new(),
            }));
        };
        let Some(property) = model.property(property_name) else {
            return Err(self.err(ParseErrorKind::UnknownProperty {
                method: method.name.clone(),
                property: property_name.to_string(),
            }));
        };
        if method.method_type.is_mutation() && !property.of_primary_table {
            return Err(self.err(ParseErrorKind::ConditionOnForeignProperty {
                method: method.name.clone(),
            }));
        }

        let has_value = leaf.value.is_some();
        let has_expr = leaf.expr.as_deref().is_some_and(|e| !e.trim().is_empty());

        if op.is_null_test() {
            if has_value || has_expr {
                return Err(self.err(ParseErrorKind::ValueOnNullTest {
                    method: method.name.clone(),
                    op: op.as_sql().to_string(),
                }));
            }
        } else {
            if has_value && has_expr {
                return Err(self.err(ParseErrorKind::ValueAndExpr {
                    method: method.name.clone(),
                    op: op.as_sql().to_string(),
                }));
            }
            if !has_value && !has_expr {
                return Err(self.err(ParseErrorKind::MissingConditionValue {
                    method: method.name.clone(),
                    op: op.as_sql().to_string(),
                }));
            }
        }

        if op.is_set_membership() && has_expr {
            let expr = leaf.expr.as_deref().unwrap_or_default().trim();
            let is_simple_param = expr
                .strip_prefix('$')
                .is_some_and(|rest| is_identifier(rest));
            if !is_simple_param {
                return Err(self.err(ParseErrorKind::BadInExpression {
                    method: method.name.clone(),
                }));
            }
        }

        let value = if has_expr {
            leaf.expr.clone().unwrap_or_default()
        } else {
            leaf.value.as_ref().map(scalar_to_string).unwrap_or_default()
        };

        conditions
            .add_condition(
                property_name,
                op.as_sql(),
                value,
                leaf.pattern.clone().unwrap_or_default(),
                has_expr,
                leaf.dbtype.clone(),
            )
            .map_err(|e| self.err(ParseErrorKind::Condition(e)))
    }

    fn parse_glue(&self, logic: Option<&str>, method: &Method) -> Result<GlueOp, ParseError> {
        match logic {
            None => Ok(GlueOp::And),
            Some(token) => GlueOp::parse(token).map_err(|_| {
                self.err(ParseErrorKind::UnknownConditionOp {
                    method: method.name.clone(),
                    op: token.to_string(),
                })
            }),
        }
    }

    fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.identity.clone())
    }
}

/// Layer a descriptor over the parent it imports.
fn merge_under(child: &mut Descriptor, parent: Descriptor) {
    match (&mut child.datasource, parent.datasource) {
        (ds @ None, inherited) => *ds = inherited,
        (Some(ds), Some(inherited)) => merge_datasource(ds, inherited),
        (Some(_), None) => {}
    }

    match (&mut child.record, parent.record) {
        (record @ None, inherited) => *record = inherited,
        (Some(record), Some(inherited)) => {
            if record.extends.is_none() {
                record.extends = inherited.extends;
            }
            let local = std::mem::take(&mut record.properties);
            record.properties = layer_by_name(inherited.properties, local, |p| &p.name);
        }
        (Some(_), None) => {}
    }

    match (&mut child.factory, parent.factory) {
        (factory @ None, inherited) => *factory = inherited,
        (Some(factory), Some(inherited)) => {
            for event in inherited.events {
                if !factory.events.contains(&event) {
                    factory.events.push(event);
                }
            }
            let local = std::mem::take(&mut factory.methods);
            factory.methods = layer_by_name(inherited.methods, local, |m| &m.name);
        }
        (Some(_), None) => {}
    }
}

/// A local datasource redeclares the primary table; inherited join tables
/// survive unless redeclared (or shadowed by the new primary alias).
fn merge_datasource(ds: &mut Datasource, inherited: Datasource) {
    let local_names: HashSet<String> = ds
        .foreign_tables
        .iter()
        .chain(&ds.optional_foreign_tables)
        .map(|t| t.name.clone())
        .chain([ds.primary_table.name.clone()])
        .collect();

    let keep = |tables: Vec<TableDecl>| -> Vec<TableDecl> {
        tables
            .into_iter()
            .filter(|t| !local_names.contains(&t.name))
            .collect()
    };

    let mut foreign = keep(inherited.foreign_tables);
    foreign.append(&mut ds.foreign_tables);
    ds.foreign_tables = foreign;

    let mut optional = keep(inherited.optional_foreign_tables);
    optional.append(&mut ds.optional_foreign_tables);
    ds.optional_foreign_tables = optional;
}

fn layer_by_name<T>(inherited: Vec<T>, local: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut merged = inherited;
    for item in local {
        match merged.iter().position(|m| name(m) == name(&item)) {
            Some(i) => merged[i] = item,
            None => merged.push(item),
        }
    }
    merged
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render a descriptor scalar as its string spelling.
fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Descriptor truthiness: `true`, `"true"`, `"1"`, `"yes"`, nonzero.
fn truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_i64().is_some_and(|i| i != 0),
        Some(serde_json::Value::String(s)) => matches!(s.trim(), "true" | "1" | "yes"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<SchemaModel, ParseError> {
        let identity = SchemaIdentity::new("products", "products.dao.json");
        Parser::new(identity, &DefaultTypeMapper, &NoImports).parse_str(body)
    }

    fn products_descriptor() -> String {
        r#"{
            "datasource": {
                "primary_table": {
                    "name": "p", "realname": "products", "primary_key": ["id"]
                },
                "foreign_tables": [
                    { "name": "c", "realname": "categories",
                      "primary_key": ["id"], "on_foreign_key": ["category_id"] }
                ]
            },
            "record": {
                "properties": [
                    { "name": "id", "datatype": "autoincrement" },
                    { "name": "category_id", "datatype": "integer", "required": true },
                    { "name": "name", "datatype": "varchar", "required": true, "maxlength": 150 },
                    { "name": "price", "datatype": "decimal" },
                    { "name": "category_label", "table": "c", "fieldname": "label",
                      "datatype": "varchar" }
                ]
            },
            "factory": {
                "methods": [
                    {
                        "name": "findByName", "type": "select",
                        "parameters": [ { "name": "pattern" } ],
                        "conditions": {
                            "logic": "AND",
                            "items": [
                                { "op": "LIKE", "property": "name", "expr": "$pattern" }
                            ]
                        },
                        "order": [ { "property": "name", "way": "asc" } ]
                    },
                    {
                        "name": "countCategories", "type": "count",
                        "distinct": "category_id"
                    }
                ]
            }
        }"#
        .to_string()
    }

    #[test]
    fn full_descriptor_resolves() {
        let model = parse(&products_descriptor()).unwrap();

        assert_eq!(model.tables.len(), 2);
        assert_eq!(model.primary_table().real_name, "products");
        assert_eq!(model.properties.len(), 5);
        assert_eq!(model.methods.len(), 2);

        let id = model.property("id").unwrap();
        assert!(id.is_pk && id.auto_increment && !id.required);
        assert!(id.required_in_conditions);

        let label = model.property("category_label").unwrap();
        assert!(!label.of_primary_table);
        assert!(label.insert_pattern.is_empty());

        let fk = model.property("category_id").unwrap();
        assert!(fk.is_fk);

        let find = model.method("findByName").unwrap();
        assert_eq!(find.conditions.order.len(), 1);
        assert_eq!(find.conditions.root().conditions.len(), 1);
        assert!(find.conditions.root().conditions[0].is_expr);

        let count = model.method("countCategories").unwrap();
        assert_eq!(count.distinct_property.as_deref(), Some("category_id"));
    }

    #[test]
    fn missing_primary_key_rejected() {
        let err = parse(
            r#"{
                "datasource": { "primary_table": { "name": "p" } },
                "record": { "properties": [ { "name": "id", "datatype": "integer" } ] }
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), 523);
    }

    #[test]
    fn unknown_datatype_rejected() {
        let err = parse(
            r#"{
                "datasource": { "primary_table": { "name": "p", "primary_key": ["id"] } },
                "record": { "properties": [ { "name": "id", "datatype": "geometry" } ] }
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), 516);
    }

    #[test]
    fn duplicate_property_rejected() {
        let err = parse(
            r#"{
                "datasource": { "primary_table": { "name": "p", "primary_key": ["id"] } },
                "record": { "properties": [
                    { "name": "id", "datatype": "integer" },
                    { "name": "id", "datatype": "integer" }
                ] }
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), 533);
    }

    #[test]
    fn key_fields_match_case_insensitively() {
        let model = parse(
            r#"{
                "datasource": {
                    "primary_table": { "name": "p", "primary_key": ["ID"] },
                    "foreign_tables": [
                        { "name": "c", "primary_key": ["id"],
                          "on_foreign_key": ["CATEGORY_ID"] }
                    ]
                },
                "record": { "properties": [
                    { "name": "id", "datatype": "integer" },
                    { "name": "category_id", "datatype": "integer" }
                ] }
            }"#,
        )
        .unwrap();

        assert!(model.property("id").unwrap().is_pk);
        assert!(model.property("category_id").unwrap().is_fk);
    }

    #[test]
    fn primary_keys_lose_declared_update_patterns() {
        let model = parse(
            r#"{
                "datasource": { "primary_table": { "name": "p", "primary_key": ["id"] } },
                "record": { "properties": [
                    { "name": "id", "datatype": "integer", "updatepattern": "UPPER(%s)" },
                    { "name": "name", "datatype": "varchar", "updatepattern": "LOWER(%s)" }
                ] }
            }"#,
        )
        .unwrap();

        assert_eq!(model.property("id").unwrap().update_pattern, "");
        assert_eq!(model.property("name").unwrap().update_pattern, "LOWER(%s)");
    }

    fn with_methods(methods: &str) -> String {
        format!(
            r#"{{
                "datasource": {{ "primary_table": {{ "name": "p", "primary_key": ["id"] }} }},
                "record": {{ "properties": [
                    {{ "name": "id", "datatype": "integer" }},
                    {{ "name": "name", "datatype": "varchar" }}
                ] }},
                "factory": {{ "methods": [ {methods} ] }}
            }}"#
        )
    }

    #[test]
    fn limit_on_delete_rejected() {
        let err = parse(&with_methods(
            r#"{ "name": "purge", "type": "delete", "limit": { "offset": 0, "count": 5 } }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 544);
    }

    #[test]
    fn limit_parameter_must_be_declared() {
        let err = parse(&with_methods(
            r#"{ "name": "page", "type": "select",
                 "limit": { "offset": 0, "count": "$count" } }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 558);
    }

    #[test]
    fn update_without_values_rejected() {
        let err = parse(&with_methods(r#"{ "name": "touch", "type": "update" }"#)).unwrap_err();
        assert_eq!(err.code(), 543);
    }

    #[test]
    fn update_cannot_target_primary_key() {
        let err = parse(&with_methods(
            r#"{ "name": "renumber", "type": "update",
                 "values": [ { "property": "id", "value": 1 } ] }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 556);
    }

    #[test]
    fn null_test_cannot_carry_a_value() {
        let err = parse(&with_methods(
            r#"{ "name": "findNamed", "type": "select",
                 "conditions": { "items": [
                     { "op": "IS NULL", "property": "name", "value": "x" }
                 ] } }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 550);
    }

    #[test]
    fn in_expression_must_be_a_parameter() {
        let err = parse(&with_methods(
            r#"{ "name": "findIn", "type": "select",
                 "parameters": [ { "name": "ids" } ],
                 "conditions": { "items": [
                     { "op": "IN", "property": "id", "expr": "$ids || DROP" }
                 ] } }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 560);
    }

    #[test]
    fn custom_operator_requires_token() {
        let err = parse(&with_methods(
            r#"{ "name": "overlap", "type": "select",
                 "conditions": { "items": [
                     { "op": "binary_op", "property": "name", "value": "x" }
                 ] } }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 567);
    }

    #[test]
    fn parameter_name_with_dollar_rejected() {
        let err = parse(&with_methods(
            r#"{ "name": "find", "type": "select",
                 "parameters": [ { "name": "$bad" } ] }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 565);
    }

    #[test]
    fn inline_bodies_are_not_supported() {
        let err = parse(&with_methods(
            r#"{ "name": "custom", "type": "select", "body": "return 1;" }"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), 542);
    }

    struct BaseFixture;
    impl ImportResolver for BaseFixture {
        fn resolve(&self, name: &str) -> Result<(SchemaIdentity, Descriptor), String> {
            assert_eq!(name, "base~products");
            let body = r#"{
                "datasource": { "primary_table": { "name": "p", "realname": "products",
                                                   "primary_key": ["id"] } },
                "record": { "properties": [
                    { "name": "id", "datatype": "integer" },
                    { "name": "name", "datatype": "varchar" }
                ] },
                "factory": { "events": [ "insert" ] }
            }"#;
            let descriptor = serde_json::from_str(body).map_err(|e| e.to_string())?;
            Ok((SchemaIdentity::new(name, "base.dao.json"), descriptor))
        }
    }

    fn parse_imported(body: &str) -> SchemaModel {
        let identity = SchemaIdentity::new("products", "products.dao.json");
        Parser::new(identity, &DefaultTypeMapper, &BaseFixture)
            .parse_str(body)
            .unwrap()
    }

    #[test]
    fn import_inherits_absent_sections() {
        let model = parse_imported(
            r#"{
                "import": "base~products",
                "factory": { "methods": [
                    { "name": "findAll", "type": "select" }
                ] }
            }"#,
        );

        assert_eq!(model.imported_from, vec!["base~products".to_string()]);
        assert_eq!(model.primary_table().real_name, "products");
        assert!(model.method("findAll").is_some());
        assert_eq!(model.events, vec!["insert".to_string()]);
    }

    #[test]
    fn import_layers_local_properties_over_inherited_ones() {
        let model = parse_imported(
            r#"{
                "import": "base~products",
                "record": { "properties": [
                    { "name": "name", "datatype": "text" },
                    { "name": "price", "datatype": "decimal" }
                ] }
            }"#,
        );

        let names: Vec<&str> = model.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "price"]);
        assert_eq!(model.primary_table().fields, ["id", "name", "price"]);

        // the redeclaration replaced the inherited property in place
        assert_eq!(model.property("name").unwrap().datatype, "text");
    }

    #[test]
    fn unknown_descriptor_key_is_malformed() {
        let err = parse(
            r#"{
                "datasource": { "primary_table": { "name": "p", "primary_key": ["id"] } },
                "record": { "properties": [ { "name": "id", "datatype": "integer" } ] },
                "generator": {}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), 511);
    }
}
