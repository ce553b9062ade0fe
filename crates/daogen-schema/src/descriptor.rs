use serde::Deserialize;

///
/// Descriptor
///
/// Raw, unresolved JSON shape of a dao descriptor. This is a pure serde
/// layer: it mirrors the on-disk format and performs no cross-reference
/// checking. Resolution into the schema model happens in [`crate::parse`].
///
/// `deny_unknown_fields` everywhere: an unknown key is a descriptor
/// mistake and must fail the parse, not silently disappear.
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Descriptor {
    #[serde(default)]
    pub import: Option<String>,

    #[serde(default)]
    pub datasource: Option<Datasource>,

    #[serde(default)]
    pub record: Option<RecordDecl>,

    #[serde(default)]
    pub factory: Option<FactoryDecl>,
}

///
/// Datasource
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Datasource {
    pub primary_table: TableDecl,

    #[serde(default)]
    pub foreign_tables: Vec<TableDecl>,

    #[serde(default)]
    pub optional_foreign_tables: Vec<TableDecl>,
}

///
/// TableDecl
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDecl {
    pub name: String,

    #[serde(default)]
    pub realname: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub primary_key: Vec<String>,

    #[serde(default)]
    pub on_foreign_key: Vec<String>,
}

///
/// RecordDecl
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDecl {
    /// Custom record class reference, resolved by the schema resolver.
    #[serde(default)]
    pub extends: Option<String>,

    #[serde(default)]
    pub properties: Vec<PropertyDecl>,
}

///
/// PropertyDecl
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDecl {
    pub name: String,

    #[serde(default)]
    pub fieldname: Option<String>,

    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub datatype: Option<String>,

    #[serde(default)]
    pub required: Option<serde_json::Value>,

    #[serde(default)]
    pub minlength: Option<u32>,

    #[serde(default)]
    pub maxlength: Option<u32>,

    #[serde(default)]
    pub regexp: Option<String>,

    #[serde(default)]
    pub sequence: Option<String>,

    #[serde(default)]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub autoincrement: Option<serde_json::Value>,

    #[serde(default)]
    pub selectpattern: Option<String>,

    #[serde(default)]
    pub insertpattern: Option<String>,

    #[serde(default)]
    pub updatepattern: Option<String>,

    #[serde(default)]
    pub jsonencoder: Option<String>,

    #[serde(default)]
    pub jsondecoder: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,
}

///
/// FactoryDecl
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryDecl {
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

///
/// MethodDecl
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDecl {
    pub name: String,

    #[serde(default)]
    pub r#type: Option<String>,

    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,

    #[serde(default)]
    pub distinct: Option<serde_json::Value>,

    #[serde(default)]
    pub eventbefore: Option<bool>,

    #[serde(default)]
    pub eventafter: Option<bool>,

    #[serde(default)]
    pub conditions: Option<ConditionsDecl>,

    #[serde(default)]
    pub order: Vec<OrderDecl>,

    #[serde(default)]
    pub limit: Option<LimitDecl>,

    #[serde(default)]
    pub values: Vec<ValueDecl>,

    /// Stored procedure name, for `sql` methods.
    #[serde(default)]
    pub call: Option<String>,

    /// Inline generated-language body; rejected at parse time.
    #[serde(default)]
    pub body: Option<String>,
}

///
/// ParameterDecl
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterDecl {
    pub name: String,

    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

///
/// ConditionsDecl
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionsDecl {
    #[serde(default)]
    pub logic: Option<String>,

    #[serde(default)]
    pub items: Vec<ConditionNode>,
}

///
/// ConditionNode
///
/// Either a nested group (`{"logic": .., "items": [..]}`) or a leaf
/// condition. Untagged: the presence of `items` discriminates.
///

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Group(ConditionsDecl),
    Leaf(ConditionLeafDecl),
}

///
/// ConditionLeafDecl
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionLeafDecl {
    pub op: String,

    #[serde(default)]
    pub property: Option<String>,

    #[serde(default)]
    pub value: Option<serde_json::Value>,

    #[serde(default)]
    pub expr: Option<String>,

    #[serde(default)]
    pub pattern: Option<String>,

    /// Explicit operator token for `binary_op` leaves.
    #[serde(default)]
    pub operator: Option<String>,

    /// Dialect guard: skip this leaf when compiling another dialect.
    #[serde(default)]
    pub dbtype: Option<String>,
}

///
/// OrderDecl
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderDecl {
    #[serde(default)]
    pub property: Option<String>,

    #[serde(default)]
    pub way: Option<String>,
}

///
/// LimitDecl
///
/// Offset and count may each be a literal number or a `$param` reference.
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitDecl {
    pub offset: serde_json::Value,
    pub count: serde_json::Value,
}

///
/// ValueDecl
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueDecl {
    pub property: String,

    #[serde(default)]
    pub value: Option<serde_json::Value>,

    #[serde(default)]
    pub expr: Option<String>,
}
