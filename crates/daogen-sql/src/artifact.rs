use crate::{dialect::Dialect, template::SqlTemplate};
use daogen_schema::{
    error::SchemaIdentity,
    node::MethodType,
    types::{JsonCodec, UnifiedType},
};
use serde::{Deserialize, Serialize};

///
/// CompiledDao
///
/// The persisted output of compiling one descriptor for one dialect.
/// Self-contained: rendering any statement needs only this struct and the
/// call-time parameters, never the descriptor or the schema model.
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompiledDao {
    pub identity: SchemaIdentity,
    pub dialect: Dialect,

    pub record_extends: Option<String>,
    pub events: Vec<String>,

    pub properties: Vec<RecordProperty>,
    pub primary_key: Vec<String>,

    /// SELECT of all record fields over the full join graph.
    pub select_all: SqlTemplate,
    /// `select_all` restricted to one primary key.
    pub select_by_pk: SqlTemplate,
    pub count_all: SqlTemplate,

    pub insert: InsertPlan,
    /// None when the primary table has only key columns.
    pub update_by_pk: Option<SqlTemplate>,
    pub delete_by_pk: SqlTemplate,

    pub methods: Vec<MethodPlan>,

    /// Descriptor files this artifact was compiled from, outermost import
    /// last, used for freshness checking.
    pub sources: Vec<SourceStamp>,
}

impl CompiledDao {
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodPlan> {
        self.methods.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&RecordProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Artifact file name for a logical dao under a cache directory.
    #[must_use]
    pub fn artifact_file_name(logical_name: &str, dialect: Dialect) -> String {
        format!("{logical_name}.{dialect}.json")
    }
}

///
/// RecordProperty
///
/// Runtime metadata for one record field: enough to validate values
/// before writes and post-process fetched rows.
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordProperty {
    pub name: String,
    pub field_name: String,
    pub unified: UnifiedType,

    pub is_pk: bool,
    pub required: bool,
    pub auto_increment: bool,

    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub regexp: Option<String>,
    pub default_value: Option<String>,

    pub json_encoder: Option<JsonCodec>,
    pub json_decoder: Option<JsonCodec>,

    /// Fix-up applied to the raw fetched value for this dialect.
    pub modifier: Option<RecordModifier>,
}

///
/// RecordModifier
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RecordModifier {
    /// Driver returns escaped binary data that must be unescaped.
    UnescapeBinary,
    /// Column holds a json document to decode through the property codec.
    DecodeJson,
}

///
/// KeyRetrieval
///
/// How to learn the generated primary key after an insert.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum KeyRetrieval {
    /// Key is supplied by the caller.
    None,
    LastInsertId,
    /// Query the sequence's current value after the insert.
    SequenceCurrval { sequence: String },
}

///
/// InsertPlan
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertPlan {
    pub template: SqlTemplate,
    pub key_retrieval: KeyRetrieval,
}

///
/// MethodPlan
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodPlan {
    pub name: String,
    pub kind: MethodType,
    pub parameters: Vec<PlanParameter>,
    pub template: SqlTemplate,
    pub event_before: bool,
    pub event_after: bool,
}

impl MethodPlan {
    /// Merge declared defaults under explicit bindings.
    pub fn apply_defaults(&self, params: &mut crate::template::Params) {
        for parameter in &self.parameters {
            if params.contains_key(&parameter.name) {
                continue;
            }
            if let Some(default) = &parameter.default {
                params.set(
                    parameter.name.clone(),
                    daogen_schema::value::Value::Text(default.clone()),
                );
            }
        }
    }
}

///
/// PlanParameter
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanParameter {
    pub name: String,
    pub default: Option<String>,
}

///
/// SourceStamp
///
/// A descriptor path and its modification time at compile time, in whole
/// seconds since the unix epoch.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceStamp {
    pub path: String,
    pub mtime_secs: u64,
}
