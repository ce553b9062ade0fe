mod method;
mod property;
mod table;

pub use method::{LimitClause, LimitPart, Method, MethodType, Parameter, UpdateValue};
pub use property::Property;
pub use table::{Table, TableUsage};

use crate::error::SchemaIdentity;
use serde::{Deserialize, Serialize};

///
/// SchemaModel
///
/// Fully resolved model of one dao descriptor, after import merging and
/// validation. Everything downstream (SQL generation, compiled artifact)
/// works off this struct; the raw descriptor is never consulted again.
///
/// Tables are kept in declaration order with the primary table first.
///

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    pub identity: SchemaIdentity,

    pub tables: Vec<Table>,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,

    /// Event names the factory dispatches to hooks.
    pub events: Vec<String>,

    /// Custom record class reference, passed through to the artifact.
    pub record_extends: Option<String>,

    /// Logical names of imported parents, outermost first.
    pub imported_from: Vec<String>,
}

impl SchemaModel {
    /// The primary table. The parser guarantees exactly one exists, so
    /// a missing one here is a construction bug, not user error.
    #[must_use]
    pub fn primary_table(&self) -> &Table {
        self.tables
            .iter()
            .find(|t| t.usage.is_primary())
            .unwrap_or_else(|| unreachable!("model built without a primary table"))
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Properties belonging to the primary table, in declaration order.
    pub fn primary_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.of_primary_table)
    }

    /// Primary key properties of the primary table.
    pub fn pk_properties(&self) -> impl Iterator<Item = &Property> {
        self.primary_properties().filter(|p| p.is_pk)
    }

    /// True when every primary-table property is part of the primary
    /// key, which forbids update methods.
    #[must_use]
    pub fn has_only_primary_keys(&self) -> bool {
        self.primary_properties().all(|p| p.is_pk)
    }

    #[must_use]
    pub fn has_event(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}
