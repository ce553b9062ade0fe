//! ## Crate layout
//! - `schema`: descriptor parsing and the resolved schema model.
//! - `sql`: dialect strategies, SQL templates, and the dao generator.
//! - `compiler`: cache-aware compilation of descriptors into artifacts.
//! - `context`: resolution of logical dao names to files.
//! - `loader`: shared access to compiled daos.
//! - `hook`: observers around dao operations.

pub use daogen_schema as schema;
pub use daogen_sql as sql;

pub mod compiler;
pub mod context;
pub mod hook;
pub mod loader;

use daogen_schema::error::ParseError;
use daogen_sql::error::{GenerateError, RenderError};
use thiserror::Error as ThisError;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error,
        compiler::{CachePolicy, Compiler},
        context::{DirResolver, SchemaResolver},
        hook::{DaoHook, DeleteOutcome, HookPhase, HookRegistry},
        loader::DaoLoader,
        schema::prelude::*,
        sql::prelude::*,
    };
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid dao name \"{name}\"")]
    BadLogicalName { name: String },

    #[error("cannot access artifact {path}: {source}")]
    ArtifactIo {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot encode artifact {path}: {source}")]
    ArtifactEncode {
        path: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    ParseError(#[from] ParseError),

    #[error(transparent)]
    GenerateError(#[from] GenerateError),

    #[error(transparent)]
    RenderError(#[from] RenderError),
}
