pub mod artifact;
pub mod dialect;
pub mod error;
pub mod generate;
pub mod template;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        artifact::{
            CompiledDao, InsertPlan, KeyRetrieval, MethodPlan, PlanParameter, RecordModifier,
            RecordProperty, SourceStamp,
        },
        dialect::Dialect,
        error::{GenerateError, RenderError},
        generate::Generator,
        template::{Frag, LimitBind, Params, SqlTemplate},
    };
}
