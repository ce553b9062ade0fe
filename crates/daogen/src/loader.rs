use crate::{
    Error,
    compiler::{CachePolicy, Compiler},
    context::SchemaResolver,
};
use daogen_sql::artifact::CompiledDao;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::debug;

///
/// DaoLoader
///
/// Process-wide access point for compiled daos. Each logical name is
/// compiled at most once per loader and shared behind an [`Arc`];
/// `release` drops a cached entry so the next `get` goes back through
/// the compiler.
///

pub struct DaoLoader<R: SchemaResolver> {
    resolver: R,
    policy: CachePolicy,
    loaded: Mutex<HashMap<String, Arc<CompiledDao>>>,
}

impl<R: SchemaResolver> DaoLoader<R> {
    #[must_use]
    pub fn new(resolver: R, policy: CachePolicy) -> Self {
        Self {
            resolver,
            policy,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Fetch a compiled dao, compiling it on first use.
    pub fn get(&self, logical_name: &str) -> Result<Arc<CompiledDao>, Error> {
        if let Some(dao) = self.lock().get(logical_name) {
            return Ok(Arc::clone(dao));
        }

        let compiler = Compiler::new(&self.resolver, self.policy);
        let dao = Arc::new(compiler.compile(logical_name)?);
        self.lock()
            .insert(logical_name.to_string(), Arc::clone(&dao));
        debug!(dao = logical_name, "loaded dao");

        Ok(dao)
    }

    /// Forget one cached dao. Existing references stay valid.
    pub fn release(&self, logical_name: &str) {
        self.lock().remove(logical_name);
    }

    /// Forget every cached dao.
    pub fn release_all(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<CompiledDao>>> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
