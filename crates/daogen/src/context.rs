use crate::Error;
use daogen_schema::DESCRIPTOR_SUFFIX;
use daogen_sql::dialect::Dialect;
use std::path::{Path, PathBuf};

///
/// SchemaResolver
///
/// Maps logical dao names to descriptor files and owns the compile
/// environment: the target dialect and where artifacts are cached.
/// Logical names may be namespaced with `~` (`shop~products`), which maps
/// to a subdirectory of the descriptor root.
///

pub trait SchemaResolver {
    fn descriptor_path(&self, logical_name: &str) -> Result<PathBuf, Error>;

    fn cache_dir(&self) -> &Path;

    fn dialect(&self) -> Dialect;
}

///
/// DirResolver
///
/// Filesystem resolver over a single descriptor root directory.
///

#[derive(Clone, Debug)]
pub struct DirResolver {
    root: PathBuf,
    cache_dir: PathBuf,
    dialect: Dialect,
}

impl DirResolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>, dialect: Dialect) -> Self {
        Self {
            root: root.into(),
            cache_dir: cache_dir.into(),
            dialect,
        }
    }
}

impl SchemaResolver for DirResolver {
    fn descriptor_path(&self, logical_name: &str) -> Result<PathBuf, Error> {
        let mut path = self.root.clone();
        let mut parts = logical_name.split('~').peekable();
        while let Some(part) = parts.next() {
            if part.is_empty() || part.contains(['/', '\\', '.']) {
                return Err(Error::BadLogicalName {
                    name: logical_name.to_string(),
                });
            }
            if parts.peek().is_some() {
                path.push(part);
            } else {
                path.push(format!("{part}{DESCRIPTOR_SUFFIX}"));
            }
        }

        Ok(path)
    }

    fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
