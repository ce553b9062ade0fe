use crate::{Error, context::SchemaResolver};
use daogen_schema::{
    descriptor::Descriptor,
    error::{ParseError, ParseErrorKind, SchemaIdentity},
    node::SchemaModel,
    parse::{ImportResolver, Parser},
};
use daogen_sql::{
    artifact::{CompiledDao, SourceStamp},
    generate::Generator,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};
use tracing::{debug, info, warn};

///
/// CachePolicy
///
/// How aggressively cached artifacts are reused.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CachePolicy {
    /// Recompile on every call.
    AlwaysRebuild,
    /// Reuse the artifact while every source descriptor is unchanged.
    #[default]
    CheckFreshness,
    /// Reuse any existing artifact without looking at the sources.
    TrustCache,
}

///
/// Compiler
///
/// Turns a logical dao name into a [`CompiledDao`], consulting and
/// maintaining the artifact cache according to the policy. Artifacts are
/// written atomically: serialized to a temporary file in the cache
/// directory, then renamed into place.
///

pub struct Compiler<'a, R: SchemaResolver> {
    resolver: &'a R,
    policy: CachePolicy,
}

impl<'a, R: SchemaResolver> Compiler<'a, R> {
    #[must_use]
    pub const fn new(resolver: &'a R, policy: CachePolicy) -> Self {
        Self { resolver, policy }
    }

    /// Artifact location for a logical dao under the current dialect.
    #[must_use]
    pub fn artifact_path(&self, logical_name: &str) -> PathBuf {
        let file = CompiledDao::artifact_file_name(
            &logical_name.replace('~', "."),
            self.resolver.dialect(),
        );

        self.resolver.cache_dir().join(file)
    }

    pub fn compile(&self, logical_name: &str) -> Result<CompiledDao, Error> {
        let artifact_path = self.artifact_path(logical_name);

        if self.policy != CachePolicy::AlwaysRebuild {
            if let Some(dao) = self.load_cached(&artifact_path)? {
                if self.policy == CachePolicy::TrustCache || self.is_fresh(&dao) {
                    debug!(dao = logical_name, "using cached artifact");
                    return Ok(dao);
                }
                warn!(dao = logical_name, "artifact is stale, recompiling");
            }
        }

        let dao = self.build(logical_name)?;
        self.persist(&dao, &artifact_path)?;
        info!(dao = logical_name, dialect = %dao.dialect, "compiled dao");

        Ok(dao)
    }

    /// Parse and generate without touching the cache.
    pub fn build(&self, logical_name: &str) -> Result<CompiledDao, Error> {
        let (identity, path) = self.identify(logical_name)?;
        let model = self.parse_model(&identity, &path)?;

        let generator = Generator::new(self.resolver.dialect());
        let mut dao = generator.compile(&model)?;
        dao.sources = self.stamp_sources(&model, &path)?;

        Ok(dao)
    }

    fn identify(&self, logical_name: &str) -> Result<(SchemaIdentity, PathBuf), Error> {
        let path = self.resolver.descriptor_path(logical_name)?;
        let identity = SchemaIdentity::new(logical_name, path.display().to_string());

        Ok((identity, path))
    }

    fn parse_model(&self, identity: &SchemaIdentity, path: &Path) -> Result<SchemaModel, Error> {
        let body = fs::read_to_string(path).map_err(|e| {
            ParseError::new(
                ParseErrorKind::UnreadableDescriptor {
                    reason: e.to_string(),
                },
                identity.clone(),
            )
        })?;

        let dialect = self.resolver.dialect();
        let imports = ResolverImports { resolver: self.resolver };
        let parser = Parser::new(identity.clone(), &dialect, &imports);

        Ok(parser.parse_str(&body)?)
    }

    fn stamp_sources(
        &self,
        model: &SchemaModel,
        descriptor_path: &Path,
    ) -> Result<Vec<SourceStamp>, Error> {
        let mut paths = vec![descriptor_path.to_path_buf()];
        for imported in &model.imported_from {
            paths.push(self.resolver.descriptor_path(imported)?);
        }

        let mut stamps = Vec::with_capacity(paths.len());
        for path in paths {
            stamps.push(SourceStamp {
                mtime_secs: mtime_secs(&path).unwrap_or(0),
                path: path.display().to_string(),
            });
        }

        Ok(stamps)
    }

    fn load_cached(&self, artifact_path: &Path) -> Result<Option<CompiledDao>, Error> {
        let bytes = match fs::read(artifact_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::ArtifactIo {
                    path: artifact_path.display().to_string(),
                    source: e,
                });
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(dao) => Ok(Some(dao)),
            // unreadable artifacts are rebuilt, not fatal
            Err(e) => {
                warn!(path = %artifact_path.display(), error = %e, "discarding corrupt artifact");
                Ok(None)
            }
        }
    }

    fn is_fresh(&self, dao: &CompiledDao) -> bool {
        dao.sources.iter().all(|stamp| {
            mtime_secs(Path::new(&stamp.path)).is_some_and(|mtime| mtime == stamp.mtime_secs)
        })
    }

    fn persist(&self, dao: &CompiledDao, artifact_path: &Path) -> Result<(), Error> {
        let io_err = |source| Error::ArtifactIo {
            path: artifact_path.display().to_string(),
            source,
        };

        let cache_dir = self.resolver.cache_dir();
        fs::create_dir_all(cache_dir).map_err(io_err)?;

        let bytes = serde_json::to_vec(dao).map_err(|e| Error::ArtifactEncode {
            path: artifact_path.display().to_string(),
            source: e,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(cache_dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(artifact_path)
            .map_err(|e| io_err(e.error))?;

        Ok(())
    }
}

///
/// ResolverImports
///
/// Bridges the resolver into the parser's import mechanism.
///

struct ResolverImports<'a, R: SchemaResolver> {
    resolver: &'a R,
}

impl<R: SchemaResolver> ImportResolver for ResolverImports<'_, R> {
    fn resolve(&self, logical_name: &str) -> Result<(SchemaIdentity, Descriptor), String> {
        let path = self
            .resolver
            .descriptor_path(logical_name)
            .map_err(|e| e.to_string())?;
        let body = fs::read_to_string(&path).map_err(|e| e.to_string())?;
        let descriptor = serde_json::from_str(&body).map_err(|e| e.to_string())?;

        Ok((
            SchemaIdentity::new(logical_name, path.display().to_string()),
            descriptor,
        ))
    }
}

fn mtime_secs(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;

    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
