use daogen::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PRODUCTS: &str = r#"{
    "datasource": {
        "primary_table": { "name": "p", "realname": "products", "primary_key": ["id"] }
    },
    "record": { "properties": [
        { "name": "id", "datatype": "autoincrement" },
        { "name": "name", "datatype": "varchar", "required": true },
        { "name": "price", "datatype": "decimal" }
    ] },
    "factory": { "methods": [
        {
            "name": "findByName", "type": "select",
            "parameters": [ { "name": "pattern" } ],
            "conditions": { "items": [
                { "op": "LIKE", "property": "name", "expr": "$pattern" }
            ] },
            "order": [ { "property": "name", "way": "asc" } ]
        }
    ] }
}"#;

struct Env {
    _dir: TempDir,
    resolver: DirResolver,
}

fn env_with(descriptors: &[(&str, &str)], dialect: Dialect) -> Env {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("daos");
    let cache = dir.path().join("cache");
    fs::create_dir_all(&root).unwrap();

    for (name, body) in descriptors {
        let path = root.join(format!("{name}.dao.json"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    Env {
        resolver: DirResolver::new(root, cache, dialect),
        _dir: dir,
    }
}

#[test]
fn compiles_and_persists_an_artifact() {
    let env = env_with(&[("products", PRODUCTS)], Dialect::Sqlite);
    let compiler = Compiler::new(&env.resolver, CachePolicy::CheckFreshness);

    let dao = compiler.compile("products").unwrap();
    assert_eq!(dao.identity.name, "products");
    assert_eq!(dao.sources.len(), 1);

    let artifact = compiler.artifact_path("products");
    assert!(artifact.ends_with(Path::new("products.sqlite.json")));
    assert!(artifact.is_file());

    let mut params = Params::new();
    params.set("pattern", "wid%");
    let sql = dao.method("findByName").unwrap().template.render(&params).unwrap();
    assert_eq!(
        sql,
        "SELECT \"p\".\"id\" AS \"id\", \"p\".\"name\" AS \"name\", \
         \"p\".\"price\" AS \"price\" FROM \"products\" AS \"p\" \
         WHERE \"p\".\"name\" LIKE 'wid%' ORDER BY \"p\".\"name\" ASC"
    );
}

#[test]
fn stale_stamps_force_a_rebuild() {
    let env = env_with(&[("products", PRODUCTS)], Dialect::Sqlite);
    let compiler = Compiler::new(&env.resolver, CachePolicy::CheckFreshness);

    compiler.compile("products").unwrap();
    let artifact = compiler.artifact_path("products");

    // falsify the recorded descriptor mtime
    let mut dao: serde_json::Value =
        serde_json::from_slice(&fs::read(&artifact).unwrap()).unwrap();
    dao["sources"][0]["mtime_secs"] = serde_json::Value::from(1_u64);
    fs::write(&artifact, serde_json::to_vec(&dao).unwrap()).unwrap();

    let rebuilt = compiler.compile("products").unwrap();
    assert_ne!(rebuilt.sources[0].mtime_secs, 1);
}

#[test]
fn trusted_cache_skips_the_descriptor_entirely() {
    let env = env_with(&[("products", PRODUCTS)], Dialect::Mysql);

    Compiler::new(&env.resolver, CachePolicy::CheckFreshness)
        .compile("products")
        .unwrap();
    fs::remove_file(env.resolver.descriptor_path("products").unwrap()).unwrap();

    let trusted = Compiler::new(&env.resolver, CachePolicy::TrustCache);
    assert!(trusted.compile("products").is_ok());

    let checking = Compiler::new(&env.resolver, CachePolicy::CheckFreshness);
    let err = checking.compile("products").unwrap_err();
    assert!(matches!(err, daogen::Error::ParseError(e) if e.code() == 510));
}

#[test]
fn corrupt_artifacts_are_rebuilt() {
    let env = env_with(&[("products", PRODUCTS)], Dialect::Sqlite);
    let compiler = Compiler::new(&env.resolver, CachePolicy::TrustCache);

    compiler.compile("products").unwrap();
    fs::write(compiler.artifact_path("products"), b"not json").unwrap();

    assert!(compiler.compile("products").is_ok());
}

#[test]
fn imports_resolve_and_are_stamped() {
    let base = r#"{
        "datasource": {
            "primary_table": { "name": "p", "realname": "products", "primary_key": ["id"] }
        },
        "record": { "properties": [
            { "name": "id", "datatype": "integer" },
            { "name": "name", "datatype": "varchar" }
        ] }
    }"#;
    let child = r#"{
        "import": "shop~base",
        "factory": { "methods": [ { "name": "findAll", "type": "select" } ] }
    }"#;

    let env = env_with(&[("shop/base", base), ("products", child)], Dialect::Pgsql);
    let compiler = Compiler::new(&env.resolver, CachePolicy::AlwaysRebuild);

    let dao = compiler.compile("products").unwrap();
    assert!(dao.method("findAll").is_some());
    assert_eq!(dao.sources.len(), 2);
    assert!(dao.sources[1].path.ends_with("base.dao.json"));
}

#[test]
fn loader_shares_one_compilation() {
    let env = env_with(&[("products", PRODUCTS)], Dialect::Sqlite);
    let loader = DaoLoader::new(env.resolver.clone(), CachePolicy::CheckFreshness);

    let a = loader.get("products").unwrap();
    let b = loader.get("products").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));

    loader.release_all();
    let c = loader.get("products").unwrap();
    assert!(!std::sync::Arc::ptr_eq(&a, &c));
}

#[test]
fn unknown_dao_reports_the_descriptor_path() {
    let env = env_with(&[], Dialect::Sqlite);
    let compiler = Compiler::new(&env.resolver, CachePolicy::CheckFreshness);

    let err = compiler.compile("missing").unwrap_err();
    assert!(matches!(err, daogen::Error::ParseError(e) if e.code() == 510));
}
