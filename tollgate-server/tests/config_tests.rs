mod common;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use tollgate_server::{ConfigError, ServerConfig};
use tollgate_storage::StoreConfig;

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn defaults_apply_to_omitted_fields() {
    let config = ServerConfig::from_toml_str("secret = \"s\"").unwrap();

    assert_eq!(config.port, 4100);
    assert_eq!(config.store_timeout(), Duration::from_secs(5));
    assert_eq!(config.store, StoreConfig::Memory);
    assert!(config.products.is_empty());
    assert!(config.default_key.is_zero());
}

#[test]
fn full_config_parses() {
    let config = test_config();

    assert_eq!(config.control_api_secret, ADMIN_SECRET);
    assert_eq!(config.default_key.name, "default");
    assert_eq!(config.products.len(), 1);

    let acme = &config.products[0];
    assert_eq!(acme.alg, "HS512");
    let trial = acme.plan("trial").unwrap();
    assert_eq!(trial.policy.expiration, 30);
    assert_eq!(trial.policy.headers[0].key, "typ");
    assert_eq!(acme.plan("pro").unwrap().currency.as_deref(), Some("USD"));
}

#[test]
fn store_section_selects_backend() {
    let config = ServerConfig::from_toml_str(
        r#"
        secret = "s"
        [store]
        backend = "sqlite"
        path = "tollgate.db"
        "#,
    )
    .unwrap();

    assert_eq!(
        config.store,
        StoreConfig::Sqlite {
            path: PathBuf::from("tollgate.db")
        }
    );
}

#[test]
fn unknown_field_is_rejected() {
    let err = ServerConfig::from_toml_str("secret = \"s\"\nprot = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn missing_secret_is_rejected() {
    let config = ServerConfig::from_toml_str("control_api_secret = \"a\"").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::MissingSecret)));
}

#[test]
fn zero_store_timeout_is_rejected() {
    let config = ServerConfig::from_toml_str("secret = \"s\"\nstore_timeout_secs = 0").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::ZeroStoreTimeout)));

    let config = ServerConfig::from_toml_str("secret = \"s\"\nstore_timeout_secs = 1").unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn secret_override_replaces_file_value() {
    let mut config = ServerConfig::from_toml_str("secret = \"from-file\"").unwrap();

    config.apply_secret_override(Some(String::new()));
    assert_eq!(config.secret, "from-file");

    config.apply_secret_override(Some("from-env".into()));
    assert_eq!(config.secret, "from-env");
}

#[test]
fn duplicate_product_is_rejected() {
    let config = ServerConfig::from_toml_str(
        r#"
        secret = "s"
        [[products]]
        name = "acme"
        [[products]]
        name = "acme"
        "#,
    )
    .unwrap();

    match config.validate() {
        Err(ConfigError::DuplicateProduct(name)) => assert_eq!(name, "acme"),
        other => panic!("expected duplicate product, got {other:?}"),
    }
}

#[test]
fn duplicate_plan_is_rejected() {
    let config = ServerConfig::from_toml_str(
        r#"
        secret = "s"
        [[products]]
        name = "acme"
        [[products.plans]]
        name = "trial"
        [[products.plans]]
        name = "trial"
        "#,
    )
    .unwrap();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicatePlan { .. })
    ));
}

#[test]
fn unnamed_product_is_rejected() {
    let config = ServerConfig::from_toml_str("secret = \"s\"\n[[products]]\nalg = \"HS256\"").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::UnnamedProduct)));
}

#[test]
fn control_secret_is_required_to_serve() {
    let config = ServerConfig::from_toml_str("secret = \"s\"").unwrap();
    assert!(matches!(
        config.control_secret(),
        Err(ConfigError::MissingControlSecret)
    ));
    assert_eq!(test_config().control_secret().unwrap(), ADMIN_SECRET);
}

// ── Derived values ───────────────────────────────────────────────

#[test]
fn catalog_carries_products_and_defaults() {
    let catalog = test_config().catalog();

    assert_eq!(catalog.default_alg(), "HS256");
    assert_eq!(catalog.default_key().name, "default");
    assert!(catalog.product("acme").is_some());
    assert!(catalog.product("nope").is_none());
}

#[test]
fn debug_output_redacts_secrets() {
    let rendered = format!("{:?}", test_config());
    assert!(!rendered.contains(ADMIN_SECRET));
    assert!(!rendered.contains("test-master-secret"));
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config.products[0].name, "acme");
}

#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

// ── Stores from config ───────────────────────────────────────────

#[tokio::test]
async fn sqlite_store_persists_across_services() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.store = StoreConfig::Sqlite {
        path: dir.path().join("tollgate.db"),
    };

    let draft: tollgate_types::LicenseDraft = serde_json::from_value(furkan_draft()).unwrap();
    let service = tollgate_server::build_service(&config).await.unwrap();
    service.generate(&draft).await.unwrap();
    drop(service);

    let reopened = tollgate_server::build_service(&config).await.unwrap();
    let verdict = reopened.verify_token(FURKAN_TOKEN).await.unwrap();
    assert!(verdict.valid);
}
