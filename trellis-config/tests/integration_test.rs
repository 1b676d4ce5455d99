//! Integration tests for trellis-config

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use trellis_config::*;
use trellis_core::{AppConfig, HttpRequest, Injector, Router};

#[test]
fn test_json_then_toml_files_merge() {
    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("app.json");
    let toml_path = dir.path().join("local.toml");

    std::fs::write(
        &json_path,
        r#"{ "host": "api.example.com", "cors": { "allowedOrigins": ["https://a.test"], "maxAge": 60 } }"#,
    )
    .unwrap();
    std::fs::write(
        &toml_path,
        r#"
            port = 8443

            [cors]
            maxAge = 600
        "#,
    )
    .unwrap();

    let manager = ConfigManager::new();
    manager.load_file(&json_path).unwrap();
    manager.load_file(&toml_path).unwrap();

    let config = manager.app_config().unwrap();
    assert_eq!(config.host, "api.example.com");
    assert_eq!(config.port, 8443);
    assert_eq!(config.cors.allowed_origins, vec!["https://a.test"]);
    assert_eq!(config.cors.max_age, 600);
}

#[test]
fn test_missing_and_malformed_files() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::new();

    let err = manager.load_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::LoadError(_)));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "[1, 2").unwrap();
    assert!(matches!(manager.load_file(&broken), Err(ConfigError::ParseError(_))));

    let list = dir.path().join("list.json");
    std::fs::write(&list, "[1, 2]").unwrap();
    assert!(manager.load_file(&list).is_err());

    assert_eq!(manager.get_string("host").unwrap(), "localhost");
}

#[test]
fn test_dotenv_with_prefix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(
        &path,
        "TRELLIS_IT_PORT=7070\nTRELLIS_IT_PRODUCTION=true\nTRELLIS_IT_HOST=0.0.0.0\n",
    )
    .unwrap();

    let manager = ConfigManager::with_prefix("TRELLIS_IT");
    manager.load_dotenv(Some(path.as_path())).unwrap();

    let config = manager.app_config().unwrap();
    assert_eq!(config.port, 7070);
    assert!(config.is_production);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(manager.env::<u16>("PORT"), Some(7070));
    assert_eq!(manager.env::<u16>("UNSET_VARIABLE"), None);
}

#[test]
fn test_missing_dotenv_file_is_an_error() {
    let manager = ConfigManager::new();
    let result = manager.load_dotenv(Some(std::path::Path::new("/nonexistent/trellis/.env")));
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_config_error_converts_to_core_error() {
    let err: trellis_core::Error = ConfigError::ValidationError("port must be set".into()).into();
    assert!(matches!(err, trellis_core::Error::Config(_)));
    assert!(err.to_string().contains("port must be set"));
}

#[tokio::test]
async fn test_installed_config_drives_the_router() {
    let manager = ConfigManager::new();
    manager
        .setup(json!({
            "isProduction": true,
            "cors": { "allowedOrigins": ["*"] }
        }))
        .unwrap();

    let injector = Arc::new(Injector::new());
    manager.install(&injector).unwrap();
    let router = Router::new(injector.clone()).unwrap();

    assert!(router.config().is_production);
    assert_eq!(router.base_url(), "http://localhost");

    let response = router.respond(HttpRequest::new("GET", "/nothing-here")).await;
    assert_eq!(response.status, 404);
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(*injector.get::<AppConfig>().unwrap(), router.config().clone());
}
