use dockhand::domain::ports::DeploySettings;
use dockhand::utils::validation::Validate;
use dockhand::{DeployManifest, EnvFile};
use std::io::Write;
use tempfile::NamedTempFile;

/// The manifest a CI job would ship: host, user and credentials arrive as
/// repository secrets through the environment.
const CI_MANIFEST: &str = r#"
[pipeline]
name = "shop"

[build]
image = "registry.example.com/shop/app"

[transfer]
strategy = "registry"
username_env = "REGISTRY_USER"
password_env = "REGISTRY_PASSWORD"

[target]
host = "${CI_TEST_SERVER_IP}"
user = "${CI_TEST_SSH_USER}"
ssh_key = "/home/runner/.ssh/deploy_key"
project_dir = "/srv/shop"

[activate]
services = ["app", "nginx", "mysql", "redis", "queue"]

[health]
url = "http://${CI_TEST_SERVER_IP}:8080/health"
"#;

#[test]
fn test_ci_secrets_flow_into_the_manifest() {
    std::env::set_var("CI_TEST_SERVER_IP", "203.0.113.7");
    std::env::set_var("CI_TEST_SSH_USER", "deploy");

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CI_MANIFEST.as_bytes()).unwrap();

    let manifest = DeployManifest::from_file(file.path()).unwrap();
    manifest.validate().unwrap();

    assert_eq!(manifest.target.host.as_deref(), Some("203.0.113.7"));
    assert_eq!(manifest.target.user.as_deref(), Some("deploy"));
    assert_eq!(manifest.health_url(), "http://203.0.113.7:8080/health");
}

#[test]
fn test_registry_credentials_read_from_named_env_vars() {
    std::env::set_var("CI_TEST_SERVER_IP", "203.0.113.7");
    std::env::set_var("CI_TEST_SSH_USER", "deploy");

    let manifest = DeployManifest::from_toml_str(CI_MANIFEST).unwrap();

    // The manifest names the variables; values resolve at call time.
    std::env::set_var("REGISTRY_USER", "ci-bot");
    std::env::set_var("REGISTRY_PASSWORD", "hunter2");
    assert_eq!(manifest.registry_username().as_deref(), Some("ci-bot"));
    assert_eq!(manifest.registry_password().as_deref(), Some("hunter2"));

    std::env::remove_var("REGISTRY_USER");
    std::env::remove_var("REGISTRY_PASSWORD");
    assert!(manifest.registry_username().is_none());
    assert!(manifest.registry_password().is_none());
}

#[test]
fn test_missing_manifest_file_is_io_error() {
    let result = DeployManifest::from_file("/definitely/not/here/deploy.toml");
    assert!(matches!(
        result,
        Err(dockhand::DeployError::IoError(_))
    ));
}

#[test]
fn test_malformed_toml_points_at_parsing() {
    let result = DeployManifest::from_toml_str("[pipeline\nname=");
    match result {
        Err(dockhand::DeployError::ConfigValidationError { field, .. }) => {
            assert_eq!(field, "toml_parsing");
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_env_file_load_and_round_trip() {
    let content = "\
# Shop environment
APP_PORT=8080
DB_PASSWORD=secret

IMAGE_TAG=v1
";
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();

    let mut env = EnvFile::load(file.path()).unwrap();
    assert_eq!(env.get("APP_PORT"), Some("8080"));
    assert_eq!(env.get("IMAGE_TAG"), Some("v1"));

    env.set("IMAGE_TAG", "v2");
    env.set("REDIS_PORT", "6379");

    let rendered = env.render();
    assert!(rendered.starts_with("# Shop environment\n"));
    assert!(rendered.contains("IMAGE_TAG=v2"));
    assert!(rendered.ends_with("REDIS_PORT=6379\n"));

    // A re-parse sees exactly the same pairs.
    let reparsed = EnvFile::parse(&rendered);
    assert_eq!(reparsed.get("IMAGE_TAG"), Some("v2"));
    assert_eq!(reparsed.get("DB_PASSWORD"), Some("secret"));
}
