use std::io::Write;

use clap::Parser;
use stackboot::{AppConfig, RegistryError, RunnerError};
use stackboot_server::{Cli, execute};
use tracing_test::traced_test;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("stackboot-server").chain(args.iter().copied())).unwrap()
}

fn local_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_addr = "127.0.0.1:0".to_owned();
    config
}

#[tokio::test]
#[traced_test]
async fn root_bootstraps_then_terminates() {
    execute(&cli(&["--whoami", "root"]), &local_config(), async {})
        .await
        .unwrap();

    assert!(logs_contain("Running as: root"));
    assert!(logs_contain("Bail after bootstrap is set, bailing out"));
}

#[tokio::test]
async fn ci_identity_for_environment_terminates() {
    execute(
        &cli(&["--whoami", "github-actions-prod", "run"]),
        &local_config(),
        async {},
    )
    .await
    .unwrap();
}

#[tokio::test]
#[traced_test]
async fn local_identity_serves_until_shutdown() {
    let config = local_config();
    temp_env::async_with_vars(
        [("STORE_URL", None::<&str>)],
        execute(&cli(&["--whoami", "mchaynes-local"]), &config, async {}),
    )
    .await
    .unwrap();

    assert!(logs_contain("Store connected"));
    assert!(logs_contain("Started service at: http://127.0.0.1:"));
}

#[tokio::test]
async fn unknown_identity_is_fatal() {
    let err = execute(&cli(&["--whoami", "mallory-local"]), &local_config(), async {})
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RunnerError>(),
        Some(RunnerError::Registry(RegistryError::UnknownIdentity { identity })) if identity == "mallory-local"
    ));
}

#[tokio::test]
async fn missing_identity_is_fatal() {
    let mut config = local_config();
    config.runner.identity_env = "STACKBOOT_APP_TEST_WHOAMI".to_owned();

    let err = temp_env::async_with_vars(
        [("STACKBOOT_APP_TEST_WHOAMI", None::<&str>)],
        execute(&cli(&[]), &config, async {}),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("STACKBOOT_APP_TEST_WHOAMI"));
}

#[tokio::test]
async fn list_and_check_accept_default_stacks() {
    let config = local_config();
    execute(&cli(&["list"]), &config, async {}).await.unwrap();
    execute(&cli(&["check"]), &config, async {}).await.unwrap();
}

#[tokio::test]
async fn stacks_from_config_file_replace_defaults() {
    let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
    write!(
        file,
        "server:
  bind_addr: 127.0.0.1:0
stacks:
  repo_owner: acme
  repo_name: todo
  collaborators:
    alice: push
  environments: [qa]
"
    )
    .unwrap();
    let config = AppConfig::load(Some(file.path())).unwrap();

    execute(&cli(&["--whoami", "github-actions-qa"]), &config, async {})
        .await
        .unwrap();
    execute(&cli(&["--whoami", "github-actions-alice"]), &config, async {})
        .await
        .unwrap();

    let err = execute(&cli(&["--whoami", "github-actions-prod"]), &config, async {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("github-actions-prod"));
}

#[tokio::test]
async fn invalid_users_module_config_is_rejected() {
    let mut config = local_config();
    config.modules.insert(
        "users".to_owned(),
        serde_json::json!({ "store_timeout_secs": "soon" }),
    );

    let err = execute(&cli(&["check"]), &config, async {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("users"));
}
