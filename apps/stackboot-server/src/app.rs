use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use stackboot::{AppConfig, Outcome, Registry, Runner, build_registry, logging::init_logging};
use tokio::net::TcpListener;
use users::{UserStore, UsersConfig, UsersModule};

use crate::cli::{Cli, Command};
use crate::infra::provisioner::InfraProvisioner;
use crate::stacks::default_stacks;

/// Load configuration, start logging and execute the requested command.
///
/// # Errors
/// Returns an error if configuration, logging setup or the command fails.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    execute(cli, &config, users::shutdown_signal()).await
}

/// Execute the command in `cli` against an already loaded configuration.
///
/// A serving identity stops once `shutdown` resolves.
///
/// # Errors
/// Returns an error if the registry cannot be built, the identity run fails,
/// `check` finds misconfigured stacks or the server cannot start.
pub async fn execute<F>(cli: &Cli, config: &AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let users_config: UsersConfig = config.module_config("users")?;
    let registry = registry(config, users_config.clone())?;

    match cli.action() {
        Command::List => {
            list(&registry);
            Ok(())
        }
        Command::Check => check(&registry),
        Command::Run => {
            let mut runner = Runner::new(&registry, config.runner.clone());
            match runner.run(cli.whoami.as_deref()).await? {
                Outcome::Terminated => Ok(()),
                Outcome::Serve(store) => serve(config, store, users_config, shutdown).await,
            }
        }
    }
}

fn registry(config: &AppConfig, users_config: UsersConfig) -> anyhow::Result<Registry<UserStore>> {
    let stacks = config.stacks.clone().unwrap_or_else(default_stacks);
    let provisioner = Arc::new(InfraProvisioner::from_config(
        &config.provisioning,
        users_config,
    )?);
    build_registry(&stacks, &provisioner).context("failed to compose the stack registry")
}

#[allow(clippy::print_stdout)]
fn list(registry: &Registry<UserStore>) {
    for identity in registry.identities() {
        println!("{identity}");
    }
}

#[allow(clippy::print_stdout)]
fn check(registry: &Registry<UserStore>) -> anyhow::Result<()> {
    let broken = registry.misconfigured();
    anyhow::ensure!(
        broken.is_empty(),
        "stacks neither bail after bootstrap nor have a store factory: {}",
        broken.join(", ")
    );
    println!("OK: {} stacks", registry.len());
    Ok(())
}

async fn serve<F>(
    config: &AppConfig,
    store: UserStore,
    users_config: UsersConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.server.bind_addr.as_str();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let module = UsersModule::new(store, users_config);
    users::serve_with_shutdown(listener, module, shutdown).await
}
