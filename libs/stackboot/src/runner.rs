//! Bootstrap lifecycle.
//!
//! ```text
//! Idle → Resolving → Bootstrapping → Terminated
//!                                  → Serving
//! (any) → Fatal
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::config::RunnerConfig;
use crate::registry::{Registry, RegistryError};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Resolving,
    Bootstrapping,
    Terminated,
    Serving,
    Fatal,
}

impl LifecycleState {
    /// `Terminated` and `Fatal` are absorbing.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Terminated | Self::Fatal)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Bootstrapping => "bootstrapping",
            Self::Terminated => "terminated",
            Self::Serving => "serving",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// How a successful run ends.
#[derive(Debug)]
pub enum Outcome<S> {
    /// Bootstraps finished and the stack bails; exit with success.
    Terminated,
    /// Bootstraps finished and a store is connected; start serving with it.
    Serve(S),
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("stack identity is not set; export {var} or pass --whoami")]
    MissingIdentity { var: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("bootstrap '{name}' ({step}/{total}) failed")]
    BootstrapFailed {
        name: String,
        step: usize,
        total: usize,
        #[source]
        source: BoxError,
    },

    #[error("bootstrap '{name}' did not finish within {timeout:?}")]
    BootstrapTimedOut { name: String, timeout: Duration },

    #[error(
        "stack '{identity}' neither bails after bootstrap nor has a store factory; it cannot serve"
    )]
    MissingStoreFactory { identity: String },

    #[error("failed to connect the store for stack '{identity}'")]
    StoreConnect {
        identity: String,
        #[source]
        source: BoxError,
    },

    #[error("store for stack '{identity}' did not connect within {timeout:?}")]
    StoreConnectTimedOut { identity: String, timeout: Duration },
}

/// Drives one identity through its descriptor.
pub struct Runner<'a, S> {
    registry: &'a Registry<S>,
    config: RunnerConfig,
    history: Vec<LifecycleState>,
}

impl<'a, S> Runner<'a, S> {
    #[must_use]
    pub fn new(registry: &'a Registry<S>, config: RunnerConfig) -> Self {
        Self {
            registry,
            config,
            history: vec![LifecycleState::Idle],
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.history
            .last()
            .copied()
            .unwrap_or(LifecycleState::Idle)
    }

    /// Every state visited so far, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    /// Resolve the identity, run its bootstraps and decide what happens next.
    ///
    /// `whoami` overrides the identity environment variable when given.
    ///
    /// # Errors
    /// Any [`RunnerError`]; the runner is left in [`LifecycleState::Fatal`].
    pub async fn run(&mut self, whoami: Option<&str>) -> Result<Outcome<S>, RunnerError> {
        match self.drive(whoami).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.transition(LifecycleState::Fatal);
                error!(error = %err, "Stack run failed");
                Err(err)
            }
        }
    }

    async fn drive(&mut self, whoami: Option<&str>) -> Result<Outcome<S>, RunnerError> {
        self.transition(LifecycleState::Resolving);
        let identity = self.resolve_identity(whoami)?;

        let available: Vec<&str> = self.registry.identities().collect();
        info!(stacks = ?available, "Available stacks");
        info!("Running as: {identity}");

        let descriptor = self.registry.lookup(&identity)?;

        self.transition(LifecycleState::Bootstrapping);
        let total = descriptor.bootstraps().len();
        for (idx, bootstrap) in descriptor.bootstraps().iter().enumerate() {
            let step = idx + 1;
            let name = bootstrap.name();
            info!(bootstrap = name, step, total, "Running bootstrap");

            match deadline(self.config.bootstrap_timeout(), bootstrap.invoke()).await {
                Some(Ok(())) => {}
                Some(Err(source)) => {
                    return Err(RunnerError::BootstrapFailed {
                        name: name.to_owned(),
                        step,
                        total,
                        source: source.into(),
                    });
                }
                None => {
                    return Err(RunnerError::BootstrapTimedOut {
                        name: name.to_owned(),
                        timeout: self.config.bootstrap_timeout().unwrap_or_default(),
                    });
                }
            }
        }

        if descriptor.bails_after_bootstrap() {
            info!("Bail after bootstrap is set, bailing out");
            self.transition(LifecycleState::Terminated);
            return Ok(Outcome::Terminated);
        }

        let factory = descriptor
            .store_factory()
            .ok_or_else(|| RunnerError::MissingStoreFactory {
                identity: identity.clone(),
            })?;

        let store = match deadline(self.config.store_connect_timeout(), factory.connect()).await {
            Some(Ok(store)) => store,
            Some(Err(source)) => {
                return Err(RunnerError::StoreConnect {
                    identity,
                    source: source.into(),
                });
            }
            None => {
                return Err(RunnerError::StoreConnectTimedOut {
                    identity,
                    timeout: self.config.store_connect_timeout().unwrap_or_default(),
                });
            }
        };

        info!(identity = %identity, "Store connected");
        self.transition(LifecycleState::Serving);
        Ok(Outcome::Serve(store))
    }

    fn resolve_identity(&self, whoami: Option<&str>) -> Result<String, RunnerError> {
        let from_env;
        let identity = match whoami {
            Some(id) => Some(id),
            None => {
                from_env = std::env::var(&self.config.identity_env).ok();
                from_env.as_deref()
            }
        };
        identity
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| RunnerError::MissingIdentity {
                var: self.config.identity_env.clone(),
            })
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state().is_final() {
            return;
        }
        tracing::debug!(from = %self.state(), to = %next, "Lifecycle transition");
        self.history.push(next);
    }
}

/// `None` when `limit` elapses first.
async fn deadline<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_states() {
        assert!(LifecycleState::Terminated.is_final());
        assert!(LifecycleState::Fatal.is_final());
        assert!(!LifecycleState::Serving.is_final());
    }

    #[test]
    fn missing_identity_names_the_variable() {
        let registry: Registry<()> = Registry::builder().build();
        let runner = Runner::new(
            &registry,
            RunnerConfig {
                identity_env: "STACKBOOT_TEST_WHOAMI_UNSET".to_owned(),
                ..RunnerConfig::default()
            },
        );
        let err = temp_env::with_var_unset("STACKBOOT_TEST_WHOAMI_UNSET", || {
            runner.resolve_identity(None).unwrap_err()
        });
        assert!(err.to_string().contains("STACKBOOT_TEST_WHOAMI_UNSET"));
    }

    #[test]
    fn override_wins_over_env_and_blank_is_missing() {
        let registry: Registry<()> = Registry::builder().build();
        let runner = Runner::new(
            &registry,
            RunnerConfig {
                identity_env: "STACKBOOT_TEST_WHOAMI_SET".to_owned(),
                ..RunnerConfig::default()
            },
        );
        temp_env::with_var("STACKBOOT_TEST_WHOAMI_SET", Some("from-env"), || {
            assert_eq!(runner.resolve_identity(None).unwrap(), "from-env");
            assert_eq!(runner.resolve_identity(Some("cli")).unwrap(), "cli");
            assert!(matches!(
                runner.resolve_identity(Some("  ")),
                Err(RunnerError::MissingIdentity { .. })
            ));
        });
    }
}
