//! Stack registry and bootstrap runner.
//!
//! A *stack* is a named deployable identity (a developer laptop, a CI job, a
//! live environment). Each identity maps to a [`StackDescriptor`] holding the
//! ordered setup actions to run and a lifecycle decision: exit once the
//! actions finish, or hand a connected store to the record service.
//!
//! ## Modules
//!
//! - [`descriptor`]: descriptors, bootstrap actions and store factories
//! - [`registry`]: identity lookup table and its composition from stack inputs
//! - [`runner`]: the `Idle → Resolving → Bootstrapping → {Terminated | Serving}` machine
//! - [`provision`]: the provisioning collaborator seam
//! - [`config`]: layered application configuration
//! - [`logging`]: tracing subscriber setup

pub mod config;
pub mod descriptor;
pub mod logging;
pub mod provision;
pub mod registry;
pub mod runner;

pub use config::{
    AppConfig, ConsoleFormat, LoggingConfig, ProvisioningConfig, RunnerConfig, ServerConfig,
    StacksConfig,
};
pub use descriptor::{Bootstrap, StackDescriptor, StackDescriptorBuilder, StoreFactory};
pub use provision::{Collaborators, Permission, Provisioner, RepoRef, StackOutputs};
pub use registry::{DuplicatePolicy, Registry, RegistryBuilder, RegistryError, build_registry};
pub use runner::{LifecycleState, Outcome, Runner, RunnerError};
