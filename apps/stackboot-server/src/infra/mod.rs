//! Concrete provisioning: the stack engine, the GitHub client and the
//! [`InfraProvisioner`](provisioner::InfraProvisioner) that ties them together.

pub mod engine;
pub mod github;
pub mod provisioner;
