use stackboot::{Collaborators, Permission, StacksConfig};

const COLLABORATORS: [&str; 5] = ["mchaynes", "EvanBoyle", "stevesloka", "djgrove", "caseyyh"];

/// Built-in stack inputs, used when the config file has no `stacks` section.
#[must_use]
pub fn default_stacks() -> StacksConfig {
    let collaborators: Collaborators = COLLABORATORS
        .iter()
        .map(|login| ((*login).to_owned(), Permission::Admin))
        .collect();

    StacksConfig {
        repo_owner: "mchaynes".to_owned(),
        repo_name: "pulumi-bootstrap".to_owned(),
        collaborators,
        environments: vec!["dev".to_owned(), "stage".to_owned(), "prod".to_owned()],
        ..StacksConfig::default()
    }
}
