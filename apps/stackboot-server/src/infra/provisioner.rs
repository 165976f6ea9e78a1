use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use stackboot::{Collaborators, ProvisioningConfig, Provisioner, RepoRef, StackOutputs};
use tracing::info;
use users::{InMemoryUserRepo, UserStore, UsersConfig};

use super::engine::{DryRunEngine, ProgramKind, PulumiCliEngine, StackEngine, StackProgram};
use super::github::GithubClient;

/// Provisioner backed by a [`StackEngine`] and the GitHub API.
pub struct InfraProvisioner {
    engine: Arc<dyn StackEngine>,
    github: GithubClient,
    dry_run: bool,
    store_url_env: String,
    users: UsersConfig,
}

impl InfraProvisioner {
    #[must_use]
    pub fn new(
        engine: Arc<dyn StackEngine>,
        github: GithubClient,
        dry_run: bool,
        store_url_env: impl Into<String>,
        users: UsersConfig,
    ) -> Self {
        Self {
            engine,
            github,
            dry_run,
            store_url_env: store_url_env.into(),
            users,
        }
    }

    /// Wire the engine and GitHub client described by `cfg`.
    ///
    /// # Errors
    /// Returns an error if the GitHub client cannot be built.
    pub fn from_config(cfg: &ProvisioningConfig, users: UsersConfig) -> anyhow::Result<Self> {
        let engine: Arc<dyn StackEngine> = if cfg.dry_run {
            info!("Provisioning in dry-run mode");
            Arc::new(DryRunEngine)
        } else {
            Arc::new(PulumiCliEngine::new(
                cfg.engine_binary.clone(),
                &cfg.programs_dir,
                &cfg.logs_dir,
            ))
        };
        let token = std::env::var(&cfg.github_token_env).ok();
        let github = GithubClient::new(cfg.github_api_url.clone(), token.as_deref())?;
        Ok(Self::new(
            engine,
            github,
            cfg.dry_run,
            cfg.store_url_env.clone(),
            users,
        ))
    }

    fn store_url(&self) -> Option<String> {
        std::env::var(&self.store_url_env)
            .ok()
            .filter(|url| !url.trim().is_empty())
    }
}

#[async_trait]
impl Provisioner for InfraProvisioner {
    type Store = UserStore;

    async fn ensure_repository(
        &self,
        repo: &RepoRef,
        collaborators: &Collaborators,
    ) -> anyhow::Result<()> {
        let program = StackProgram::new("github-repo", ProgramKind::Repository)
            .with("owner", &repo.owner)
            .with("name", &repo.name);
        self.engine.up(&program).await?;

        for (user, permission) in collaborators {
            if self.dry_run {
                info!(user, permission = permission.as_str(), "Dry run: skipping collaborator invite");
                continue;
            }
            self.github.add_collaborator(repo, user, *permission).await?;
        }
        Ok(())
    }

    async fn ensure_ci_trust(&self, stack: &str, repo: &RepoRef) -> anyhow::Result<()> {
        let program = StackProgram::new(format!("github-aws-{stack}"), ProgramKind::CiTrust)
            .with("repoOwner", &repo.owner)
            .with("repoName", &repo.name);
        self.engine.up(&program).await?;
        Ok(())
    }

    async fn ensure_branch(
        &self,
        branch: &str,
        repo: &RepoRef,
        whoami: &str,
    ) -> anyhow::Result<()> {
        let program = StackProgram::new(format!("gh-branch-{branch}"), ProgramKind::Branch)
            .with("owner", &repo.owner)
            .with("repoName", &repo.name)
            .with("branch", branch)
            .with("whoami", whoami);
        self.engine.up(&program).await?;
        Ok(())
    }

    async fn provision_managed_store(&self, name: &str) -> anyhow::Result<StackOutputs> {
        let program = StackProgram::new(format!("docdb-{name}"), ProgramKind::ManagedStore)
            .with("environment", name);
        self.engine.up(&program).await
    }

    async fn provision_service(
        &self,
        name: &str,
        store: &StackOutputs,
    ) -> anyhow::Result<StackOutputs> {
        let mut program = StackProgram::new(format!("apigw-{name}"), ProgramKind::Service)
            .with("environment", name);
        for (key, value) in store.iter() {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            program = program.with(format!("store.{key}"), value);
        }

        let outputs = self.engine.up(&program).await?;
        if let Some(url) = outputs.get_str("url") {
            info!(environment = name, "Service available at: {url}");
        }
        Ok(outputs)
    }

    async fn local_store(&self, scope: &str) -> anyhow::Result<UserStore> {
        if let Some(url) = self.store_url() {
            return connect_document_store(&url, &self.users).await;
        }
        info!(scope, "Using ephemeral in-memory store");
        Ok(Arc::new(InMemoryUserRepo::new(scope)))
    }
}

#[cfg(feature = "mongo")]
async fn connect_document_store(url: &str, cfg: &UsersConfig) -> anyhow::Result<UserStore> {
    let repo = users::MongoUserRepo::connect(url, &cfg.database, &cfg.collection).await?;
    Ok(Arc::new(repo))
}

#[cfg(not(feature = "mongo"))]
async fn connect_document_store(_url: &str, _cfg: &UsersConfig) -> anyhow::Result<UserStore> {
    anyhow::bail!(
        "a document store URL is set but this binary was built without the `mongo` feature"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use stackboot::Permission;

    use super::*;

    #[derive(Default)]
    struct RecordingEngine {
        programs: Mutex<Vec<StackProgram>>,
    }

    #[async_trait]
    impl StackEngine for RecordingEngine {
        async fn up(&self, program: &StackProgram) -> anyhow::Result<StackOutputs> {
            self.programs.lock().unwrap().push(program.clone());
            let mut outputs = StackOutputs::new();
            if program.kind == ProgramKind::ManagedStore {
                outputs.insert("host", json!("docdb.internal"));
                outputs.insert("port", json!(27017));
            }
            Ok(outputs)
        }
    }

    fn provisioner(engine: &Arc<RecordingEngine>) -> InfraProvisioner {
        InfraProvisioner::new(
            Arc::clone(engine) as Arc<dyn StackEngine>,
            GithubClient::new("http://127.0.0.1:1", None).unwrap(),
            true,
            "STACKBOOT_TEST_STORE_URL",
            UsersConfig::default(),
        )
    }

    #[tokio::test]
    async fn branch_program_carries_identity() {
        let engine = Arc::new(RecordingEngine::default());
        provisioner(&engine)
            .ensure_branch("alice", &RepoRef::new("acme", "todo"), "github-actions-alice")
            .await
            .unwrap();

        let programs = engine.programs.lock().unwrap();
        assert_eq!(programs[0].stack, "gh-branch-alice");
        assert_eq!(programs[0].kind, ProgramKind::Branch);
        assert_eq!(programs[0].config["whoami"], "github-actions-alice");
    }

    #[tokio::test]
    async fn dry_run_repository_does_not_call_github() {
        let engine = Arc::new(RecordingEngine::default());
        let mut collaborators = Collaborators::new();
        collaborators.insert("alice".into(), Permission::Admin);

        // The GitHub client points at a closed port; reaching it would fail.
        provisioner(&engine)
            .ensure_repository(&RepoRef::new("acme", "todo"), &collaborators)
            .await
            .unwrap();
        assert_eq!(engine.programs.lock().unwrap()[0].kind, ProgramKind::Repository);
    }

    #[tokio::test]
    async fn service_receives_store_outputs() {
        let engine = Arc::new(RecordingEngine::default());
        let p = provisioner(&engine);

        let store = p.provision_managed_store("prod").await.unwrap();
        p.provision_service("prod", &store).await.unwrap();

        let programs = engine.programs.lock().unwrap();
        assert_eq!(programs[1].stack, "apigw-prod");
        assert_eq!(programs[1].config["store.host"], "docdb.internal");
        assert_eq!(programs[1].config["store.port"], "27017");
    }

    #[tokio::test]
    async fn local_store_is_in_memory_without_url() {
        let engine = Arc::new(RecordingEngine::default());
        let p = provisioner(&engine);

        let store = temp_env::async_with_vars(
            [("STACKBOOT_TEST_STORE_URL", None::<&str>)],
            p.local_store("alice"),
        )
        .await
        .unwrap();
        let id = store.insert(json!({"first": "a"})).await.unwrap();
        assert!(store.find_by_id(&id.to_string()).await.unwrap().is_some());
    }

    #[cfg(not(feature = "mongo"))]
    #[tokio::test]
    async fn store_url_without_mongo_support_fails_loudly() {
        let engine = Arc::new(RecordingEngine::default());
        let p = provisioner(&engine);

        let err = temp_env::async_with_vars(
            [("STACKBOOT_TEST_STORE_URL", Some("mongodb://localhost:27017"))],
            p.local_store("alice"),
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("mongo"));
    }
}
