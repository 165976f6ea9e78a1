//! Stack engine: the single "up" helper behind every provisioning action.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{Context, bail};
use async_trait::async_trait;
use stackboot::StackOutputs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Kind of infrastructure program a stack runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Repository,
    CiTrust,
    Branch,
    ManagedStore,
    Service,
}

impl ProgramKind {
    /// Directory under the programs root holding this program.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Repository => "repository",
            Self::CiTrust => "ci-trust",
            Self::Branch => "branch",
            Self::ManagedStore => "managed-store",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One named stack plus the parameters of its program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackProgram {
    pub stack: String,
    pub kind: ProgramKind,
    pub config: BTreeMap<String, String>,
}

impl StackProgram {
    #[must_use]
    pub fn new(stack: impl Into<String>, kind: ProgramKind) -> Self {
        Self {
            stack: stack.into(),
            kind,
            config: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Creates or updates a stack and returns its flattened outputs.
#[async_trait]
pub trait StackEngine: Send + Sync {
    async fn up(&self, program: &StackProgram) -> anyhow::Result<StackOutputs>;
}

/// Logs the program it would run and returns no outputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunEngine;

#[async_trait]
impl StackEngine for DryRunEngine {
    async fn up(&self, program: &StackProgram) -> anyhow::Result<StackOutputs> {
        info!(
            stack = %program.stack,
            program = %program.kind,
            config = ?program.config,
            "Dry run: skipping stack update"
        );
        Ok(StackOutputs::new())
    }
}

/// Drives the provisioning CLI against per-kind program directories.
#[derive(Debug, Clone)]
pub struct PulumiCliEngine {
    binary: String,
    programs_dir: PathBuf,
    logs_dir: PathBuf,
}

impl PulumiCliEngine {
    #[must_use]
    pub fn new(
        binary: impl Into<String>,
        programs_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            programs_dir: programs_dir.into(),
            logs_dir: logs_dir.into(),
        }
    }

    async fn exec(&self, dir: &Path, args: &[String]) -> anyhow::Result<Output> {
        debug!(binary = %self.binary, ?args, dir = %dir.display(), "Running provisioning CLI");
        Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run '{}'", self.binary))
    }
}

#[async_trait]
impl StackEngine for PulumiCliEngine {
    async fn up(&self, program: &StackProgram) -> anyhow::Result<StackOutputs> {
        let dir = self.programs_dir.join(program.kind.dir_name());
        let stack = program.stack.as_str();

        let select = self
            .exec(
                &dir,
                &args(["stack", "select", "--create", "--non-interactive", stack]),
            )
            .await?;
        ensure_success(&select, &format!("select stack '{stack}'"))?;

        tokio::fs::create_dir_all(&self.logs_dir)
            .await
            .with_context(|| format!("failed to create {}", self.logs_dir.display()))?;
        let update = next_update_number(&self.logs_dir, stack).await?;
        let log_path = self.logs_dir.join(format!("{stack}-{update}.log"));

        info!(stack = %stack, program = %program.kind, "==== Start stack update ====");
        info!("(detailed local logs at: {})", log_path.display());

        let mut up_args = args([
            "up",
            "--yes",
            "--non-interactive",
            "--skip-preview",
            "--stack",
            stack,
        ]);
        for (key, value) in &program.config {
            up_args.push("--config".to_owned());
            up_args.push(format!("{key}={value}"));
        }
        let up = self.exec(&dir, &up_args).await?;
        append_log(&log_path, &up).await?;
        ensure_success(&up, &format!("update stack '{stack}'"))?;

        let out = self
            .exec(
                &dir,
                &args(["stack", "output", "--json", "--show-secrets", "--stack", stack]),
            )
            .await?;
        ensure_success(&out, &format!("read outputs of stack '{stack}'"))?;
        let outputs: StackOutputs = serde_json::from_slice(&out.stdout)
            .with_context(|| format!("stack '{stack}' produced unreadable outputs"))?;

        info!(stack = %stack, outputs = outputs.iter().count(), "==== End stack update ====");
        Ok(outputs)
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_owned()).collect()
}

fn ensure_success(output: &Output, what: &str) -> anyhow::Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!("failed to {what} ({}): {}", output.status, stderr.trim());
}

async fn append_log(path: &Path, output: &Output) -> anyhow::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(&output.stdout).await?;
    file.write_all(&output.stderr).await?;
    file.flush().await?;
    Ok(())
}

/// One past the highest `{stack}-{n}.log` already present in `logs_dir`.
async fn next_update_number(logs_dir: &Path, stack: &str) -> anyhow::Result<u64> {
    let prefix = format!("{stack}-");
    let mut last = 0;
    let mut entries = match tokio::fs::read_dir(logs_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(e).with_context(|| format!("failed to list {}", logs_dir.display())),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(n) = name
            .to_str()
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|n| n.strip_suffix(".log"))
            .and_then(|n| n.parse::<u64>().ok())
        else {
            continue;
        };
        last = last.max(n);
    }
    Ok(last + 1)
}
