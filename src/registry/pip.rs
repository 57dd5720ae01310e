//! Live registry backed by `python -m pip`, one subprocess per query.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    check_name, dedup_names, manifest, normalize_name, InstallReport, MissingReport, PackageRegistry,
    RegistryError,
};
use crate::{
    config::Config,
    process::{self, python, CommandOutcome, ProcessOutput},
};

/// Deadlines for the different installer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipTimeouts {
    pub install: Duration,
    pub uninstall: Duration,
    pub update: Duration,
    pub query: Duration,
}

impl Default for PipTimeouts {
    fn default() -> Self {
        Self {
            install: Duration::from_secs(300),
            uninstall: Duration::from_secs(60),
            update: Duration::from_secs(300),
            query: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipRegistry {
    interpreter: String,
    manifest: PathBuf,
    timeouts: PipTimeouts,
}

#[derive(Debug, Deserialize)]
struct PipListEntry {
    name: String,
    version: String,
}

impl PipRegistry {
    pub fn new(interpreter: impl Into<String>, manifest: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            manifest: manifest.into(),
            timeouts: PipTimeouts::default(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.python_bin(), cfg.requirements_path()).with_timeouts(PipTimeouts {
            install: cfg.duration_secs("INSTALL_TIMEOUT", 300),
            uninstall: cfg.duration_secs("UNINSTALL_TIMEOUT", 60),
            update: cfg.duration_secs("UPDATE_TIMEOUT", 300),
            query: cfg.duration_secs("QUERY_TIMEOUT", 60),
        })
    }

    pub fn with_timeouts(mut self, timeouts: PipTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    async fn pip(&self, args: &[&str], limit: Duration) -> Result<ProcessOutput, RegistryError> {
        let cmd = python::pip(&self.interpreter, args);
        match process::run_with_timeout(cmd, limit).await {
            Ok(CommandOutcome::Exited(out)) if out.success() => Ok(out),
            Ok(CommandOutcome::Exited(out)) => Err(RegistryError::Exit {
                code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            }),
            Ok(CommandOutcome::TimedOut) => Err(RegistryError::Timeout { secs: limit.as_secs() }),
            Err(e) => Err(RegistryError::Spawn(e.to_string())),
        }
    }

    async fn pip_list(&self, extra: &[&str]) -> Result<Vec<PipListEntry>, RegistryError> {
        let mut args = vec!["list", "--format=json"];
        args.extend_from_slice(extra);
        let out = self.pip(&args, self.timeouts.query).await?;
        serde_json::from_str(out.stdout.trim()).map_err(|e| RegistryError::Parse(e.to_string()))
    }

    async fn install_one(&self, name: &str) -> Result<(), RegistryError> {
        let name = check_name(name)?;
        if self.is_installed(name).await {
            info!("{} already installed", name);
            return Ok(());
        }
        match self.pip(&["install", name], self.timeouts.install).await {
            Ok(_) => {
                info!("installed {}", name);
                Ok(())
            }
            Err(e) => {
                warn!("failed to install {}: {}", name, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl PackageRegistry for PipRegistry {
    async fn list_installed(&self) -> Vec<String> {
        match self.pip_list(&[]).await {
            Ok(entries) => {
                let mut packages: Vec<String> = entries
                    .into_iter()
                    .map(|e| format!("{}=={}", e.name, e.version))
                    .collect();
                packages.sort();
                packages
            }
            Err(e) => {
                warn!("failed to list installed packages: {}", e);
                Vec::new()
            }
        }
    }

    async fn is_installed(&self, name: &str) -> bool {
        let Ok(name) = check_name(normalize_name(name)) else {
            return false;
        };
        match self.pip(&["show", "--quiet", name], self.timeouts.query).await {
            Ok(_) => true,
            Err(RegistryError::Exit { .. }) => false,
            Err(e) => {
                debug!("installed check for {} failed: {}", name, e);
                false
            }
        }
    }

    async fn install(&self, names: &[String]) -> InstallReport {
        let mut report = InstallReport::default();
        for name in dedup_names(names) {
            let result = self.install_one(&name).await;
            report.push(name, result);
        }
        report
    }

    async fn uninstall(&self, name: &str) -> Result<(), RegistryError> {
        let name = check_name(name)?;
        let result = self
            .pip(&["uninstall", "-y", name], self.timeouts.uninstall)
            .await
            .map(|_| ());
        match &result {
            Ok(()) => info!("uninstalled {}", name),
            Err(e) => warn!("failed to uninstall {}: {}", name, e),
        }
        result
    }

    async fn update(&self, name: &str) -> Result<(), RegistryError> {
        let name = check_name(name)?;
        let result = self
            .pip(&["install", "--upgrade", name], self.timeouts.update)
            .await
            .map(|_| ());
        match &result {
            Ok(()) => info!("updated {}", name),
            Err(e) => warn!("failed to update {}: {}", name, e),
        }
        result
    }

    async fn check_missing(&self) -> MissingReport {
        let mut report = MissingReport::default();
        for requirement in manifest::read_requirements(&self.manifest) {
            if !self.is_installed(&requirement).await {
                report.unsatisfied.push(requirement);
            }
        }
        match self.pip_list(&["--outdated"]).await {
            Ok(entries) => report.outdated = entries.into_iter().map(|e| e.name).collect(),
            Err(e) => warn!("failed to query outdated packages: {}", e),
        }
        report
    }

    async fn interpreter_version(&self) -> Option<String> {
        let cmd = python::version(&self.interpreter);
        match process::run_with_timeout(cmd, self.timeouts.query).await {
            Ok(CommandOutcome::Exited(out)) if out.success() => {
                // Python 2 printed the banner on stderr.
                let banner = if out.stdout.trim().is_empty() { &out.stderr } else { &out.stdout };
                Some(banner.trim().to_string()).filter(|s| !s.is_empty())
            }
            Ok(_) => None,
            Err(e) => {
                warn!("cannot query interpreter version: {}", e);
                None
            }
        }
    }
}
