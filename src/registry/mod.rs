//! Package registry adapter: the live set of installed Python distributions.
//!
//! Every operation is answered against live state. Failures never escape as
//! anything but [`RegistryError`] values, `false`, or an empty listing.

use std::collections::BTreeSet;

use async_trait::async_trait;

pub mod manifest;
pub mod memory;
pub mod pip;

pub use memory::InMemoryRegistry;
pub use pip::PipRegistry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to start installer: {0}")]
    Spawn(String),
    #[error("timed out after {secs} seconds")]
    Timeout { secs: u64 },
    #[error("installer exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },
    #[error("unexpected installer output: {0}")]
    Parse(String),
    #[error("invalid package name {0:?}")]
    InvalidName(String),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "a signal".into())
}

/// Per-package results of one install batch, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub entries: Vec<(String, Result<(), RegistryError>)>,
}

impl InstallReport {
    pub fn push(&mut self, name: impl Into<String>, result: Result<(), RegistryError>) {
        self.entries.push((name.into(), result));
    }

    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|(_, r)| r.is_ok())
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// Requirements that need attention, split by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingReport {
    /// Manifest entries not satisfied by the environment.
    pub unsatisfied: Vec<String>,
    /// Installed packages with a newer release available.
    pub outdated: Vec<String>,
}

impl MissingReport {
    /// Deduplicated union of both reasons.
    pub fn all(&self) -> Vec<String> {
        self.unsatisfied
            .iter()
            .chain(self.outdated.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.unsatisfied.is_empty() && self.outdated.is_empty()
    }
}

#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Sorted `name==version` strings; empty when the query fails.
    async fn list_installed(&self) -> Vec<String>;

    /// Version suffixes are ignored: `pkg==1.0` and `pkg` ask the same question.
    async fn is_installed(&self, name: &str) -> bool;

    /// Install each name independently; already installed names succeed untouched.
    async fn install(&self, names: &[String]) -> InstallReport;

    async fn uninstall(&self, name: &str) -> Result<(), RegistryError>;

    async fn update(&self, name: &str) -> Result<(), RegistryError>;

    async fn check_missing(&self) -> MissingReport;

    /// Interpreter version banner, when it can be determined.
    async fn interpreter_version(&self) -> Option<String>;
}

/// Strip any version constraint, extras or marker: `requests[socks]>=2; python_version>"3"` -> `requests`.
pub fn normalize_name(spec: &str) -> &str {
    let spec = spec.trim();
    let end = spec
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | ';' | '[' | '@') || c.is_whitespace())
        .unwrap_or(spec.len());
    spec[..end].trim()
}

/// Reject names the installer would read as options, such as `--index-url=..`.
pub fn check_name(name: &str) -> Result<&str, RegistryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

/// Comparison key per PEP 503: case-insensitive, runs of `-_.` are equivalent.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = false;
    for c in normalize_name(name).chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_sep {
                out.push('-');
            }
            last_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_sep = false;
        }
    }
    out
}

/// Drop repeated names, keeping the first occurrence.
pub fn dedup_names(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(canonical_name(n)))
        .map(str::to_string)
        .collect()
}
