//! Bring a script's third-party imports into the environment before it runs.

use std::{path::Path, sync::Arc};

use tracing::info;

use crate::{
    imports::{extract_imports, ImportSet},
    registry::PackageRegistry,
};

mod stdlib;

pub use stdlib::{is_stdlib_module, STDLIB_MODULES};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to install packages: {}", .failed.join(", "))]
    InstallFailed { failed: Vec<String> },
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Names that were missing and got installed by this call.
    pub installed: Vec<String>,
}

impl Reconciled {
    pub fn message(&self) -> String {
        if self.installed.is_empty() {
            "all dependencies already satisfied".to_string()
        } else {
            format!("installed: {}", self.installed.join(", "))
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<dyn PackageRegistry>,
}

impl Reconciler {
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self { registry }
    }

    /// Install every non-stdlib import of `path` that is not already present.
    pub async fn reconcile(&self, path: &Path) -> Result<Reconciled, ReconcileError> {
        self.reconcile_imports(&extract_imports(path)).await
    }

    pub async fn reconcile_imports(&self, imports: &ImportSet) -> Result<Reconciled, ReconcileError> {
        let mut missing = Vec::new();
        for name in imports.iter().filter(|name| !is_stdlib_module(name)) {
            if !self.registry.is_installed(name).await {
                missing.push(name.clone());
            }
        }
        if missing.is_empty() {
            return Ok(Reconciled::default());
        }

        info!("missing packages: {:?}", missing);
        let report = self.registry.install(&missing).await;
        if report.all_succeeded() {
            Ok(Reconciled { installed: missing })
        } else {
            let failed = report.failed().into_iter().map(str::to_string).collect();
            Err(ReconcileError::InstallFailed { failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{imports::extract_imports_from_source, registry::InMemoryRegistry};

    #[tokio::test]
    async fn stdlib_names_are_never_queried() {
        let registry = Arc::new(InMemoryRegistry::new());
        let reconciler = Reconciler::new(registry.clone());
        let imports = extract_imports_from_source("import os, sys, json\nfrom collections import deque\nimport rich\n");
        let outcome = reconciler.reconcile_imports(&imports).await.unwrap();
        assert_eq!(outcome.installed, vec!["rich"]);
        assert_eq!(registry.queried(), vec!["rich"]);
        assert_eq!(registry.install_attempts(), vec!["rich"]);
        assert_eq!(outcome.message(), "installed: rich");
    }

    #[tokio::test]
    async fn failure_names_exactly_the_failed_packages() {
        let registry = Arc::new(
            InMemoryRegistry::new()
                .with_failing("badpkg")
                .with_failing("worsepkg"),
        );
        let reconciler = Reconciler::new(registry);
        let imports = extract_imports_from_source("import badpkg\nimport goodpkg\nimport worsepkg\n");
        let err = reconciler.reconcile_imports(&imports).await.unwrap_err();
        assert_eq!(
            err,
            ReconcileError::InstallFailed { failed: vec!["badpkg".into(), "worsepkg".into()] }
        );
        assert_eq!(err.to_string(), "failed to install packages: badpkg, worsepkg");
    }

    #[tokio::test]
    async fn nothing_missing_installs_nothing() {
        let registry = Arc::new(InMemoryRegistry::new().with_installed("requests", "2.31.0"));
        let reconciler = Reconciler::new(registry.clone());
        let imports = extract_imports_from_source("import requests\nimport time\n");
        let outcome = reconciler.reconcile_imports(&imports).await.unwrap();
        assert!(outcome.installed.is_empty());
        assert_eq!(outcome.message(), "all dependencies already satisfied");
        assert!(registry.install_attempts().is_empty());
    }
}
