//! In-memory registry for tests and dry runs.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{
    canonical_name, check_name, dedup_names, normalize_name, InstallReport, MissingReport, PackageRegistry,
    RegistryError,
};

#[derive(Debug, Default)]
struct Inventory {
    /// canonical name -> (display name, version)
    installed: BTreeMap<String, (String, String)>,
    failing: BTreeSet<String>,
    outdated: Vec<String>,
    requirements: Vec<String>,
    /// Every name handed to `is_installed`, in call order.
    queried: Vec<String>,
    /// Every name that reached an actual install attempt.
    install_attempts: Vec<String>,
}

/// A fake environment: installs succeed unless the name was marked failing.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    inner: Mutex<Inventory>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.lock()
            .installed
            .insert(canonical_name(name), (name.to_string(), version.to_string()));
        self
    }

    /// Installs of `name` will fail with a nonzero installer exit.
    pub fn with_failing(self, name: &str) -> Self {
        self.lock().failing.insert(canonical_name(name));
        self
    }

    pub fn with_outdated(self, name: &str) -> Self {
        self.lock().outdated.push(name.to_string());
        self
    }

    pub fn with_requirements(self, requirements: &[&str]) -> Self {
        self.lock().requirements = requirements.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn queried(&self) -> Vec<String> {
        self.lock().queried.clone()
    }

    pub fn install_attempts(&self) -> Vec<String> {
        self.lock().install_attempts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inventory> {
        // A panic while holding the lock only happens in a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn contains(&self, name: &str) -> bool {
        self.lock().installed.contains_key(&canonical_name(name))
    }
}

#[async_trait]
impl PackageRegistry for InMemoryRegistry {
    async fn list_installed(&self) -> Vec<String> {
        let inv = self.lock();
        let mut packages: Vec<String> = inv
            .installed
            .values()
            .map(|(name, version)| format!("{}=={}", name, version))
            .collect();
        packages.sort();
        packages
    }

    async fn is_installed(&self, name: &str) -> bool {
        self.lock().queried.push(name.to_string());
        self.contains(name)
    }

    async fn install(&self, names: &[String]) -> InstallReport {
        let mut report = InstallReport::default();
        for name in dedup_names(names) {
            if let Err(e) = check_name(&name) {
                report.push(name, Err(e));
                continue;
            }
            if self.contains(&name) {
                report.push(name, Ok(()));
                continue;
            }
            let mut inv = self.lock();
            inv.install_attempts.push(name.clone());
            let key = canonical_name(&name);
            let result = if inv.failing.contains(&key) {
                Err(RegistryError::Exit {
                    code: Some(1),
                    stderr: format!("No matching distribution found for {}", name),
                })
            } else {
                inv.installed
                    .insert(key, (normalize_name(&name).to_string(), "0.0.0".to_string()));
                Ok(())
            };
            drop(inv);
            report.push(name, result);
        }
        report
    }

    async fn uninstall(&self, name: &str) -> Result<(), RegistryError> {
        check_name(name)?;
        match self.lock().installed.remove(&canonical_name(name)) {
            Some(_) => Ok(()),
            None => Err(RegistryError::Exit {
                code: Some(1),
                stderr: format!("Skipping {} as it is not installed.", name),
            }),
        }
    }

    async fn update(&self, name: &str) -> Result<(), RegistryError> {
        check_name(name)?;
        let mut inv = self.lock();
        let key = canonical_name(name);
        if inv.failing.contains(&key) {
            return Err(RegistryError::Exit {
                code: Some(1),
                stderr: format!("No matching distribution found for {}", name),
            });
        }
        inv.outdated.retain(|n| canonical_name(n) != key);
        let display = normalize_name(name).to_string();
        inv.installed
            .entry(key)
            .and_modify(|(_, version)| *version = format!("{}.post1", version))
            .or_insert((display, "0.0.0".to_string()));
        Ok(())
    }

    async fn check_missing(&self) -> MissingReport {
        let (requirements, outdated) = {
            let inv = self.lock();
            (inv.requirements.clone(), inv.outdated.clone())
        };
        let unsatisfied = requirements
            .into_iter()
            .filter(|r| !self.contains(r))
            .collect();
        MissingReport { unsatisfied, outdated }
    }

    async fn interpreter_version(&self) -> Option<String> {
        Some("Python 3 (in-memory)".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn version_suffix_does_not_change_installed_check() {
        let registry = InMemoryRegistry::new().with_installed("pkg", "1.0");
        assert!(registry.is_installed("pkg").await);
        assert!(registry.is_installed("pkg==1.0").await);
        assert!(registry.is_installed("pkg>=0.5").await);
        assert!(!registry.is_installed("other").await);
    }

    #[tokio::test]
    async fn batch_install_is_per_package() {
        let registry = InMemoryRegistry::new()
            .with_installed("requests", "2.31.0")
            .with_failing("nonexistent-pkg");
        let names = vec![
            "requests".to_string(),
            "rich".to_string(),
            "nonexistent-pkg".to_string(),
            "rich".to_string(),
        ];
        let report = registry.install(&names).await;
        assert_eq!(report.succeeded(), vec!["requests", "rich"]);
        assert_eq!(report.failed(), vec!["nonexistent-pkg"]);
        // Already installed names never reach the installer.
        assert_eq!(registry.install_attempts(), vec!["rich", "nonexistent-pkg"]);
        assert!(registry.is_installed("rich").await);
    }

    #[tokio::test]
    async fn listing_is_sorted_name_version() {
        let registry = InMemoryRegistry::new()
            .with_installed("zeta", "1.0")
            .with_installed("alpha", "2.1");
        assert_eq!(registry.list_installed().await, vec!["alpha==2.1", "zeta==1.0"]);
    }

    #[tokio::test]
    async fn uninstall_and_update() {
        let registry = InMemoryRegistry::new()
            .with_installed("rich", "13.0")
            .with_outdated("rich");
        registry.update("rich").await.unwrap();
        assert!(registry.check_missing().await.is_empty());
        registry.uninstall("rich").await.unwrap();
        assert!(registry.uninstall("rich").await.is_err());
        assert_eq!(
            registry.update("-e.").await,
            Err(RegistryError::InvalidName("-e.".into()))
        );
    }

    #[tokio::test]
    async fn check_missing_unions_both_reasons() {
        let registry = InMemoryRegistry::new()
            .with_installed("flask", "3.0")
            .with_requirements(&["flask>=2", "httpx==0.27"])
            .with_outdated("flask");
        let report = registry.check_missing().await;
        assert_eq!(report.unsatisfied, vec!["httpx==0.27"]);
        assert_eq!(report.outdated, vec!["flask"]);
        assert_eq!(report.all(), vec!["flask", "httpx==0.27"]);
    }

    #[tokio::test]
    async fn empty_environment_has_nothing_missing() {
        assert!(InMemoryRegistry::new().check_missing().await.all().is_empty());
    }
}
