use anyhow::Result;
use pipbot::{
    bot::Dispatcher,
    execution::{python::DEFAULT_TIMEOUT, ScriptRunner},
    reconcile::Reconciler,
    registry::{InMemoryRegistry, PackageRegistry},
};
use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn runner(registry: Arc<InMemoryRegistry>) -> ScriptRunner {
    let registry: Arc<dyn PackageRegistry> = registry;
    ScriptRunner::new(Reconciler::new(registry), "python3")
}

fn dispatcher(staging: &Path) -> Dispatcher {
    let registry: Arc<dyn PackageRegistry> = Arc::new(InMemoryRegistry::new());
    let runner = ScriptRunner::new(Reconciler::new(registry.clone()), "python3");
    Dispatcher::new(registry, runner, staging.to_path_buf())
}

#[test]
fn default_deadline_is_sixty_seconds() {
    assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(60));
}

#[tokio::test]
async fn test_demo_upload_runs_and_is_removed() -> Result<()> {
    if !python_available() {
        println!("python3 not found, skipping");
        return Ok(());
    }
    let staging = tempfile::tempdir()?;
    let outcome = dispatcher(staging.path())
        .run_upload("demo.py", b"print(\"hi\")\n")
        .await?;

    assert!(outcome.success);
    assert_eq!(outcome.stdout, "hi\n");
    assert_eq!(outcome.stderr, "");
    assert_eq!(outcome.exit_code, Some(0));
    assert!(!staging.path().join("demo.py").exists());
    Ok(())
}

#[tokio::test]
async fn test_failed_upload_is_removed_too() -> Result<()> {
    if !python_available() {
        println!("python3 not found, skipping");
        return Ok(());
    }
    let staging = tempfile::tempdir()?;
    let outcome = dispatcher(staging.path())
        .run_upload("boom.py", b"raise SystemExit(3)\n")
        .await?;

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, Some(3));
    assert!(!outcome.timed_out);
    assert!(!staging.path().join("boom.py").exists());
    Ok(())
}

#[tokio::test]
async fn test_stderr_with_zero_exit_is_success() -> Result<()> {
    if !python_available() {
        println!("python3 not found, skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("warn.py");
    std::fs::write(&script, "import sys\nsys.stderr.write(\"careful\\n\")\n")?;

    let outcome = runner(Arc::new(InMemoryRegistry::new())).execute_file(&script).await;
    assert!(outcome.success);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "careful\n");
    // The runner never deletes the file it was given.
    assert!(script.exists());
    Ok(())
}

#[tokio::test]
async fn test_runs_in_script_directory() -> Result<()> {
    if !python_available() {
        println!("python3 not found, skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("cwd.py");
    std::fs::write(&script, "import os\nprint(os.getcwd())\n")?;

    let outcome = runner(Arc::new(InMemoryRegistry::new())).execute_file(&script).await;
    assert!(outcome.success);
    assert_eq!(
        Path::new(outcome.stdout.trim()).canonicalize()?,
        dir.path().canonicalize()?
    );
    Ok(())
}

#[tokio::test]
async fn test_timeout_kills_the_script() -> Result<()> {
    if !python_available() {
        println!("python3 not found, skipping");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("sleepy.py");
    std::fs::write(
        &script,
        "import os, time\nwith open(\"pid.txt\", \"w\") as f:\n    f.write(str(os.getpid()))\ntime.sleep(30)\n",
    )?;

    let started = Instant::now();
    let outcome = runner(Arc::new(InMemoryRegistry::new()))
        .with_timeout(Duration::from_secs(1))
        .execute_file(&script)
        .await;

    assert!(!outcome.success);
    assert!(outcome.timed_out);
    assert_eq!(outcome.stderr, "timeout after 1 seconds");
    assert!(started.elapsed() < Duration::from_secs(15));

    let pid = std::fs::read_to_string(dir.path().join("pid.txt"))?;
    let alive = std::process::Command::new("kill")
        .args(["-0", pid.trim()])
        .status()?
        .success();
    assert!(!alive, "script process {} still running", pid.trim());
    Ok(())
}

#[tokio::test]
async fn test_failed_reconciliation_skips_execution() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let script = dir.path().join("needs.py");
    std::fs::write(
        &script,
        "import os\nimport definitely_missing_pkg\nopen(\"ran.txt\", \"w\").write(\"x\")\n",
    )?;

    let registry = Arc::new(InMemoryRegistry::new().with_failing("definitely_missing_pkg"));
    let outcome = runner(registry.clone()).execute_file(&script).await;

    assert!(!outcome.success);
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.stderr, "failed to install packages: definitely_missing_pkg");
    assert!(!dir.path().join("ran.txt").exists());
    assert_eq!(registry.queried(), vec!["definitely_missing_pkg"]);
    Ok(())
}
