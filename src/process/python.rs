//! Python interpreter command lines (pip subcommands, script runs).

use std::path::Path;

use tokio::process::Command;

/// `python -m pip <args..>` with the version nag turned off.
pub fn pip(interpreter: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(interpreter);
    cmd.arg("-m")
        .arg("pip")
        .args(args)
        .arg("--disable-pip-version-check")
        .env("PIP_NO_INPUT", "1");
    cmd
}

/// Run `script` with its containing directory as the working directory.
pub fn script(interpreter: &str, script: &Path) -> Command {
    let mut cmd = Command::new(interpreter);
    cmd.arg(script);
    if let Some(dir) = script.parent().filter(|d| !d.as_os_str().is_empty()) {
        cmd.current_dir(dir);
    }
    cmd
}

pub fn version(interpreter: &str) -> Command {
    let mut cmd = Command::new(interpreter);
    cmd.arg("--version");
    cmd
}
