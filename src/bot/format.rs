//! Reply texts (Telegram legacy Markdown).

use crate::{
    execution::ExecutionOutcome,
    registry::{InstallReport, MissingReport, RegistryError},
};

pub const LIST_LIMIT: usize = 20;
pub const CHECK_LIMIT: usize = 10;
pub const OUTPUT_LIMIT: usize = 3000;

pub const WELCOME: &str = "\
🤖 *Welcome to the Python package manager bot!*

With this bot you can:
✅ install Python packages
✅ list installed packages
✅ update or remove packages
✅ run Python files

*📋 Commands:*
/packages - list installed packages
/install [package] - install packages
/uninstall [package] - remove a package
/update [package] - upgrade a package
/check - find missing or outdated packages
/status - show bot status
/help - detailed help

📁 *To run a script:* send a .py file";

pub const HELP: &str = "\
🔍 *Detailed help*

*Packages:*
• `/install requests` - install requests
• `/install pandas numpy` - install several packages
• `/uninstall requests` - remove a package
• `/update requests` - upgrade a package
• `/packages` - list every package
• `/check` - check for missing packages

*Files:*
• send a `.py` file - it runs automatically
• packages it imports are installed first";

pub const GENERIC_ERROR: &str = "❌ An error occurred. Please try again.";
pub const NOT_PYTHON: &str = "⚠️ Please send only .py files.";
pub const ANALYZING: &str = "🔍 Analyzing the Python file...";
pub const CHECKING: &str = "🔍 Checking for missing packages...";

pub const INSTALL_USAGE: &str = "⚠️ Please give the package to install.\nExample: `/install requests`";
pub const UNINSTALL_USAGE: &str = "⚠️ Please give the package to uninstall.";
pub const UPDATE_USAGE: &str = "⚠️ Please give the package to update.";

/// First `max` characters of `text`, and whether anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

fn bullet_list(items: &[String], limit: usize) -> String {
    let mut out = String::new();
    for item in items.iter().take(limit) {
        out.push_str(&format!("• {}\n", item));
    }
    if items.len() > limit {
        out.push_str(&format!("\n...and {} more", items.len() - limit));
    }
    out
}

pub fn package_list(packages: &[String]) -> String {
    if packages.is_empty() {
        return "📦 No packages installed.".to_string();
    }
    let items: Vec<String> = packages.iter().map(|p| format!("`{}`", p)).collect();
    format!("📦 *Installed packages:*\n\n{}", bullet_list(&items, LIST_LIMIT))
}

pub fn installing(names: &[String]) -> String {
    format!("📦 Installing `{}`...", names.join(", "))
}

pub fn install_report(report: &InstallReport) -> String {
    let mut out = String::from("✅ *Installed:*\n");
    for name in report.succeeded() {
        out.push_str(&format!("• `{}`\n", name));
    }
    let failed = report.failed();
    if !failed.is_empty() {
        out.push_str("\n❌ *Failed:*\n");
        for name in failed {
            out.push_str(&format!("• `{}`\n", name));
        }
    }
    out
}

pub fn uninstalling(name: &str) -> String {
    format!("🗑️ Uninstalling `{}`...", name)
}

pub fn uninstall_result(name: &str, result: &Result<(), RegistryError>) -> String {
    match result {
        Ok(()) => format!("✅ `{}` uninstalled.", name),
        Err(_) => format!("❌ `{}` could not be uninstalled.", name),
    }
}

pub fn updating(name: &str) -> String {
    format!("🔄 Updating `{}`...", name)
}

pub fn update_result(name: &str, result: &Result<(), RegistryError>) -> String {
    match result {
        Ok(()) => format!("✅ `{}` updated.", name),
        Err(_) => format!("❌ `{}` could not be updated.", name),
    }
}

pub fn missing_report(report: &MissingReport) -> String {
    let all = report.all();
    if all.is_empty() {
        return "✅ All packages are installed and up to date!".to_string();
    }
    let tagged: Vec<String> = all
        .iter()
        .map(|name| {
            let missing = report.unsatisfied.contains(name);
            let outdated = report.outdated.contains(name);
            match (missing, outdated) {
                (true, true) => format!("`{}` (missing, outdated)", name),
                (true, false) => format!("`{}` (missing)", name),
                _ => format!("`{}` (outdated)", name),
            }
        })
        .collect();
    format!(
        "📦 *Missing or outdated packages:*\n\n{}\n\n📥 To install: `/install package_name`",
        bullet_list(&tagged, CHECK_LIMIT)
    )
}

pub fn status(package_count: usize, python_version: Option<&str>) -> String {
    format!(
        "🟢 *Bot status: running*\n\n\
         *System:*\n\
         • Packages: {}\n\
         • Python: {}\n\
         • Bot version: {}\n\n\
         *Features:*\n\
         ✅ Package install\n\
         ✅ Package removal\n\
         ✅ Package update\n\
         ✅ Python file execution\n\
         ✅ Automatic dependency install",
        package_count,
        python_version.unwrap_or("unknown"),
        env!("CARGO_PKG_VERSION"),
    )
}

pub fn downloading(file_name: &str) -> String {
    format!("📁 Downloading `{}`...", file_name)
}

fn code_block(text: &str, limit: usize) -> String {
    let (shown, cut) = truncate_chars(text, limit);
    let mut out = format!("```\n{}\n```", shown);
    if cut {
        out.push_str(&format!("\n\n... (output too long, first {} characters shown)", limit));
    }
    out
}

/// Stdout and the stderr shown alongside it share one `OUTPUT_LIMIT` budget.
pub fn execution(outcome: &ExecutionOutcome) -> String {
    if outcome.success {
        let mut out = String::from("✅ *File ran successfully!*\n\n📤 *Output:*\n");
        if outcome.stdout.is_empty() {
            out.push_str("(no output)");
        } else {
            out.push_str(&code_block(&outcome.stdout, OUTPUT_LIMIT));
        }
        if !outcome.stderr.trim().is_empty() {
            let left = OUTPUT_LIMIT - outcome.stdout.chars().count().min(OUTPUT_LIMIT);
            if left == 0 {
                out.push_str("\n\n⚠️ *Stderr:* omitted, output limit reached");
            } else {
                out.push_str("\n\n⚠️ *Stderr:*\n");
                out.push_str(&code_block(&outcome.stderr, left));
            }
        }
        out
    } else {
        let reason = if outcome.stderr.trim().is_empty() {
            match outcome.exit_code {
                Some(code) => format!("exit status {}", code),
                None => "terminated by a signal".to_string(),
            }
        } else {
            outcome.stderr.clone()
        };
        format!("❌ *Execution failed!*\n\n{}", code_block(&reason, OUTPUT_LIMIT))
    }
}
