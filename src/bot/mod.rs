//! Command dispatcher: routes chat commands and uploads to the package
//! registry and the script runner, and turns results into replies.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    execution::{ExecutionOutcome, ScriptRunner},
    reconcile::Reconciler,
    registry::{PackageRegistry, PipRegistry},
    telegram::{Message, TelegramClient},
};

pub mod command;
pub mod format;
pub mod staging;

pub use command::BotCommand;
use staging::StagedScript;

/// Where replies for one request go.
#[async_trait]
pub trait Reply: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn PackageRegistry>,
    runner: ScriptRunner,
    staging_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(registry: Arc<dyn PackageRegistry>, runner: ScriptRunner, staging_dir: PathBuf) -> Self {
        Self { registry, runner, staging_dir }
    }

    /// Live pip registry and runner configured from `cfg`.
    pub fn from_config(cfg: &Config) -> Self {
        let registry: Arc<dyn PackageRegistry> = Arc::new(PipRegistry::from_config(cfg));
        let runner = ScriptRunner::new(Reconciler::new(registry.clone()), cfg.python_bin())
            .with_timeout(cfg.exec_timeout());
        Self::new(registry, runner, cfg.staging_dir())
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    pub async fn handle_command(&self, cmd: BotCommand, out: &dyn Reply) -> Result<()> {
        info!("handling {:?}", cmd);
        match cmd {
            BotCommand::Start => out.send(format::WELCOME).await,
            BotCommand::Help => out.send(format::HELP).await,
            BotCommand::Packages => {
                let packages = self.registry.list_installed().await;
                out.send(&format::package_list(&packages)).await
            }
            BotCommand::Install(names) if names.is_empty() => out.send(format::INSTALL_USAGE).await,
            BotCommand::Install(names) => {
                out.send(&format::installing(&names)).await?;
                let report = self.registry.install(&names).await;
                out.send(&format::install_report(&report)).await
            }
            BotCommand::Uninstall(None) => out.send(format::UNINSTALL_USAGE).await,
            BotCommand::Uninstall(Some(name)) => {
                out.send(&format::uninstalling(&name)).await?;
                let result = self.registry.uninstall(&name).await;
                out.send(&format::uninstall_result(&name, &result)).await
            }
            BotCommand::Update(None) => out.send(format::UPDATE_USAGE).await,
            BotCommand::Update(Some(name)) => {
                out.send(&format::updating(&name)).await?;
                let result = self.registry.update(&name).await;
                out.send(&format::update_result(&name, &result)).await
            }
            BotCommand::Check => {
                out.send(format::CHECKING).await?;
                let report = self.registry.check_missing().await;
                out.send(&format::missing_report(&report)).await
            }
            BotCommand::Status => {
                let count = self.registry.list_installed().await.len();
                let version = self.registry.interpreter_version().await;
                out.send(&format::status(count, version.as_deref())).await
            }
        }
    }

    /// Stage an uploaded script, run it, and delete it again whatever happens.
    pub async fn run_upload(&self, file_name: &str, contents: &[u8]) -> Result<ExecutionOutcome> {
        let staged = StagedScript::write(&self.staging_dir, file_name, contents)?;
        Ok(self.runner.execute_file(staged.path()).await)
    }

    /// Reply flow for an uploaded script whose contents are already downloaded.
    pub async fn handle_upload(&self, file_name: &str, contents: &[u8], out: &dyn Reply) -> Result<()> {
        out.send(format::ANALYZING).await?;
        let outcome = self.run_upload(file_name, contents).await?;
        out.send(&format::execution(&outcome)).await
    }
}

pub fn is_python_file(file_name: &str) -> bool {
    file_name.ends_with(".py")
}

struct ChatReply<'a> {
    client: &'a TelegramClient,
    chat_id: i64,
}

#[async_trait]
impl<'a> Reply for ChatReply<'a> {
    async fn send(&self, text: &str) -> Result<()> {
        self.client.send_message(self.chat_id, text).await
    }
}

/// Telegram front-end: polls for updates and handles them one at a time.
pub struct Bot {
    client: TelegramClient,
    dispatcher: Dispatcher,
}

impl Bot {
    pub fn new(client: TelegramClient, dispatcher: Dispatcher) -> Self {
        Self { client, dispatcher }
    }

    /// Poll until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        info!("🚀 bot starting");
        tokio::select! {
            _ = self.poll_loop() => Ok(()),
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("👋 bot stopped");
                Ok(())
            }
        }
    }

    async fn poll_loop(&self) {
        let mut offset = 0;
        loop {
            let updates = match self.client.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!("polling failed: {:#}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else {
                    debug!("ignoring update {} without message", update.update_id);
                    continue;
                };
                let out = ChatReply { client: &self.client, chat_id: message.chat.id };
                if let Err(e) = self.handle_message(&message, &out).await {
                    error!("update {} caused error: {:#}", update.update_id, e);
                    if let Err(e) = out.send(format::GENERIC_ERROR).await {
                        error!("failed to report error to chat {}: {:#}", message.chat.id, e);
                    }
                }
            }
        }
    }

    async fn handle_message(&self, message: &Message, out: &ChatReply<'_>) -> Result<()> {
        if let Some(document) = &message.document {
            let file_name = document.file_name.clone().unwrap_or_default();
            if !is_python_file(&file_name) {
                warn!("rejecting upload {:?}", file_name);
                return out.send(format::NOT_PYTHON).await;
            }
            info!("received {} ({:?} bytes)", file_name, document.file_size);
            out.send(&format::downloading(&file_name)).await?;
            let contents = self.client.download_file(&document.file_id).await?;
            return self.dispatcher.handle_upload(&file_name, &contents, out).await;
        }

        match message.text.as_deref().and_then(BotCommand::parse) {
            Some(cmd) => self.dispatcher.handle_command(cmd, out).await,
            None => {
                debug!("ignoring non-command message {}", message.message_id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl Reply for Collect {
        async fn send(&self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl Collect {
        fn replies(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    fn dispatcher(registry: InMemoryRegistry) -> Dispatcher {
        let registry: Arc<dyn PackageRegistry> = Arc::new(registry);
        let runner = ScriptRunner::new(Reconciler::new(registry.clone()), "python3");
        Dispatcher::new(registry, runner, std::env::temp_dir())
    }

    #[tokio::test]
    async fn install_replies_progress_then_report() {
        let d = dispatcher(InMemoryRegistry::new().with_failing("nope"));
        let out = Collect::default();
        d.handle_command(BotCommand::Install(vec!["rich".into(), "nope".into()]), &out)
            .await
            .unwrap();
        let replies = out.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], "📦 Installing `rich, nope`...");
        assert!(replies[1].contains("`rich`"));
        assert!(replies[1].contains("❌"));
    }

    #[tokio::test]
    async fn missing_arguments_get_usage_hints() {
        let d = dispatcher(InMemoryRegistry::new());
        let out = Collect::default();
        d.handle_command(BotCommand::Install(vec![]), &out).await.unwrap();
        d.handle_command(BotCommand::Uninstall(None), &out).await.unwrap();
        d.handle_command(BotCommand::Update(None), &out).await.unwrap();
        assert_eq!(
            out.replies(),
            vec![format::INSTALL_USAGE, format::UNINSTALL_USAGE, format::UPDATE_USAGE]
        );
    }

    #[tokio::test]
    async fn uninstall_reports_outcome() {
        let d = dispatcher(InMemoryRegistry::new().with_installed("rich", "13.0"));
        let out = Collect::default();
        d.handle_command(BotCommand::Uninstall(Some("rich".into())), &out).await.unwrap();
        d.handle_command(BotCommand::Uninstall(Some("rich".into())), &out).await.unwrap();
        let replies = out.replies();
        assert_eq!(replies[1], "✅ `rich` uninstalled.");
        assert_eq!(replies[3], "❌ `rich` could not be uninstalled.");
    }

    #[tokio::test]
    async fn status_counts_packages() {
        let d = dispatcher(
            InMemoryRegistry::new()
                .with_installed("a", "1")
                .with_installed("b", "2"),
        );
        let out = Collect::default();
        d.handle_command(BotCommand::Status, &out).await.unwrap();
        let reply = &out.replies()[0];
        assert!(reply.contains("• Packages: 2"));
        assert!(reply.contains(env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn check_with_nothing_missing() {
        let d = dispatcher(InMemoryRegistry::new());
        let out = Collect::default();
        d.handle_command(BotCommand::Check, &out).await.unwrap();
        assert_eq!(
            out.replies(),
            vec![format::CHECKING, "✅ All packages are installed and up to date!"]
        );
    }

    #[test]
    fn only_py_suffix_is_accepted() {
        assert!(is_python_file("demo.py"));
        assert!(!is_python_file("demo.txt"));
        assert!(!is_python_file("demo.pyc"));
        assert!(!is_python_file(""));
    }
}
