use anyhow::Result;
use pipbot::{
    bot::{format, Bot, BotCommand, Dispatcher, Reply},
    cli::{self, Command},
    config::Config,
    printer::TerminalReply,
    telegram::TelegramClient,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Load config (also picks up a .env file)
    let cfg = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pipbot=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let dispatcher = Dispatcher::from_config(&cfg);
    let out = TerminalReply::detect();

    // Route to handler
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            if cfg.bot_token().is_none() {
                error!("❌ TELEGRAM_BOT_TOKEN not found");
                info!("Set it in the environment, a .env file or {}", cfg.config_path.display());
                std::process::exit(1);
            }
            let client = TelegramClient::from_config(&cfg)?;
            Bot::new(client, dispatcher).run().await
        }
        Command::Packages => dispatcher.handle_command(BotCommand::Packages, &out).await,
        Command::Install { packages } => {
            dispatcher.handle_command(BotCommand::Install(packages), &out).await
        }
        Command::Uninstall { package } => {
            dispatcher.handle_command(BotCommand::Uninstall(Some(package)), &out).await
        }
        Command::Update { package } => {
            dispatcher.handle_command(BotCommand::Update(Some(package)), &out).await
        }
        Command::Check => dispatcher.handle_command(BotCommand::Check, &out).await,
        Command::Status => dispatcher.handle_command(BotCommand::Status, &out).await,
        Command::Run { file } => {
            let outcome = dispatcher.runner().execute_file(&file).await;
            let text = format::execution(&outcome);
            if outcome.success {
                out.send(&text).await
            } else {
                out.error(&text);
                std::process::exit(outcome.exit_code.filter(|c| *c != 0).unwrap_or(1));
            }
        }
    }
}
