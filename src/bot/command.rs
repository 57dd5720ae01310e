//! Slash-command parsing for inbound chat text.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Packages,
    Install(Vec<String>),
    /// `None` when the user gave no package name.
    Uninstall(Option<String>),
    Update(Option<String>),
    Check,
    Status,
}

impl BotCommand {
    /// Parse `/name args..`; `/name@SomeBot` is accepted. Non-commands and
    /// unknown commands give `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let args: Vec<String> = words.map(str::to_string).collect();

        let cmd = match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "packages" => Self::Packages,
            "install" => Self::Install(args),
            "uninstall" => Self::Uninstall(args.into_iter().next()),
            "update" => Self::Update(args.into_iter().next()),
            "check" => Self::Check,
            "status" => Self::Status,
            _ => return None,
        };
        Some(cmd)
    }
}
