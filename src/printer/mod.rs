//! Printers: text and markdown (termimad), used by the local CLI.

use anyhow::Result;
use async_trait::async_trait;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::bot::Reply;

pub struct TextPrinter {
    /// Paint errors red.
    pub color: bool,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        println!("{}", text);
    }

    pub fn error(&self, text: &str) {
        eprintln!("{}", self.paint_error(text));
    }

    fn paint_error(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

/// Prints bot replies to stdout: rendered Markdown on a terminal, raw text otherwise.
pub enum TerminalReply {
    Markdown(MarkdownPrinter),
    Plain(TextPrinter),
}

impl TerminalReply {
    pub fn detect() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Markdown(MarkdownPrinter::default())
        } else {
            Self::Plain(TextPrinter { color: false })
        }
    }

    pub fn error(&self, text: &str) {
        match self {
            Self::Markdown(_) => TextPrinter { color: true }.error(text),
            Self::Plain(p) => p.error(text),
        }
    }
}

#[async_trait]
impl Reply for TerminalReply {
    async fn send(&self, text: &str) -> Result<()> {
        match self {
            Self::Markdown(p) => p.print(text),
            Self::Plain(p) => p.print(text),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_painted_only_with_color() {
        assert_eq!(TextPrinter { color: false }.paint_error("boom"), "boom");
        let painted = TextPrinter { color: true }.paint_error("boom");
        assert!(painted.contains("boom"));
        assert!(painted.starts_with("\u{1b}["));
    }
}
