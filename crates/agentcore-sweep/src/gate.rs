//! Confirmation gate and menu parsing for the interactive front-end
//!
//! Pure functions only: reading stdin and printing prompts happen in the
//! binary, so every decision here can be tested without a terminal.

use agentcore_sweep_common::defaults::CONFIRMATION_TOKEN;

/// What the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Preview,
    Destroy,
}

/// How the destroy request was confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation<'a> {
    /// Prompt bypassed (`--yes`)
    Skipped,
    /// Line typed at the prompt
    Typed(&'a str),
}

/// Gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Preview,
    Destroy,
    /// Confirmation did not match; exit 0 with no side effects
    Cancelled,
}

/// Decide whether a run may mutate anything.
///
/// Only the line terminator is stripped; the remaining text must equal the
/// confirmation token exactly, case included.
pub fn authorize(mode: Mode, confirmation: Confirmation<'_>) -> Authorization {
    match (mode, confirmation) {
        (Mode::Preview, _) => Authorization::Preview,
        (Mode::Destroy, Confirmation::Skipped) => Authorization::Destroy,
        (Mode::Destroy, Confirmation::Typed(line)) => {
            let line = line.strip_suffix('\n').unwrap_or(line);
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line == CONFIRMATION_TOKEN {
                Authorization::Destroy
            } else {
                Authorization::Cancelled
            }
        }
    }
}

/// Prompt shown before a destroy run
pub fn confirmation_prompt(resources: usize) -> String {
    format!(
        "This will permanently delete {resources} resource(s). Type {CONFIRMATION_TOKEN} to continue: "
    )
}

/// Interactive menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Preview,
    Destroy,
    Quit,
}

impl MenuChoice {
    pub const PROMPT: &'static str =
        "1) Preview deletion plan\n2) Destroy resources\n3) Quit\nSelect an option [1-3]: ";

    /// Parse a menu line; surrounding whitespace is ignored
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "1" => Some(MenuChoice::Preview),
            "2" => Some(MenuChoice::Destroy),
            "3" => Some(MenuChoice::Quit),
            _ => None,
        }
    }

    pub fn mode(self) -> Option<Mode> {
        match self {
            MenuChoice::Preview => Some(Mode::Preview),
            MenuChoice::Destroy => Some(Mode::Destroy),
            MenuChoice::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_token_authorizes() {
        assert_eq!(
            authorize(Mode::Destroy, Confirmation::Typed("DELETE\n")),
            Authorization::Destroy
        );
        assert_eq!(
            authorize(Mode::Destroy, Confirmation::Typed("DELETE\r\n")),
            Authorization::Destroy
        );
        assert_eq!(
            authorize(Mode::Destroy, Confirmation::Typed("DELETE")),
            Authorization::Destroy
        );
    }

    #[test]
    fn test_anything_else_cancels() {
        for line in ["delete\n", "Delete", " DELETE\n", "DELETE \n", "yes\n", "", "\n", "DELETE\n\n"] {
            assert_eq!(
                authorize(Mode::Destroy, Confirmation::Typed(line)),
                Authorization::Cancelled,
                "{line:?}"
            );
        }
    }

    #[test]
    fn test_yes_flag_skips_prompt() {
        assert_eq!(
            authorize(Mode::Destroy, Confirmation::Skipped),
            Authorization::Destroy
        );
    }

    #[test]
    fn test_preview_never_needs_confirmation() {
        assert_eq!(
            authorize(Mode::Preview, Confirmation::Typed("no")),
            Authorization::Preview
        );
    }

    #[test]
    fn test_menu_parse() {
        assert_eq!(MenuChoice::parse("1\n"), Some(MenuChoice::Preview));
        assert_eq!(MenuChoice::parse(" 2 "), Some(MenuChoice::Destroy));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::Quit));
        assert_eq!(MenuChoice::parse("4"), None);
        assert_eq!(MenuChoice::parse("preview"), None);
        assert_eq!(MenuChoice::Quit.mode(), None);
        assert_eq!(MenuChoice::Destroy.mode(), Some(Mode::Destroy));
    }

    #[test]
    fn test_prompt_names_token() {
        assert!(confirmation_prompt(3).contains("3 resource(s)"));
        assert!(confirmation_prompt(3).contains("Type DELETE"));
    }
}
