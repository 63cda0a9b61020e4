//! Bot Commands
//!
//! Slash commands parsed into a closed enum so the dispatcher's match is
//! checked for coverage at compile time; anything unrecognized lands in the
//! `Unknown` arm.

/// A parsed slash command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Portfolio,
    Profile,
    Unknown(String),
}

impl Command {
    /// Parse a message text. Returns `None` when the text is not a command.
    /// Group-chat suffixes (`/start@BullVisionBot`) and trailing arguments
    /// are stripped.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let token = trimmed.split_whitespace().next().unwrap_or(trimmed);
        let token = token.split('@').next().unwrap_or(token).to_lowercase();

        Some(match token.as_str() {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/portfolio" => Command::Portfolio,
            "/profile" => Command::Profile,
            _ => Command::Unknown(token),
        })
    }
}

pub const WELCOME_TEXT: &str = "Welcome to Bull Vision Agent! 🚀\n\n\
I can help you analyze stocks and manage your portfolio.\n\
Use /portfolio to set up your portfolio or /help to see all available commands.";

pub const HELP_TEXT: &str = "Available commands:\n\
/start - Start the bot\n\
/portfolio - Set up or update your portfolio\n\
/profile - Set up or update your investor profile\n\
/help - Show this help message\n\n\
You can also ask me questions about stocks, market analysis, or portfolio management.";

pub const UNKNOWN_COMMAND_TEXT: &str = "Unknown command. Use /help to see available commands.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/portfolio"), Some(Command::Portfolio));
        assert_eq!(Command::parse("/profile"), Some(Command::Profile));
    }

    #[test]
    fn test_case_and_suffix_handling() {
        assert_eq!(Command::parse("/START"), Some(Command::Start));
        assert_eq!(Command::parse("/profile@BullVisionBot"), Some(Command::Profile));
        assert_eq!(Command::parse("/portfolio now please"), Some(Command::Portfolio));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse("/frobnicate"),
            Some(Command::Unknown("/frobnicate".into()))
        );
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(Command::parse("what is VNM doing"), None);
        assert_eq!(Command::parse("  plain text"), None);
    }
}
