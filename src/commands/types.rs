//! Command types and definitions.

use std::fmt;

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Set the channel messages are copied from.
    SetSource(Option<String>),

    /// Set the channel messages are copied into.
    SetForward(Option<String>),

    /// Show the current channel configuration.
    Status,

    /// Copy every message from the source channel into the target channel.
    Forward,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a known command. Only the first
    /// argument is kept; anything after it is ignored.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;

        let mut parts = body.split_whitespace();
        let word = parts.next()?;
        let arg = parts.next().map(str::to_owned);

        // `/status@my_bot` addresses a specific bot in groups
        let cmd = word.split_once('@').map_or(word, |(cmd, _)| cmd).to_lowercase();

        match cmd.as_str() {
            "setsource" => Some(Self::SetSource(arg)),
            "setforward" => Some(Self::SetForward(arg)),
            "status" => Some(Self::Status),
            "forward" => Some(Self::Forward),
            "help" | "start" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetSource(_) => "setsource",
            Self::SetForward(_) => "setforward",
            Self::Status => "status",
            Self::Forward => "forward",
            Self::Help => "help",
        }
    }

    /// Returns all available commands with their descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("setsource <channel>", "Set the channel to copy from"),
            ("setforward <channel>", "Set the channel to copy into"),
            ("status", "Show the configured channels"),
            ("forward", "Copy every message from source to target"),
            ("help", "Show this help message"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetSource(Some(id)) | Self::SetForward(Some(id)) => {
                write!(f, "{} {id}", self.name())
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user, if any.
    pub message: Option<String>,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Creates a successful result that sends no reply.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setsource() {
        assert_eq!(
            BotCommand::parse("/setsource @news"),
            Some(BotCommand::SetSource(Some("@news".to_owned())))
        );
        assert_eq!(
            BotCommand::parse("/setsource"),
            Some(BotCommand::SetSource(None))
        );
    }

    #[test]
    fn test_parse_keeps_first_argument_only() {
        assert_eq!(
            BotCommand::parse("/setforward -1001234 extra words"),
            Some(BotCommand::SetForward(Some("-1001234".to_owned())))
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(BotCommand::parse("/status"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("/forward"), Some(BotCommand::Forward));
        assert_eq!(BotCommand::parse("/help"), Some(BotCommand::Help));
    }

    #[test]
    fn test_parse_bot_mention() {
        assert_eq!(
            BotCommand::parse("/status@forward_bot"),
            Some(BotCommand::Status)
        );
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(BotCommand::parse("/STATUS"), Some(BotCommand::Status));
        assert_eq!(
            BotCommand::parse("/SetSource Abc"),
            Some(BotCommand::SetSource(Some("Abc".to_owned())))
        );
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        assert_eq!(BotCommand::parse("status"), None);
        assert_eq!(BotCommand::parse("/unknown"), None);
        assert_eq!(BotCommand::parse("/"), None);
        assert_eq!(BotCommand::parse(""), None);
    }

    #[test]
    fn test_parse_with_extra_whitespace() {
        assert_eq!(
            BotCommand::parse("  /setsource   abc  "),
            Some(BotCommand::SetSource(Some("abc".to_owned())))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            BotCommand::SetSource(Some("abc".to_owned())).to_string(),
            "setsource abc"
        );
        assert_eq!(BotCommand::Forward.to_string(), "forward");
    }
}
