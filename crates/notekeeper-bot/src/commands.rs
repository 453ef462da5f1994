//! Parsing of incoming message text into bot commands.

/// What an incoming text message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    New,
    Recent,
    /// `/search <text>`; empty when no text was given.
    Search(String),
    /// `/set_reminder <id> <date>` arguments, unparsed.
    SetReminder(Vec<String>),
    WebLogin,
    /// A command this bot does not know.
    Unknown(String),
    /// A command addressed to a different bot in a group chat.
    OtherBot,
    /// Plain text, used by the note capture conversation.
    Text(String),
}

impl Command {
    /// Parse message text. `bot_username` is matched against `/cmd@name`.
    pub fn parse(text: &str, bot_username: &str) -> Self {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Text(text.to_string());
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = match head.split_once('@') {
            Some((name, target)) => {
                if !target.eq_ignore_ascii_case(bot_username) {
                    return Command::OtherBot;
                }
                name
            }
            None => head,
        };

        match name.to_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "new" => Command::New,
            "recent" => Command::Recent,
            "search" => Command::Search(args.split_whitespace().collect::<Vec<_>>().join(" ")),
            "set_reminder" => {
                Command::SetReminder(args.split_whitespace().map(str::to_string).collect())
            }
            "web_login" => Command::WebLogin,
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::New => "new",
            Command::Recent => "recent",
            Command::Search(_) => "search",
            Command::SetReminder(_) => "set_reminder",
            Command::WebLogin => "web_login",
            Command::Unknown(_) => "unknown",
            Command::OtherBot => "other_bot",
            Command::Text(_) => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", "notes_bot"), Command::Start);
        assert_eq!(Command::parse("/HELP", "notes_bot"), Command::Help);
        assert_eq!(Command::parse("/recent@notes_bot", "notes_bot"), Command::Recent);
        assert_eq!(Command::parse("/recent@other_bot", "notes_bot"), Command::OtherBot);
        assert_eq!(Command::parse("/web_login", "notes_bot"), Command::WebLogin);
        assert_eq!(
            Command::parse("/frobnicate now", "notes_bot"),
            Command::Unknown("frobnicate".to_string())
        );
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            Command::parse("/search  milk   and eggs ", "notes_bot"),
            Command::Search("milk and eggs".to_string())
        );
        assert_eq!(
            Command::parse("/search", "notes_bot"),
            Command::Search(String::new())
        );
        assert_eq!(
            Command::parse("/set_reminder 12 2026-12-31", "notes_bot"),
            Command::SetReminder(vec!["12".to_string(), "2026-12-31".to_string()])
        );
    }

    #[test]
    fn test_plain_text_is_kept_verbatim() {
        assert_eq!(
            Command::parse("  Buy milk\nand bread ", "notes_bot"),
            Command::Text("  Buy milk\nand bread ".to_string())
        );
    }
}
