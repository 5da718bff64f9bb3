//! Slash command parsing for the shell.
//!
//! Lines that start with `/` control the client; everything else is sent
//! as a chat message.

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Sign in.
    Login {
        /// Account email.
        email: String,
    },

    /// Create an account and sign in.  The username defaults to one derived
    /// from the email.
    Register {
        /// Account email.
        email: String,
        /// Optional explicit username.
        username: Option<String>,
    },

    /// Sign out.
    Logout,

    /// Show the signed-in identity.
    WhoAmI,

    /// List conversations, optionally filtered.
    Sessions(Option<String>),

    /// Open a conversation.
    Open(i64),

    /// Start an empty draft.
    New,

    /// Create a titled conversation on the server.
    Create,

    /// Rename a conversation.
    Rename {
        /// Conversation id.
        session_id: i64,
        /// New title.
        title: String,
    },

    /// Stage a PDF for the next message.
    Attach(String),

    /// Remove the staged file.
    Detach,

    /// Display help information.
    Help,

    /// Exit the shell.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ShellCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// # Examples
///
/// ```
/// # use aura::shell::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/open 12").is_some());
/// assert!(parse_command("What is in this PDF?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ShellCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "login" => match argument {
            Some(email) => ShellCommand::Login {
                email: email.to_string(),
            },
            None => ShellCommand::Invalid("/login requires an email".to_string()),
        },
        "register" => match argument {
            Some(arg) => {
                let mut words = arg.split_whitespace();
                let email = words.next().unwrap_or_default().to_string();
                let username = words.next().map(String::from);
                ShellCommand::Register { email, username }
            }
            None => ShellCommand::Invalid("/register requires an email".to_string()),
        },
        "logout" => ShellCommand::Logout,
        "whoami" | "me" => ShellCommand::WhoAmI,
        "sessions" | "ls" => ShellCommand::Sessions(argument.map(String::from)),
        "open" => match argument.map(str::parse::<i64>) {
            Some(Ok(id)) => ShellCommand::Open(id),
            Some(Err(_)) => ShellCommand::Invalid("/open expects a numeric id".to_string()),
            None => ShellCommand::Invalid("/open requires a session id".to_string()),
        },
        "new" => ShellCommand::New,
        "create" => ShellCommand::Create,
        "rename" => parse_rename(argument),
        "attach" => match argument {
            Some(path) => ShellCommand::Attach(path.to_string()),
            None => ShellCommand::Invalid("/attach requires a file path".to_string()),
        },
        "detach" => ShellCommand::Detach,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        _ => ShellCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_rename(argument: Option<&str>) -> ShellCommand {
    let Some(arg) = argument else {
        return ShellCommand::Invalid("/rename requires an id and a title".to_string());
    };
    let mut parts = arg.splitn(2, ' ');
    let id = parts.next().unwrap_or_default();
    let title = parts.next().map(str::trim).filter(|s| !s.is_empty());
    match (id.parse::<i64>(), title) {
        (Ok(session_id), Some(title)) => ShellCommand::Rename {
            session_id,
            title: title.to_string(),
        },
        (Err(_), _) => ShellCommand::Invalid("/rename expects a numeric id".to_string()),
        (Ok(_), None) => ShellCommand::Invalid("/rename requires a title".to_string()),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /login <email>              Sign in (prompts for the password)
  /register <email> [name]    Create an account and sign in
  /logout                     Sign out
  /whoami                     Show the signed-in user
  /sessions [query]           List conversations
  /open <id>                  Open a conversation
  /new                        Start a new draft
  /create                     Create an empty "New chat" conversation
  /rename <id> <title>        Rename a conversation
  /attach <file.pdf>          Attach a PDF to the next message
  /detach                     Remove the attached file
  /help                       Show this help message
  /quit                       Exit"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ShellCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ShellCommand::Quit));
        assert_eq!(parse_command("  /Q  "), Some(ShellCommand::Quit));
    }

    #[test]
    fn parse_auth_commands() {
        assert_eq!(
            parse_command("/login ada@example.com"),
            Some(ShellCommand::Login {
                email: "ada@example.com".to_string()
            })
        );
        assert_eq!(
            parse_command("/register ada@example.com"),
            Some(ShellCommand::Register {
                email: "ada@example.com".to_string(),
                username: None
            })
        );
        assert_eq!(
            parse_command("/register ada@example.com countess"),
            Some(ShellCommand::Register {
                email: "ada@example.com".to_string(),
                username: Some("countess".to_string())
            })
        );
        assert!(matches!(
            parse_command("/login"),
            Some(ShellCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert_eq!(parse_command("/logout"), Some(ShellCommand::Logout));
        assert_eq!(parse_command("/whoami"), Some(ShellCommand::WhoAmI));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/sessions"), Some(ShellCommand::Sessions(None)));
        assert_eq!(
            parse_command("/sessions tax"),
            Some(ShellCommand::Sessions(Some("tax".to_string())))
        );
        assert_eq!(parse_command("/open 12"), Some(ShellCommand::Open(12)));
        assert!(matches!(
            parse_command("/open twelve"),
            Some(ShellCommand::Invalid(msg)) if msg.contains("numeric")
        ));
        assert_eq!(parse_command("/new"), Some(ShellCommand::New));
        assert_eq!(parse_command("/create"), Some(ShellCommand::Create));
    }

    #[test]
    fn parse_rename_command() {
        assert_eq!(
            parse_command("/rename 4 Quarterly taxes"),
            Some(ShellCommand::Rename {
                session_id: 4,
                title: "Quarterly taxes".to_string()
            })
        );
        assert!(matches!(
            parse_command("/rename 4"),
            Some(ShellCommand::Invalid(msg)) if msg.contains("title")
        ));
        assert!(matches!(
            parse_command("/rename x y"),
            Some(ShellCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_attachment_commands() {
        assert_eq!(
            parse_command("/attach ~/cv.pdf"),
            Some(ShellCommand::Attach("~/cv.pdf".to_string()))
        );
        assert_eq!(parse_command("/detach"), Some(ShellCommand::Detach));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, Aura!"), None);
        assert_eq!(parse_command(""), None);
        assert!(matches!(
            parse_command("/bogus"),
            Some(ShellCommand::Invalid(msg)) if msg.contains("Unknown")
        ));
    }

    #[test]
    fn help_text_lists_commands() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/attach"));
        assert!(help.contains("/sessions"));
    }
}
