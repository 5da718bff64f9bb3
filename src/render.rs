//! Output rendering for the interactive shell.
//!
//! The shell writes everything through a [`Renderer`] so that it can be
//! driven without a terminal in tests.

use std::io::{self, Stdout, Write};

use crate::types::{AuthUser, Author, Message, SessionsPage};

/// ANSI escape code for dim text (used for metadata).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the user).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering shell output.
pub trait Renderer: Send {
    /// Print one thread entry.
    fn print_message(&mut self, message: &Message);

    /// Print a page of conversations.
    fn print_sessions(&mut self, page: &SessionsPage);

    /// Print the signed-in identity.
    fn print_user(&mut self, user: &AuthUser);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// The label shown in front of a message.
pub fn author_label(author: Author) -> &'static str {
    match author {
        Author::User => "You",
        Author::Assistant => "Aura",
    }
}

/// Formats a byte count for display.
pub fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{bytes} B")
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        let color = match message.author {
            Author::User => ANSI_GREEN,
            Author::Assistant => ANSI_CYAN,
        };
        let label = self.styled(color, &format!("{}:", author_label(message.author)));
        println!("{label} {}", message.content);
        for attachment in &message.attachments {
            let line = format!(
                "  [{} · {}]",
                attachment.name,
                human_size(attachment.size)
            );
            println!("{}", self.styled(ANSI_DIM, &line));
        }
        self.flush();
    }

    fn print_sessions(&mut self, page: &SessionsPage) {
        if page.items.is_empty() {
            println!("    (no conversations)");
        }
        for item in &page.items {
            let meta = format!("({} messages)", item.message_count);
            println!(
                "    {:>6}  {} {}",
                item.session_id,
                item.display_title(),
                self.styled(ANSI_DIM, &meta)
            );
        }
        if page.total > page.items.len() as u64 {
            println!("    ... {} total", page.total);
        }
        self.flush();
    }

    fn print_user(&mut self, user: &AuthUser) {
        println!("    {} <{}> ({})", user.username, user.email, user.role);
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("{}", self.styled(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}
