//! Interactive terminal client for Aura.
//!
//! - [`config`]: CLI argument parsing
//! - [`commands`]: slash command parsing
//! - [`session`]: command handling against an [`crate::Aura`] client

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ShellCommand, help_text, parse_command};
pub use config::ShellArgs;
pub use session::{PendingAuth, Shell, Step};
