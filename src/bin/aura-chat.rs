//! Interactive terminal client for the Aura chat service.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local server
//! aura-chat
//!
//! # Point at another server, keep preferences, and stay signed in between runs
//! aura-chat --api-base-url https://aura.example.com --storage-dir ~/.aura \
//!     --token-dir ~/.aura/session
//!
//! # Read settings from a file
//! aura-chat --config aura.yaml
//! ```
//!
//! Log output is controlled with `RUST_LOG`, e.g. `RUST_LOG=aura=debug`.
//!
//! # Commands
//!
//! - `/login <email>` - Sign in
//! - `/sessions [query]` - List conversations
//! - `/open <id>` - Open a conversation
//! - `/attach <file.pdf>` - Attach a PDF to the next message
//! - `/help` - Show all commands
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use aura::Aura;
use aura::shell::{PlainTextRenderer, Renderer, Shell, ShellArgs, Step, parse_command};

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aura=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn interrupted(flag: &AtomicBool) {
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Main entry point for the aura-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let (args, _) = ShellArgs::from_command_line_relaxed("aura-chat [OPTIONS]");
    let config = args.client_config()?;
    let base_url = config.normalized_base_url().to_string();

    let shell = Shell::new(Aura::new(config)?);
    let mut renderer = PlainTextRenderer::with_color(args.use_color());
    let mut rl = DefaultEditor::new()?;

    // Set while a reply is pending and the user presses Ctrl+C.
    let interrupt = Arc::new(AtomicBool::new(false));
    let interrupt_clone = interrupt.clone();
    ctrlc::set_handler(move || {
        interrupt_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Aura ({base_url})");
    println!("Type /help for commands, /quit to exit\n");
    shell.start(&mut renderer).await;

    loop {
        interrupt.store(false, Ordering::Relaxed);

        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let Some(command) = parse_command(line) else {
            let completed = tokio::select! {
                _ = shell.send(line, &mut renderer) => true,
                _ = interrupted(&interrupt) => false,
            };
            if !completed {
                shell.aura().orchestrator().new_draft();
                renderer.print_info("[interrupted; started a new draft]");
            }
            continue;
        };

        match shell.run(command, &mut renderer).await {
            Step::Continue => {}
            Step::Quit => {
                println!("Goodbye!");
                break;
            }
            Step::Password(pending) => {
                let password = match rpassword::prompt_password("Password: ") {
                    Ok(password) => password,
                    Err(err) => {
                        renderer.print_error(&format!("Cannot read password: {err}"));
                        continue;
                    }
                };
                shell.authenticate(pending, &password, &mut renderer).await;
            }
        }
    }

    Ok(())
}
