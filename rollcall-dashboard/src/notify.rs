//! User-facing side effects: alerts, confirmations, login redirect
//!
//! The library never prints. Front ends inject a `Notifier`.

use std::io::{self, BufRead, Write};

/// Severity of a user-visible message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Front-end hooks used by the dashboard workflows
pub trait Notifier: Send + Sync {
    /// Show a dismissible message
    fn alert(&self, level: AlertLevel, message: &str);

    /// Ask a yes/no question; `false` aborts the operation
    fn confirm(&self, prompt: &str) -> bool;

    /// Session ended; show the login view
    fn redirect_to_login(&self);
}

/// Terminal notifier: messages on stderr, confirmations on stdin
pub struct ConsoleNotifier {
    assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for ConsoleNotifier {
    fn alert(&self, level: AlertLevel, message: &str) {
        let prefix = match level {
            AlertLevel::Success => "✓",
            AlertLevel::Info => "i",
            AlertLevel::Warning => "!",
            AlertLevel::Error => "✗",
        };
        eprintln!("{} {}", prefix, message);
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn redirect_to_login(&self) {
        eprintln!("Session expired. Run `rollcall login` to sign in again.");
    }
}
