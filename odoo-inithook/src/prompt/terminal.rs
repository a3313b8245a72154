// Plain terminal prompter
//
// Text answers are read line-by-line from stdin. Secrets are read in raw mode
// with crossterm so nothing is echoed; the terminal is restored on every exit path.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, BufRead, Write};

use crate::prompt::Prompter;
use crate::utils::validation::validate_password_with;

pub struct TerminalPrompter {
    banner: String,
}

impl TerminalPrompter {
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
        }
    }

    fn header(&self, title: &str) {
        println!();
        println!("{} - {}", self.banner, title);
        println!("{}", "=".repeat(self.banner.len() + title.len() + 3));
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode().context("Failed to switch terminal to raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Submit,
    Cancel,
}

/// Secret being typed. Only the length is ever shown.
#[derive(Default)]
struct MaskedLine {
    value: String,
}

impl MaskedLine {
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> KeyOutcome {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => KeyOutcome::Cancel,
            // Other control chords (Ctrl-U, Ctrl-W, ...) are not text.
            KeyCode::Char(_) if modifiers.contains(KeyModifiers::CONTROL) => KeyOutcome::Continue,
            KeyCode::Char(c) => {
                self.value.push(c);
                KeyOutcome::Continue
            }
            KeyCode::Backspace => {
                self.value.pop();
                KeyOutcome::Continue
            }
            KeyCode::Enter => KeyOutcome::Submit,
            KeyCode::Esc => KeyOutcome::Cancel,
            _ => KeyOutcome::Continue,
        }
    }

    fn display(&self) -> String {
        "*".repeat(self.value.chars().count())
    }
}

fn read_masked(label: &str) -> Result<String> {
    let mut out = io::stdout();
    print!("{}", label);
    out.flush()?;

    let mut line = MaskedLine::default();
    {
        let _guard = RawModeGuard::enable()?;
        loop {
            let Event::Key(key) = event::read().context("Failed to read key event")? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match line.handle_key(key.code, key.modifiers) {
                KeyOutcome::Continue => {
                    print!("\r{}{}\x1b[K", label, line.display());
                    out.flush()?;
                }
                KeyOutcome::Submit => break,
                KeyOutcome::Cancel => {
                    print!("\r\n");
                    return Err(anyhow::anyhow!("Input cancelled by operator"));
                }
            }
        }
    }
    println!();
    Ok(line.value)
}

impl Prompter for TerminalPrompter {
    fn password(&mut self, title: &str, text: &str, blacklist: &[char]) -> Result<String> {
        self.header(title);
        println!("{}", text);
        loop {
            let first = read_masked("Password: ")?;
            if let Err(e) = validate_password_with(&first, blacklist) {
                self.notice(&e.to_string());
                continue;
            }
            let confirm = read_masked("Confirm:  ")?;
            if first != confirm {
                self.notice("Passwords do not match, please try again.");
                continue;
            }
            return Ok(first);
        }
    }

    fn input(&mut self, title: &str, text: &str) -> Result<String> {
        self.header(title);
        println!("{}", text);
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        if read == 0 {
            return Err(anyhow::anyhow!("Input closed while waiting for '{}'", title));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn notice(&mut self, text: &str) {
        println!("{}", text);
    }
}
