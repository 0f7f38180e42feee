//! Display utilities for the TubeSleep CLI.
//!
//! Each `render_*` function builds the text; the matching `show_*` prints it.

use std::io::{self, BufRead, Write};

use crate::lookup::Suggestion;
use crate::types::{format_countdown, EntryView, IpcResponse, PlayerDirective, ResponseData};

/// Width of the countdown progress bar in characters
const PROGRESS_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the daemon's message for a command, if it has one.
    pub fn show_message(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
    }

    /// Shows the message for an add, with the new entry's id.
    pub fn show_added(response: &IpcResponse) {
        println!("{}", Self::render_added(response));
    }

    pub fn render_added(response: &IpcResponse) -> String {
        match response.data.as_ref().and_then(|d| d.entry_id.as_deref()) {
            Some(id) => format!("* {} (id {})", response.message, id),
            None => format!("* {}", response.message),
        }
    }

    /// Shows the session status.
    pub fn show_status(response: &IpcResponse) {
        println!("{}", Self::render_status(response.data.as_ref()));
    }

    pub fn render_status(data: Option<&ResponseData>) -> String {
        let Some(data) = data else {
            return "The daemon returned no status".to_string();
        };

        let mut lines = vec![
            "TubeSleep status".to_string(),
            "─────────────────────────────".to_string(),
        ];

        let mode = data.mode.as_deref().unwrap_or("unknown");
        let mode_display = match mode {
            "idle" => "Idle",
            "selected_stopped" => "Stopped",
            "selected_playing" => "Playing",
            "counting_down" => "Playing, sleep timer running",
            "sleeping" => "Sleeping",
            other => other,
        };
        lines.push(format!("Mode: {}", mode_display));

        if let Some(entry) = &data.selected {
            lines.push(format!("Now: {}", entry.display_title));
        }
        if data.is_muted == Some(true) {
            lines.push("Sound: muted".to_string());
        }

        if let Some(countdown) = data.countdown.filter(|c| c.is_running) {
            lines.push(format!(
                "Sleep in: {} {}",
                format_countdown(countdown.remaining_seconds),
                Self::progress_bar(countdown.progress())
            ));
        }

        if data.sleeping == Some(true) {
            if let Some(clock) = &data.clock {
                lines.push(format!("Clock: {}", clock));
            }
            lines.push("Run 'tubesleep wake' to leave the night clock".to_string());
        }

        if let Some(notice) = &data.notice {
            lines.push(format!("! {}", notice.message()));
        }

        lines.join("\n")
    }

    /// Shows the playlist.
    pub fn show_list(response: &IpcResponse) {
        let entries = response
            .data
            .as_ref()
            .and_then(|d| d.entries.as_deref())
            .unwrap_or_default();
        println!("{}", Self::render_list(entries));
    }

    pub fn render_list(entries: &[EntryView]) -> String {
        if entries.is_empty() {
            return "The playlist is empty. Add something with 'tubesleep add <url>'".to_string();
        }
        entries
            .iter()
            .enumerate()
            .map(|(i, view)| {
                let marker = if view.selected { ">" } else { " " };
                format!(
                    "{} {:>2}. {}  [{}]\n      {}",
                    marker,
                    i + 1,
                    view.entry.display_title,
                    view.entry.id,
                    view.entry.source_url
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Shows what the player should be doing.
    pub fn show_directive(response: &IpcResponse) {
        let directive = response
            .data
            .as_ref()
            .and_then(|d| d.directive.clone())
            .unwrap_or_default();
        println!("{}", Self::render_directive(&directive));
    }

    pub fn render_directive(directive: &PlayerDirective) -> String {
        match &directive.source_url {
            None => "source: none".to_string(),
            Some(url) => format!(
                "source: {}\nplay: {}\nmuted: {}",
                url, directive.should_play, directive.muted
            ),
        }
    }

    /// Shows suggestion candidates, numbered from 1.
    pub fn show_suggestions(suggestions: &[Suggestion]) {
        println!("{}", Self::render_suggestions(suggestions));
    }

    pub fn render_suggestions(suggestions: &[Suggestion]) -> String {
        if suggestions.is_empty() {
            return "No suggestions found".to_string();
        }
        suggestions
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{:>2}. {}\n    {}", i + 1, s.title, s.url))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Asks a yes/no question on the terminal. Anything but "y"/"yes" is no.
    pub fn confirm(question: &str) -> io::Result<bool> {
        print!("{} [y/N] ", question);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(Self::is_yes(&answer))
    }

    fn is_yes(answer: &str) -> bool {
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    fn progress_bar(progress: f64) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).round()) as usize;
        format!(
            "[{}{}]",
            "#".repeat(filled),
            "-".repeat(PROGRESS_WIDTH - filled)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
