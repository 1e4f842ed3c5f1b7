//! Single-character key commands for the annotation loop.
//!
//! Keybindings can be customized through the config file.

use serde::{Deserialize, Serialize};

/// Discrete commands the annotation loop understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    MarkGood,
    MarkBad,
    /// Clear the polygon of the current bad image
    ResetPolygon,
    /// Close the polygon of the current bad image
    Finish,
    Quit,
}

impl Command {
    /// All commands in help-text order.
    pub fn all() -> &'static [Command] {
        &[
            Command::Next,
            Command::Previous,
            Command::MarkGood,
            Command::MarkBad,
            Command::ResetPolygon,
            Command::Finish,
            Command::Quit,
        ]
    }

    /// One-line description for the help text.
    pub fn description(&self) -> &'static str {
        match self {
            Command::Next => "Next image",
            Command::Previous => "Previous image",
            Command::MarkGood => "Mark current image as GOOD",
            Command::MarkBad => "Mark current image as BAD (left-click adds polygon points)",
            Command::ResetPolygon => "Reset polygon for current BAD image",
            Command::Finish => "Finish annotation (close polygon by connecting last point to first)",
            Command::Quit => "Quit annotation",
        }
    }
}

/// Keybinding configuration for the annotation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub next: char,
    pub previous: char,
    pub mark_good: char,
    pub mark_bad: char,
    pub reset: char,
    pub finish: char,
    pub quit: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            next: 'n',
            previous: 'p',
            mark_good: 'g',
            mark_bad: 'b',
            reset: 'r',
            finish: 'f',
            quit: 'q',
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the command bound to a key, if any.
    pub fn command_for_key(&self, key: char) -> Option<Command> {
        Command::all()
            .iter()
            .copied()
            .find(|command| self.key_for_command(*command) == key)
    }

    /// Get the key bound to a command.
    pub fn key_for_command(&self, command: Command) -> char {
        match command {
            Command::Next => self.next,
            Command::Previous => self.previous,
            Command::MarkGood => self.mark_good,
            Command::MarkBad => self.mark_bad,
            Command::ResetPolygon => self.reset,
            Command::Finish => self.finish,
            Command::Quit => self.quit,
        }
    }

    /// Rebind a command.
    pub fn set_key(&mut self, command: Command, key: char) {
        match command {
            Command::Next => self.next = key,
            Command::Previous => self.previous = key,
            Command::MarkGood => self.mark_good = key,
            Command::MarkBad => self.mark_bad = key,
            Command::ResetPolygon => self.reset = key,
            Command::Finish => self.finish = key,
            Command::Quit => self.quit = key,
        }
    }

    /// Find the first key bound to more than one command.
    ///
    /// Returns the key and the two commands sharing it.
    pub fn key_conflict(&self) -> Option<(char, Command, Command)> {
        let commands = Command::all();
        for (i, first) in commands.iter().enumerate() {
            for second in &commands[i + 1..] {
                let key = self.key_for_command(*first);
                if key == self.key_for_command(*second) {
                    return Some((key, *first, *second));
                }
            }
        }
        None
    }

    /// Help lines in the form `" n: Next image"`.
    pub fn help_lines(&self) -> Vec<String> {
        Command::all()
            .iter()
            .map(|command| format!(" {}: {}", self.key_for_command(*command), command.description()))
            .collect()
    }
}
