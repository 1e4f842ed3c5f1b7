//! Text command stream used as a headless input substrate.
//!
//! One event per line:
//!
//! ```text
//! # comment
//! b              mark bad (any single character is a key press)
//! key f          explicit key press
//! click 120 88   left button at canvas position (alias: left)
//! right 10 10    right button
//! wheel 1        zoom in one step; optional position: wheel -1 400 300
//! close          end the session
//! ```

use std::io::BufRead;

use thiserror::Error;

use crate::annotation::Point;
use crate::event::{EventSource, InputEvent, MouseButton};

/// Why a script line could not be turned into an event.
#[derive(Error, Debug, PartialEq)]
pub enum ScriptError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' is missing its {argument} argument")]
    MissingArgument {
        command: String,
        argument: &'static str,
    },

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("'{0}' is not a single character")]
    InvalidKey(String),
}

/// Parse one script line. Blank lines and comments yield `Ok(None)`.
pub fn parse_event(line: &str) -> Result<Option<InputEvent>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();

    let mut chars = command.chars();
    if let (Some(key), None) = (chars.next(), chars.next()) {
        return Ok(Some(InputEvent::KeyPressed { key }));
    }

    let event = match command.to_lowercase().as_str() {
        "key" => {
            let arg = parts.next().ok_or_else(|| missing(command, "key"))?;
            let mut chars = arg.chars();
            match (chars.next(), chars.next()) {
                (Some(key), None) => InputEvent::KeyPressed { key },
                _ => return Err(ScriptError::InvalidKey(arg.to_string())),
            }
        }
        "click" | "left" => mouse(MouseButton::Left, command, &mut parts)?,
        "right" => mouse(MouseButton::Right, command, &mut parts)?,
        "middle" => mouse(MouseButton::Middle, command, &mut parts)?,
        "wheel" => {
            let delta = number(parts.next().ok_or_else(|| missing(command, "delta"))?)?;
            let position = match (parts.next(), parts.next()) {
                (Some(x), Some(y)) => Point::new(number(x)?, number(y)?),
                _ => Point::new(0.0, 0.0),
            };
            InputEvent::MouseWheel { delta, position }
        }
        "close" | "quit" | "exit" => InputEvent::Close,
        _ => return Err(ScriptError::UnknownCommand(command.to_string())),
    };

    Ok(Some(event))
}

fn mouse<'a>(
    button: MouseButton,
    command: &str,
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<InputEvent, ScriptError> {
    let x = number(parts.next().ok_or_else(|| missing(command, "x"))?)?;
    let y = number(parts.next().ok_or_else(|| missing(command, "y"))?)?;
    Ok(InputEvent::MousePressed {
        button,
        position: Point::new(x, y),
    })
}

fn number(value: &str) -> Result<f32, ScriptError> {
    value
        .parse::<f32>()
        .map_err(|_| ScriptError::InvalidNumber(value.to_string()))
}

fn missing(command: &str, argument: &'static str) -> ScriptError {
    ScriptError::MissingArgument {
        command: command.to_string(),
        argument,
    }
}

/// Reads events line by line from any buffered reader (stdin, a file).
pub struct ScriptedInput<R> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> ScriptedInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }
}

impl<R: BufRead> EventSource for ScriptedInput<R> {
    fn next_event(&mut self) -> Option<InputEvent> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to read input: {}", e);
                    return None;
                }
            }
            self.line_number += 1;

            match parse_event(&line) {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {}
                Err(e) => log::warn!("Ignoring input line {}: {}", self.line_number, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            parse_event("n").unwrap(),
            Some(InputEvent::KeyPressed { key: 'n' })
        );
        assert_eq!(
            parse_event("  key F ").unwrap(),
            Some(InputEvent::KeyPressed { key: 'F' })
        );
        assert_eq!(
            parse_event("key fx"),
            Err(ScriptError::InvalidKey("fx".to_string()))
        );
    }

    #[test]
    fn test_parse_mouse() {
        assert_eq!(
            parse_event("click 10 20.5").unwrap(),
            Some(InputEvent::MousePressed {
                button: MouseButton::Left,
                position: Point::new(10.0, 20.5),
            })
        );
        assert_eq!(
            parse_event("right 1 2").unwrap(),
            Some(InputEvent::MousePressed {
                button: MouseButton::Right,
                position: Point::new(1.0, 2.0),
            })
        );
        assert!(matches!(
            parse_event("click 10"),
            Err(ScriptError::MissingArgument { argument: "y", .. })
        ));
        assert_eq!(
            parse_event("click ten 3"),
            Err(ScriptError::InvalidNumber("ten".to_string()))
        );
    }

    #[test]
    fn test_parse_wheel() {
        assert_eq!(
            parse_event("wheel -1").unwrap(),
            Some(InputEvent::MouseWheel {
                delta: -1.0,
                position: Point::new(0.0, 0.0),
            })
        );
        assert_eq!(
            parse_event("wheel 1 400 300").unwrap(),
            Some(InputEvent::MouseWheel {
                delta: 1.0,
                position: Point::new(400.0, 300.0),
            })
        );
    }

    #[test]
    fn test_parse_skips_comments_and_rejects_garbage() {
        assert_eq!(parse_event("").unwrap(), None);
        assert_eq!(parse_event("# note").unwrap(), None);
        assert_eq!(
            parse_event("jump 1 2"),
            Err(ScriptError::UnknownCommand("jump".to_string()))
        );
        assert_eq!(parse_event("close").unwrap(), Some(InputEvent::Close));
    }

    #[test]
    fn test_scripted_input_skips_bad_lines() {
        let script = "b\n\nnonsense here\nclick 5 6\n# done\nq\n";
        let mut input = ScriptedInput::new(script.as_bytes());

        assert_eq!(input.next_event(), Some(InputEvent::KeyPressed { key: 'b' }));
        assert!(matches!(
            input.next_event(),
            Some(InputEvent::MousePressed { .. })
        ));
        assert_eq!(input.next_event(), Some(InputEvent::KeyPressed { key: 'q' }));
        assert_eq!(input.next_event(), None);
    }
}
