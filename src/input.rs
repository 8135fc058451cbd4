use crate::event_loop::EngineMessage;
use crate::platform::host::TapTrigger;
use crossbeam::channel::Sender;
use log::{debug, info};
use std::io::BufRead;
use std::thread;

/// A line typed on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    Tap,
    Advance,
    Nudge(i32),
    Quit,
}

pub fn map_line(line: &str) -> Option<InputCommand> {
    match line.trim() {
        "" | "t" | "T" => Some(InputCommand::Tap),
        "a" | "A" => Some(InputCommand::Advance),
        "+" | "=" => Some(InputCommand::Nudge(1)),
        "-" | "_" => Some(InputCommand::Nudge(-1)),
        "q" | "Q" => Some(InputCommand::Quit),
        _ => None,
    }
}

/// Reads stdin on its own thread. Taps go to the synthetic sensor, everything
/// else to the event loop. EOF behaves like quit.
pub fn spawn_stdin_reader(tx: Sender<EngineMessage>, trigger: TapTrigger) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!("Input thread started");
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let message = match map_line(&line) {
                Some(InputCommand::Tap) => {
                    trigger.request();
                    continue;
                }
                Some(InputCommand::Advance) => EngineMessage::Advance,
                Some(InputCommand::Nudge(delta)) => EngineMessage::Nudge(delta),
                Some(InputCommand::Quit) => break,
                None => {
                    debug!("Ignoring input {:?}", line);
                    continue;
                }
            };
            if tx.send(message).is_err() {
                return;
            }
        }
        info!("Input closed, requesting shutdown");
        let _ = tx.send(EngineMessage::Shutdown);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_maps_to_tap() {
        assert_eq!(map_line(""), Some(InputCommand::Tap));
        assert_eq!(map_line("  t \n"), Some(InputCommand::Tap));
    }

    #[test]
    fn test_commands() {
        assert_eq!(map_line("a"), Some(InputCommand::Advance));
        assert_eq!(map_line("+"), Some(InputCommand::Nudge(1)));
        assert_eq!(map_line("-"), Some(InputCommand::Nudge(-1)));
        assert_eq!(map_line("Q"), Some(InputCommand::Quit));
    }

    #[test]
    fn test_other_input_returns_none() {
        assert!(map_line("x").is_none());
        assert!(map_line("advance please").is_none());
    }
}
