//! Universal Chess Interface (UCI) front end.
//!
//! Translates line commands into engine calls and renders search progress
//! and the chosen move back as UCI responses. All parsing failures are
//! reported on stderr; the engine position is only replaced by a command
//! that parsed completely.

use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use crate::engine::time::TimeControl;
use crate::engine::{Engine, DEFAULT_CACHE_MB};
use crate::error::{FenError, MoveError};
use crate::position::{move_to_uci, Position};
use crate::search::SearchProgress;

pub mod command;

use command::{parse_uci_command, UciCommand};

/// Error type for UCI position command parsing
#[derive(Debug, Clone)]
pub enum UciError {
    /// Invalid FEN string
    InvalidFen(FenError),
    /// Invalid move in the move list
    InvalidMove { move_str: String, error: MoveError },
    /// Missing required parts in the command
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "Invalid FEN: {e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "Invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => write!(f, "Missing required parts in position command"),
        }
    }
}

impl std::error::Error for UciError {}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

/// Parse a UCI position command into a fresh position.
///
/// Supports "position startpos" and "position fen <fen>", optionally
/// followed by "moves <move1> <move2> ...".
pub fn try_parse_position_command(parts: &[&str]) -> Result<Position, UciError> {
    let mut i = 1;

    if i >= parts.len() {
        return Err(UciError::MissingParts);
    }

    let mut position = if parts[i] == "startpos" {
        i += 1;
        Position::startpos()
    } else if parts[i] == "fen" {
        i += 1;
        let fen_end = parts[i..]
            .iter()
            .position(|&p| p == "moves")
            .map_or(parts.len(), |offset| i + offset);
        if fen_end == i {
            return Err(UciError::MissingParts);
        }
        let fen = parts[i..fen_end].join(" ");
        i = fen_end;
        Position::from_fen(&fen)?
    } else {
        return Err(UciError::MissingParts);
    };

    if i < parts.len() && parts[i] == "moves" {
        i += 1;
        while i < parts.len() {
            let mv = position.parse_move(parts[i]).map_err(|error| {
                UciError::InvalidMove {
                    move_str: parts[i].to_string(),
                    error,
                }
            })?;
            position.play(mv).map_err(|error| UciError::InvalidMove {
                move_str: parts[i].to_string(),
                error,
            })?;
            i += 1;
        }
    }

    Ok(position)
}

fn labelled_value(parts: &[String], label: &str) -> Option<u64> {
    let idx = parts.iter().position(|p| p == label)?;
    parts.get(idx + 1)?.parse().ok()
}

fn print_search_info(progress: &SearchProgress) {
    let score = match progress.mate_in {
        Some(mate) => format!("mate {mate}"),
        None => format!("cp {}", progress.score),
    };
    println!(
        "info depth {} score {} nodes {} time {} nps {} pv {}",
        progress.depth,
        score,
        progress.nodes,
        progress.time_ms,
        progress.nps,
        move_to_uci(progress.best_move)
    );
}

fn handle_go(engine: &mut Engine, parts: &[String]) {
    let max_depth = labelled_value(parts, "depth").map(|d| d as u32);

    let control = if let Some(time_ms) = labelled_value(parts, "movetime") {
        TimeControl::MoveTime { time_ms }
    } else if parts.iter().any(|p| p == "wtime" || p == "btime") {
        TimeControl::Clock {
            wtime_ms: labelled_value(parts, "wtime").unwrap_or(0),
            btime_ms: labelled_value(parts, "btime").unwrap_or(0),
            winc_ms: labelled_value(parts, "winc").unwrap_or(0),
            binc_ms: labelled_value(parts, "binc").unwrap_or(0),
        }
    } else if max_depth.is_some() || parts.iter().any(|p| p == "infinite") {
        TimeControl::Infinite
    } else {
        TimeControl::MoveTime { time_ms: 60_000 }
    };

    engine.start_search(control, max_depth, |outcome| match outcome.best_move {
        Some(mv) => println!("bestmove {}", move_to_uci(mv)),
        None => println!("bestmove 0000"),
    });
}

fn handle_setoption(engine: &mut Engine, parts: &[String]) {
    let name = parts
        .iter()
        .position(|p| p == "name")
        .and_then(|idx| parts.get(idx + 1));
    let value = parts
        .iter()
        .position(|p| p == "value")
        .and_then(|idx| parts.get(idx + 1));

    match (name, value) {
        (Some(name), Some(value)) if name.eq_ignore_ascii_case("hash") => {
            match value.parse::<usize>() {
                Ok(mb) => {
                    if let Err(e) = engine.resize_cache(mb) {
                        eprintln!("Error: {e}");
                    }
                }
                Err(_) => eprintln!("Error: invalid Hash value '{value}'"),
            }
        }
        _ => eprintln!("Unsupported option"),
    }
}

/// Run the blocking UCI loop on stdin.
pub fn run_uci_loop() {
    let mut engine = match Engine::new(DEFAULT_CACHE_MB) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };
    engine.set_progress_callback(Some(Arc::new(print_search_info)));

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let Some(cmd) = parse_uci_command(&line) else {
            continue;
        };

        match cmd {
            UciCommand::Uci => {
                println!("id name Obsidian");
                println!("id author the Obsidian developers");
                println!("option name Hash type spin default {DEFAULT_CACHE_MB} min 1 max 1024");
                println!("uciok");
            }
            UciCommand::IsReady => println!("readyok"),
            UciCommand::UciNewGame => engine.new_game(),
            UciCommand::Position(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                match try_parse_position_command(&refs) {
                    Ok(position) => engine.set_position(position),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            UciCommand::Go(parts) => handle_go(&mut engine, &parts),
            UciCommand::SetOption(parts) => handle_setoption(&mut engine, &parts),
            UciCommand::Stop => engine.signal_stop(),
            UciCommand::Eval => println!("{}", engine.evaluate_position()),
            UciCommand::Display => println!("{}", engine.position()),
            UciCommand::Quit => {
                engine.stop_search();
                break;
            }
            UciCommand::Unknown(text) => eprintln!("Unknown command: {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startpos_with_moves() {
        let parts = ["position", "startpos", "moves", "e2e4", "e7e5"];
        let position = try_parse_position_command(&parts).expect("valid command");
        assert_eq!(position.ply(), 2);
    }

    #[test]
    fn test_parse_fen_position() {
        let parts = [
            "position", "fen", "6k1/5ppp/8/8/8/8/8/4Q2K", "w", "-", "-", "0", "1",
        ];
        let position = try_parse_position_command(&parts).expect("valid command");
        assert!(position.parse_move("e1e8").is_ok());
    }

    #[test]
    fn test_parse_fen_with_moves() {
        let parts = [
            "position", "fen", "6k1/5ppp/8/8/8/8/8/4Q2K", "w", "-", "-", "0", "1", "moves",
            "e1e8",
        ];
        let position = try_parse_position_command(&parts).expect("valid command");
        assert_eq!(position.ply(), 1);
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let parts = ["position", "startpos", "moves", "e2e5"];
        assert!(matches!(
            try_parse_position_command(&parts),
            Err(UciError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_missing_parts() {
        assert!(matches!(
            try_parse_position_command(&["position"]),
            Err(UciError::MissingParts)
        ));
        assert!(matches!(
            try_parse_position_command(&["position", "fen"]),
            Err(UciError::MissingParts)
        ));
    }
}
