//! Operator console: single-letter commands typed on stdin.

use std::io::BufRead;
use std::thread::JoinHandle;

use antrax_capture::CaptureCommand;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const HELP: &str = "commands: [c]apture, [r]otate, [f]lip camera, [x] reset";

/// Map one console line to a command.
pub fn parse_command(line: &str) -> Option<CaptureCommand> {
    match line.trim().to_lowercase().as_str() {
        "c" | "capture" => Some(CaptureCommand::ManualCapture),
        "r" | "rotate" => Some(CaptureCommand::RotateCamera),
        "f" | "flip" => Some(CaptureCommand::SwitchFacing),
        "x" | "reset" => Some(CaptureCommand::Reset),
        _ => None,
    }
}

/// Forward commands read from `input` until it closes or the episode stops
/// listening. Blocking; run it off the async runtime.
pub fn forward_commands<R: BufRead>(input: R, commands: mpsc::Sender<CaptureCommand>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                info!("{}", HELP);
            }
            continue;
        };
        debug!(?command, "Operator command");
        if commands.blocking_send(command).is_err() {
            break;
        }
    }
}

/// Read operator commands from stdin on a detached thread, so a pending read
/// never holds up shutdown.
pub fn spawn_stdin_reader(commands: mpsc::Sender<CaptureCommand>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("operator-stdin".to_string())
        .spawn(move || forward_commands(std::io::stdin().lock(), commands))
}
