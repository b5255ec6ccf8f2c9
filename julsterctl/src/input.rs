//! Keyboard commands read line by line from stdin.

use julster_core::UserInput;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One line typed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Inputs(Vec<UserInput>),
    Quit,
    Unknown(String),
}

/// `s`/enter spins or pulses like a wheel click, `p` pulses, `n` ends the
/// song and starts the next round, `r` resets, `q` quits.
pub fn parse_line(line: &str) -> Command {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "spin" => Command::Inputs(vec![UserInput::WheelClicked]),
        "p" | "pulse" => Command::Inputs(vec![UserInput::Pulse]),
        "n" | "next" => Command::Inputs(vec![UserInput::Advance, UserInput::NextRound]),
        "r" | "reset" => Command::Inputs(vec![UserInput::Reset]),
        "q" | "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

/// Forward commands from `reader` until it ends, the host quits, or the
/// session stops listening. Dropping `tx` on return closes the session loop.
pub async fn forward_commands<R>(reader: R, tx: mpsc::Sender<UserInput>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "failed to read command");
                break;
            }
        };

        match parse_line(&line) {
            Command::Inputs(inputs) => {
                for input in inputs {
                    if tx.send(input).await.is_err() {
                        return;
                    }
                }
            }
            Command::Quit => break,
            Command::Unknown(other) => {
                debug!(command = %other, "unknown command");
                eprintln!("unknown command '{other}' (s, p, n, r, q)");
            }
        }
    }
}

pub async fn read_stdin(tx: mpsc::Sender<UserInput>) {
    forward_commands(BufReader::new(tokio::io::stdin()), tx).await;
}
