//! User input.
//!
//! Input is read line by line on a dedicated thread so a blocking read never
//! stalls the async loop; lines are forwarded through a bounded channel. The
//! channel closes at end of input.

pub mod command;

pub use command::{Command, CommandError};

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc::{self, Receiver};
use tracing::debug;

/// One line of user input, without its line terminator.
pub type UserEvent = io::Result<String>;

/// Start reading lines from stdin.
pub fn init_user_event() -> Receiver<UserEvent> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}

/// Start reading lines from `reader` on a background thread.
pub fn spawn_line_reader<R>(reader: R) -> Receiver<UserEvent>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    thread::spawn(move || {
        for line in reader.lines() {
            let line = line.map(|mut l| {
                if l.ends_with('\r') {
                    l.pop();
                }
                l
            });
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Input reader finished");
    });
    rx
}
