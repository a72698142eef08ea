//! Interactive operator shell for the drive executable.
//!
//! Each line is parsed as a [`RemoteCmd`] (`status`, `pilots`, `select <index>`,
//! `select-name "<name>"`, `record`, `set-record [--enabled]`, `stop`), sent to the drive
//! executable and the response printed.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod client;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Report};
use comms_if::{
    net::{zmq, NetParams},
    remote::{RemoteCmd, RemoteResponse},
};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::path::PathBuf;
use structopt::StructOpt;

use client::RemoteClient;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "rover $ ";

/// History file, relative to the software root.
const HISTORY_PATH: &str = "data/remote_cli_history.txt";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "remote_cli", about = "Operator shell for the rover drive executable")]
struct Opt {
    /// Endpoint of the drive executable, overrides `remote_client_endpoint` from `net.toml`.
    #[structopt(long)]
    endpoint: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What to do with a line entered by the operator.
#[derive(Debug, PartialEq)]
enum LineAction {
    /// Nothing entered.
    Empty,

    /// Leave the shell.
    Exit,

    /// Send the command to the drive executable.
    Send(RemoteCmd),

    /// Print this message, either help or a parse error.
    Print(String),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    let endpoint = match opt.endpoint {
        Some(e) => e,
        None => {
            let net_params: NetParams =
                util::params::load("net.toml").wrap_err("Could not load net params")?;
            net_params.remote_client_endpoint
        }
    };

    let ctx = zmq::Context::new();
    let client = RemoteClient::new(&ctx, &endpoint)
        .wrap_err_with(|| format!("Could not connect to {}", endpoint))?;

    println!("Connecting to {}, type `help` for commands", endpoint);

    let history_path = util::host::get_sw_root()
        .map(|r| r.join(HISTORY_PATH))
        .unwrap_or_else(|_| PathBuf::from(HISTORY_PATH));

    let mut rl = DefaultEditor::new().wrap_err("Could not start the line editor")?;
    if rl.load_history(&history_path).is_err() {
        println!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled error: {:?}", e);
                break;
            }
        };

        rl.add_history_entry(line.as_str()).ok();

        match parse_line(&line) {
            LineAction::Empty => (),
            LineAction::Exit => break,
            LineAction::Print(msg) => println!("{}", msg),
            LineAction::Send(cmd) => match client.execute(&cmd) {
                Ok(response) => println!("{}", format_response(&response)),
                Err(e) => println!("Error: {}", e),
            },
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    if let Err(e) = rl.save_history(&history_path) {
        println!("Could not save history: {}", e);
    }

    println!("Exiting...");

    Ok(())
}

fn parse_line(line: &str) -> LineAction {
    let words = split_words(line);

    match words.first().map(String::as_str) {
        None => return LineAction::Empty,
        Some("exit") | Some("quit") => return LineAction::Exit,
        Some(_) => (),
    }

    match RemoteCmd::from_iter_safe(std::iter::once(String::from("remote")).chain(words)) {
        Ok(cmd) => LineAction::Send(cmd),
        Err(e) => LineAction::Print(e.message),
    }
}

/// Split a line on whitespace, keeping double quoted sections together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

fn format_response(response: &RemoteResponse) -> String {
    match response {
        RemoteResponse::Ok => "OK".into(),
        RemoteResponse::Invalid(reason) => format!("Rejected: {}", reason),
        RemoteResponse::Pilots(names) => format_pilots(names, None),
        RemoteResponse::Status(status) => format!(
            "{}\nRecording: {}\nCycles: {}\nLast cycle: {:.1} ms",
            format_pilots(&status.pilot_names, Some(status.selected_pilot)),
            if status.recording { "on" } else { "off" },
            status.num_cycles,
            status.last_cycle_time_s * 1000.0
        ),
    }
}

fn format_pilots(names: &[String], selected: Option<usize>) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let marker = if Some(i) == selected { "*" } else { " " };
            format!("{} {}: {}", marker, i, n)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::remote::LoopStatus;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), LineAction::Empty);
        assert_eq!(parse_line("quit"), LineAction::Exit);
        assert_eq!(
            parse_line("select 1"),
            LineAction::Send(RemoteCmd::SelectPilot { index: 1 })
        );
        assert_eq!(parse_line(" record "), LineAction::Send(RemoteCmd::ToggleRecord));
        assert_eq!(
            parse_line(r#"select-name "Mixed Radio""#),
            LineAction::Send(RemoteCmd::SelectPilotByName {
                name: "Mixed Radio".into()
            })
        );
        assert!(matches!(parse_line("select"), LineAction::Print(_)));
        assert!(matches!(parse_line("fly"), LineAction::Print(_)));
    }

    #[test]
    fn test_format_status() {
        let response = RemoteResponse::Status(LoopStatus {
            selected_pilot: 1,
            pilot_names: vec!["Radio".into(), "Autonomous".into()],
            recording: true,
            last_cycle_time_s: 0.0125,
            num_cycles: 42,
        });

        assert_eq!(
            format_response(&response),
            "  0: Radio\n* 1: Autonomous\nRecording: on\nCycles: 42\nLast cycle: 12.5 ms"
        );
    }
}
