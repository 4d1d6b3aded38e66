//! cmdlink CLI Client
//!
//! Sends one command to a cmdlink server and prints the response.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use cmdlink::config::resolve_address;
use cmdlink::{Client, WireMessage};

/// cmdlink CLI
#[derive(Parser, Debug)]
#[command(name = "cmdlink-cli")]
#[command(about = "Run a command on a cmdlink server")]
#[command(version)]
struct Args {
    /// Server address; defaults to $CMD_ADDRESS or localhost:51005
    #[arg(short, long)]
    server: Option<String>,

    /// Response timeout (e.g. "10s")
    #[arg(short, long, default_value = "30s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Command name
    command: String,

    /// Flag as name=value; repeat a name to send a list
    #[arg(short, long = "flag", value_parser = parse_flag)]
    flags: Vec<(String, String)>,
}

fn parse_flag(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim_start_matches('-');
    if name.is_empty() {
        return Err(format!("missing flag name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

fn main() {
    let args = Args::parse();
    let server = args.server.unwrap_or_else(resolve_address);

    let mut message = WireMessage::new(args.command);
    for (name, value) in args.flags {
        message.push_value(name, value);
    }

    let client = Client::new(server).read_timeout(args.timeout);
    let response = match client.call(&message) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    if stdout.write_all(&response).and_then(|_| stdout.flush()).is_err() {
        std::process::exit(1);
    }
    if response.starts_with(b"error: ") {
        std::process::exit(2);
    }
}
