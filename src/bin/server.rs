//! cmdlink Server Binary
//!
//! Serves a handful of demo commands over TCP.

use std::io::Write;
use std::sync::{Arc, Weak};
use std::time::Duration;

use clap::Parser;
use cmdlink::config::resolve_address;
use cmdlink::{CmdlinkError, CommandDescriptor, CommandRegistry, Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// cmdlink Server
#[derive(Parser, Debug)]
#[command(name = "cmdlink-server")]
#[command(about = "Serve typed commands over a length-prefixed TCP protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port); defaults to $CMD_ADDRESS or localhost:51005
    #[arg(short, long)]
    listen: Option<String>,

    /// How long to wait for in-flight commands on shutdown (e.g. "5s", "500ms")
    #[arg(short = 't', long, default_value = "5s", value_parser = humantime::parse_duration)]
    shutdown_timeout: Duration,

    /// Per-connection read timeout in milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    read_timeout_ms: u64,

    /// Largest request payload in bytes
    #[arg(long, default_value = "16777216")]
    max_frame_size: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cmdlink=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let listen = args.listen.unwrap_or_else(resolve_address);

    tracing::info!("cmdlink Server v{}", cmdlink::VERSION);
    tracing::info!("Listen address: {}", listen);

    let config = Config::builder()
        .listen_addr(listen)
        .read_timeout_ms(args.read_timeout_ms)
        .max_frame_size(args.max_frame_size)
        .shutdown_timeout_ms(args.shutdown_timeout.as_millis() as u64)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let registry = Arc::new(CommandRegistry::new());
    register_demo_commands(&registry);
    tracing::info!("Registered commands: {}", registry.names().join(", "));

    let server = Server::new(config, registry);
    server.register_on_shutdown(|| tracing::info!("Shutdown hook: no longer accepting commands"));

    let (done_tx, done_rx) = crossbeam::channel::bounded::<cmdlink::Result<()>>(1);

    #[cfg(unix)]
    {
        let server = server.clone();
        let spawned = std::thread::Builder::new()
            .name("cmdlink-signals".to_string())
            .spawn(move || {
                let _ = done_tx.send(wait_for_signal_and_shutdown(&server));
            });
        if let Err(e) = spawned {
            tracing::error!("Failed to start signal handler: {}", e);
            std::process::exit(1);
        }
    }
    #[cfg(not(unix))]
    drop(done_tx);

    match server.listen_and_serve() {
        Err(e) if e.is_server_closed() => {}
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
        Ok(()) => {}
    }

    // The accept loop stops as soon as shutdown begins; wait for the drain
    match done_rx.recv() {
        Ok(Ok(())) | Err(_) => tracing::info!("Server stopped"),
        Ok(Err(e)) => {
            tracing::error!("Shutdown incomplete: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(unix)]
fn wait_for_signal_and_shutdown(server: &Server) -> cmdlink::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        tracing::info!("Received signal {}, initiating shutdown...", signal);
    }
    server.shutdown(server.config().shutdown_timeout())
}

fn register_demo_commands(registry: &Arc<CommandRegistry>) {
    registry.register(
        CommandDescriptor::new("echo", "Write a message back", |input, out| {
            let msg = input.string("msg")?;
            let times = input.uint("times")?;
            for _ in 0..times {
                writeln!(out, "{}", msg)?;
            }
            Ok(())
        })
        .optional_string("msg", "Text to echo", "hi".to_string())
        .optional_uint("times", "How many times to repeat it", 1),
    );

    registry.register(
        CommandDescriptor::new("sum", "Add up a list of integers", |input, out| {
            let xs = input.int64_list("xs")?;
            let total = xs
                .iter()
                .try_fold(0i64, |acc, x| acc.checked_add(*x))
                .ok_or_else(|| CmdlinkError::Handler("sum overflows int64".to_string()))?;
            writeln!(out, "{}", total)?;
            Ok(())
        })
        .required_int64_list("xs", "Numbers to add"),
    );

    registry.register(
        CommandDescriptor::new("sleep", "Hold the connection open for a while", |input, out| {
            let duration = input.duration("for")?;
            std::thread::sleep(duration);
            writeln!(out, "slept {}", humantime::format_duration(duration))?;
            Ok(())
        })
        .optional_duration("for", "How long to sleep", Duration::from_secs(1)),
    );

    let weak: Weak<CommandRegistry> = Arc::downgrade(registry);
    registry.register(CommandDescriptor::new(
        "help",
        "List commands and their flags",
        move |_, out| {
            let registry = weak
                .upgrade()
                .ok_or_else(|| CmdlinkError::Handler("registry dropped".to_string()))?;
            out.write_all(registry.usage().as_bytes())?;
            Ok(())
        },
    ));
}
