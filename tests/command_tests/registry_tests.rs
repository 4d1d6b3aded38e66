//! Registry Tests
//!
//! Tests for command registration, lookup and dispatch.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use cmdlink::{CmdlinkError, CommandDescriptor, CommandRegistry, WireMessage};

fn reply(name: &str, text: &'static str) -> CommandDescriptor {
    CommandDescriptor::new(name, "Fixed reply", move |_, out| {
        out.write_all(text.as_bytes())?;
        Ok(())
    })
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_register_and_lookup() {
    let registry = CommandRegistry::new();
    assert!(registry.is_empty());

    assert!(registry.register(reply("ping", "pong")).is_none());

    let found = registry.lookup("ping").unwrap();
    assert_eq!(found.name(), "ping");
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_register_same_name_replaces() {
    let registry = CommandRegistry::new();
    registry.register(reply("ping", "first"));

    let previous = registry.register(reply("ping", "second"));
    assert!(previous.is_some());
    assert_eq!(registry.len(), 1);

    let mut out = Vec::new();
    registry
        .dispatch(&WireMessage::new("ping"), &mut out)
        .unwrap();
    assert_eq!(out, b"second");
}

#[test]
fn test_lookup_unknown_command() {
    let registry = CommandRegistry::new();
    match registry.lookup("nope") {
        Err(CmdlinkError::CommandNotFound(name)) => assert_eq!(name, "nope"),
        other => panic!("Expected CommandNotFound, got {:?}", other.map(|c| c.name().to_string())),
    }
}

#[test]
fn test_names_are_sorted() {
    let registry = CommandRegistry::new();
    for name in ["zeta", "alpha", "mid"] {
        registry.register(reply(name, ""));
    }
    assert_eq!(registry.names(), ["alpha", "mid", "zeta"]);
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_dispatch_unknown_command_runs_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = CommandRegistry::new();
    {
        let calls = Arc::clone(&calls);
        registry.register(CommandDescriptor::new("known", "", move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    let mut out = Vec::new();
    let err = registry
        .dispatch(&WireMessage::new("unknown"), &mut out)
        .unwrap_err();

    assert!(matches!(err, CmdlinkError::CommandNotFound(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(out.is_empty());
}

#[test]
fn test_dispatch_passes_flags_to_handler() {
    let registry = CommandRegistry::new();
    registry.register(
        CommandDescriptor::new("greet", "", |input, out| {
            writeln!(out, "hello {}", input.string("who")?)?;
            Ok(())
        })
        .required_string("who", "Who to greet"),
    );

    let mut out = Vec::new();
    let msg = WireMessage::new("greet").with_flag("who", ["world"]);
    registry.dispatch(&msg, &mut out).unwrap();
    assert_eq!(out, b"hello world\n");
}

#[test]
fn test_dispatch_returns_handler_error() {
    let registry = CommandRegistry::new();
    registry.register(CommandDescriptor::new("fail", "", |_, _| {
        Err(CmdlinkError::Handler("boom".to_string()))
    }));

    let mut out = Vec::new();
    let err = registry
        .dispatch(&WireMessage::new("fail"), &mut out)
        .unwrap_err();
    assert!(matches!(err, CmdlinkError::Handler(ref msg) if msg == "boom"));
}

#[test]
fn test_usage_lists_flags_and_defaults() {
    let registry = CommandRegistry::new();
    registry.register(
        CommandDescriptor::new("echo", "Write a message back", |_, _| Ok(()))
            .optional_string("msg", "Text to echo", "hi".to_string())
            .required_int_list("xs", "Numbers"),
    );

    let usage = registry.usage();
    assert!(usage.contains("echo - Write a message back"));
    assert!(usage.contains("--msg <string>  Text to echo (default: hi)"));
    assert!(usage.contains("--xs <[int]>  Numbers (required)"));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_register_and_dispatch() {
    let registry = Arc::new(CommandRegistry::new());
    registry.register(reply("base", "ok"));

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..50 {
                    registry.register(reply(&format!("cmd-{}-{}", t, i), "x"));
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut out = Vec::new();
                    registry
                        .dispatch(&WireMessage::new("base"), &mut out)
                        .unwrap();
                    assert_eq!(out, b"ok");
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(registry.len(), 1 + 4 * 50);
}
