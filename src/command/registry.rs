//! Command Registry
//!
//! Name -> descriptor map shared by the registration code and every
//! dispatching connection.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use parking_lot::RwLock;

use super::CommandDescriptor;
use crate::error::{CmdlinkError, Result};
use crate::protocol::WireMessage;

/// Registered commands, keyed by name
///
/// ## Concurrency
/// Registration takes the write lock, lookups take the read lock, so a late
/// registration can safely race a dispatch. Descriptors are handed out as
/// `Arc`s; a lookup never holds the lock while a handler runs.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<CommandDescriptor>>>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, replacing any command with the same name
    ///
    /// Returns the descriptor that was replaced, if any.
    pub fn register(&self, descriptor: CommandDescriptor) -> Option<Arc<CommandDescriptor>> {
        let name = descriptor.name().to_string();
        let previous = self
            .commands
            .write()
            .insert(name.clone(), Arc::new(descriptor));

        if previous.is_some() {
            tracing::debug!("Command '{}' re-registered, previous definition replaced", name);
        } else {
            tracing::debug!("Command '{}' registered", name);
        }
        previous
    }

    /// Look up a command by name
    pub fn lookup(&self, name: &str) -> Result<Arc<CommandDescriptor>> {
        self.commands
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CmdlinkError::CommandNotFound(name.to_string()))
    }

    /// Run the command a message names, writing its response to `out`
    ///
    /// Steps:
    /// 1. Resolve the descriptor (CommandNotFound if absent, no handler runs)
    /// 2. Bind the message flags to the descriptor's flag declarations
    /// 3. Invoke the handler
    pub fn dispatch(&self, message: &WireMessage, out: &mut dyn Write) -> Result<()> {
        let command = self.lookup(&message.name)?;
        let input = command.bind(message);
        command.invoke(&input, out)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Human-readable listing of every command and its flags
    pub fn usage(&self) -> String {
        let commands = self.commands.read();
        let mut names: Vec<&String> = commands.keys().collect();
        names.sort();

        let mut out = String::new();
        for name in names {
            let command = &commands[name];
            let _ = writeln!(out, "{} - {}", command.name(), command.description());
            for flag in command.flags().values() {
                let _ = write!(
                    out,
                    "    --{} <{}>  {}",
                    flag.name(),
                    flag.flag_type(),
                    flag.description()
                );
                let _ = match flag.default_value() {
                    Some(default) => writeln!(out, " (default: {})", default),
                    None => writeln!(out, " (required)"),
                };
            }
        }
        out
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
