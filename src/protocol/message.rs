//! Wire message definitions
//!
//! Represents one command invocation sent by a client.

use std::collections::BTreeMap;

/// A decoded command invocation: the command name plus raw flag values
///
/// Each flag maps to an ordered list of raw strings; typing happens later,
/// against the command's registered flag descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireMessage {
    /// Name of the command to run
    pub name: String,

    /// Flag name -> raw values, in the order the client supplied them
    pub flags: BTreeMap<String, Vec<String>>,
}

impl WireMessage {
    /// Create a message with no flags
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: BTreeMap::new(),
        }
    }

    /// Set all values of a flag, replacing any previous ones
    pub fn with_flag<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Append one value to a flag
    pub fn push_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.flags.entry(name.into()).or_default().push(value.into());
    }

    /// Raw values supplied for a flag (empty if absent)
    pub fn values(&self, name: &str) -> &[String] {
        self.flags.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
