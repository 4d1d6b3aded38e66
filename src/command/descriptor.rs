//! Command descriptors
//!
//! Static metadata for one command: its handler plus the flags it accepts.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use super::extractor::FlagExtractor;
use super::flag::{FlagDescriptor, FlagScalar, FlagType};
use crate::error::Result;
use crate::protocol::WireMessage;

/// Command callback: reads typed flags from the extractor and writes its
/// response straight to the connection.
pub type Handler = Arc<dyn Fn(&FlagExtractor<'_>, &mut dyn Write) -> Result<()> + Send + Sync>;

/// A command definition, assembled with the builder methods and then
/// handed to a [`CommandRegistry`](super::CommandRegistry)
///
/// ```no_run
/// use std::io::Write;
///
/// use cmdlink::command::CommandDescriptor;
///
/// let echo = CommandDescriptor::new("echo", "Write a message back", |input, out| {
///     let msg = input.string("msg")?;
///     out.write_all(msg.as_bytes())?;
///     Ok(())
/// })
/// .optional_string("msg", "Message to write", "hi".to_string());
/// ```
#[derive(Clone)]
pub struct CommandDescriptor {
    name: String,
    description: String,
    handler: Handler,
    flags: BTreeMap<String, FlagDescriptor>,
}

impl CommandDescriptor {
    /// Create a command with no flags
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&FlagExtractor<'_>, &mut dyn Write) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
            flags: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared flags, keyed by name
    pub fn flags(&self) -> &BTreeMap<String, FlagDescriptor> {
        &self.flags
    }

    pub fn flag(&self, name: &str) -> Option<&FlagDescriptor> {
        self.flags.get(name)
    }

    // =========================================================================
    // Builder
    // =========================================================================

    /// Declare a flag; a later declaration with the same name replaces it
    pub fn add_flag(mut self, flag: FlagDescriptor) -> Self {
        self.flags.insert(flag.name().to_string(), flag);
        self
    }

    /// Declare a required scalar flag of type `T`
    pub fn required<T: FlagScalar>(self, name: &str, description: &str) -> Self {
        self.add_flag(FlagDescriptor::required(
            name,
            description,
            FlagType::scalar(T::KIND),
        ))
    }

    /// Declare an optional scalar flag of type `T`
    pub fn optional<T: FlagScalar>(self, name: &str, description: &str, default: T) -> Self {
        self.add_flag(FlagDescriptor::optional(
            name,
            description,
            default.into_value(),
        ))
    }

    /// Declare a required list flag of element type `T`
    pub fn required_list<T: FlagScalar>(self, name: &str, description: &str) -> Self {
        self.add_flag(FlagDescriptor::required(
            name,
            description,
            FlagType::list(T::KIND),
        ))
    }

    /// Declare an optional list flag of element type `T`
    pub fn optional_list<T: FlagScalar>(
        self,
        name: &str,
        description: &str,
        default: Vec<T>,
    ) -> Self {
        self.add_flag(FlagDescriptor::optional(
            name,
            description,
            T::into_list_value(default),
        ))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Bind a message's flags against this command's declarations
    pub fn bind<'a>(&'a self, message: &'a WireMessage) -> FlagExtractor<'a> {
        FlagExtractor::new(&self.name, &message.flags, &self.flags)
    }

    /// Run the handler
    pub fn invoke(&self, input: &FlagExtractor<'_>, out: &mut dyn Write) -> Result<()> {
        (self.handler)(input, out)
    }
}

macro_rules! typed_builders {
    ($ty:ty, $req:ident, $opt:ident, $req_list:ident, $opt_list:ident) => {
        impl CommandDescriptor {
            pub fn $req(self, name: &str, description: &str) -> Self {
                self.required::<$ty>(name, description)
            }

            pub fn $opt(self, name: &str, description: &str, default: $ty) -> Self {
                self.optional::<$ty>(name, description, default)
            }

            pub fn $req_list(self, name: &str, description: &str) -> Self {
                self.required_list::<$ty>(name, description)
            }

            pub fn $opt_list(self, name: &str, description: &str, default: Vec<$ty>) -> Self {
                self.optional_list::<$ty>(name, description, default)
            }
        }
    };
}

typed_builders!(isize, required_int, optional_int, required_int_list, optional_int_list);
typed_builders!(i64, required_int64, optional_int64, required_int64_list, optional_int64_list);
typed_builders!(usize, required_uint, optional_uint, required_uint_list, optional_uint_list);
typed_builders!(u64, required_uint64, optional_uint64, required_uint64_list, optional_uint64_list);
typed_builders!(bool, required_bool, optional_bool, required_bool_list, optional_bool_list);
typed_builders!(String, required_string, optional_string, required_string_list, optional_string_list);
typed_builders!(f64, required_float64, optional_float64, required_float64_list, optional_float64_list);
typed_builders!(
    Duration,
    required_duration,
    optional_duration,
    required_duration_list,
    optional_duration_list
);

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
