//! Command Module
//!
//! Command definitions, the registry that holds them, and typed flag
//! resolution for each invocation.
//!
//! ## Lifecycle
//! ```text
//!  startup                          per request
//! ┌──────────────────────┐        ┌──────────────────────────────────┐
//! │ CommandDescriptor    │        │ WireMessage ──► registry.lookup  │
//! │   .required_int(..)  │        │            ──► descriptor.bind   │
//! │   .optional_*(..)    │──reg──►│            ──► FlagExtractor     │
//! └──────────────────────┘        │            ──► handler(in, out)  │
//!                                 └──────────────────────────────────┘
//! ```

mod descriptor;
mod extractor;
mod flag;
mod registry;

pub use descriptor::{CommandDescriptor, Handler};
pub use extractor::FlagExtractor;
pub use flag::{FlagDescriptor, FlagScalar, FlagType, FlagValue, ValueKind};
pub use registry::CommandRegistry;
