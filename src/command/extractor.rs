//! Flag Value Extractor
//!
//! Resolves typed flag values for one invocation.
//!
//! ## Resolution Rules
//! For a key `k` requested as type `T`:
//! 1. `vals` = values the client sent for `k` (possibly none)
//! 2. If `k` was declared with a default and `vals` is empty, the default is
//!    returned. A default declared with a different type than `T` logs a
//!    warning; integer defaults are still converted when the value fits.
//! 3. Otherwise the first value (scalars) or every value (lists) is parsed
//!    as `T`. No value and no usable default is a `FlagParse` error, as is
//!    any value that fails to parse.

use std::collections::BTreeMap;
use std::time::Duration;

use super::flag::{FlagDescriptor, FlagScalar, FlagType, FlagValue};
use crate::error::{CmdlinkError, Result};

/// Per-request view of a message's flags against a command's declarations
///
/// Read-only: nothing here mutates the message or the descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FlagExtractor<'a> {
    command: &'a str,
    supplied: &'a BTreeMap<String, Vec<String>>,
    declared: &'a BTreeMap<String, FlagDescriptor>,
}

impl<'a> FlagExtractor<'a> {
    pub fn new(
        command: &'a str,
        supplied: &'a BTreeMap<String, Vec<String>>,
        declared: &'a BTreeMap<String, FlagDescriptor>,
    ) -> Self {
        Self {
            command,
            supplied,
            declared,
        }
    }

    /// Name of the command being invoked
    pub fn command(&self) -> &str {
        self.command
    }

    /// Raw values the client sent for `key`
    pub fn raw(&self, key: &str) -> &'a [String] {
        self.supplied.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if the client sent at least one value for `key`
    pub fn has(&self, key: &str) -> bool {
        !self.raw(key).is_empty()
    }

    /// Resolve a scalar flag
    pub fn value<T: FlagScalar>(&self, key: &str) -> Result<T> {
        let vals = self.raw(key);

        if let Some(default) = self.default_for(key, FlagType::scalar(T::KIND)) {
            if vals.is_empty() {
                if let Some(value) = T::from_value(default) {
                    return Ok(value);
                }
            }
        }

        let Some(first) = vals.first() else {
            return Err(self.missing(key));
        };
        parse_one::<T>(key, first)
    }

    /// Resolve a list flag; every supplied value must parse
    pub fn values<T: FlagScalar>(&self, key: &str) -> Result<Vec<T>> {
        let vals = self.raw(key);

        if let Some(default) = self.default_for(key, FlagType::list(T::KIND)) {
            if vals.is_empty() {
                if let Some(values) = T::from_list_value(default) {
                    return Ok(values);
                }
            }
        }

        if vals.is_empty() {
            return Err(self.missing(key));
        }
        vals.iter().map(|raw| parse_one::<T>(key, raw)).collect()
    }

    /// Registered default for `key`, warning if it was declared as another type
    fn default_for(&self, key: &str, requested: FlagType) -> Option<&'a FlagValue> {
        let default = self.declared.get(key)?.default_value()?;

        let declared = default.flag_type();
        if declared != requested {
            tracing::warn!(
                "[{}] default value for '{}' is of type '{}', should be '{}'",
                self.command,
                key,
                declared,
                requested
            );
        }

        Some(default)
    }

    fn missing(&self, key: &str) -> CmdlinkError {
        let reason = match self.declared.get(key) {
            Some(flag) if flag.is_required() => "required flag not supplied",
            Some(_) => "no value supplied and default is not usable as the requested type",
            None => "no value supplied for undeclared flag",
        };
        CmdlinkError::flag_parse(key, reason)
    }
}

fn parse_one<T: FlagScalar>(key: &str, raw: &str) -> Result<T> {
    T::parse_raw(raw).map_err(|reason| {
        CmdlinkError::flag_parse(key, format!("cannot parse '{}' as {}: {}", raw, T::KIND, reason))
    })
}

macro_rules! typed_getters {
    ($ty:ty, $scalar:ident, $list:ident) => {
        impl FlagExtractor<'_> {
            pub fn $scalar(&self, key: &str) -> Result<$ty> {
                self.value::<$ty>(key)
            }

            pub fn $list(&self, key: &str) -> Result<Vec<$ty>> {
                self.values::<$ty>(key)
            }
        }
    };
}

typed_getters!(isize, int, int_list);
typed_getters!(i64, int64, int64_list);
typed_getters!(usize, uint, uint_list);
typed_getters!(u64, uint64, uint64_list);
typed_getters!(bool, bool, bool_list);
typed_getters!(String, string, string_list);
typed_getters!(f64, float64, float64_list);
typed_getters!(Duration, duration, duration_list);
