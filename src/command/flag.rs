//! Flag definitions
//!
//! Typed flag kinds, default values and per-flag descriptors.

use std::fmt;
use std::time::Duration;

/// Scalar value kind a flag parses into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Int64,
    Uint,
    Uint64,
    Bool,
    String,
    Float64,
    Duration,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Int64 => "int64",
            ValueKind::Uint => "uint",
            ValueKind::Uint64 => "uint64",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::Float64 => "float64",
            ValueKind::Duration => "duration",
        };
        f.write_str(name)
    }
}

/// Declared type of a flag: a scalar kind or a list of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagType {
    pub kind: ValueKind,
    pub is_list: bool,
}

impl FlagType {
    pub const fn scalar(kind: ValueKind) -> Self {
        Self {
            kind,
            is_list: false,
        }
    }

    pub const fn list(kind: ValueKind) -> Self {
        Self {
            kind,
            is_list: true,
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_list {
            write!(f, "[{}]", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// A typed flag value, used for registered defaults
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Int(isize),
    Int64(i64),
    Uint(usize),
    Uint64(u64),
    Bool(bool),
    String(String),
    Float64(f64),
    Duration(Duration),
    IntList(Vec<isize>),
    Int64List(Vec<i64>),
    UintList(Vec<usize>),
    Uint64List(Vec<u64>),
    BoolList(Vec<bool>),
    StringList(Vec<String>),
    Float64List(Vec<f64>),
    DurationList(Vec<Duration>),
}

impl FlagValue {
    /// The flag type this value satisfies
    pub fn flag_type(&self) -> FlagType {
        match self {
            Self::Int(_) => FlagType::scalar(ValueKind::Int),
            Self::Int64(_) => FlagType::scalar(ValueKind::Int64),
            Self::Uint(_) => FlagType::scalar(ValueKind::Uint),
            Self::Uint64(_) => FlagType::scalar(ValueKind::Uint64),
            Self::Bool(_) => FlagType::scalar(ValueKind::Bool),
            Self::String(_) => FlagType::scalar(ValueKind::String),
            Self::Float64(_) => FlagType::scalar(ValueKind::Float64),
            Self::Duration(_) => FlagType::scalar(ValueKind::Duration),
            Self::IntList(_) => FlagType::list(ValueKind::Int),
            Self::Int64List(_) => FlagType::list(ValueKind::Int64),
            Self::UintList(_) => FlagType::list(ValueKind::Uint),
            Self::Uint64List(_) => FlagType::list(ValueKind::Uint64),
            Self::BoolList(_) => FlagType::list(ValueKind::Bool),
            Self::StringList(_) => FlagType::list(ValueKind::String),
            Self::Float64List(_) => FlagType::list(ValueKind::Float64),
            Self::DurationList(_) => FlagType::list(ValueKind::Duration),
        }
    }

    /// Integer scalar widened to i128, for cross-width conversion
    pub(crate) fn as_i128(&self) -> Option<i128> {
        match self {
            FlagValue::Int(v) => Some(*v as i128),
            FlagValue::Int64(v) => Some(*v as i128),
            FlagValue::Uint(v) => Some(*v as i128),
            FlagValue::Uint64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Integer list widened to i128, for cross-width conversion
    pub(crate) fn as_i128_list(&self) -> Option<Vec<i128>> {
        match self {
            FlagValue::IntList(v) => Some(v.iter().map(|n| *n as i128).collect()),
            FlagValue::Int64List(v) => Some(v.iter().map(|n| *n as i128).collect()),
            FlagValue::UintList(v) => Some(v.iter().map(|n| *n as i128).collect()),
            FlagValue::Uint64List(v) => Some(v.iter().map(|n| *n as i128).collect()),
            _ => None,
        }
    }
}

fn join<T, F>(f: &mut fmt::Formatter<'_>, items: &[T], mut each: F) -> fmt::Result
where
    F: FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
{
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        each(f, item)?;
    }
    Ok(())
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Uint(v) => write!(f, "{}", v),
            Self::Uint64(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::Duration(v) => write!(f, "{}", humantime::format_duration(*v)),
            Self::IntList(v) => join(f, v, |f, n| write!(f, "{}", n)),
            Self::Int64List(v) => join(f, v, |f, n| write!(f, "{}", n)),
            Self::UintList(v) => join(f, v, |f, n| write!(f, "{}", n)),
            Self::Uint64List(v) => join(f, v, |f, n| write!(f, "{}", n)),
            Self::BoolList(v) => join(f, v, |f, b| write!(f, "{}", b)),
            Self::StringList(v) => join(f, v, |f, s| write!(f, "{}", s)),
            Self::Float64List(v) => join(f, v, |f, x| write!(f, "{}", x)),
            Self::DurationList(v) => join(f, v, |f, d| write!(f, "{}", humantime::format_duration(*d))),
        }
    }
}

// =============================================================================
// Scalar types usable as flag values
// =============================================================================

/// A Rust type a flag value can be parsed into
///
/// Implemented for `isize`, `i64`, `usize`, `u64`, `bool`, `String`, `f64`
/// and `Duration`. Lists of these are handled by the `*_list` APIs.
pub trait FlagScalar: Sized + Clone {
    /// Scalar kind this type corresponds to
    const KIND: ValueKind;

    /// Parse one raw wire string
    fn parse_raw(raw: &str) -> std::result::Result<Self, String>;

    fn into_value(self) -> FlagValue;

    fn into_list_value(values: Vec<Self>) -> FlagValue;

    /// Read a registered scalar default, converting between integer widths when it fits
    fn from_value(value: &FlagValue) -> Option<Self>;

    /// Read a registered list default, converting between integer widths when it fits
    fn from_list_value(value: &FlagValue) -> Option<Vec<Self>>;
}

macro_rules! int_scalar {
    ($ty:ty, $kind:ident, $variant:ident, $list:ident) => {
        impl FlagScalar for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn parse_raw(raw: &str) -> std::result::Result<Self, String> {
                raw.parse::<$ty>().map_err(|e| e.to_string())
            }

            fn into_value(self) -> FlagValue {
                FlagValue::$variant(self)
            }

            fn into_list_value(values: Vec<Self>) -> FlagValue {
                FlagValue::$list(values)
            }

            fn from_value(value: &FlagValue) -> Option<Self> {
                value.as_i128().and_then(|n| <$ty>::try_from(n).ok())
            }

            fn from_list_value(value: &FlagValue) -> Option<Vec<Self>> {
                value
                    .as_i128_list()?
                    .into_iter()
                    .map(|n| <$ty>::try_from(n).ok())
                    .collect()
            }
        }
    };
}

int_scalar!(isize, Int, Int, IntList);
int_scalar!(i64, Int64, Int64, Int64List);
int_scalar!(usize, Uint, Uint, UintList);
int_scalar!(u64, Uint64, Uint64, Uint64List);

macro_rules! exact_scalar {
    ($ty:ty, $kind:ident, $variant:ident, $list:ident, $parse:ident) => {
        impl FlagScalar for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn parse_raw(raw: &str) -> std::result::Result<Self, String> {
                $parse(raw)
            }

            fn into_value(self) -> FlagValue {
                FlagValue::$variant(self)
            }

            fn into_list_value(values: Vec<Self>) -> FlagValue {
                FlagValue::$list(values)
            }

            fn from_value(value: &FlagValue) -> Option<Self> {
                match value {
                    FlagValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn from_list_value(value: &FlagValue) -> Option<Vec<Self>> {
                match value {
                    FlagValue::$list(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

exact_scalar!(bool, Bool, Bool, BoolList, parse_bool);
exact_scalar!(String, String, String, StringList, parse_string);
exact_scalar!(f64, Float64, Float64, Float64List, parse_float);
exact_scalar!(Duration, Duration, Duration, DurationList, parse_duration);

/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`
fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(format!("invalid boolean '{}'", raw)),
    }
}

fn parse_string(raw: &str) -> std::result::Result<String, String> {
    Ok(raw.to_string())
}

fn parse_float(raw: &str) -> std::result::Result<f64, String> {
    raw.parse::<f64>().map_err(|e| e.to_string())
}

fn parse_duration(raw: &str) -> std::result::Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|e| e.to_string())
}

// =============================================================================
// Flag Descriptor
// =============================================================================

/// Static description of one command flag
///
/// Built through [`FlagDescriptor::required`] or [`FlagDescriptor::optional`];
/// an optional flag's type is taken from its default, so the two always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagDescriptor {
    name: String,
    description: String,
    flag_type: FlagType,
    default: Option<FlagValue>,
}

impl FlagDescriptor {
    /// A flag the caller must supply
    pub fn required(
        name: impl Into<String>,
        description: impl Into<String>,
        flag_type: FlagType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            flag_type,
            default: None,
        }
    }

    /// A flag that falls back to `default` when the caller omits it
    pub fn optional(
        name: impl Into<String>,
        description: impl Into<String>,
        default: FlagValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            flag_type: default.flag_type(),
            default: Some(default),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn flag_type(&self) -> FlagType {
        self.flag_type
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn default_value(&self) -> Option<&FlagValue> {
        self.default.as_ref()
    }
}
