//! Scalar codecs: the mapping between single domain values and their
//! MessagePack interchange form.
//!
//! Every supported scalar implements [`Scalar`]. The structured record
//! codecs in [`crate::record`] are built entirely out of these pairs.

use std::any::{type_name, TypeId};
use std::fmt;
use std::str::FromStr;

use rmpv::Value;
use semver::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Encode/decode pair for one interchange scalar.
pub trait Scalar: Sized {
    fn encode_scalar(&self) -> Value;
    fn decode_scalar(value: &Value) -> Result<Self>;
}

/// A non-negative time span with nanosecond resolution.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Nanoseconds(pub u64);

impl Nanoseconds {
    /// Saturates at `u64::MAX` nanoseconds.
    pub const fn from_secs(secs: u64) -> Self {
        Nanoseconds(secs.saturating_mul(1_000_000_000))
    }
}

impl fmt::Display for Nanoseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

impl Scalar for Nanoseconds {
    fn encode_scalar(&self) -> Value {
        Value::from(self.0)
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i
                .as_u64()
                .map(Nanoseconds)
                .ok_or_else(|| Error::malformed("non-negative nanosecond count", i)),
            other => Err(Error::unsupported("integer nanosecond count", other)),
        }
    }
}

impl Scalar for Version {
    fn encode_scalar(&self) -> Value {
        Value::from(format!("v{}", self))
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        let text = String::decode_scalar(value)?;
        text.strip_prefix('v')
            .and_then(parse_version)
            .ok_or_else(|| Error::malformed("version string of the form `vMAJOR.MINOR.PATCH`", text))
    }
}

/// Parses `major.minor.patch`, also accepting a bare `major.minor`.
fn parse_version(text: &str) -> Option<Version> {
    if let Ok(v) = Version::parse(text) {
        return Some(v);
    }
    let mut parts = text.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Version::new(major, minor, 0))
}

impl Scalar for Uuid {
    fn encode_scalar(&self) -> Value {
        Value::from(self.hyphenated().to_string())
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        let text = String::decode_scalar(value)?;
        Uuid::parse_str(&text).map_err(|_| Error::malformed("canonical UUID string", text))
    }
}

/// Element type of a signal's samples.
///
/// Only fixed-width integers are supported; [`SampleType::as_str`] is the
/// authority for both directions of the tag mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl SampleType {
    pub const ALL: [SampleType; 8] = [
        SampleType::Int8,
        SampleType::Int16,
        SampleType::Int32,
        SampleType::Int64,
        SampleType::UInt8,
        SampleType::UInt16,
        SampleType::UInt32,
        SampleType::UInt64,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SampleType::Int8 => "int8",
            SampleType::Int16 => "int16",
            SampleType::Int32 => "int32",
            SampleType::Int64 => "int64",
            SampleType::UInt8 => "uint8",
            SampleType::UInt16 => "uint16",
            SampleType::UInt32 => "uint32",
            SampleType::UInt64 => "uint64",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        SampleType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == tag)
            .ok_or_else(|| Error::UnsupportedSampleType(tag.to_string()))
    }

    /// Maps a Rust element type to its sample type.
    ///
    /// Anything other than the eight fixed-width integers fails, floats included.
    pub fn of<T: 'static>() -> Result<Self> {
        let id = TypeId::of::<T>();
        let ty = if id == TypeId::of::<i8>() {
            SampleType::Int8
        } else if id == TypeId::of::<i16>() {
            SampleType::Int16
        } else if id == TypeId::of::<i32>() {
            SampleType::Int32
        } else if id == TypeId::of::<i64>() {
            SampleType::Int64
        } else if id == TypeId::of::<u8>() {
            SampleType::UInt8
        } else if id == TypeId::of::<u16>() {
            SampleType::UInt16
        } else if id == TypeId::of::<u32>() {
            SampleType::UInt32
        } else if id == TypeId::of::<u64>() {
            SampleType::UInt64
        } else {
            return Err(Error::UnsupportedSampleType(type_name::<T>().to_string()));
        };
        Ok(ty)
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            SampleType::Int8 | SampleType::UInt8 => 1,
            SampleType::Int16 | SampleType::UInt16 => 2,
            SampleType::Int32 | SampleType::UInt32 => 4,
            SampleType::Int64 | SampleType::UInt64 => 8,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SampleType::from_tag(s)
    }
}

impl Scalar for SampleType {
    fn encode_scalar(&self) -> Value {
        Value::from(self.as_str())
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => match s.as_str() {
                Some(tag) => SampleType::from_tag(tag),
                None => Err(Error::UnsupportedSampleType(s.to_string())),
            },
            other => Err(Error::unsupported("sample type string", other)),
        }
    }
}

impl Scalar for String {
    fn encode_scalar(&self) -> Value {
        Value::from(self.as_str())
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::malformed("UTF-8 string", s)),
            other => Err(Error::unsupported("string", other)),
        }
    }
}

impl Scalar for bool {
    fn encode_scalar(&self) -> Value {
        Value::from(*self)
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| Error::unsupported("boolean", value))
    }
}

impl Scalar for u64 {
    fn encode_scalar(&self) -> Value {
        Value::from(*self)
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i
                .as_u64()
                .ok_or_else(|| Error::malformed("unsigned integer", i)),
            other => Err(Error::unsupported("unsigned integer", other)),
        }
    }
}

impl Scalar for f64 {
    fn encode_scalar(&self) -> Value {
        Value::F64(*self)
    }

    fn decode_scalar(value: &Value) -> Result<Self> {
        match value {
            Value::F64(x) => Ok(*x),
            Value::F32(x) => Ok(f64::from(*x)),
            Value::Integer(i) => i
                .as_f64()
                .ok_or_else(|| Error::malformed("float", i)),
            other => Err(Error::unsupported("float", other)),
        }
    }
}
