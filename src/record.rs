//! Structured record codecs.
//!
//! Each entity is written as a MessagePack map whose keys are the
//! entity's field names in declared order. Decoding is lenient by
//! default (extra keys ignored, any order); entities listed in the
//! [`DecodeConfig`]'s strict set must match their declared layout exactly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotation::Annotation;
use crate::error::{Error, Result};
use crate::recording::Recording;
use crate::scalar::{Nanoseconds, SampleType, Scalar};
use crate::signal::Signal;
use crate::storage::Header;

/// The structured entities of the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Header,
    Annotation,
    Signal,
    Recording,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Header => "Header",
            EntityKind::Annotation => "Annotation",
            EntityKind::Signal => "Signal",
            EntityKind::Recording => "Recording",
        };
        f.write_str(name)
    }
}

/// Set of entity kinds decoded in strict mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrictTypes(BTreeSet<EntityKind>);

impl StrictTypes {
    pub fn none() -> Self {
        StrictTypes::default()
    }

    pub fn with(mut self, kind: EntityKind) -> Self {
        self.0.insert(kind);
        self
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0.contains(&kind)
    }
}

impl FromIterator<EntityKind> for StrictTypes {
    fn from_iter<I: IntoIterator<Item = EntityKind>>(iter: I) -> Self {
        StrictTypes(iter.into_iter().collect())
    }
}

/// Decode configuration passed through every nested record decode.
#[derive(Clone, Debug, Default)]
pub struct DecodeConfig {
    pub strict: StrictTypes,
}

impl DecodeConfig {
    pub fn strict(strict: StrictTypes) -> Self {
        DecodeConfig { strict }
    }

    pub fn is_strict(&self, kind: EntityKind) -> bool {
        self.strict.contains(kind)
    }
}

/// An entity encoded as an ordered, field-tagged map.
pub trait Record: Sized {
    const KIND: EntityKind;
    /// Field names in declared order.
    const FIELDS: &'static [&'static str];

    fn to_value(&self) -> Result<Value>;
    fn from_value(value: &Value, config: &DecodeConfig) -> Result<Self>;
}

/// Map entries of one record being decoded.
struct Fields<'a> {
    kind: EntityKind,
    entries: &'a [(Value, Value)],
}

impl<'a> Fields<'a> {
    fn of<R: Record>(value: &'a Value, config: &DecodeConfig) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries.as_slice(),
            other => return Err(Error::unsupported("map record", other)),
        };
        if config.is_strict(R::KIND) {
            check_layout(R::KIND, R::FIELDS, entries)?;
        }
        Ok(Fields {
            kind: R::KIND,
            entries,
        })
    }

    fn get(&self, field: &'static str) -> Result<&'a Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_str() == Some(field))
            .map(|(_, value)| value)
            .ok_or(Error::MissingField {
                entity: self.kind,
                field,
            })
    }

    fn scalar<T: Scalar>(&self, field: &'static str) -> Result<T> {
        T::decode_scalar(self.get(field)?)
    }
}

/// Strict layout: keys must be exactly `declared`, in order.
fn check_layout(kind: EntityKind, declared: &[&'static str], entries: &[(Value, Value)]) -> Result<()> {
    let unexpected = |key: &Value| Error::UnexpectedField {
        entity: kind,
        field: key
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string()),
    };
    if let Some((key, _)) = entries
        .iter()
        .find(|(key, _)| !key.as_str().is_some_and(|name| declared.iter().any(|d| *d == name)))
    {
        return Err(unexpected(key));
    }
    if let Some(&field) = declared
        .iter()
        .find(|&&field| !entries.iter().any(|(key, _)| key.as_str() == Some(field)))
    {
        return Err(Error::MissingField { entity: kind, field });
    }
    // every key is declared and none is missing; what remains is order and duplicates
    for (i, (key, _)) in entries.iter().enumerate() {
        if declared.get(i).copied() != key.as_str() {
            return Err(unexpected(key));
        }
    }
    Ok(())
}

fn record(fields: Vec<(&'static str, Value)>) -> Value {
    Value::Map(
        fields
            .into_iter()
            .map(|(name, value)| (Value::from(name), value))
            .collect(),
    )
}

fn array(value: &Value) -> Result<&[Value]> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::unsupported("array", other)),
    }
}

/// Decodes a map keyed by strings, handing each value to `decode`.
fn string_keyed<T>(value: &Value, mut decode: impl FnMut(&Value) -> Result<T>) -> Result<BTreeMap<String, T>> {
    let entries = match value {
        Value::Map(entries) => entries,
        other => return Err(Error::unsupported("map", other)),
    };
    entries
        .iter()
        .map(|(key, value)| Ok((String::decode_scalar(key)?, decode(value)?)))
        .collect()
}

impl Record for Header {
    const KIND: EntityKind = EntityKind::Header;
    const FIELDS: &'static [&'static str] = &["onda_format_version", "ordered_keys"];

    fn to_value(&self) -> Result<Value> {
        Ok(record(vec![
            ("onda_format_version", self.onda_format_version.encode_scalar()),
            ("ordered_keys", self.ordered_keys.encode_scalar()),
        ]))
    }

    fn from_value(value: &Value, config: &DecodeConfig) -> Result<Self> {
        let fields = Fields::of::<Self>(value, config)?;
        Ok(Header {
            onda_format_version: fields.scalar("onda_format_version")?,
            ordered_keys: fields.scalar("ordered_keys")?,
        })
    }
}

impl Record for Annotation {
    const KIND: EntityKind = EntityKind::Annotation;
    const FIELDS: &'static [&'static str] = &["key", "value", "start_nanosecond", "stop_nanosecond"];

    fn to_value(&self) -> Result<Value> {
        Ok(record(vec![
            ("key", Value::from(self.key())),
            ("value", Value::from(self.value())),
            ("start_nanosecond", self.start().encode_scalar()),
            ("stop_nanosecond", self.stop().encode_scalar()),
        ]))
    }

    fn from_value(value: &Value, config: &DecodeConfig) -> Result<Self> {
        let fields = Fields::of::<Self>(value, config)?;
        Annotation::new(
            fields.scalar::<String>("key")?,
            fields.scalar::<String>("value")?,
            fields.scalar::<Nanoseconds>("start_nanosecond")?,
            fields.scalar::<Nanoseconds>("stop_nanosecond")?,
        )
    }
}

impl Record for Signal {
    const KIND: EntityKind = EntityKind::Signal;
    const FIELDS: &'static [&'static str] = &[
        "channel_names",
        "sample_unit",
        "sample_resolution_in_unit",
        "sample_type",
        "sample_rate",
        "file_extension",
        "file_options",
    ];

    fn to_value(&self) -> Result<Value> {
        let channel_names = self.channel_names.iter().map(String::encode_scalar).collect();
        let file_options = match &self.file_options {
            Some(options) => Value::Map(
                options
                    .iter()
                    .map(|(k, v)| (k.encode_scalar(), v.clone()))
                    .collect(),
            ),
            None => Value::Nil,
        };
        Ok(record(vec![
            ("channel_names", Value::Array(channel_names)),
            ("sample_unit", self.sample_unit.encode_scalar()),
            ("sample_resolution_in_unit", self.sample_resolution_in_unit.encode_scalar()),
            ("sample_type", self.sample_type.encode_scalar()),
            ("sample_rate", self.sample_rate.encode_scalar()),
            ("file_extension", self.file_extension.encode_scalar()),
            ("file_options", file_options),
        ]))
    }

    fn from_value(value: &Value, config: &DecodeConfig) -> Result<Self> {
        let fields = Fields::of::<Self>(value, config)?;
        let channel_names = array(fields.get("channel_names")?)?
            .iter()
            .map(String::decode_scalar)
            .collect::<Result<Vec<_>>>()?;
        let file_options = match fields.get("file_options")? {
            Value::Nil => None,
            options => Some(string_keyed(options, |v| Ok(v.clone()))?),
        };
        Ok(Signal {
            channel_names,
            sample_unit: fields.scalar("sample_unit")?,
            sample_resolution_in_unit: fields.scalar("sample_resolution_in_unit")?,
            sample_type: fields.scalar::<SampleType>("sample_type")?,
            sample_rate: fields.scalar("sample_rate")?,
            file_extension: fields.scalar("file_extension")?,
            file_options,
        })
    }
}

impl<C: Serialize + DeserializeOwned> Record for Recording<C> {
    const KIND: EntityKind = EntityKind::Recording;
    const FIELDS: &'static [&'static str] = &["duration_in_nanoseconds", "signals", "annotations", "custom"];

    fn to_value(&self) -> Result<Value> {
        let signals = self
            .signals
            .iter()
            .map(|(name, signal)| Ok((name.encode_scalar(), signal.to_value()?)))
            .collect::<Result<Vec<_>>>()?;
        let annotations = self
            .annotations
            .iter()
            .map(Annotation::to_value)
            .collect::<Result<Vec<_>>>()?;
        let custom = rmpv::ext::to_value(&self.custom).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(record(vec![
            ("duration_in_nanoseconds", self.duration_in_nanoseconds.encode_scalar()),
            ("signals", Value::Map(signals)),
            ("annotations", Value::Array(annotations)),
            ("custom", custom),
        ]))
    }

    fn from_value(value: &Value, config: &DecodeConfig) -> Result<Self> {
        let fields = Fields::of::<Self>(value, config)?;
        let signals = string_keyed(fields.get("signals")?, |v| Signal::from_value(v, config))?;
        let annotations = array(fields.get("annotations")?)?
            .iter()
            .map(|v| Annotation::from_value(v, config))
            .collect::<Result<BTreeSet<_>>>()?;
        let custom = rmpv::ext::from_value(fields.get("custom")?.clone())
            .map_err(|e| Error::malformed("custom payload", e))?;
        Ok(Recording {
            duration_in_nanoseconds: fields.scalar("duration_in_nanoseconds")?,
            signals,
            annotations,
            custom,
        })
    }
}

/// Encodes the recordings map keyed by UUID string.
pub fn recordings_to_value<C: Serialize + DeserializeOwned>(
    recordings: &BTreeMap<Uuid, Recording<C>>,
) -> Result<Value> {
    let entries = recordings
        .iter()
        .map(|(id, recording)| Ok((id.encode_scalar(), recording.to_value()?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Map(entries))
}

pub fn recordings_from_value<C: Serialize + DeserializeOwned>(
    value: &Value,
    config: &DecodeConfig,
) -> Result<BTreeMap<Uuid, Recording<C>>> {
    let entries = match value {
        Value::Map(entries) => entries,
        other => return Err(Error::unsupported("map of recordings", other)),
    };
    entries
        .iter()
        .map(|(id, recording)| Ok((Uuid::decode_scalar(id)?, Recording::from_value(recording, config)?)))
        .collect()
}
