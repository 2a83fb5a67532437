use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rmpv::Value;
use semver::Version;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::record::{recordings_from_value, recordings_to_value, DecodeConfig, EntityKind, Record, StrictTypes};
use crate::recording::Recording;

pub const RECORDINGS_FILE_NAME: &str = "recordings.msgpack.zst";
pub const BACKUP_FILE_NAME: &str = "_recordings.msgpack.zst.backup";

/// Format version written by this crate.
pub const ONDA_FORMAT_VERSION: Version = Version::new(0, 3, 0);

/// Older `(major, minor)` versions read with a warning but never rejected.
const COMPATIBLE_OLDER_VERSIONS: [(u64, u64); 1] = [(0, 2)];

/// First byte of a 2-element MessagePack fixarray.
const CONTAINER_MARKER: u8 = 0x92;

pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub onda_format_version: Version,
    /// When set, every recording record must list its fields in declared order.
    pub ordered_keys: bool,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            onda_format_version: ONDA_FORMAT_VERSION,
            ordered_keys: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionCompatibility {
    Supported,
    OlderCompatible,
    Incompatible,
}

pub fn version_compatibility(version: &Version) -> VersionCompatibility {
    let same_series = version.major == ONDA_FORMAT_VERSION.major
        && (version.major != 0 || version.minor == ONDA_FORMAT_VERSION.minor);
    if same_series {
        VersionCompatibility::Supported
    } else if COMPATIBLE_OLDER_VERSIONS.contains(&(version.major, version.minor)) {
        VersionCompatibility::OlderCompatible
    } else {
        VersionCompatibility::Incompatible
    }
}

/// Advisory conditions found while reading; decoding continued regardless.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatWarning {
    VersionMismatch {
        supported: Version,
        found: Version,
        compatibility: VersionCompatibility,
    },
}

impl fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatWarning::VersionMismatch {
                supported,
                found,
                compatibility,
            } => match compatibility {
                VersionCompatibility::OlderCompatible => write!(
                    f,
                    "recordings file uses older Onda format v{} (supported: v{})",
                    found, supported
                ),
                _ => write!(
                    f,
                    "recordings file uses unsupported Onda format v{} (supported: v{}); attempting to read anyway",
                    found, supported
                ),
            },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Strict entity kinds added on top of those implied by the header.
    pub extra_strict: StrictTypes,
    /// Fail with `Error::IncompatibleVersion` instead of warning.
    pub reject_incompatible_versions: bool,
}

#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub compression_level: i32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Everything read from a container.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<C> {
    pub header: Header,
    pub recordings: BTreeMap<Uuid, Recording<C>>,
    pub warnings: Vec<FormatWarning>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No backup was present.
    Clean,
    /// The backup replaced the recordings file.
    Restored,
}

pub fn recordings_file_path(root: &Path) -> PathBuf {
    root.join(RECORDINGS_FILE_NAME)
}

pub fn backup_file_path(root: &Path) -> PathBuf {
    root.join(BACKUP_FILE_NAME)
}

/// Encodes `[header, recordings]` and compresses it as a single zstd block.
pub fn serialize_recordings<C: Serialize + DeserializeOwned>(
    header: &Header,
    recordings: &BTreeMap<Uuid, Recording<C>>,
    compression_level: i32,
) -> Result<Vec<u8>> {
    let container = Value::Array(vec![header.to_value()?, recordings_to_value(recordings)?]);
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &container).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(zstd::encode_all(buf.as_slice(), compression_level)?)
}

pub fn deserialize_recordings<C: Serialize + DeserializeOwned>(
    bytes: &[u8],
    options: &ReadOptions,
) -> Result<Decoded<C>> {
    let raw = zstd::decode_all(bytes)
        .map_err(|e| Error::MalformedContainer(format!("zstd decompression failed: {}", e)))?;
    match raw.first() {
        Some(&CONTAINER_MARKER) => {}
        Some(b) => {
            return Err(Error::MalformedContainer(format!(
                "unexpected first byte 0x{:02x}; expected 0x{:02x} for a 2-element MessagePack array",
                b, CONTAINER_MARKER
            )))
        }
        None => return Err(Error::MalformedContainer("container is empty".into())),
    }
    let mut body = &raw[1..];

    let header_value = read_element(&mut body, "header")?;
    let header = Header::from_value(
        &header_value,
        &DecodeConfig::strict(StrictTypes::none().with(EntityKind::Header)),
    )?;

    let mut warnings = Vec::new();
    let compatibility = version_compatibility(&header.onda_format_version);
    if compatibility != VersionCompatibility::Supported {
        if compatibility == VersionCompatibility::Incompatible && options.reject_incompatible_versions {
            return Err(Error::IncompatibleVersion {
                supported: ONDA_FORMAT_VERSION,
                found: header.onda_format_version,
            });
        }
        let warning = FormatWarning::VersionMismatch {
            supported: ONDA_FORMAT_VERSION,
            found: header.onda_format_version.clone(),
            compatibility,
        };
        tracing::warn!("{}", warning);
        warnings.push(warning);
    }

    let mut strict = options.extra_strict.clone();
    if header.ordered_keys {
        strict = strict.with(EntityKind::Recording);
    }
    let recordings_value = read_element(&mut body, "recordings")?;
    let recordings = recordings_from_value(&recordings_value, &DecodeConfig::strict(strict))?;

    Ok(Decoded {
        header,
        recordings,
        warnings,
    })
}

fn read_element(body: &mut &[u8], what: &str) -> Result<Value> {
    rmpv::decode::read_value(body)
        .map_err(|e| Error::MalformedContainer(format!("failed to read {}: {}", what, e)))
}

/// Reads and decodes the container in `root`, keeping any warnings.
pub fn read_container<C: Serialize + DeserializeOwned>(root: &Path, options: &ReadOptions) -> Result<Decoded<C>> {
    let path = recordings_file_path(root);
    if !path.is_file() {
        return Err(Error::FileNotFound(path));
    }
    let bytes = fs::read(&path)?;
    let decoded = deserialize_recordings(&bytes, options)?;
    tracing::info!(
        "read {} recordings from {} (format v{})",
        decoded.recordings.len(),
        path.display(),
        decoded.header.onda_format_version
    );
    Ok(decoded)
}

pub fn read_recordings_file<C: Serialize + DeserializeOwned>(
    root: &Path,
    options: &ReadOptions,
) -> Result<(Header, BTreeMap<Uuid, Recording<C>>)> {
    let decoded = read_container(root, options)?;
    Ok((decoded.header, decoded.recordings))
}

/// Writes the container in `root`, moving any existing file aside first.
///
/// If this fails, `_recordings.msgpack.zst.backup` still holds the previous
/// container; see [`recover_interrupted_write`]. Fails with
/// [`Error::StaleBackup`] while such a backup is present.
pub fn write_recordings_file<C: Serialize + DeserializeOwned>(
    root: &Path,
    header: &Header,
    recordings: &BTreeMap<Uuid, Recording<C>>,
    options: &WriteOptions,
) -> Result<()> {
    write_with_backup(root, || {
        serialize_recordings(header, recordings, options.compression_level)
    })?;
    tracing::info!(
        "wrote {} recordings to {}",
        recordings.len(),
        recordings_file_path(root).display()
    );
    Ok(())
}

fn write_with_backup(root: &Path, produce: impl FnOnce() -> Result<Vec<u8>>) -> Result<()> {
    let path = recordings_file_path(root);
    let backup = backup_file_path(root);

    // the backup may be the only intact copy of the previous container
    if backup.exists() {
        return Err(Error::StaleBackup(backup));
    }
    if path.exists() {
        fs::rename(&path, &backup)?;
        tracing::debug!("moved {} to {}", path.display(), backup.display());
    }

    let bytes = produce()?;

    let mut f = fs::File::create(&path)?;
    f.write_all(&bytes)?;
    f.sync_all()?;

    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    Ok(())
}

pub fn has_interrupted_write(root: &Path) -> bool {
    backup_file_path(root).is_file()
}

/// Restores the backup left by an interrupted write over the (possibly
/// partial) recordings file.
pub fn recover_interrupted_write(root: &Path) -> Result<RecoveryOutcome> {
    let backup = backup_file_path(root);
    if !backup.is_file() {
        return Ok(RecoveryOutcome::Clean);
    }
    let path = recordings_file_path(root);
    fs::rename(&backup, &path)?;
    tracing::warn!("restored {} from {}", path.display(), backup.display());
    Ok(RecoveryOutcome::Restored)
}

/// SHA-256 of the compressed recordings file, as lowercase hex.
pub fn container_checksum(root: &Path) -> Result<String> {
    let path = recordings_file_path(root);
    if !path.is_file() {
        return Err(Error::FileNotFound(path));
    }
    let data = fs::read(&path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}
