//! Reading and writing Onda recordings files.
//!
//! A dataset directory holds one `recordings.msgpack.zst`: a zstd-compressed
//! MessagePack array `[header, recordings]` describing annotated,
//! multi-channel signals grouped into recordings. Sample data lives in
//! separate files and is not handled here.

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod record;
pub mod recording;
pub mod scalar;
pub mod signal;
pub mod storage;
pub mod utils;

pub use annotation::Annotation;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use record::{DecodeConfig, EntityKind, Record, StrictTypes};
pub use recording::Recording;
pub use scalar::{Nanoseconds, SampleType, Scalar};
pub use signal::{Signal, SignalOverrides};
pub use storage::{
    read_recordings_file, recover_interrupted_write, write_recordings_file, FormatWarning, Header, ReadOptions,
    RecoveryOutcome, WriteOptions, ONDA_FORMAT_VERSION,
};
