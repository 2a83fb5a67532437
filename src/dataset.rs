use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::recording::Recording;
use crate::storage::{
    has_interrupted_write, read_container, recordings_file_path, write_recordings_file, FormatWarning, Header,
    ReadOptions, WriteOptions,
};

/// A dataset directory and its recordings, held in memory between `open` and `save`.
#[derive(Clone, Debug)]
pub struct Dataset<C = ()> {
    root: PathBuf,
    pub header: Header,
    pub recordings: BTreeMap<Uuid, Recording<C>>,
    warnings: Vec<FormatWarning>,
}

impl<C: Serialize + DeserializeOwned> Dataset<C> {
    /// Creates `root` with an empty recordings file. Fails if one already exists.
    pub fn create(root: impl Into<PathBuf>, header: Header, options: &WriteOptions) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let path = recordings_file_path(&root);
        if path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )
            .into());
        }
        let dataset = Dataset {
            root,
            header,
            recordings: BTreeMap::new(),
            warnings: Vec::new(),
        };
        dataset.save(options)?;
        tracing::info!("created dataset at {}", dataset.root.display());
        Ok(dataset)
    }

    pub fn open(root: impl Into<PathBuf>, options: &ReadOptions) -> Result<Self> {
        let root = root.into();
        if has_interrupted_write(&root) {
            tracing::warn!(
                "{} has a backup left by an interrupted write; run recovery to restore it",
                root.display()
            );
        }
        let decoded = read_container(&root, options)?;
        Ok(Dataset {
            root,
            header: decoded.header,
            recordings: decoded.recordings,
            warnings: decoded.warnings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Warnings raised when the dataset was opened.
    pub fn warnings(&self) -> &[FormatWarning] {
        &self.warnings
    }

    /// Adds `recording` under a fresh random id.
    pub fn create_recording(&mut self, recording: Recording<C>) -> Uuid {
        let id = Uuid::new_v4();
        self.recordings.insert(id, recording);
        tracing::debug!("created recording {}", id);
        id
    }

    pub fn save(&self, options: &WriteOptions) -> Result<()> {
        write_recordings_file(&self.root, &self.header, &self.recordings, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::error::Error;
    use crate::scalar::Nanoseconds;
    use crate::signal::eeg_signal;
    use crate::storage::backup_file_path;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn new_recording() -> Recording<()> {
        Recording::new(
            Nanoseconds::from_secs(90),
            BTreeMap::from([("eeg".to_string(), eeg_signal())]),
            BTreeSet::new(),
            (),
        )
    }

    #[test]
    fn test_create_save_and_open() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let root = tmpdir.path().join("study");

        let mut dataset = Dataset::<()>::create(&root, Header::default(), &WriteOptions::default())?;
        assert!(dataset.recordings.is_empty());

        let id = dataset.create_recording(new_recording());
        let recording = dataset.recordings.get_mut(&id).unwrap();
        recording.annotate(Annotation::new("event", "arousal", Nanoseconds(5), Nanoseconds(9))?);
        dataset.save(&WriteOptions::default())?;

        let reopened = Dataset::<()>::open(&root, &ReadOptions::default())?;
        assert_eq!(reopened.recordings, dataset.recordings);
        assert_eq!(reopened.header, Header::default());
        assert!(reopened.warnings().is_empty());
        Ok(())
    }

    #[test]
    fn test_create_refuses_existing_dataset() -> Result<()> {
        let tmpdir = TempDir::new()?;
        Dataset::<()>::create(tmpdir.path(), Header::default(), &WriteOptions::default())?;
        let err = Dataset::<()>::create(tmpdir.path(), Header::default(), &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == std::io::ErrorKind::AlreadyExists));
        Ok(())
    }

    #[test]
    fn test_open_with_stale_backup() -> Result<()> {
        let tmpdir = TempDir::new()?;
        let dataset = Dataset::<()>::create(tmpdir.path(), Header::default(), &WriteOptions::default())?;
        fs::copy(recordings_file_path(tmpdir.path()), backup_file_path(tmpdir.path()))?;

        let reopened = Dataset::<()>::open(tmpdir.path(), &ReadOptions::default())?;
        assert_eq!(reopened.recordings, dataset.recordings);
        assert!(has_interrupted_write(tmpdir.path()));

        let err = reopened.save(&WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::StaleBackup(_)));
        assert!(has_interrupted_write(tmpdir.path()));
        Ok(())
    }
}
