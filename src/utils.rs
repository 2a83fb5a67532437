use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recording::Recording;
use crate::storage::Header;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalManifestEntry {
    pub name: String,
    pub sample_type: String,
    pub sample_rate: u64,
    pub channel_count: usize,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub recording_id: Uuid,
    pub duration_ns: u64,
    pub signals: Vec<SignalManifestEntry>,
    pub annotation_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub onda_format_version: String,
    pub ordered_keys: bool,
    pub checksum: Option<String>,
    pub recordings: Vec<RecordingSummary>,
}

impl RecordingSummary {
    pub fn new<C>(recording_id: Uuid, recording: &Recording<C>) -> Self {
        let signals = recording
            .signals
            .iter()
            .map(|(name, signal)| SignalManifestEntry {
                name: name.clone(),
                sample_type: signal.sample_type.to_string(),
                sample_rate: signal.sample_rate,
                channel_count: signal.channel_count(),
                file_name: signal.file_name(name),
            })
            .collect();
        RecordingSummary {
            recording_id,
            duration_ns: recording.duration().0,
            signals,
            annotation_count: recording.annotations.len(),
        }
    }
}

impl DatasetSummary {
    pub fn new<'a, C: 'a>(
        header: &Header,
        recordings: impl IntoIterator<Item = (&'a Uuid, &'a Recording<C>)>,
        checksum: Option<String>,
    ) -> Self {
        DatasetSummary {
            onda_format_version: format!("v{}", header.onda_format_version),
            ordered_keys: header.ordered_keys,
            checksum,
            recordings: recordings
                .into_iter()
                .map(|(id, recording)| RecordingSummary::new(*id, recording))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Nanoseconds;
    use crate::signal::eeg_signal;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn test_summary_json() {
        let id = Uuid::new_v4();
        let recordings = BTreeMap::from([(
            id,
            Recording::new(
                Nanoseconds::from_secs(1),
                BTreeMap::from([("eeg".to_string(), eeg_signal())]),
                BTreeSet::new(),
                (),
            ),
        )]);
        let summary = DatasetSummary::new(&Header::default(), &recordings, None);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["onda_format_version"], "v0.3.0");
        assert_eq!(json["recordings"][0]["recording_id"], id.to_string());
        assert_eq!(json["recordings"][0]["signals"][0]["file_name"], "eeg.lpcm.zst");
        assert_eq!(json["recordings"][0]["signals"][0]["channel_count"], 4);
    }
}
