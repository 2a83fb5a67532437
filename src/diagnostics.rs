use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::recording::Recording;
use crate::signal::{is_lower_snake_case_alphanumeric, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidSignal,
    AnnotationOutOfBounds,
}

/// A semantic problem found in otherwise well-formed recordings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub recording: Uuid,
    pub kind: IssueKind,
    pub detail: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.recording, self.detail)
    }
}

/// Runs the domain checks decoding skips: signal naming rules and
/// annotations ending past the recording's duration.
pub fn validate_recordings<C>(recordings: &BTreeMap<Uuid, Recording<C>>) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (id, recording) in recordings {
        for (name, signal) in &recording.signals {
            if !signal.is_valid() {
                issues.push(Issue {
                    recording: *id,
                    kind: IssueKind::InvalidSignal,
                    detail: format!("signal `{}`: {}", name, signal_problems(signal).join("; ")),
                });
            }
        }
        for annotation in &recording.annotations {
            if annotation.stop() > recording.duration() {
                issues.push(Issue {
                    recording: *id,
                    kind: IssueKind::AnnotationOutOfBounds,
                    detail: format!(
                        "annotation `{}` ends at {} past recording duration {}",
                        annotation.key(),
                        annotation.stop(),
                        recording.duration()
                    ),
                });
            }
        }
    }
    tracing::debug!("validated {} recordings, {} issues", recordings.len(), issues.len());
    issues
}

fn signal_problems(signal: &Signal) -> Vec<String> {
    let mut problems = Vec::new();
    if !is_lower_snake_case_alphanumeric(&signal.sample_unit, &[]) {
        problems.push(format!("sample_unit `{}` is not lower snake case", signal.sample_unit));
    }
    for channel in &signal.channel_names {
        if !is_lower_snake_case_alphanumeric(channel, &['-', '.']) {
            problems.push(format!("channel name `{}` is not lower snake case", channel));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::scalar::Nanoseconds;
    use crate::signal::{eeg_signal, SignalOverrides};
    use std::collections::BTreeSet;

    #[test]
    fn test_clean_recordings() {
        let recording = Recording::new(
            Nanoseconds::from_secs(10),
            BTreeMap::from([("eeg".to_string(), eeg_signal())]),
            BTreeSet::new(),
            (),
        );
        assert!(validate_recordings(&BTreeMap::from([(Uuid::new_v4(), recording)])).is_empty());
    }

    #[test]
    fn test_reports_signal_and_annotation_issues() {
        let bad_signal = eeg_signal().from_template(SignalOverrides {
            sample_unit: Some("uV".into()),
            channel_names: Some(vec!["Fp1".into(), "f3".into()]),
            ..Default::default()
        });
        let mut recording = Recording::new(
            Nanoseconds::from_secs(10),
            BTreeMap::from([("eeg".to_string(), bad_signal)]),
            BTreeSet::new(),
            (),
        );
        recording.annotate(Annotation::new("late", "", Nanoseconds::from_secs(9), Nanoseconds::from_secs(11)).unwrap());
        let id = Uuid::new_v4();

        let issues = validate_recordings(&BTreeMap::from([(id, recording)]));
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::InvalidSignal);
        assert!(issues[0].detail.contains("`uV`"));
        assert!(issues[0].detail.contains("`Fp1`"));
        assert!(!issues[0].detail.contains("`f3`"));
        assert_eq!(issues[1].kind, IssueKind::AnnotationOutOfBounds);
        assert!(issues[1].to_string().starts_with(&id.to_string()));
    }
}
