use std::collections::{BTreeMap, BTreeSet};

use crate::annotation::Annotation;
use crate::scalar::Nanoseconds;
use crate::signal::Signal;

/// One subject/session: its duration, named signals, annotations and a
/// caller-defined `custom` payload the codec carries without inspecting.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording<C = ()> {
    pub duration_in_nanoseconds: Nanoseconds,
    pub signals: BTreeMap<String, Signal>,
    pub annotations: BTreeSet<Annotation>,
    pub custom: C,
}

impl<C> Recording<C> {
    pub fn new(
        duration: Nanoseconds,
        signals: BTreeMap<String, Signal>,
        annotations: BTreeSet<Annotation>,
        custom: C,
    ) -> Self {
        Recording {
            duration_in_nanoseconds: duration,
            signals,
            annotations,
            custom,
        }
    }

    pub fn duration(&self) -> Nanoseconds {
        self.duration_in_nanoseconds
    }

    /// Adds `annotation`; returns `false` if an equal one was already present.
    pub fn annotate(&mut self, annotation: Annotation) -> bool {
        self.annotations.insert(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::eeg_signal;

    #[test]
    fn test_annotate_is_idempotent() {
        let mut recording = Recording::new(
            Nanoseconds::from_secs(60),
            BTreeMap::from([("eeg".to_string(), eeg_signal())]),
            BTreeSet::new(),
            (),
        );
        let a = Annotation::new("stage", "n1", Nanoseconds(0), Nanoseconds(30)).unwrap();
        assert!(recording.annotate(a.clone()));
        assert!(!recording.annotate(a));
        assert_eq!(recording.annotations.len(), 1);
        assert_eq!(recording.duration(), Nanoseconds::from_secs(60));
    }

    #[test]
    fn test_equality_covers_custom() {
        let a = Recording::new(Nanoseconds(1), BTreeMap::new(), BTreeSet::new(), 1u8);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.custom = 2;
        assert_ne!(a, b);
    }
}
