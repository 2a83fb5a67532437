use crate::error::{Error, Result};
use crate::scalar::Nanoseconds;

/// A keyed, valued label spanning `[start, stop]` of a recording.
///
/// The span is checked on construction, so every `Annotation` in memory
/// satisfies `start <= stop`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Annotation {
    key: String,
    value: String,
    start_nanosecond: Nanoseconds,
    stop_nanosecond: Nanoseconds,
}

impl Annotation {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        start: Nanoseconds,
        stop: Nanoseconds,
    ) -> Result<Self> {
        if start > stop {
            return Err(Error::InvalidAnnotationSpan { start, stop });
        }
        Ok(Annotation {
            key: key.into(),
            value: value.into(),
            start_nanosecond: start,
            stop_nanosecond: stop,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn start(&self) -> Nanoseconds {
        self.start_nanosecond
    }

    pub fn stop(&self) -> Nanoseconds {
        self.stop_nanosecond
    }

    pub fn span(&self) -> Nanoseconds {
        Nanoseconds(self.stop_nanosecond.0 - self.start_nanosecond.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_annotation_accessors() {
        let a = Annotation::new("stage", "rem", Nanoseconds(10), Nanoseconds(30)).unwrap();
        assert_eq!(a.key(), "stage");
        assert_eq!(a.value(), "rem");
        assert_eq!(a.span(), Nanoseconds(20));
    }

    #[test]
    fn test_zero_length_span_allowed() {
        let a = Annotation::new("marker", "", Nanoseconds(7), Nanoseconds(7)).unwrap();
        assert_eq!(a.span(), Nanoseconds(0));
    }

    #[test]
    fn test_duplicates_collapse_in_set() {
        let a = Annotation::new("k", "v", Nanoseconds(0), Nanoseconds(1)).unwrap();
        let mut set = BTreeSet::new();
        assert!(set.insert(a.clone()));
        assert!(!set.insert(a));
        assert_eq!(set.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_reversed_span_always_fails(start in 1u64..u64::MAX, delta in 1u64..1_000_000) {
            let stop = start.saturating_sub(delta);
            let err = Annotation::new("k", "v", Nanoseconds(start), Nanoseconds(stop)).unwrap_err();
            let is_span_error = matches!(err, Error::InvalidAnnotationSpan { .. });
            prop_assert!(is_span_error);
        }

        #[test]
        fn prop_ordered_span_always_succeeds(start in 0u64..u64::MAX / 2, len in 0u64..u64::MAX / 2) {
            let a = Annotation::new("k", "v", Nanoseconds(start), Nanoseconds(start + len));
            prop_assert!(a.is_ok());
        }
    }
}
