use std::collections::BTreeMap;

use rmpv::Value;

use crate::scalar::{Nanoseconds, SampleType};

/// Metadata describing one multi-channel sampled stream.
///
/// The samples themselves live in a separate file named by
/// [`Signal::file_name`]; this type only describes how to read them.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    /// Channel names in channel order. Channel `i` (1-based) is `channel_names[i - 1]`.
    pub channel_names: Vec<String>,
    pub sample_unit: String,
    pub sample_resolution_in_unit: f64,
    pub sample_type: SampleType,
    /// Samples per second.
    pub sample_rate: u64,
    pub file_extension: String,
    pub file_options: Option<BTreeMap<String, Value>>,
}

/// Field overrides for [`Signal::from_template`]. `None` keeps the template's value.
#[derive(Clone, Debug, Default)]
pub struct SignalOverrides {
    pub channel_names: Option<Vec<String>>,
    pub sample_unit: Option<String>,
    pub sample_resolution_in_unit: Option<f64>,
    pub sample_type: Option<SampleType>,
    pub sample_rate: Option<u64>,
    pub file_extension: Option<String>,
    pub file_options: Option<Option<BTreeMap<String, Value>>>,
}

impl Signal {
    /// Builds a new signal from `self`, replacing only the overridden fields.
    pub fn from_template(&self, overrides: SignalOverrides) -> Signal {
        Signal {
            channel_names: overrides
                .channel_names
                .unwrap_or_else(|| self.channel_names.clone()),
            sample_unit: overrides
                .sample_unit
                .unwrap_or_else(|| self.sample_unit.clone()),
            sample_resolution_in_unit: overrides
                .sample_resolution_in_unit
                .unwrap_or(self.sample_resolution_in_unit),
            sample_type: overrides.sample_type.unwrap_or(self.sample_type),
            sample_rate: overrides.sample_rate.unwrap_or(self.sample_rate),
            file_extension: overrides
                .file_extension
                .unwrap_or_else(|| self.file_extension.clone()),
            file_options: overrides
                .file_options
                .unwrap_or_else(|| self.file_options.clone()),
        }
    }

    /// Checks the naming rules of the format.
    ///
    /// Decoding never calls this; a well-formed record with a badly cased
    /// unit still decodes.
    pub fn is_valid(&self) -> bool {
        is_lower_snake_case_alphanumeric(&self.sample_unit, &[])
            && self
                .channel_names
                .iter()
                .all(|name| is_lower_snake_case_alphanumeric(name, &['-', '.']))
            && SampleType::ALL.contains(&self.sample_type)
    }

    pub fn channel_count(&self) -> usize {
        self.channel_names.len()
    }

    /// 1-based index of the named channel.
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names
            .iter()
            .position(|c| c == name)
            .map(|i| i + 1)
    }

    /// Name of the channel at the 1-based `index`.
    pub fn channel_name(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.channel_names.get(i))
            .map(String::as_str)
    }

    /// Number of whole samples per channel covering `duration`.
    pub fn sample_count(&self, duration: Nanoseconds) -> u64 {
        let count = u128::from(duration.0) * u128::from(self.sample_rate) / 1_000_000_000;
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Size in bytes of all channels' samples covering `duration`.
    pub fn size_of_samples(&self, duration: Nanoseconds) -> u64 {
        self.sample_count(duration)
            .saturating_mul(self.channel_count() as u64)
            .saturating_mul(self.sample_type.size_in_bytes() as u64)
    }

    /// File name of the samples for the signal stored under `name`.
    pub fn file_name(&self, name: &str) -> String {
        format!("{}.{}", name, self.file_extension)
    }
}

/// `true` for lowercase snake case made of `a-z`, `0-9` and `_` (plus
/// `also_allow`), with no leading or trailing underscore.
pub fn is_lower_snake_case_alphanumeric(s: &str, also_allow: &[char]) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && s.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || also_allow.contains(&c)
        })
}

#[cfg(test)]
pub(crate) fn eeg_signal() -> Signal {
    Signal {
        channel_names: vec!["fp1".into(), "f3".into(), "c3-ref".into(), "o1.a".into()],
        sample_unit: "microvolt".into(),
        sample_resolution_in_unit: 0.25,
        sample_type: SampleType::Int16,
        sample_rate: 256,
        file_extension: "lpcm.zst".into(),
        file_options: Some(BTreeMap::from([("level".to_string(), Value::from(3))])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_signal() {
        assert!(eeg_signal().is_valid());
    }

    #[test]
    fn test_sample_unit_rules() {
        let signal = eeg_signal();
        for unit in ["microVolt", "micro volt", "micro-volt", "_microvolt", "microvolt_", "µv"] {
            let bad = signal.from_template(SignalOverrides {
                sample_unit: Some(unit.into()),
                ..Default::default()
            });
            assert!(!bad.is_valid(), "{unit} should be invalid");
        }
        let good = signal.from_template(SignalOverrides {
            sample_unit: Some("micro_volt_2".into()),
            ..Default::default()
        });
        assert!(good.is_valid());
    }

    #[test]
    fn test_channel_name_rules() {
        let signal = eeg_signal();
        let bad = signal.from_template(SignalOverrides {
            channel_names: Some(vec!["fp1".into(), "F3".into()]),
            ..Default::default()
        });
        assert!(!bad.is_valid());
        let bad = signal.from_template(SignalOverrides {
            channel_names: Some(vec!["a/b".into()]),
            ..Default::default()
        });
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_from_template_keeps_other_fields() {
        let signal = eeg_signal();
        let copy = signal.from_template(SignalOverrides {
            sample_rate: Some(512),
            file_options: Some(None),
            ..Default::default()
        });
        assert_eq!(copy.sample_rate, 512);
        assert_eq!(copy.file_options, None);
        assert_eq!(copy.channel_names, signal.channel_names);
        assert_eq!(copy.sample_type, signal.sample_type);
        assert_eq!(signal.from_template(SignalOverrides::default()), signal);
    }

    #[test]
    fn test_channel_lookup_is_one_based() {
        let signal = eeg_signal();
        assert_eq!(signal.channel_count(), 4);
        assert_eq!(signal.channel_index("fp1"), Some(1));
        assert_eq!(signal.channel_index("o1.a"), Some(4));
        assert_eq!(signal.channel_index("cz"), None);
        assert_eq!(signal.channel_name(1), Some("fp1"));
        assert_eq!(signal.channel_name(0), None);
        assert_eq!(signal.channel_name(5), None);
    }

    #[test]
    fn test_sample_sizes() {
        let signal = eeg_signal();
        assert_eq!(signal.sample_count(Nanoseconds::from_secs(10)), 2560);
        assert_eq!(signal.sample_count(Nanoseconds(1_000_000)), 0);
        assert_eq!(signal.size_of_samples(Nanoseconds::from_secs(1)), 256 * 4 * 2);
        assert_eq!(signal.file_name("eeg"), "eeg.lpcm.zst");
    }
}
