use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// The operation a benchmark file measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Churn,
    Grow,
    Probe,
    Overwrite,
}

impl TestKind {
    pub const ALL: [TestKind; 4] = [
        TestKind::Churn,
        TestKind::Grow,
        TestKind::Probe,
        TestKind::Overwrite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Churn => "churn",
            TestKind::Grow => "grow",
            TestKind::Probe => "probe",
            TestKind::Overwrite => "overwrite",
        }
    }

    /// Names of the two compared series, a then b.
    pub fn default_series_names(&self) -> (&'static str, &'static str) {
        match self {
            TestKind::Churn | TestKind::Grow | TestKind::Overwrite => ("probes", "writes"),
            TestKind::Probe => ("present", "absent"),
        }
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown test kind {s}"))
    }
}

impl Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `(test_kind, map_kind)` derived from a benchmark file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunLabel {
    pub test_kind: String,
    pub map_kind: String,
}

impl RunLabel {
    /// Classifies `churn_robinhood.csv` as `("churn", "robinhood")`.
    ///
    /// Everything from the first `.` is dropped, the rest is split on `_`
    /// and the first two segments are taken. Further segments are ignored.
    pub fn classify(file_name: &str) -> Result<Self, DatasetError> {
        let stem = file_name.split('.').next().unwrap_or_default();
        let mut parts = stem.split('_');
        match (parts.next(), parts.next()) {
            (Some(test), Some(map)) if !test.is_empty() && !map.is_empty() => Ok(RunLabel {
                test_kind: test.to_owned(),
                map_kind: map.to_owned(),
            }),
            _ => Err(DatasetError::FileName {
                name: file_name.to_owned(),
            }),
        }
    }

    pub fn kind(&self) -> Option<TestKind> {
        self.test_kind.parse().ok()
    }
}

impl Display for RunLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.test_kind, self.map_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_test_and_map_kind() {
        let label = RunLabel::classify("churn_robinhood.csv").unwrap();
        assert_eq!(label.test_kind, "churn");
        assert_eq!(label.map_kind, "robinhood");
        assert_eq!(label.kind(), Some(TestKind::Churn));
    }

    #[test]
    fn ignores_extra_segments_and_extensions() {
        let label = RunLabel::classify("probe_cuckoo_1000000.run2.csv").unwrap();
        assert_eq!(label.test_kind, "probe");
        assert_eq!(label.map_kind, "cuckoo");
    }

    #[test]
    fn rejects_single_segment() {
        assert!(matches!(
            RunLabel::classify("churn.csv"),
            Err(DatasetError::FileName { .. })
        ));
        assert!(RunLabel::classify("churn_.csv").is_err());
        assert!(RunLabel::classify("").is_err());
    }

    #[test]
    fn unknown_test_kind_has_no_kind() {
        let label = RunLabel::classify("resize_robinhood.csv").unwrap();
        assert_eq!(label.kind(), None);
    }

    #[test]
    fn series_names() {
        assert_eq!(TestKind::Probe.default_series_names(), ("present", "absent"));
        assert_eq!(TestKind::Overwrite.default_series_names(), ("probes", "writes"));
        assert_eq!("grow".parse::<TestKind>(), Ok(TestKind::Grow));
    }
}
