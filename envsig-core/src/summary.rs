//! Summary statistics over a result set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Severity, SignalKind, SignalPoint};

/// Counts by severity, kind and source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_kind: BTreeMap<SignalKind, usize>,
    pub by_source: BTreeMap<String, usize>,
}

impl Summary {
    /// Pure reduction over a list of points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a SignalPoint>) -> Self {
        let mut summary = Summary::default();

        for point in points {
            summary.total += 1;
            *summary.by_severity.entry(point.severity).or_default() += 1;
            *summary.by_kind.entry(point.kind).or_default() += 1;
            *summary.by_source.entry(point.source.clone()).or_default() += 1;
        }

        summary
    }

    pub fn severity(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }

    pub fn kind(&self, kind: SignalKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn source(&self, source: &str) -> usize {
        self.by_source.get(source).copied().unwrap_or(0)
    }

    /// Highest tier present, if any
    pub fn worst(&self) -> Option<Severity> {
        self.by_severity
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&severity, _)| severity)
            .max()
    }
}
