use serde::{Serialize, Deserialize};
use std::fmt;

/// Population counts of the world at a specific step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    /// Number of steps completed when the snapshot was taken.
    pub step: u64,
    pub free_particles: usize,
    pub clusters: usize,
    /// Sum of all cluster sizes.
    pub clustered_particles: usize,
    /// Size of the largest cluster, 0 when there is none.
    pub largest_cluster: usize,
}

/// A single value produced by a cluster metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(usize),
    Scalar(f32),
    Series(Vec<f32>),
    Histogram(Vec<u32>),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Scalar(x) => write!(f, "{x}"),
            MetricValue::Series(xs) => write_braced(f, xs),
            MetricValue::Histogram(bins) => write_braced(f, bins),
        }
    }
}

fn write_braced<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "{{ ")?;
    for (n, item) in items.iter().enumerate() {
        if n > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, " }}")
}

/// Statistics for one cluster at one visited step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    /// Visit counter of the statistics visitor, starting at 1.
    pub step: u64,
    /// Index of the cluster in the world's cluster collection at that step.
    pub cluster: usize,
    pub values: Vec<MetricValue>,
}
