//! Per-cluster statistics computed in a single traversal of the world.
//!
//! A [`StatisticsVisitor`] runs an ordered list of independent
//! [`ClusterMetric`]s over every cluster and keeps one [`StatisticsRow`] per
//! cluster and visit. Several metrics rely on the members being stored in
//! absorption order.

use crate::cluster::Cluster;
use crate::error::EngineError;
use crate::visitor::Visitor;
use crate::world::World;
use aggregation_common::{unit_ball_volume, FloatVec, MetricKind, MetricValue, Position, StatisticsConfig, StatisticsRow};
use anyhow::Result;
use std::io::Write;

/// One independent measurement over a cluster, possibly spanning several columns.
pub trait ClusterMetric<const D: usize> {
    fn headers(&self) -> Vec<String>;
    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError>;
}

/// Number of members.
pub struct Particles;

impl<const D: usize> ClusterMetric<D> for Particles {
    fn headers(&self) -> Vec<String> {
        vec!["particles".into()]
    }

    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError> {
        Ok(vec![MetricValue::Count(cluster.size())])
    }
}

/// Average number of occupied nearest-neighbour sites per member.
pub struct CoordinationNumber;

impl<const D: usize> ClusterMetric<D> for CoordinationNumber {
    fn headers(&self) -> Vec<String> {
        vec!["avg. coord. no.".into()]
    }

    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError> {
        if cluster.is_empty() {
            return Err(EngineError::EmptyCluster);
        }
        let coord: usize = cluster
            .positions()
            .map(|site| site.neighbours().filter(|&n| cluster.has_particle_at(n)).count())
            .sum();
        Ok(vec![MetricValue::Scalar(coord as f32 / cluster.size() as f32)])
    }
}

/// Root-mean-square distance of all members from the centre of mass of the
/// youngest `percent` per cent.
pub struct RadiusOfGyration {
    pub percent: u32,
}

impl<const D: usize> ClusterMetric<D> for RadiusOfGyration {
    fn headers(&self) -> Vec<String> {
        vec![format!("radius of gyration ({}%)", self.percent)]
    }

    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError> {
        let size = cluster.size();
        if size == 0 {
            return Err(EngineError::EmptyCluster);
        }
        let percent = self.percent.clamp(1, 100) as usize;
        let start = size * (100 - percent) / 100;
        let window = &cluster.particles()[start..];
        let center = window
            .iter()
            .fold(FloatVec::<D>::zero(), |acc, p| acc + p.position.to_float())
            / window.len() as f32;

        let sum: f32 = cluster
            .particles()
            .iter()
            .map(|p| (p.position.to_float() - center).length_squared())
            .sum();
        Ok(vec![MetricValue::Scalar((sum / size as f32).sqrt())])
    }
}

/// Members per unit volume in `bins` concentric shells reaching out to the
/// bounding radius.
pub struct Density {
    pub bins: usize,
}

impl<const D: usize> ClusterMetric<D> for Density {
    fn headers(&self) -> Vec<String> {
        vec!["density".into()]
    }

    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError> {
        let center = cluster.center()?;
        let radius = cluster.radius()?;
        let bins = self.bins.max(1);
        let step = radius / bins as f32;
        let distances: Vec<f32> = cluster.positions().map(|p| p.to_float().distance(&center)).collect();

        let unit = unit_ball_volume(D);
        let series = (0..bins)
            .map(|d| {
                let (dmin, dmax) = (step * d as f32, step * (d + 1) as f32);
                let last = d + 1 == bins;
                // The outermost shell is closed so the farthest member counts.
                let count = distances
                    .iter()
                    .filter(|&&r| r >= dmin && (r < dmax || (last && r <= dmax)))
                    .count();
                let volume = unit * (dmax.powi(D as i32) - dmin.powi(D as i32));
                if volume > 0.0 {
                    count as f32 / volume
                } else {
                    0.0
                }
            })
            .collect();
        Ok(vec![MetricValue::Series(series)])
    }
}

/// Fraction of members that see another member at lattice distance `d`
/// along an axis, for `d` from 0 up to the cluster diameter.
pub struct DensityCorrelation;

impl<const D: usize> ClusterMetric<D> for DensityCorrelation {
    fn headers(&self) -> Vec<String> {
        vec!["density density correlation".into()]
    }

    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError> {
        let radius = cluster.radius()?;
        let span = ((2.0 * radius).ceil() as usize).max(1);
        let norm = (Position::<D>::direction_count() * cluster.size()) as f32;
        let series = (0..span)
            .map(|dist| {
                let hits: usize = cluster
                    .positions()
                    .map(|site| {
                        (0..Position::<D>::direction_count())
                            .filter(|&m| cluster.has_particle_at(site + Position::direction(m) * dist as i32))
                            .count()
                    })
                    .sum();
                hits as f32 / norm
            })
            .collect();
        Ok(vec![MetricValue::Series(series)])
    }
}

/// Maximum score, mean score and a `bins`-bucket score histogram.
pub struct ScoreDistribution {
    pub bins: usize,
}

impl<const D: usize> ClusterMetric<D> for ScoreDistribution {
    fn headers(&self) -> Vec<String> {
        vec!["max. score".into(), "avg. score".into(), "score distribution".into()]
    }

    fn measure(&self, cluster: &Cluster<D>) -> Result<Vec<MetricValue>, EngineError> {
        if cluster.is_empty() {
            return Err(EngineError::EmptyCluster);
        }
        let scores = cluster.particles().iter().map(|p| p.score);
        let max = scores.clone().fold(0.0, f32::max);
        let mean = scores.clone().sum::<f32>() / cluster.size() as f32;

        let bins = self.bins.max(1);
        let mut histogram = vec![0u32; bins];
        for score in scores {
            let bin = if max > 0.0 {
                ((score / max * (bins - 1) as f32) as usize).min(bins - 1)
            } else {
                0
            };
            histogram[bin] += 1;
        }
        Ok(vec![MetricValue::Scalar(max), MetricValue::Scalar(mean), MetricValue::Histogram(histogram)])
    }
}

/// Builds the metric named in the configuration.
pub fn metric_from_kind<const D: usize>(kind: MetricKind, config: &StatisticsConfig) -> Box<dyn ClusterMetric<D>> {
    match kind {
        MetricKind::Particles => Box::new(Particles),
        MetricKind::CoordNumber => Box::new(CoordinationNumber),
        MetricKind::RadiusOfGyration => Box::new(RadiusOfGyration { percent: config.gyration_percent }),
        MetricKind::Density => Box::new(Density { bins: config.density_bins }),
        MetricKind::DensityCorrelation => Box::new(DensityCorrelation),
        MetricKind::ScoreDistribution => Box::new(ScoreDistribution { bins: config.score_bins }),
    }
}

/// Runs every metric over every cluster each time it visits a world.
pub struct StatisticsVisitor<const D: usize> {
    metrics: Vec<Box<dyn ClusterMetric<D>>>,
    /// Visit counter, the first visit is step 1.
    step: u64,
    rows: Vec<StatisticsRow>,
}

impl<const D: usize> StatisticsVisitor<D> {
    pub fn new(metrics: Vec<Box<dyn ClusterMetric<D>>>) -> Self {
        StatisticsVisitor { metrics, step: 1, rows: Vec::new() }
    }

    pub fn from_config(config: &StatisticsConfig) -> Self {
        Self::new(config.metrics.iter().map(|&kind| metric_from_kind(kind, config)).collect())
    }

    /// Appends a metric; its columns follow the existing ones.
    pub fn with_metric(mut self, metric: Box<dyn ClusterMetric<D>>) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["step".to_string(), "cluster".to_string()];
        headers.extend(self.metrics.iter().flat_map(|m| m.headers()));
        headers
    }

    pub fn rows(&self) -> &[StatisticsRow] {
        &self.rows
    }

    /// Writes the recorded rows as a tab separated table with a header line.
    pub fn write_table<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        out.write_record(self.headers())?;
        for row in &self.rows {
            let mut record = vec![row.step.to_string(), row.cluster.to_string()];
            record.extend(row.values.iter().map(MetricValue::to_string));
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl<const D: usize> Visitor<D> for StatisticsVisitor<D> {
    fn visit(&mut self, world: &World<D>) -> Result<()> {
        for (n, cluster) in world.clusters().iter().enumerate() {
            let mut values = Vec::new();
            for metric in &self.metrics {
                values.extend(metric.measure(cluster)?);
            }
            self.rows.push(StatisticsRow { step: self.step, cluster: n, values });
        }
        self.step += 1;
        Ok(())
    }
}
