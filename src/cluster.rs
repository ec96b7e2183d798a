use crate::error::EngineError;
use crate::particle::Particle;
use aggregation_common::{FloatVec, Position};
use std::collections::HashSet;

/// A rigid aggregate of absorbed particles.
///
/// Members are stored oldest first. Their positions are kept relative to
/// `origin`, so translating the whole aggregate only touches the origin.
#[derive(Debug, Clone)]
pub struct Cluster<const D: usize> {
    origin: Position<D>,
    particles: Vec<Particle<D>>,
    occupied: HashSet<Position<D>>,
}

impl<const D: usize> Default for Cluster<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> Cluster<D> {
    /// Creates an empty cluster anchored at the lattice origin.
    pub fn new() -> Self {
        Cluster {
            origin: Position::origin(),
            particles: Vec::new(),
            occupied: HashSet::new(),
        }
    }

    /// Creates a cluster holding a single particle, anchored at its site.
    pub fn singleton(particle: Particle<D>) -> Self {
        let mut cluster = Cluster {
            origin: particle.position,
            particles: Vec::with_capacity(1),
            occupied: HashSet::with_capacity(1),
        };
        cluster.add_particle(particle);
        cluster
    }

    /// Builds a cluster from particles given in absorption order.
    pub fn from_particles<I>(particles: I) -> Self
    where
        I: IntoIterator<Item = Particle<D>>,
    {
        let mut iter = particles.into_iter();
        let Some(first) = iter.next() else {
            return Self::new();
        };
        let mut cluster = Self::singleton(first);
        for p in iter {
            cluster.add_particle(p);
        }
        cluster
    }

    /// Appends a particle as the youngest member.
    pub fn add_particle(&mut self, mut particle: Particle<D>) {
        particle.position = particle.position - self.origin;
        self.occupied.insert(particle.position);
        self.particles.push(particle);
    }

    /// Absorbs every member of `other`, keeping its internal order; they all
    /// become younger than the current members.
    pub fn merge(&mut self, other: Cluster<D>) {
        self.particles.reserve(other.particles.len());
        self.occupied.reserve(other.particles.len());
        let shift = other.origin - self.origin;
        for mut p in other.particles {
            p.position += shift;
            self.occupied.insert(p.position);
            self.particles.push(p);
        }
    }

    /// Rigidly translates every member by `offset`.
    pub fn translate(&mut self, offset: Position<D>) {
        self.origin += offset;
    }

    pub fn has_particle_at(&self, position: Position<D>) -> bool {
        self.occupied.contains(&(position - self.origin))
    }

    /// Absolute position of a member taken from [`Cluster::particles`].
    #[inline(always)]
    pub fn abs_position(&self, member: &Particle<D>) -> Position<D> {
        self.origin + member.position
    }

    /// Members in absorption order. Positions are relative to the cluster origin.
    pub fn particles(&self) -> &[Particle<D>] {
        &self.particles
    }

    /// Absolute member positions in absorption order.
    pub fn positions(&self) -> impl Iterator<Item = Position<D>> + '_ {
        self.particles.iter().map(move |p| self.abs_position(p))
    }

    pub fn origin(&self) -> Position<D> {
        self.origin
    }

    pub fn size(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Centre of mass in absolute coordinates.
    pub fn center(&self) -> Result<FloatVec<D>, EngineError> {
        if self.particles.is_empty() {
            return Err(EngineError::EmptyCluster);
        }
        let sum = self
            .positions()
            .fold(FloatVec::zero(), |acc, p| acc + p.to_float());
        Ok(sum / self.particles.len() as f32)
    }

    /// Largest distance of any member from the centre of mass.
    pub fn radius(&self) -> Result<f32, EngineError> {
        let center = self.center()?;
        Ok(self
            .positions()
            .map(|p| p.to_float().distance(&center))
            .fold(0.0, f32::max))
    }

    /// Overwrites member scores in absorption order.
    pub fn set_scores(&mut self, scores: &[f32]) {
        for (p, &score) in self.particles.iter_mut().zip(scores) {
            p.score = score;
        }
    }

    /// Keeps the `at` oldest members and returns the younger remainder as a
    /// new cluster sharing this cluster's origin.
    pub fn split_off(&mut self, at: usize) -> Cluster<D> {
        let younger = self.particles.split_off(at.min(self.particles.len()));
        self.occupied = self.particles.iter().map(|p| p.position).collect();
        Cluster {
            origin: self.origin,
            occupied: younger.iter().map(|p| p.position).collect(),
            particles: younger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Particle<2> {
        Particle::new(Position([x, y]))
    }

    fn line(n: i32) -> Cluster<2> {
        Cluster::from_particles((0..n).map(|x| p(x, 0)))
    }

    #[test]
    fn add_particle_keeps_absorption_order() {
        let mut c = Cluster::singleton(p(3, 3));
        c.add_particle(p(4, 3));
        c.add_particle(p(2, 3));
        let got: Vec<_> = c.positions().collect();
        assert_eq!(got, vec![Position([3, 3]), Position([4, 3]), Position([2, 3])]);
        assert!(c.has_particle_at(Position([2, 3])));
        assert!(!c.has_particle_at(Position([5, 3])));
    }

    #[test]
    fn merge_appends_other_as_younger() {
        let mut elder = line(2);
        let mut younger = Cluster::singleton(p(10, 10));
        younger.add_particle(p(10, 11));
        younger.translate(Position([1, 0]));

        elder.merge(younger);
        let got: Vec<_> = elder.positions().collect();
        assert_eq!(
            got,
            vec![Position([0, 0]), Position([1, 0]), Position([11, 10]), Position([11, 11])]
        );
        assert!(elder.has_particle_at(Position([11, 11])));
    }

    #[test]
    fn merge_with_empty_cluster_changes_nothing() {
        let mut c = line(3);
        let before: Vec<_> = c.positions().collect();
        let center = c.center().unwrap();
        c.merge(Cluster::new());
        assert_eq!(c.positions().collect::<Vec<_>>(), before);
        assert_eq!(c.size(), 3);
        assert_eq!(c.center().unwrap(), center);
    }

    #[test]
    fn translate_moves_every_member() {
        let mut c = line(3);
        c.translate(Position([0, -2]));
        let got: Vec<_> = c.positions().collect();
        assert_eq!(got, vec![Position([0, -2]), Position([1, -2]), Position([2, -2])]);
        assert!(c.has_particle_at(Position([2, -2])));
        assert!(!c.has_particle_at(Position([2, 0])));
    }

    #[test]
    fn center_and_radius() {
        let c = line(3);
        assert_eq!(c.center().unwrap(), FloatVec([1.0, 0.0]));
        assert!((c.radius().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_cluster_summaries_are_errors() {
        let c = Cluster::<2>::new();
        assert_eq!(c.size(), 0);
        assert_eq!(c.center(), Err(EngineError::EmptyCluster));
        assert_eq!(c.radius(), Err(EngineError::EmptyCluster));
    }

    #[test]
    fn set_scores_follows_absorption_order() {
        let mut c = line(3);
        c.set_scores(&[2.0, 0.0, 1.5]);
        let scores: Vec<f32> = c.particles().iter().map(|q| q.score).collect();
        assert_eq!(scores, vec![2.0, 0.0, 1.5]);
    }

    #[test]
    fn split_off_partitions_by_age() {
        let mut c = line(4);
        c.translate(Position([5, 5]));
        let younger = c.split_off(1);
        assert_eq!(c.positions().collect::<Vec<_>>(), vec![Position([5, 5])]);
        assert_eq!(
            younger.positions().collect::<Vec<_>>(),
            vec![Position([6, 5]), Position([7, 5]), Position([8, 5])]
        );
        assert!(!c.has_particle_at(Position([6, 5])));
        assert!(younger.has_particle_at(Position([6, 5])));
    }
}
