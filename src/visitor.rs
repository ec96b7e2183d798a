use crate::cluster::Cluster;
use crate::world::World;
use aggregation_common::PopulationSnapshot;
use anyhow::Result;
use log::info;

/// Read-only traversal of a world, invoked between steps via [`World::accept`].
pub trait Visitor<const D: usize> {
    fn visit(&mut self, world: &World<D>) -> Result<()>;
}

/// Records how the population splits between free particles and clusters.
#[derive(Debug, Default, Clone)]
pub struct PopulationVisitor {
    snapshots: Vec<PopulationSnapshot>,
}

impl PopulationVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> &[PopulationSnapshot] {
        &self.snapshots
    }
}

impl<const D: usize> Visitor<D> for PopulationVisitor {
    fn visit(&mut self, world: &World<D>) -> Result<()> {
        let clusters = world.clusters();
        let snapshot = PopulationSnapshot {
            step: world.step_count(),
            free_particles: world.particles().len(),
            clusters: clusters.len(),
            clustered_particles: clusters.iter().map(Cluster::size).sum(),
            largest_cluster: clusters.iter().map(Cluster::size).max().unwrap_or(0),
        };
        info!(
            "Population at step {}: {} free | {} clusters holding {} | largest {}",
            snapshot.step,
            snapshot.free_particles,
            snapshot.clusters,
            snapshot.clustered_particles,
            snapshot.largest_cluster
        );
        self.snapshots.push(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bath::ClosedBath;
    use crate::interaction::InteractionModel;
    use crate::particle::Particle;
    use aggregation_common::Position;

    #[test]
    fn population_visitor_counts_free_and_clustered() {
        let particles = vec![Particle::new(Position([30, 30]))];
        let clusters = vec![
            Cluster::from_particles([Particle::new(Position([0, 0])), Particle::new(Position([1, 0]))]),
            Cluster::singleton(Particle::new(Position([-9, 4]))),
        ];
        let world = World::<2>::from_parts(
            particles,
            clusters,
            InteractionModel::Contact { reach: 1 },
            Box::new(ClosedBath),
            1,
        );
        let mut visitor = PopulationVisitor::new();
        world.accept(&mut visitor).unwrap();
        assert_eq!(
            visitor.snapshots(),
            &[PopulationSnapshot {
                step: 0,
                free_particles: 1,
                clusters: 2,
                clustered_particles: 3,
                largest_cluster: 2,
            }]
        );
    }
}
