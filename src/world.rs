use crate::arena::{resolve_candidates, swap_take};
use crate::bath::{self, Bath};
use crate::cluster::Cluster;
use crate::error::EngineError;
use crate::interaction::{Entity, Interaction, InteractionModel, Resolver};
use crate::particle::Particle;
use crate::visitor::Visitor;
use aggregation_common::{Position, SimParams};
use anyhow::Result;
use log::{debug, info, trace, warn};
use rand::prelude::*;
use std::collections::HashSet;

/// Counts of what happened during one [`World::step`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Free particles that took a random-walk step.
    pub moved_particles: usize,
    /// Free particles absorbed into a cluster.
    pub absorbed_particles: usize,
    /// Singleton clusters created for particles that met no cluster.
    pub new_clusters: usize,
    /// Clusters absorbed into another cluster (both phases).
    pub merged_clusters: usize,
    /// Clusters that took a random-walk step.
    pub moved_clusters: usize,
}

/// Owns the free particles, the clusters and the random generator, and
/// advances them one discrete time step at a time.
///
/// Indices into [`World::particles`] and [`World::clusters`] are only
/// meaningful until the next step: merges reorder and shrink both.
pub struct World<const D: usize> {
    particles: Vec<Particle<D>>,
    clusters: Vec<Cluster<D>>,
    resolver: Resolver<D>,
    bath: Box<dyn Bath<D>>,
    /// The only source of randomness; drawn in a fixed order during a step.
    rng: StdRng,
    current_step: u64,
}

/// Placement attempts per initial particle before giving up on a crowded box.
const PLACEMENT_ATTEMPTS: usize = 16;

impl<const D: usize> World<D> {
    /// Creates a world from runtime parameters, seeding clusters and free particles.
    pub fn new(params: &SimParams) -> Result<Self> {
        if params.dimension != D {
            return Err(EngineError::UnsupportedDimension(params.dimension).into());
        }
        if params.extent <= 0 {
            anyhow::bail!("Placement extent must be positive (got {}).", params.extent);
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let clusters = place_seed_clusters::<D>(params.seed_clusters, params.extent);
        let particles = place_free_particles(params.initial_free_particles, params.extent, &clusters, &mut rng);
        info!(
            "World initialised: {} dimensions, {} free particles, {} seed clusters.",
            D,
            particles.len(),
            clusters.len()
        );

        Ok(World {
            particles,
            clusters,
            resolver: Resolver::new(InteractionModel::from(params.interaction)),
            bath: bath::from_params(&params.bath),
            rng,
            current_step: 0,
        })
    }

    /// Creates a world from explicit collections.
    pub fn from_parts(
        particles: Vec<Particle<D>>,
        clusters: Vec<Cluster<D>>,
        model: InteractionModel,
        bath: Box<dyn Bath<D>>,
        seed: u64,
    ) -> Self {
        World {
            particles,
            clusters,
            resolver: Resolver::new(model),
            bath,
            rng: StdRng::seed_from_u64(seed),
            current_step: 0,
        }
    }

    /// Advances the simulation by one step: bath, particle resolution,
    /// cluster resolution.
    ///
    /// An error leaves the world in an undefined state; the simulation must
    /// be abandoned.
    pub fn step(&mut self) -> Result<StepReport> {
        self.bath.step(&mut self.particles, &mut self.clusters, &mut self.rng);
        let total_before = self.total_particles();

        let mut report = StepReport::default();
        self.resolve_particles(&mut report)?;
        self.resolve_clusters(&mut report)?;

        let total_after = self.total_particles();
        if total_before != total_after {
            anyhow::bail!(
                "Step {} changed the particle count from {} to {}.",
                self.current_step + 1,
                total_before,
                total_after
            );
        }

        self.current_step += 1;
        trace!("Step {}: {:?}", self.current_step, report);
        Ok(report)
    }

    /// Phase 1: every free particle either joins the first cluster (or a
    /// fresh one) together with everything else it touches, or walks.
    fn resolve_particles(&mut self, report: &mut StepReport) -> Result<(), EngineError> {
        let mut i = 0;
        while i < self.particles.len() {
            let mut particle_hits = Vec::new();
            for j in 0..self.particles.len() {
                if j != i
                    && self.resolver.interact(
                        Entity::Particle(&self.particles[i]),
                        Entity::Particle(&self.particles[j]),
                        &mut self.rng,
                    ) == Interaction::Merge
                {
                    particle_hits.push(j);
                }
            }

            let mut cluster_hits = Vec::new();
            for k in 0..self.clusters.len() {
                if self.resolver.interact(
                    Entity::Particle(&self.particles[i]),
                    Entity::Cluster(&self.clusters[k]),
                    &mut self.rng,
                ) == Interaction::Merge
                {
                    cluster_hits.push(k);
                }
            }

            if particle_hits.is_empty() && cluster_hits.is_empty() {
                let offset = random_step::<D>(&mut self.rng);
                self.particles[i].step_by(offset);
                report.moved_particles += 1;
                i += 1;
                continue;
            }

            let old_last = self.particles.len() - 1;
            let particle = swap_take(&mut self.particles, i, "particle")?;
            let target = match cluster_hits.first() {
                Some(&k) => {
                    self.clusters[k].add_particle(particle);
                    k
                }
                None => {
                    self.clusters.push(Cluster::singleton(particle));
                    report.new_clusters += 1;
                    self.clusters.len() - 1
                }
            };
            report.absorbed_particles += 1;

            // Every other hit lies above `target`, so removing them from the
            // top down never relocates `target` or a pending hit.
            for &k in cluster_hits.iter().skip(1).rev() {
                let absorbed = swap_take(&mut self.clusters, k, "cluster")?;
                self.clusters[target].merge(absorbed);
                report.merged_clusters += 1;
            }

            for j in resolve_candidates(&particle_hits, i, old_last, "particle")? {
                let absorbed = swap_take(&mut self.particles, j, "particle")?;
                self.clusters[target].add_particle(absorbed);
                report.absorbed_particles += 1;
            }

            // The particle swapped into slot `i` is not revisited this step.
            i += 1;
        }
        Ok(())
    }

    /// Phase 2: every cluster absorbs the clusters it touches, then walks.
    fn resolve_clusters(&mut self, report: &mut StepReport) -> Result<(), EngineError> {
        let mut i = 0;
        while i < self.clusters.len() {
            let mut hits = Vec::new();
            for j in 0..self.clusters.len() {
                if j != i
                    && self.resolver.interact(
                        Entity::Cluster(&self.clusters[i]),
                        Entity::Cluster(&self.clusters[j]),
                        &mut self.rng,
                    ) == Interaction::Merge
                {
                    hits.push(j);
                }
            }

            let mut target = i;
            for &j in hits.iter().rev() {
                let last = self.clusters.len() - 1;
                let absorbed = swap_take(&mut self.clusters, j, "cluster")?;
                if target == last {
                    // Once every hit above it is gone, the absorbing cluster
                    // itself can be the element swapped down into `j`.
                    target = j;
                }
                self.clusters[target].merge(absorbed);
                report.merged_clusters += 1;
            }

            let offset = random_step::<D>(&mut self.rng);
            self.clusters[target].translate(offset);
            report.moved_clusters += 1;
            i += 1;
        }
        Ok(())
    }

    /// Lets a visitor read the world between steps.
    pub fn accept<V: Visitor<D> + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit(self)
    }

    pub fn particles(&self) -> &[Particle<D>] {
        &self.particles
    }

    pub fn clusters(&self) -> &[Cluster<D>] {
        &self.clusters
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.current_step
    }

    /// Free particles plus every cluster member.
    pub fn total_particles(&self) -> usize {
        self.particles.len() + self.clusters.iter().map(Cluster::size).sum::<usize>()
    }

    pub fn model(&self) -> InteractionModel {
        self.resolver.model()
    }
}

/// One lattice unit along a uniformly chosen axis and sign.
fn random_step<const D: usize>(rng: &mut StdRng) -> Position<D> {
    Position::direction(rng.random_range(0..Position::<D>::direction_count()))
}

/// Seed clusters are singletons spread evenly along the first axis.
fn place_seed_clusters<const D: usize>(count: usize, extent: i32) -> Vec<Cluster<D>> {
    (0..count)
        .map(|k| {
            let mut site = Position::<D>::origin();
            if count > 1 {
                let span = 2 * extent as i64;
                site.0[0] = (-(extent as i64) + span * (k as i64 + 1) / (count as i64 + 1)) as i32;
            }
            // A lone seed exposes every neighbour site.
            Cluster::singleton(Particle::with_score(site, Position::<D>::direction_count() as f32))
        })
        .collect()
}

/// Free particles on distinct, unclustered sites drawn uniformly from the box.
fn place_free_particles<const D: usize>(
    count: usize,
    extent: i32,
    clusters: &[Cluster<D>],
    rng: &mut StdRng,
) -> Vec<Particle<D>> {
    let mut occupied = HashSet::with_capacity(count);
    let mut particles = Vec::with_capacity(count);
    let mut attempts = count * PLACEMENT_ATTEMPTS;
    while particles.len() < count && attempts > 0 {
        attempts -= 1;
        let mut coords = [0; D];
        for c in coords.iter_mut() {
            *c = rng.random_range(-extent..=extent);
        }
        let site = Position(coords);
        if occupied.contains(&site) || clusters.iter().any(|c| c.has_particle_at(site)) {
            continue;
        }
        occupied.insert(site);
        particles.push(Particle::new(site));
    }
    if particles.len() < count {
        warn!("Placed only {} of {} initial particles; the box is crowded.", particles.len(), count);
    } else {
        debug!("Placed {} initial particles.", count);
    }
    particles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bath::ClosedBath;
    use aggregation_common::{BathParams, InteractionParams};

    fn p(x: i32, y: i32) -> Particle<2> {
        Particle::new(Position([x, y]))
    }

    fn closed_world(particles: Vec<Particle<2>>, clusters: Vec<Cluster<2>>, reach: u32) -> World<2> {
        World::from_parts(particles, clusters, InteractionModel::Contact { reach }, Box::new(ClosedBath), 17)
    }

    #[test]
    fn isolated_particle_walks_one_unit() {
        let mut world = closed_world(vec![p(0, 0)], Vec::new(), 1);
        let report = world.step().unwrap();
        assert_eq!(report.moved_particles, 1);
        assert_eq!(world.particles()[0].position.manhattan(&Position([0, 0])), 1);
        assert_eq!(world.step_count(), 1);
    }

    #[test]
    fn particle_joins_touching_cluster() {
        let cluster = Cluster::from_particles([p(0, 0), p(1, 0)]);
        let mut world = closed_world(vec![p(2, 0)], vec![cluster], 1);
        let report = world.step().unwrap();
        assert_eq!(report.absorbed_particles, 1);
        assert_eq!(report.new_clusters, 0);
        assert!(world.particles().is_empty());
        assert_eq!(world.clusters().len(), 1);
        assert_eq!(world.clusters()[0].size(), 3);
    }

    #[test]
    fn particle_bridging_two_clusters_fuses_them() {
        let left = Cluster::from_particles([p(-2, 0), p(-1, 0)]);
        let right = Cluster::from_particles([p(1, 0), p(2, 0)]);
        let mut world = closed_world(vec![p(0, 0)], vec![left, right], 1);
        let report = world.step().unwrap();
        assert_eq!(report.merged_clusters, 1);
        assert_eq!(world.clusters().len(), 1);

        let c = &world.clusters()[0];
        assert_eq!(c.size(), 5);
        // Elder cluster first, then the bridging particle, then the absorbed cluster.
        let shift = c.abs_position(&c.particles()[0]) - Position([-2, 0]);
        let relative: Vec<_> = c.positions().map(|q| q - shift).collect();
        assert_eq!(
            relative,
            vec![Position([-2, 0]), Position([-1, 0]), Position([0, 0]), Position([1, 0]), Position([2, 0])]
        );
    }

    #[test]
    fn touching_clusters_merge_in_phase_two() {
        let a = Cluster::from_particles([p(0, 0)]);
        let b = Cluster::from_particles([p(0, 1)]);
        let c = Cluster::from_particles([p(10, 10)]);
        let mut world = closed_world(Vec::new(), vec![a, b, c], 1);
        let report = world.step().unwrap();
        assert_eq!(report.merged_clusters, 1);
        assert_eq!(report.moved_clusters, 2);
        let mut sizes: Vec<_> = world.clusters().iter().map(Cluster::size).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn absorbing_the_last_cluster_keeps_the_rest() {
        // Cluster 0 is far away, cluster 1 absorbs cluster 2.
        let a = Cluster::from_particles([p(0, 0)]);
        let far = Cluster::from_particles([p(20, 20)]);
        let b = Cluster::from_particles([p(1, 0)]);
        let mut world = closed_world(Vec::new(), vec![far, a, b], 1);
        world.step().unwrap();
        assert_eq!(world.clusters().len(), 2);
        assert_eq!(world.total_particles(), 3);
    }

    #[test]
    fn last_cluster_absorbing_a_lower_index_takes_its_slot() {
        // Cluster 0 only touches cluster 1 if its walk lands on (1, 0). Then
        // cluster 1, the last one, absorbs it and is swapped down into slot 0.
        let mut relocations = 0;
        for seed in 0..200 {
            let a = Cluster::from_particles([p(0, 0)]);
            let b = Cluster::from_particles([p(2, 0)]);
            let mut world =
                World::from_parts(Vec::new(), vec![a, b], InteractionModel::Contact { reach: 1 }, Box::new(ClosedBath), seed);
            let report = world.step().unwrap();
            assert_eq!(report.moved_clusters, 2);
            if world.clusters().len() == 2 {
                assert_eq!(report.merged_clusters, 0);
                continue;
            }

            relocations += 1;
            assert_eq!(report.merged_clusters, 1);
            let merged = &world.clusters()[0];
            assert_eq!(merged.size(), 2);
            let members: Vec<_> = merged.positions().collect();
            // Elder first: the absorber's (2, 0), then the walker's (1, 0),
            // both shifted by the absorber's own walk.
            let shift = members[0] - Position([2, 0]);
            assert_eq!(shift.norm_l1(), 1);
            assert_eq!(members[1] - shift, Position([1, 0]));
        }
        assert!(relocations > 0);
    }

    #[test]
    fn new_builds_world_from_params() {
        let params = SimParams {
            dimension: 2,
            seed: 4,
            interaction: InteractionParams::Contact { reach: 1 },
            bath: BathParams::Closed,
            initial_free_particles: 25,
            seed_clusters: 3,
            extent: 10,
        };
        let world = World::<2>::new(&params).unwrap();
        assert_eq!(world.particles().len(), 25);
        assert_eq!(world.clusters().len(), 3);
        assert_eq!(world.total_particles(), 28);
    }

    #[test]
    fn new_rejects_mismatched_dimension() {
        let params = SimParams {
            dimension: 3,
            seed: 4,
            interaction: InteractionParams::Contact { reach: 1 },
            bath: BathParams::Closed,
            initial_free_particles: 0,
            seed_clusters: 0,
            extent: 10,
        };
        assert!(World::<2>::new(&params).is_err());
    }
}
