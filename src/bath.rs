use crate::cluster::Cluster;
use crate::particle::Particle;
use aggregation_common::{BathParams, Position};
use log::{debug, trace, warn};
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use std::collections::HashSet;

/// Stochastic source and sink of free particles, run before every step.
///
/// A bath may add or remove free particles and may split clusters. It must
/// never merge clusters. All randomness comes from the world's generator.
pub trait Bath<const D: usize> {
    fn step(&mut self, particles: &mut Vec<Particle<D>>, clusters: &mut Vec<Cluster<D>>, rng: &mut StdRng);
}

/// Builds the bath selected in the configuration.
pub fn from_params<const D: usize>(params: &BathParams) -> Box<dyn Bath<D>> {
    match *params {
        BathParams::Closed => Box::new(ClosedBath),
        BathParams::DiffusionLimited { population, extent, split_probability } => {
            Box::new(DiffusionLimitedBath::new(population, extent, split_probability))
        }
        BathParams::Eden { growth_per_step } => Box::new(EdenBath::new(growth_per_step)),
    }
}

/// A closed system: nothing enters or leaves.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosedBath;

impl<const D: usize> Bath<D> for ClosedBath {
    fn step(&mut self, _particles: &mut Vec<Particle<D>>, _clusters: &mut Vec<Cluster<D>>, _rng: &mut StdRng) {}
}

/// Keeps a fixed free population inside the hypercube `[-extent, extent]^D`.
///
/// Particles that walk out of the box are dropped, the population is then
/// topped up with particles on free sites drawn uniformly from the box.
/// With `split_probability` one cluster of two or more members is split into
/// its elder and younger halves.
#[derive(Debug, Clone)]
pub struct DiffusionLimitedBath {
    pub population: usize,
    pub extent: i32,
    pub split_probability: f64,
}

/// Placement attempts per missing particle before the bath gives up for this step.
const PLACEMENT_ATTEMPTS: usize = 16;

impl DiffusionLimitedBath {
    pub fn new(population: usize, extent: i32, split_probability: f64) -> Self {
        DiffusionLimitedBath { population, extent, split_probability }
    }

    fn inside<const D: usize>(&self, position: &Position<D>) -> bool {
        position.0.iter().all(|c| c.abs() <= self.extent)
    }

    fn random_site<const D: usize>(&self, rng: &mut StdRng) -> Position<D> {
        let mut coords = [0; D];
        for c in coords.iter_mut() {
            *c = rng.random_range(-self.extent..=self.extent);
        }
        Position(coords)
    }
}

impl<const D: usize> Bath<D> for DiffusionLimitedBath {
    fn step(&mut self, particles: &mut Vec<Particle<D>>, clusters: &mut Vec<Cluster<D>>, rng: &mut StdRng) {
        let before = particles.len();
        particles.retain(|p| self.inside(&p.position));
        let removed = before - particles.len();

        if self.split_probability > 0.0 && rng.random_bool(self.split_probability) {
            split_random_cluster(clusters, rng);
        }

        let missing = self.population.saturating_sub(particles.len());
        if missing == 0 {
            trace!("Bath removed {} particles, population full.", removed);
            return;
        }

        let mut occupied: HashSet<Position<D>> = particles.iter().map(|p| p.position).collect();
        let mut attempts = missing * PLACEMENT_ATTEMPTS;
        let mut injected = 0;
        while injected < missing && attempts > 0 {
            attempts -= 1;
            let site = self.random_site(rng);
            if occupied.contains(&site) || clusters.iter().any(|c| c.has_particle_at(site)) {
                continue;
            }
            occupied.insert(site);
            particles.push(Particle::new(site));
            injected += 1;
        }
        if injected < missing {
            warn!(
                "Bath could only place {} of {} particles; the box (extent {}) is crowded.",
                injected, missing, self.extent
            );
        }
        trace!("Bath removed {} and injected {} particles.", removed, injected);
    }
}

/// Splits a uniformly chosen cluster with at least two members into its
/// elder half (kept in place) and younger half (appended).
fn split_random_cluster<const D: usize>(clusters: &mut Vec<Cluster<D>>, rng: &mut StdRng) {
    let splittable: Vec<usize> = (0..clusters.len()).filter(|&k| clusters[k].size() >= 2).collect();
    let Some(&k) = splittable.choose(rng) else {
        return;
    };
    let at = clusters[k].size() / 2;
    let younger = clusters[k].split_off(at);
    debug!("Bath split cluster {} into {} + {} particles.", k, clusters[k].size(), younger.size());
    clusters.push(younger);
}

/// Eden growth: every cluster sprouts free particles on empty sites next to
/// its surface members, choosing the parent member with probability
/// proportional to its score. A score is the number of empty neighbour sites
/// around a member; it is set on placement and refreshed for every member
/// each time the cluster grows.
#[derive(Debug, Clone)]
pub struct EdenBath {
    pub growth_per_step: usize,
}

impl EdenBath {
    pub fn new(growth_per_step: usize) -> Self {
        EdenBath { growth_per_step }
    }
}

impl<const D: usize> Bath<D> for EdenBath {
    fn step(&mut self, particles: &mut Vec<Particle<D>>, clusters: &mut Vec<Cluster<D>>, rng: &mut StdRng) {
        let mut free: HashSet<Position<D>> = particles.iter().map(|p| p.position).collect();

        let mut grown = 0;
        for k in 0..clusters.len() {
            for _ in 0..self.growth_per_step {
                // Scores follow the current surface: buried members drop to 0.
                let exposures: Vec<f32> = {
                    let all: &[Cluster<D>] = clusters;
                    all[k].positions().map(|site| exposure(site, &free, all) as f32).collect()
                };
                clusters[k].set_scores(&exposures);

                let all: &[Cluster<D>] = clusters;
                let surface: Vec<(Position<D>, f32)> = all[k]
                    .positions()
                    .zip(exposures.iter().copied())
                    .filter(|&(_, score)| score > 0.0)
                    .collect();
                if surface.is_empty() {
                    trace!("Eden cluster {} has no free surface site.", k);
                    break;
                }
                let parent = match WeightedIndex::new(surface.iter().map(|(_, score)| *score)) {
                    Ok(weights) => surface[weights.sample(rng)].0,
                    Err(_) => surface[rng.random_range(0..surface.len())].0,
                };
                let candidates: Vec<Position<D>> = parent
                    .neighbours()
                    .filter(|&site| site_is_empty(site, &free, all))
                    .collect();
                let Some(&site) = candidates.choose(rng) else {
                    continue;
                };
                free.insert(site);
                let score = exposure(site, &free, all);
                particles.push(Particle::with_score(site, score as f32));
                grown += 1;
            }
        }
        trace!("Eden bath seeded {} growth sites.", grown);
    }
}

fn site_is_empty<const D: usize>(site: Position<D>, free: &HashSet<Position<D>>, clusters: &[Cluster<D>]) -> bool {
    !free.contains(&site) && !clusters.iter().any(|c| c.has_particle_at(site))
}

/// Number of empty nearest-neighbour sites around `site`.
fn exposure<const D: usize>(site: Position<D>, free: &HashSet<Position<D>>, clusters: &[Cluster<D>]) -> usize {
    site.neighbours().filter(|&n| site_is_empty(n, free, clusters)).count()
}
