use crate::cluster::Cluster;
use crate::particle::Particle;
use aggregation_common::{ball_offsets, InteractionParams, Position};
use rand::Rng;

/// Outcome of resolving a pair of entities.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interaction {
    None,
    Merge,
}

/// A borrowed spatial entity taking part in an interaction test.
#[derive(Debug, Copy, Clone)]
pub enum Entity<'a, const D: usize> {
    Particle(&'a Particle<D>),
    Cluster(&'a Cluster<D>),
}

/// Contact and stickiness rule of a model.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InteractionModel {
    /// Merge whenever occupied sites lie within `reach` (Manhattan).
    Contact { reach: u32 },
    /// Like `Contact`, but a contact only sticks with `probability`.
    /// Exactly one draw is consumed per contact.
    Sticky { reach: u32, probability: f64 },
}

impl InteractionModel {
    pub fn reach(&self) -> u32 {
        match *self {
            InteractionModel::Contact { reach } | InteractionModel::Sticky { reach, .. } => reach,
        }
    }
}

impl From<InteractionParams> for InteractionModel {
    fn from(params: InteractionParams) -> Self {
        match params {
            InteractionParams::Contact { reach } => InteractionModel::Contact { reach },
            InteractionParams::Sticky { reach, probability } => {
                InteractionModel::Sticky { reach, probability }
            }
        }
    }
}

/// Pairwise interaction resolver. Never mutates the entities it inspects.
#[derive(Debug, Clone)]
pub struct Resolver<const D: usize> {
    model: InteractionModel,
    /// Lattice offsets within the contact reach, the zero offset included.
    contact_offsets: Vec<Position<D>>,
}

impl<const D: usize> Resolver<D> {
    pub fn new(model: InteractionModel) -> Self {
        Resolver {
            model,
            contact_offsets: ball_offsets::<D>(model.reach()),
        }
    }

    pub fn model(&self) -> InteractionModel {
        self.model
    }

    /// Resolves one pair. The only generator draw is the sticking test of
    /// the sticky model: one uniform `f64` per contact, none otherwise.
    pub fn interact<R: Rng>(&self, a: Entity<'_, D>, b: Entity<'_, D>, rng: &mut R) -> Interaction {
        let touching = match (a, b) {
            (Entity::Particle(p), Entity::Particle(q)) => {
                p.position.manhattan(&q.position) <= self.model.reach()
            }
            (Entity::Particle(p), Entity::Cluster(c)) | (Entity::Cluster(c), Entity::Particle(p)) => {
                self.touches_site(c, p.position)
            }
            (Entity::Cluster(c), Entity::Cluster(k)) => {
                debug_assert!(!std::ptr::eq(c, k), "cluster resolved against itself");
                // Walk the smaller aggregate, probe the larger one's occupancy.
                let (small, large) = if c.size() <= k.size() { (c, k) } else { (k, c) };
                small.positions().any(|site| self.touches_site(large, site))
            }
        };

        if !touching {
            return Interaction::None;
        }
        match self.model {
            InteractionModel::Contact { .. } => Interaction::Merge,
            InteractionModel::Sticky { probability, .. } => {
                // Always one uniform draw, even at probability 0 or 1.
                if rng.random::<f64>() < probability {
                    Interaction::Merge
                } else {
                    Interaction::None
                }
            }
        }
    }

    fn touches_site(&self, cluster: &Cluster<D>, site: Position<D>) -> bool {
        self.contact_offsets
            .iter()
            .any(|offset| cluster.has_particle_at(site + *offset))
    }
}
