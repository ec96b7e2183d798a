use aggregation_common::Position;
use aggregation_engine::{
    Bath, ClosedBath, Cluster, DiffusionLimitedBath, EdenBath, InteractionModel, Particle, World,
};
use rand::rngs::StdRng;
use std::collections::HashSet;

fn p(x: i32, y: i32) -> Particle<2> {
    Particle::new(Position([x, y]))
}

fn contact(reach: u32) -> InteractionModel {
    InteractionModel::Contact { reach }
}

/// Positions of a cluster with its first member's displacement removed.
fn undo_shift(cluster: &Cluster<2>, first_original: Position<2>) -> (Position<2>, Vec<Position<2>>) {
    let shift = cluster.abs_position(&cluster.particles()[0]) - first_original;
    (shift, cluster.positions().map(|q| q - shift).collect())
}

#[test]
fn two_adjacent_particles_form_one_cluster() {
    let mut world = World::from_parts(vec![p(0, 0), p(1, 0)], Vec::new(), contact(1), Box::new(ClosedBath), 1);
    world.step().unwrap();

    assert!(world.particles().is_empty());
    assert_eq!(world.clusters().len(), 1);
    let cluster = &world.clusters()[0];
    assert_eq!(cluster.size(), 2);

    // The new cluster walked once in phase two; undo that to see the original sites.
    let (shift, sites) = undo_shift(cluster, Position([0, 0]));
    assert_eq!(shift.norm_l1(), 1);
    assert_eq!(sites, vec![Position([0, 0]), Position([1, 0])]);
}

#[test]
fn distant_particle_and_cluster_each_walk_one_unit() {
    let cluster = Cluster::from_particles([p(0, 0), p(1, 0), p(2, 0)]);
    let mut world = World::from_parts(vec![p(5, 5)], vec![cluster], contact(1), Box::new(ClosedBath), 2);
    let report = world.step().unwrap();

    assert_eq!(report.moved_particles, 1);
    assert_eq!(report.moved_clusters, 1);
    assert_eq!(world.particles().len(), 1);
    assert_eq!(world.particles()[0].position.manhattan(&Position([5, 5])), 1);

    assert_eq!(world.clusters().len(), 1);
    let (shift, sites) = undo_shift(&world.clusters()[0], Position([0, 0]));
    assert_eq!(shift.norm_l1(), 1);
    assert_eq!(sites, vec![Position([0, 0]), Position([1, 0]), Position([2, 0])]);
}

#[test]
fn three_mutually_touching_particles_form_one_cluster() {
    // With reach 2 every pair in the line is in contact.
    let particles = vec![p(0, 0), p(1, 0), p(2, 0)];
    let mut world = World::from_parts(particles, Vec::new(), contact(2), Box::new(ClosedBath), 3);
    let report = world.step().unwrap();

    assert!(world.particles().is_empty());
    assert_eq!(world.clusters().len(), 1);
    assert_eq!(report.absorbed_particles, 3);
    assert_eq!(report.new_clusters, 1);

    let (_, sites) = undo_shift(&world.clusters()[0], Position([0, 0]));
    let unique: HashSet<_> = sites.iter().copied().collect();
    assert_eq!(sites.len(), 3);
    assert_eq!(unique, HashSet::from([Position([0, 0]), Position([1, 0]), Position([2, 0])]));
}

#[test]
fn particle_relocated_by_swap_is_not_revisited() {
    // Particle 0 is absorbed with particle 1; the far particle 3 is swapped
    // into slot 0 and is skipped, while particle 2 (moved to slot 1) walks.
    let particles = vec![p(0, 0), p(0, 1), p(10, 10), p(-10, -10)];
    let mut world = World::from_parts(particles, Vec::new(), contact(1), Box::new(ClosedBath), 4);
    let report = world.step().unwrap();

    assert_eq!(report.absorbed_particles, 2);
    assert_eq!(report.moved_particles, 1);
    let free: Vec<_> = world.particles().iter().map(|q| q.position).collect();
    assert_eq!(free.len(), 2);
    assert!(free.contains(&Position([-10, -10])));
}

#[test]
fn identical_seeds_give_identical_runs() {
    let run = || {
        let bath = DiffusionLimitedBath::new(40, 12, 0.05);
        let seed = Cluster::singleton(p(0, 0));
        let mut world = World::from_parts(Vec::new(), vec![seed], InteractionModel::Sticky { reach: 1, probability: 0.7 }, Box::new(bath), 99);
        for _ in 0..200 {
            world.step().unwrap();
        }
        let free: Vec<_> = world.particles().iter().map(|q| q.position).collect();
        let clusters: Vec<Vec<_>> = world.clusters().iter().map(|c| c.positions().collect()).collect();
        (free, clusters)
    };
    assert_eq!(run(), run());
}

#[test]
fn eden_cluster_grows_every_step() {
    let seed = Cluster::singleton(Particle::with_score(Position([0, 0]), 4.0));
    let mut world = World::from_parts(Vec::new(), vec![seed], contact(1), Box::new(EdenBath::new(1)), 6);
    for _ in 0..50 {
        world.step().unwrap();
    }
    assert_eq!(world.clusters().len(), 1);
    assert_eq!(world.clusters()[0].size(), 51);
    assert!(world.particles().is_empty());
}

/// A bath that injects a fixed list of particles once, for accounting checks.
struct OneShotBath(Vec<Particle<2>>);

impl Bath<2> for OneShotBath {
    fn step(&mut self, particles: &mut Vec<Particle<2>>, _clusters: &mut Vec<Cluster<2>>, _rng: &mut StdRng) {
        particles.append(&mut self.0);
    }
}

#[test]
fn bath_injection_is_the_only_change_in_population() {
    let injected = vec![p(30, 30), p(31, 30), p(-30, 0)];
    let bath = OneShotBath(injected);
    let mut world = World::from_parts(vec![p(0, 0)], vec![Cluster::singleton(p(5, 0))], contact(1), Box::new(bath), 8);
    let before = world.total_particles();
    world.step().unwrap();
    assert_eq!(world.total_particles(), before + 3);
    world.step().unwrap();
    assert_eq!(world.total_particles(), before + 3);
}
