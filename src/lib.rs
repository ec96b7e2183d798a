//! Lattice aggregation engine: free particles random-walk, touch, and fuse
//! into rigid clusters that keep random-walking themselves.

pub mod arena;
pub mod bath;
pub mod cluster;
pub mod error;
pub mod interaction;
pub mod particle;
pub mod statistics;
pub mod visitor;
pub mod world;

pub use bath::{Bath, ClosedBath, DiffusionLimitedBath, EdenBath};
pub use cluster::Cluster;
pub use error::EngineError;
pub use interaction::{Entity, Interaction, InteractionModel, Resolver};
pub use particle::Particle;
pub use statistics::{ClusterMetric, StatisticsVisitor};
pub use visitor::{PopulationVisitor, Visitor};
pub use world::{StepReport, World};
