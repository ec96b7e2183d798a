pub mod config;
pub mod lattice;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{
    SimulationConfig, LatticeConfig, ModelConfig, BathConfig, InitialConditions, RunConfig,
    StatisticsConfig, OutputConfig, InteractionKind, BathKind, MetricKind, MAX_DIMENSION, MAX_REACH,
};
pub use lattice::{Position, FloatVec, ball_offsets, unit_ball_volume};
pub use sim_params::{SimParams, InteractionParams, BathParams};
pub use snapshot::{PopulationSnapshot, MetricValue, StatisticsRow};
