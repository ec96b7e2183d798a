use serde::{Deserialize, Serialize};

/// Interaction rule derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InteractionParams {
    Contact { reach: u32 },
    Sticky { reach: u32, probability: f64 },
}

/// Bath selection derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BathParams {
    Closed,
    DiffusionLimited {
        population: usize,
        extent: i32,
        split_probability: f64,
    },
    Eden {
        growth_per_step: usize,
    },
}

/// Simulation parameters derived from the configuration, used to build the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    pub dimension: usize,
    pub seed: u64,
    pub interaction: InteractionParams,
    pub bath: BathParams,

    // Initial population
    pub initial_free_particles: usize,
    pub seed_clusters: usize,
    pub extent: i32, // Half-width of the initial placement box
}
