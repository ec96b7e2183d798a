use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{BathParams, InteractionParams, SimParams};
use std::path::Path;

/// Highest lattice dimension the engine is compiled for.
pub const MAX_DIMENSION: usize = 4;

/// Largest contact reach accepted. The contact ball grows as reach^D.
pub const MAX_REACH: u32 = 8;

// Lattice geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    pub dimension: usize,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Merge whenever two entities are in contact.
    Contact,
    /// Merge on contact with a fixed sticking probability.
    Sticky,
}

// Adjacency / stickiness model
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_interaction")]
    pub interaction: InteractionKind,
    /// Largest Manhattan distance between occupied sites that counts as contact.
    #[serde(default = "default_reach")]
    pub reach: u32,
    #[serde(default = "default_sticking_probability")]
    pub sticking_probability: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BathKind {
    Closed,
    DiffusionLimited,
    Eden,
}

// Particle source/sink
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BathConfig {
    #[serde(default = "default_bath_kind")]
    pub kind: BathKind,
    /// Free-particle population the diffusion limited bath keeps topped up.
    #[serde(default)]
    pub population: usize,
    /// Half-width of the hypercube particles are injected into and removed outside of.
    #[serde(default = "default_extent")]
    pub extent: i32,
    /// Chance per step that the bath splits one cluster in two.
    #[serde(default)]
    pub split_probability: f64,
    /// Number of growth sites the Eden bath seeds per cluster and step.
    #[serde(default = "default_growth_per_step")]
    pub growth_per_step: usize,
}

// Initial conditions for the simulation
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    pub seed: u64,
    #[serde(default)]
    pub free_particles: usize,
    #[serde(default = "default_seed_clusters")]
    pub seed_clusters: usize,
}

// Stopping condition and recording cadence
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub total_steps: u64,
    #[serde(default)]
    pub max_wall_clock_secs: Option<f64>,
    #[serde(default = "default_record_interval")]
    pub record_interval_steps: u64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Particles,
    CoordNumber,
    RadiusOfGyration,
    Density,
    DensityCorrelation,
    ScoreDistribution,
}

// Per-cluster statistics
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StatisticsConfig {
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricKind>,
    /// Youngest share of members used for the gyration centre, in percent.
    #[serde(default = "default_gyration_percent")]
    pub gyration_percent: u32,
    #[serde(default = "default_bins")]
    pub density_bins: usize,
    #[serde(default = "default_score_bins")]
    pub score_bins: usize,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_stats: bool,
    #[serde(default)]
    pub save_positions: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

/// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub bath: BathConfig,
    pub initial_conditions: InitialConditions,
    pub run: RunConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    pub output: OutputConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            interaction: default_interaction(),
            reach: default_reach(),
            sticking_probability: default_sticking_probability(),
        }
    }
}

impl Default for BathConfig {
    fn default() -> Self {
        BathConfig {
            kind: default_bath_kind(),
            population: 0,
            extent: default_extent(),
            split_probability: 0.0,
            growth_per_step: default_growth_per_step(),
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        StatisticsConfig {
            metrics: default_metrics(),
            gyration_percent: default_gyration_percent(),
            density_bins: default_bins(),
            score_bins: default_score_bins(),
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        log::debug!("Loaded configuration from {}", path_ref.display());
        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot run.
    pub fn validate(&self) -> Result<()> {
        let dimension = self.lattice.dimension;
        if dimension == 0 || dimension > MAX_DIMENSION {
            anyhow::bail!("lattice.dimension must be between 1 and {} (got {}).", MAX_DIMENSION, dimension);
        }
        let reach = self.model.reach;
        if reach == 0 || reach > MAX_REACH {
            anyhow::bail!("model.reach must be between 1 and {} (got {}).", MAX_REACH, reach);
        }
        if !(0.0..=1.0).contains(&self.model.sticking_probability) {
            anyhow::bail!("model.sticking_probability must lie in [0, 1].");
        }
        if !(0.0..=1.0).contains(&self.bath.split_probability) {
            anyhow::bail!("bath.split_probability must lie in [0, 1].");
        }
        if self.bath.extent <= 0 {
            anyhow::bail!("bath.extent must be positive.");
        }
        if self.run.record_interval_steps == 0 {
            anyhow::bail!("run.record_interval_steps must be greater than 0.");
        }
        if self.statistics.gyration_percent == 0 || self.statistics.gyration_percent > 100 {
            anyhow::bail!("statistics.gyration_percent must be between 1 and 100.");
        }
        if self.statistics.density_bins == 0 || self.statistics.score_bins == 0 {
            anyhow::bail!("statistics bin counts must be greater than 0.");
        }
        if self.bath.kind == BathKind::Eden && self.initial_conditions.seed_clusters == 0 {
            anyhow::bail!("the eden bath needs at least one seed cluster to grow from.");
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let interaction = match self.model.interaction {
            InteractionKind::Contact => InteractionParams::Contact { reach: self.model.reach },
            InteractionKind::Sticky => InteractionParams::Sticky {
                reach: self.model.reach,
                probability: self.model.sticking_probability,
            },
        };

        let bath = match self.bath.kind {
            BathKind::Closed => BathParams::Closed,
            BathKind::DiffusionLimited => BathParams::DiffusionLimited {
                population: self.bath.population,
                extent: self.bath.extent,
                split_probability: self.bath.split_probability,
            },
            BathKind::Eden => BathParams::Eden {
                growth_per_step: self.bath.growth_per_step,
            },
        };

        SimParams {
            dimension: self.lattice.dimension,
            seed: self.initial_conditions.seed,
            interaction,
            bath,
            initial_free_particles: self.initial_conditions.free_particles,
            seed_clusters: self.initial_conditions.seed_clusters,
            extent: self.bath.extent,
        }
    }
}

fn default_interaction() -> InteractionKind {
    InteractionKind::Contact
}

fn default_reach() -> u32 {
    1 // nearest neighbours
}

fn default_sticking_probability() -> f64 {
    1.0
}

fn default_bath_kind() -> BathKind {
    BathKind::Closed
}

fn default_extent() -> i32 {
    64
}

fn default_growth_per_step() -> usize {
    1
}

fn default_seed_clusters() -> usize {
    0
}

fn default_record_interval() -> u64 {
    1000
}

fn default_metrics() -> Vec<MetricKind> {
    vec![MetricKind::Particles, MetricKind::CoordNumber, MetricKind::RadiusOfGyration]
}

fn default_gyration_percent() -> u32 {
    100
}

fn default_bins() -> usize {
    10
}

fn default_score_bins() -> usize {
    5
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [lattice]
        dimension = 2

        [initial_conditions]
        seed = 7
        free_particles = 10

        [run]
        total_steps = 100

        [output]
        base_filename = "out"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.model.interaction, InteractionKind::Contact);
        assert_eq!(config.model.reach, 1);
        assert_eq!(config.bath.kind, BathKind::Closed);
        assert_eq!(config.run.record_interval_steps, 1000);
        assert!(config.output.save_stats);

        let params = config.get_sim_params();
        assert_eq!(params.dimension, 2);
        assert_eq!(params.seed, 7);
        assert_eq!(params.interaction, InteractionParams::Contact { reach: 1 });
        assert_eq!(params.bath, BathParams::Closed);
    }

    #[test]
    fn sticky_diffusion_limited_config() {
        let text = format!(
            "{MINIMAL}\n[model]\ninteraction = \"sticky\"\nsticking_probability = 0.25\n\
             [bath]\nkind = \"diffusion_limited\"\npopulation = 50\nextent = 20\n"
        );
        let params = SimulationConfig::from_toml_str(&text).unwrap().get_sim_params();
        assert_eq!(params.interaction, InteractionParams::Sticky { reach: 1, probability: 0.25 });
        assert_eq!(
            params.bath,
            BathParams::DiffusionLimited { population: 50, extent: 20, split_probability: 0.0 }
        );
    }

    #[test]
    fn rejects_zero_dimension() {
        let text = MINIMAL.replace("dimension = 2", "dimension = 0");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn rejects_probability_out_of_range() {
        let text = format!("{MINIMAL}\n[model]\nsticking_probability = 1.5\n");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn rejects_zero_reach() {
        let text = format!("{MINIMAL}\n[model]\nreach = 0\n");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn rejects_huge_reach() {
        let text = format!("{MINIMAL}\n[model]\nreach = 100000\n");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
        let text = format!("{MINIMAL}\n[model]\nreach = {MAX_REACH}\n");
        assert!(SimulationConfig::from_toml_str(&text).is_ok());
    }

    #[test]
    fn eden_requires_a_seed_cluster() {
        let text = format!("{MINIMAL}\n[bath]\nkind = \"eden\"\n");
        assert!(SimulationConfig::from_toml_str(&text).is_err());
    }
}
