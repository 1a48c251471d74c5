use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::cell_type::{InteractionConfig, PerType};
use crate::sim_params::SimParams;
use std::path::Path;

/// How lattice edges are handled when enumerating neighbors in the Hamiltonian.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Indices wrap around; every site has four neighbors.
    Periodic,
    /// Neighbors outside the grid are skipped.
    Open,
    /// Neighbors outside the grid are a virtual boundary with a per-type energy.
    BoundaryEnergy,
}

/// Which move generator the proposer uses.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// Copy the spin of a random orthogonal neighbor into a random site.
    Neighbor,
    /// Assign any other spin id to a random site.
    Global,
}

#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureMode {
    Constant,
    Cooling,
}

/// Interpolation between `temp_init` and `temp_final` in cooling mode.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoolingCurve {
    Geometric,
    Linear,
}

/// Whether candidate energies are recomputed over the full lattice or from the local delta.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnergyEvaluation {
    Incremental,
    Full,
}

#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Bincode,
    Messagepack,
}

// Configuration for the lattice geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    pub world_x: usize,
    pub world_y: usize,
    pub total_spins: u32,
    #[serde(default = "default_boundary_mode")]
    pub boundary_mode: BoundaryMode,
}

// Configuration for the mutation proposer
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_sampling_strategy")]
    pub strategy: SamplingStrategy,
    /// Seed for the run's random generator. A random seed is drawn (and logged) when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

// Configuration for the step loop and temperature schedule
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_temperature_mode")]
    pub mode: TemperatureMode,
    pub steps: u64,
    #[serde(default = "default_temp_constant")]
    pub temp_constant: f64,
    #[serde(default = "default_temp_init")]
    pub temp_init: f64,
    #[serde(default = "default_temp_final")]
    pub temp_final: f64,
    /// Required in cooling mode; there is no implied curve.
    #[serde(default)]
    pub cooling_curve: Option<CoolingCurve>,
}

// Parameters of the Hamiltonian
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EnergyConfig {
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default = "default_lambda_area")]
    pub lambda_area: f64,
    #[serde(default = "default_target_areas")]
    pub target_areas: PerType<f64>,
    #[serde(default = "default_boundary_energies")]
    pub boundary_energies: PerType<f64>,
    #[serde(default = "default_energy_evaluation")]
    pub evaluation: EnergyEvaluation,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    pub save_every: u64,
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
    #[serde(default = "default_summary_filename")]
    pub summary_filename: String,
}

/// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
    pub output: OutputConfig,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            strategy: default_sampling_strategy(),
            seed: None,
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        EnergyConfig {
            interaction: InteractionConfig::default(),
            lambda_area: default_lambda_area(),
            target_areas: default_target_areas(),
            boundary_energies: default_boundary_energies(),
            evaluation: default_energy_evaluation(),
        }
    }
}

impl Default for SimulationConfig {
    /// The 50x50 tissue-sorting setup with 200 cells and one medium spin.
    fn default() -> Self {
        SimulationConfig {
            lattice: LatticeConfig {
                world_x: 50,
                world_y: 50,
                total_spins: 201,
                boundary_mode: default_boundary_mode(),
            },
            sampling: SamplingConfig::default(),
            schedule: ScheduleConfig {
                mode: default_temperature_mode(),
                steps: 2_500_000,
                temp_constant: default_temp_constant(),
                temp_init: default_temp_init(),
                temp_final: default_temp_final(),
                cooling_curve: None,
            },
            energy: EnergyConfig::default(),
            output: OutputConfig {
                directory: default_output_directory(),
                base_filename: default_base_filename(),
                save_every: 1000,
                format: default_output_format(),
                summary_filename: default_summary_filename(),
            },
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

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the engine cannot run. Never alters values.
    pub fn validate(&self) -> Result<()> {
        if self.lattice.world_x == 0 || self.lattice.world_y == 0 {
            anyhow::bail!("world_x and world_y must be greater than 0.");
        }
        if self.lattice.total_spins < 2 {
            anyhow::bail!("total_spins must be at least 2 (one cell plus the medium).");
        }
        if self.output.save_every == 0 {
            anyhow::bail!("save_every must be greater than 0.");
        }

        let energy = &self.energy;
        let all_finite = energy.interaction.values().iter()
            .chain(energy.target_areas.to_array().iter())
            .chain(energy.boundary_energies.to_array().iter())
            .all(|v| v.is_finite());
        if !all_finite || !energy.lambda_area.is_finite() {
            anyhow::bail!("energy parameters must be finite numbers.");
        }
        if energy.lambda_area < 0.0 {
            anyhow::bail!("lambda_area must not be negative.");
        }

        match self.schedule.mode {
            TemperatureMode::Constant => {
                if !(self.schedule.temp_constant > 0.0) {
                    anyhow::bail!("temp_constant must be positive.");
                }
            }
            TemperatureMode::Cooling => {
                if !(self.schedule.temp_init > 0.0) || !(self.schedule.temp_final > 0.0) {
                    anyhow::bail!("temp_init and temp_final must be positive in cooling mode.");
                }
                if self.schedule.cooling_curve.is_none() {
                    anyhow::bail!("cooling mode requires an explicit cooling_curve (\"geometric\" or \"linear\").");
                }
            }
        }

        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let world_x = self.lattice.world_x;
        let world_y = self.lattice.world_y;
        let total_spins = self.lattice.total_spins;

        SimParams {
            // Lattice
            world_x,
            world_y,
            total_spins,
            boundary_mode: self.lattice.boundary_mode,
            // Energy
            interaction: self.energy.interaction.to_matrix(),
            lambda_area: self.energy.lambda_area,
            target_areas: self.energy.target_areas,
            boundary_energies: self.energy.boundary_energies,
            evaluation: self.energy.evaluation,
            // Sampling
            sampling: self.sampling.strategy,
            // Schedule
            steps: self.schedule.steps,
            temperature_mode: self.schedule.mode,
            temp_constant: self.schedule.temp_constant,
            temp_init: self.schedule.temp_init,
            temp_final: self.schedule.temp_final,
            cooling_curve: self.schedule.cooling_curve,
            // Output
            save_every: self.output.save_every,
        }
    }
}

// Default functions for optional settings
fn default_boundary_mode() -> BoundaryMode {
    BoundaryMode::Periodic
}

fn default_sampling_strategy() -> SamplingStrategy {
    SamplingStrategy::Neighbor
}

fn default_temperature_mode() -> TemperatureMode {
    TemperatureMode::Constant
}

fn default_temp_constant() -> f64 {
    0.1
}

fn default_temp_init() -> f64 {
    1000.0
}

fn default_temp_final() -> f64 {
    0.1
}

fn default_lambda_area() -> f64 {
    10.0
}

fn default_target_areas() -> PerType<f64> {
    PerType::new(10.0, 10.0, -1.0) // Medium has no target area
}

fn default_boundary_energies() -> PerType<f64> {
    PerType::new(100.0, 100.0, 0.0) // Small cost for non-medium cells touching the edge
}

fn default_energy_evaluation() -> EnergyEvaluation {
    EnergyEvaluation::Incremental
}

fn default_output_directory() -> String {
    "results".to_string()
}

fn default_base_filename() -> String {
    "potts".to_string()
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Csv
}

fn default_summary_filename() -> String {
    "summary.csv".to_string()
}
