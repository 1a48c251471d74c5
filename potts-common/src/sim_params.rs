use serde::{Deserialize, Serialize};
use crate::cell_type::PerType;
use crate::config::{BoundaryMode, CoolingCurve, EnergyEvaluation, SamplingStrategy, TemperatureMode};

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Lattice
    pub world_x: usize,
    pub world_y: usize,
    pub total_spins: u32,
    pub boundary_mode: BoundaryMode,

    // Energy
    pub interaction: [[f64; 3]; 3], // Symmetric, indexed by CellType::index()
    pub lambda_area: f64,
    pub target_areas: PerType<f64>,
    pub boundary_energies: PerType<f64>,
    pub evaluation: EnergyEvaluation,

    // Sampling
    pub sampling: SamplingStrategy,

    // Schedule
    pub steps: u64,
    pub temperature_mode: TemperatureMode,
    pub temp_constant: f64,
    pub temp_init: f64,
    pub temp_final: f64,
    pub cooling_curve: Option<CoolingCurve>, // Set whenever temperature_mode is Cooling

    // Output
    pub save_every: u64,
}

