pub mod cell_type;
pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use cell_type::{CellType, InteractionConfig, PerType};
pub use config::{
    BoundaryMode, CoolingCurve, EnergyConfig, EnergyEvaluation, LatticeConfig, OutputConfig,
    OutputFormat, SamplingConfig, SamplingStrategy, ScheduleConfig, SimulationConfig,
    TemperatureMode,
};
pub use sim_params::SimParams;
pub use snapshot::{Snapshot, SnapshotKind};
