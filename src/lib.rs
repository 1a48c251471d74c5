//! Multistate cellular Potts model driven by Metropolis Monte Carlo.
//!
//! A [`lattice::LatticeState`] is scored by the [`hamiltonian::Hamiltonian`], perturbed one site at
//! a time by the [`proposer::MutationProposer`] and evolved by [`simulation::PottsSimulation`],
//! which reports to a [`recorder::Recorder`].

pub mod hamiltonian;
pub mod lattice;
pub mod matrix_io;
pub mod metropolis;
pub mod proposer;
pub mod recorder;
pub mod simulation;

pub use hamiltonian::{EnergyBreakdown, EnergyTally, Hamiltonian, Neighbor, NeighborRule, TallyChange};
pub use lattice::{Lattice, LatticeState, SpinTypes};
pub use metropolis::{accept, TemperatureSchedule};
pub use proposer::{Mutation, MutationProposer};
pub use recorder::{FileRecorder, MemoryRecorder, Recorder, StepRecord};
pub use simulation::{PottsSimulation, RunSummary};
