use crate::hamiltonian::{EnergyTally, Hamiltonian};
use crate::lattice::LatticeState;
use crate::metropolis::{accept, TemperatureSchedule};
use crate::proposer::MutationProposer;
use crate::recorder::{Recorder, StepRecord};
use anyhow::Result;
use log::{debug, info, trace};
use potts_common::{EnergyEvaluation, SimParams, SimulationConfig, SnapshotKind};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of a complete run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Index of the last step executed.
    pub steps: u64,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub best_energy: f64,
    /// Number of accepted moves.
    pub accepted: u64,
}

impl RunSummary {
    pub fn acceptance_ratio(&self) -> f64 {
        self.accepted as f64 / (self.steps + 1) as f64
    }
}

/// Metropolis Monte Carlo / simulated annealing over a Potts lattice.
pub struct PottsSimulation {
    /// The simulation configuration.
    config: SimulationConfig,
    /// Runtime parameters derived from `config`.
    params: SimParams,
    hamiltonian: Hamiltonian,
    proposer: MutationProposer,
    schedule: TemperatureSchedule,
    /// The run's only random source.
    rng: StdRng,
    /// Seed `rng` was created from.
    seed: u64,
    current: LatticeState,
    current_energy: f64,
    /// Contact and area counts of `current`.
    tally: EnergyTally,
    /// Independent copy of the lowest-energy state seen.
    best: LatticeState,
    best_energy: f64,
    initial_energy: f64,
    /// Next step to execute.
    current_step: u64,
    accepted: u64,
}

impl PottsSimulation {
    /// Creates a simulation with a randomly initialized state.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.sampling.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let state = LatticeState::random(&config.get_sim_params(), &mut rng)?;
        Self::build(config, state, rng, seed)
    }

    /// Creates a simulation starting from a given state.
    pub fn from_state(config: SimulationConfig, state: LatticeState) -> Result<Self> {
        config.validate()?;
        let seed = config.sampling.seed.unwrap_or_else(|| rand::rng().random());
        let rng = StdRng::seed_from_u64(seed);
        Self::build(config, state, rng, seed)
    }

    fn build(config: SimulationConfig, state: LatticeState, rng: StdRng, seed: u64) -> Result<Self> {
        let params = config.get_sim_params();
        if state.lattice.world_x() != params.world_x || state.lattice.world_y() != params.world_y {
            anyhow::bail!(
                "State is {}x{} but the configuration expects {}x{}.",
                state.lattice.world_x(), state.lattice.world_y(), params.world_x, params.world_y
            );
        }
        if state.total_spins() != params.total_spins {
            anyhow::bail!(
                "State has {} typed spins but the configuration expects {}.",
                state.total_spins(), params.total_spins
            );
        }

        let hamiltonian = Hamiltonian::new(&params);
        let proposer = MutationProposer::new(&params);
        let schedule = TemperatureSchedule::from_params(&params)?;
        let tally = hamiltonian.tally(&state);
        let energy = hamiltonian.energy_of(&state.spin_types, &tally);
        debug!("Initial state energy {:.6} (seed {})", energy, seed);

        Ok(Self {
            config,
            params,
            hamiltonian,
            proposer,
            schedule,
            rng,
            seed,
            best: state.clone(),
            current: state,
            current_energy: energy,
            tally,
            best_energy: energy,
            initial_energy: energy,
            current_step: 0,
            accepted: 0,
        })
    }

    /// Executes one step: log, optional snapshot, propose, evaluate, accept/reject, track best.
    pub fn step(&mut self, recorder: &mut dyn Recorder) -> Result<StepRecord> {
        let step = self.current_step;
        let steps = self.params.steps;
        if step > steps {
            anyhow::bail!("Run already finished after step {}.", steps);
        }

        let temperature = self.schedule.temperature_at(step, steps);
        let record = StepRecord {
            step,
            temperature,
            current_energy: self.current_energy,
            best_energy: self.best_energy,
        };
        trace!("{} {} {} {}", step, temperature, self.current_energy, self.best_energy);
        recorder.record_step(&record)?;

        if step % self.params.save_every == 0 || step == steps {
            debug_assert_eq!(self.tally, self.hamiltonian.tally(&self.current));
            debug!("Saving snapshot at step {}", step);
            recorder.save_snapshot(self.current.snapshot(SnapshotKind::Periodic(step), self.current_energy))?;
        }

        let mutation = self.proposer.propose_move(&self.current.lattice, &mut self.rng)?;
        let change = self.hamiltonian.tally_change(&self.current, &mutation);
        self.tally.apply(&change);
        let candidate_energy = match self.params.evaluation {
            EnergyEvaluation::Incremental => self.hamiltonian.energy_of(&self.current.spin_types, &self.tally),
            EnergyEvaluation::Full => {
                let candidate = self.current.with_site(mutation.site, mutation.to);
                self.hamiltonian.energy(&candidate)
            }
        };

        if accept(self.current_energy, candidate_energy, temperature, &mut self.rng) {
            self.current.lattice.set_site(mutation.site, mutation.to);
            self.current_energy = candidate_energy;
            self.accepted += 1;
        } else {
            self.tally.revert(&change);
        }

        if self.current_energy < self.best_energy {
            self.best = self.current.clone();
            self.best_energy = self.current_energy;
        }

        self.current_step += 1;
        Ok(record)
    }

    /// Runs every remaining step, then saves the best state and finishes the recorder.
    pub fn run(&mut self, recorder: &mut dyn Recorder) -> Result<RunSummary> {
        self.run_with_progress(recorder, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_step` after each step.
    pub fn run_with_progress<F>(&mut self, recorder: &mut dyn Recorder, mut on_step: F) -> Result<RunSummary>
    where
        F: FnMut(&StepRecord),
    {
        let steps = self.params.steps;
        info!(
            "Starting {:?} sampling for {} steps ({:?} boundary, {:?} energy evaluation, seed {}).",
            self.proposer.strategy(),
            steps,
            self.hamiltonian.boundary_mode(),
            self.params.evaluation,
            self.seed
        );

        while self.current_step <= steps {
            let record = self.step(recorder)?;
            on_step(&record);
        }

        recorder.save_final(self.best.snapshot(SnapshotKind::Final, self.best_energy))?;
        recorder.finish()?;

        let summary = self.summary();
        info!(
            "Finished: initial energy {:.6}, final {:.6}, best {:.6}, accepted {} moves.",
            summary.initial_energy, summary.final_energy, summary.best_energy, summary.accepted
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            steps: self.current_step.saturating_sub(1),
            initial_energy: self.initial_energy,
            final_energy: self.current_energy,
            best_energy: self.best_energy,
            accepted: self.accepted,
        }
    }

    pub fn current_state(&self) -> &LatticeState {
        &self.current
    }

    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    pub fn best_state(&self) -> &LatticeState {
        &self.best
    }

    pub fn best_energy(&self) -> f64 {
        self.best_energy
    }

    pub fn initial_energy(&self) -> f64 {
        self.initial_energy
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn hamiltonian(&self) -> &Hamiltonian {
        &self.hamiltonian
    }

    /// Provides access to the simulation parameters.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Provides access to the original simulation configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Lattice, SpinTypes};
    use crate::recorder::MemoryRecorder;
    use potts_common::{BoundaryMode, SamplingStrategy};

    fn small_config(steps: u64, save_every: u64, seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.lattice.world_x = 4;
        config.lattice.world_y = 4;
        config.lattice.total_spins = 5;
        config.sampling.seed = Some(seed);
        config.schedule.steps = steps;
        config.output.save_every = save_every;
        config
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut a = PottsSimulation::new(small_config(300, 100, 17)).unwrap();
        let mut b = PottsSimulation::new(small_config(300, 100, 17)).unwrap();
        let mut ra = MemoryRecorder::new();
        let mut rb = MemoryRecorder::new();
        a.run(&mut ra).unwrap();
        b.run(&mut rb).unwrap();
        assert_eq!(ra.steps, rb.steps);
        assert_eq!(ra.final_snapshot, rb.final_snapshot);
    }

    #[test]
    fn best_state_is_independent_of_current() {
        let mut sim = PottsSimulation::new(small_config(500, 100, 3)).unwrap();
        let mut recorder = MemoryRecorder::new();
        sim.run(&mut recorder).unwrap();
        let recomputed = sim.hamiltonian().energy(sim.best_state());
        assert_eq!(recomputed, sim.best_energy());
        assert!(sim.best_energy() <= sim.current_energy());
    }

    #[test]
    fn stepping_past_the_end_fails() {
        let mut sim = PottsSimulation::new(small_config(2, 1, 1)).unwrap();
        let mut recorder = MemoryRecorder::new();
        sim.run(&mut recorder).unwrap();
        assert_eq!(recorder.steps.len(), 3);
        assert!(sim.step(&mut recorder).is_err());
    }

    #[test]
    fn uniform_start_aborts_neighbor_sampling() {
        let mut config = small_config(10, 5, 1);
        config.sampling.strategy = SamplingStrategy::Neighbor;
        let lattice = Lattice::uniform(4, 4, 0).unwrap();
        let types = SpinTypes::from_ids(&[0, 1, 0, 1, 2]).unwrap();
        let state = LatticeState::new(lattice, types).unwrap();
        let mut sim = PottsSimulation::from_state(config, state).unwrap();
        let mut recorder = MemoryRecorder::new();
        assert!(sim.run(&mut recorder).is_err());
        assert!(recorder.final_snapshot.is_none());
    }

    #[test]
    fn from_state_rejects_mismatched_shape() {
        let config = small_config(10, 5, 1);
        let lattice = Lattice::uniform(3, 4, 0).unwrap();
        let types = SpinTypes::from_ids(&[0, 1, 0, 1, 2]).unwrap();
        let state = LatticeState::new(lattice, types).unwrap();
        assert!(PottsSimulation::from_state(config, state).is_err());
    }

    #[test]
    fn tracked_energy_stays_exact_in_every_boundary_mode() {
        for mode in [BoundaryMode::Periodic, BoundaryMode::Open, BoundaryMode::BoundaryEnergy] {
            let mut config = small_config(400, 1000, 29);
            config.lattice.boundary_mode = mode;
            config.schedule.temp_constant = 20.0;
            let mut sim = PottsSimulation::new(config).unwrap();
            let mut recorder = MemoryRecorder::new();
            for _ in 0..400 {
                sim.step(&mut recorder).unwrap();
                let exact = sim.hamiltonian().energy(sim.current_state());
                assert_eq!(sim.current_energy().to_bits(), exact.to_bits(), "{mode:?}");
            }
        }
    }
}
