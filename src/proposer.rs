use crate::lattice::{wrap, Lattice, LatticeState, DIRECTIONS};
use anyhow::Result;
use log::trace;
use potts_common::{SamplingStrategy, SimParams};
use rand::Rng;

/// A single-site change: `site` goes from spin `from` to spin `to`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub site: usize,
    pub from: u32,
    pub to: u32,
}

/// Draws single-site moves with the configured sampling strategy.
#[derive(Debug, Clone)]
pub struct MutationProposer {
    strategy: SamplingStrategy,
    total_spins: u32,
}

impl MutationProposer {
    pub fn new(params: &SimParams) -> Self {
        Self::with_strategy(params.sampling, params.total_spins)
    }

    pub fn with_strategy(strategy: SamplingStrategy, total_spins: u32) -> Self {
        MutationProposer { strategy, total_spins }
    }

    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Picks a move without copying the lattice. Always `from != to`.
    pub fn propose_move<R: Rng + ?Sized>(&self, lattice: &Lattice, rng: &mut R) -> Result<Mutation> {
        let mutation = match self.strategy {
            SamplingStrategy::Neighbor => neighbor_move(lattice, rng)?,
            SamplingStrategy::Global => global_move(lattice, self.total_spins, rng)?,
        };
        trace!(
            "Flipping spin {} to {} at {:?}",
            mutation.from,
            mutation.to,
            lattice.coords(mutation.site)
        );
        Ok(mutation)
    }

    /// Candidate state differing from `state` in exactly one site. `state` is not modified.
    pub fn propose<R: Rng + ?Sized>(&self, state: &LatticeState, rng: &mut R) -> Result<LatticeState> {
        let mutation = self.propose_move(&state.lattice, rng)?;
        Ok(state.with_site(mutation.site, mutation.to))
    }
}

/// A random site takes the spin of a random orthogonal neighbor (wrapping at the edges).
fn neighbor_move<R: Rng + ?Sized>(lattice: &Lattice, rng: &mut R) -> Result<Mutation> {
    if lattice.is_uniform() {
        anyhow::bail!("All spins same in world, neighbor sampling not possible!");
    }
    let (world_x, world_y) = (lattice.world_x(), lattice.world_y());
    loop {
        let i1 = rng.random_range(0..world_x);
        let j1 = rng.random_range(0..world_y);
        let (di, dj) = DIRECTIONS[rng.random_range(0..DIRECTIONS.len())];
        let i2 = wrap(i1, di, world_x);
        let j2 = wrap(j1, dj, world_y);

        let spin1 = lattice.get(i1, j1);
        let spin2 = lattice.get(i2, j2);
        if spin1 != spin2 {
            return Ok(Mutation { site: lattice.index(i1, j1), from: spin1, to: spin2 });
        }
    }
}

/// A random site takes any other spin id.
fn global_move<R: Rng + ?Sized>(lattice: &Lattice, total_spins: u32, rng: &mut R) -> Result<Mutation> {
    if total_spins < 2 {
        anyhow::bail!("Global sampling needs at least two spins, got {}.", total_spins);
    }
    let site = rng.random_range(0..lattice.len());
    let from = lattice.spin_at(site);
    let mut to = from;
    while to == from {
        to = rng.random_range(0..total_spins);
    }
    Ok(Mutation { site, from, to })
}
