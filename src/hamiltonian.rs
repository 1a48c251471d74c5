use crate::lattice::{offset_in_bounds, wrap, LatticeState, SpinTypes, DIRECTIONS};
use crate::proposer::Mutation;
use log::trace;
use potts_common::{BoundaryMode, CellType, PerType, SimParams};

/// What lies in one direction from a site.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Neighbor {
    /// A lattice site, by flat index.
    Site(usize),
    /// The virtual boundary entity (boundary-energy mode only).
    Boundary,
    /// Nothing; the direction is skipped.
    Outside,
}

/// Neighbor enumeration policy of a boundary mode.
pub trait NeighborRule {
    /// Neighbor of (i, j) in direction `(di, dj)` on a `world_x` by `world_y` grid.
    fn neighbor(&self, i: usize, j: usize, step: (isize, isize), world_x: usize, world_y: usize) -> Neighbor;
}

impl NeighborRule for BoundaryMode {
    #[inline(always)]
    fn neighbor(&self, i: usize, j: usize, (di, dj): (isize, isize), world_x: usize, world_y: usize) -> Neighbor {
        match self {
            BoundaryMode::Periodic => {
                Neighbor::Site(wrap(i, di, world_x) * world_y + wrap(j, dj, world_y))
            }
            BoundaryMode::Open | BoundaryMode::BoundaryEnergy => {
                match (offset_in_bounds(i, di, world_x), offset_in_bounds(j, dj, world_y)) {
                    (Some(ni), Some(nj)) => Neighbor::Site(ni * world_y + nj),
                    _ if *self == BoundaryMode::BoundaryEnergy => Neighbor::Boundary,
                    _ => Neighbor::Outside,
                }
            }
        }
    }
}

/// The two terms of the Hamiltonian.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EnergyBreakdown {
    /// Adhesion energy over inter-cell (and boundary) contacts, already halved.
    pub surface: f64,
    /// Sum of quadratic area penalties.
    pub area: f64,
}

impl EnergyBreakdown {
    pub fn total(&self) -> f64 {
        self.surface + self.area
    }
}

/// Integer statistics of a lattice that fully determine its energy.
///
/// Every energy is evaluated from a tally in one fixed order, so a tally kept up to date
/// move by move and one rebuilt from the lattice give bit-identical energies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyTally {
    /// Directed contacts between different spins, indexed by (site type, neighbor type).
    contacts: [[u64; 3]; 3],
    /// Out-of-grid directions per site type. Only counted in boundary-energy mode.
    boundary: [u64; 3],
    /// Sites per spin.
    areas: Vec<u32>,
}

impl EnergyTally {
    pub fn contacts(&self, a: CellType, b: CellType) -> u64 {
        self.contacts[a.index()][b.index()]
    }

    pub fn boundary_contacts(&self, cell_type: CellType) -> u64 {
        self.boundary[cell_type.index()]
    }

    pub fn areas(&self) -> &[u32] {
        &self.areas
    }

    /// Moves the tally to the lattice after `change`.
    pub fn apply(&mut self, change: &TallyChange) {
        self.shift(change, 1);
        self.areas[change.from as usize] -= 1;
        self.areas[change.to as usize] += 1;
    }

    /// Undoes a previous [`apply`](Self::apply) of the same change.
    pub fn revert(&mut self, change: &TallyChange) {
        self.shift(change, -1);
        self.areas[change.to as usize] -= 1;
        self.areas[change.from as usize] += 1;
    }

    fn shift(&mut self, change: &TallyChange, sign: i64) {
        for a in 0..3 {
            for b in 0..3 {
                self.contacts[a][b] = self.contacts[a][b].wrapping_add_signed(sign * change.contacts[a][b]);
            }
            self.boundary[a] = self.boundary[a].wrapping_add_signed(sign * change.boundary[a]);
        }
    }
}

/// Difference between the tallies before and after one single-site mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyChange {
    contacts: [[i64; 3]; 3],
    boundary: [i64; 3],
    from: u32,
    to: u32,
}

/// Surface tension plus quadratic area constraint over a 2D lattice.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    boundary: BoundaryMode,
    interaction: [[f64; 3]; 3],
    lambda_area: f64,
    target_areas: PerType<f64>,
    boundary_energies: PerType<f64>,
}

impl Hamiltonian {
    pub fn new(params: &SimParams) -> Self {
        Hamiltonian {
            boundary: params.boundary_mode,
            interaction: params.interaction,
            lambda_area: params.lambda_area,
            target_areas: params.target_areas,
            boundary_energies: params.boundary_energies,
        }
    }

    pub fn boundary_mode(&self) -> BoundaryMode {
        self.boundary
    }

    /// Symmetric surface energy between two types.
    #[inline(always)]
    pub fn j(&self, a: CellType, b: CellType) -> f64 {
        self.interaction[a.index()][b.index()]
    }

    /// Penalty of one spin of `cell_type` covering `area` sites. Zero when the type has no positive target.
    #[inline(always)]
    pub fn area_penalty(&self, cell_type: CellType, area: u32) -> f64 {
        let target = self.target_areas.get(cell_type);
        if target > 0.0 {
            let diff = area as f64 - target;
            self.lambda_area * diff * diff
        } else {
            0.0
        }
    }

    /// Total energy of a state.
    pub fn energy(&self, state: &LatticeState) -> f64 {
        self.breakdown(state).total()
    }

    /// Full recomputation of both terms.
    pub fn breakdown(&self, state: &LatticeState) -> EnergyBreakdown {
        self.breakdown_of(&state.spin_types, &self.tally(state))
    }

    /// Total energy of a tally.
    pub fn energy_of(&self, types: &SpinTypes, tally: &EnergyTally) -> f64 {
        self.breakdown_of(types, tally).total()
    }

    /// Both terms of a tally, always summed in the same order.
    pub fn breakdown_of(&self, types: &SpinTypes, tally: &EnergyTally) -> EnergyBreakdown {
        let mut h = 0.0;
        for a in CellType::ALL {
            for b in CellType::ALL {
                h += tally.contacts(a, b) as f64 * self.j(a, b);
            }
        }
        // Doubled because the sum is halved below
        for t in CellType::ALL {
            h += tally.boundary_contacts(t) as f64 * 2.0 * self.boundary_energies.get(t);
        }

        let area = tally
            .areas
            .iter()
            .enumerate()
            .map(|(spin, &area)| self.area_penalty(types.type_of(spin as u32), area))
            .sum();

        EnergyBreakdown { surface: h / 2.0, area }
    }

    /// Counts contacts, boundary directions and areas over the whole lattice.
    pub fn tally(&self, state: &LatticeState) -> EnergyTally {
        trace!("Calculating hamiltonian");
        let lattice = &state.lattice;
        let types = &state.spin_types;
        let (world_x, world_y) = (lattice.world_x(), lattice.world_y());
        let mut tally = EnergyTally {
            contacts: [[0; 3]; 3],
            boundary: [0; 3],
            areas: vec![0u32; types.len()],
        };

        for i in 0..world_x {
            for j in 0..world_y {
                let self_spin = lattice.get(i, j);
                let self_type = types.type_of(self_spin).index();
                tally.areas[self_spin as usize] += 1;

                for step in DIRECTIONS {
                    match self.boundary.neighbor(i, j, step, world_x, world_y) {
                        Neighbor::Site(n) => {
                            let neighbor_spin = lattice.spin_at(n);
                            if neighbor_spin != self_spin {
                                tally.contacts[self_type][types.type_of(neighbor_spin).index()] += 1;
                            }
                        }
                        Neighbor::Boundary => tally.boundary[self_type] += 1,
                        Neighbor::Outside => {}
                    }
                }
            }
        }
        tally
    }

    /// Tally difference of applying `mutation` to `state`.
    ///
    /// Only the mutated site's four contacts are visited.
    pub fn tally_change(&self, state: &LatticeState, mutation: &Mutation) -> TallyChange {
        let Mutation { site, from, to } = *mutation;
        let mut change = TallyChange { contacts: [[0; 3]; 3], boundary: [0; 3], from, to };
        if from == to {
            return change;
        }
        let lattice = &state.lattice;
        let types = &state.spin_types;
        let (world_x, world_y) = (lattice.world_x(), lattice.world_y());
        let (i, j) = lattice.coords(site);
        let from_type = types.type_of(from).index();
        let to_type = types.type_of(to).index();

        for step in DIRECTIONS {
            match self.boundary.neighbor(i, j, step, world_x, world_y) {
                // A one-wide periodic axis makes the site its own neighbor; same spin, no contact
                Neighbor::Site(n) if n == site => {}
                Neighbor::Site(n) => {
                    let neighbor_spin = lattice.spin_at(n);
                    let neighbor_type = types.type_of(neighbor_spin).index();
                    // Both directed contacts, ours and the neighbor's
                    if neighbor_spin != from {
                        change.contacts[from_type][neighbor_type] -= 1;
                        change.contacts[neighbor_type][from_type] -= 1;
                    }
                    if neighbor_spin != to {
                        change.contacts[to_type][neighbor_type] += 1;
                        change.contacts[neighbor_type][to_type] += 1;
                    }
                }
                Neighbor::Boundary => {
                    change.boundary[from_type] -= 1;
                    change.boundary[to_type] += 1;
                }
                Neighbor::Outside => {}
            }
        }
        change
    }

    /// Energy change of applying `mutation` to `state`, whose tally is `tally`.
    ///
    /// Equals `energy(after) - energy(before)` exactly, both sides being evaluated from tallies.
    pub fn delta_energy(&self, state: &LatticeState, tally: &EnergyTally, mutation: &Mutation) -> f64 {
        let mut after = tally.clone();
        after.apply(&self.tally_change(state, mutation));
        self.energy_of(&state.spin_types, &after) - self.energy_of(&state.spin_types, tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Lattice, SpinTypes};
    use potts_common::SimulationConfig;

    fn params(mode: BoundaryMode) -> SimParams {
        let mut config = SimulationConfig::default();
        config.lattice.boundary_mode = mode;
        config.get_sim_params()
    }

    fn state(rows: &[Vec<u32>], type_ids: &[u32]) -> LatticeState {
        LatticeState::new(Lattice::from_rows(rows).unwrap(), SpinTypes::from_ids(type_ids).unwrap()).unwrap()
    }

    #[test]
    fn periodic_neighbors_wrap() {
        let mode = BoundaryMode::Periodic;
        assert_eq!(mode.neighbor(0, 0, (-1, 0), 3, 4), Neighbor::Site(8));
        assert_eq!(mode.neighbor(0, 3, (0, 1), 3, 4), Neighbor::Site(0));
        assert_eq!(mode.neighbor(1, 1, (1, 0), 3, 4), Neighbor::Site(9));
    }

    #[test]
    fn open_and_boundary_modes_differ_only_at_edges() {
        assert_eq!(BoundaryMode::Open.neighbor(0, 0, (-1, 0), 3, 4), Neighbor::Outside);
        assert_eq!(BoundaryMode::BoundaryEnergy.neighbor(0, 0, (-1, 0), 3, 4), Neighbor::Boundary);
        assert_eq!(BoundaryMode::Open.neighbor(1, 1, (0, -1), 3, 4), Neighbor::Site(4));
        assert_eq!(BoundaryMode::BoundaryEnergy.neighbor(1, 1, (0, -1), 3, 4), Neighbor::Site(4));
    }

    #[test]
    fn two_cells_side_by_side_periodic() {
        // Two light cells in one row of a 1x2 periodic lattice touch twice (left and right wrap)
        let h = Hamiltonian::new(&params(BoundaryMode::Periodic));
        let s = state(&[vec![0, 1]], &[0, 0, 2]);
        let e = h.breakdown(&s);
        assert_eq!(e.surface, 2.0 * 14.0);
        // Each light cell has area 1 against target 10, medium has no target
        assert_eq!(e.area, 2.0 * 10.0 * 81.0);
    }

    #[test]
    fn open_boundary_counts_each_contact_once() {
        let h = Hamiltonian::new(&params(BoundaryMode::Open));
        let s = state(&[vec![0, 1]], &[0, 1, 2]);
        assert_eq!(h.breakdown(&s).surface, 11.0);
        let tally = h.tally(&s);
        assert_eq!(tally.contacts(CellType::Light, CellType::Dark), 1);
        assert_eq!(tally.contacts(CellType::Dark, CellType::Light), 1);
        assert_eq!(tally.boundary_contacts(CellType::Light), 0);
        assert_eq!(tally.areas(), &[1, 1, 0]);
    }

    #[test]
    fn boundary_energy_charges_missing_neighbors() {
        let h = Hamiltonian::new(&params(BoundaryMode::BoundaryEnergy));
        // Single dark site: four missing directions at 100 each
        let s = state(&[vec![0]], &[1, 2]);
        assert_eq!(h.breakdown(&s).surface, 400.0);
        assert_eq!(h.tally(&s).boundary_contacts(CellType::Dark), 4);
        // Medium pays nothing at the edge
        let s = state(&[vec![1]], &[1, 2]);
        assert_eq!(h.breakdown(&s).surface, 0.0);
    }

    #[test]
    fn area_penalty_respects_theta() {
        let h = Hamiltonian::new(&params(BoundaryMode::Periodic));
        assert_eq!(h.area_penalty(CellType::Light, 10), 0.0);
        assert_eq!(h.area_penalty(CellType::Dark, 13), 90.0);
        assert_eq!(h.area_penalty(CellType::Medium, 10_000), 0.0);
        assert_eq!(h.area_penalty(CellType::Light, 0), 1000.0);
    }

    #[test]
    fn delta_matches_full_recomputation_on_small_grid() {
        for mode in [BoundaryMode::Periodic, BoundaryMode::Open, BoundaryMode::BoundaryEnergy] {
            let h = Hamiltonian::new(&params(mode));
            let s = state(&[vec![0, 0, 1], vec![2, 1, 1], vec![3, 3, 0]], &[0, 1, 0, 2]);
            let tally = h.tally(&s);
            let before = h.energy(&s);
            for site in 0..s.lattice.len() {
                for to in 0..s.total_spins() {
                    let from = s.lattice.spin_at(site);
                    let mutation = Mutation { site, from, to };
                    let after = s.with_site(site, to);
                    let mut updated = tally.clone();
                    updated.apply(&h.tally_change(&s, &mutation));
                    assert_eq!(updated, h.tally(&after), "{mode:?} site {site} {from}->{to}");
                    assert_eq!(h.energy_of(&s.spin_types, &updated), h.energy(&after));
                    assert_eq!(before + h.delta_energy(&s, &tally, &mutation), h.energy(&after));
                }
            }
        }
    }

    #[test]
    fn delta_handles_narrow_periodic_axes() {
        let h = Hamiltonian::new(&params(BoundaryMode::Periodic));
        let s = state(&[vec![0], vec![1]], &[0, 1, 2]);
        let tally = h.tally(&s);
        let mutation = Mutation { site: 0, from: 0, to: 2 };
        let mut updated = tally.clone();
        updated.apply(&h.tally_change(&s, &mutation));
        assert_eq!(updated, h.tally(&s.with_site(0, 2)));
    }

    #[test]
    fn revert_restores_tally() {
        let h = Hamiltonian::new(&params(BoundaryMode::BoundaryEnergy));
        let s = state(&[vec![0, 0, 1], vec![2, 1, 1], vec![3, 3, 0]], &[0, 1, 0, 2]);
        let tally = h.tally(&s);
        let change = h.tally_change(&s, &Mutation { site: 4, from: 1, to: 3 });
        let mut moved = tally.clone();
        moved.apply(&change);
        assert_ne!(moved, tally);
        moved.revert(&change);
        assert_eq!(moved, tally);
    }

    #[test]
    fn tracked_tally_gives_identical_energy_with_fractional_parameters() {
        use rand::prelude::*;
        let mut config = SimulationConfig::default();
        config.energy.interaction.light_light = 1.4;
        config.energy.interaction.dark_dark = 0.2;
        config.energy.interaction.light_dark = 1.1;
        config.energy.interaction.dark_medium = 1.6;
        config.energy.interaction.light_medium = 1.6;
        config.energy.lambda_area = 0.3;
        config.energy.target_areas = PerType::new(6.1, 5.7, -1.0);
        config.energy.boundary_energies = PerType::new(0.7, 0.35, 0.0);

        for mode in [BoundaryMode::Periodic, BoundaryMode::Open, BoundaryMode::BoundaryEnergy] {
            config.lattice.boundary_mode = mode;
            let h = Hamiltonian::new(&config.get_sim_params());
            let mut rng = StdRng::seed_from_u64(11);
            let lattice = Lattice::random(8, 7, 9, &mut rng).unwrap();
            let mut s = LatticeState::new(lattice, SpinTypes::random(9, &mut rng).unwrap()).unwrap();
            let mut tally = h.tally(&s);
            for _ in 0..2000 {
                let site = rng.random_range(0..s.lattice.len());
                let mutation = Mutation { site, from: s.lattice.spin_at(site), to: rng.random_range(0..9) };
                tally.apply(&h.tally_change(&s, &mutation));
                s.lattice.set_site(site, mutation.to);
                assert_eq!(h.energy_of(&s.spin_types, &tally).to_bits(), h.energy(&s).to_bits(), "{mode:?}");
            }
        }
    }
}
