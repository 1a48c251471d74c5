//! Physical properties of the Potts Hamiltonian.

use potts_common::{BoundaryMode, CellType, SimulationConfig};
use potts_engine::{Hamiltonian, Lattice, LatticeState, SpinTypes};

use rand::rngs::StdRng;
use rand::SeedableRng;

fn hamiltonian(mode: BoundaryMode) -> Hamiltonian {
    let mut config = SimulationConfig::default();
    config.lattice.boundary_mode = mode;
    Hamiltonian::new(&config.get_sim_params())
}

fn random_state(world_x: usize, world_y: usize, total_spins: u32, seed: u64) -> LatticeState {
    let mut rng = StdRng::seed_from_u64(seed);
    let lattice = Lattice::random(world_x, world_y, total_spins, &mut rng).unwrap();
    let types = SpinTypes::random(total_spins, &mut rng).unwrap();
    LatticeState::new(lattice, types).unwrap()
}

#[test]
fn interaction_table_is_symmetric() {
    let h = hamiltonian(BoundaryMode::Periodic);
    for a in CellType::ALL {
        for b in CellType::ALL {
            assert_eq!(h.j(a, b), h.j(b, a), "J({a},{b})");
        }
    }
}

#[test]
fn uniform_lattice_has_no_surface_energy() {
    let types = SpinTypes::from_ids(&[0, 1, 0, 2]).unwrap();
    for spin in 0..4 {
        let state = LatticeState::new(Lattice::uniform(7, 5, spin).unwrap(), types.clone()).unwrap();
        for mode in [BoundaryMode::Periodic, BoundaryMode::Open] {
            assert_eq!(hamiltonian(mode).breakdown(&state).surface, 0.0, "{mode:?} spin {spin}");
        }
    }
    // At the edges only the boundary term remains, and medium pays none
    let medium = LatticeState::new(Lattice::uniform(7, 5, 3).unwrap(), types).unwrap();
    assert_eq!(hamiltonian(BoundaryMode::BoundaryEnergy).breakdown(&medium).surface, 0.0);
}

#[test]
fn periodic_energy_is_translation_invariant() {
    let h = hamiltonian(BoundaryMode::Periodic);
    for seed in 0..5 {
        let state = random_state(9, 6, 12, seed);
        let reference = h.energy(&state);
        for (di, dj) in [(1, 0), (0, 1), (4, -2), (-7, 3), (9, 6)] {
            let shifted = LatticeState::new(state.lattice.shifted(di, dj), state.spin_types.clone()).unwrap();
            assert_eq!(h.energy(&shifted), reference, "seed {seed} shift ({di},{dj})");
        }
    }
}

#[test]
fn open_boundary_is_not_translation_invariant_in_general() {
    let h = hamiltonian(BoundaryMode::Open);
    let lattice = Lattice::from_rows(&[vec![0, 1, 1], vec![1, 1, 1], vec![1, 1, 1]]).unwrap();
    let types = SpinTypes::from_ids(&[0, 2]).unwrap();
    let corner = LatticeState::new(lattice.clone(), types.clone()).unwrap();
    let centre = LatticeState::new(lattice.shifted(1, 1), types).unwrap();
    // The lone light site touches medium on two sides in the corner, four in the centre
    assert_eq!(h.breakdown(&corner).surface, 2.0 * 16.0);
    assert_eq!(h.breakdown(&centre).surface, 4.0 * 16.0);
}

#[test]
fn area_penalty_of_single_cell_is_exact() {
    let h = hamiltonian(BoundaryMode::Periodic);
    // Spin 0 covers `a` sites of a 4x4 lattice, the medium (spin 1) covers the rest
    for a in 0..=16usize {
        let spins: Vec<u32> = (0..16).map(|site| if site < a { 0 } else { 1 }).collect();
        let lattice = Lattice::new(4, 4, spins).unwrap();

        let light = LatticeState::new(lattice.clone(), SpinTypes::from_ids(&[0, 2]).unwrap()).unwrap();
        let expected = 10.0 * (a as f64 - 10.0).powi(2);
        assert_eq!(h.breakdown(&light).area, expected, "a = {a}");

        // A medium-typed cell has no target area
        let medium = LatticeState::new(lattice, SpinTypes::from_ids(&[2, 2]).unwrap()).unwrap();
        assert_eq!(h.breakdown(&medium).area, 0.0, "a = {a}");
    }
}

#[test]
fn boundary_energy_mode_adds_edge_cost_on_top_of_open_mode() {
    let state = random_state(6, 8, 10, 99);
    let open = hamiltonian(BoundaryMode::Open).breakdown(&state);
    let edged = hamiltonian(BoundaryMode::BoundaryEnergy).breakdown(&state);

    let mut edge_cost = 0.0;
    let lattice = &state.lattice;
    for i in 0..lattice.world_x() {
        for j in 0..lattice.world_y() {
            let missing = [i == 0, i + 1 == lattice.world_x(), j == 0, j + 1 == lattice.world_y()]
                .iter()
                .filter(|m| **m)
                .count();
            let t = state.spin_types.type_of(lattice.get(i, j));
            let b = match t {
                CellType::Light | CellType::Dark => 100.0,
                CellType::Medium => 0.0,
            };
            edge_cost += missing as f64 * b;
        }
    }
    assert_eq!(edged.surface, open.surface + edge_cost);
    assert_eq!(edged.area, open.area);
}
