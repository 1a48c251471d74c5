use anyhow::Result;
use potts_common::{CellType, SimParams, Snapshot, SnapshotKind};
use rand::Rng;
use std::sync::Arc;

/// Orthogonal directions, in the order neighbors are enumerated.
pub const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Flat row-major index of site (i, j).
#[inline(always)]
pub fn site_index(i: usize, j: usize, world_y: usize) -> usize {
    i * world_y + j
}

/// Wraps `coord + step` into `[0, dim)`.
#[inline(always)]
pub fn wrap(coord: usize, step: isize, dim: usize) -> usize {
    (coord as isize + step).rem_euclid(dim as isize) as usize
}

/// Returns `coord + step` when it stays inside `[0, dim)`.
#[inline(always)]
pub fn offset_in_bounds(coord: usize, step: isize, dim: usize) -> Option<usize> {
    let next = coord as isize + step;
    if next >= 0 && next < dim as isize {
        Some(next as usize)
    } else {
        None
    }
}

/// A `world_x` by `world_y` grid of spin ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    world_x: usize,
    world_y: usize,
    spins: Vec<u32>,
}

impl Lattice {
    /// Wraps row-major spin ids. Fails if the length does not match the dimensions.
    pub fn new(world_x: usize, world_y: usize, spins: Vec<u32>) -> Result<Self> {
        if world_x == 0 || world_y == 0 {
            anyhow::bail!("Lattice dimensions must be non-zero, got {}x{}.", world_x, world_y);
        }
        if spins.len() != world_x * world_y {
            anyhow::bail!(
                "Lattice {}x{} needs {} sites, got {}.",
                world_x, world_y, world_x * world_y, spins.len()
            );
        }
        Ok(Self { world_x, world_y, spins })
    }

    /// Builds a lattice from equally long rows.
    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self> {
        let world_x = rows.len();
        let world_y = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().position(|r| r.len() != world_y) {
            anyhow::bail!("Row {} has {} columns, expected {}.", bad, rows[bad].len(), world_y);
        }
        Self::new(world_x, world_y, rows.concat())
    }

    /// Every site carries `spin`.
    pub fn uniform(world_x: usize, world_y: usize, spin: u32) -> Result<Self> {
        Self::new(world_x, world_y, vec![spin; world_x * world_y])
    }

    /// Each site gets a spin drawn uniformly from `[0, total_spins)`.
    pub fn random<R: Rng + ?Sized>(world_x: usize, world_y: usize, total_spins: u32, rng: &mut R) -> Result<Self> {
        if total_spins == 0 {
            anyhow::bail!("Cannot draw spins from an empty spin space.");
        }
        let spins = (0..world_x * world_y).map(|_| rng.random_range(0..total_spins)).collect();
        Self::new(world_x, world_y, spins)
    }

    #[inline(always)]
    pub fn world_x(&self) -> usize {
        self.world_x
    }

    #[inline(always)]
    pub fn world_y(&self) -> usize {
        self.world_y
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.spins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }

    #[inline(always)]
    pub fn spins(&self) -> &[u32] {
        &self.spins
    }

    #[inline(always)]
    pub fn index(&self, i: usize, j: usize) -> usize {
        site_index(i, j, self.world_y)
    }

    /// (row, column) of a flat index.
    #[inline(always)]
    pub fn coords(&self, site: usize) -> (usize, usize) {
        (site / self.world_y, site % self.world_y)
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.spins[self.index(i, j)]
    }

    #[inline(always)]
    pub fn spin_at(&self, site: usize) -> u32 {
        self.spins[site]
    }

    /// Overwrites one site in place. Used by the controller after a move is accepted.
    #[inline(always)]
    pub fn set_site(&mut self, site: usize, spin: u32) {
        self.spins[site] = spin;
    }

    /// Copy of this lattice with one site changed. `self` is untouched.
    pub fn with_site(&self, site: usize, spin: u32) -> Lattice {
        let mut next = self.clone();
        next.spins[site] = spin;
        next
    }

    /// True when every site carries the same spin.
    pub fn is_uniform(&self) -> bool {
        match self.spins.split_first() {
            Some((first, rest)) => rest.iter().all(|s| s == first),
            None => true,
        }
    }

    /// Largest spin id on the lattice.
    pub fn max_spin(&self) -> Option<u32> {
        self.spins.iter().copied().max()
    }

    /// Circular shift by (di, dj) rows/columns: site (i, j) moves to (i + di, j + dj).
    pub fn shifted(&self, di: isize, dj: isize) -> Lattice {
        let mut spins = vec![0u32; self.spins.len()];
        for i in 0..self.world_x {
            for j in 0..self.world_y {
                let ti = wrap(i, di, self.world_x);
                let tj = wrap(j, dj, self.world_y);
                spins[site_index(ti, tj, self.world_y)] = self.get(i, j);
            }
        }
        Lattice { world_x: self.world_x, world_y: self.world_y, spins }
    }

    /// Number of sites where the two lattices differ. Panics on mismatched dimensions.
    pub fn diff_count(&self, other: &Lattice) -> usize {
        assert_eq!((self.world_x, self.world_y), (other.world_x, other.world_y));
        self.spins.iter().zip(other.spins.iter()).filter(|(a, b)| a != b).count()
    }
}

/// Spin -> type mapping. Immutable and shared by every state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinTypes(Arc<[CellType]>);

impl SpinTypes {
    /// Uses the given mapping as is.
    pub fn new(types: Vec<CellType>) -> Self {
        SpinTypes(types.into())
    }

    /// Random Light/Dark for every spin except the last, which is the Medium background.
    pub fn random<R: Rng + ?Sized>(total_spins: u32, rng: &mut R) -> Result<Self> {
        if total_spins == 0 {
            anyhow::bail!("At least one spin is required for the background.");
        }
        let mut types: Vec<CellType> = (0..total_spins - 1)
            .map(|_| CellType::FOREGROUND[rng.random_range(0..CellType::FOREGROUND.len())])
            .collect();
        types.push(CellType::Medium);
        Ok(Self::new(types))
    }

    /// Parses numeric type ids (0 = Light, 1 = Dark, 2 = Medium).
    pub fn from_ids(ids: &[u32]) -> Result<Self> {
        let types = ids
            .iter()
            .enumerate()
            .map(|(spin, &id)| {
                u8::try_from(id)
                    .ok()
                    .and_then(CellType::from_id)
                    .ok_or_else(|| anyhow::anyhow!("Spin {} has unknown type id {}.", spin, id))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(types))
    }

    #[inline(always)]
    pub fn type_of(&self, spin: u32) -> CellType {
        self.0[spin as usize]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[CellType] {
        &self.0
    }
}

/// A lattice together with its spin -> type mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeState {
    pub lattice: Lattice,
    pub spin_types: SpinTypes,
}

impl LatticeState {
    /// Pairs a lattice with a mapping, checking that every spin on the lattice has a type.
    pub fn new(lattice: Lattice, spin_types: SpinTypes) -> Result<Self> {
        if let Some(max) = lattice.max_spin() {
            if max as usize >= spin_types.len() {
                anyhow::bail!(
                    "Lattice contains spin {} but only {} spins have a type.",
                    max,
                    spin_types.len()
                );
            }
        }
        Ok(Self { lattice, spin_types })
    }

    /// Random lattice and random types, with the last spin forced to Medium.
    pub fn random<R: Rng + ?Sized>(params: &SimParams, rng: &mut R) -> Result<Self> {
        let lattice = Lattice::random(params.world_x, params.world_y, params.total_spins, rng)?;
        let spin_types = SpinTypes::random(params.total_spins, rng)?;
        Self::new(lattice, spin_types)
    }

    #[inline(always)]
    pub fn total_spins(&self) -> u32 {
        self.spin_types.len() as u32
    }

    /// Type id at every site, row-major.
    pub fn types_grid(&self) -> Vec<u8> {
        self.lattice
            .spins()
            .iter()
            .map(|&spin| self.spin_types.type_of(spin).id())
            .collect()
    }

    /// Same mapping, one site changed.
    pub fn with_site(&self, site: usize, spin: u32) -> LatticeState {
        LatticeState {
            lattice: self.lattice.with_site(site, spin),
            spin_types: self.spin_types.clone(),
        }
    }

    pub fn snapshot(&self, kind: SnapshotKind, energy: f64) -> Snapshot {
        Snapshot {
            kind,
            world_x: self.lattice.world_x(),
            world_y: self.lattice.world_y(),
            spins: self.lattice.spins().to_vec(),
            types: self.types_grid(),
            energy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn wrap_and_bounds() {
        assert_eq!(wrap(0, -1, 5), 4);
        assert_eq!(wrap(4, 1, 5), 0);
        assert_eq!(wrap(2, 1, 5), 3);
        assert_eq!(offset_in_bounds(0, -1, 5), None);
        assert_eq!(offset_in_bounds(4, 1, 5), None);
        assert_eq!(offset_in_bounds(3, 1, 5), Some(4));
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        assert!(Lattice::new(2, 3, vec![0; 5]).is_err());
        assert!(Lattice::new(0, 3, vec![]).is_err());
        assert!(Lattice::from_rows(&[vec![0, 1], vec![2]]).is_err());
    }

    #[test]
    fn with_site_leaves_original_untouched() {
        let lattice = Lattice::from_rows(&[vec![0, 1], vec![2, 3]]).unwrap();
        let next = lattice.with_site(lattice.index(1, 0), 7);
        assert_eq!(lattice.get(1, 0), 2);
        assert_eq!(next.get(1, 0), 7);
        assert_eq!(lattice.diff_count(&next), 1);
    }

    #[test]
    fn shift_moves_sites_circularly() {
        let lattice = Lattice::from_rows(&[vec![0, 1, 2], vec![3, 4, 5]]).unwrap();
        let shifted = lattice.shifted(1, -1);
        assert_eq!(shifted.get(1, 2), 0);
        assert_eq!(shifted.get(0, 0), 4);
        assert_eq!(shifted.shifted(-1, 1), lattice);
    }

    #[test]
    fn random_types_force_medium_background() {
        let mut rng = StdRng::seed_from_u64(3);
        let types = SpinTypes::random(50, &mut rng).unwrap();
        assert_eq!(types.len(), 50);
        assert_eq!(types.type_of(49), CellType::Medium);
        assert!(types.as_slice()[..49].iter().all(|t| *t != CellType::Medium));
    }

    #[test]
    fn state_rejects_untyped_spins() {
        let lattice = Lattice::from_rows(&[vec![0, 3]]).unwrap();
        let types = SpinTypes::from_ids(&[0, 1, 2]).unwrap();
        assert!(LatticeState::new(lattice, types).is_err());
        assert!(SpinTypes::from_ids(&[0, 5]).is_err());
    }

    #[test]
    fn types_grid_follows_mapping() {
        let lattice = Lattice::from_rows(&[vec![0, 1], vec![2, 2]]).unwrap();
        let types = SpinTypes::from_ids(&[1, 0, 2]).unwrap();
        let state = LatticeState::new(lattice, types).unwrap();
        assert_eq!(state.types_grid(), vec![1, 0, 2, 2]);
    }
}
