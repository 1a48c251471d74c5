use serde::{Serialize, Deserialize};

/// Why a snapshot was taken.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Current state at a save interval (or the last step).
    Periodic(u64),
    /// Best state found over the whole run.
    Final,
}

/// A copy of the lattice at a point in the run, with its derived type grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    /// Number of rows (first lattice index).
    pub world_x: usize,
    /// Number of columns (second lattice index).
    pub world_y: usize,
    /// Spin id per site, row-major.
    pub spins: Vec<u32>,
    /// Type id per site (Light = 0, Dark = 1, Medium = 2), row-major.
    pub types: Vec<u8>,
    /// Hamiltonian of the captured state.
    pub energy: f64,
}

impl Snapshot {
    /// Spin ids as rows, the layout written to matrix files.
    pub fn spin_rows(&self) -> Vec<&[u32]> {
        self.spins.chunks(self.world_y.max(1)).collect()
    }

    /// Type ids as rows.
    pub fn type_rows(&self) -> Vec<&[u8]> {
        self.types.chunks(self.world_y.max(1)).collect()
    }
}
