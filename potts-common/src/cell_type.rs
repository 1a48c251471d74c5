use serde::{Deserialize, Serialize};
use std::fmt;

/// Tissue category of a spin. Fixed for the lifetime of a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Light,
    Dark,
    Medium,
}

impl CellType {
    /// All types in id order.
    pub const ALL: [CellType; 3] = [CellType::Light, CellType::Dark, CellType::Medium];

    /// Types a foreground (non-background) spin may be assigned.
    pub const FOREGROUND: [CellType; 2] = [CellType::Light, CellType::Dark];

    /// Numeric id used in type matrices (Light = 0, Dark = 1, Medium = 2).
    #[inline(always)]
    pub fn id(self) -> u8 {
        match self {
            CellType::Light => 0,
            CellType::Dark => 1,
            CellType::Medium => 2,
        }
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.id() as usize
    }

    /// Inverse of [`CellType::id`].
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CellType::Light),
            1 => Some(CellType::Dark),
            2 => Some(CellType::Medium),
            _ => None,
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellType::Light => "light",
            CellType::Dark => "dark",
            CellType::Medium => "medium",
        };
        f.write_str(name)
    }
}

/// One value per cell type, e.g. target areas or boundary energies.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerType<T> {
    pub light: T,
    pub dark: T,
    pub medium: T,
}

impl<T: Copy> PerType<T> {
    pub fn new(light: T, dark: T, medium: T) -> Self {
        PerType { light, dark, medium }
    }

    #[inline(always)]
    pub fn get(&self, cell_type: CellType) -> T {
        match cell_type {
            CellType::Light => self.light,
            CellType::Dark => self.dark,
            CellType::Medium => self.medium,
        }
    }

    pub fn to_array(&self) -> [T; 3] {
        [self.light, self.dark, self.medium]
    }
}

/// The six independent surface energies of the symmetric 3x3 interaction table.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub light_light: f64,
    pub dark_dark: f64,
    pub medium_medium: f64,
    pub light_dark: f64,
    pub dark_medium: f64,
    pub light_medium: f64,
}

impl InteractionConfig {
    /// Expands the six values into the full symmetric table indexed by [`CellType::index`].
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.light_light, self.light_dark, self.light_medium],
            [self.light_dark, self.dark_dark, self.dark_medium],
            [self.light_medium, self.dark_medium, self.medium_medium],
        ]
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.light_light,
            self.dark_dark,
            self.medium_medium,
            self.light_dark,
            self.dark_medium,
            self.light_medium,
        ]
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            light_light: 14.0,
            dark_dark: 2.0,
            medium_medium: 0.0,
            light_dark: 11.0,
            dark_medium: 16.0,
            light_medium: 16.0,
        }
    }
}
