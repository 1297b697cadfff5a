//! The `simulation` section of `dronehouse-config.yaml`.
//!
//! The scheduler ignores this section; only the simulation binary reads it.

use std::path::Path;

use serde::Deserialize;

use dronehouse_world::SimFarmLayout;

use crate::error::SimError;

/// Wrapper matching the top level of the config file.
#[derive(Debug, Default, Deserialize)]
struct SimFile {
    #[serde(default)]
    simulation: SimSettings,
}

/// How the headless run is set up.
#[derive(Debug, Clone, Deserialize)]
pub struct SimSettings {
    /// In-game days to simulate.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Scheduler ticks per real second.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,

    /// Seed for farm generation.
    #[serde(default)]
    pub seed: u64,

    /// Farm width in tiles.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Farm height in tiles.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Warehouses placed along the top edge.
    #[serde(default = "default_warehouses")]
    pub warehouses: u32,

    /// Farmers per warehouse; each gets one zone queued on day one.
    #[serde(default)]
    pub farmers_per_warehouse: u32,

    /// What the farm is scattered with.
    #[serde(default)]
    pub layout: SimFarmLayout,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            days: default_days(),
            ticks_per_second: default_ticks_per_second(),
            seed: 0,
            width: default_width(),
            height: default_height(),
            warehouses: default_warehouses(),
            farmers_per_warehouse: 0,
            layout: SimFarmLayout::default(),
        }
    }
}

impl SimSettings {
    /// Read the `simulation` section from the file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: SimFile = serde_yml::from_str(&contents)?;
        Ok(file.simulation)
    }

    /// Real seconds per tick.
    pub fn tick_secs(&self) -> f64 {
        1.0 / f64::from(self.ticks_per_second.max(1))
    }
}

const fn default_days() -> u32 {
    3
}

const fn default_ticks_per_second() -> u32 {
    60
}

const fn default_width() -> u32 {
    64
}

const fn default_height() -> u32 {
    48
}

const fn default_warehouses() -> u32 {
    1
}
