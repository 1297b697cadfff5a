//! Configuration loading and typed config structures for the drone scheduler.
//!
//! The canonical configuration lives in `dronehouse-config.yaml` at the
//! project root. Every field has a default, so an empty file (or a missing
//! section) yields a working setup. [`DroneConfig::sanitized`] clamps every
//! tunable into the range the in-game settings menu allows.

use std::path::Path;

use serde::Deserialize;

use dronehouse_agents::RoleTiming;
use dronehouse_types::Role;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DroneConfig {
    /// Scan cadence and flight restrictions.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Ledger maxima and chest size.
    #[serde(default)]
    pub capacities: CapacityConfig,

    /// Roster limits and defaults.
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Harvester behaviour.
    #[serde(default)]
    pub harvester: HarvesterConfig,

    /// Waterer behaviour.
    #[serde(default)]
    pub waterer: WatererConfig,

    /// Petter behaviour.
    #[serde(default)]
    pub petter: PetterConfig,

    /// Farmer workers and zone selection.
    #[serde(default)]
    pub farmer: FarmerConfig,

    /// In-game time cadences and day reset policy.
    #[serde(default)]
    pub cadence: CadenceConfig,

    /// In-game clock speed.
    #[serde(default)]
    pub time: TimeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DroneConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Timing for a role.
    pub const fn timing(&self, role: Role) -> RoleTiming {
        match role {
            Role::Harvester => self.harvester.timing,
            Role::Waterer => self.waterer.timing,
            Role::Petter => self.petter.timing,
            Role::Farmer => self.farmer.timing,
        }
    }

    /// Maximum roster count for a role.
    pub const fn max_count(&self, role: Role) -> u32 {
        match role {
            Role::Farmer => self.fleet.max_farmers,
            Role::Harvester | Role::Waterer | Role::Petter => self.fleet.max_per_role,
        }
    }

    /// Whether agents of `role` refill at the hatch after landing empty.
    pub const fn refills_at_hatch(&self, role: Role) -> bool {
        match role {
            Role::Waterer => self.waterer.allow_refill_at_hatch,
            Role::Petter => true,
            Role::Harvester | Role::Farmer => false,
        }
    }

    /// A copy with every tunable clamped into its allowed range.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut c = self.clone();
        let g = &mut c.general;
        g.scan_interval_ticks = g.scan_interval_ticks.clamp(1, 30);
        g.no_fly_pad_tiles = g.no_fly_pad_tiles.min(5);
        g.line_of_sight_pad_px = g.line_of_sight_pad_px.min(50);

        let caps = &mut c.capacities;
        caps.harvest_cargo = caps.harvest_cargo.clamp(1, 50);
        caps.water_charges = caps.water_charges.clamp(1, 50);
        caps.pet_charges = caps.pet_charges.clamp(1, 50);
        caps.chest_slots = caps.chest_slots.max(1);
        caps.max_stack = caps.max_stack.max(1);

        c.fleet.max_farmers = c.fleet.max_farmers.min(3);
        c.fleet.max_per_role = c.fleet.max_per_role.min(10);
        c.fleet.default_drones = c.fleet.default_drones.min(c.fleet.max_per_role);
        c.fleet.default_farmers = c.fleet.default_farmers.min(c.fleet.max_farmers);

        let ft = &mut c.farmer.timing;
        ft.work_secs = clamp_secs(ft.work_secs, 1.0, 10.0, default_farmer_work_secs());
        ft.fail_secs = clamp_secs(ft.fail_secs, 1.0, 10.0, default_farmer_fail_secs());
        ft.clear_secs = clamp_secs(ft.clear_secs, 1.0, 10.0, default_farmer_clear_secs());
        for timing in [
            &mut c.harvester.timing,
            &mut c.waterer.timing,
            &mut c.petter.timing,
            &mut c.farmer.timing,
        ] {
            sanitize_timing(timing);
        }

        let f = &mut c.farmer;
        f.zone_sizes.retain(|s| *s % 2 == 1 && *s <= 15);
        f.zone_sizes.sort_unstable();
        f.zone_sizes.dedup();
        if f.zone_sizes.is_empty() {
            f.zone_sizes = default_zone_sizes();
        }
        if !f.zone_sizes.contains(&f.start_size) {
            f.start_size = f.zone_sizes.first().copied().unwrap_or(1);
        }
        f.max_zone_tiles = f.max_zone_tiles.max(1);
        f.max_beacons = f.max_beacons.max(1);
        f.batch_size = f.batch_size.max(1);

        let cad = &mut c.cadence;
        cad.dry_list_minutes = round_to_step(cad.dry_list_minutes);
        cad.trim_minutes = round_to_step(cad.trim_minutes);
        cad.pet_refresh_minutes = round_to_step(cad.pet_refresh_minutes);

        let t = &mut c.time;
        t.seconds_per_ten_minutes = clamp_secs(t.seconds_per_ten_minutes, 0.1, 60.0, 7.0);
        c
    }
}

fn sanitize_timing(t: &mut RoleTiming) {
    let d = RoleTiming::default();
    t.speed = clamp_secs(t.speed, 0.5, 10.0, d.speed);
    t.launch_secs = clamp_secs(t.launch_secs, 0.0, 10.0, d.launch_secs);
    t.land_secs = clamp_secs(t.land_secs, 0.0, 10.0, d.land_secs);
    t.work_secs = clamp_secs(t.work_secs, 0.0, 30.0, d.work_secs);
    t.fail_secs = clamp_secs(t.fail_secs, 0.0, 30.0, d.fail_secs);
    t.clear_secs = clamp_secs(t.clear_secs, 0.0, 30.0, d.clear_secs);
    t.refill_secs = clamp_secs(t.refill_secs, 0.0, 30.0, d.refill_secs);
}

fn clamp_secs(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Game time moves in ten-minute steps; cadences are whole steps.
fn round_to_step(minutes: u32) -> u32 {
    let steps = minutes.div_ceil(10).max(1);
    steps.saturating_mul(10)
}

/// Scan cadence and flight restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneralConfig {
    /// Idle agents look for work every this many ticks.
    #[serde(default = "default_scan_interval_ticks")]
    pub scan_interval_ticks: u32,

    /// Padding (tiles) around other buildings' footprints.
    #[serde(default = "default_no_fly_pad_tiles")]
    pub no_fly_pad_tiles: u32,

    /// Extra clearance (pixels, 64 per tile) for line-of-sight checks.
    #[serde(default = "default_line_of_sight_pad_px")]
    pub line_of_sight_pad_px: u32,

    /// Ticks after day start before the caches are rebuilt again.
    #[serde(default = "default_deferred_rebuild_ticks")]
    pub deferred_rebuild_ticks: u32,

    /// Whether beacons may be placed outside the farm bounds.
    #[serde(default)]
    pub work_off_farm: bool,
}

impl GeneralConfig {
    /// Line-of-sight padding in tiles.
    pub fn line_of_sight_pad_tiles(&self) -> f64 {
        f64::from(self.line_of_sight_pad_px) / 64.0
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            scan_interval_ticks: default_scan_interval_ticks(),
            no_fly_pad_tiles: default_no_fly_pad_tiles(),
            line_of_sight_pad_px: default_line_of_sight_pad_px(),
            deferred_rebuild_ticks: default_deferred_rebuild_ticks(),
            work_off_farm: false,
        }
    }
}

/// Ledger maxima and chest size.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapacityConfig {
    /// Harvest loads that may be out of the warehouse at once.
    #[serde(default = "default_harvest_cargo")]
    pub harvest_cargo: u32,

    /// Water charges per warehouse.
    #[serde(default = "default_water_charges")]
    pub water_charges: u32,

    /// Grooming charges per warehouse.
    #[serde(default = "default_pet_charges")]
    pub pet_charges: u32,

    /// Slots in the shared chest.
    #[serde(default = "default_chest_slots")]
    pub chest_slots: u32,

    /// Items per chest slot.
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            harvest_cargo: default_harvest_cargo(),
            water_charges: default_water_charges(),
            pet_charges: default_pet_charges(),
            chest_slots: default_chest_slots(),
            max_stack: default_max_stack(),
        }
    }
}

/// Roster limits and defaults for new warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FleetConfig {
    /// Maximum drones per drone role.
    #[serde(default = "default_max_per_role")]
    pub max_per_role: u32,

    /// Maximum farmer workers.
    #[serde(default = "default_max_farmers")]
    pub max_farmers: u32,

    /// Drones per drone role in a new warehouse.
    #[serde(default = "default_drones")]
    pub default_drones: u32,

    /// Farmers in a new warehouse.
    #[serde(default)]
    pub default_farmers: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_per_role: default_max_per_role(),
            max_farmers: default_max_farmers(),
            default_drones: default_drones(),
            default_farmers: 0,
        }
    }
}

/// Harvester behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HarvesterConfig {
    /// Leave flowering crops for the player.
    #[serde(default = "default_true")]
    pub skip_flower_crops: bool,

    /// Leave fruit trees alone.
    #[serde(default)]
    pub skip_fruit_trees: bool,

    /// Phase timings and speed.
    #[serde(default)]
    pub timing: RoleTiming,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            skip_flower_crops: true,
            skip_fruit_trees: false,
            timing: RoleTiming::default(),
        }
    }
}

/// Waterer behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatererConfig {
    /// Refill water at the hatch when landing empty.
    #[serde(default = "default_true")]
    pub allow_refill_at_hatch: bool,

    /// Phase timings and speed.
    #[serde(default)]
    pub timing: RoleTiming,
}

impl Default for WatererConfig {
    fn default() -> Self {
        Self {
            allow_refill_at_hatch: true,
            timing: RoleTiming::default(),
        }
    }
}

/// Petter behaviour.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PetterConfig {
    /// Phase timings and speed.
    #[serde(default)]
    pub timing: RoleTiming,
}

/// Farmer workers and zone selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FarmerConfig {
    /// Phase timings and speed. `work_secs` is the rip phase.
    #[serde(default = "default_farmer_timing")]
    pub timing: RoleTiming,

    /// Square sizes cycled through during selection (odd, ascending).
    #[serde(default = "default_zone_sizes")]
    pub zone_sizes: Vec<u32>,

    /// Size a fresh selection starts with.
    #[serde(default = "default_start_size")]
    pub start_size: u32,

    /// Maximum distinct tiles in one zone.
    #[serde(default = "default_max_zone_tiles")]
    pub max_zone_tiles: u32,

    /// Maximum Chebyshev distance (tiles) from the warehouse to a beacon.
    #[serde(default = "default_max_beacon_radius")]
    pub max_beacon_radius: u32,

    /// Maximum beacons in one selection.
    #[serde(default = "default_max_beacons")]
    pub max_beacons: u32,

    /// Remaining tiles per farmer before another farmer may join a job.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for FarmerConfig {
    fn default() -> Self {
        Self {
            timing: default_farmer_timing(),
            zone_sizes: default_zone_sizes(),
            start_size: default_start_size(),
            max_zone_tiles: default_max_zone_tiles(),
            max_beacon_radius: default_max_beacon_radius(),
            max_beacons: default_max_beacons(),
            batch_size: default_batch_size(),
        }
    }
}

/// In-game time cadences (minutes) and the day reset policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CadenceConfig {
    /// Dry list rebuild interval.
    #[serde(default = "default_dry_list_minutes")]
    pub dry_list_minutes: u32,

    /// Farmer queue trim interval.
    #[serde(default = "default_hourly")]
    pub trim_minutes: u32,

    /// Pet reservation refresh interval.
    #[serde(default = "default_hourly")]
    pub pet_refresh_minutes: u32,

    /// Top up water and pet charges at day start.
    #[serde(default)]
    pub refill_charges_daily: bool,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            dry_list_minutes: default_dry_list_minutes(),
            trim_minutes: default_hourly(),
            pet_refresh_minutes: default_hourly(),
            refill_charges_daily: false,
        }
    }
}

/// In-game clock speed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConfig {
    /// Real seconds per ten in-game minutes.
    #[serde(default = "default_seconds_per_ten_minutes")]
    pub seconds_per_ten_minutes: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            seconds_per_ten_minutes: default_seconds_per_ten_minutes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_scan_interval_ticks() -> u32 {
    10
}

const fn default_no_fly_pad_tiles() -> u32 {
    1
}

const fn default_line_of_sight_pad_px() -> u32 {
    8
}

const fn default_deferred_rebuild_ticks() -> u32 {
    20
}

const fn default_harvest_cargo() -> u32 {
    5
}

const fn default_water_charges() -> u32 {
    20
}

const fn default_pet_charges() -> u32 {
    10
}

const fn default_chest_slots() -> u32 {
    36
}

const fn default_max_stack() -> u32 {
    999
}

const fn default_max_per_role() -> u32 {
    3
}

const fn default_max_farmers() -> u32 {
    3
}

const fn default_drones() -> u32 {
    1
}

const fn default_farmer_work_secs() -> f64 {
    3.0
}

const fn default_farmer_fail_secs() -> f64 {
    2.0
}

const fn default_farmer_clear_secs() -> f64 {
    2.0
}

fn default_farmer_timing() -> RoleTiming {
    RoleTiming {
        work_secs: default_farmer_work_secs(),
        fail_secs: default_farmer_fail_secs(),
        clear_secs: default_farmer_clear_secs(),
        speed: 2.0,
        ..RoleTiming::default()
    }
}

fn default_zone_sizes() -> Vec<u32> {
    vec![1, 3, 5, 7]
}

const fn default_start_size() -> u32 {
    3
}

const fn default_max_zone_tiles() -> u32 {
    200
}

const fn default_max_beacon_radius() -> u32 {
    40
}

const fn default_max_beacons() -> u32 {
    8
}

const fn default_batch_size() -> u32 {
    12
}

const fn default_dry_list_minutes() -> u32 {
    10
}

const fn default_hourly() -> u32 {
    60
}

const fn default_seconds_per_ten_minutes() -> f64 {
    7.0
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DroneConfig::default();
        assert_eq!(config.general.scan_interval_ticks, 10);
        assert_eq!(config.capacities.harvest_cargo, 5);
        assert_eq!(config.farmer.zone_sizes, vec![1, 3, 5, 7]);
        assert_eq!(config.farmer.start_size, 3);
        assert_eq!(config.cadence.trim_minutes, 60);
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
general:
  scan_interval_ticks: 5
  no_fly_pad_tiles: 2
  line_of_sight_pad_px: 16
  deferred_rebuild_ticks: 30
  work_off_farm: true
capacities:
  harvest_cargo: 8
  water_charges: 30
  pet_charges: 12
  chest_slots: 12
  max_stack: 99
fleet:
  max_per_role: 4
  max_farmers: 2
  default_drones: 2
  default_farmers: 1
harvester:
  skip_flower_crops: false
  skip_fruit_trees: true
  timing:
    speed: 6.0
waterer:
  allow_refill_at_hatch: false
farmer:
  timing:
    work_secs: 4.0
    clear_secs: 3.0
  zone_sizes: [3, 5]
  start_size: 5
  max_zone_tiles: 40
  max_beacon_radius: 20
  max_beacons: 4
  batch_size: 6
cadence:
  dry_list_minutes: 20
  trim_minutes: 30
  pet_refresh_minutes: 120
  refill_charges_daily: true
time:
  seconds_per_ten_minutes: 3.5
logging:
  level: debug
";
        let config = DroneConfig::parse(yaml).unwrap();
        assert_eq!(config.general.scan_interval_ticks, 5);
        assert!(config.general.work_off_farm);
        assert_eq!(config.capacities.water_charges, 30);
        assert_eq!(config.fleet.default_farmers, 1);
        assert!(!config.harvester.skip_flower_crops);
        assert!(config.harvester.skip_fruit_trees);
        assert!((config.harvester.timing.speed - 6.0).abs() < f64::EPSILON);
        assert!(!config.waterer.allow_refill_at_hatch);
        assert!((config.farmer.timing.work_secs - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.farmer.zone_sizes, vec![3, 5]);
        assert_eq!(config.farmer.max_zone_tiles, 40);
        assert_eq!(config.cadence.pet_refresh_minutes, 120);
        assert!(config.cadence.refill_charges_daily);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "capacities:\n  harvest_cargo: 2\n";
        let config = DroneConfig::parse(yaml).unwrap();
        assert_eq!(config.capacities.harvest_cargo, 2);
        assert_eq!(config.capacities.water_charges, 20);
        assert_eq!(config.general, GeneralConfig::default());
    }

    #[test]
    fn parse_empty_yaml() {
        let config = DroneConfig::parse("").unwrap();
        assert_eq!(config, DroneConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            DroneConfig::parse("general: [1, 2"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn sanitized_clamps_menu_ranges() {
        let mut config = DroneConfig::default();
        config.general.scan_interval_ticks = 0;
        config.general.no_fly_pad_tiles = 9;
        config.capacities.water_charges = 500;
        config.fleet.max_farmers = 7;
        config.harvester.timing.speed = 50.0;
        config.farmer.timing.work_secs = f64::NAN;
        config.farmer.zone_sizes = vec![4, 9, 9, 1];
        config.farmer.start_size = 4;
        config.cadence.trim_minutes = 45;

        let c = config.sanitized();
        assert_eq!(c.general.scan_interval_ticks, 1);
        assert_eq!(c.general.no_fly_pad_tiles, 5);
        assert_eq!(c.capacities.water_charges, 50);
        assert_eq!(c.fleet.max_farmers, 3);
        assert!((c.harvester.timing.speed - 10.0).abs() < f64::EPSILON);
        assert!((c.farmer.timing.work_secs - 3.0).abs() < f64::EPSILON);
        assert_eq!(c.farmer.zone_sizes, vec![1, 9]);
        assert_eq!(c.farmer.start_size, 1);
        assert_eq!(c.cadence.trim_minutes, 50);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("dronehouse-config.yaml");
        let config = DroneConfig::from_file(&path).unwrap();
        assert_eq!(config.sanitized(), config);
        assert_eq!(config.fleet.max_farmers, 3);
    }
}
