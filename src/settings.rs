//! Game settings
//!
//! Read from a JSON file at startup. Every field is optional in the file;
//! missing fields take their defaults and out-of-range values are clamped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, TICK_INTERVAL};
use crate::error::SettingsError;
use crate::sim::automaton::{DEFAULT_CELL_SIZE, DEFAULT_COLS, DEFAULT_DENSITY, DEFAULT_ROWS, DEFAULT_STEP_INTERVAL};
use crate::sim::formula::DEFAULT_FORMULA_INTERVAL;
use crate::sim::powerup::DEFAULT_SPAWN_INTERVAL;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "LIFE_HOCKEY_CONFIG";

/// Largest automaton side accepted from config
const MAX_GRID_SIDE: usize = 500;

/// Longest spawn or rotation interval accepted from config
const MAX_INTERVAL_SECS: f32 = 3600.0;

/// Longest headless run accepted from config
const MAX_RUN_SECS: f32 = 86_400.0;

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // === Table ===
    pub canvas_width: f32,
    pub canvas_height: f32,
    /// RNG seed; random when absent
    pub seed: Option<u64>,
    /// User speed multiplier (0.1 - 10.0)
    pub base_speed: f32,
    /// AI plays both paddles
    pub demo_mode: bool,

    // === Timing ===
    pub tick_interval_ms: u64,
    pub power_up_interval_secs: f32,
    pub formula_interval_secs: f32,

    // === Automaton ===
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub cell_size: f32,
    pub grid_step_ms: u64,
    /// Chance each cell starts alive (0.0 - 1.0)
    pub grid_density: f64,

    // === Headless runner ===
    /// How often the runner logs stats
    pub snapshot_interval_ms: u64,
    /// Stop after this many seconds; 0 runs until killed
    pub run_secs: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            seed: None,
            base_speed: 1.0,
            demo_mode: false,

            tick_interval_ms: TICK_INTERVAL.as_millis() as u64,
            power_up_interval_secs: DEFAULT_SPAWN_INTERVAL.as_secs_f32(),
            formula_interval_secs: DEFAULT_FORMULA_INTERVAL.as_secs_f32(),

            grid_rows: DEFAULT_ROWS,
            grid_cols: DEFAULT_COLS,
            cell_size: DEFAULT_CELL_SIZE,
            grid_step_ms: DEFAULT_STEP_INTERVAL.as_millis() as u64,
            grid_density: DEFAULT_DENSITY,

            snapshot_interval_ms: 1000,
            run_secs: 30.0,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.validate();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from `path`, falling back to defaults on any failure
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };
        match Self::from_file(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("{}: {e}; using default settings", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Settings path from the environment, else the first CLI argument
    pub fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| std::env::args_os().nth(1).map(PathBuf::from))
    }

    /// Clamp every field into its usable range
    pub fn validate(&mut self) {
        let defaults = Self::default();

        if !(self.canvas_width.is_finite() && self.canvas_width > 0.0) {
            self.canvas_width = defaults.canvas_width;
        }
        if !(self.canvas_height.is_finite() && self.canvas_height > 0.0) {
            self.canvas_height = defaults.canvas_height;
        }
        self.base_speed = if self.base_speed.is_finite() {
            self.base_speed.clamp(0.1, 10.0)
        } else {
            defaults.base_speed
        };

        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self.power_up_interval_secs = positive_secs(self.power_up_interval_secs, defaults.power_up_interval_secs);
        self.formula_interval_secs = positive_secs(self.formula_interval_secs, defaults.formula_interval_secs);

        self.grid_rows = self.grid_rows.clamp(1, MAX_GRID_SIDE);
        self.grid_cols = self.grid_cols.clamp(1, MAX_GRID_SIDE);
        self.cell_size = if self.cell_size.is_finite() {
            self.cell_size.max(1.0)
        } else {
            defaults.cell_size
        };
        self.grid_step_ms = self.grid_step_ms.max(1);
        self.grid_density = if self.grid_density.is_nan() {
            defaults.grid_density
        } else {
            self.grid_density.clamp(0.0, 1.0)
        };

        self.snapshot_interval_ms = self.snapshot_interval_ms.max(1);
        self.run_secs = if self.run_secs.is_finite() {
            self.run_secs.clamp(0.0, MAX_RUN_SECS)
        } else {
            0.0
        };
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }

    /// None when the runner should go until killed
    pub fn run_duration(&self) -> Option<Duration> {
        if !(self.run_secs.is_finite() && self.run_secs > 0.0) {
            return None;
        }
        Duration::try_from_secs_f32(self.run_secs.min(MAX_RUN_SECS)).ok()
    }
}

fn positive_secs(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.1 {
        value.min(MAX_INTERVAL_SECS)
    } else {
        fallback
    }
}
