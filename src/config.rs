//! # Simulation Configuration
//!
//! Every parameter of a run is fixed before the run starts. The TOML layout
//! mirrors the structs below; every field has a default equal to the
//! classic single-CPU lab setup (100 memory units, 3 instructions per cycle,
//! one arrival every 10 time units on average, seed 42, window of 100).
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [simulation]
//! memory_capacity = 100
//! instructions_per_cycle = 3
//! cpu_speed = 1.0
//! interarrival_interval = 10.0
//! random_seed = 42
//! simulation_window = 100.0
//! max_processes = 25
//!
//! [lifecycle]
//! wait_weight = 1
//! continue_weight = 20
//!
//! [sweep]
//! process_counts = [25, 50, 100, 150, 200]
//! intervals = [10.0, 5.0, 1.0]
//! ```
//!
//! ## Example: Rust Usage
//!
//! ```rust
//! use procsim::config::SimConfig;
//! let config: SimConfig = toml::from_str("[simulation]\nmemory_capacity = 50").unwrap();
//! assert_eq!(config.simulation.memory_capacity, 50);
//! assert_eq!(config.simulation.instructions_per_cycle, 3);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration: one run's parameters plus the sweep grid.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Resources, workload and window of a single run.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u32,
    #[serde(default = "default_instructions_per_cycle")]
    pub instructions_per_cycle: u32,
    #[serde(default = "default_cpu_speed")]
    pub cpu_speed: f64,
    #[serde(default = "default_interarrival_interval")]
    pub interarrival_interval: f64,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default = "default_simulation_window")]
    pub simulation_window: f64,
    /// Stop generating arrivals after this many processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            memory_capacity: default_memory_capacity(),
            instructions_per_cycle: default_instructions_per_cycle(),
            cpu_speed: default_cpu_speed(),
            interarrival_interval: default_interarrival_interval(),
            random_seed: default_random_seed(),
            simulation_window: default_simulation_window(),
            max_processes: None,
        }
    }
}

impl SimulationConfig {
    /// Virtual time consumed by one execution quantum.
    pub fn quantum(&self) -> f64 {
        1.0 / self.cpu_speed
    }
}

/// Weights of the post-quantum branch table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LifecycleConfig {
    #[serde(default = "default_wait_weight")]
    pub wait_weight: u32,
    #[serde(default = "default_continue_weight")]
    pub continue_weight: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            wait_weight: default_wait_weight(),
            continue_weight: default_continue_weight(),
        }
    }
}

/// Grid walked by the sweep driver.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SweepConfig {
    #[serde(default = "default_process_counts")]
    pub process_counts: Vec<u64>,
    #[serde(default = "default_intervals")]
    pub intervals: Vec<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            process_counts: default_process_counts(),
            intervals: default_intervals(),
        }
    }
}

impl SimConfig {
    /// Check every bound a run relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.memory_capacity == 0 {
            return Err(invalid("simulation.memory_capacity must be > 0"));
        }
        if sim.instructions_per_cycle == 0 {
            return Err(invalid("simulation.instructions_per_cycle must be > 0"));
        }
        check_positive("simulation.cpu_speed", sim.cpu_speed)?;
        check_positive("simulation.interarrival_interval", sim.interarrival_interval)?;
        check_positive("simulation.simulation_window", sim.simulation_window)?;
        if !sim.quantum().is_finite() {
            return Err(invalid("simulation.cpu_speed is too small for a finite quantum"));
        }
        if sim.max_processes == Some(0) {
            return Err(invalid("simulation.max_processes must be > 0 when set"));
        }

        let weights = &self.lifecycle;
        if weights.wait_weight.checked_add(weights.continue_weight).unwrap_or(0) == 0 {
            return Err(invalid("lifecycle weights must sum to a positive value"));
        }

        if self.sweep.process_counts.iter().any(|&n| n == 0) {
            return Err(invalid("sweep.process_counts entries must be > 0"));
        }
        for &interval in &self.sweep.intervals {
            check_positive("sweep.intervals entry", interval)?;
        }
        Ok(())
    }

    /// Apply a flat `section.field=value` override, as passed by `--param`.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let sim = &mut self.simulation;
        match key {
            "simulation.memory_capacity" => sim.memory_capacity = parse_value(key, value)?,
            "simulation.instructions_per_cycle" => {
                sim.instructions_per_cycle = parse_value(key, value)?
            }
            "simulation.cpu_speed" => sim.cpu_speed = parse_value(key, value)?,
            "simulation.interarrival_interval" => {
                sim.interarrival_interval = parse_value(key, value)?
            }
            "simulation.random_seed" => sim.random_seed = parse_value(key, value)?,
            "simulation.simulation_window" => sim.simulation_window = parse_value(key, value)?,
            "simulation.max_processes" => {
                sim.max_processes = match value {
                    "none" | "" => None,
                    v => Some(parse_value(key, v)?),
                }
            }
            "lifecycle.wait_weight" => self.lifecycle.wait_weight = parse_value(key, value)?,
            "lifecycle.continue_weight" => {
                self.lifecycle.continue_weight = parse_value(key, value)?
            }
            "sweep.process_counts" => self.sweep.process_counts = parse_list(key, value)?,
            "sweep.intervals" => self.sweep.intervals = parse_list(key, value)?,
            _ => return Err(invalid(format!("unknown config key '{}'", key))),
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be a finite value > 0 (got {})", name, value)))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(format!("cannot parse '{}' for {}", value, key)))
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>, ConfigError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_value(key, part))
        .collect()
}

// Default value functions
fn default_memory_capacity() -> u32 { 100 }
fn default_instructions_per_cycle() -> u32 { 3 }
fn default_cpu_speed() -> f64 { 1.0 }
fn default_interarrival_interval() -> f64 { 10.0 }
fn default_random_seed() -> u64 { 42 }
fn default_simulation_window() -> f64 { 100.0 }
fn default_wait_weight() -> u32 { 1 }
fn default_continue_weight() -> u32 { 20 }
fn default_process_counts() -> Vec<u64> { vec![25, 50, 100, 150, 200] }
fn default_intervals() -> Vec<f64> { vec![10.0, 5.0, 1.0] }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<SimConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}
