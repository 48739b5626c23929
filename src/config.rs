//! Simulation settings, read from a TOML file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Scheduling policy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// First come, first served
    Fcfs,
    RoundRobin,
    Priority,
}

impl Default for PolicyKind {
    fn default() -> Self {
        Self::RoundRobin
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Fcfs => write!(f, "fcfs"),
            PolicyKind::RoundRobin => write!(f, "round-robin"),
            PolicyKind::Priority => write!(f, "priority"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fcfs" | "fifo" => Ok(PolicyKind::Fcfs),
            "round-robin" | "rr" => Ok(PolicyKind::RoundRobin),
            "priority" | "prio" => Ok(PolicyKind::Priority),
            _ => Err(format!("Unknown policy: {}", s)),
        }
    }
}

/// A process to create before the first tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Program file, relative to `program_dir`
    pub source: String,
    /// Falls back to `default_priority` when absent
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub policy: PolicyKind,

    /// Ticks per dispatch for round-robin and priority scheduling
    pub quantum: u32,

    pub default_priority: i32,

    /// Ticks a token read takes on the disk
    pub disk_latency: u64,

    /// Upper bound on simulated ticks
    pub max_ticks: u64,

    pub program_dir: PathBuf,

    pub input_dir: PathBuf,

    pub processes: Vec<ProcessSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            quantum: 4,
            default_priority: 0,
            disk_latency: 3,
            max_ticks: 100_000,
            program_dir: PathBuf::from("data/programs"),
            input_dir: PathBuf::from("data/input"),
            processes: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<SimulationConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        text.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantum == 0 {
            return Err(ConfigError::Invalid("quantum must be at least one tick".to_string()));
        }
        if self.disk_latency == 0 {
            return Err(ConfigError::Invalid("disk_latency must be at least one tick".to_string()));
        }
        Ok(())
    }
}

impl FromStr for SimulationConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SimulationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_config_parse() {
        let config: SimulationConfig = r#"
            policy = "priority"
            quantum = 2

            [[processes]]
            source = "a.txt"
            priority = 5

            [[processes]]
            source = "b.txt"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.policy, PolicyKind::Priority);
        assert_eq!(config.quantum, 2);
        assert_eq!(config.disk_latency, 3);
        assert_eq!(config.processes.len(), 2);
        assert_eq!(config.processes[0].priority, Some(5));
        assert_eq!(config.processes[1].priority, None);
    }

    #[test]
    fn test_simulation_config_empty_is_default() {
        let config: SimulationConfig = "".parse().unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_simulation_config_zero_quantum_rejected() {
        let result = "quantum = 0".parse::<SimulationConfig>();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_simulation_config_unknown_policy_rejected() {
        let result = "policy = \"lottery\"".parse::<SimulationConfig>();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_simulation_config_load_bundled_file() {
        let config = SimulationConfig::load(Path::new("data/simulation.toml")).unwrap();
        assert!(!config.processes.is_empty());
    }

    #[test]
    fn test_policy_kind_from_str() {
        assert_eq!("FCFS".parse::<PolicyKind>(), Ok(PolicyKind::Fcfs));
        assert_eq!("rr".parse::<PolicyKind>(), Ok(PolicyKind::RoundRobin));
        assert_eq!("priority".parse::<PolicyKind>(), Ok(PolicyKind::Priority));
        assert!("lottery".parse::<PolicyKind>().is_err());
    }
}
