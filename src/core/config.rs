//! Simulation configuration with documented constants
//!
//! The tunable numbers of the core loop are collected here so their
//! interactions are visible in one place. The demo harness can override
//! them from a TOML file; library users construct the struct directly.

use serde::Deserialize;

/// Configuration for the simulation loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Logical ticks added per scheduler step
    ///
    /// One tick is one in-world minute. The scheduler advances the clock by
    /// this amount at the top of every `step()`.
    pub ticks_per_step: u32,

    /// Ceiling on actions a single actor may execute within one tick
    ///
    /// Guards against runaway action generation (a provider that keeps
    /// emitting actions would otherwise freeze the tick).
    pub max_actions_per_tick: u32,

    /// Trailing tick window used when rendering recent events/interactions
    pub perception_tick_window: u64,

    /// Maximum records returned by the perception log queries
    pub perception_max_records: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_step: 1,
            max_actions_per_tick: 50,
            perception_tick_window: 10,
            perception_max_records: 20,
        }
    }
}

impl SimulationConfig {
    /// Parse a config from TOML text, falling back to defaults per field.
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.ticks_per_step, 1);
        assert_eq!(cfg.max_actions_per_tick, 50);
    }

    #[test]
    fn test_partial_toml_override() {
        let cfg = SimulationConfig::from_toml("max_actions_per_tick = 8").unwrap();
        assert_eq!(cfg.max_actions_per_tick, 8);
        assert_eq!(cfg.ticks_per_step, 1);
    }
}
