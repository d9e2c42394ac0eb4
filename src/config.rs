//! Runtime configuration.
//!
//! Settings can be built in code, read from the environment or, with the
//! `config` feature, deserialized from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::Deserialize;

use crate::error::{DiError, DiResult};

const ENV_PREFIX: &str = "FERROUS_POOL";

/// Tunables for a [`Container`](crate::Container).
///
/// # Examples
///
/// ```
/// use ferrous_pool::{Bindings, RuntimeConfig};
///
/// let config = RuntimeConfig {
///     max_idle_per_type: Some(32),
///     prewarm: 4,
///     ..RuntimeConfig::default()
/// };
///
/// let container = Bindings::with_config(config).build().unwrap();
/// assert_eq!(container.config().max_idle_per_type, Some(32));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct RuntimeConfig {
    /// Upper bound on idle instances kept per pooled type; `None` is unbounded
    pub max_idle_per_type: Option<usize>,
    /// Maximum nesting of recursive wiring
    pub max_wire_depth: usize,
    /// Fail wiring with [`DiError::Circular`] when a type re-enters its own path
    pub detect_cycles: bool,
    /// Idle instances constructed per pooled binding during boot
    pub prewarm: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_idle_per_type: None,
            max_wire_depth: 64,
            detect_cycles: true,
            prewarm: 0,
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DiError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `FERROUS_POOL_*` variables on top of the defaults.
    ///
    /// Recognised: `MAX_IDLE_PER_TYPE`, `MAX_WIRE_DEPTH`, `DETECT_CYCLES`
    /// and `PREWARM`.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(|name| env::var(format!("{ENV_PREFIX}_{name}")).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DiResult<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup("MAX_IDLE_PER_TYPE") {
            config.max_idle_per_type = Some(parse_usize("MAX_IDLE_PER_TYPE", &value)?);
        }
        if let Some(value) = lookup("MAX_WIRE_DEPTH") {
            config.max_wire_depth = parse_usize("MAX_WIRE_DEPTH", &value)?;
        }
        if let Some(value) = lookup("DETECT_CYCLES") {
            config.detect_cycles = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(DiError::InvalidConfig(format!(
                        "{ENV_PREFIX}_DETECT_CYCLES: expected a boolean, got {other:?}"
                    )))
                }
            };
        }
        if let Some(value) = lookup("PREWARM") {
            config.prewarm = parse_usize("PREWARM", &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the runtime cannot honour.
    pub fn validate(&self) -> DiResult<()> {
        if self.max_wire_depth == 0 {
            return Err(DiError::InvalidConfig("max_wire_depth must be at least 1".into()));
        }
        if let Some(max) = self.max_idle_per_type {
            if self.prewarm > max {
                return Err(DiError::InvalidConfig(format!(
                    "prewarm ({}) exceeds max_idle_per_type ({max})",
                    self.prewarm
                )));
            }
        }
        Ok(())
    }
}

fn parse_usize(name: &str, value: &str) -> DiResult<usize> {
    value.trim().parse().map_err(|_| {
        DiError::InvalidConfig(format!("{ENV_PREFIX}_{name}: expected an integer, got {value:?}"))
    })
}
