//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files;
//! defaults mirror a reasonable local deployment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the quote service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Network settings (bind address, buffers, deadlines).
    pub net: NetConfig,

    /// Proof-of-work and rate-guard tuning.
    pub pow: PowConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Maximum frame buffer size in bytes; one read must fit one package.
    pub buff_size: usize,

    /// Per-I/O-operation deadline in milliseconds (reads and writes).
    pub timeout_ms: u64,
}

impl NetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            buff_size: 1024,
            timeout_ms: 5_000,
        }
    }
}

/// Proof-of-work tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PowConfig {
    /// Challenge length in bytes.
    pub challenge_len: usize,

    /// Upper bound on rate-derived difficulty (trailing zero bits).
    pub max_difficulty: u32,

    /// Multiplier from connection rate to difficulty bits.
    pub rate_difficulty_factor: f64,

    /// Rate-guard sliding window length in seconds.
    pub guard_window_secs: u64,
}

impl PowConfig {
    pub fn guard_window(&self) -> Duration {
        Duration::from_secs(self.guard_window_secs)
    }
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            challenge_len: 32,
            max_difficulty: 24,
            rate_difficulty_factor: 1.0,
            guard_window_secs: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.net.bind_address(), "0.0.0.0:8080");
        assert_eq!(cfg.net.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.pow.challenge_len, 32);
        assert!(cfg.pow.max_difficulty <= 256);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str("[net]\nport = 9000\n").unwrap();
        assert_eq!(cfg.net.port, 9000);
        assert_eq!(cfg.net.buff_size, 1024);
        assert_eq!(cfg.pow.guard_window_secs, 3);
    }
}
