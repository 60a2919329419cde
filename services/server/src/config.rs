use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use vaxishare_allocator::AllocationPolicy;

/// Doses in the pool at startup unless overridden.
pub const DEFAULT_INITIAL_DOSES: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub initial_doses: u64,
    pub seed_demo: bool,
    pub frontend_dir: Option<PathBuf>,
    /// Periodic cycle interval; `None` leaves cycles to API callers.
    pub cycle_interval: Option<Duration>,
    pub cycle_policy: AllocationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            initial_doses: DEFAULT_INITIAL_DOSES,
            seed_demo: true,
            frontend_dir: None,
            cycle_interval: None,
            cycle_policy: AllocationPolicy::Fcfs,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("VAXI_LISTEN_ADDR") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid VAXI_LISTEN_ADDR: {v}"))?,
            None => defaults.listen_addr,
        };

        let log_level = lookup("VAXI_LOG_LEVEL").unwrap_or(defaults.log_level);

        let initial_doses = match lookup("VAXI_INITIAL_DOSES") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("invalid VAXI_INITIAL_DOSES: {v}"))?,
            None => defaults.initial_doses,
        };

        let seed_demo = match lookup("VAXI_SEED_DEMO") {
            Some(v) => parse_bool(&v).with_context(|| format!("invalid VAXI_SEED_DEMO: {v}"))?,
            None => defaults.seed_demo,
        };

        let frontend_dir = lookup("VAXI_FRONTEND_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let cycle_interval = match lookup("VAXI_CYCLE_INTERVAL_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid VAXI_CYCLE_INTERVAL_SECS: {v}"))?;
                if secs == 0 {
                    bail!("VAXI_CYCLE_INTERVAL_SECS must be positive");
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let cycle_policy = match lookup("VAXI_CYCLE_POLICY") {
            Some(v) => v.parse().context("invalid VAXI_CYCLE_POLICY")?,
            None => defaults.cycle_policy,
        };

        Ok(Self {
            listen_addr,
            log_level,
            initial_doses,
            seed_demo,
            frontend_dir,
            cycle_interval,
            cycle_policy,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}
