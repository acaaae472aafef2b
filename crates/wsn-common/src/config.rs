use serde::{Deserialize, Serialize};
use std::path::Path;

/// Startup-time parameters for the core, normally supplied by the CLI/
/// config-parsing layer (out of scope per spec §1) and threaded into
/// `InterfaceContext` construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Our own EUI-64, formatted "02:11:22:33:44:55:66:77".
    pub eui64: String,
    pub pan_id: u16,
    pub network_name: String,

    #[serde(default = "default_base_reachable_time_ms")]
    pub base_reachable_time_ms: u64,
    #[serde(default = "default_retrans_timer_ms")]
    pub retrans_timer_ms: u64,
    #[serde(default = "default_max_multicast_solicit")]
    pub max_multicast_solicit: u32,
    #[serde(default = "default_cur_hop_limit")]
    pub cur_hop_limit: u8,

    /// Wi-SUN FAN routers always accept ARO; kept as a named field (rather
    /// than a hardcoded `true`) because the border-router variant's loader
    /// shares this config shape and may set it differently.
    #[serde(default = "default_true")]
    pub router_mode: bool,

    pub rpl_instance_id: u8,
    #[serde(default = "default_dio_interval_min")]
    pub initial_dio_interval_min: u8,
    #[serde(default = "default_dio_interval_doublings")]
    pub initial_dio_interval_doublings: u8,
    #[serde(default)]
    pub initial_dio_redundancy: u8,

    #[serde(default = "default_max_rpl_candidates")]
    pub max_rpl_candidates: usize,
}

fn default_base_reachable_time_ms() -> u64 {
    30_000
}
fn default_retrans_timer_ms() -> u64 {
    1_000
}
fn default_max_multicast_solicit() -> u32 {
    3
}
fn default_cur_hop_limit() -> u8 {
    64
}
fn default_true() -> bool {
    true
}
fn default_dio_interval_min() -> u8 {
    15
}
fn default_dio_interval_doublings() -> u8 {
    2
}
fn default_max_rpl_candidates() -> usize {
    32
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            eui64: String::new(),
            pan_id: 0,
            network_name: String::new(),
            base_reachable_time_ms: default_base_reachable_time_ms(),
            retrans_timer_ms: default_retrans_timer_ms(),
            max_multicast_solicit: default_max_multicast_solicit(),
            cur_hop_limit: default_cur_hop_limit(),
            router_mode: true,
            rpl_instance_id: 0,
            initial_dio_interval_min: default_dio_interval_min(),
            initial_dio_interval_doublings: default_dio_interval_doublings(),
            initial_dio_redundancy: 0,
            max_rpl_candidates: default_max_rpl_candidates(),
        }
    }
}

impl CoreConfig {
    /// Load from a TOML file, falling back to defaults if it doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.base_reachable_time_ms, 30_000);
        assert!(cfg.router_mode);
        assert_eq!(cfg.max_rpl_candidates, 32);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = CoreConfig::load(Path::new("/nonexistent/path/core.toml")).unwrap();
        assert_eq!(cfg.cur_hop_limit, 64);
    }
}
