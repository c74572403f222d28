use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::scid::parse_scid;

/// Hard safety rails independent of anything the operator can configure away.
pub const ABS_MIN_AMOUNT_SAT: u64 = 1;
pub const ABS_MAX_FEE_PPM: u32 = 50_000;
pub const ABS_MIN_PROBE_STEPS: u32 = 1;
pub const ABS_MAX_PROBE_STEPS: u32 = 20;
pub const ABS_MIN_RAPID_MIN_AMOUNT_SAT: u64 = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub amount: AmountConfig,
    #[serde(default)]
    pub fees: FeesConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub rapid: RapidConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub rpc_uri: String,
    pub tls_cert_path: PathBuf,
    /// Macaroon-equivalent bearer credential, hex-encoded, attached to every
    /// RPC call. Optional so a node without auth (e.g. a local test harness)
    /// still works.
    #[serde(default)]
    pub macaroon_hex: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub dry_run: bool,
    pub log_level: String,
    pub probe_steps: u32,
    pub fail_tolerance_ppm: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            log_level: default_log_level(),
            probe_steps: default_probe_steps(),
            fail_tolerance_ppm: default_fail_tolerance_ppm(),
        }
    }
}

fn default_dry_run() -> bool {
    false
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_probe_steps() -> u32 {
    5
}
fn default_fail_tolerance_ppm() -> u32 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub from_pct: f64,
    pub to_pct: f64,
    pub only_from: Vec<String>,
    pub only_to: Vec<String>,
    pub exclude_from: Vec<String>,
    pub exclude_to: Vec<String>,
    pub exclude_both: Vec<String>,
    pub exclude_channel_age: u32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            from_pct: default_from_pct(),
            to_pct: default_to_pct(),
            only_from: Vec::new(),
            only_to: Vec::new(),
            exclude_from: Vec::new(),
            exclude_to: Vec::new(),
            exclude_both: Vec::new(),
            exclude_channel_age: 0,
        }
    }
}

fn default_from_pct() -> f64 {
    50.0
}
fn default_to_pct() -> f64 {
    50.0
}

impl SelectorConfig {
    pub fn only_from_ids(&self) -> Result<Vec<u64>> {
        self.only_from.iter().map(|s| parse_scid(s)).collect()
    }
    pub fn only_to_ids(&self) -> Result<Vec<u64>> {
        self.only_to.iter().map(|s| parse_scid(s)).collect()
    }
    pub fn exclude_from_ids(&self) -> Result<Vec<u64>> {
        self.exclude_from.iter().map(|s| parse_scid(s)).collect()
    }
    pub fn exclude_to_ids(&self) -> Result<Vec<u64>> {
        self.exclude_to.iter().map(|s| parse_scid(s)).collect()
    }
    pub fn exclude_both_ids(&self) -> Result<Vec<u64>> {
        self.exclude_both.iter().map(|s| parse_scid(s)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmountConfig {
    pub amount_sat: u64,
    pub min_amount_sat: u64,
    pub rel_from: f64,
    pub rel_to: f64,
}

impl Default for AmountConfig {
    fn default() -> Self {
        Self { amount_sat: 0, min_amount_sat: 0, rel_from: 0.0, rel_to: 0.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeesConfig {
    pub fee_limit_ppm: u32,
    pub econ_ratio: f64,
    pub econ_ratio_max_ppm: u32,
    pub lost_profit: bool,
    pub fee_last_hop_ppm: u32,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            fee_limit_ppm: 0,
            econ_ratio: 0.0,
            econ_ratio_max_ppm: 0,
            lost_profit: false,
            fee_last_hop_ppm: 0,
        }
    }
}

impl FeesConfig {
    pub fn uses_econ_ratio(&self) -> bool {
        self.econ_ratio > 0.0
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub timeout_rebalance_minutes: u64,
    pub timeout_attempt_minutes: u64,
    pub timeout_route_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            timeout_rebalance_minutes: default_timeout_rebalance(),
            timeout_attempt_minutes: default_timeout_attempt(),
            timeout_route_seconds: default_timeout_route(),
        }
    }
}

fn default_timeout_rebalance() -> u64 {
    20
}
fn default_timeout_attempt() -> u64 {
    5
}
fn default_timeout_route() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RapidConfig {
    pub enabled: bool,
}

impl Default for RapidConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub node_cache_path: Option<PathBuf>,
    pub lifetime_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { node_cache_path: None, lifetime_minutes: default_cache_lifetime() }
    }
}

fn default_cache_lifetime() -> u64 {
    24 * 60
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub csv_path: Option<PathBuf>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { csv_path: None }
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount.amount_sat == 0 && self.amount.rel_from <= 0.0 && self.amount.rel_to <= 0.0 {
            bail!("amount.amount_sat must be > 0 unless amount.rel_from or amount.rel_to is set");
        }

        if self.amount.amount_sat > 0
            && self.amount.min_amount_sat > 0
            && self.amount.min_amount_sat > self.amount.amount_sat
        {
            bail!(
                "amount.min_amount_sat ({}) must not exceed amount.amount_sat ({})",
                self.amount.min_amount_sat,
                self.amount.amount_sat
            );
        }

        if self.fees.econ_ratio_max_ppm > 0 && self.fees.fee_limit_ppm > 0 {
            bail!("fees.econ_ratio_max_ppm and fees.fee_limit_ppm are mutually exclusive");
        }

        if self.fees.fee_limit_ppm > ABS_MAX_FEE_PPM {
            bail!(
                "fees.fee_limit_ppm ({}) exceeds the hard limit of {}",
                self.fees.fee_limit_ppm,
                ABS_MAX_FEE_PPM
            );
        }
        if self.fees.econ_ratio_max_ppm > ABS_MAX_FEE_PPM {
            bail!(
                "fees.econ_ratio_max_ppm ({}) exceeds the hard limit of {}",
                self.fees.econ_ratio_max_ppm,
                ABS_MAX_FEE_PPM
            );
        }

        if self.rapid.enabled && (self.amount.rel_from > 0.0 || self.amount.rel_to > 0.0) {
            bail!("rapid rebalance cannot be combined with relative-amount mode (amount.rel_from/rel_to)");
        }

        if self.general.probe_steps < ABS_MIN_PROBE_STEPS || self.general.probe_steps > ABS_MAX_PROBE_STEPS {
            bail!(
                "general.probe_steps ({}) must be between {} and {}",
                self.general.probe_steps,
                ABS_MIN_PROBE_STEPS,
                ABS_MAX_PROBE_STEPS
            );
        }

        if self.selector.from_pct < 0.0 || self.selector.from_pct > 100.0 {
            bail!("selector.from_pct must be within 0..=100");
        }
        if self.selector.to_pct < 0.0 || self.selector.to_pct > 100.0 {
            bail!("selector.to_pct must be within 0..=100");
        }

        // Validate any configured scid filters parse.
        self.selector.only_from_ids()?;
        self.selector.only_to_ids()?;
        self.selector.exclude_from_ids()?;
        self.selector.exclude_to_ids()?;
        self.selector.exclude_both_ids()?;

        Ok(())
    }

    #[cfg(test)]
    pub fn test_default(tls_cert_path: PathBuf) -> Self {
        Config {
            node: NodeConfig { rpc_uri: "https://127.0.0.1:10009".to_string(), tls_cert_path, macaroon_hex: None },
            general: GeneralConfig::default(),
            selector: SelectorConfig::default(),
            amount: AmountConfig { amount_sat: 100_000, ..AmountConfig::default() },
            fees: FeesConfig { econ_ratio: 1.0, ..FeesConfig::default() },
            timeouts: TimeoutsConfig::default(),
            rapid: RapidConfig::default(),
            cache: CacheConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config::test_default(PathBuf::from("/dev/null"))
    }

    #[test]
    fn rejects_zero_amount_without_relative_mode() {
        let mut c = base();
        c.amount.amount_sat = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn allows_zero_amount_with_rel_from() {
        let mut c = base();
        c.amount.amount_sat = 0;
        c.amount.rel_from = 0.5;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_min_amount_above_amount() {
        let mut c = base();
        c.amount.amount_sat = 1000;
        c.amount.min_amount_sat = 2000;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_both_fee_strategies() {
        let mut c = base();
        c.fees.fee_limit_ppm = 100;
        c.fees.econ_ratio_max_ppm = 100;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_rapid_with_relative_amount() {
        let mut c = base();
        c.rapid.enabled = true;
        c.amount.rel_from = 0.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_fee_ppm_above_hard_limit() {
        let mut c = base();
        c.fees.fee_limit_ppm = ABS_MAX_FEE_PPM + 1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_probe_steps_out_of_range() {
        let mut c = base();
        c.general.probe_steps = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn accepts_valid_default() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn deserializes_minimal_toml() {
        let toml_str = r#"
            [node]
            rpc_uri = "https://127.0.0.1:10009"
            tls_cert_path = "/dev/null"

            [amount]
            amount_sat = 50000
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.amount.amount_sat, 50_000);
        assert_eq!(config.general.probe_steps, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_selector_threshold() {
        let mut c = base();
        c.selector.from_pct = 150.0;
        assert!(c.validate().is_err());
    }
}
