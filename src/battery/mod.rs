pub mod mqtt;
mod stats;
pub mod zendure;

pub use stats::{BatteryStats, STALE_AFTER};

use crate::config::BatteryConfig;

/// Effective discharge current limit in A, or `None` for unlimited.
///
/// The result is the minimum of the configured limit and the limit the
/// battery itself reports. The configured limit only applies below the
/// configured SoC threshold while SoC data is fresh (unless
/// `ignore_soc_threshold`), falling back to the voltage threshold while
/// only voltage data is fresh. A non-positive configured limit is
/// disregarded, as are stale battery-reported limits.
pub fn max_discharge_current_limit(
    cfg: &BatteryConfig,
    stats: &BatteryStats,
    ignore_soc_threshold: bool,
) -> Option<f64> {
    if !cfg.enable_discharge_current_limit {
        return None;
    }

    let configured = configured_limit(cfg, stats, ignore_soc_threshold);
    let reported = reported_limit(cfg, stats);

    match (configured, reported) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn configured_limit(
    cfg: &BatteryConfig,
    stats: &BatteryStats,
    ignore_soc_threshold: bool,
) -> Option<f64> {
    if cfg.discharge_current_limit <= 0.0 {
        return None;
    }

    if stats.soc_is_fresh() && !ignore_soc_threshold {
        if stats.soc()? < cfg.discharge_current_limit_below_soc {
            return Some(cfg.discharge_current_limit);
        }
        return None;
    }

    if stats.voltage_is_fresh() && stats.voltage()? < cfg.discharge_current_limit_below_voltage {
        return Some(cfg.discharge_current_limit);
    }
    None
}

fn reported_limit(cfg: &BatteryConfig, stats: &BatteryStats) -> Option<f64> {
    if !cfg.use_battery_reported_discharge_current_limit {
        return None;
    }
    if !stats.discharge_current_limit_is_fresh() {
        return None;
    }
    stats.discharge_current_limit()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn limit_config() -> BatteryConfig {
        BatteryConfig {
            enabled: true,
            enable_discharge_current_limit: true,
            discharge_current_limit: 40.0,
            discharge_current_limit_below_soc: 50.0,
            discharge_current_limit_below_voltage: 48.0,
            ..Default::default()
        }
    }

    #[test]
    fn disabled_means_unlimited() {
        let mut cfg = limit_config();
        cfg.enable_discharge_current_limit = false;
        let mut stats = BatteryStats::default();
        stats.update_soc(10.0, 0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), None);
    }

    #[test]
    fn configured_limit_applies_below_soc_threshold() {
        let cfg = limit_config();
        let mut stats = BatteryStats::default();
        stats.update_soc(40.0, 0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), Some(40.0));
        stats.update_soc(60.0, 0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), None);
    }

    #[test]
    fn soc_threshold_can_be_ignored() {
        let cfg = limit_config();
        let mut stats = BatteryStats::default();
        stats.update_soc(60.0, 0);
        stats.update_voltage(47.0);
        // with SoC disregarded, the voltage threshold governs
        assert_eq!(max_discharge_current_limit(&cfg, &stats, true), Some(40.0));
    }

    #[test]
    fn voltage_threshold_when_soc_is_stale() {
        let cfg = limit_config();
        let mut stats = BatteryStats::default();
        let old = Instant::now() - (STALE_AFTER + Duration::from_secs(1));
        stats.update_soc_at(40.0, 0, old);
        stats.update_voltage(47.5);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), Some(40.0));
        stats.update_voltage(48.5);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), None);
    }

    #[test]
    fn no_fresh_data_means_unlimited() {
        let cfg = limit_config();
        let stats = BatteryStats::default();
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), None);
    }

    #[test]
    fn non_positive_configured_limit_is_disregarded() {
        let mut cfg = limit_config();
        cfg.discharge_current_limit = 0.0;
        let mut stats = BatteryStats::default();
        stats.update_soc(10.0, 0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), None);
    }

    #[test]
    fn minimum_of_configured_and_reported() {
        let mut cfg = limit_config();
        cfg.use_battery_reported_discharge_current_limit = true;
        let mut stats = BatteryStats::default();
        stats.update_soc(40.0, 0);
        stats.update_discharge_current_limit(25.0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), Some(25.0));
        stats.update_discharge_current_limit(55.0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), Some(40.0));
    }

    #[test]
    fn stale_reported_limit_is_disregarded() {
        let mut cfg = limit_config();
        cfg.use_battery_reported_discharge_current_limit = true;
        let mut stats = BatteryStats::default();
        stats.update_soc(40.0, 0);
        stats.update_discharge_current_limit_at(
            25.0,
            Instant::now() - (STALE_AFTER + Duration::from_secs(1)),
        );
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), Some(40.0));
    }

    #[test]
    fn reported_limit_alone() {
        let mut cfg = limit_config();
        cfg.discharge_current_limit = 0.0;
        cfg.use_battery_reported_discharge_current_limit = true;
        let mut stats = BatteryStats::default();
        stats.update_discharge_current_limit(30.0);
        assert_eq!(max_discharge_current_limit(&cfg, &stats, false), Some(30.0));
    }
}
