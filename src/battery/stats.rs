use std::time::{Duration, Instant};

/// Readings older than this cannot be acted on.
pub const STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
struct Reading {
    value: f64,
    updated: Instant,
}

impl Reading {
    fn fresh(&self) -> bool {
        self.updated.elapsed() <= STALE_AFTER
    }
}

/// Most recent battery telemetry, with per-reading update times so that
/// consumers can disregard stale values.
#[derive(Clone, Debug, Default)]
pub struct BatteryStats {
    manufacturer: Option<String>,
    soc: Option<Reading>,
    soc_precision: u8,
    voltage: Option<Reading>,
    discharge_current_limit: Option<Reading>,
}

impl BatteryStats {
    pub fn with_manufacturer(name: impl Into<String>) -> Self {
        Self {
            manufacturer: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn update_soc(&mut self, value: f64, precision: u8) {
        self.update_soc_at(value, precision, Instant::now());
    }

    pub fn update_soc_at(&mut self, value: f64, precision: u8, at: Instant) {
        self.soc_precision = self.soc_precision.max(precision);
        self.soc = Some(Reading { value, updated: at });
    }

    pub fn soc(&self) -> Option<f64> {
        self.soc.map(|r| r.value)
    }

    pub fn soc_precision(&self) -> u8 {
        self.soc_precision
    }

    pub fn soc_is_fresh(&self) -> bool {
        self.soc.is_some_and(|r| r.fresh())
    }

    pub fn update_voltage(&mut self, value: f64) {
        self.update_voltage_at(value, Instant::now());
    }

    pub fn update_voltage_at(&mut self, value: f64, at: Instant) {
        self.voltage = Some(Reading { value, updated: at });
    }

    pub fn voltage(&self) -> Option<f64> {
        self.voltage.map(|r| r.value)
    }

    pub fn voltage_is_fresh(&self) -> bool {
        self.voltage.is_some_and(|r| r.fresh())
    }

    pub fn update_discharge_current_limit(&mut self, value: f64) {
        self.update_discharge_current_limit_at(value, Instant::now());
    }

    pub fn update_discharge_current_limit_at(&mut self, value: f64, at: Instant) {
        self.discharge_current_limit = Some(Reading { value, updated: at });
    }

    pub fn discharge_current_limit(&self) -> Option<f64> {
        self.discharge_current_limit.map(|r| r.value)
    }

    pub fn discharge_current_limit_is_fresh(&self) -> bool {
        self.discharge_current_limit.is_some_and(|r| r.fresh())
    }
}
