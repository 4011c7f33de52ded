//! Wire types for the solar charger live-data status payload consumed by
//! the web UI. Field names are part of the wire contract.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::solar_charger::ChargerStats;

/// A single measurement: value, unit, and the number of digits the UI
/// should display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueObject {
    pub v: f64,
    pub u: String,
    pub d: u8,
}

impl ValueObject {
    pub fn new(v: f64, unit: &str, digits: u8) -> Self {
        Self {
            v,
            u: unit.to_string(),
            d: digits,
        }
    }
}

/// Element of a metric value sequence: either a measurement or a plain
/// string (e.g. a state label). Both kinds may appear at any position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Measurement(ValueObject),
    Text(String),
}

impl From<ValueObject> for MetricValue {
    fn from(vo: ValueObject) -> Self {
        Self::Measurement(vo)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolarChargerInstance {
    pub data_age_ms: u64,
    pub product_id: String,
    pub firmware_version: String,
    pub values: HashMap<String, Vec<MetricValue>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SolarChargerSummary {
    pub full_update: bool,
    pub instances: HashMap<String, SolarChargerInstance>,
}

/// Dynamic power limiter state surface. `PLSTATE` is -1 while the limiter
/// is disabled; `PLLIMIT` is the current inverter output limit in W.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerLimiterState {
    #[serde(rename = "PLSTATE")]
    pub state: i32,
    #[serde(rename = "PLLIMIT")]
    pub limit: i32,
}

impl Default for PowerLimiterState {
    fn default() -> Self {
        Self {
            state: -1,
            limit: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SolarChargerLiveData {
    pub dpl: PowerLimiterState,
    pub solarcharger: SolarChargerSummary,
}

/// Assemble the live-data payload from the active provider's stats.
///
/// A full update carries every instance; otherwise only instances with
/// readings newer than `updated_within` (i.e. since the last publish) are
/// included.
pub fn solar_charger_live_data(
    stats: &dyn ChargerStats,
    limiter: PowerLimiterState,
    full_update: bool,
    updated_within: Duration,
) -> SolarChargerLiveData {
    SolarChargerLiveData {
        dpl: limiter,
        solarcharger: SolarChargerSummary {
            full_update,
            instances: stats.live_instances(full_update, updated_within),
        },
    }
}
