pub mod mqtt;
pub mod vedirect;
pub mod victron;

use std::collections::HashMap;
use std::time::Duration;

use crate::data_mgmt::livedata::SolarChargerInstance;

/// Aggregated view over a solar charger provider, plus live-data instance
/// generation for the UI payload.
pub trait ChargerStats {
    /// Age of the most recent reading across all controllers.
    fn data_age(&self) -> Option<Duration>;
    /// Total output (battery-side) power in W.
    fn output_power_watts(&self) -> Option<f64>;
    /// Minimum output voltage across controllers, in V.
    fn output_voltage_volts(&self) -> Option<f64>;
    /// Total panel input power in W.
    fn panel_power_watts(&self) -> Option<f64>;
    /// Total yield in kWh.
    fn yield_total_kwh(&self) -> Option<f64>;
    /// Today's yield in Wh.
    fn yield_today_wh(&self) -> Option<f64>;
    /// Instances for the live-data payload. On a full update every
    /// instance is included; otherwise only those with readings newer than
    /// `updated_within`.
    fn live_instances(
        &self,
        full_update: bool,
        updated_within: Duration,
    ) -> HashMap<String, SolarChargerInstance>;
}
