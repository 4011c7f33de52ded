//! Victron MPPT charge controllers on VE.Direct serial links.

use std::collections::HashMap;
use std::io::Read;
use std::time::{Duration, Instant};

use crate::data_mgmt::livedata::{MetricValue, SolarChargerInstance, ValueObject};
use crate::helpers::backoff_retry;

use super::vedirect::{FrameReader, MpptFrame};
use super::ChargerStats;

/// VE.Direct frames arrive about once a second; anything older than this
/// means the controller went away.
pub const STALE_AFTER: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
struct Controller {
    frame: MpptFrame,
    updated: Instant,
}

impl Controller {
    fn age(&self) -> Duration {
        self.updated.elapsed()
    }

    fn fresh(&self) -> bool {
        self.age() <= STALE_AFTER
    }
}

/// Per-serial readings from all connected controllers.
#[derive(Debug, Default)]
pub struct VictronCharger {
    controllers: HashMap<String, Controller>,
    verbose: bool,
}

impl VictronCharger {
    pub fn new(verbose: bool) -> Self {
        Self {
            controllers: HashMap::new(),
            verbose,
        }
    }

    pub fn apply_frame(&mut self, frame: MpptFrame) {
        self.apply_frame_at(frame, Instant::now());
    }

    pub fn apply_frame_at(&mut self, frame: MpptFrame, at: Instant) {
        let Some(serial) = frame.serial.clone() else {
            log::warn!("Dropping VE.Direct frame without serial number");
            return;
        };
        if self.verbose {
            log::info!(
                "VE.Direct frame from {serial}: {:?} W output",
                frame.output_power()
            );
        }
        self.controllers
            .insert(serial, Controller { frame, updated: at });
    }

    fn fresh(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.values().filter(|c| c.fresh())
    }

    fn sum<F: Fn(&MpptFrame) -> Option<f64>>(&self, f: F) -> Option<f64> {
        let values: Vec<f64> = self.fresh().filter_map(|c| f(&c.frame)).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.into_iter().sum())
        }
    }
}

impl ChargerStats for VictronCharger {
    fn data_age(&self) -> Option<Duration> {
        self.controllers.values().map(Controller::age).min()
    }

    fn output_power_watts(&self) -> Option<f64> {
        // controllers can read slightly negative at night; they count as 0
        self.sum(|f| f.output_power().map(|p| p.max(0.0)))
    }

    fn output_voltage_volts(&self) -> Option<f64> {
        self.fresh()
            .filter_map(|c| c.frame.battery_voltage())
            .min_by(f64::total_cmp)
    }

    fn panel_power_watts(&self) -> Option<f64> {
        self.sum(MpptFrame::panel_power)
    }

    fn yield_total_kwh(&self) -> Option<f64> {
        self.sum(|f| f.yield_total_wh.map(|wh| wh as f64 / 1000.0))
    }

    fn yield_today_wh(&self) -> Option<f64> {
        self.sum(|f| f.yield_today_wh.map(|wh| wh as f64))
    }

    fn live_instances(
        &self,
        full_update: bool,
        updated_within: Duration,
    ) -> HashMap<String, SolarChargerInstance> {
        self.controllers
            .iter()
            .filter(|(_, c)| full_update || c.age() <= updated_within)
            .map(|(serial, c)| (serial.clone(), instance_from(c)))
            .collect()
    }
}

fn instance_from(controller: &Controller) -> SolarChargerInstance {
    let frame = &controller.frame;
    let mut values: HashMap<String, Vec<MetricValue>> = HashMap::new();

    let mut vo = |key: &str, v: Option<f64>, unit: &str, digits: u8| {
        if let Some(v) = v {
            values.insert(key.to_string(), vec![ValueObject::new(v, unit, digits).into()]);
        }
    };
    vo("V", frame.battery_voltage(), "V", 2);
    vo("I", frame.battery_current(), "A", 2);
    vo("P", frame.output_power(), "W", 0);
    vo("VPV", frame.panel_voltage(), "V", 2);
    vo("PPV", frame.panel_power(), "W", 0);
    vo("IL", frame.load_current(), "A", 2);
    vo(
        "H19",
        frame.yield_total_wh.map(|wh| wh as f64 / 1000.0),
        "kWh",
        2,
    );
    vo("H20", frame.yield_today_wh.map(|wh| wh as f64), "Wh", 0);
    vo("H21", frame.max_power_today_w.map(f64::from), "W", 0);
    vo("HSDS", frame.day_sequence.map(f64::from), "d", 0);

    let mut text = |key: &str, present: bool, value: &str| {
        if present {
            values.insert(key.to_string(), vec![MetricValue::from(value)]);
        }
    };
    text("CS", frame.operation_state.is_some(), frame.operation_state_name());
    text("MPPT", frame.mppt_mode.is_some(), frame.mppt_mode_name());
    text("ERR", frame.error_code.is_some(), frame.error_name());
    text("OR", frame.off_reason.is_some(), frame.off_reason_name());
    if let Some(on) = frame.load_output_on {
        values.insert(
            "LOAD".to_string(),
            vec![MetricValue::from(if on { "ON" } else { "OFF" })],
        );
    }

    SolarChargerInstance {
        data_age_ms: controller.age().as_millis() as u64,
        product_id: frame.product_name().to_string(),
        firmware_version: frame.firmware_version(),
        values,
    }
}

/// Read a VE.Direct serial device and hand complete frames to `on_frame`.
/// The device node is reopened with backoff when it goes away (USB
/// adapters come and go).
pub fn read_device<F>(path: &str, mut on_frame: F)
where
    F: FnMut(MpptFrame),
{
    loop {
        let open = || {
            std::fs::File::open(path).map_err(|e| {
                backoff::Error::transient(format!("opening {path}: {e}"))
            })
        };
        let Ok(mut file) = backoff_retry(open) else {
            log::error!("Giving up on VE.Direct device {path}");
            return;
        };
        log::info!("Reading VE.Direct frames from {path}");

        let mut reader = FrameReader::default();
        let mut buf = [0u8; 256];
        loop {
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for frame in reader.push_bytes(&buf[..n]) {
                        on_frame(MpptFrame::parse(&frame));
                    }
                }
                Err(e) => {
                    log::warn!("Read error on {path}: {e}");
                    break;
                }
            }
        }
        log::warn!("VE.Direct device {path} went away; reopening");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(serial: &str, voltage_mv: i32, current_ma: i32, panel_w: i32) -> MpptFrame {
        MpptFrame {
            serial: Some(serial.to_string()),
            product_id: Some(0xA060),
            firmware: Some("159".to_string()),
            battery_voltage_mv: Some(voltage_mv),
            battery_current_ma: Some(current_ma),
            panel_voltage_mv: Some(75360),
            panel_power_w: Some(panel_w),
            operation_state: Some(3),
            mppt_mode: Some(2),
            error_code: Some(0),
            load_output_on: Some(true),
            yield_total_wh: Some(17200),
            yield_today_wh: Some(830),
            ..Default::default()
        }
    }

    #[test]
    fn aggregates_across_fresh_controllers() {
        let mut charger = VictronCharger::new(false);
        charger.apply_frame(frame("A", 26810, 4400, 118));
        charger.apply_frame(frame("B", 26420, 2000, 60));

        let output = charger.output_power_watts().unwrap();
        assert!((output - (26.81 * 4.4 + 26.42 * 2.0)).abs() < 1e-9);
        assert_eq!(charger.output_voltage_volts(), Some(26.42));
        assert_eq!(charger.panel_power_watts(), Some(178.0));
        assert_eq!(charger.yield_total_kwh(), Some(34.4));
        assert_eq!(charger.yield_today_wh(), Some(1660.0));
    }

    #[test]
    fn negative_output_counts_as_zero() {
        let mut charger = VictronCharger::new(false);
        charger.apply_frame(frame("A", 26810, -200, 0));
        assert_eq!(charger.output_power_watts(), Some(0.0));
    }

    #[test]
    fn stale_controllers_are_excluded() {
        let mut charger = VictronCharger::new(false);
        let old = Instant::now() - (STALE_AFTER + Duration::from_secs(1));
        charger.apply_frame_at(frame("A", 26810, 4400, 118), old);
        charger.apply_frame(frame("B", 26420, 2000, 60));

        assert_eq!(charger.panel_power_watts(), Some(60.0));
        assert_eq!(charger.output_voltage_volts(), Some(26.42));
    }

    #[test]
    fn no_fresh_data_means_no_aggregates() {
        let mut charger = VictronCharger::new(false);
        let old = Instant::now() - (STALE_AFTER + Duration::from_secs(1));
        charger.apply_frame_at(frame("A", 26810, 4400, 118), old);
        assert_eq!(charger.output_power_watts(), None);
        assert_eq!(charger.output_voltage_volts(), None);
        // but the data age is still reported
        assert!(charger.data_age().unwrap() > STALE_AFTER);
    }

    #[test]
    fn frames_without_serial_are_dropped() {
        let mut charger = VictronCharger::new(false);
        charger.apply_frame(MpptFrame::default());
        assert!(charger.controllers.is_empty());
    }

    #[test]
    fn full_update_includes_stale_instances() {
        let mut charger = VictronCharger::new(false);
        let old = Instant::now() - Duration::from_secs(5);
        charger.apply_frame_at(frame("A", 26810, 4400, 118), old);
        charger.apply_frame(frame("B", 26420, 2000, 60));

        let full = charger.live_instances(true, Duration::from_secs(1));
        assert_eq!(full.len(), 2);
        // incremental update only carries recently-updated instances
        let partial = charger.live_instances(false, Duration::from_secs(1));
        assert_eq!(partial.len(), 1);
        assert!(partial.contains_key("B"));
    }

    #[test]
    fn instance_values_shape() {
        let mut charger = VictronCharger::new(false);
        charger.apply_frame(frame("A", 26810, 4400, 118));
        let instances = charger.live_instances(true, Duration::ZERO);
        let instance = &instances["A"];

        assert_eq!(instance.product_id, "SmartSolar MPPT 100|20 48V");
        assert_eq!(instance.firmware_version, "1.59");
        assert_eq!(
            instance.values["V"],
            vec![MetricValue::from(ValueObject::new(26.81, "V", 2))]
        );
        assert_eq!(instance.values["CS"], vec![MetricValue::from("Bulk")]);
        assert_eq!(instance.values["LOAD"], vec![MetricValue::from("ON")]);
        assert!(!instance.values.contains_key("OR"));
    }
}
