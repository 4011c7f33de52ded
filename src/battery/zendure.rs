//! Zendure SolarFlow hub, managed over the vendor's MQTT topic tree.

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{BatteryZendureConfig, ZendureOutputControl};
use crate::helpers::suntime::SunWindow;
use crate::interfaces::mqtt::MqttMessage;

use super::BatteryStats;

// Property names in the device's report payloads.
const PROP_SOC: &str = "electricLevel";
const PROP_SOC_MAX: &str = "socSet";
const PROP_SOC_MIN: &str = "minSoc";
const PROP_OUTPUT_LIMIT: &str = "outputLimit";
const PROP_INVERSE_MAX: &str = "inverseMaxPower";
const PROP_STATE: &str = "packState";
const PROP_AUTO_SHUTDOWN: &str = "autoShutdown";
const PROP_BYPASS_MODE: &str = "passMode";
const PROP_OUTPUT_POWER: &str = "outputHomePower";
const PROP_CHARGE_POWER: &str = "outputPackPower";
const PROP_DISCHARGE_POWER: &str = "packInputPower";
const PROP_SOLAR_POWER_1: &str = "solarPower1";
const PROP_SOLAR_POWER_2: &str = "solarPower2";

// Read requests are tagged with this message id; the device echoes it in
// its replies, which is how poll responses are told apart from frames
// meant for the vendor cloud.
const MESSAGE_ID: i64 = 123;

#[derive(Error, Debug)]
pub enum ZendureError {
    #[error("device id must be 8 characters, got '{0}'")]
    InvalidDeviceId(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZendureState {
    #[default]
    Idle,
    Charging,
    Discharging,
}

impl TryFrom<u8> for ZendureState {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Charging),
            2 => Ok(Self::Discharging),
            _ => Err(format!("invalid pack state code {code}")),
        }
    }
}

/// Device state mirrored from `properties/report` frames.
#[derive(Clone, Debug, Default)]
pub struct ZendureDeviceState {
    pub state: ZendureState,
    pub output_limit: Option<u16>,
    pub inverse_max: Option<u16>,
    pub soc_min: Option<f64>,
    pub soc_max: Option<f64>,
    pub auto_shutdown: Option<bool>,
    pub bypass_mode: Option<u8>,
    pub output_power: Option<f64>,
    pub charge_power: Option<f64>,
    pub discharge_power: Option<f64>,
    pub solar_power_1: Option<f64>,
    pub solar_power_2: Option<f64>,
}

impl ZendureDeviceState {
    /// Combined input power across both solar channels.
    pub fn solar_power(&self) -> Option<f64> {
        match (self.solar_power_1, self.solar_power_2) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or_default() + b.unwrap_or_default()),
        }
    }
}

pub struct ZendureBattery {
    cfg: BatteryZendureConfig,
    verbose: bool,
    pub stats: BatteryStats,
    pub device: ZendureDeviceState,

    report_topic: String,
    timesync_topic: String,
    read_topic: String,
    write_topic: String,
    timesync_reply_topic: String,

    last_poll: Option<Instant>,
    last_settings_push: Option<Instant>,
    charge_through_active: bool,
    charge_through_checked_on: Option<NaiveDate>,
    last_full: Option<DateTime<Utc>>,
}

impl ZendureBattery {
    pub fn new(cfg: BatteryZendureConfig, verbose: bool) -> Result<Self, ZendureError> {
        if cfg.device_id.len() != 8 {
            return Err(ZendureError::InvalidDeviceId(cfg.device_id.clone()));
        }
        let key = cfg.device_type.product_key();
        let id = &cfg.device_id;

        Ok(Self {
            stats: BatteryStats::with_manufacturer(cfg.device_type.name()),
            device: ZendureDeviceState::default(),
            report_topic: format!("/{key}/{id}/properties/report"),
            timesync_topic: format!("/{key}/{id}/time-sync"),
            read_topic: format!("iot/{key}/{id}/properties/read"),
            write_topic: format!("iot/{key}/{id}/properties/write"),
            timesync_reply_topic: format!("iot/{key}/{id}/time-sync/reply"),
            last_poll: None,
            last_settings_push: None,
            charge_through_active: false,
            charge_through_checked_on: None,
            last_full: None,
            cfg,
            verbose,
        })
    }

    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.report_topic.clone(), self.timesync_topic.clone()]
    }

    pub fn charge_through_active(&self) -> bool {
        self.charge_through_active
    }

    pub fn handle_message(&mut self, topic: &str, payload: &str, out: &mut Vec<MqttMessage>) {
        if topic == self.report_topic {
            self.handle_report(payload);
        } else if topic == self.timesync_topic {
            self.handle_timesync(Utc::now(), out);
        }
    }

    fn handle_report(&mut self, payload: &str) {
        let root: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring unparseable Zendure report: {e}");
                return;
            }
        };
        if !message_id_matches(&root) {
            log::debug!("Ignoring Zendure frame not addressed to us");
            return;
        }
        let Some(device_id) = root["deviceId"].as_str() else {
            log::warn!("Ignoring Zendure report without a device id");
            return;
        };
        if device_id != self.cfg.device_id {
            log::warn!("Ignoring Zendure report from unexpected device {device_id}");
            return;
        }
        let Some(properties) = root["properties"].as_object() else {
            log::debug!("Zendure report without properties");
            return;
        };

        for (name, value) in properties {
            self.apply_property(name, value);
        }
        if self.verbose {
            log::info!(
                "Zendure report applied; SoC: {:?} %, state: {:?}",
                self.stats.soc(),
                self.device.state
            );
        }
    }

    fn apply_property(&mut self, name: &str, value: &Value) {
        let as_f64 = value.as_f64();
        match name {
            PROP_SOC => {
                let Some(soc) = as_f64 else { return };
                if !(0.0..=100.0).contains(&soc) {
                    log::warn!("Ignoring implausible Zendure SoC of {soc} %");
                    return;
                }
                self.stats.update_soc(soc, 0);
                if soc >= 100.0 {
                    self.note_full_charge(Utc::now());
                }
            }
            // SoC window values are reported in tenths of a percent
            PROP_SOC_MAX => {
                if let Some(v) = as_f64.map(|v| v / 10.0).filter(|v| (40.0..=100.0).contains(v)) {
                    self.device.soc_max = Some(v);
                }
            }
            PROP_SOC_MIN => {
                if let Some(v) = as_f64.map(|v| v / 10.0).filter(|v| (0.0..=60.0).contains(v)) {
                    self.device.soc_min = Some(v);
                }
            }
            PROP_OUTPUT_LIMIT => self.device.output_limit = as_f64.map(|v| v as u16),
            PROP_INVERSE_MAX => self.device.inverse_max = as_f64.map(|v| v as u16),
            PROP_STATE => {
                if let Some(code) = as_f64 {
                    match ZendureState::try_from(code as u8) {
                        Ok(state) => self.device.state = state,
                        Err(e) => log::warn!("Zendure report: {e}"),
                    }
                }
            }
            PROP_AUTO_SHUTDOWN => self.device.auto_shutdown = as_f64.map(|v| v != 0.0),
            PROP_BYPASS_MODE => self.device.bypass_mode = as_f64.map(|v| v as u8),
            PROP_OUTPUT_POWER => self.device.output_power = as_f64,
            PROP_CHARGE_POWER => self.device.charge_power = as_f64,
            PROP_DISCHARGE_POWER => self.device.discharge_power = as_f64,
            PROP_SOLAR_POWER_1 => self.device.solar_power_1 = as_f64,
            PROP_SOLAR_POWER_2 => self.device.solar_power_2 = as_f64,
            _ => log::trace!("Unhandled Zendure property {name}"),
        }
    }

    fn note_full_charge(&mut self, now: DateTime<Utc>) {
        self.last_full = Some(now);
        if self.charge_through_active {
            log::info!("Zendure charge-through cycle complete");
            self.charge_through_active = false;
        }
    }

    fn handle_timesync(&self, now: DateTime<Utc>, out: &mut Vec<MqttMessage>) {
        let reply = json!({
            "messageId": MESSAGE_ID,
            "timestamp": now.timestamp(),
            "zoneOffset": "+00:00",
        });
        out.push(MqttMessage::new(
            self.timesync_reply_topic.clone(),
            reply.to_string(),
        ));
    }

    /// Periodic work: full-update polling, charge-through bookkeeping, and
    /// pushing settings that drifted from the configured targets.
    pub fn tick(&mut self, now: DateTime<Utc>, sun: Option<SunWindow>, out: &mut Vec<MqttMessage>) {
        // a hub that shut itself down overnight is left alone entirely
        let night = sun.is_some_and(|w| !w.is_day(now));
        if self.cfg.auto_shutdown && night && self.device.state == ZendureState::Idle {
            log::debug!("Zendure idle at night; skipping periodic work");
            return;
        }
        self.check_charge_through(now, sun);
        self.poll(out);
        self.push_settings(now, sun, out);
    }

    fn poll(&mut self, out: &mut Vec<MqttMessage>) {
        let interval = Duration::from_secs(self.cfg.polling_interval.max(1) as u64);
        if self.last_poll.is_some_and(|t| t.elapsed() < interval) {
            return;
        }
        self.last_poll = Some(Instant::now());

        let request = json!({
            "messageId": MESSAGE_ID,
            "deviceId": self.cfg.device_id,
            "properties": ["getAll"],
        });
        out.push(MqttMessage::new(self.read_topic.clone(), request.to_string()));
    }

    /// Once per day, at first tick past sunrise: decide whether the battery
    /// can make it to the next expected full charge, and if not, start a
    /// charge-through cycle that holds charging priority until 100 %.
    fn check_charge_through(&mut self, now: DateTime<Utc>, sun: Option<SunWindow>) {
        if !self.cfg.charge_through_enable {
            return;
        }
        let Some(window) = sun else { return };
        if now < window.sunrise || self.charge_through_checked_on == Some(now.date_naive()) {
            return;
        }
        self.charge_through_checked_on = Some(now.date_naive());

        let daylight_h = window.daylight().as_secs() / 3600;
        if self.charge_through_due(now, daylight_h as u32) {
            log::info!(
                "Last full charge too long ago; starting Zendure charge-through cycle"
            );
            self.charge_through_active = true;
        }
    }

    fn charge_through_due(&self, now: DateTime<Utc>, predicted_daylight_h: u32) -> bool {
        let Some(last_full) = self.last_full else {
            return true;
        };
        let age_h = (now - last_full).num_hours().max(0) as u32;
        age_h + predicted_daylight_h > self.cfg.charge_through_interval
    }

    fn push_settings(&mut self, now: DateTime<Utc>, sun: Option<SunWindow>, out: &mut Vec<MqttMessage>) {
        // writes are rate-limited to the polling cadence so that persistent
        // drift does not turn into a stream of duplicate write requests
        let interval = Duration::from_secs(self.cfg.polling_interval.max(1) as u64);
        if self.last_settings_push.is_some_and(|t| t.elapsed() < interval) {
            return;
        }

        let mut properties = serde_json::Map::new();

        let target_soc_max = if self.charge_through_active {
            100.0
        } else {
            self.cfg.soc_max
        };
        if self.device.soc_max.is_some_and(|v| v != target_soc_max) {
            properties.insert(PROP_SOC_MAX.into(), json!((target_soc_max * 10.0) as u16));
        }
        if self.device.soc_min.is_some_and(|v| v != self.cfg.soc_min) {
            properties.insert(PROP_SOC_MIN.into(), json!((self.cfg.soc_min * 10.0) as u16));
        }
        if self
            .device
            .bypass_mode
            .is_some_and(|v| v != u8::from(self.cfg.bypass_mode))
        {
            properties.insert(PROP_BYPASS_MODE.into(), json!(u8::from(self.cfg.bypass_mode)));
        }
        if self
            .device
            .auto_shutdown
            .is_some_and(|v| v != self.cfg.auto_shutdown)
        {
            properties.insert(
                PROP_AUTO_SHUTDOWN.into(),
                json!(u8::from(self.cfg.auto_shutdown)),
            );
        }
        if let Some(target) = self.target_output_limit(now, sun) {
            let target = self.calc_output_limit(target);
            if self.device.output_limit.is_some_and(|v| v != target) {
                properties.insert(PROP_OUTPUT_LIMIT.into(), json!(target));
            }
        }

        if properties.is_empty() {
            return;
        }
        self.last_settings_push = Some(Instant::now());
        let request = json!({
            "messageId": MESSAGE_ID,
            "deviceId": self.cfg.device_id,
            "properties": properties,
        });
        if self.verbose {
            log::info!("Pushing Zendure settings: {request}");
        }
        out.push(MqttMessage::new(self.write_topic.clone(), request.to_string()));
    }

    /// Target inverter output limit in W, before quantization. `None` when
    /// output is not managed.
    fn target_output_limit(&self, now: DateTime<Utc>, sun: Option<SunWindow>) -> Option<u16> {
        if self.charge_through_active {
            // hold everything back until the pack reaches 100 %
            return Some(0);
        }
        match self.cfg.output_control {
            ZendureOutputControl::None => None,
            ZendureOutputControl::Fixed => Some(self.cfg.output_limit),
            ZendureOutputControl::Schedule => {
                let Some(window) = sun else {
                    // no sunrise/sunset available; fall back to the fixed limit
                    return Some(self.cfg.output_limit);
                };
                let day_start = window.sunrise
                    + chrono::Duration::minutes(self.cfg.sunrise_offset as i64);
                let day_end =
                    window.sunset + chrono::Duration::minutes(self.cfg.sunset_offset as i64);
                if now >= day_start && now < day_end {
                    Some(self.cfg.output_limit_day)
                } else {
                    Some(self.cfg.output_limit_night)
                }
            }
        }
    }

    /// Clamp the limit to the configured and device maxima, and quantize
    /// values under 100 W to the 30 W steps the hub actually supports.
    fn calc_output_limit(&self, limit: u16) -> u16 {
        let max = self
            .device
            .inverse_max
            .unwrap_or(u16::MAX)
            .min(self.cfg.max_output);
        let limit = limit.min(max);
        if limit >= 100 {
            return limit;
        }
        30 * (limit / 30) + 30 * ((limit % 30) / 15)
    }
}

fn message_id_matches(root: &Value) -> bool {
    match &root["messageId"] {
        Value::Number(n) => n.as_i64() == Some(MESSAGE_ID),
        Value::String(s) => s.parse::<i64>().ok() == Some(MESSAGE_ID),
        _ => false,
    }
}
