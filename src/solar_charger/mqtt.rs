//! Solar charger readings republished by some other system over MQTT.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{SolarChargerMqttConfig, ValidationError};
use crate::data_mgmt::extract;
use crate::data_mgmt::livedata::{MetricValue, SolarChargerInstance, ValueObject};

use super::ChargerStats;

/// MQTT sources publish at their own pace; readings are trusted for a
/// minute.
pub const STALE_AFTER: Duration = Duration::from_secs(60);

/// Key under which the single MQTT-fed instance appears in live data.
pub const INSTANCE_KEY: &str = "MQTT";

#[derive(Clone, Copy, Debug)]
struct Reading {
    value: f64,
    updated: Instant,
}

impl Reading {
    fn current(&self) -> Option<f64> {
        (self.updated.elapsed() <= STALE_AFTER).then_some(self.value)
    }
}

pub struct MqttCharger {
    cfg: SolarChargerMqttConfig,
    verbose: bool,
    power: Option<Reading>,
    voltage: Option<Reading>,
    current: Option<Reading>,
}

impl MqttCharger {
    pub fn new(cfg: SolarChargerMqttConfig, verbose: bool) -> Result<Self, ValidationError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            verbose,
            power: None,
            voltage: None,
            current: None,
        })
    }

    pub fn subscriptions(&self) -> Vec<String> {
        if self.cfg.calculate_output_power {
            vec![self.cfg.voltage_topic.clone(), self.cfg.current_topic.clone()]
        } else {
            let mut topics = vec![self.cfg.power_topic.clone()];
            if !self.cfg.voltage_topic.is_empty() {
                topics.push(self.cfg.voltage_topic.clone());
            }
            topics
        }
    }

    pub fn handle_message(&mut self, topic: &str, payload: &str) {
        if !self.cfg.calculate_output_power && topic == self.cfg.power_topic {
            self.handle_power(payload);
        } else if topic == self.cfg.voltage_topic {
            self.handle_voltage(payload);
        } else if self.cfg.calculate_output_power && topic == self.cfg.current_topic {
            self.handle_current(payload);
        }
    }

    fn handle_power(&mut self, payload: &str) {
        let raw = match extract::numeric_from_payload(payload, &self.cfg.power_path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring solar power payload: {e}");
                return;
            }
        };
        let watts = self.cfg.power_unit.to_watts(raw);
        if watts < 0.0 {
            log::warn!("Ignoring negative solar output power of {watts} W");
            return;
        }
        self.power = Some(Reading {
            value: watts,
            updated: Instant::now(),
        });
        if self.verbose {
            log::info!("MQTT solar charger output power: {watts} W");
        }
    }

    fn handle_voltage(&mut self, payload: &str) {
        let raw = match extract::numeric_from_payload(payload, &self.cfg.voltage_path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring solar voltage payload: {e}");
                return;
            }
        };
        let volts = self.cfg.voltage_unit.to_volts(raw);
        self.voltage = Some(Reading {
            value: volts,
            updated: Instant::now(),
        });
        if self.verbose {
            log::info!("MQTT solar charger output voltage: {volts} V");
        }
    }

    fn handle_current(&mut self, payload: &str) {
        let raw = match extract::numeric_from_payload(payload, &self.cfg.current_path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring solar current payload: {e}");
                return;
            }
        };
        let amps = self.cfg.current_unit.to_amps(raw);
        self.current = Some(Reading {
            value: amps,
            updated: Instant::now(),
        });
        if self.verbose {
            log::info!("MQTT solar charger output current: {amps} A");
        }
    }

    fn output_power(&self) -> Option<f64> {
        if self.cfg.calculate_output_power {
            let volts = self.voltage.as_ref()?.current()?;
            let amps = self.current.as_ref()?.current()?;
            Some(volts * amps)
        } else {
            self.power.as_ref()?.current()
        }
    }

    fn last_update(&self) -> Option<Instant> {
        [&self.power, &self.voltage, &self.current]
            .into_iter()
            .flatten()
            .map(|r| r.updated)
            .max()
    }
}

impl ChargerStats for MqttCharger {
    fn data_age(&self) -> Option<Duration> {
        self.last_update().map(|t| t.elapsed())
    }

    fn output_power_watts(&self) -> Option<f64> {
        self.output_power()
    }

    fn output_voltage_volts(&self) -> Option<f64> {
        self.voltage.as_ref()?.current()
    }

    // not knowable from republished output readings
    fn panel_power_watts(&self) -> Option<f64> {
        None
    }

    fn yield_total_kwh(&self) -> Option<f64> {
        None
    }

    fn yield_today_wh(&self) -> Option<f64> {
        None
    }

    fn live_instances(
        &self,
        full_update: bool,
        updated_within: Duration,
    ) -> HashMap<String, SolarChargerInstance> {
        let Some(age) = self.data_age() else {
            return HashMap::new();
        };
        if !full_update && age > updated_within {
            return HashMap::new();
        }

        let mut values: HashMap<String, Vec<MetricValue>> = HashMap::new();
        if let Some(p) = self.output_power() {
            values.insert("P".to_string(), vec![ValueObject::new(p, "W", 1).into()]);
        }
        if let Some(v) = self.output_voltage_volts() {
            values.insert("V".to_string(), vec![ValueObject::new(v, "V", 2).into()]);
        }
        if let Some(i) = self.current.as_ref().and_then(Reading::current) {
            values.insert("I".to_string(), vec![ValueObject::new(i, "A", 2).into()]);
        }

        HashMap::from([(
            INSTANCE_KEY.to_string(),
            SolarChargerInstance {
                data_age_ms: age.as_millis() as u64,
                product_id: INSTANCE_KEY.to_string(),
                firmware_version: "n/a".to_string(),
                values,
            },
        )])
    }
}
