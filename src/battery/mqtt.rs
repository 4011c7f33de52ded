//! Battery provider fed by an external BMS publishing over MQTT.

use crate::config::BatteryConfig;
use crate::data_mgmt::extract;

use super::BatteryStats;

pub struct MqttBattery {
    cfg: BatteryConfig,
    pub stats: BatteryStats,
}

impl MqttBattery {
    pub fn new(cfg: BatteryConfig) -> Self {
        Self {
            stats: BatteryStats::with_manufacturer("MQTT"),
            cfg,
        }
    }

    /// Topics this provider needs subscribed.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = vec![self.cfg.mqtt_soc_topic.clone()];
        if !self.cfg.mqtt_voltage_topic.is_empty() {
            topics.push(self.cfg.mqtt_voltage_topic.clone());
        }
        if self.cfg.enable_discharge_current_limit
            && self.cfg.use_battery_reported_discharge_current_limit
            && !self.cfg.mqtt_discharge_current_topic.is_empty()
        {
            topics.push(self.cfg.mqtt_discharge_current_topic.clone());
        }
        topics
    }

    pub fn handle_message(&mut self, topic: &str, payload: &str) {
        if topic == self.cfg.mqtt_soc_topic {
            self.handle_soc(payload);
        } else if topic == self.cfg.mqtt_voltage_topic {
            self.handle_voltage(payload);
        } else if topic == self.cfg.mqtt_discharge_current_topic {
            self.handle_discharge_current_limit(payload);
        }
    }

    fn handle_soc(&mut self, payload: &str) {
        let soc = match extract::numeric_from_payload(payload, &self.cfg.mqtt_soc_json_path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring SoC payload: {e}");
                return;
            }
        };
        if !(0.0..=100.0).contains(&soc) {
            log::warn!("Ignoring implausible SoC of {soc} %");
            return;
        }
        self.stats.update_soc(soc, soc_precision(soc));
        if self.cfg.verbose_logging {
            log::info!("MQTT battery SoC: {soc} %");
        }
    }

    fn handle_voltage(&mut self, payload: &str) {
        let raw = match extract::numeric_from_payload(payload, &self.cfg.mqtt_voltage_json_path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring voltage payload: {e}");
                return;
            }
        };
        let volts = self.cfg.mqtt_voltage_unit.to_volts(raw);
        if !(0.0..=65.0).contains(&volts) {
            log::warn!("Ignoring implausible battery voltage of {volts} V");
            return;
        }
        self.stats.update_voltage(volts);
        if self.cfg.verbose_logging {
            log::info!("MQTT battery voltage: {volts} V");
        }
    }

    fn handle_discharge_current_limit(&mut self, payload: &str) {
        let raw = match extract::numeric_from_payload(
            payload,
            &self.cfg.mqtt_discharge_current_json_path,
        ) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring discharge current limit payload: {e}");
                return;
            }
        };
        let amps = self.cfg.mqtt_amperage_unit.to_amps(raw);
        if amps < 0.0 {
            log::warn!("Ignoring negative discharge current limit of {amps} A");
            return;
        }
        self.stats.update_discharge_current_limit(amps);
        if self.cfg.verbose_logging {
            log::info!("MQTT battery discharge current limit: {amps} A");
        }
    }
}

/// Decimal digits (0..=2) needed to display the given SoC value.
fn soc_precision(soc: f64) -> u8 {
    let mut precision = 0u8;
    let mut scaled = soc;
    while precision < 2 {
        if (scaled - scaled.round()).abs() < 1e-6 {
            break;
        }
        precision += 1;
        scaled *= 10.0;
    }
    precision
}

#[cfg(test)]
mod tests {
    use crate::config::{AmperageUnit, VoltageUnit};

    use super::*;

    fn mqtt_config() -> BatteryConfig {
        BatteryConfig {
            enabled: true,
            provider: crate::config::BatteryProvider::Mqtt,
            mqtt_soc_topic: "bms/soc".into(),
            mqtt_voltage_topic: "bms/voltage".into(),
            mqtt_voltage_unit: VoltageUnit::MilliVolts,
            mqtt_discharge_current_topic: "bms/max_discharge".into(),
            mqtt_amperage_unit: AmperageUnit::Amps,
            enable_discharge_current_limit: true,
            use_battery_reported_discharge_current_limit: true,
            ..Default::default()
        }
    }

    #[test]
    fn subscriptions_cover_configured_topics() {
        let battery = MqttBattery::new(mqtt_config());
        let topics = battery.subscriptions();
        assert_eq!(topics, vec!["bms/soc", "bms/voltage", "bms/max_discharge"]);
    }

    #[test]
    fn discharge_topic_only_when_reported_limit_in_use() {
        let mut cfg = mqtt_config();
        cfg.use_battery_reported_discharge_current_limit = false;
        let battery = MqttBattery::new(cfg);
        assert_eq!(battery.subscriptions(), vec!["bms/soc", "bms/voltage"]);
    }

    #[test]
    fn soc_from_plain_payload() {
        let mut battery = MqttBattery::new(mqtt_config());
        battery.handle_message("bms/soc", "78.4");
        assert_eq!(battery.stats.soc(), Some(78.4));
        assert_eq!(battery.stats.soc_precision(), 1);
    }

    #[test]
    fn implausible_soc_rejected() {
        let mut battery = MqttBattery::new(mqtt_config());
        battery.handle_message("bms/soc", "142");
        assert_eq!(battery.stats.soc(), None);
        battery.handle_message("bms/soc", "-3");
        assert_eq!(battery.stats.soc(), None);
    }

    #[test]
    fn voltage_unit_conversion_and_plausibility() {
        let mut battery = MqttBattery::new(mqtt_config());
        battery.handle_message("bms/voltage", "51400");
        assert_eq!(battery.stats.voltage(), Some(51.4));
        // 80 V after conversion is out of range
        battery.handle_message("bms/voltage", "80000");
        assert_eq!(battery.stats.voltage(), Some(51.4));
    }

    #[test]
    fn negative_discharge_limit_rejected() {
        let mut battery = MqttBattery::new(mqtt_config());
        battery.handle_message("bms/max_discharge", "-5");
        assert_eq!(battery.stats.discharge_current_limit(), None);
        battery.handle_message("bms/max_discharge", "60");
        assert_eq!(battery.stats.discharge_current_limit(), Some(60.0));
    }

    #[test]
    fn soc_precision_detection() {
        assert_eq!(soc_precision(78.0), 0);
        assert_eq!(soc_precision(78.4), 1);
        assert_eq!(soc_precision(78.45), 2);
        // capped at two digits
        assert_eq!(soc_precision(78.456), 2);
    }
}
