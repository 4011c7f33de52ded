use serde::{Deserialize, Serialize};

use super::units::{AmperageUnit, VoltageUnit, WattageUnit};
use super::ValidationError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SolarChargerProvider {
    #[default]
    VeDirect,
    Mqtt,
}

impl From<SolarChargerProvider> for u8 {
    fn from(provider: SolarChargerProvider) -> u8 {
        match provider {
            SolarChargerProvider::VeDirect => 0,
            SolarChargerProvider::Mqtt => 1,
        }
    }
}

impl TryFrom<u8> for SolarChargerProvider {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::VeDirect),
            1 => Ok(Self::Mqtt),
            _ => Err(format!("invalid solar charger provider code {code}")),
        }
    }
}

/// Settings for the MQTT solar charger provider. Always carried (and
/// serialized) as part of [`SolarChargerConfig`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarChargerMqttConfig {
    /// Derive output power as voltage x current instead of reading a
    /// dedicated power topic.
    pub calculate_output_power: bool,
    pub power_topic: String,
    pub power_path: String,
    pub power_unit: WattageUnit,
    pub voltage_topic: String,
    pub voltage_path: String,
    pub voltage_unit: VoltageUnit,
    pub current_topic: String,
    pub current_path: String,
    pub current_unit: AmperageUnit,
}

impl SolarChargerMqttConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.calculate_output_power {
            if self.voltage_topic.is_empty() || self.current_topic.is_empty() {
                return Err(ValidationError::MissingCalculationTopics);
            }
        } else if self.power_topic.is_empty() {
            return Err(ValidationError::MissingPowerTopic);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarChargerConfig {
    pub enabled: bool,
    pub verbose_logging: bool,
    pub provider: SolarChargerProvider,
    /// Publish live data only when an instance has new readings.
    pub publish_updates_only: bool,
    pub mqtt: SolarChargerMqttConfig,
}

impl Default for SolarChargerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verbose_logging: false,
            provider: SolarChargerProvider::default(),
            publish_updates_only: false,
            mqtt: SolarChargerMqttConfig::default(),
        }
    }
}

impl SolarChargerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.provider == SolarChargerProvider::Mqtt {
            self.mqtt.validate()?;
        }
        Ok(())
    }
}
