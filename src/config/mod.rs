mod battery;
mod solar_charger;
mod units;

pub use battery::{
    BatteryConfig, BatteryProvider, BatteryZendureConfig, JkBmsInterface, ZendureBypassMode,
    ZendureDeviceType, ZendureOutputControl,
};
pub use solar_charger::{SolarChargerConfig, SolarChargerMqttConfig, SolarChargerProvider};
pub use units::{AmperageUnit, VoltageUnit, WattageUnit};

use thiserror::Error;

use crate::constants::keys;
use crate::interfaces::cfgdb::{CfgDb, CfgDbError};

/// A config section that parsed but cannot be acted on.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("MQTT battery requires an SoC topic")]
    MissingSocTopic,
    #[error("Zendure device id must be 8 characters, got '{0}'")]
    BadZendureDeviceId(String),
    #[error("Zendure minimum SoC must be within 0..=60 %")]
    ZendureSocMinOutOfRange,
    #[error("Zendure maximum SoC must be within 40..=100 %")]
    ZendureSocMaxOutOfRange,
    #[error("calculated output power requires both a voltage and a current topic")]
    MissingCalculationTopics,
    #[error("a power topic is required unless output power is calculated")]
    MissingPowerTopic,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Store(#[from] CfgDbError),
    #[error("invalid {0} config: {1}")]
    Invalid(&'static str, ValidationError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub battery: BatteryConfig,
    pub solar_charger: SolarChargerConfig,
}

/// Load both config sections from the store. Missing sections and missing
/// fields fall back to their defaults.
pub fn load<AccessTag>(db: &CfgDb<AccessTag>) -> Result<Config, ConfigError> {
    let battery: BatteryConfig = db.get(keys::BATTERY)?.unwrap_or_default();
    let solar_charger: SolarChargerConfig = db.get(keys::SOLAR_CHARGER)?.unwrap_or_default();

    battery
        .validate()
        .map_err(|e| ConfigError::Invalid(keys::BATTERY, e))?;
    solar_charger
        .validate()
        .map_err(|e| ConfigError::Invalid(keys::SOLAR_CHARGER, e))?;

    Ok(Config {
        battery,
        solar_charger,
    })
}
