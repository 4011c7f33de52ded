use serde::{Deserialize, Serialize};

use super::units::{AmperageUnit, VoltageUnit};
use super::ValidationError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BatteryProvider {
    #[default]
    PylontechCan,
    JkBmsSerial,
    Mqtt,
    VictronSmartShunt,
    PytesCan,
    SbsCan,
    JbdBmsSerial,
    ZendureMqtt,
}

impl From<BatteryProvider> for u8 {
    fn from(provider: BatteryProvider) -> u8 {
        match provider {
            BatteryProvider::PylontechCan => 0,
            BatteryProvider::JkBmsSerial => 1,
            BatteryProvider::Mqtt => 2,
            BatteryProvider::VictronSmartShunt => 3,
            BatteryProvider::PytesCan => 4,
            BatteryProvider::SbsCan => 5,
            BatteryProvider::JbdBmsSerial => 6,
            BatteryProvider::ZendureMqtt => 7,
        }
    }
}

impl TryFrom<u8> for BatteryProvider {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::PylontechCan),
            1 => Ok(Self::JkBmsSerial),
            2 => Ok(Self::Mqtt),
            3 => Ok(Self::VictronSmartShunt),
            4 => Ok(Self::PytesCan),
            5 => Ok(Self::SbsCan),
            6 => Ok(Self::JbdBmsSerial),
            7 => Ok(Self::ZendureMqtt),
            _ => Err(format!("invalid battery provider code {code}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum JkBmsInterface {
    #[default]
    Uart,
    Transceiver,
}

impl From<JkBmsInterface> for u8 {
    fn from(interface: JkBmsInterface) -> u8 {
        match interface {
            JkBmsInterface::Uart => 0,
            JkBmsInterface::Transceiver => 1,
        }
    }
}

impl TryFrom<u8> for JkBmsInterface {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Uart),
            1 => Ok(Self::Transceiver),
            _ => Err(format!("invalid JK BMS interface code {code}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ZendureDeviceType {
    #[default]
    Hub1200,
    Hub2000,
    Aio2400,
    Ace1500,
    Hyper2000,
}

impl ZendureDeviceType {
    /// Vendor product key, used as the first segment of the device's MQTT
    /// topic tree.
    pub fn product_key(self) -> &'static str {
        match self {
            Self::Hub1200 => "73bkTV",
            Self::Hub2000 => "A8yh63",
            Self::Aio2400 => "yOEbUt",
            Self::Ace1500 => "8bM93H",
            Self::Hyper2000 => "gDa3tb",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hub1200 => "SolarFlow Hub 1200",
            Self::Hub2000 => "SolarFlow Hub 2000",
            Self::Aio2400 => "SolarFlow AIO 2400",
            Self::Ace1500 => "SolarFlow Ace 1500",
            Self::Hyper2000 => "SolarFlow Hyper 2000",
        }
    }
}

impl From<ZendureDeviceType> for u8 {
    fn from(device_type: ZendureDeviceType) -> u8 {
        match device_type {
            ZendureDeviceType::Hub1200 => 0,
            ZendureDeviceType::Hub2000 => 1,
            ZendureDeviceType::Aio2400 => 2,
            ZendureDeviceType::Ace1500 => 3,
            ZendureDeviceType::Hyper2000 => 4,
        }
    }
}

impl TryFrom<u8> for ZendureDeviceType {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Hub1200),
            1 => Ok(Self::Hub2000),
            2 => Ok(Self::Aio2400),
            3 => Ok(Self::Ace1500),
            4 => Ok(Self::Hyper2000),
            _ => Err(format!("invalid Zendure device type code {code}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ZendureBypassMode {
    #[default]
    Automatic,
    AlwaysOff,
    AlwaysOn,
}

impl From<ZendureBypassMode> for u8 {
    fn from(mode: ZendureBypassMode) -> u8 {
        match mode {
            ZendureBypassMode::Automatic => 0,
            ZendureBypassMode::AlwaysOff => 1,
            ZendureBypassMode::AlwaysOn => 2,
        }
    }
}

impl TryFrom<u8> for ZendureBypassMode {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Automatic),
            1 => Ok(Self::AlwaysOff),
            2 => Ok(Self::AlwaysOn),
            _ => Err(format!("invalid bypass mode code {code}")),
        }
    }
}

/// How the Zendure hub's inverter output limit is managed: not at all, a
/// single fixed limit, or a day/night schedule around sunrise and sunset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ZendureOutputControl {
    #[default]
    None,
    Fixed,
    Schedule,
}

impl From<ZendureOutputControl> for u8 {
    fn from(control: ZendureOutputControl) -> u8 {
        match control {
            ZendureOutputControl::None => 0,
            ZendureOutputControl::Fixed => 1,
            ZendureOutputControl::Schedule => 2,
        }
    }
}

impl TryFrom<u8> for ZendureOutputControl {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Fixed),
            2 => Ok(Self::Schedule),
            _ => Err(format!("invalid output control code {code}")),
        }
    }
}

/// Zendure SolarFlow settings. Always carried (and serialized) as part of
/// [`BatteryConfig`], regardless of the selected provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryZendureConfig {
    pub device_type: ZendureDeviceType,
    pub device_id: String,
    /// Seconds between full-update requests to the device.
    pub polling_interval: u32,
    pub soc_min: f64,
    pub soc_max: f64,
    pub bypass_mode: ZendureBypassMode,
    pub max_output: u16,
    pub auto_shutdown: bool,
    pub output_limit: u16,
    pub output_control: ZendureOutputControl,
    pub output_limit_day: u16,
    pub output_limit_night: u16,
    /// Minutes relative to sunrise at which the day limit starts to apply.
    pub sunrise_offset: i16,
    /// Minutes relative to sunset at which the day limit stops applying.
    pub sunset_offset: i16,
    pub charge_through_enable: bool,
    /// Maximum hours between full charges before one is forced.
    pub charge_through_interval: u32,
}

impl Default for BatteryZendureConfig {
    fn default() -> Self {
        Self {
            device_type: ZendureDeviceType::default(),
            device_id: String::new(),
            polling_interval: 60,
            soc_min: 10.0,
            soc_max: 100.0,
            bypass_mode: ZendureBypassMode::default(),
            max_output: 800,
            auto_shutdown: false,
            output_limit: 800,
            output_control: ZendureOutputControl::default(),
            output_limit_day: 300,
            output_limit_night: 100,
            sunrise_offset: 60,
            sunset_offset: -60,
            charge_through_enable: false,
            charge_through_interval: 168,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub enabled: bool,
    pub verbose_logging: bool,
    pub provider: BatteryProvider,
    pub jkbms_interface: JkBmsInterface,
    /// Seconds between JK BMS polls.
    pub jkbms_polling_interval: u32,
    pub mqtt_soc_topic: String,
    pub mqtt_soc_json_path: String,
    pub mqtt_voltage_topic: String,
    pub mqtt_voltage_json_path: String,
    pub mqtt_voltage_unit: VoltageUnit,
    pub enable_discharge_current_limit: bool,
    pub discharge_current_limit: f64,
    pub discharge_current_limit_below_soc: f64,
    pub discharge_current_limit_below_voltage: f64,
    pub use_battery_reported_discharge_current_limit: bool,
    pub mqtt_discharge_current_topic: String,
    pub mqtt_discharge_current_json_path: String,
    pub mqtt_amperage_unit: AmperageUnit,
    pub zendure: BatteryZendureConfig,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verbose_logging: false,
            provider: BatteryProvider::default(),
            jkbms_interface: JkBmsInterface::default(),
            jkbms_polling_interval: 5,
            mqtt_soc_topic: String::new(),
            mqtt_soc_json_path: String::new(),
            mqtt_voltage_topic: String::new(),
            mqtt_voltage_json_path: String::new(),
            mqtt_voltage_unit: VoltageUnit::default(),
            enable_discharge_current_limit: false,
            discharge_current_limit: 0.0,
            discharge_current_limit_below_soc: 100.0,
            discharge_current_limit_below_voltage: 0.0,
            use_battery_reported_discharge_current_limit: false,
            mqtt_discharge_current_topic: String::new(),
            mqtt_discharge_current_json_path: String::new(),
            mqtt_amperage_unit: AmperageUnit::default(),
            zendure: BatteryZendureConfig::default(),
        }
    }
}

impl BatteryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }
        match self.provider {
            BatteryProvider::Mqtt => {
                if self.mqtt_soc_topic.is_empty() {
                    return Err(ValidationError::MissingSocTopic);
                }
            }
            BatteryProvider::ZendureMqtt => {
                if self.zendure.device_id.len() != 8 {
                    return Err(ValidationError::BadZendureDeviceId(
                        self.zendure.device_id.clone(),
                    ));
                }
                if !(0.0..=60.0).contains(&self.zendure.soc_min) {
                    return Err(ValidationError::ZendureSocMinOutOfRange);
                }
                if !(40.0..=100.0).contains(&self.zendure.soc_max) {
                    return Err(ValidationError::ZendureSocMaxOutOfRange);
                }
            }
            _ => (),
        }
        Ok(())
    }
}
