use serde::{Deserialize, Serialize};

/// Unit selectors used when ingesting readings from third-party MQTT
/// payloads. Wire values are the numeric codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VoltageUnit {
    #[default]
    Volts,
    DeciVolts,
    CentiVolts,
    MilliVolts,
}

impl VoltageUnit {
    pub fn to_volts(self, value: f64) -> f64 {
        match self {
            Self::Volts => value,
            Self::DeciVolts => value / 10.0,
            Self::CentiVolts => value / 100.0,
            Self::MilliVolts => value / 1000.0,
        }
    }
}

impl From<VoltageUnit> for u8 {
    fn from(unit: VoltageUnit) -> u8 {
        match unit {
            VoltageUnit::Volts => 0,
            VoltageUnit::DeciVolts => 1,
            VoltageUnit::CentiVolts => 2,
            VoltageUnit::MilliVolts => 3,
        }
    }
}

impl TryFrom<u8> for VoltageUnit {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Volts),
            1 => Ok(Self::DeciVolts),
            2 => Ok(Self::CentiVolts),
            3 => Ok(Self::MilliVolts),
            _ => Err(format!("invalid voltage unit code {code}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AmperageUnit {
    #[default]
    Amps,
    MilliAmps,
}

impl AmperageUnit {
    pub fn to_amps(self, value: f64) -> f64 {
        match self {
            Self::Amps => value,
            Self::MilliAmps => value / 1000.0,
        }
    }
}

impl From<AmperageUnit> for u8 {
    fn from(unit: AmperageUnit) -> u8 {
        match unit {
            AmperageUnit::Amps => 0,
            AmperageUnit::MilliAmps => 1,
        }
    }
}

impl TryFrom<u8> for AmperageUnit {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Amps),
            1 => Ok(Self::MilliAmps),
            _ => Err(format!("invalid amperage unit code {code}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum WattageUnit {
    #[default]
    Watts,
    MilliWatts,
    KiloWatts,
}

impl WattageUnit {
    pub fn to_watts(self, value: f64) -> f64 {
        match self {
            Self::Watts => value,
            Self::MilliWatts => value / 1000.0,
            Self::KiloWatts => value * 1000.0,
        }
    }
}

impl From<WattageUnit> for u8 {
    fn from(unit: WattageUnit) -> u8 {
        match unit {
            WattageUnit::Watts => 0,
            WattageUnit::MilliWatts => 1,
            WattageUnit::KiloWatts => 2,
        }
    }
}

impl TryFrom<u8> for WattageUnit {
    type Error = String;
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Watts),
            1 => Ok(Self::MilliWatts),
            2 => Ok(Self::KiloWatts),
            _ => Err(format!("invalid wattage unit code {code}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_conversions() {
        assert_eq!(VoltageUnit::Volts.to_volts(48.2), 48.2);
        assert_eq!(VoltageUnit::DeciVolts.to_volts(482.0), 48.2);
        assert_eq!(VoltageUnit::CentiVolts.to_volts(4820.0), 48.2);
        assert_eq!(VoltageUnit::MilliVolts.to_volts(48200.0), 48.2);
    }

    #[test]
    fn amperage_conversions() {
        assert_eq!(AmperageUnit::Amps.to_amps(12.5), 12.5);
        assert_eq!(AmperageUnit::MilliAmps.to_amps(12500.0), 12.5);
    }

    #[test]
    fn wattage_conversions() {
        assert_eq!(WattageUnit::Watts.to_watts(250.0), 250.0);
        assert_eq!(WattageUnit::MilliWatts.to_watts(250_000.0), 250.0);
        assert_eq!(WattageUnit::KiloWatts.to_watts(0.25), 250.0);
    }

    #[test]
    fn wire_codes_roundtrip() {
        assert_eq!(serde_json::to_string(&VoltageUnit::MilliVolts).unwrap(), "3");
        assert_eq!(serde_json::from_str::<VoltageUnit>("1").unwrap(), VoltageUnit::DeciVolts);
        assert_eq!(serde_json::to_string(&AmperageUnit::MilliAmps).unwrap(), "1");
        assert_eq!(serde_json::to_string(&WattageUnit::KiloWatts).unwrap(), "2");
        assert!(serde_json::from_str::<WattageUnit>("7").is_err());
    }
}
