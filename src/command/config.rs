use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::argsets::{ConfigGetArgs, ConfigSetArgs};
use crate::config::{BatteryConfig, SolarChargerConfig};
use crate::constants::keys;
use crate::interfaces::cfgdb::{CfgDbRO, CfgDbRW};
use crate::interfaces::dbpath;

fn section_json<T: Serialize + DeserializeOwned + Default>(section: &str) -> Result<String> {
    // A store that was never written to just yields the defaults
    let cfg: T = if dbpath::SQLITE_STORE.exists() {
        CfgDbRO::open(dbpath::SQLITE_STORE.as_path())?
            .get(section)?
            .unwrap_or_default()
    } else {
        T::default()
    };
    Ok(serde_json::to_string_pretty(&cfg)?)
}

pub fn config_get(args: ConfigGetArgs) -> Result<()> {
    let json = match args.section.as_str() {
        keys::BATTERY => section_json::<BatteryConfig>(keys::BATTERY)?,
        keys::SOLAR_CHARGER => section_json::<SolarChargerConfig>(keys::SOLAR_CHARGER)?,
        other => {
            return Err(anyhow!(
                "Unknown config section '{other}'; expected '{}' or '{}'",
                keys::BATTERY,
                keys::SOLAR_CHARGER
            ))
        }
    };
    print!("{json}");
    Ok(())
}

pub fn config_set(args: ConfigSetArgs) -> Result<()> {
    let db = CfgDbRW::open(dbpath::SQLITE_STORE.as_path())?;
    match args.section.as_str() {
        keys::BATTERY => {
            let cfg: BatteryConfig = serde_json::from_str(&args.value)?;
            cfg.validate()?;
            db.set(keys::BATTERY, &cfg)?;
        }
        keys::SOLAR_CHARGER => {
            let cfg: SolarChargerConfig = serde_json::from_str(&args.value)?;
            cfg.validate()?;
            db.set(keys::SOLAR_CHARGER, &cfg)?;
        }
        other => {
            return Err(anyhow!(
                "Unknown config section '{other}'; expected '{}' or '{}'",
                keys::BATTERY,
                keys::SOLAR_CHARGER
            ))
        }
    }
    Ok(())
}
