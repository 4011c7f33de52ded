pub const LIVEDATA_SOLAR_CHARGER: &str = "u/livedata/solarcharger";
pub const BATTERY_DISCHARGE_CURRENT_LIMIT: &str = "u/battery/discharge_current_limit";
