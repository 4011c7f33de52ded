// Config sections (stored in SQLITE_STORE)
pub const BATTERY: &str = "battery";
pub const SOLAR_CHARGER: &str = "solarcharger";
