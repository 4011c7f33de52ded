pub const DATA_DIR: &str = "PN_DATA_DIR";
pub const ROOT_DIR: &str = "PN_ROOT_DIR";

pub const SNAP: &str = "SNAP";
pub const SNAP_COMMON: &str = "SNAP_COMMON";

pub const LOG_LEVEL: &str = "LOGGING_LEVEL";

pub const MQTT_BRIDGE_HOST: &str = "MQTT_BRIDGE_HOST";
pub const MQTT_BRIDGE_PORT: &str = "MQTT_BRIDGE_PORT";

pub const LATITUDE: &str = "PN_LATITUDE";
pub const LONGITUDE: &str = "PN_LONGITUDE";

// Comma-separated list of VE.Direct serial device paths
pub const VEDIRECT_DEVICES: &str = "PN_VEDIRECT_DEVICES";
