use std::time::Duration;

pub const LOG_LEVEL: &str = "info";

pub const MQTT_BRIDGE_HOST: &str = "localhost";
pub const MQTT_BRIDGE_PORT: u16 = 1883;

// Live data is published at most once per second; a snapshot with all
// instances goes out at least every ten seconds.
pub const LIVEDATA_PUBLISH_INTERVAL: Duration = Duration::from_secs(1);
pub const LIVEDATA_FULL_INTERVAL: Duration = Duration::from_secs(10);

pub const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);
