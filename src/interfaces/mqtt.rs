use std::env;

use once_cell::sync::Lazy;
use rumqttc::{Client, Connection, MqttOptions};

use crate::constants::{defaults, envvars};

static MQTT_BRIDGE_HOST: Lazy<String> = Lazy::new(|| {
    if let Ok(host) = env::var(envvars::MQTT_BRIDGE_HOST) {
        return host;
    }
    defaults::MQTT_BRIDGE_HOST.to_string()
});

static MQTT_BRIDGE_PORT: Lazy<u16> = Lazy::new(|| {
    env::var(envvars::MQTT_BRIDGE_PORT)
        .ok()
        .and_then(|port_str| port_str.parse::<u16>().ok())
        .unwrap_or(defaults::MQTT_BRIDGE_PORT)
});

#[derive(Clone, Debug)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

impl MqttMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

pub fn get_rand_client_id(prefix: Option<String>) -> String {
    const RAND_ID_BYTES: usize = 3;
    let rand: [u8; RAND_ID_BYTES] = rand::random();
    let randhex = hex::encode(rand);

    if let Some(pref) = prefix {
        format!("{pref}-{randhex}")
    } else {
        randhex
    }
}

pub fn client_conn(client_id: String, clean_session: Option<bool>) -> (Client, Connection) {
    let host = MQTT_BRIDGE_HOST.clone();
    let port = *MQTT_BRIDGE_PORT;
    log::info!("Establishing MQTT connection to {host}:{port} as {client_id}");

    let mut mqttoptions = MqttOptions::new(client_id, host, port);
    mqttoptions.set_clean_session(clean_session.unwrap_or(true));

    Client::new(mqttoptions, 10)
}
