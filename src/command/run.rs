use std::env;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Result};
use backoff::backoff::Backoff;
use chrono::Utc;
use rumqttc::{Client, Event, Packet, QoS};

use crate::battery::{self, mqtt::MqttBattery, zendure::ZendureBattery, BatteryStats};
use crate::config::{self, BatteryProvider, SolarChargerProvider};
use crate::constants::{defaults, envvars, topics};
use crate::data_mgmt::livedata::{self, PowerLimiterState};
use crate::helpers::{reconnect_backoff, suntime};
use crate::interfaces::cfgdb::CfgDbRW;
use crate::interfaces::{dbpath, mqtt};
use crate::solar_charger::{
    mqtt::MqttCharger, vedirect, victron, victron::VictronCharger, ChargerStats,
};

enum InEvent {
    Mqtt(mqtt::MqttMessage),
    Frame(vedirect::MpptFrame),
}

/// Long-running service: dispatches MQTT traffic and VE.Direct frames to
/// the configured providers, drives their periodic work, and publishes
/// live data and the effective discharge current limit.
pub fn run() -> Result<()> {
    let db = CfgDbRW::open(dbpath::SQLITE_STORE.as_path())?;
    let cfg = config::load(&db)?;

    let mut mqtt_battery: Option<MqttBattery> = None;
    let mut zendure: Option<ZendureBattery> = None;
    if cfg.battery.enabled {
        match cfg.battery.provider {
            BatteryProvider::Mqtt => {
                mqtt_battery = Some(MqttBattery::new(cfg.battery.clone()));
            }
            BatteryProvider::ZendureMqtt => {
                zendure = Some(ZendureBattery::new(
                    cfg.battery.zendure.clone(),
                    cfg.battery.verbose_logging,
                )?);
            }
            other => {
                return Err(anyhow!(
                    "battery provider {:?} needs a hardware interface this node does not have",
                    other
                ))
            }
        }
    }

    let (tx, rx) = flume::unbounded::<InEvent>();

    let mut victron_charger: Option<VictronCharger> = None;
    let mut mqtt_charger: Option<MqttCharger> = None;
    if cfg.solar_charger.enabled {
        match cfg.solar_charger.provider {
            SolarChargerProvider::VeDirect => {
                victron_charger = Some(VictronCharger::new(cfg.solar_charger.verbose_logging));
                spawn_vedirect_readers(&tx);
            }
            SolarChargerProvider::Mqtt => {
                mqtt_charger = Some(MqttCharger::new(
                    cfg.solar_charger.mqtt.clone(),
                    cfg.solar_charger.verbose_logging,
                )?);
            }
        }
    }

    let (mut client, mut connection) = mqtt::client_conn(
        mqtt::get_rand_client_id(Some("powernode".into())),
        None,
    );

    let mut subscriptions = Vec::new();
    if let Some(b) = &mqtt_battery {
        subscriptions.extend(b.subscriptions());
    }
    if let Some(z) = &zendure {
        subscriptions.extend(z.subscriptions());
    }
    if let Some(c) = &mqtt_charger {
        subscriptions.extend(c.subscriptions());
    }
    for topic in subscriptions {
        log::info!("Subscribing to {topic}");
        client.subscribe(topic, QoS::AtLeastOnce)?;
    }

    let tx_mqtt = tx.clone();
    thread::spawn(move || {
        // rumqttc reconnects on the next iteration; consecutive failures
        // back off exponentially, and any successful event resets the delay
        let mut reconnect = reconnect_backoff();
        for notification in connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    reconnect.reset();
                    match String::from_utf8(publish.payload.to_vec()) {
                        Ok(payload) => {
                            let msg = mqtt::MqttMessage::new(publish.topic, payload);
                            if tx_mqtt.send(InEvent::Mqtt(msg)).is_err() {
                                return;
                            }
                        }
                        Err(e) => log::warn!("Dropping non-UTF-8 MQTT payload: {e}"),
                    }
                }
                Ok(_) => reconnect.reset(),
                Err(e) => {
                    log::error!("MQTT connection error: {e}");
                    if let Some(delay) = reconnect.next_backoff() {
                        thread::sleep(delay);
                    }
                }
            }
        }
    });

    let mut last_publish = Instant::now();
    let mut last_full_publish: Option<Instant> = None;
    let mut last_limit: Option<Option<f64>> = None;

    loop {
        match rx.recv_timeout(defaults::DISPATCH_POLL_INTERVAL) {
            Ok(InEvent::Mqtt(msg)) => {
                let mut out = Vec::new();
                if let Some(b) = mqtt_battery.as_mut() {
                    b.handle_message(&msg.topic, &msg.payload);
                }
                if let Some(z) = zendure.as_mut() {
                    z.handle_message(&msg.topic, &msg.payload, &mut out);
                }
                if let Some(c) = mqtt_charger.as_mut() {
                    c.handle_message(&msg.topic, &msg.payload);
                }
                publish_all(&mut client, out)?;
            }
            Ok(InEvent::Frame(frame)) => {
                if let Some(v) = victron_charger.as_mut() {
                    v.apply_frame(frame);
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => (),
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }

        let now = Utc::now();
        if let Some(z) = zendure.as_mut() {
            let mut out = Vec::new();
            z.tick(now, suntime::today(now), &mut out);
            publish_all(&mut client, out)?;
        }

        let battery_stats: Option<&BatteryStats> = mqtt_battery
            .as_ref()
            .map(|b| &b.stats)
            .or(zendure.as_ref().map(|z| &z.stats));
        if let Some(stats) = battery_stats {
            let limit = battery::max_discharge_current_limit(&cfg.battery, stats, false);
            if last_limit != Some(limit) {
                let payload = match limit {
                    Some(amps) => format!("{amps:.1}"),
                    None => "null".to_string(),
                };
                client.publish(
                    topics::BATTERY_DISCHARGE_CURRENT_LIMIT,
                    QoS::AtLeastOnce,
                    false,
                    payload.as_bytes(),
                )?;
                last_limit = Some(limit);
            }
        }

        let charger: Option<&dyn ChargerStats> = match (&victron_charger, &mqtt_charger) {
            (Some(v), _) => Some(v),
            (None, Some(m)) => Some(m),
            (None, None) => None,
        };
        if let Some(charger) = charger {
            if last_publish.elapsed() >= defaults::LIVEDATA_PUBLISH_INTERVAL {
                let full = last_full_publish
                    .map_or(true, |t| t.elapsed() >= defaults::LIVEDATA_FULL_INTERVAL);
                let data = livedata::solar_charger_live_data(
                    charger,
                    PowerLimiterState::default(),
                    full,
                    last_publish.elapsed(),
                );
                let has_updates = !data.solarcharger.instances.is_empty();
                if full || has_updates || !cfg.solar_charger.publish_updates_only {
                    client.publish(
                        topics::LIVEDATA_SOLAR_CHARGER,
                        QoS::AtLeastOnce,
                        false,
                        serde_json::to_string(&data)?.as_bytes(),
                    )?;
                    last_publish = Instant::now();
                    if full {
                        last_full_publish = Some(last_publish);
                    }
                }
            }
        }
    }
    Ok(())
}

fn spawn_vedirect_readers(tx: &flume::Sender<InEvent>) {
    let devices: Vec<String> = env::var(envvars::VEDIRECT_DEVICES)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if devices.is_empty() {
        log::warn!(
            "VE.Direct provider selected but no devices set in {}",
            envvars::VEDIRECT_DEVICES
        );
    }
    for device in devices {
        let tx = tx.clone();
        thread::spawn(move || {
            victron::read_device(&device, |frame| {
                let _ = tx.send(InEvent::Frame(frame));
            });
        });
    }
}

fn publish_all(client: &mut Client, messages: Vec<mqtt::MqttMessage>) -> Result<()> {
    for msg in messages {
        log::debug!("Publishing to {}: {}", msg.topic, msg.payload);
        client.publish(msg.topic, QoS::AtLeastOnce, false, msg.payload.as_bytes())?;
    }
    Ok(())
}
