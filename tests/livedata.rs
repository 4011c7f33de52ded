use std::collections::HashMap;

use powernode::data_mgmt::livedata::{
    MetricValue, SolarChargerInstance, SolarChargerLiveData, SolarChargerSummary, ValueObject,
};

fn sample_payload() -> SolarChargerLiveData {
    let mut values = HashMap::new();
    values.insert(
        "P".to_string(),
        vec![MetricValue::from(ValueObject::new(117.96, "W", 0))],
    );
    values.insert(
        "CS".to_string(),
        // a mixed sequence: string first, then a measurement
        vec![
            MetricValue::from("Bulk"),
            MetricValue::from(ValueObject::new(3.0, "", 0)),
        ],
    );
    let mut instances = HashMap::new();
    instances.insert(
        "HQ2132QWERT".to_string(),
        SolarChargerInstance {
            data_age_ms: 420,
            product_id: "SmartSolar MPPT 100|20 48V".to_string(),
            firmware_version: "1.59".to_string(),
            values,
        },
    );
    instances.insert(
        "MQTT".to_string(),
        SolarChargerInstance {
            data_age_ms: 1200,
            product_id: "MQTT".to_string(),
            firmware_version: "n/a".to_string(),
            values: HashMap::new(),
        },
    );

    SolarChargerLiveData {
        dpl: Default::default(),
        solarcharger: SolarChargerSummary {
            full_update: true,
            instances,
        },
    }
}

#[test]
fn payload_roundtrip() {
    let payload = sample_payload();
    let json = serde_json::to_string(&payload).unwrap();
    let back: SolarChargerLiveData = serde_json::from_str(&json).unwrap();
    assert_eq!(back, payload);
}

#[test]
fn wire_field_names() {
    let json = serde_json::to_value(sample_payload()).unwrap();
    assert_eq!(json["dpl"]["PLSTATE"], -1);
    assert_eq!(json["dpl"]["PLLIMIT"], 0);
    assert_eq!(json["solarcharger"]["full_update"], true);
    let instance = &json["solarcharger"]["instances"]["HQ2132QWERT"];
    assert_eq!(instance["data_age_ms"], 420);
    assert_eq!(instance["product_id"], "SmartSolar MPPT 100|20 48V");
    assert_eq!(instance["firmware_version"], "1.59");
    assert_eq!(instance["values"]["P"][0]["v"], 117.96);
    assert_eq!(instance["values"]["P"][0]["u"], "W");
    assert_eq!(instance["values"]["P"][0]["d"], 0);
    // mixed sequence keeps its order and element kinds
    assert_eq!(instance["values"]["CS"][0], "Bulk");
    assert!(instance["values"]["CS"][1].is_object());
}

#[test]
fn instance_keys_are_unique() {
    let payload = sample_payload();
    let json = serde_json::to_string(&payload).unwrap();
    let back: SolarChargerLiveData = serde_json::from_str(&json).unwrap();
    assert_eq!(back.solarcharger.instances.len(), 2);
    // a duplicate key in the JSON text collapses to a single entry
    let dup = r#"{"dpl": {"PLSTATE": -1, "PLLIMIT": 0}, "solarcharger": {"full_update": false,
        "instances": {
            "A": {"data_age_ms": 1, "product_id": "x", "firmware_version": "1.0", "values": {}},
            "A": {"data_age_ms": 2, "product_id": "y", "firmware_version": "1.0", "values": {}}
        }}}"#;
    let parsed: SolarChargerLiveData = serde_json::from_str(dup).unwrap();
    assert_eq!(parsed.solarcharger.instances.len(), 1);
}

#[test]
fn mixed_kinds_accepted_at_any_position() {
    let json = r#"[{"v": 1.5, "u": "A", "d": 2}, "OFF", {"v": 0.0, "u": "W", "d": 0}, "???"]"#;
    let seq: Vec<MetricValue> = serde_json::from_str(json).unwrap();
    assert_eq!(seq.len(), 4);
    assert!(matches!(seq[0], MetricValue::Measurement(_)));
    assert!(matches!(seq[1], MetricValue::Text(_)));
    assert!(matches!(seq[3], MetricValue::Text(_)));
}
