pub const BATTERY_FULL: &str = r#"
{
    "enabled": true,
    "verbose_logging": false,
    "provider": 2,
    "jkbms_interface": 1,
    "jkbms_polling_interval": 5,
    "mqtt_soc_topic": "bms/BAT/soc",
    "mqtt_soc_json_path": "value",
    "mqtt_voltage_topic": "bms/BAT/voltage",
    "mqtt_voltage_json_path": "value",
    "mqtt_voltage_unit": 3,
    "enable_discharge_current_limit": true,
    "discharge_current_limit": 40.5,
    "discharge_current_limit_below_soc": 50,
    "discharge_current_limit_below_voltage": 48.2,
    "use_battery_reported_discharge_current_limit": true,
    "mqtt_discharge_current_topic": "bms/BAT/max_discharge",
    "mqtt_discharge_current_json_path": "",
    "mqtt_amperage_unit": 1,
    "zendure": {
        "device_type": 1,
        "device_id": "gyhMNoQm",
        "polling_interval": 30,
        "soc_min": 15,
        "soc_max": 90,
        "bypass_mode": 2,
        "max_output": 600,
        "auto_shutdown": true,
        "output_limit": 450,
        "output_control": 2,
        "output_limit_day": 350,
        "output_limit_night": 75,
        "sunrise_offset": 30,
        "sunset_offset": -45,
        "charge_through_enable": true,
        "charge_through_interval": 120
    }
}
"#;

pub const SOLAR_CHARGER_FULL: &str = r#"
{
    "enabled": true,
    "verbose_logging": true,
    "provider": 1,
    "publish_updates_only": true,
    "mqtt": {
        "calculate_output_power": true,
        "power_topic": "",
        "power_path": "",
        "power_unit": 2,
        "voltage_topic": "victron/battery/voltage",
        "voltage_path": "value",
        "voltage_unit": 0,
        "current_topic": "victron/battery/current",
        "current_path": "value",
        "current_unit": 0
    }
}
"#;

pub const BATTERY_BAD_PROVIDER: &str = r#"{ "provider": 42 }"#;
