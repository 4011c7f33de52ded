//! VE.Direct text protocol: frames of `<label>\t<value>` lines, each frame
//! terminated by a `Checksum` field whose value byte makes the sum of all
//! frame bytes come out to 0 mod 256.

use std::collections::HashMap;

/// One verified text frame, as raw label/value pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextFrame {
    pub fields: Vec<(String, String)>,
}

impl TextFrame {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum ReaderState {
    #[default]
    Idle,
    Label,
    Value,
    Checksum,
    // ':'-prefixed hex-protocol records interleave with text frames and
    // are skipped wholesale
    HexRecord,
}

/// Incremental frame reader. Feed it bytes as they arrive on the serial
/// line; complete, checksum-verified frames come back out.
#[derive(Debug, Default)]
pub struct FrameReader {
    state: ReaderState,
    checksum: u8,
    label: Vec<u8>,
    value: Vec<u8>,
    fields: Vec<(String, String)>,
}

impl FrameReader {
    pub fn push(&mut self, byte: u8) -> Option<TextFrame> {
        if self.state == ReaderState::HexRecord {
            if byte == b'\n' {
                self.state = ReaderState::Idle;
            }
            return None;
        }
        // the checksum byte may itself be b':', so only a ':' outside a
        // value or checksum position starts a hex record
        if byte == b':'
            && !matches!(self.state, ReaderState::Value | ReaderState::Checksum)
        {
            self.state = ReaderState::HexRecord;
            return None;
        }

        self.checksum = self.checksum.wrapping_add(byte);
        match self.state {
            ReaderState::Idle => {
                // sync to the next frame boundary
                if byte == b'\r' || byte == b'\n' {
                    self.state = ReaderState::Label;
                }
            }
            ReaderState::Label => match byte {
                b'\t' => {
                    if self.label == b"Checksum" {
                        self.state = ReaderState::Checksum;
                    } else {
                        self.state = ReaderState::Value;
                    }
                }
                b'\r' | b'\n' => self.label.clear(),
                _ => self.label.push(byte),
            },
            ReaderState::Value => match byte {
                b'\r' => (),
                b'\n' => {
                    self.finish_field();
                    self.state = ReaderState::Label;
                }
                _ => self.value.push(byte),
            },
            ReaderState::Checksum => {
                let valid = self.checksum == 0;
                let frame = if valid {
                    Some(TextFrame {
                        fields: std::mem::take(&mut self.fields),
                    })
                } else {
                    log::warn!("Dropping VE.Direct frame with bad checksum");
                    None
                };
                self.reset();
                return frame;
            }
            ReaderState::HexRecord => unreachable!(),
        }
        None
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<TextFrame> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    fn finish_field(&mut self) {
        let label = String::from_utf8_lossy(&self.label).into_owned();
        let value = String::from_utf8_lossy(&self.value).into_owned();
        self.label.clear();
        self.value.clear();
        if !label.is_empty() {
            self.fields.push((label, value));
        }
    }

    fn reset(&mut self) {
        self.state = ReaderState::Idle;
        self.checksum = 0;
        self.label.clear();
        self.value.clear();
        self.fields.clear();
    }
}

/// Typed view of an MPPT charge controller's text frame. Raw units follow
/// the protocol (mV, mA, 0.01 kWh); accessors convert to SI.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MpptFrame {
    pub serial: Option<String>,
    pub product_id: Option<u16>,
    pub firmware: Option<String>,
    pub firmware_ext: Option<String>,
    pub battery_voltage_mv: Option<i32>,
    pub battery_current_ma: Option<i32>,
    pub panel_voltage_mv: Option<i32>,
    pub panel_power_w: Option<i32>,
    pub operation_state: Option<u8>,
    pub mppt_mode: Option<u8>,
    pub error_code: Option<u8>,
    pub off_reason: Option<u32>,
    pub day_sequence: Option<u16>,
    pub yield_total_wh: Option<i64>,
    pub yield_today_wh: Option<i64>,
    pub max_power_today_w: Option<i32>,
    pub yield_yesterday_wh: Option<i64>,
    pub max_power_yesterday_w: Option<i32>,
    pub load_output_on: Option<bool>,
    pub load_current_ma: Option<i32>,
}

impl MpptFrame {
    pub fn parse(frame: &TextFrame) -> Self {
        let mut out = Self::default();
        for (label, value) in &frame.fields {
            match label.as_str() {
                "SER#" => out.serial = Some(value.clone()),
                "PID" => out.product_id = parse_hex(value).map(|v| v as u16),
                "FW" => out.firmware = Some(value.clone()),
                "FWE" => out.firmware_ext = Some(value.clone()),
                "V" => out.battery_voltage_mv = value.parse().ok(),
                "I" => out.battery_current_ma = value.parse().ok(),
                "VPV" => out.panel_voltage_mv = value.parse().ok(),
                "PPV" => out.panel_power_w = value.parse().ok(),
                "CS" => out.operation_state = value.parse().ok(),
                "MPPT" => out.mppt_mode = value.parse().ok(),
                "ERR" => out.error_code = value.parse().ok(),
                "OR" => out.off_reason = parse_hex(value),
                "HSDS" => out.day_sequence = value.parse().ok(),
                // yields come in 0.01 kWh resolution
                "H19" => out.yield_total_wh = value.parse::<i64>().ok().map(|v| v * 10),
                "H20" => out.yield_today_wh = value.parse::<i64>().ok().map(|v| v * 10),
                "H21" => out.max_power_today_w = value.parse().ok(),
                "H22" => out.yield_yesterday_wh = value.parse::<i64>().ok().map(|v| v * 10),
                "H23" => out.max_power_yesterday_w = value.parse().ok(),
                "LOAD" => out.load_output_on = Some(value == "ON"),
                "IL" => out.load_current_ma = value.parse().ok(),
                other => log::trace!("Unhandled VE.Direct field {other}"),
            }
        }
        out
    }

    pub fn battery_voltage(&self) -> Option<f64> {
        self.battery_voltage_mv.map(|v| v as f64 / 1000.0)
    }

    pub fn battery_current(&self) -> Option<f64> {
        self.battery_current_ma.map(|v| v as f64 / 1000.0)
    }

    pub fn panel_voltage(&self) -> Option<f64> {
        self.panel_voltage_mv.map(|v| v as f64 / 1000.0)
    }

    pub fn panel_power(&self) -> Option<f64> {
        self.panel_power_w.map(|v| v as f64)
    }

    pub fn load_current(&self) -> Option<f64> {
        self.load_current_ma.map(|v| v as f64 / 1000.0)
    }

    /// Power delivered to the battery, in W.
    pub fn output_power(&self) -> Option<f64> {
        Some(self.battery_voltage()? * self.battery_current()?)
    }

    pub fn product_name(&self) -> &'static str {
        self.product_id.map_or("???", pid_name)
    }

    pub fn firmware_version(&self) -> String {
        format_firmware(
            self.firmware.as_deref().unwrap_or(""),
            self.firmware_ext.as_deref().unwrap_or(""),
        )
    }

    pub fn operation_state_name(&self) -> &'static str {
        match self.operation_state {
            Some(0) => "OFF",
            Some(2) => "Fault",
            Some(3) => "Bulk",
            Some(4) => "Absorption",
            Some(5) => "Float",
            Some(7) => "Equalize (manual)",
            Some(245) => "Starting-up",
            Some(247) => "Auto equalize / Recondition",
            Some(252) => "External Control",
            _ => "???",
        }
    }

    pub fn mppt_mode_name(&self) -> &'static str {
        match self.mppt_mode {
            Some(0) => "OFF",
            Some(1) => "Voltage or current limited",
            Some(2) => "MPP Tracker active",
            _ => "???",
        }
    }

    pub fn error_name(&self) -> &'static str {
        match self.error_code {
            Some(0) => "No error",
            Some(2) => "Battery voltage too high",
            Some(17) => "Charger temperature too high",
            Some(18) => "Charger over current",
            Some(19) => "Current flow reversed",
            Some(20) => "Bulk time limit exceeded",
            Some(21) => "Current sensor issue",
            Some(26) => "Terminals overheated",
            Some(28) => "Converter issue",
            Some(33) => "Input voltage too high (solar panel)",
            Some(34) => "Input current too high (solar panel)",
            Some(38) => "Input shutdown (excessive battery voltage)",
            Some(39) => "Input shutdown (current flow during off mode)",
            Some(65) => "Lost communication with one of devices",
            Some(66) => "Synchronised charging device configuration issue",
            Some(67) => "BMS connection lost",
            Some(68) => "Network misconfigured",
            Some(116) => "Factory calibration data lost",
            Some(117) => "Invalid/incompatible firmware",
            Some(119) => "User settings invalid",
            _ => "???",
        }
    }

    pub fn off_reason_name(&self) -> &'static str {
        match self.off_reason {
            Some(0x0000_0000) => "Not off",
            Some(0x0000_0001) => "No input power",
            Some(0x0000_0002) => "Switched off (power switch)",
            Some(0x0000_0004) => "Switched off (device mode register)",
            Some(0x0000_0008) => "Remote input",
            Some(0x0000_0010) => "Protection active",
            Some(0x0000_0020) => "Paygo",
            Some(0x0000_0040) => "BMS",
            Some(0x0000_0080) => "Engine shutdown detection",
            Some(0x0000_0100) => "Analysing input voltage",
            _ => "???",
        }
    }
}

fn parse_hex(value: &str) -> Option<u32> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    // left-pad to full bytes for the hex crate
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(padded).ok()?;
    let mut out = 0u32;
    for b in bytes {
        out = out.checked_mul(256)? + b as u32;
    }
    Some(out)
}

/// Human-readable firmware version from the `FW`/`FWE` fields. `FWE` wins
/// when present; its trailing "FF" marks a released build, anything else a
/// beta. A leading non-digit in the version is a release candidate mark.
pub fn format_firmware(fw: &str, fwe: &str) -> String {
    let (raw, beta) = if !fwe.is_empty() && fwe.len() > 2 {
        let (num, tail) = fwe.split_at(fwe.len() - 2);
        if tail == "FF" {
            (num, None)
        } else {
            (num, Some(tail))
        }
    } else {
        (fw, None)
    };
    if raw.is_empty() {
        return "n/a".to_string();
    }

    let (rc, digits) = match raw.chars().next() {
        Some(c) if !c.is_ascii_digit() => (Some(c), &raw[1..]),
        _ => (None, raw),
    };
    let mut version = if digits.len() > 2 {
        format!("{}.{}", &digits[..digits.len() - 2], &digits[digits.len() - 2..])
    } else if digits.len() == 2 {
        format!("{}.{}", &digits[..1], &digits[1..])
    } else {
        digits.to_string()
    };
    if let Some(c) = rc {
        version.push_str(&format!("-rc-{c}"));
    }
    if let Some(b) = beta {
        version.push_str(&format!("-beta-{b}"));
    }
    version
}

pub fn pid_name(pid: u16) -> &'static str {
    static NAMES: once_cell::sync::Lazy<HashMap<u16, &'static str>> =
        once_cell::sync::Lazy::new(|| {
            HashMap::from([
                (0xA042, "BlueSolar MPPT 75|15"),
                (0xA043, "BlueSolar MPPT 100|15"),
                (0xA044, "BlueSolar MPPT 150|35"),
                (0xA046, "BlueSolar MPPT 150|70"),
                (0xA047, "BlueSolar MPPT 150|100"),
                (0xA050, "SmartSolar MPPT 250|100"),
                (0xA051, "SmartSolar MPPT 150|100"),
                (0xA052, "SmartSolar MPPT 150|85"),
                (0xA053, "SmartSolar MPPT 75|15"),
                (0xA054, "SmartSolar MPPT 75|10"),
                (0xA055, "SmartSolar MPPT 100|15"),
                (0xA056, "SmartSolar MPPT 100|30"),
                (0xA057, "SmartSolar MPPT 100|50"),
                (0xA058, "SmartSolar MPPT 150|35"),
                (0xA059, "SmartSolar MPPT 150|100 rev2"),
                (0xA05A, "SmartSolar MPPT 150|85 rev2"),
                (0xA05F, "SmartSolar MPPT 100|20"),
                (0xA060, "SmartSolar MPPT 100|20 48V"),
                (0xA075, "SmartSolar MPPT RS 450|200 MC4"),
            ])
        });
    NAMES.get(&pid).copied().unwrap_or("???")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a protocol-correct frame from label/value pairs, computing
    /// the checksum byte the way the device would.
    fn build_frame(fields: &[(&str, &str)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (label, value) in fields {
            bytes.extend_from_slice(b"\r\n");
            bytes.extend_from_slice(label.as_bytes());
            bytes.push(b'\t');
            bytes.extend_from_slice(value.as_bytes());
        }
        bytes.extend_from_slice(b"\r\nChecksum\t");
        let sum: u8 = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        bytes.push(0u8.wrapping_sub(sum));
        bytes
    }

    fn sample_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PID", "0xA060"),
            ("FW", "159"),
            ("SER#", "HQ2132QWERT"),
            ("V", "26810"),
            ("I", "4400"),
            ("VPV", "75360"),
            ("PPV", "118"),
            ("CS", "3"),
            ("MPPT", "2"),
            ("OR", "0x00000000"),
            ("ERR", "0"),
            ("LOAD", "ON"),
            ("IL", "300"),
            ("H19", "1720"),
            ("H20", "83"),
            ("H21", "325"),
            ("H22", "45"),
            ("H23", "94"),
            ("HSDS", "24"),
        ]
    }

    #[test]
    fn parses_a_well_formed_frame() {
        let mut reader = FrameReader::default();
        let frames = reader.push_bytes(&build_frame(&sample_fields()));
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.get("V"), Some("26810"));
        assert_eq!(frame.get("LOAD"), Some("ON"));
        assert_eq!(frame.get("missing"), None);
    }

    #[test]
    fn rejects_a_corrupted_frame() {
        let mut reader = FrameReader::default();
        let mut bytes = build_frame(&sample_fields());
        bytes[10] ^= 0xFF;
        assert!(reader.push_bytes(&bytes).is_empty());
        // and recovers on the next good frame
        let frames = reader.push_bytes(&build_frame(&sample_fields()));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn resyncs_when_joining_mid_frame() {
        let mut reader = FrameReader::default();
        let bytes = build_frame(&sample_fields());
        // drop the first half of a frame, then feed two complete ones
        let mut stream = bytes[bytes.len() / 2..].to_vec();
        stream.extend_from_slice(&bytes);
        stream.extend_from_slice(&bytes);
        let frames = reader.push_bytes(&stream);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn skips_interleaved_hex_records() {
        let mut reader = FrameReader::default();
        let mut stream = b":A501000000B4\n".to_vec();
        stream.extend_from_slice(&build_frame(&sample_fields()));
        let frames = reader.push_bytes(&stream);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn typed_frame_conversions() {
        let mut reader = FrameReader::default();
        let frames = reader.push_bytes(&build_frame(&sample_fields()));
        let mppt = MpptFrame::parse(&frames[0]);

        assert_eq!(mppt.serial.as_deref(), Some("HQ2132QWERT"));
        assert_eq!(mppt.product_id, Some(0xA060));
        assert_eq!(mppt.product_name(), "SmartSolar MPPT 100|20 48V");
        assert_eq!(mppt.battery_voltage(), Some(26.81));
        assert_eq!(mppt.battery_current(), Some(4.4));
        assert_eq!(mppt.panel_power(), Some(118.0));
        let output = mppt.output_power().unwrap();
        assert!((output - 117.964).abs() < 1e-9);
        assert_eq!(mppt.yield_total_wh, Some(17200));
        assert_eq!(mppt.yield_today_wh, Some(830));
        assert_eq!(mppt.load_output_on, Some(true));
        assert_eq!(mppt.operation_state_name(), "Bulk");
        assert_eq!(mppt.mppt_mode_name(), "MPP Tracker active");
        assert_eq!(mppt.error_name(), "No error");
        assert_eq!(mppt.off_reason_name(), "Not off");
    }

    #[test]
    fn unknown_product_id() {
        let frame = MpptFrame {
            product_id: Some(0x1234),
            ..Default::default()
        };
        assert_eq!(frame.product_name(), "???");
        assert_eq!(MpptFrame::default().product_name(), "???");
    }

    #[test]
    fn firmware_formatting() {
        assert_eq!(format_firmware("159", ""), "1.59");
        assert_eq!(format_firmware("", ""), "n/a");
        // leading non-digit marks a release candidate
        assert_eq!(format_firmware("C208", ""), "2.08-rc-C");
        // FWE takes precedence; trailing FF means released
        assert_eq!(format_firmware("159", "208FF"), "2.08");
        assert_eq!(format_firmware("159", "20804"), "2.08-beta-04");
    }
}
