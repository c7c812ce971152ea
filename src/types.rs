use std::fmt;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Temperature stored as Celsius internally.
/// The vendor transmits every value in Celsius, rounded to one decimal,
/// regardless of the room's display unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn from_fahrenheit(f: f64) -> Self {
        Self((f - 32.0) / 1.8)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0 * 1.8 + 32.0
    }

    /// Round to vendor precision (one decimal place, Celsius).
    pub fn to_vendor_celsius(&self) -> f64 {
        (self.0 * 10.0).round() / 10.0
    }

    /// The two form fields the vendor expects: integer part and the single
    /// fractional digit, as separate values.
    pub fn vendor_fields(&self) -> (String, String) {
        let s = format!("{:.1}", self.to_vendor_celsius());
        let (int_part, frac_part) = s.split_once('.').unwrap_or((&s, "0"));
        (int_part.to_string(), frac_part.to_string())
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegreesUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl DegreesUnit {
    /// Vendor unit flag: `"0"` means Celsius, anything else Fahrenheit.
    /// The placeholder `"N/A"` is treated as Celsius, matching how the
    /// vendor app behaves for rooms that never reported a unit.
    pub fn from_flag(flag: &str) -> Self {
        match flag {
            "0" | "N/A" => DegreesUnit::Celsius,
            _ => DegreesUnit::Fahrenheit,
        }
    }
}

impl fmt::Display for DegreesUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegreesUnit::Celsius => write!(f, "\u{00b0}C"),
            DegreesUnit::Fahrenheit => write!(f, "\u{00b0}F"),
        }
    }
}

/// Vendor work mode. The integers are a closed set; anything outside it is
/// reported as unknown, never coerced to a neighboring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatMode {
    Auto,
    Manual,
    Economy,
    Party,
    Idle,
}

impl ThermostatMode {
    pub fn as_vendor(&self) -> u8 {
        match self {
            ThermostatMode::Auto => 0,
            ThermostatMode::Manual => 1,
            ThermostatMode::Economy => 2,
            ThermostatMode::Party => 3,
            ThermostatMode::Idle => 4,
        }
    }

    pub fn from_vendor(value: i64) -> Option<Self> {
        match value {
            0 => Some(ThermostatMode::Auto),
            1 => Some(ThermostatMode::Manual),
            2 => Some(ThermostatMode::Economy),
            3 => Some(ThermostatMode::Party),
            4 => Some(ThermostatMode::Idle),
            _ => None,
        }
    }
}

/// Platform-facing operation label derived from the vendor work mode.
/// Manual and Party both run on the Comfort setpoint and collapse to the
/// same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    Auto,
    Manual,
    Eco,
    Idle,
    Unknown,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Auto => "auto",
            OperationMode::Manual => "manual",
            OperationMode::Eco => "eco",
            OperationMode::Idle => "idle",
            OperationMode::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "auto" => OperationMode::Auto,
            "manual" => OperationMode::Manual,
            "eco" => OperationMode::Eco,
            "idle" => OperationMode::Idle,
            _ => OperationMode::Unknown,
        }
    }

    pub fn from_vendor(value: i64) -> Self {
        match ThermostatMode::from_vendor(value) {
            Some(ThermostatMode::Auto) => OperationMode::Auto,
            Some(ThermostatMode::Manual) | Some(ThermostatMode::Party) => OperationMode::Manual,
            Some(ThermostatMode::Economy) => OperationMode::Eco,
            Some(ThermostatMode::Idle) => OperationMode::Idle,
            None => OperationMode::Unknown,
        }
    }

    /// Fixed table back to the vendor mode. Unrecognized labels fall back
    /// to Auto; that fallback is part of the adapter contract.
    pub fn to_vendor(&self) -> ThermostatMode {
        match self {
            OperationMode::Auto => ThermostatMode::Auto,
            OperationMode::Manual => ThermostatMode::Manual,
            OperationMode::Eco => ThermostatMode::Economy,
            OperationMode::Idle => ThermostatMode::Idle,
            OperationMode::Unknown => ThermostatMode::Auto,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three setpoint slots. Which one is in effect depends on the
/// work mode and, under Auto, on the weekly program grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointSlot {
    Frost,
    Saving,
    Comfort,
}

impl SetpointSlot {
    /// Program grid labels: 2 selects Comfort, 1 Saving, everything else
    /// frost protection.
    pub fn from_program_label(label: u8) -> Self {
        match label {
            2 => SetpointSlot::Comfort,
            1 => SetpointSlot::Saving,
            _ => SetpointSlot::Frost,
        }
    }
}

/// Authenticated session returned by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(rename = "deviceId", deserialize_with = "de_string")]
    pub device_id: String,
}

/// One row of the room-list response. The vendor pads the list with
/// placeholder rows for unconfigured rooms; those lack an `id` and are
/// filtered out before indexing.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSummary {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub name: Option<String>,
    #[serde(rename = "therId", default, deserialize_with = "de_opt_string")]
    pub ther_id: Option<String>,
    #[serde(rename = "roomMark", default, deserialize_with = "de_opt_string")]
    pub room_mark: Option<String>,
    #[serde(rename = "thModel", default, deserialize_with = "de_opt_string")]
    pub th_model: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub unit: Option<String>,
}

impl RoomSummary {
    pub fn degrees_unit(&self) -> DegreesUnit {
        DegreesUnit::from_flag(self.unit.as_deref().unwrap_or("0"))
    }
}

/// Live state snapshot for one room. Everything except the vendor error
/// flag is optional: the adapter only overwrites what the payload carries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomData {
    #[serde(deserialize_with = "de_i64")]
    pub error: i64,
    #[serde(rename = "tempNow", deserialize_with = "de_opt_f64")]
    pub temp_now: Option<f64>,
    #[serde(rename = "tempSet", deserialize_with = "de_opt_f64")]
    pub temp_set: Option<f64>,
    #[serde(rename = "frostT", deserialize_with = "de_opt_f64")]
    pub frost_t: Option<f64>,
    #[serde(rename = "saveT", deserialize_with = "de_opt_f64")]
    pub save_t: Option<f64>,
    #[serde(rename = "comfT", deserialize_with = "de_opt_f64")]
    pub comf_t: Option<f64>,
    #[serde(deserialize_with = "de_opt_string")]
    pub heating: Option<String>,
    #[serde(deserialize_with = "de_opt_i64")]
    pub mode: Option<i64>,
    #[serde(rename = "tempUnit", deserialize_with = "de_opt_string")]
    pub temp_unit: Option<String>,
    #[serde(rename = "bat", deserialize_with = "de_opt_i64")]
    pub bat: Option<i64>,
    #[serde(rename = "programWeek")]
    pub program_week: Option<ProgramWeek>,
}

impl RoomData {
    pub fn is_heating(&self) -> bool {
        self.heating.as_deref() == Some("1")
    }

    pub fn degrees_unit(&self) -> DegreesUnit {
        DegreesUnit::from_flag(self.temp_unit.as_deref().unwrap_or("0"))
    }

    pub fn battery_low(&self) -> bool {
        self.bat.unwrap_or(0) != 0
    }
}

/// Weekly program grid: 7 day rows (Sunday first) of 48 half-hour slot
/// labels. The shape is validated at the boundary; a grid with the wrong
/// dimensions is a decode error, not a partial value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramWeek(Vec<Vec<u8>>);

impl ProgramWeek {
    pub const DAYS: usize = 7;
    pub const SLOTS_PER_DAY: usize = 48;

    pub fn slot(&self, day: usize, index: usize) -> Option<u8> {
        self.0.get(day).and_then(|row| row.get(index)).copied()
    }
}

impl<'de> Deserialize<'de> for ProgramWeek {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<Vec<SlotLabel>> = Deserialize::deserialize(deserializer)?;
        if raw.len() != Self::DAYS {
            return Err(de::Error::invalid_length(raw.len(), &"7 day rows"));
        }
        let mut days = Vec::with_capacity(Self::DAYS);
        for (day, row) in raw.into_iter().enumerate() {
            if row.len() != Self::SLOTS_PER_DAY {
                return Err(de::Error::custom(format!(
                    "day {day} has {} slots, expected {}",
                    row.len(),
                    Self::SLOTS_PER_DAY
                )));
            }
            days.push(row.into_iter().map(|label| label.0).collect());
        }
        Ok(ProgramWeek(days))
    }
}

/// The vendor has sent grid labels both as ints and as strings across app
/// revisions; both decode to the same numeric label here.
struct SlotLabel(u8);

impl<'de> Deserialize<'de> for SlotLabel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .map(SlotLabel)
                .ok_or_else(|| de::Error::custom(format!("slot label out of range: {n}"))),
            Value::String(s) => s
                .trim()
                .parse::<u8>()
                .map(SlotLabel)
                .map_err(|_| de::Error::custom(format!("invalid slot label: {s:?}"))),
            other => Err(de::Error::custom(format!(
                "expected slot label, got {other}"
            ))),
        }
    }
}

fn de_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn de_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn de_opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.is_empty() || s == "N/A" => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid number: {s:?}"))),
        Some(other) => Err(de::Error::custom(format!("expected number, got {other}"))),
    }
}

fn de_opt_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_i64()),
        Some(Value::String(s)) if s.is_empty() || s == "N/A" => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid integer: {s:?}"))),
        Some(other) => Err(de::Error::custom(format!("expected integer, got {other}"))),
    }
}

fn de_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    de_opt_i64(deserializer).map(|v| v.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_data_accepts_stringly_numbers() {
        let data: RoomData = serde_json::from_value(json!({
            "error": "0",
            "tempNow": "21.5",
            "tempSet": 20.0,
            "frostT": "5.0",
            "saveT": "16.0",
            "comfT": "20.0",
            "heating": "1",
            "mode": "2",
            "tempUnit": 0,
            "bat": "0"
        }))
        .unwrap();

        assert_eq!(data.error, 0);
        assert_eq!(data.temp_now, Some(21.5));
        assert_eq!(data.mode, Some(2));
        assert!(data.is_heating());
        assert!(!data.battery_low());
        assert_eq!(data.degrees_unit(), DegreesUnit::Celsius);
    }

    #[test]
    fn room_data_missing_fields_decode_to_none() {
        let data: RoomData = serde_json::from_value(json!({"error": 0})).unwrap();
        assert_eq!(data.temp_now, None);
        assert_eq!(data.mode, None);
        assert!(data.program_week.is_none());
        assert!(!data.is_heating());
    }

    #[test]
    fn room_data_na_temperature_is_none() {
        let data: RoomData =
            serde_json::from_value(json!({"error": 0, "tempNow": "N/A"})).unwrap();
        assert_eq!(data.temp_now, None);
    }

    #[test]
    fn program_week_accepts_string_and_int_labels() {
        let mut rows = vec![vec![json!(0); 48]; 7];
        rows[2][10] = json!("2");
        rows[2][11] = json!(1);
        let week: ProgramWeek = serde_json::from_value(json!(rows)).unwrap();
        assert_eq!(week.slot(2, 10), Some(2));
        assert_eq!(week.slot(2, 11), Some(1));
        assert_eq!(week.slot(2, 12), Some(0));
    }

    #[test]
    fn program_week_rejects_wrong_shape() {
        let six_days = vec![vec![json!(0); 48]; 6];
        assert!(serde_json::from_value::<ProgramWeek>(json!(six_days)).is_err());

        let mut short_day = vec![vec![json!(0); 48]; 7];
        short_day[4] = vec![json!(0); 47];
        assert!(serde_json::from_value::<ProgramWeek>(json!(short_day)).is_err());
    }

    #[test]
    fn room_summary_numeric_ids_become_strings() {
        let room: RoomSummary = serde_json::from_value(json!({
            "id": 14054,
            "name": "Soggiorno",
            "therId": "2482",
            "roomMark": 5,
            "thModel": "195",
            "unit": "0"
        }))
        .unwrap();
        assert_eq!(room.id.as_deref(), Some("14054"));
        assert_eq!(room.room_mark.as_deref(), Some("5"));
        assert_eq!(room.degrees_unit(), DegreesUnit::Celsius);
    }

    #[test]
    fn session_requires_device_id() {
        assert!(serde_json::from_value::<Session>(json!({"error": 0})).is_err());
        let s: Session = serde_json::from_value(json!({"deviceId": 77})).unwrap();
        assert_eq!(s.device_id, "77");
    }

    #[test]
    fn vendor_mode_closed_set() {
        assert_eq!(ThermostatMode::from_vendor(0), Some(ThermostatMode::Auto));
        assert_eq!(ThermostatMode::from_vendor(4), Some(ThermostatMode::Idle));
        assert_eq!(ThermostatMode::from_vendor(5), None);
        assert_eq!(ThermostatMode::from_vendor(-1), None);
    }

    #[test]
    fn operation_mode_fallback_is_auto() {
        assert_eq!(
            OperationMode::from_label("away").to_vendor(),
            ThermostatMode::Auto
        );
        assert_eq!(
            OperationMode::from_label("eco").to_vendor(),
            ThermostatMode::Economy
        );
    }
}
