use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::{debug, warn};

use crate::client::BesmartClient;
use crate::types::{DegreesUnit, OperationMode, RoomData, SetpointSlot, ThermostatMode};
use crate::{Error, Result};

const OPERATION_LIST: &[&str] = &["auto", "manual", "eco", "idle"];

/// Platform adapter for one thermostat-controlled room.
///
/// The host platform drives `update()` on its polling schedule and reads
/// the property getters between polls. On any failed poll the previous
/// values stay in place; a command that fails is a no-op for the host to
/// retry on a later cycle.
pub struct Thermostat {
    name: String,
    room: String,
    client: BesmartClient,
    current_temp: Option<f64>,
    frost_t: Option<f64>,
    save_t: Option<f64>,
    comf_t: Option<f64>,
    heating: bool,
    battery_low: bool,
    mode: Option<i64>,
    unit: DegreesUnit,
    slot_label: Option<u8>,
}

impl Thermostat {
    pub fn new(name: impl Into<String>, room: impl Into<String>, client: BesmartClient) -> Self {
        Self {
            name: name.into(),
            room: room.into(),
            client,
            current_temp: None,
            frost_t: None,
            save_t: None,
            comf_t: None,
            heating: false,
            battery_low: false,
            mode: None,
            unit: DegreesUnit::Celsius,
            slot_label: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Pull one state snapshot from the vendor. A payload carrying a
    /// vendor error flag keeps the previous values; transport errors
    /// propagate with state untouched either way.
    pub async fn update(&mut self) -> Result<()> {
        let Some(room) = self.client.room_by_name(&self.room).await? else {
            warn!(room = %self.room, "room not found in vendor directory");
            return Err(Error::UnknownRoom(self.room.clone()));
        };
        let data = self.client.room_data(&room).await?;
        if data.error != 0 {
            debug!(room = %self.room, code = data.error, "vendor flagged room data, keeping previous state");
            return Ok(());
        }
        self.apply(&data, Local::now());
        Ok(())
    }

    /// Fold a snapshot into the adapter, overwriting only fields the
    /// payload carries. The active program slot is captured from `now`
    /// here and not recomputed between polls.
    fn apply(&mut self, data: &RoomData, now: DateTime<Local>) {
        if let Some(v) = data.temp_now {
            self.current_temp = Some(v);
        }
        if let Some(v) = data.frost_t {
            self.frost_t = Some(v);
        }
        if let Some(v) = data.save_t {
            self.save_t = Some(v);
        }
        if let Some(v) = data.comf_t {
            self.comf_t = Some(v);
        }
        if let Some(v) = data.mode {
            self.mode = Some(v);
        }
        if data.heating.is_some() {
            self.heating = data.is_heating();
        }
        if data.bat.is_some() {
            self.battery_low = data.battery_low();
        }
        if let Some(flag) = &data.temp_unit {
            self.unit = DegreesUnit::from_flag(flag);
        }
        if let Some(week) = &data.program_week {
            self.slot_label = week.slot(active_day(&now), active_slot_index(&now));
        }
    }

    /// Operation label for the vendor mode; unknown outside the closed
    /// mode set, and before the first successful poll.
    pub fn current_operation(&self) -> OperationMode {
        match self.mode {
            Some(v) => OperationMode::from_vendor(v),
            None => OperationMode::Unknown,
        }
    }

    pub fn operation_list(&self) -> &'static [&'static str] {
        OPERATION_LIST
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.current_temp
    }

    /// The setpoint for whichever slot is currently in effect.
    pub fn target_temperature(&self) -> Option<f64> {
        match self.active_setpoint() {
            SetpointSlot::Frost => self.frost_t,
            SetpointSlot::Saving => self.save_t,
            SetpointSlot::Comfort => self.comf_t,
        }
    }

    pub fn temperature_unit(&self) -> DegreesUnit {
        self.unit
    }

    pub fn is_heating(&self) -> bool {
        self.heating
    }

    pub fn battery_low(&self) -> bool {
        self.battery_low
    }

    /// Map a platform mode label to the vendor integer and send it.
    /// Unrecognized labels go out as Auto.
    pub async fn set_operation_mode(&mut self, label: &str) -> Result<()> {
        let mode = OperationMode::from_label(label).to_vendor();
        self.client.set_room_mode(&self.room, mode).await
    }

    /// Adjust whichever setpoint is currently in effect. "Set temperature"
    /// always edits the active slot, never an arbitrary one.
    pub async fn set_temperature(&mut self, value: f64) -> Result<()> {
        let slot = self.active_setpoint();
        self.client.set_room_temp(&self.room, value, slot).await
    }

    /// Slot selection: Manual and Party run on Comfort, Economy on Saving,
    /// Idle on Frost. Auto (and unknown modes) defer to the program grid
    /// slot captured at the last poll, frost protection when absent.
    fn active_setpoint(&self) -> SetpointSlot {
        match self.mode.and_then(ThermostatMode::from_vendor) {
            Some(ThermostatMode::Manual) | Some(ThermostatMode::Party) => SetpointSlot::Comfort,
            Some(ThermostatMode::Economy) => SetpointSlot::Saving,
            Some(ThermostatMode::Idle) => SetpointSlot::Frost,
            Some(ThermostatMode::Auto) | None => {
                SetpointSlot::from_program_label(self.slot_label.unwrap_or(0))
            }
        }
    }
}

/// Weekday with Sunday as day 0, the grid's row order.
fn active_day(now: &DateTime<Local>) -> usize {
    now.weekday().num_days_from_sunday() as usize
}

/// Half-hour slot 0..47. Minute 30 still counts toward the first half,
/// matching the vendor app.
fn active_slot_index(now: &DateTime<Local>) -> usize {
    (now.hour() * 2) as usize + usize::from(now.minute() > 30)
}
