use crate::types::SetpointSlot;

/// Vendor cloud base URL, dated path included. The Android app this
/// protocol was lifted from has shipped the same endpoint set for years.
pub const DEFAULT_BASE_URL: &str = "http://www.besmart-home.com/Android_vokera_20160516/";

/// Protocol version the login endpoint expects.
pub const APP_VERSION: &str = "32";

pub const LOGIN: &str = "login.php";
pub const ROOM_LIST: &str = "getRoomList.php";
pub const ROOM_DATA: &str = "getRoomData196.php";
pub const ROOM_PROGRAM: &str = "getProgram.php";
pub const SET_MODE: &str = "setRoomMode.php";
#[allow(dead_code)]
pub const SET_TEMP: &str = "setRoomTemp.php";
pub const SET_COMFORT_TEMP: &str = "setComfTemp.php";
pub const SET_SAVING_TEMP: &str = "setEconTemp.php";
pub const SET_FROST_TEMP: &str = "setFrostTemp.php";

pub fn login_form(username: &str, password: &str) -> Vec<(&'static str, String)> {
    vec![
        ("un", username.to_string()),
        ("pwd", password.to_string()),
        ("version", APP_VERSION.to_string()),
    ]
}

/// Mode changes address the room by its `roomMark`, not its `therId`.
/// That asymmetry with [`set_temp_form`] is the vendor's, not ours.
pub fn set_mode_form(device_id: &str, room_mark: &str, mode: u8) -> Vec<(&'static str, String)> {
    vec![
        ("deviceId", device_id.to_string()),
        ("therId", room_mark.to_string()),
        ("mode", mode.to_string()),
    ]
}

pub fn set_temp_form(
    device_id: &str,
    ther_id: &str,
    temp_int: &str,
    temp_frac: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("therId", ther_id.to_string()),
        ("deviceId", device_id.to_string()),
        ("tempSet", temp_int.to_string()),
        ("tempSetFloat", temp_frac.to_string()),
    ]
}

pub fn temp_endpoint(slot: SetpointSlot) -> &'static str {
    match slot {
        SetpointSlot::Comfort => SET_COMFORT_TEMP,
        SetpointSlot::Saving => SET_SAVING_TEMP,
        SetpointSlot::Frost => SET_FROST_TEMP,
    }
}
