use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol;
use crate::types::{
    DegreesUnit, ProgramWeek, RoomData, RoomSummary, Session, SetpointSlot, Temperature,
    ThermostatMode,
};
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_ROOM_CACHE_TTL: Duration = Duration::from_secs(120);

pub struct BesmartClientBuilder {
    username: String,
    password: String,
    base_url: String,
    timeout: Duration,
    room_cache_ttl: Duration,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl BesmartClientBuilder {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: protocol::DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            room_cache_ttl: DEFAULT_ROOM_CACHE_TTL,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn room_cache_ttl(mut self, ttl: Duration) -> Self {
        self.room_cache_ttl = ttl;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> BesmartClient {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("failed to build HTTP client");

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(MessageLogger::new(mode, &path).expect("failed to open log file"))
            }
            _ => None,
        };

        let mut base_url = self.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        BesmartClient {
            http,
            base_url,
            username: self.username,
            password: self.password,
            room_cache_ttl: self.room_cache_ttl,
            session: None,
            rooms: HashMap::new(),
            last_fetch: None,
            logger,
        }
    }
}

pub struct BesmartClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    room_cache_ttl: Duration,
    session: Option<Session>,
    rooms: HashMap<String, RoomSummary>,
    last_fetch: Option<Instant>,
    logger: Option<MessageLogger>,
}

impl BesmartClient {
    pub fn builder(username: impl Into<String>, password: impl Into<String>) -> BesmartClientBuilder {
        BesmartClientBuilder::new(username, password)
    }

    /// The `deviceId` of the current session, if one is held.
    pub fn device_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.device_id.as_str())
    }

    /// Authenticate against the vendor cloud and store the session.
    /// Always POSTs, even when a session is already held.
    pub async fn login(&mut self) -> Result<Session> {
        let form = protocol::login_form(&self.username, &self.password);
        let body = self
            .request(Method::POST, protocol::LOGIN, &[], Some(&form))
            .await?;
        let session: Session = serde_json::from_value(body)
            .map_err(|e| Error::Auth(format!("unusable login response: {e}")))?;
        debug!(device_id = %session.device_id, "logged in");
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn ensure_session(&mut self) -> Result<Session> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        self.login().await
    }

    /// Refresh the room directory, indexing rooms by lowercased name.
    /// Placeholder rows the vendor pads the list with are skipped.
    pub async fn rooms(&mut self) -> Result<Vec<RoomSummary>> {
        let session = self.ensure_session().await?;
        let query = [("deviceId", session.device_id)];
        let body = self
            .request(Method::POST, protocol::ROOM_LIST, &query, None)
            .await?;
        let entries: Vec<RoomSummary> = serde_json::from_value(body)
            .map_err(|e| Error::Protocol(format!("bad room list: {e}")))?;

        self.rooms.clear();
        let mut kept = Vec::new();
        for room in entries {
            let (Some(_), Some(name)) = (&room.id, &room.name) else {
                debug!("skipping placeholder room entry");
                continue;
            };
            self.rooms.insert(name.to_lowercase(), room.clone());
            kept.push(room);
        }
        self.last_fetch = Some(Instant::now());
        debug!(count = kept.len(), "room directory refreshed");
        Ok(kept)
    }

    /// Cached, case-insensitive room lookup. The directory is refreshed
    /// first when absent or older than the configured TTL.
    pub async fn room_by_name(&mut self, name: &str) -> Result<Option<RoomSummary>> {
        let stale = match self.last_fetch {
            None => true,
            Some(at) => at.elapsed() > self.room_cache_ttl,
        };
        if stale {
            self.rooms().await?;
        }
        Ok(self.rooms.get(&name.to_lowercase()).cloned())
    }

    /// Live state snapshot for a room. Logs in first on every call: the
    /// vendor session is short-lived, and re-authenticating per poll is
    /// what keeps this endpoint reliable.
    pub async fn room_data(&mut self, room: &RoomSummary) -> Result<RoomData> {
        let session = self.login().await?;
        let ther_id = room
            .ther_id
            .clone()
            .ok_or_else(|| Error::Protocol("room entry has no therId".to_string()))?;
        let query = [("therId", ther_id), ("deviceId", session.device_id)];
        let body = self
            .request(Method::GET, protocol::ROOM_DATA, &query, None)
            .await?;
        serde_json::from_value(body).map_err(|e| Error::Protocol(format!("bad room data: {e}")))
    }

    /// Weekly program grid for a room.
    pub async fn program(&mut self, room: &RoomSummary) -> Result<ProgramWeek> {
        self.ensure_session().await?;
        let room_id = room
            .id
            .clone()
            .ok_or_else(|| Error::Protocol("room entry has no id".to_string()))?;
        let query = [("roomId", room_id)];
        let body = self
            .request(Method::GET, protocol::ROOM_PROGRAM, &query, None)
            .await?;

        #[derive(Deserialize)]
        struct ProgramResponse {
            #[serde(default)]
            error: i64,
            #[serde(default)]
            program: Option<ProgramWeek>,
        }

        let resp: ProgramResponse = serde_json::from_value(body)
            .map_err(|e| Error::Protocol(format!("bad program response: {e}")))?;
        if resp.error != 0 {
            return Err(Error::Rejected { code: resp.error });
        }
        resp.program
            .ok_or_else(|| Error::Protocol("program response has no grid".to_string()))
    }

    /// Change a room's work mode. Success is the vendor's own sentinel,
    /// `error == 1`, checked literally.
    pub async fn set_room_mode(&mut self, room_name: &str, mode: ThermostatMode) -> Result<()> {
        let room = self.resolve_room(room_name).await?;
        let session = self.ensure_session().await?;
        let room_mark = room
            .room_mark
            .clone()
            .ok_or_else(|| Error::Protocol("room entry has no roomMark".to_string()))?;
        let form = protocol::set_mode_form(&session.device_id, &room_mark, mode.as_vendor());
        let body = self
            .request(Method::POST, protocol::SET_MODE, &[], Some(&form))
            .await?;
        check_command_ack(&body)
    }

    /// Write one of the three setpoints. The value is interpreted in the
    /// room's reported display unit and always transmitted in Celsius,
    /// rounded to one decimal and split across the two vendor form fields.
    pub async fn set_room_temp(
        &mut self,
        room_name: &str,
        value: f64,
        slot: SetpointSlot,
    ) -> Result<()> {
        let room = self.resolve_room(room_name).await?;
        let session = self.ensure_session().await?;
        let ther_id = room
            .ther_id
            .clone()
            .ok_or_else(|| Error::Protocol("room entry has no therId".to_string()))?;

        let temp = match room.degrees_unit() {
            DegreesUnit::Celsius => Temperature::from_celsius(value),
            DegreesUnit::Fahrenheit => Temperature::from_fahrenheit(value),
        };
        let (temp_int, temp_frac) = temp.vendor_fields();
        let form = protocol::set_temp_form(&session.device_id, &ther_id, &temp_int, &temp_frac);
        let body = self
            .request(Method::POST, protocol::temp_endpoint(slot), &[], Some(&form))
            .await?;
        check_command_ack(&body)
    }

    pub async fn set_comfort_temp(&mut self, room_name: &str, value: f64) -> Result<()> {
        self.set_room_temp(room_name, value, SetpointSlot::Comfort).await
    }

    pub async fn set_economy_temp(&mut self, room_name: &str, value: f64) -> Result<()> {
        self.set_room_temp(room_name, value, SetpointSlot::Saving).await
    }

    pub async fn set_frost_temp(&mut self, room_name: &str, value: f64) -> Result<()> {
        self.set_room_temp(room_name, value, SetpointSlot::Frost).await
    }

    async fn resolve_room(&mut self, name: &str) -> Result<RoomSummary> {
        self.room_by_name(name)
            .await?
            .ok_or_else(|| Error::UnknownRoom(name.to_string()))
    }

    /// One round trip to the vendor. Any failure along the way (connect,
    /// HTTP status, body decode) discards the session so the next call
    /// starts with a fresh login; there is no retry here.
    async fn request(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        form: Option<&[(&'static str, String)]>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(fields) = form {
            req = req.form(fields);
        }

        if let Some(ref mut logger) = self.logger {
            logger.log_request(method.as_str(), path, form);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(path, error = %e, "transport error, discarding session");
                self.session = None;
                return Err(e.into());
            }
        };
        let status = resp.status();
        let resp = match resp.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!(path, status = status.as_u16(), "HTTP error, discarding session");
                self.session = None;
                return Err(e.into());
            }
        };
        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(path, error = %e, "undecodable response, discarding session");
                self.session = None;
                return Err(e.into());
            }
        };

        if let Some(ref mut logger) = self.logger {
            logger.log_response(path, status.as_u16(), &body);
        }
        Ok(body)
    }
}

fn check_command_ack(body: &Value) -> Result<()> {
    let code = body.get("error").and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    match code {
        Some(1) => Ok(()),
        Some(code) => Err(Error::Rejected { code }),
        None => Err(Error::Protocol(
            "command response has no error field".to_string(),
        )),
    }
}
