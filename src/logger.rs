use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::warn;

/// `Full` writes request forms verbatim. This client POSTs the account
/// password on every login, so `Redacted` masks credential fields and is
/// the mode to use for logs that leave the machine.
pub enum MessageLogMode {
    Full,
    Redacted,
}

const CREDENTIAL_FIELDS: &[&str] = &["un", "pwd"];

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_request(&mut self, method: &str, path: &str, form: Option<&[(&'static str, String)]>) {
        let form_json = form.map(|fields| {
            let map: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| {
                    let logged = if matches!(self.mode, MessageLogMode::Redacted)
                        && CREDENTIAL_FIELDS.contains(key)
                    {
                        Value::String("<redacted>".to_string())
                    } else {
                        Value::String(value.clone())
                    };
                    ((*key).to_string(), logged)
                })
                .collect();
            Value::Object(map)
        });
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "form": form_json,
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, path: &str, status: u16, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "resp",
            "path": path,
            "status": status,
            "body": body,
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
