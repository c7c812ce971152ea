mod client;
mod error;
mod logger;
mod protocol;
mod thermostat;
mod types;

pub use client::{BesmartClient, BesmartClientBuilder};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use thermostat::Thermostat;
pub use types::*;
