use std::env;
use std::time::Duration;

use besmart::{BesmartClient, DegreesUnit, Thermostat};

fn fmt_temp(value: Option<f64>, unit: DegreesUnit) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "--".to_string(),
    }
}

#[tokio::main]
async fn main() -> besmart::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let (username, password, room) = match (args.get(1), args.get(2), args.get(3)) {
        (Some(u), Some(p), Some(r)) => (u.clone(), p.clone(), r.clone()),
        _ => {
            eprintln!("usage: monitor <username> <password> <room>");
            std::process::exit(2);
        }
    };

    let client = BesmartClient::builder(username, password).build();
    let mut thermostat = Thermostat::new("BeSMART Thermostat", room, client);

    println!("Polling room '{}'...", thermostat.room());
    loop {
        match thermostat.update().await {
            Ok(()) => println!(
                "[{}] now: {} | target: {} | mode: {} | heating: {}{}",
                thermostat.room(),
                fmt_temp(thermostat.current_temperature(), thermostat.temperature_unit()),
                fmt_temp(thermostat.target_temperature(), thermostat.temperature_unit()),
                thermostat.current_operation(),
                if thermostat.is_heating() { "on" } else { "off" },
                if thermostat.battery_low() { " | LOW BATTERY" } else { "" },
            ),
            Err(e) => eprintln!("poll error: {e}"),
        }
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}
