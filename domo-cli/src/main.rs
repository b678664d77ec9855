//! domo-cli: Terminal client for the domo hub
//!
//! Signs in once, persists the credential pair under the config dir, and
//! from then on every command rides the shared dispatcher: expired access
//! tokens are renewed and the failed call replayed without the user
//! noticing.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use domo_api::{AuthService, DeviceService, OverviewService, Room, RoomService};
use domo_core::{ApiClient, ClientConfig};

fn usage() -> ! {
    eprintln!(
        "usage: domo <command>\n\
         \n\
         commands:\n\
         \x20 login <username> <password>   sign in and store credentials\n\
         \x20 logout                        revoke the session\n\
         \x20 whoami                        show the signed-in profile\n\
         \x20 devices [room]                list devices, optionally one room\n\
         \x20 light <device-id> on|off      switch a light\n\
         \x20 door <device-id> open|close   operate a door\n\
         \x20 room <location>               show one room's state\n\
         \x20 overview                      whole-home snapshot"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "domo_cli=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ClientConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        ClientConfig::default()
    });

    let client = Arc::new(ApiClient::from_config(&config)?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut args = args.iter().map(String::as_str);

    match args.next() {
        Some("login") => {
            let (Some(username), Some(password)) = (args.next(), args.next()) else {
                usage();
            };
            AuthService::new(client).login(username, password).await?;
            println!("signed in as {username}");
        }
        Some("logout") => {
            AuthService::new(client).logout().await?;
            println!("signed out");
        }
        Some("whoami") => {
            let profile = AuthService::new(client).me().await?;
            println!("{} ({})", profile.username, profile.full_name);
            for role in &profile.roles {
                println!("  role: {}", role.name);
            }
        }
        Some("devices") => {
            let devices = DeviceService::new(client).list(args.next()).await?;
            for device in devices {
                println!(
                    "{:24} {:12} {:8} {}",
                    device.name,
                    device.id,
                    if device.is_online() { "online" } else { "offline" },
                    device.location.as_deref().unwrap_or("-"),
                );
            }
        }
        Some("light") => {
            let (Some(id), Some(state)) = (args.next(), args.next()) else {
                usage();
            };
            let on = match state {
                "on" => true,
                "off" => false,
                _ => usage(),
            };
            DeviceService::new(client).set_light(id, on).await?;
            println!("light {id} -> {state}");
        }
        Some("door") => {
            let (Some(id), Some(state)) = (args.next(), args.next()) else {
                usage();
            };
            let open = match state {
                "open" => true,
                "close" => false,
                _ => usage(),
            };
            DeviceService::new(client).set_door(id, open).await?;
            println!("door {id} -> {state}");
        }
        Some("room") => {
            let location = args
                .next()
                .map(str::to_owned)
                .or_else(|| config.default_room.clone());
            let Some(room) = location.as_deref().and_then(Room::parse) else {
                eprintln!(
                    "unknown room; expected one of: {}",
                    Room::all().map(|r| r.as_str().to_string()).join(", ")
                );
                std::process::exit(2);
            };
            let detail = RoomService::new(client).detail(room).await?;
            println!(
                "{}: {} devices, lights {}/{}, doors open {}/{}",
                detail.location,
                detail.devices.len(),
                detail.lights_on,
                detail.lights_total,
                detail.doors_open,
                detail.doors_total,
            );
            if let Some(t) = detail.temperature {
                println!("  temperature: {t:.1} C");
            }
            if let Some(h) = detail.humidity {
                println!("  humidity: {h:.0}%");
            }
        }
        Some("overview") => {
            let overview = OverviewService::new(client).snapshot().await?;
            let status = &overview.quick_status;
            println!(
                "devices online: {}/{}  lights on: {}  doors open: {}",
                status.devices_online, status.devices_total, status.lights_on, status.doors_open,
            );
        }
        _ => usage(),
    }

    Ok(())
}
