use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use xantech_digi5::{Digi5Driver, Hub, HubConfig};

fn usage() {
    println!("Commands:");
    println!("  on <zone> | off <zone> | alloff");
    println!("  mute <zone> | unmute <zone>");
    println!("  vol <zone> <0-21> | up <zone> | down <zone>");
    println!("  src <zone> <1-5|name>");
    println!("  bal <zone> <-5..5> | bass <zone> <-5..5> | treble <zone> <-5..5>");
    println!("  status | refresh | quit");
}

fn print_status(hub: &Hub) {
    println!(
        "{} (firmware {})",
        hub.device_type().unwrap_or_else(|| "DIGI-5".to_string()),
        hub.firmware_version().unwrap_or_else(|| "unknown".to_string())
    );
    for zone in hub.zones() {
        let name = hub
            .zone_name(zone.number())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Zone {}", zone.number()));
        let source = hub
            .zone_source_name(zone.number())
            .unwrap_or_else(|| zone.source().to_string());
        println!(
            "  {:<12} power={:<5} mute={:<5} source={:<10} vol={:>2} bal={:>2} bass={:>2} \
             treble={:>2}",
            name,
            zone.is_power_on(),
            zone.is_muted(),
            source,
            zone.volume(),
            zone.balance(),
            zone.bass_level(),
            zone.treble_level()
        );
    }
}

fn run_command(hub: &Hub, line: &str) -> Result<bool, Box<dyn Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let zone = |i: usize| -> Result<u8, Box<dyn Error>> {
        Ok(parts.get(i).ok_or("missing zone")?.parse()?)
    };
    let number = |i: usize| -> Result<i32, Box<dyn Error>> {
        Ok(parts.get(i).ok_or("missing value")?.parse()?)
    };

    match parts.first().copied() {
        None => {}
        Some("quit") | Some("exit") => return Ok(false),
        Some("on") => hub.turn_on(zone(1)?)?,
        Some("off") => hub.turn_off(zone(1)?)?,
        Some("alloff") => hub.turn_all_zones_off()?,
        Some("mute") => hub.mute(zone(1)?)?,
        Some("unmute") => hub.unmute(zone(1)?)?,
        Some("vol") => hub.set_volume(zone(1)?, number(2)?)?,
        Some("up") => hub.increment_volume(zone(1)?)?,
        Some("down") => hub.decrement_volume(zone(1)?)?,
        Some("src") => {
            let target = parts.get(2).ok_or("missing source")?;
            match target.parse::<i32>() {
                Ok(source) => hub.set_source(zone(1)?, source)?,
                Err(_) => hub.set_source_by_name(zone(1)?, target)?,
            }
        }
        Some("bal") => hub.set_balance(zone(1)?, number(2)?)?,
        Some("bass") => hub.set_bass_level(zone(1)?, number(2)?)?,
        Some("treble") => hub.set_treble_level(zone(1)?, number(2)?)?,
        Some("status") => print_status(hub),
        Some("refresh") => hub.refresh()?,
        Some(_) => usage(),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xantech_digi5=info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(arg) if arg.ends_with(".json") => HubConfig::from_json_file(arg)?,
        Some(port) => HubConfig::builder().serial_port(port).build(),
        None => HubConfig::default(),
    };

    println!("Connecting to DIGI-5 on {}...", config.serial_port);
    let driver = Digi5Driver::start(config).await?;

    // Spawn task to print state updates as they arrive
    let mut updates = driver.hub().subscribe();
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            match update.zone() {
                Some(zone) => println!(
                    "[zone {}] {} = {}",
                    zone,
                    update.property_name(),
                    update.value()
                ),
                None => println!("[hub] {} = {}", update.property_name(), update.value()),
            }
        }
    });

    usage();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match run_command(driver.hub(), line.trim()) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("Error: {}", e),
        }
    }

    driver.stop().await;
    Ok(())
}
