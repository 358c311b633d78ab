//! `inkcal scan`: list what the radio can see.

use inkcal_ble::{DiscoveryConfig, PeripheralHandle, Radio};

use crate::error::ClientResult;

/// Scans for the configured window and prints every peripheral seen.
///
/// Peripherals that discovery would accept are marked with `*`.
pub async fn scan(radio: &dyn Radio, discovery: &DiscoveryConfig) -> ClientResult<()> {
    println!(
        "Scanning for {} seconds...",
        discovery.scan_timeout.as_secs_f32()
    );
    let seen = radio.scan(discovery.scan_timeout).await?;

    if seen.is_empty() {
        println!("No peripherals found.");
        return Ok(());
    }
    for line in render(&seen, discovery) {
        println!("{}", line);
    }
    Ok(())
}

fn render(seen: &[PeripheralHandle], discovery: &DiscoveryConfig) -> Vec<String> {
    seen.iter()
        .map(|peripheral| {
            let mark = if discovery.matches(peripheral) { '*' } else { ' ' };
            match peripheral.rssi {
                Some(rssi) => format!("{} {} {} dBm", mark, peripheral, rssi),
                None => format!("{} {}", mark, peripheral),
            }
        })
        .collect()
}
