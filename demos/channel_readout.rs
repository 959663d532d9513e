use std::time::Duration;

use anyhow::Result;
use bigdecimal::BigDecimal;
use n6700_control::{DEFAULT_PORT, tcp};
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).map(String::as_str).unwrap_or("192.168.0.100");
    let port = match args.get(2) {
        Some(port) => port.parse()?,
        None => DEFAULT_PORT,
    };

    let mut inst = tcp(host, port);

    let idn = match timeout(Duration::from_secs(5), inst.identify()).await {
        Ok(result) => result?,
        Err(_) => {
            eprintln!("N6700 did not answer within 5 s; check instrument power and network.");
            return Ok(());
        }
    };
    println!("IDN: {idn}");

    for channel in inst.channels() {
        let on = inst.get_channel_state(*channel).await?;
        println!("CH{channel}:");
        println!("  Output        : {}", if on == BigDecimal::from(0) { "OFF" } else { "ON" });
        println!(
            "  Measured      : {} V / {} A (RMS {} A)",
            inst.measure_dc_voltage(*channel).await?,
            inst.measure_dc_current(*channel).await?,
            inst.measure_rms_current(*channel).await?
        );
        println!("  Current range : {} A", inst.get_current_range(*channel).await?);
        println!("  Voltage limit : {} V", inst.get_voltage_limit(*channel).await?);
    }
    Ok(())
}
