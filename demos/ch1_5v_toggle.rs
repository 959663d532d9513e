use std::time::Duration;

use anyhow::Result;
use bigdecimal::BigDecimal;
use n6700_control::{DEFAULT_PORT, Error, tcp};
use tokio::time::{sleep, timeout};

const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Run a non-query command, tolerating the N6700's silence afterwards.
async fn send(
    what: &str,
    command: impl Future<Output = n6700_control::Result<BigDecimal>>,
) -> Result<()> {
    match timeout(ACK_TIMEOUT, command).await {
        Ok(Ok(_)) => {}
        Ok(Err(Error::NumericFormat { response, .. })) => {
            println!("{what}: acknowledged with {response:?}");
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => println!("{what}: sent, no acknowledgement within {ACK_TIMEOUT:?}"),
    }
    Ok(())
}

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

    // The first command opens the socket, so bound it the way a connect would be.
    let idn = match timeout(Duration::from_secs(5), inst.identify()).await {
        Ok(result) => result?,
        Err(_) => {
            eprintln!("N6700 did not answer within 5 s; check instrument power and network.");
            return Ok(());
        }
    };
    println!("IDN: {idn}");

    send("CV priority", inst.set_constant_voltage(1)).await?;
    send("voltage limit 6 V", inst.set_voltage_limit(6, 1)).await?;
    send("voltage 5 V", inst.set_voltage(5, 1)).await?;
    send("current 0.5 A", inst.set_current(0.5, 1)).await?;
    send("output on", inst.enable_channel(1)).await?;

    sleep(Duration::from_secs(1)).await;
    let volts = inst.measure_dc_voltage(1).await?;
    let amps = inst.measure_dc_current(1).await?;
    println!("CH1: {volts} V / {amps} A");

    send("output off", inst.disable_channel(1)).await?;
    send("voltage 0 V", inst.set_voltage(0, 1)).await?;
    Ok(())
}
