use std::fmt::Display;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Connection, ScpiProtocol};
use crate::transport::TcpTransport;

/// Output channels of the modeled N6700 mainframe.
pub const CHANNELS: [u32; 4] = [1, 2, 3, 4];

/// Connect to an N6700 over a raw SCPI socket.
///
/// No I/O happens here; an unreachable host is reported by the first command.
pub fn tcp(host: &str, port: u16) -> N6700<ScpiProtocol<TcpTransport>> {
    debug!("creating N6700 client for {}:{}", host, port);
    N6700::new(ScpiProtocol::new(TcpTransport::new(host, port)))
}

/// Keysight N6700 modular power system.
///
/// Every method sends exactly one command through the owned [`Connection`]
/// and parses the single reply line as a [`BigDecimal`]. Channel numbers are
/// passed through unchecked; setpoints are formatted with their `Display`
/// impl and not range-checked.
///
/// The actuation commands (`enable_channel`, `disable_channel`,
/// `set_constant_current`, `set_constant_voltage`) and the numeric setters
/// also parse their reply as a decimal. Real hardware normally sends nothing
/// back for a non-query command, so on a live instrument these calls wait for
/// a line that may never come, or fail with [`Error::NumericFormat`].
pub struct N6700<C> {
    inner: C,
}

impl<C: Connection> N6700<C> {
    pub fn new(connection: C) -> Self {
        Self { inner: connection }
    }

    pub fn channels(&self) -> &'static [u32] {
        &CHANNELS
    }

    pub fn connection(&self) -> &C {
        &self.inner
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// `*IDN?`, returned as text.
    pub async fn identify(&mut self) -> Result<String> {
        let resp = self.inner.query("*IDN?").await?;
        Ok(resp.trim().to_string())
    }

    /// Measured DC output current in amps.
    pub async fn measure_dc_current(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("MEAS:CURR? (@{channel})")).await
    }

    /// Measured DC output voltage in volts.
    pub async fn measure_dc_voltage(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("MEAS:VOLT? (@{channel})")).await
    }

    /// Measured AC+DC (RMS) output current in amps.
    pub async fn measure_rms_current(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("MEAS:CURR:ACDC? (@{channel})")).await
    }

    pub async fn enable_channel(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("OUTP ON, (@{channel})")).await
    }

    pub async fn disable_channel(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("OUTP OFF, (@{channel})")).await
    }

    /// Output state: `1` for on, `0` for off.
    pub async fn get_channel_state(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("OUTP? (@{channel})")).await
    }

    /// Put the channel in constant-current priority mode.
    pub async fn set_constant_current(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("OUTP:PMOD CURR, (@{channel})")).await
    }

    /// Put the channel in constant-voltage priority mode.
    pub async fn set_constant_voltage(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("OUTP:PMOD VOLT, (@{channel})")).await
    }

    /// Select the current range able to source at least `max` amps.
    pub async fn set_current_range<V: Display>(
        &mut self,
        max: V,
        channel: u32,
    ) -> Result<BigDecimal> {
        self.query_decimal(&format!("CURR:RANG {max}, (@{channel})")).await
    }

    pub async fn get_current_range(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("CURR:RANG? (@{channel})")).await
    }

    /// Current setpoint in amps. Must lie inside the active current range.
    pub async fn set_current<V: Display>(&mut self, amps: V, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("CURR {amps}, (@{channel})")).await
    }

    /// Power limit in watts.
    pub async fn set_power_limit<V: Display>(
        &mut self,
        power: V,
        channel: u32,
    ) -> Result<BigDecimal> {
        self.query_decimal(&format!("POW:LIM {power}, (@{channel})")).await
    }

    /// Voltage setpoint in volts.
    pub async fn set_voltage<V: Display>(
        &mut self,
        voltage: V,
        channel: u32,
    ) -> Result<BigDecimal> {
        self.query_decimal(&format!("VOLT {voltage}, (@{channel})")).await
    }

    /// Voltage limit in volts.
    pub async fn set_voltage_limit<V: Display>(
        &mut self,
        max: V,
        channel: u32,
    ) -> Result<BigDecimal> {
        self.query_decimal(&format!("VOLT:LIM {max}, (@{channel})")).await
    }

    pub async fn get_voltage_limit(&mut self, channel: u32) -> Result<BigDecimal> {
        self.query_decimal(&format!("VOLT:LIM? (@{channel})")).await
    }

    async fn query_decimal(&mut self, command: &str) -> Result<BigDecimal> {
        let resp = self.inner.query(command).await?;
        parse_decimal(&resp)
    }
}

fn parse_decimal(input: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(input.trim()).map_err(|source| Error::NumericFormat {
        response: input.to_string(),
        source,
    })
}
