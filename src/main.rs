use std::time::Duration;

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use clap::{Args, Parser, Subcommand, ValueEnum};
use n6700_control::{Connection, DEFAULT_PORT, N6700, tcp};
use tokio::time::timeout;
use tracing::{Level, info};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "n6700", about = "Control a Keysight N6700 power system over SCPI/TCP")]
struct Cli {
    /// Instrument host name or IP address
    #[arg(long, default_value = "192.168.0.100")]
    host: String,

    /// Raw SCPI socket port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log every SCPI exchange
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ChannelArg {
    /// Output channel (1-4)
    #[arg(short, long, default_value_t = 1)]
    channel: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Quantity {
    DcCurrent,
    DcVoltage,
    RmsCurrent,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PriorityMode {
    /// Constant current
    Cc,
    /// Constant voltage
    Cv,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the identification string
    Idn,
    /// Measure an output quantity
    Measure {
        #[arg(value_enum)]
        quantity: Quantity,
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Query the output state
    State {
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Turn the output on
    Enable {
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Turn the output off
    Disable {
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Select constant-current or constant-voltage priority
    Mode {
        #[arg(value_enum)]
        mode: PriorityMode,
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Query the current range, or set it with --set
    CurrentRange {
        #[arg(long)]
        set: Option<BigDecimal>,
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Set the current in amps
    Current {
        amps: BigDecimal,
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Set the power limit in watts
    PowerLimit {
        watts: BigDecimal,
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Set the voltage in volts
    Voltage {
        volts: BigDecimal,
        #[command(flatten)]
        channel: ChannelArg,
    },
    /// Query the voltage limit, or set it with --set
    VoltageLimit {
        #[arg(long)]
        set: Option<BigDecimal>,
        #[command(flatten)]
        channel: ChannelArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    info!("using N6700 at {}:{}", cli.host, cli.port);
    let mut inst = tcp(&cli.host, cli.port);

    let is_query = cli.command.is_query();
    let output = timeout(COMMAND_TIMEOUT, run(&mut inst, cli.command))
        .await
        .with_context(|| {
            if is_query {
                format!(
                    "no reply from {}:{} within {:?}; check instrument power and network",
                    cli.host, cli.port, COMMAND_TIMEOUT
                )
            } else {
                format!(
                    "command sent to {}:{} but no acknowledgement arrived within {:?}; \
                     the N6700 does not answer non-query commands",
                    cli.host, cli.port, COMMAND_TIMEOUT
                )
            }
        })??;

    println!("{output}");
    Ok(())
}

impl Command {
    /// Whether the instrument answers this command with a reply line.
    fn is_query(&self) -> bool {
        match self {
            Command::Idn | Command::Measure { .. } | Command::State { .. } => true,
            Command::CurrentRange { set, .. } | Command::VoltageLimit { set, .. } => {
                set.is_none()
            }
            Command::Enable { .. }
            | Command::Disable { .. }
            | Command::Mode { .. }
            | Command::Current { .. }
            | Command::PowerLimit { .. }
            | Command::Voltage { .. } => false,
        }
    }
}

async fn run<C: Connection>(inst: &mut N6700<C>, command: Command) -> Result<String> {
    let value = match command {
        Command::Idn => return Ok(inst.identify().await?),
        Command::Measure { quantity, channel } => match quantity {
            Quantity::DcCurrent => inst.measure_dc_current(channel.channel).await?,
            Quantity::DcVoltage => inst.measure_dc_voltage(channel.channel).await?,
            Quantity::RmsCurrent => inst.measure_rms_current(channel.channel).await?,
        },
        Command::State { channel } => inst.get_channel_state(channel.channel).await?,
        Command::Enable { channel } => inst.enable_channel(channel.channel).await?,
        Command::Disable { channel } => inst.disable_channel(channel.channel).await?,
        Command::Mode { mode, channel } => match mode {
            PriorityMode::Cc => inst.set_constant_current(channel.channel).await?,
            PriorityMode::Cv => inst.set_constant_voltage(channel.channel).await?,
        },
        Command::CurrentRange { set, channel } => match set {
            Some(max) => inst.set_current_range(max, channel.channel).await?,
            None => inst.get_current_range(channel.channel).await?,
        },
        Command::Current { amps, channel } => inst.set_current(amps, channel.channel).await?,
        Command::PowerLimit { watts, channel } => {
            inst.set_power_limit(watts, channel.channel).await?
        }
        Command::Voltage { volts, channel } => inst.set_voltage(volts, channel.channel).await?,
        Command::VoltageLimit { set, channel } => match set {
            Some(max) => inst.set_voltage_limit(max, channel.channel).await?,
            None => inst.get_voltage_limit(channel.channel).await?,
        },
    };
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_setter_with_channel() {
        let cli = Cli::parse_from(["n6700", "--port", "5024", "voltage", "5.125", "-c", "3"]);
        assert_eq!(cli.port, 5024);
        match cli.command {
            Command::Voltage { volts, channel } => {
                assert_eq!(volts.to_string(), "5.125");
                assert_eq!(channel.channel, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn only_queries_expect_a_reply() {
        let parse = |args: &[&str]| Cli::parse_from(args.iter().copied()).command;

        assert!(parse(&["n6700", "idn"]).is_query());
        assert!(parse(&["n6700", "measure", "dc-voltage", "-c", "2"]).is_query());
        assert!(parse(&["n6700", "state"]).is_query());
        assert!(parse(&["n6700", "voltage-limit"]).is_query());
        assert!(parse(&["n6700", "current-range", "-c", "4"]).is_query());

        assert!(!parse(&["n6700", "enable", "-c", "2"]).is_query());
        assert!(!parse(&["n6700", "disable"]).is_query());
        assert!(!parse(&["n6700", "mode", "cv"]).is_query());
        assert!(!parse(&["n6700", "current", "0.5"]).is_query());
        assert!(!parse(&["n6700", "power-limit", "20"]).is_query());
        assert!(!parse(&["n6700", "voltage", "5"]).is_query());
        assert!(!parse(&["n6700", "voltage-limit", "--set", "6"]).is_query());
        assert!(!parse(&["n6700", "current-range", "--set", "1"]).is_query());
    }
}
