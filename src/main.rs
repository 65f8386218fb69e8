//! Command-line front end: program the supply, then stream measurements.

use std::io;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use korad_ka_psu::{
    cancel::CancelToken,
    poll,
    psu::{KaPsu, Limits},
    transport::SerialLink,
};

#[cfg(windows)]
const DEFAULT_DEVICE: &str = "COM3";
#[cfg(not(windows))]
const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

const USAGE: &str = "\
korad-psu - Korad KA6003P power supply control

USAGE:
    korad-psu [OPTIONS]

OPTIONS:
    --device <path>      Serial device (default /dev/ttyACM0, COM3 on Windows)
    --volt <v>           Target voltage in volts (default 5.0)
    --current <a>        Current limit in amps (default 2.0)
    --vmax <v>           Voltage ceiling in volts (default 5.0)
    --imax <a>           Current ceiling in amps (default 3.0)
    --out-on|--out-off   Output relay (default on)
    --ovp-on|--ovp-off   Over-voltage protection (default off)
    --ocp-on|--ocp-off   Over-current protection (default off)
    --interval-ms <ms>   Poll interval in milliseconds (default 100)
    --help               Show this help
";

#[derive(Debug, Clone, PartialEq)]
struct Config {
    device: String,
    volt: f64,
    current: f64,
    vmax: f64,
    imax: f64,
    output: bool,
    ovp: bool,
    ocp: bool,
    interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DEFAULT_DEVICE.to_string(),
            volt: 5.0,
            current: 2.0,
            vmax: 5.0,
            imax: 3.0,
            output: true,
            ovp: false,
            ocp: false,
            interval: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Parse flags into a config record. `None` means help was requested.
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Config>> {
        let mut config = Config::default();
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--help" | "-h" => return Ok(None),
                "--device" => config.device = value(&mut args, &flag)?,
                "--volt" => config.volt = number(&mut args, &flag)?,
                "--current" => config.current = number(&mut args, &flag)?,
                "--vmax" => config.vmax = number(&mut args, &flag)?,
                "--imax" => config.imax = number(&mut args, &flag)?,
                "--interval-ms" => {
                    let ms: u64 = value(&mut args, &flag)?
                        .parse()
                        .with_context(|| format!("{flag} expects whole milliseconds"))?;
                    config.interval = Duration::from_millis(ms);
                }
                "--out-on" => config.output = true,
                "--out-off" => config.output = false,
                "--ovp-on" => config.ovp = true,
                "--ovp-off" => config.ovp = false,
                "--ocp-on" => config.ocp = true,
                "--ocp-off" => config.ocp = false,
                other => bail!("unknown flag '{other}' (try --help)"),
            }
        }
        Ok(Some(config))
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next().with_context(|| format!("{flag} expects a value"))
}

fn number(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<f64> {
    value(args, flag)?
        .parse()
        .with_context(|| format!("{flag} expects a number"))
}

fn main() {
    // Logs go to stderr; stdout carries only the sample stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let Some(config) = Config::parse(std::env::args().skip(1))? else {
        print!("{USAGE}");
        return Ok(());
    };

    let link = SerialLink::open(&config.device)
        .with_context(|| format!("opening {}", config.device))?;

    let cancel = CancelToken::new();
    let limits = Limits {
        vmax: config.vmax,
        imax: config.imax,
    };
    let mut psu = KaPsu::new(link, limits, cancel.clone());

    let identity = psu.identify()?;
    info!(identity = identity.as_str(), "connected");

    psu.set_voltage(config.volt)?;
    psu.set_current(config.current)?;
    psu.set_ovp(config.ovp)?;
    psu.set_ocp(config.ocp)?;
    psu.set_output(config.output)?;

    let status = psu.get_status()?;
    info!(?status, "supply configured, polling");

    let stdout = io::stdout();
    poll::run(&mut psu, config.interval, &cancel, &mut stdout.lock())?;
    Ok(())
}
