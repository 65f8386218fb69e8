//! Fixed-cadence measurement polling.
//!
//! One line per sample on the supplied writer:
//! `<unix epoch milliseconds>;<voltage>;<current>`, with the voltage and
//! current rendered in the same fixed-decimal shapes the wire protocol uses,
//! so a logged `05.00` is byte-identical to what the supply reported.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::{
    cancel::CancelToken, command::Setting, error::Error, psu::KaPsu, transport::Link,
};

/// One decoded measurement pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub volts: f64,
    pub amps: f64,
}

impl Sample {
    /// Render the output line for this sample.
    pub fn line(&self) -> String {
        format!(
            "{};{};{}",
            self.timestamp_ms,
            Setting::Voltage.format(self.volts),
            Setting::Current.format(self.amps)
        )
    }
}

/// Take one voltage/current measurement pair.
pub fn sample<S: Link>(psu: &mut KaPsu<S>) -> Result<Sample, Error<S::Error>> {
    let volts = psu.read_output_voltage()?;
    let amps = psu.read_output_current()?;
    Ok(Sample {
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        volts,
        amps,
    })
}

/// Poll until the token fires, spacing samples `interval` apart.
///
/// Each iteration subtracts its own round-trip time from the interval and
/// sleeps only the remainder, clamped at zero when the round-trip alone
/// already overran the interval. Cancellation mid-sample is a clean stop,
/// not an error.
pub fn run<S: Link>(
    psu: &mut KaPsu<S>,
    interval: Duration,
    cancel: &CancelToken,
    out: &mut impl Write,
) -> Result<(), Error<S::Error>> {
    while !cancel.is_cancelled() {
        let started = Instant::now();
        let measured = match sample(psu) {
            Ok(measured) => measured,
            Err(Error::Cancelled) => break,
            Err(e) => return Err(e),
        };
        if writeln!(out, "{}", measured.line()).is_err() {
            // The sink is gone; nobody is listening any more.
            debug!("sample sink closed, stopping poll loop");
            break;
        }
        std::thread::sleep(interval.saturating_sub(started.elapsed()));
    }
    Ok(())
}
