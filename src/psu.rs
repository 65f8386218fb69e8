//! The protocol driver: command encoding, retry discipline, verification.

use std::time::Duration;

use embedded_io::Error as _;
use tracing::{debug, info};

use crate::{
    cancel::CancelToken,
    command::{self, MAX_REPLY, Query, Setting, Switch},
    error::{Error, Result},
    transport::Link,
    types::{State, Status},
};

/// Pause between writing a setting and trusting any readback; the supply
/// needs this long to latch a new value internally.
pub const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Operator-configured ceilings, independent of and normally tighter than
/// the hardware's own limits. No set-command ever exceeds them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Highest voltage the driver will program, in volts.
    pub vmax: f64,
    /// Highest current the driver will program, in amps.
    pub imax: f64,
}

impl Limits {
    fn ceiling(&self, setting: Setting) -> f64 {
        match setting {
            Setting::Voltage => self.vmax,
            Setting::Current => self.imax,
        }
    }
}

impl Default for Limits {
    /// The ceilings of the original KA6003P bench setup.
    fn default() -> Self {
        Limits {
            vmax: 5.0,
            imax: 3.0,
        }
    }
}

/// Values above the ceiling are pulled down to it; everything below passes
/// through untouched, matching the supply's own one-sided range handling.
fn clamp(value: f64, ceiling: f64) -> f64 {
    if value > ceiling { ceiling } else { value }
}

/// Driver for one KA-series supply over any [`Link`].
///
/// For its methods we use the nomenclature that "set" writes a configuration
/// value, "get" reads a configured value back, and "read" reads a live
/// measurement.
///
/// The driver owns its link, so at most one command is ever in flight on the
/// wire: the protocol has no request/response correlation and cannot survive
/// interleaved writers.
pub struct KaPsu<S: Link> {
    link: S,
    limits: Limits,
    settle: Duration,
    cancel: CancelToken,
}

impl<S: Link> KaPsu<S> {
    /// Create a driver over `link` with the given ceilings. The token is
    /// checked on every retry iteration and is the only way out of a loop
    /// against a device that never converges.
    pub fn new(link: S, limits: Limits, cancel: CancelToken) -> Self {
        KaPsu {
            link,
            limits,
            settle: SETTLE_DELAY,
            cancel,
        }
    }

    /// Override the settle delay. Tests use this to keep scripted retry
    /// sequences fast.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Identity string, e.g. `KORADKA6003PV2.0`.
    pub fn identify(&mut self) -> Result<heapless::String<MAX_REPLY>, S::Error> {
        loop {
            self.check_cancelled()?;
            let mut buf = [0u8; MAX_REPLY];
            let n = self.transact(Query::Identity, &mut buf)?;
            let Ok(text) = core::str::from_utf8(&buf[..n]) else {
                debug!("undecodable identity reply, retrying");
                continue;
            };
            let text = text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
            if text.is_empty() {
                debug!("empty identity reply, retrying");
                continue;
            }
            let mut id = heapless::String::new();
            // Fits: the reply was at most MAX_REPLY bytes to begin with.
            id.push_str(text).ok();
            return Ok(id);
        }
    }

    /// Decoded panel status.
    pub fn get_status(&mut self) -> Result<Status, S::Error> {
        loop {
            self.check_cancelled()?;
            let mut buf = [0u8; MAX_REPLY];
            let n = self.transact(Query::Status, &mut buf)?;
            if n == 0 {
                debug!("empty status reply, retrying");
                continue;
            }
            return Ok(Status::from_wire(buf[0]));
        }
    }

    /// Programmed target voltage in volts.
    pub fn get_target_voltage(&mut self) -> Result<f64, S::Error> {
        self.get_float(Query::TargetVoltage)
    }

    /// Programmed current limit in amps.
    pub fn get_target_current(&mut self) -> Result<f64, S::Error> {
        self.get_float(Query::TargetCurrent)
    }

    /// Measured output voltage in volts.
    pub fn read_output_voltage(&mut self) -> Result<f64, S::Error> {
        self.get_float(Query::OutputVoltage)
    }

    /// Measured output current in amps.
    pub fn read_output_current(&mut self) -> Result<f64, S::Error> {
        self.get_float(Query::OutputCurrent)
    }

    /// Program the target voltage, clamped to [`Limits::vmax`], and wait
    /// until the supply echoes it back verbatim.
    pub fn set_voltage(&mut self, volts: f64) -> Result<(), S::Error> {
        self.set_and_check(Setting::Voltage, volts)
    }

    /// Program the current limit, clamped to [`Limits::imax`], and wait
    /// until the supply echoes it back verbatim.
    pub fn set_current(&mut self, amps: f64) -> Result<(), S::Error> {
        self.set_and_check(Setting::Current, amps)
    }

    /// Switch the output relay.
    pub fn set_output(&mut self, state: impl Into<State>) -> Result<(), S::Error> {
        self.set_switch(Switch::Output, state.into())
    }

    /// Enable or disable over-voltage protection.
    pub fn set_ovp(&mut self, state: impl Into<State>) -> Result<(), S::Error> {
        self.set_switch(Switch::OverVoltageProtection, state.into())
    }

    /// Enable or disable over-current protection.
    pub fn set_ocp(&mut self, state: impl Into<State>) -> Result<(), S::Error> {
        self.set_switch(Switch::OverCurrentProtection, state.into())
    }

    /// Write a query, collect its reply, and leave the line clean.
    fn transact(&mut self, query: Query, buf: &mut [u8]) -> Result<usize, S::Error> {
        self.link.write_all(query.wire()).map_err(Error::Serial)?;
        self.link.flush().map_err(Error::Serial)?;
        let n = self.read_upto(query.reply_limit(), buf)?;
        self.link.discard_input().map_err(Error::Serial)?;
        Ok(n)
    }

    /// Accumulate up to `limit` bytes. A timeout ends the read and is not a
    /// failure: short and empty replies are how this instrument misbehaves.
    fn read_upto(&mut self, limit: usize, buf: &mut [u8]) -> Result<usize, S::Error> {
        let mut filled = 0;
        while filled < limit {
            match self.link.read(&mut buf[filled..limit]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e)
                    if matches!(
                        e.kind(),
                        embedded_io::ErrorKind::TimedOut | embedded_io::ErrorKind::Other
                    ) =>
                {
                    break;
                }
                Err(e) => return Err(Error::Serial(e)),
            }
        }
        Ok(filled)
    }

    /// Query a decimal value, retrying until the reply parses.
    ///
    /// An empty reply decodes to `0`: the supply occasionally answers with
    /// nothing at all, and that is expected rather than exceptional.
    fn get_float(&mut self, query: Query) -> Result<f64, S::Error> {
        loop {
            self.check_cancelled()?;
            let mut buf = [0u8; MAX_REPLY];
            let n = self.transact(query, &mut buf)?;
            if n == 0 {
                return Ok(0.0);
            }
            match command::parse_reply(&buf[..n]) {
                Some(value) => return Ok(value),
                None => debug!(command = ?query, "malformed reply, retrying"),
            }
        }
    }

    /// Write a setting and re-issue it until the readback matches.
    ///
    /// The comparison is between the formatted strings, not the numbers, so
    /// the supply's own rounding cannot fake a match.
    fn set_and_check(&mut self, setting: Setting, value: f64) -> Result<(), S::Error> {
        let clamped = clamp(value, self.limits.ceiling(setting));
        let wanted = setting.format(clamped);
        let frame = command::frame(setting.prefix(), wanted.as_bytes());
        loop {
            self.check_cancelled()?;
            self.link.write_all(&frame).map_err(Error::Serial)?;
            self.link.flush().map_err(Error::Serial)?;
            self.link.discard_input().map_err(Error::Serial)?;
            std::thread::sleep(self.settle);
            let readback = self.get_float(setting.readback())?;
            if setting.format(readback) == wanted {
                info!(?setting, value = wanted.as_str(), "setting applied");
                return Ok(());
            }
            debug!(
                ?setting,
                wanted = wanted.as_str(),
                readback,
                "supply has not latched the value yet, rewriting"
            );
        }
    }

    /// Fire-and-forget switch write. The protocol offers no per-switch
    /// readback, so there is nothing to verify here.
    fn set_switch(&mut self, switch: Switch, state: State) -> Result<(), S::Error> {
        let frame = command::frame(switch.prefix(), &[state.wire_digit()]);
        self.link.write_all(&frame).map_err(Error::Serial)?;
        self.link.flush().map_err(Error::Serial)?;
        std::thread::sleep(self.settle);
        self.link.discard_input().map_err(Error::Serial)?;
        info!(?switch, ?state, "switch written");
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), S::Error> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
