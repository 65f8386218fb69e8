//! Wire vocabulary of the KA-series ASCII protocol.
//!
//! Commands are bare ASCII with no terminator; replies are framed purely by
//! byte count and the read timeout. Set-commands carry a fixed-precision
//! decimal payload: voltages are two decimals zero-padded to five characters
//! (`05.00`), currents are three decimals (`1.500`). The supply echoes the
//! same shapes back, which is what makes format-then-compare verification
//! possible.

use core::fmt::Write as _;

use strum_macros::EnumIter;

/// Longest reply the supply produces (the `*IDN?` identity string).
pub const MAX_REPLY: usize = 16;

/// Read-side commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Query {
    /// `*IDN?` - identity string, e.g. `KORADKA6003PV2.0`.
    Identity,
    /// `STATUS?` - panel status byte. See [`Status`](crate::types::Status).
    Status,
    /// `VSET1?` - programmed target voltage.
    TargetVoltage,
    /// `ISET1?` - programmed current limit.
    TargetCurrent,
    /// `VOUT1?` - measured output voltage.
    OutputVoltage,
    /// `IOUT1?` - measured output current.
    OutputCurrent,
}

impl Query {
    /// Bytes to put on the wire.
    pub const fn wire(self) -> &'static [u8] {
        match self {
            Query::Identity => b"*IDN?",
            Query::Status => b"STATUS?",
            Query::TargetVoltage => b"VSET1?",
            Query::TargetCurrent => b"ISET1?",
            Query::OutputVoltage => b"VOUT1?",
            Query::OutputCurrent => b"IOUT1?",
        }
    }

    /// Most bytes the supply answers with. A read stops here or at the
    /// timeout, whichever comes first.
    pub const fn reply_limit(self) -> usize {
        match self {
            Query::Identity => MAX_REPLY,
            _ => 5,
        }
    }
}

/// Value-carrying set-commands, each paired with the query that echoes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Voltage,
    Current,
}

impl Setting {
    pub const fn prefix(self) -> &'static [u8] {
        match self {
            Setting::Voltage => b"VSET1:",
            Setting::Current => b"ISET1:",
        }
    }

    /// The query whose reply reads this setting back.
    pub const fn readback(self) -> Query {
        match self {
            Setting::Voltage => Query::TargetVoltage,
            Setting::Current => Query::TargetCurrent,
        }
    }

    /// Render a value exactly the way the supply renders it.
    pub fn format(self, value: f64) -> heapless::String<8> {
        let mut text = heapless::String::new();
        // Capacity 8 holds any clamped setpoint and any parsed 5-byte reply.
        match self {
            Setting::Voltage => write!(text, "{value:05.2}"),
            Setting::Current => write!(text, "{value:.3}"),
        }
        .ok();
        text
    }
}

/// Fire-and-forget boolean switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// `OUT<0|1>` - output relay.
    Output,
    /// `OVP<0|1>` - over-voltage protection.
    OverVoltageProtection,
    /// `OCP<0|1>` - over-current protection.
    OverCurrentProtection,
}

impl Switch {
    pub const fn prefix(self) -> &'static [u8] {
        match self {
            Switch::Output => b"OUT",
            Switch::OverVoltageProtection => b"OVP",
            Switch::OverCurrentProtection => b"OCP",
        }
    }
}

/// Assemble `<prefix><payload>` into a single wire frame.
pub fn frame(prefix: &[u8], payload: &[u8]) -> heapless::Vec<u8, 16> {
    let mut out = heapless::Vec::new();
    // Longest frame is "ISET1:" + an 8-character payload.
    out.extend_from_slice(prefix).ok();
    out.extend_from_slice(payload).ok();
    out
}

/// Decode a reply as a decimal number.
///
/// The supply occasionally NUL-pads or garbles a reply; anything that does
/// not survive a strict parse comes back as `None` so the caller can
/// re-issue the query.
pub fn parse_reply(bytes: &[u8]) -> Option<f64> {
    let text = core::str::from_utf8(bytes).ok()?;
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}
