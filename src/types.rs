//! Decoded forms of the supply's on/off flags and `STATUS?` byte.

use modular_bitfield::prelude::*;

/// Used to be less ambiguous about whether something is on or off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Disabled.
    #[default]
    Off,
    /// Enabled.
    On,
}

impl State {
    /// ASCII digit the protocol uses for this state.
    pub const fn wire_digit(self) -> u8 {
        match self {
            State::Off => b'0',
            State::On => b'1',
        }
    }
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

/// Represents the two possible regulation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Constant current regulation.
    Cc,
    /// Constant voltage regulation.
    Cv,
}

/// Raw `STATUS?` bit layout.
///
/// The remaining bits are model-dependent and not decoded.
#[bitfield]
struct StatusWire {
    /// Bit 0 - `1` for CV, `0` for CC.
    cv_cc: B1,
    #[skip]
    __: B4,
    /// Bit 5 - OVP and/or OCP enabled.
    protection: bool,
    /// Bit 6 - output enabled.
    output: bool,
    #[skip]
    __: B1,
}

/// Decoded `STATUS?` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Active regulation mode.
    pub mode: ControlMode,
    /// OVP and/or OCP enabled.
    pub protection_enabled: bool,
    /// Output relay enabled.
    pub output_enabled: bool,
}

impl Status {
    /// Decode the first byte of a `STATUS?` reply.
    pub fn from_wire(byte: u8) -> Self {
        let wire = StatusWire::from_bytes([byte]);
        Status {
            mode: if wire.cv_cc() == 1 {
                ControlMode::Cv
            } else {
                ControlMode::Cc
            },
            protection_enabled: wire.protection(),
            output_enabled: wire.output(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_bool() {
        assert_eq!(State::from(true), State::On);
        assert_eq!(State::from(false), State::Off);
        assert!(bool::from(State::On));
        assert!(!bool::from(State::Off));
        assert_eq!(State::On.wire_digit(), b'1');
        assert_eq!(State::Off.wire_digit(), b'0');
    }

    #[test]
    fn status_decodes_each_bit() {
        // CV, output on, protections off.
        let status = Status::from_wire(0x41);
        assert_eq!(status.mode, ControlMode::Cv);
        assert!(status.output_enabled);
        assert!(!status.protection_enabled);

        // CC, output off, protections on.
        let status = Status::from_wire(0x20);
        assert_eq!(status.mode, ControlMode::Cc);
        assert!(!status.output_enabled);
        assert!(status.protection_enabled);

        let status = Status::from_wire(0x00);
        assert_eq!(status.mode, ControlMode::Cc);
        assert!(!status.output_enabled);
        assert!(!status.protection_enabled);
    }
}
