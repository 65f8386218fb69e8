//! This crate provides an interface for communicating with and controlling
//! Korad KA-series programmable bench power supplies over their serial
//! protocol.
//!
//! Developed against the KA6003P; the same ASCII vocabulary is spoken by the
//! other single-channel KA supplies:
//! * KA3003P
//! * KA3005P
//! * KA6002P
//! * KA6003P
//!
//! The protocol is bare ASCII request/response with no message terminators:
//! replies are framed only by byte count and the read timeout, and a busy
//! supply will happily answer with nothing at all. The driver in [`psu`]
//! carries the retry discipline that makes such a link usable; [`transport`]
//! owns the port itself.
//!
//! The serial side of the supply is fixed at:
//! * Baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

pub mod cancel;
pub mod command;
pub mod error;
pub mod poll;
pub mod psu;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_serial;
