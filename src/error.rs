//! Error types for the KA-series driver.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Failures a driver operation surfaces to its caller.
///
/// Malformed or absent replies never appear here: the driver absorbs them by
/// re-issuing the command until the value decodes, the link dies, or the
/// caller's [`CancelToken`](crate::cancel::CancelToken) fires.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    /// The serial link failed mid-operation.
    #[error("Serial communication error")]
    Serial(I),
    /// The cancel token fired while a retry loop was still converging.
    #[error("Operation cancelled")]
    Cancelled,
}
