// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for switcher operations.
//!
//! Driver calls report raw 32-bit status codes ([`DriverCode`]). This module
//! maps them, together with the failures this crate detects itself (bad
//! arguments, timeouts, broken invariants), onto a single [`Error`] enum.

use std::fmt;

use crate::driver::{ConnectFailureReason, DriverCode};

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Status reported for invalid arguments and internal failures.
pub const STATUS_INTERNAL_ERROR: i32 = -1;

/// Status reported when a lock or transfer wait runs out of time.
pub const STATUS_TIMEOUT: i32 = -2;

/// The asynchronous wait that exceeded its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    /// Waiting for the device to grant the media pool lock.
    Lock,
    /// Waiting for the device to report that the still transfer completed.
    Transfer,
}

impl WaitPhase {
    /// What the caller was waiting for, as used in timeout messages.
    pub fn awaited(&self) -> &'static str {
        match self {
            WaitPhase::Lock => "media pool lock",
            WaitPhase::Transfer => "upload completion",
        }
    }
}

impl fmt::Display for WaitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitPhase::Lock => f.write_str("lock"),
            WaitPhase::Transfer => f.write_str("transfer"),
        }
    }
}

/// Errors that can occur when talking to a switcher.
///
/// Timeouts are kept apart from driver call failures: a timeout usually means
/// "retry later", a failed call means the device state needs a closer look.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input was rejected before any device resource was touched.
    ///
    /// Displayed as the bare message, which is what C callers receive.
    #[error("{0}")]
    InvalidArgument(String),

    /// The device refused or failed the connection attempt.
    #[error("ConnectTo failed (code=0x{code:08X}, reason={reason})")]
    ConnectionFailure {
        /// Device-reported reason, opaque to this crate.
        reason: ConnectFailureReason,
        /// Status code returned by the connect call.
        code: DriverCode,
    },

    /// A specific driver call returned a failure status.
    #[error("{action} failed (code=0x{code:08X})")]
    DriverCallFailure {
        /// Short name of the driver operation that failed.
        action: &'static str,
        /// Status code returned by the driver.
        code: DriverCode,
    },

    /// A lock or transfer wait exceeded its bound.
    #[error("timed out waiting for {}", .phase.awaited())]
    Timeout {
        /// Which wait timed out.
        phase: WaitPhase,
    },

    /// An internal invariant did not hold (e.g. a torn-down session).
    #[error("{0}")]
    InternalError(String),

    /// The driver module could not be resolved.
    #[error("Driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Failed to open the driver module or resolve its entry point.
    #[error("Loading library: {0}")]
    LibLoading(#[from] libloading::Error),
}

impl Error {
    /// Wraps a failed driver call.
    ///
    /// Meant for `map_err`:
    ///
    /// ```ignore
    /// let count = stills.count().map_err(Error::driver("slot count"))?;
    /// ```
    pub fn driver(action: &'static str) -> impl FnOnce(DriverCode) -> Error {
        move |code| Error::DriverCallFailure { action, code }
    }

    /// Returns the status code reported across the C surface for this error.
    ///
    /// Driver failures carry the driver's own (negative) code through; when the
    /// driver reported a non-negative code the generic internal status is used
    /// so that a failure is never mistaken for success.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::Timeout { .. } => STATUS_TIMEOUT,
            Error::ConnectionFailure { code, .. } | Error::DriverCallFailure { code, .. }
                if code.0 < 0 =>
            {
                code.0
            }
            _ => STATUS_INTERNAL_ERROR,
        }
    }

    /// Returns `true` for [`Error::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
