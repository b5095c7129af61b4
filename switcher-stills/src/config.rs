// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration: driver location and upload wait bounds.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::driver::PixelFormat;

/// Environment variable overriding [`driver_library_path`].
pub const DRIVER_PATH_ENV: &str = "SWITCHER_STILLS_DRIVER";

/// How long an upload waits for the media pool lock by default.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an upload waits for the transfer to complete by default.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

/// Pixel layout used for uploaded stills.
pub const UPLOAD_PIXEL_FORMAT: PixelFormat = PixelFormat::Bgra8;

/// Bytes per pixel of [`UPLOAD_PIXEL_FORMAT`].
pub const BYTES_PER_PIXEL: usize = UPLOAD_PIXEL_FORMAT.bytes_per_pixel();

#[cfg(target_os = "macos")]
const DEFAULT_DRIVER_PATH: &str = "/Library/Application Support/Blackmagic Design/Switchers/libswitcher_stills_driver.dylib";
#[cfg(target_os = "windows")]
const DEFAULT_DRIVER_PATH: &str = "switcher_stills_driver.dll";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_DRIVER_PATH: &str = "libswitcher_stills_driver.so";

/// Returns the path of the driver adapter module.
///
/// `SWITCHER_STILLS_DRIVER` wins when set and non-empty; otherwise the
/// platform default is returned. Bare file names are resolved by the system
/// loader's search path.
///
/// # Examples
///
/// ```no_run
/// use switcher_stills::{DriverProvider, config::driver_library_path};
///
/// # fn main() -> Result<(), switcher_stills::Error> {
/// let provider = DriverProvider::load(driver_library_path())?;
/// # Ok(())
/// # }
/// ```
pub fn driver_library_path() -> PathBuf {
    match std::env::var_os(DRIVER_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_DRIVER_PATH),
    }
}

/// Bounds on the two asynchronous waits of an upload.
///
/// Deserializes from `{"lock": {"secs": 5, "nanos": 0}, ...}`; missing fields
/// take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadTimeouts {
    /// Wait for the lock grant.
    pub lock: Duration,
    /// Wait for the transfer-completed event.
    pub transfer: Duration,
}

impl Default for UploadTimeouts {
    fn default() -> Self {
        UploadTimeouts {
            lock: DEFAULT_LOCK_TIMEOUT,
            transfer: DEFAULT_TRANSFER_TIMEOUT,
        }
    }
}

impl UploadTimeouts {
    /// Sets the lock wait.
    pub fn with_lock(mut self, lock: Duration) -> Self {
        self.lock = lock;
        self
    }

    /// Sets the transfer wait.
    pub fn with_transfer(mut self, transfer: Duration) -> Self {
        self.transfer = transfer;
        self
    }
}
