// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Session management: connecting to a switcher and tearing the connection down.
//!
//! A [`DeviceSession`] owns the three driver handles every other operation
//! needs. It is created all-or-nothing by [`DeviceSession::connect`] and
//! releases its handles in reverse acquisition order.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, info};

use crate::{
    Error, Result,
    driver::{MediaPool, Stills, Switcher, SwitcherDiscovery},
    provider,
};

/// A live connection to one switcher.
///
/// Holds the switcher, media pool and stills directory handles. Either all
/// three are present or no `DeviceSession` exists.
///
/// # Thread Safety
///
/// `DeviceSession` is `Send + Sync`. Metadata reads may run concurrently.
/// Uploads are serialized per session, because the device grants the media
/// pool lock to one holder at a time.
///
/// # Examples
///
/// ```no_run
/// use switcher_stills::DeviceSession;
///
/// # fn main() -> Result<(), switcher_stills::Error> {
/// let session = DeviceSession::connect_with_provider("192.168.10.240")?;
/// println!("{}", session.product_name()?);
/// session.disconnect();
/// # Ok(())
/// # }
/// ```
pub struct DeviceSession {
    address: String,
    // Release order is stills, media pool, switcher.
    stills: Option<Arc<dyn Stills>>,
    media_pool: Option<Arc<dyn MediaPool>>,
    switcher: Option<Box<dyn Switcher>>,
    upload_lock: Mutex<()>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.address)
            .field("live", &self.is_live())
            .finish()
    }
}

impl DeviceSession {
    /// Connects to the switcher at `address` through `discovery`.
    ///
    /// After the connection is accepted the media pool and the stills
    /// directory are acquired in turn. If either step fails, the handles
    /// obtained so far are released (most recent first) before the error is
    /// returned, so a partially built session is never observable.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionFailure`] if the device refused the connection
    /// - [`Error::DriverCallFailure`] if a sub-handle could not be acquired
    pub fn connect(discovery: &dyn SwitcherDiscovery, address: &str) -> Result<Self> {
        debug!("Connecting to switcher at {address}");
        let switcher = discovery
            .connect_to(address)
            .map_err(|refusal| Error::ConnectionFailure {
                reason: refusal.reason,
                code: refusal.code,
            })?;

        // Early returns drop the locals in reverse order of acquisition.
        let media_pool = switcher.media_pool().map_err(Error::driver("media pool"))?;
        let stills = media_pool.stills().map_err(Error::driver("stills"))?;

        info!("Connected to switcher at {address}");
        Ok(DeviceSession {
            address: address.to_owned(),
            stills: Some(stills),
            media_pool: Some(media_pool),
            switcher: Some(switcher),
            upload_lock: Mutex::new(()),
        })
    }

    /// Connects through the process-wide driver provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DriverUnavailable`] if the driver module cannot be
    /// loaded, otherwise the same errors as [`Self::connect`].
    pub fn connect_with_provider(address: &str) -> Result<Self> {
        let provider = provider::global()?;
        Self::connect(provider.discovery().as_ref(), address)
    }

    /// The address this session was opened with.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Closes the session, releasing the driver handles in reverse order.
    ///
    /// Dropping the session does the same; this method makes the point of
    /// release explicit.
    pub fn disconnect(mut self) {
        self.release();
    }

    fn is_live(&self) -> bool {
        self.switcher.is_some() && self.media_pool.is_some() && self.stills.is_some()
    }

    fn release(&mut self) {
        if self.stills.is_none() && self.media_pool.is_none() && self.switcher.is_none() {
            return;
        }
        drop(self.stills.take());
        drop(self.media_pool.take());
        drop(self.switcher.take());
        info!("Disconnected from switcher at {}", self.address);
    }

    pub(crate) fn switcher(&self) -> Result<&dyn Switcher> {
        self.switcher.as_deref().ok_or_else(invalid_session)
    }

    pub(crate) fn stills_directory(&self) -> Result<&Arc<dyn Stills>> {
        self.stills.as_ref().ok_or_else(invalid_session)
    }

    pub(crate) fn media_pool(&self) -> Result<&Arc<dyn MediaPool>> {
        self.media_pool.as_ref().ok_or_else(invalid_session)
    }

    /// Serializes uploads on this session. Held for the whole lock/transfer protocol.
    pub(crate) fn upload_guard(&self) -> MutexGuard<'_, ()> {
        self.upload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn invalid_session() -> Error {
    Error::InternalError("invalid switcher connection".to_string())
}

impl Drop for DeviceSession {
    /// Releases the driver handles if [`DeviceSession::disconnect`] was not called.
    fn drop(&mut self) {
        self.release();
    }
}
