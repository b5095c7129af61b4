// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Driver module loading.
//!
//! The vendor driver is reached through an adapter module that exports a
//! single entry point, [`DRIVER_ENTRY_SYMBOL`]. The module is loaded at most
//! once per process by [`global`]; the outcome (including a failure) is kept
//! for the lifetime of the process.
//!
//! A loaded module is never unloaded. Every discovery object, session, frame
//! and media pool handle runs code from the module, and any of them may
//! outlive the [`DriverProvider`] that produced it.

use std::{
    ffi::OsStr,
    fmt,
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use tracing::{info, warn};

use crate::{Error, Result, config::driver_library_path, driver::SwitcherDiscovery};

/// Name of the function a driver adapter module must export.
pub const DRIVER_ENTRY_SYMBOL: &[u8] = b"switcher_stills_driver_entry";

/// Signature of [`DRIVER_ENTRY_SYMBOL`].
///
/// The adapter is a Rust `cdylib`/`dylib` built against the same version of
/// this crate and the same toolchain:
///
/// ```ignore
/// #[unsafe(no_mangle)]
/// pub fn switcher_stills_driver_entry() -> Box<dyn SwitcherDiscovery> {
///     Box::new(VendorDiscovery::new())
/// }
/// ```
pub type DriverEntry = fn() -> Box<dyn SwitcherDiscovery>;

static GLOBAL_PROVIDER: OnceLock<core::result::Result<DriverProvider, String>> = OnceLock::new();

/// Access point to the switcher driver.
///
/// Dropping a provider never unmaps driver code: handles obtained through it
/// stay usable afterwards.
pub struct DriverProvider {
    discovery: Arc<dyn SwitcherDiscovery>,
    module_path: Option<PathBuf>,
}

impl fmt::Debug for DriverProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverProvider")
            .field("module_path", &self.module_path)
            .finish()
    }
}

impl DriverProvider {
    /// Loads a driver adapter module and calls its entry point.
    ///
    /// The module stays mapped until the process exits, even after the
    /// provider is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LibLoading`] if the module cannot be opened or does not
    /// export [`DRIVER_ENTRY_SYMBOL`].
    pub fn load(path: impl AsRef<OsStr>) -> Result<Self> {
        let path = path.as_ref();
        // Safety: loading runs the module's initializers; the adapter module is
        // trusted to be a switcher driver built for this crate.
        let library = unsafe { libloading::Library::new(path)? };
        let discovery = unsafe {
            let entry = library.get::<DriverEntry>(DRIVER_ENTRY_SYMBOL)?;
            entry()
        };
        // Objects created by the entry point carry vtables into the module and
        // may be held anywhere, so the module is never unloaded.
        std::mem::forget(library);
        info!("Loaded switcher driver from {}", path.to_string_lossy());
        Ok(DriverProvider {
            discovery: Arc::from(discovery),
            module_path: Some(PathBuf::from(path)),
        })
    }

    /// Wraps an already constructed discovery object (in-process drivers, tests).
    pub fn from_discovery(discovery: Arc<dyn SwitcherDiscovery>) -> Self {
        DriverProvider {
            discovery,
            module_path: None,
        }
    }

    /// Path of the loaded module, `None` for an in-process driver.
    pub fn module_path(&self) -> Option<&std::path::Path> {
        self.module_path.as_deref()
    }

    /// The driver's discovery object.
    pub fn discovery(&self) -> &Arc<dyn SwitcherDiscovery> {
        &self.discovery
    }
}

/// Returns the process-wide provider, loading it on first use.
///
/// The module path comes from [`driver_library_path`]. Concurrent first
/// calls block until one of them has finished loading.
///
/// # Errors
///
/// Returns [`Error::DriverUnavailable`] if loading failed, now or on an
/// earlier call.
pub fn global() -> Result<&'static DriverProvider> {
    GLOBAL_PROVIDER
        .get_or_init(|| {
            let path = driver_library_path();
            DriverProvider::load(&path).map_err(|error| {
                warn!("Failed to load switcher driver: {error}");
                format!(
                    "unable to load switcher driver \"{}\": {error}",
                    path.display()
                )
            })
        })
        .as_ref()
        .map_err(|message| Error::DriverUnavailable(message.clone()))
}

/// Installs `provider` as the process-wide provider.
///
/// Must happen before the first call to [`global`].
///
/// # Errors
///
/// Returns [`Error::InternalError`] if the provider was already initialized.
pub fn install(provider: DriverProvider) -> Result<()> {
    GLOBAL_PROVIDER
        .set(Ok(provider))
        .map_err(|_| Error::InternalError("driver provider already initialized".to_string()))
}
