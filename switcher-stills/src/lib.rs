// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! # switcher-stills
//!
//! Safe, blocking access to the still-image media pool of a video production
//! switcher, on top of the vendor's asynchronous, callback-driven driver.
//!
//! ## Overview
//!
//! The vendor driver is reached through the traits in [`driver`], provided at
//! runtime by a [`DriverProvider`]. On top of that seam this crate offers:
//!
//! - **Sessions**: [`DeviceSession`] owns the switcher, media pool and stills
//!   directory handles, acquired all-or-nothing.
//! - **Metadata**: product name, [`VideoMode`] and frame [`Dimensions`].
//! - **Stills**: slot enumeration with names, hashes and media player bindings.
//! - **Uploads**: lock the media pool, transfer a frame, wait for the device to
//!   confirm, and release everything on every exit path.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ DriverProvider │  (loaded once per process)
//! └───────┬────────┘
//!         │ connect
//!         ▼
//! ┌───────────────┐
//! │ DeviceSession │──► product_name / video_mode / video_dimensions
//! └───────┬───────┘──► enumerate_stills
//!         │
//!         └─► upload_still ──► LockAcquisitionSink ◄── driver thread
//!                          └─► TransferCompletionSink ◄── driver thread
//! ```
//!
//! ## Examples
//!
//! ```no_run
//! use switcher_stills::DeviceSession;
//!
//! # fn main() -> Result<(), switcher_stills::Error> {
//! let session = DeviceSession::connect_with_provider("192.168.10.240")?;
//! let size = session.video_dimensions()?;
//!
//! let pixels = vec![0xFFu8; size.pixel_count() * 4];
//! session.upload_still(0, "white", &pixels, size.width, size.height)?;
//!
//! for still in session.stills()? {
//!     println!("{}", still.to_csv());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - [`DeviceSession`] is `Send + Sync`; uploads on one session are serialized.
//! - Upload waits block the calling thread; driver callbacks arrive on driver
//!   threads and only touch the sinks.

mod error;
mod metadata;
mod session;
mod stills;
mod upload;

pub mod config;
pub mod driver;
pub mod provider;

pub use config::UploadTimeouts;
pub use error::{Error, Result, STATUS_INTERNAL_ERROR, STATUS_TIMEOUT, WaitPhase};
pub use metadata::{Dimensions, VideoMode, fourcc};
pub use provider::DriverProvider;
pub use session::DeviceSession;
pub use stills::{StillEnumeration, StillSlotInfo};
pub use upload::{
    DEFAULT_STILL_NAME, StillUpload,
    sink::{LockAcquisitionSink, TransferCompletionSink},
};
