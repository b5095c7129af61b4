// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! The driver seam.
//!
//! The vendor switcher driver is an asynchronous, reference-counted object
//! model. These traits describe the subset this crate needs. A driver adapter
//! implements them on top of the vendor SDK (handling string encoding on its
//! side) and is exposed to this crate through [`crate::DriverProvider`].
//!
//! Ownership follows the driver's reference counting: a `Box` or `Arc` handed
//! out by a trait method is one reference, and dropping it is the release.
//! Callback objects passed *into* the driver are `Arc`s; the driver keeps its
//! clone for as long as it may call back (until `remove_callback` / `unlock`)
//! and drops it afterwards.
//!
//! # Thread Safety
//!
//! Every handle is `Send + Sync`. Callbacks are invoked on driver-owned
//! notification threads whose count and identity are unspecified.

use std::{fmt, sync::Arc};

/// Raw 32-bit status code returned by a failed driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverCode(pub i32);

impl DriverCode {
    /// Generic failure (`E_FAIL`).
    pub const FAIL: DriverCode = DriverCode(0x8000_4005_u32 as i32);
    /// A required pointer was missing (`E_POINTER`).
    pub const POINTER: DriverCode = DriverCode(0x8000_4003_u32 as i32);
}

impl fmt::UpperHex for DriverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&(self.0 as u32), f)
    }
}

/// Result of a driver call.
pub type DriverResult<T> = core::result::Result<T, DriverCode>;

/// Device-reported reason for a refused connection.
///
/// The value is passed through untouched; only the driver knows its meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectFailureReason(pub i32);

impl fmt::Display for ConnectFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A refused connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRefusal {
    /// Status code of the connect call.
    pub code: DriverCode,
    /// Device-reported failure reason.
    pub reason: ConnectFailureReason,
}

/// Pixel layout of a device frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, stored B, G, R, A in memory.
    Bgra8,
}

impl PixelFormat {
    /// Bytes used by one pixel in this layout.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
        }
    }
}

/// What a media player is currently playing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlayerSource {
    /// A still slot, by 0-based index.
    Still(u32),
    /// A clip, by 0-based index.
    Clip(u32),
}

/// Media pool notifications delivered to a [`StillsCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPoolEvent {
    /// A slot became valid or invalid.
    ValidChanged,
    /// A slot was renamed.
    NameChanged,
    /// A slot's content hash changed.
    HashChanged,
    /// Another client holds the lock.
    LockBusy,
    /// The lock became free.
    LockIdle,
    /// The pending transfer finished.
    TransferCompleted,
    /// The pending transfer was cancelled.
    TransferCancelled,
    /// The pending transfer failed.
    TransferFailed,
}

/// 16-byte content digest of a still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StillHash(pub [u8; 16]);

impl fmt::Display for StillHash {
    /// Renders the digest as 32 uppercase hex characters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Entry point of the driver: turns an address into a connected switcher.
pub trait SwitcherDiscovery: Send + Sync {
    /// Connects to the switcher at `address` (IP address or host name).
    fn connect_to(&self, address: &str) -> core::result::Result<Box<dyn Switcher>, ConnectRefusal>;
}

/// A connected switcher.
pub trait Switcher: Send + Sync {
    /// Product name, e.g. "ATEM Mini".
    fn product_name(&self) -> DriverResult<String>;

    /// Current video mode as the device's four-character code.
    fn video_mode(&self) -> DriverResult<u32>;

    /// Media players, in device order.
    fn media_players(&self) -> DriverResult<Box<dyn Iterator<Item = Box<dyn MediaPlayer>> + '_>>;

    /// The media pool of this switcher.
    fn media_pool(&self) -> DriverResult<Arc<dyn MediaPool>>;
}

/// A media player.
pub trait MediaPlayer: Send {
    /// The source the player is bound to.
    fn source(&self) -> DriverResult<MediaPlayerSource>;
}

/// The switcher's media pool.
pub trait MediaPool: Send + Sync {
    /// Allocates a device frame.
    fn create_frame(
        &self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> DriverResult<Box<dyn Frame>>;

    /// The stills directory of this pool.
    fn stills(&self) -> DriverResult<Arc<dyn Stills>>;
}

/// A device-side pixel buffer.
pub trait Frame: Send + Sync {
    /// The frame's pixel storage.
    fn bytes(&self) -> DriverResult<&[u8]>;

    /// Writable view of the frame's pixel storage.
    fn bytes_mut(&mut self) -> DriverResult<&mut [u8]>;
}

/// The stills directory: slot metadata, locking and uploads.
pub trait Stills: Send + Sync {
    /// Number of still slots.
    fn count(&self) -> DriverResult<u32>;

    /// Name of the still at `index` (0-based).
    fn name(&self, index: u32) -> DriverResult<String>;

    /// Content hash of the still at `index` (0-based).
    fn hash(&self, index: u32) -> DriverResult<StillHash>;

    /// Starts delivering media pool events to `callback`.
    fn add_callback(&self, callback: Arc<dyn StillsCallback>) -> DriverResult<()>;

    /// Stops delivering events to `callback` and drops the driver's reference.
    ///
    /// Callbacks are identified by pointer ([`Arc::ptr_eq`]).
    fn remove_callback(&self, callback: &Arc<dyn StillsCallback>) -> DriverResult<()>;

    /// Requests the exclusive media pool lock. The grant arrives later through
    /// [`LockCallback::obtained`].
    fn lock(&self, callback: Arc<dyn LockCallback>) -> DriverResult<()>;

    /// Releases (or abandons a pending request for) the lock held via `callback`.
    fn unlock(&self, callback: &Arc<dyn LockCallback>) -> DriverResult<()>;

    /// Starts uploading `frame` into slot `index`. Completion is reported as
    /// [`MediaPoolEvent::TransferCompleted`].
    fn upload(&self, index: u32, name: &str, frame: Arc<dyn Frame>) -> DriverResult<()>;

    /// Cancels the pending transfer.
    fn cancel_transfer(&self) -> DriverResult<()>;
}

/// Receives the lock grant.
pub trait LockCallback: Send + Sync {
    /// Called once the lock has been granted.
    fn obtained(&self);
}

/// Receives media pool events.
pub trait StillsCallback: Send + Sync {
    /// Called for every media pool event. `index` is the affected slot, or -1.
    fn notify(&self, event: MediaPoolEvent, index: i32);
}
