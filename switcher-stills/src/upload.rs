// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Still upload: lock, transfer, wait for completion, release.
//!
//! The device completes both the lock grant and the transfer asynchronously,
//! through callbacks on driver threads. The calling thread blocks on the
//! [`sink`] objects, each wait bounded by [`UploadTimeouts`].
//!
//! # Protocol
//!
//! ```text
//! Idle ─► FrameAllocated ─► SinkRegistered ─► LockRequested ─► LockObtained
//!                                                                   │
//!                      Done ◄─ TransferCompleted ◄─ UploadRequested ◄┘
//! ```
//!
//! Every exit path, including timeouts and driver failures, runs the same
//! cleanup for the stage that was reached: cancel transfer (only when a
//! transfer was started and never completed), unregister the completion
//! sink, unlock, release the frame, release the sinks.
//!
//! The completion sink is registered before the lock request but only armed
//! once the lock is held. Completions delivered before that belong to other
//! clients' transfers and are ignored.

pub mod sink;

use std::sync::Arc;

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    DeviceSession, Dimensions, Error, Result, WaitPhase,
    config::{BYTES_PER_PIXEL, UPLOAD_PIXEL_FORMAT, UploadTimeouts},
    driver::{DriverResult, Frame, LockCallback, MediaPool, Stills, StillsCallback},
};

use self::sink::{LockAcquisitionSink, TransferCompletionSink};

/// Name given to a still when the caller supplies none.
pub const DEFAULT_STILL_NAME: &str = "upload";

/// A still to upload.
///
/// `pixels` must already be in the device layout (8-bit BGRA, row-major, no
/// padding); no conversion takes place.
#[derive(Debug, Clone, Copy)]
pub struct StillUpload<'a> {
    /// 0-based target slot.
    pub slot: u32,
    /// Display name for the slot. Empty means [`DEFAULT_STILL_NAME`].
    pub name: &'a str,
    /// Pixel data, at most `width * height * 4` bytes.
    pub pixels: &'a [u8],
    /// Frame size.
    pub dimensions: Dimensions,
}

impl<'a> StillUpload<'a> {
    /// Describes an upload of `pixels` into the 0-based `slot`.
    pub fn new(slot: u32, name: &'a str, pixels: &'a [u8], dimensions: Dimensions) -> Self {
        StillUpload {
            slot,
            name,
            pixels,
            dimensions,
        }
    }

    fn name(&self) -> &'a str {
        if self.name.is_empty() {
            DEFAULT_STILL_NAME
        } else {
            self.name
        }
    }

    fn validate(&self) -> Result<()> {
        let Dimensions { width, height } = self.dimensions;
        if self.pixels.is_empty() {
            return Err(Error::InvalidArgument("pixel buffer is empty".to_string()));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument(format!(
                "frame size {width}x{height} is empty"
            )));
        }
        let capacity = self.dimensions.pixel_count().saturating_mul(BYTES_PER_PIXEL);
        if self.pixels.len() > capacity {
            return Err(Error::InvalidArgument(format!(
                "pixel buffer holds {} bytes, a {width}x{height} frame holds {capacity}",
                self.pixels.len()
            )));
        }
        Ok(())
    }
}

impl DeviceSession {
    /// Uploads a still into the 0-based `slot` using the default timeouts.
    ///
    /// See [`Self::upload_still_with`].
    pub fn upload_still(
        &self,
        slot: u32,
        name: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.upload_still_with(
            &StillUpload::new(slot, name, pixels, Dimensions::new(width, height)),
            UploadTimeouts::default(),
        )
    }

    /// Uploads a full frame at the switcher's current resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless `pixels` holds exactly one
    /// BGRA frame of the current video mode's size.
    pub fn upload_full_frame(&self, slot: u32, name: &str, pixels: &[u8]) -> Result<()> {
        self.upload_full_frame_with(slot, name, pixels, UploadTimeouts::default())
    }

    /// [`Self::upload_full_frame`] with explicit wait bounds.
    pub fn upload_full_frame_with(
        &self,
        slot: u32,
        name: &str,
        pixels: &[u8],
        timeouts: UploadTimeouts,
    ) -> Result<()> {
        let dimensions = self.video_dimensions()?;
        let expected = dimensions.pixel_count() * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "image is {} bytes, the switcher needs a {}x{} frame of {expected} bytes",
                pixels.len(),
                dimensions.width,
                dimensions.height
            )));
        }
        self.upload_still_with(&StillUpload::new(slot, name, pixels, dimensions), timeouts)
    }

    /// Uploads a still, blocking until the device confirms the transfer.
    ///
    /// Uploads on one session are serialized; a second caller waits until the
    /// first upload has finished.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an empty or oversized pixel buffer or
    ///   an empty frame size (nothing is sent to the device)
    /// - [`Error::DriverCallFailure`] if a driver call fails
    /// - [`Error::Timeout`] if the lock or the transfer wait runs out
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::time::Duration;
    /// # use switcher_stills::{DeviceSession, Dimensions, StillUpload, UploadTimeouts};
    /// # fn example(session: &DeviceSession) -> Result<(), switcher_stills::Error> {
    /// let pixels = vec![0u8; 1920 * 1080 * 4];
    /// let upload = StillUpload::new(0, "black", &pixels, Dimensions::new(1920, 1080));
    /// let timeouts = UploadTimeouts::default().with_transfer(Duration::from_secs(120));
    /// session.upload_still_with(&upload, timeouts)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn upload_still_with(&self, upload: &StillUpload<'_>, timeouts: UploadTimeouts) -> Result<()> {
        upload.validate()?;
        let stills = self.stills_directory()?;
        let media_pool = self.media_pool()?;

        let _serialized = self.upload_guard();
        let id = Uuid::new_v4();
        let span = info_span!(
            "upload",
            %id,
            slot = upload.slot,
            width = upload.dimensions.width,
            height = upload.dimensions.height
        );
        let _entered = span.enter();

        let mut operation = UploadOperation::new(stills.as_ref());
        let outcome = operation.run(media_pool.as_ref(), upload, timeouts);
        operation.finish();

        match &outcome {
            Ok(()) => info!("Uploaded still \"{}\" to slot {}", upload.name(), upload.slot + 1),
            Err(error) => warn!("Still upload failed: {error}"),
        }
        outcome
    }
}

/// How far an upload got. Cleanup undoes exactly the steps at or below the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum UploadStage {
    Idle,
    FrameAllocated,
    SinkRegistered,
    LockRequested,
    LockObtained,
    UploadRequested,
    TransferCompleted,
    Done,
}

/// State of one upload call.
///
/// Field order is release order: the frame is released in [`Self::release`],
/// the sinks when the operation itself is dropped.
struct UploadOperation<'s> {
    stills: &'s dyn Stills,
    stage: UploadStage,
    frame: Option<Arc<dyn Frame>>,
    lock_sink: Arc<LockAcquisitionSink>,
    transfer_sink: Arc<TransferCompletionSink>,
}

impl<'s> UploadOperation<'s> {
    fn new(stills: &'s dyn Stills) -> Self {
        UploadOperation {
            stills,
            stage: UploadStage::Idle,
            frame: None,
            lock_sink: LockAcquisitionSink::new(),
            transfer_sink: TransferCompletionSink::new(),
        }
    }

    fn lock_callback(&self) -> Arc<dyn LockCallback> {
        self.lock_sink.clone()
    }

    fn transfer_callback(&self) -> Arc<dyn StillsCallback> {
        self.transfer_sink.clone()
    }

    fn advance(&mut self, stage: UploadStage) {
        debug!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn run(
        &mut self,
        media_pool: &dyn MediaPool,
        upload: &StillUpload<'_>,
        timeouts: UploadTimeouts,
    ) -> Result<()> {
        let frame = allocate_frame(media_pool, upload)?;
        self.frame = Some(frame.clone());
        self.advance(UploadStage::FrameAllocated);

        self.stills
            .add_callback(self.transfer_callback())
            .map_err(Error::driver("add callback"))?;
        self.advance(UploadStage::SinkRegistered);

        self.stills
            .lock(self.lock_callback())
            .map_err(Error::driver("lock"))?;
        self.advance(UploadStage::LockRequested);

        if !self.lock_sink.wait_obtained(timeouts.lock) {
            return Err(Error::Timeout {
                phase: WaitPhase::Lock,
            });
        }
        self.advance(UploadStage::LockObtained);

        // Completions seen so far belong to other clients' transfers.
        self.transfer_sink.arm();
        self.stills
            .upload(upload.slot, upload.name(), frame)
            .map_err(Error::driver("upload"))?;
        self.advance(UploadStage::UploadRequested);

        if !self.transfer_sink.wait_completed(timeouts.transfer) {
            return Err(Error::Timeout {
                phase: WaitPhase::Transfer,
            });
        }
        if self.transfer_sink.ignored_events() > 0 {
            debug!(
                "Ignored {} media pool events while waiting",
                self.transfer_sink.ignored_events()
            );
        }
        self.advance(UploadStage::TransferCompleted);
        Ok(())
    }

    /// Runs cleanup now instead of at drop.
    fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let stage = self.stage;
        if stage == UploadStage::Done {
            return;
        }

        if stage == UploadStage::UploadRequested {
            best_effort("cancel transfer", self.stills.cancel_transfer());
        }
        if stage >= UploadStage::SinkRegistered {
            best_effort(
                "remove callback",
                self.stills.remove_callback(&self.transfer_callback()),
            );
        }
        if stage >= UploadStage::LockRequested {
            best_effort("unlock", self.stills.unlock(&self.lock_callback()));
        }
        self.frame = None;
        self.advance(UploadStage::Done);
    }
}

impl Drop for UploadOperation<'_> {
    /// Cleans up if an exit path skipped [`UploadOperation::finish`].
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates a BGRA frame and copies `upload.pixels` into its start.
fn allocate_frame(media_pool: &dyn MediaPool, upload: &StillUpload<'_>) -> Result<Arc<dyn Frame>> {
    let Dimensions { width, height } = upload.dimensions;
    let mut frame = media_pool
        .create_frame(UPLOAD_PIXEL_FORMAT, width, height)
        .map_err(Error::driver("create frame"))?;

    let bytes = frame.bytes_mut().map_err(Error::driver("frame bytes"))?;
    let available = bytes.len();
    let Some(destination) = bytes.get_mut(..upload.pixels.len()) else {
        return Err(Error::InternalError(format!(
            "device frame holds {available} bytes, {} supplied",
            upload.pixels.len()
        )));
    };
    destination.copy_from_slice(upload.pixels);

    Ok(Arc::from(frame))
}

fn best_effort(action: &str, result: DriverResult<()>) {
    if let Err(code) = result {
        warn!("Cleanup step \"{action}\" failed (code=0x{code:08X})");
    }
}
