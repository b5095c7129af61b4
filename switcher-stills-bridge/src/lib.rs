// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! C interface to `switcher-stills`.
//!
//! Every function returns a status code: `0` on success, `-1` for invalid
//! arguments and internal failures, `-2` for timeouts, otherwise the driver's
//! (negative) failure code. On failure a message is written into the
//! caller's error buffer when one is supplied. The declarations live in
//! `include/switcher_stills_bridge.h`.
//!
//! A `switcher_connection` is owned by the caller from `switcher_connect`
//! until it is passed to `switcher_disconnect`. It may be used from several
//! threads; uploads on one connection run one at a time.

pub mod buffer;

use std::{
    ffi::{CStr, c_char},
    panic::{AssertUnwindSafe, catch_unwind},
    ptr,
};

use switcher_stills::{DeviceSession, Error, Result, StillSlotInfo};
use tracing::error;

use crate::buffer::{caller_buffer, write_str};

/// Status returned on success.
pub const SWITCHER_OK: i32 = 0;

/// Capacity of [`SwitcherStillInfo::name`], including the terminator.
pub const STILL_NAME_CAPACITY: usize = 128;

/// Capacity of [`SwitcherStillInfo::hash`], including the terminator.
pub const STILL_HASH_CAPACITY: usize = 33;

/// Opaque connection handle (`switcher_connection` in C).
pub struct SwitcherConnection {
    session: DeviceSession,
}

/// One still slot (`switcher_still_info` in C).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SwitcherStillInfo {
    /// 1-based slot number.
    pub slot: i32,
    /// 1-based media player showing the still, or 0.
    pub media_player: i32,
    /// NUL-terminated name.
    pub name: [c_char; STILL_NAME_CAPACITY],
    /// NUL-terminated hex digest, empty if unknown.
    pub hash: [c_char; STILL_HASH_CAPACITY],
}

impl Default for SwitcherStillInfo {
    fn default() -> Self {
        SwitcherStillInfo {
            slot: 0,
            media_player: 0,
            name: [0; STILL_NAME_CAPACITY],
            hash: [0; STILL_HASH_CAPACITY],
        }
    }
}

impl From<&StillSlotInfo> for SwitcherStillInfo {
    fn from(still: &StillSlotInfo) -> Self {
        let mut info = SwitcherStillInfo {
            slot: still.slot as i32,
            media_player: still.media_player.unwrap_or(0) as i32,
            ..SwitcherStillInfo::default()
        };
        write_str(&mut info.name, &still.name);
        write_str(&mut info.hash, &still.hash_hex());
        info
    }
}

/// Runs `body`, turning an error or a panic into a status code and message.
fn run(error_buffer: *mut c_char, error_buffer_len: i32, body: impl FnOnce() -> Result<()>) -> i32 {
    let outcome = catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        error!("Panic inside a bridge call");
        Err(Error::InternalError("unexpected internal failure".to_string()))
    });
    match outcome {
        Ok(()) => SWITCHER_OK,
        Err(err) => {
            // Safety: the caller guarantees the error buffer per the C contract.
            if let Some(buffer) = unsafe { caller_buffer(error_buffer, error_buffer_len) } {
                write_str(buffer, &err.to_string());
            }
            err.status_code()
        }
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidArgument(message.to_string())
}

/// # Safety
///
/// `connection` must be null or a live handle from [`switcher_connect`].
unsafe fn session<'a>(connection: *const SwitcherConnection) -> Result<&'a DeviceSession> {
    // Safety: see above.
    unsafe { connection.as_ref() }
        .map(|connection| &connection.session)
        .ok_or_else(|| Error::InternalError("invalid switcher connection".to_string()))
}

/// # Safety
///
/// `out` must be null or valid for a write of `T`.
unsafe fn out_param<'a, T>(out: *mut T, what: &str) -> Result<&'a mut T> {
    // Safety: see above.
    unsafe { out.as_mut() }.ok_or_else(|| invalid(&format!("{what} must not be null")))
}

/// Connects to the switcher at `device_address`.
///
/// On success `*out_connection` receives a handle for [`switcher_disconnect`].
/// On a refused connection `*out_fail_reason` receives the device's reason.
///
/// # Safety
///
/// `device_address` must be null or a NUL-terminated string. The out pointers
/// must be null or writable. `error_buffer` must be null or writable for
/// `error_buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_connect(
    device_address: *const c_char,
    out_connection: *mut *mut SwitcherConnection,
    out_fail_reason: *mut i32,
    error_buffer: *mut c_char,
    error_buffer_len: i32,
) -> i32 {
    run(error_buffer, error_buffer_len, || {
        let out_connection = unsafe { out_param(out_connection, "out_connection") }?;
        *out_connection = ptr::null_mut();
        let mut fail_reason = unsafe { out_fail_reason.as_mut() };
        if let Some(reason) = fail_reason.as_deref_mut() {
            *reason = 0;
        }

        if device_address.is_null() {
            return Err(invalid("device address must not be null"));
        }
        // Safety: non-null and NUL-terminated per the contract.
        let address = unsafe { CStr::from_ptr(device_address) }
            .to_str()
            .map_err(|_| invalid("device address is not valid UTF-8"))?;

        match DeviceSession::connect_with_provider(address) {
            Ok(session) => {
                *out_connection = Box::into_raw(Box::new(SwitcherConnection { session }));
                Ok(())
            }
            Err(err) => {
                if let (Error::ConnectionFailure { reason, .. }, Some(out)) = (&err, fail_reason) {
                    *out = reason.0;
                }
                Err(err)
            }
        }
    })
}

/// Closes a connection. A null handle is ignored.
///
/// # Safety
///
/// `connection` must be null or a handle from [`switcher_connect`] that has
/// not been disconnected yet, and no other call may be using it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_disconnect(connection: *mut SwitcherConnection) {
    if connection.is_null() {
        return;
    }
    // Safety: ownership returns from the caller, see above.
    let connection = unsafe { Box::from_raw(connection) };
    if catch_unwind(AssertUnwindSafe(|| connection.session.disconnect())).is_err() {
        error!("Panic while disconnecting");
    }
}

/// Writes the product name into `out_name`.
///
/// # Safety
///
/// `connection` must be null or live. `out_name` must be null or writable for
/// `out_name_len` bytes, likewise `error_buffer`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_get_product_name(
    connection: *const SwitcherConnection,
    out_name: *mut c_char,
    out_name_len: i32,
    error_buffer: *mut c_char,
    error_buffer_len: i32,
) -> i32 {
    run(error_buffer, error_buffer_len, || {
        let out_name = unsafe { caller_buffer(out_name, out_name_len) }
            .ok_or_else(|| invalid("out_name buffer is invalid"))?;
        let name = unsafe { session(connection) }?.product_name()?;
        write_str(out_name, &name);
        Ok(())
    })
}

/// Writes the raw video mode code into `*out_video_mode`.
///
/// # Safety
///
/// `connection` must be null or live. `out_video_mode` must be null or
/// writable. `error_buffer` must be null or writable for `error_buffer_len`
/// bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_get_video_mode(
    connection: *const SwitcherConnection,
    out_video_mode: *mut i32,
    error_buffer: *mut c_char,
    error_buffer_len: i32,
) -> i32 {
    run(error_buffer, error_buffer_len, || {
        let out_video_mode = unsafe { out_param(out_video_mode, "out_video_mode") }?;
        let mode = unsafe { session(connection) }?.video_mode()?;
        *out_video_mode = mode.code() as i32;
        Ok(())
    })
}

/// Writes the frame size of the current video mode.
///
/// # Safety
///
/// `connection` must be null or live. `out_width` and `out_height` must be
/// null or writable. `error_buffer` must be null or writable for
/// `error_buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_get_video_dimensions(
    connection: *const SwitcherConnection,
    out_width: *mut i32,
    out_height: *mut i32,
    error_buffer: *mut c_char,
    error_buffer_len: i32,
) -> i32 {
    run(error_buffer, error_buffer_len, || {
        if out_width.is_null() || out_height.is_null() {
            return Err(invalid("out_width/out_height must not be null"));
        }
        let dimensions = unsafe { session(connection) }?.video_dimensions()?;
        // Safety: both checked non-null above.
        unsafe {
            *out_width = dimensions.width as i32;
            *out_height = dimensions.height as i32;
        }
        Ok(())
    })
}

/// Lists still slots.
///
/// `*out_count` always receives the device's slot count. Up to
/// `out_items_max` entries are written to `out_items`; with a null
/// `out_items` or a non-positive maximum only the count is reported.
///
/// # Safety
///
/// `connection` must be null or live. `out_items` must be null or writable
/// for `out_items_max` entries. `out_count` must be null or writable.
/// `error_buffer` must be null or writable for `error_buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_get_stills(
    connection: *const SwitcherConnection,
    out_items: *mut SwitcherStillInfo,
    out_items_max: i32,
    out_count: *mut i32,
    error_buffer: *mut c_char,
    error_buffer_len: i32,
) -> i32 {
    run(error_buffer, error_buffer_len, || {
        let out_count = unsafe { out_param(out_count, "out_count") }?;
        let session = unsafe { session(connection) }?;

        let max_items = if out_items.is_null() || out_items_max <= 0 {
            0
        } else {
            out_items_max as usize
        };
        let listing = session.enumerate_stills(max_items)?;

        if max_items > 0 {
            // Safety: non-null and sized by the caller, see above.
            let out_items = unsafe { std::slice::from_raw_parts_mut(out_items, max_items) };
            for (slot, still) in out_items.iter_mut().zip(&listing.items) {
                *slot = SwitcherStillInfo::from(still);
            }
        }
        *out_count = listing.total_count as i32;
        Ok(())
    })
}

/// Uploads BGRA pixels into the 0-based `slot_zero_based`.
///
/// `pixel_bytes` is the length of `bgra_pixels` in bytes and may not exceed
/// `width * height * 4`. A null `name` names the still `"upload"`. Blocks
/// until the device confirms the transfer or a wait times out.
///
/// # Safety
///
/// `connection` must be null or live. `name` must be null or a NUL-terminated
/// string. `bgra_pixels` must be null or readable for `pixel_bytes` bytes.
/// `error_buffer` must be null or writable for `error_buffer_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn switcher_upload_still(
    connection: *const SwitcherConnection,
    slot_zero_based: i32,
    name: *const c_char,
    bgra_pixels: *const u8,
    pixel_bytes: i32,
    width: i32,
    height: i32,
    error_buffer: *mut c_char,
    error_buffer_len: i32,
) -> i32 {
    run(error_buffer, error_buffer_len, || {
        if bgra_pixels.is_null() || pixel_bytes <= 0 || width <= 0 || height <= 0 {
            return Err(invalid("invalid pixel buffer"));
        }
        let slot = u32::try_from(slot_zero_based).map_err(|_| invalid("slot must not be negative"))?;
        let session = unsafe { session(connection) }?;

        let name = if name.is_null() {
            None
        } else {
            // Safety: non-null and NUL-terminated per the contract.
            Some(unsafe { CStr::from_ptr(name) }.to_string_lossy())
        };
        // Safety: non-null and sized by the caller, see above.
        let pixels = unsafe { std::slice::from_raw_parts(bgra_pixels, pixel_bytes as usize) };

        session.upload_still(
            slot,
            name.as_deref().unwrap_or_default(),
            pixels,
            width as u32,
            height as u32,
        )
    })
}
