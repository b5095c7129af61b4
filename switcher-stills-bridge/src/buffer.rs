// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Caller-supplied string buffers.

use std::ffi::c_char;

/// Writes `text` into `destination` as a NUL-terminated string.
///
/// Text that does not fit is cut at the last UTF-8 character boundary that
/// leaves room for the terminator. Returns the number of bytes written,
/// excluding the terminator. An empty destination is left untouched.
pub fn write_str(destination: &mut [c_char], text: &str) -> usize {
    let Some(capacity) = destination.len().checked_sub(1) else {
        return 0;
    };
    let text = truncate_utf8(text, capacity);
    for (slot, byte) in destination.iter_mut().zip(text.bytes()) {
        *slot = byte as c_char;
    }
    destination[text.len()] = 0;
    text.len()
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a character.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Borrows a caller buffer of `len` bytes.
///
/// Returns `None` for a null pointer or a length below 1.
///
/// # Safety
///
/// A non-null `buffer` must be valid for writes of `len` bytes for `'a`.
pub unsafe fn caller_buffer<'a>(buffer: *mut c_char, len: i32) -> Option<&'a mut [c_char]> {
    if buffer.is_null() || len < 1 {
        return None;
    }
    // Safety: non-null and sized by the caller, see above.
    Some(unsafe { std::slice::from_raw_parts_mut(buffer, len as usize) })
}
