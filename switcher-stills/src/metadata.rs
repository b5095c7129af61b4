// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Device metadata: product name, video mode and frame dimensions.

use serde::Serialize;

use crate::{DeviceSession, Error, Result};

/// Packs a four-character code the way the driver reports video modes.
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Video standard the switcher is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoMode {
    /// 525i 59.94 NTSC.
    Ntsc525i5994,
    /// 625i 50 PAL.
    Pal625i50,
    /// 525i 59.94 NTSC, 16:9 anamorphic.
    Ntsc525i5994Anamorphic,
    /// 625i 50 PAL, 16:9 anamorphic.
    Pal625i50Anamorphic,
    /// 720p 50.
    Hd720p50,
    /// 720p 59.94.
    Hd720p5994,
    /// 720p 60.
    Hd720p60,
    /// 1080i 50.
    Hd1080i50,
    /// 1080i 59.94.
    Hd1080i5994,
    /// 1080i 60.
    Hd1080i60,
    /// 1080p 23.98.
    Hd1080p2398,
    /// 1080p 24.
    Hd1080p24,
    /// 1080p 25.
    Hd1080p25,
    /// 1080p 29.97.
    Hd1080p2997,
    /// 1080p 30.
    Hd1080p30,
    /// 1080p 50.
    Hd1080p50,
    /// 1080p 59.94.
    Hd1080p5994,
    /// 1080p 60.
    Hd1080p60,
    /// 2160p 23.98.
    Uhd4kp2398,
    /// 2160p 24.
    Uhd4kp24,
    /// 2160p 25.
    Uhd4kp25,
    /// 2160p 29.97.
    Uhd4kp2997,
    /// 2160p 30.
    Uhd4kp30,
    /// 2160p 50.
    Uhd4kp50,
    /// 2160p 59.94.
    Uhd4kp5994,
    /// 2160p 60.
    Uhd4kp60,
    /// A code this crate does not know.
    Unknown(u32),
}

const MODE_CODES: &[(VideoMode, &[u8; 4])] = &[
    (VideoMode::Ntsc525i5994, b"525i"),
    (VideoMode::Pal625i50, b"625i"),
    (VideoMode::Ntsc525i5994Anamorphic, b"525a"),
    (VideoMode::Pal625i50Anamorphic, b"625a"),
    (VideoMode::Hd720p50, b"720a"),
    (VideoMode::Hd720p5994, b"720b"),
    (VideoMode::Hd720p60, b"720c"),
    (VideoMode::Hd1080i50, b"108a"),
    (VideoMode::Hd1080i5994, b"108b"),
    (VideoMode::Hd1080i60, b"108c"),
    (VideoMode::Hd1080p2398, b"10p2"),
    (VideoMode::Hd1080p24, b"10p3"),
    (VideoMode::Hd1080p25, b"10p5"),
    (VideoMode::Hd1080p2997, b"10p9"),
    (VideoMode::Hd1080p30, b"10p0"),
    (VideoMode::Hd1080p50, b"10pa"),
    (VideoMode::Hd1080p5994, b"10pb"),
    (VideoMode::Hd1080p60, b"10pc"),
    (VideoMode::Uhd4kp2398, b"4k23"),
    (VideoMode::Uhd4kp24, b"4k24"),
    (VideoMode::Uhd4kp25, b"4k25"),
    (VideoMode::Uhd4kp2997, b"4k29"),
    (VideoMode::Uhd4kp30, b"4k30"),
    (VideoMode::Uhd4kp50, b"4k50"),
    (VideoMode::Uhd4kp5994, b"4k59"),
    (VideoMode::Uhd4kp60, b"4k60"),
];

impl From<u32> for VideoMode {
    /// Converts a raw driver mode code, keeping unknown codes as [`VideoMode::Unknown`].
    fn from(value: u32) -> Self {
        MODE_CODES
            .iter()
            .find(|(_, code)| fourcc(code) == value)
            .map(|(mode, _)| *mode)
            .unwrap_or(VideoMode::Unknown(value))
    }
}

impl VideoMode {
    /// Raw driver code of this mode.
    pub fn code(self) -> u32 {
        if let VideoMode::Unknown(code) = self {
            return code;
        }
        MODE_CODES
            .iter()
            .find(|(mode, _)| *mode == self)
            .map(|(_, code)| fourcc(code))
            .unwrap_or_default()
    }

    /// Frame size of this mode. Modes outside the table are treated as 1080.
    pub fn dimensions(self) -> Dimensions {
        use VideoMode::*;
        match self {
            Uhd4kp2398 | Uhd4kp24 | Uhd4kp25 | Uhd4kp2997 | Uhd4kp30 | Uhd4kp50 | Uhd4kp5994
            | Uhd4kp60 => Dimensions::new(3840, 2160),
            Hd720p50 | Hd720p5994 | Hd720p60 => Dimensions::new(1280, 720),
            Ntsc525i5994 | Ntsc525i5994Anamorphic => Dimensions::new(720, 480),
            Pal625i50 | Pal625i50Anamorphic => Dimensions::new(720, 576),
            _ => Dimensions::new(1920, 1080),
        }
    }
}

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Creates a frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Dimensions { width, height }
    }

    /// Number of pixels in a frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl DeviceSession {
    /// Returns the switcher's product name.
    pub fn product_name(&self) -> Result<String> {
        self.switcher()?
            .product_name()
            .map_err(Error::driver("product name"))
    }

    /// Returns the video mode the switcher is running.
    pub fn video_mode(&self) -> Result<VideoMode> {
        let code = self
            .switcher()?
            .video_mode()
            .map_err(Error::driver("video mode"))?;
        Ok(VideoMode::from(code))
    }

    /// Returns the frame size for the current video mode.
    ///
    /// Only the mode is queried from the device; the size comes from a fixed table.
    pub fn video_dimensions(&self) -> Result<Dimensions> {
        Ok(self.video_mode()?.dimensions())
    }
}
