// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Uploads a raw BGRA image into a still slot.
//!
//! ```bash
//! cargo run -p switcher-stills --example upload_still -- \
//!     192.168.10.240 --slot 1 --name "Lower third" --file lower-third.bgra
//! ```
//!
//! The file must hold 8-bit BGRA pixels, row-major without padding. Without
//! `--width`/`--height` it must be exactly one frame of the switcher's
//! current video mode.

mod common;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use switcher_stills::{DeviceSession, Dimensions, StillUpload, UploadTimeouts};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Upload a raw BGRA image into a switcher still slot")]
struct Args {
    /// Switcher IP address or host name
    #[arg(env = "SWITCHER_ADDRESS")]
    address: String,

    /// 1-based still slot
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    slot: u32,

    /// Name shown on the switcher; defaults to the file name without extension
    #[arg(long)]
    name: Option<String>,

    /// Raw BGRA pixel file
    #[arg(long)]
    file: PathBuf,

    /// Image width; defaults to the switcher's frame width
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Image height; defaults to the switcher's frame height
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Media pool lock wait in milliseconds
    #[arg(long, default_value_t = 5000)]
    lock_timeout_ms: u64,

    /// Transfer wait in milliseconds
    #[arg(long, default_value_t = 60000)]
    transfer_timeout_ms: u64,
}

fn still_name(args: &Args) -> String {
    args.name
        .clone()
        .or_else(|| {
            args.file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::setup_logging();
    let args = Args::parse();

    let pixels = std::fs::read(&args.file)?;
    let session = DeviceSession::connect_with_provider(&args.address)?;
    let slot = args.slot - 1;
    let name = still_name(&args);

    let timeouts = UploadTimeouts::default()
        .with_lock(Duration::from_millis(args.lock_timeout_ms))
        .with_transfer(Duration::from_millis(args.transfer_timeout_ms));

    match (args.width, args.height) {
        (Some(width), Some(height)) => {
            let upload = StillUpload::new(slot, &name, &pixels, Dimensions::new(width, height));
            session.upload_still_with(&upload, timeouts)?;
        }
        _ => session.upload_full_frame_with(slot, &name, &pixels, timeouts)?,
    }

    info!("Done");
    session.disconnect();
    Ok(())
}
