// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Lists the still slots of a switcher.
//!
//! ```bash
//! SWITCHER_STILLS_DRIVER=/path/to/libswitcher_stills_driver.so \
//!     cargo run -p switcher-stills --example list_stills -- 192.168.10.240
//! ```
//!
//! Prints one CSV row per slot (`slot,"name","hash",media_player`), or the
//! whole listing as JSON with `--json`.

mod common;

use clap::Parser;
use switcher_stills::DeviceSession;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "List the still slots of a switcher")]
struct Args {
    /// Switcher IP address or host name
    #[arg(env = "SWITCHER_ADDRESS")]
    address: String,

    /// Read at most this many slots
    #[arg(long)]
    max_items: Option<usize>,

    /// Print the listing as JSON instead of CSV
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::setup_logging();
    let args = Args::parse();

    let session = DeviceSession::connect_with_provider(&args.address)?;
    info!(
        "{} running {:?}",
        session.product_name()?,
        session.video_mode()?
    );

    let max_items = match args.max_items {
        Some(max_items) => max_items,
        None => session.enumerate_stills(0)?.total_count as usize,
    };
    let listing = session.enumerate_stills(max_items)?;
    info!(
        "Reading {} of {} still slots",
        listing.items.len(),
        listing.total_count
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for still in &listing.items {
            println!("{}", still.to_csv());
        }
    }

    session.disconnect();
    Ok(())
}
