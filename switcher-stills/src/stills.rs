// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Still slot enumeration.

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::{
    DeviceSession, Error, Result,
    driver::{MediaPlayerSource, StillHash, Switcher},
};

/// One still slot of the media pool.
///
/// Built fresh on every enumeration; nothing is cached between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StillSlotInfo {
    /// 1-based slot number.
    pub slot: u32,
    /// 1-based number of a media player showing this still, if any.
    pub media_player: Option<u32>,
    /// Display name; empty if the device did not report one.
    pub name: String,
    /// Content digest; `None` if the device did not report one.
    pub hash: Option<StillHash>,
}

impl Serialize for StillHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl StillSlotInfo {
    fn empty(slot: u32) -> Self {
        StillSlotInfo {
            slot,
            media_player: None,
            name: String::new(),
            hash: None,
        }
    }

    /// The hash as 32 hex characters, or an empty string if unknown.
    pub fn hash_hex(&self) -> String {
        self.hash.map(|hash| hash.to_string()).unwrap_or_default()
    }

    /// Renders the slot as a CSV row: `slot,"name","hash",media_player`.
    ///
    /// An unbound slot reports media player `0`.
    pub fn to_csv(&self) -> String {
        format!(
            "{},\"{}\",\"{}\",{}",
            self.slot,
            self.name.replace('"', "\"\""),
            self.hash_hex(),
            self.media_player.unwrap_or(0)
        )
    }
}

/// Result of [`DeviceSession::enumerate_stills`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StillEnumeration {
    /// Number of slots on the device, regardless of how many were returned.
    pub total_count: u32,
    /// The first `min(total_count, max_items)` slots.
    pub items: Vec<StillSlotInfo>,
}

impl DeviceSession {
    /// Enumerates still slots.
    ///
    /// Always reports the device's full slot count; at most `max_items` slots
    /// are read. Pass `0` to only learn the count.
    ///
    /// Name and hash are read separately for each slot; a field that cannot be
    /// read stays empty and enumeration continues. Media player bindings are
    /// filled in afterwards on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DriverCallFailure`] if the slot count cannot be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use switcher_stills::DeviceSession;
    /// # fn example(session: &DeviceSession) -> Result<(), switcher_stills::Error> {
    /// let probe = session.enumerate_stills(0)?;
    /// let listing = session.enumerate_stills(probe.total_count as usize)?;
    /// for still in &listing.items {
    ///     println!("{}", still.to_csv());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn enumerate_stills(&self, max_items: usize) -> Result<StillEnumeration> {
        let stills = self.stills_directory()?;
        let total_count = stills.count().map_err(Error::driver("slot count"))?;
        let read_count = (total_count as usize).min(max_items);

        let mut items = Vec::with_capacity(read_count);
        for index in 0..read_count as u32 {
            let mut item = StillSlotInfo::empty(index + 1);
            match stills.name(index) {
                Ok(name) => item.name = name,
                Err(code) => debug!("Name of still {index} unavailable: {code:08X}"),
            }
            match stills.hash(index) {
                Ok(hash) => item.hash = Some(hash),
                Err(code) => debug!("Hash of still {index} unavailable: {code:08X}"),
            }
            items.push(item);
        }

        if !items.is_empty() {
            bind_media_players(self.switcher()?, &mut items);
        }

        Ok(StillEnumeration { total_count, items })
    }

    /// Reads every still slot (count probe followed by a full read).
    pub fn stills(&self) -> Result<Vec<StillSlotInfo>> {
        let probe = self.enumerate_stills(0)?;
        Ok(self.enumerate_stills(probe.total_count as usize)?.items)
    }
}

/// Marks each slot that a media player is showing with that player's 1-based
/// position in the driver's iteration order.
fn bind_media_players(switcher: &dyn Switcher, items: &mut [StillSlotInfo]) {
    let players = match switcher.media_players() {
        Ok(players) => players,
        Err(code) => {
            debug!("Media players unavailable: {code:08X}");
            return;
        }
    };

    for (position, player) in players.enumerate() {
        let number = position as u32 + 1;
        match player.source() {
            Ok(MediaPlayerSource::Still(index)) => {
                if let Some(item) = items.get_mut(index as usize) {
                    item.media_player = Some(number);
                }
            }
            Ok(MediaPlayerSource::Clip(_)) => {}
            Err(code) => debug!("Source of media player {number} unavailable: {code:08X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_quote_name_and_hash() {
        let mut still = StillSlotInfo::empty(3);
        still.name = "Logo \"A\"".to_string();
        still.hash = Some(StillHash([0x11; 16]));
        still.media_player = Some(2);
        assert_eq!(
            still.to_csv(),
            "3,\"Logo \"\"A\"\"\",\"11111111111111111111111111111111\",2"
        );
    }

    #[test]
    fn unbound_slots_report_player_zero_and_empty_hash() {
        let still = StillSlotInfo::empty(1);
        assert_eq!(still.to_csv(), "1,\"\",\"\",0");
        assert_eq!(still.hash_hex(), "");
    }
}
