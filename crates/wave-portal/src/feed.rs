//! The locally known wave history.

use crate::{
    contract::{ContractClient, WaveBackend},
    error::WaveError,
};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tokio::sync::watch;

/// Characters kept at the start of a shortened address, `0x` included.
pub const SHORT_PREFIX_LEN: usize = 6;
/// Characters kept at the end of a shortened address.
pub const SHORT_SUFFIX_LEN: usize = 4;

/// A wave as stored on chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveRecord {
    pub waver: Address,
    pub message: String,
    /// Block timestamp, in seconds since the epoch.
    pub timestamp: u64,
}

/// An immutable snapshot of the wave history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveFeed {
    /// Waves in the order the contract returned them.
    pub records: Vec<WaveRecord>,
    /// Total waves as reported by the contract; `None` until the first refresh.
    ///
    /// Stored as read. The two reads race against new waves, so it may lag `records`; use
    /// [`total`](Self::total) for display.
    pub total_count: Option<u64>,
}

impl WaveFeed {
    fn new(total_count: u64, records: Vec<WaveRecord>) -> Self {
        Self { records, total_count: Some(total_count) }
    }

    /// The total to display, never below the number of records held.
    pub fn total(&self) -> Option<u64> {
        self.total_count.map(|total| total.max(self.records.len() as u64))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Formats every record for display.
    pub fn display(&self) -> Vec<DisplayRecord> {
        self.records.iter().map(format).collect()
    }
}

/// Holds the current [`WaveFeed`] snapshot.
///
/// A refresh swaps in a complete new snapshot, so readers never see a half-updated feed.
#[derive(Debug)]
pub struct WaveFeedCache {
    snapshot: watch::Sender<Arc<WaveFeed>>,
}

impl Default for WaveFeedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveFeedCache {
    pub fn new() -> Self {
        Self { snapshot: watch::Sender::new(Arc::default()) }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<WaveFeed> {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Arc<WaveFeed>> {
        self.snapshot.subscribe()
    }

    /// Re-reads the total and the history from the contract and replaces the snapshot.
    ///
    /// Requires a bound account. On failure the previous snapshot is kept.
    pub async fn refresh<B: WaveBackend>(&self, client: &ContractClient<B>) -> Result<(), WaveError> {
        if client.signer().is_none() {
            return Err(WaveError::invalid_state("cannot read waves before a wallet is connected"));
        }

        let (total, records) = tokio::try_join!(client.get_total_waves(), client.get_all_waves())
            .inspect_err(|err| warn!(%err, "feed refresh failed, keeping previous snapshot"))?;
        debug!(total, records = records.len(), "refreshed wave feed");
        self.snapshot.send_replace(Arc::new(WaveFeed::new(total, records)));
        Ok(())
    }
}

/// A wave prepared for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    /// The waver's checksummed address.
    pub address: String,
    /// The shortened address, e.g. `0xf39F…2266`.
    pub short_address: String,
    pub message: String,
    /// `None` if the timestamp is out of the representable range.
    pub time: Option<DateTime<Utc>>,
}

impl fmt::Display for DisplayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(time) => write!(f, "[{}]", time.to_rfc2822())?,
            None => f.write_str("[unknown time]")?,
        }
        write!(f, " {}: {}", self.short_address, self.message)
    }
}

/// Formats a raw record for display. Pure.
pub fn format(raw: &WaveRecord) -> DisplayRecord {
    let address = raw.waver.to_checksum(None);
    DisplayRecord {
        short_address: shorten_address(&address),
        address,
        message: raw.message.clone(),
        time: i64::try_from(raw.timestamp).ok().and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
}

/// Keeps the first [`SHORT_PREFIX_LEN`] and last [`SHORT_SUFFIX_LEN`] characters of an
/// address string.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= SHORT_PREFIX_LEN + SHORT_SUFFIX_LEN || !address.is_ascii() {
        return address.to_string();
    }
    let suffix = &address[address.len() - SHORT_SUFFIX_LEN..];
    format!("{}…{suffix}", &address[..SHORT_PREFIX_LEN])
}
