//! Settlement History and Share Tokens
//!
//! Keeps settled rounds for the life of a session and turns snapshots into
//! portable tokens. A token is the bincode encoding of the snapshot, hex
//! encoded so it survives a URL; JSON is offered for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::money::Amount;
use crate::game::state::RoundSnapshot;

/// One settled round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the round settled.
    pub settled_at: DateTime<Utc>,
    /// The settlement record.
    pub snapshot: RoundSnapshot,
}

/// Settled rounds of one session, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundHistory {
    session_id: Uuid,
    entries: Vec<HistoryEntry>,
}

impl Default for RoundHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundHistory {
    /// Empty history with a fresh session id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    /// Session this history belongs to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Record a settlement stamped with the current time.
    pub fn record(&mut self, snapshot: RoundSnapshot) -> &HistoryEntry {
        self.record_at(snapshot, Utc::now())
    }

    /// Record a settlement with an explicit timestamp.
    pub fn record_at(&mut self, snapshot: RoundSnapshot, settled_at: DateTime<Utc>) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            settled_at,
            snapshot,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Most recent settlement, the default rewatch target.
    pub fn latest(&self) -> Option<&RoundSnapshot> {
        self.entries.last().map(|e| &e.snapshot)
    }

    /// Number of settled rounds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No rounds settled yet?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total staked across all rounds.
    pub fn total_wagered(&self) -> Amount {
        self.entries
            .iter()
            .fold(Amount::ZERO, |acc, e| acc.saturating_add(e.snapshot.bet))
    }

    /// Total paid out across all rounds.
    pub fn total_paid(&self) -> Amount {
        self.entries
            .iter()
            .fold(Amount::ZERO, |acc, e| acc.saturating_add(e.snapshot.payout))
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, ShareError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ShareError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Encode a snapshot as a hex share token.
pub fn encode_share_token(snapshot: &RoundSnapshot) -> Result<String, ShareError> {
    let bytes = bincode::serialize(snapshot)?;
    Ok(hex::encode(bytes))
}

/// Decode a share token back into a snapshot.
pub fn decode_share_token(token: &str) -> Result<RoundSnapshot, ShareError> {
    let bytes = hex::decode(token.trim())?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Snapshot as JSON.
pub fn snapshot_to_json(snapshot: &RoundSnapshot) -> Result<String, ShareError> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Snapshot from JSON.
pub fn snapshot_from_json(s: &str) -> Result<RoundSnapshot, ShareError> {
    Ok(serde_json::from_str(s)?)
}

/// Failures encoding or decoding shared records.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Token is not valid hex.
    #[error("share token is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Binary encoding failed.
    #[error("share token could not be decoded: {0}")]
    Binary(#[from] bincode::Error),

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
