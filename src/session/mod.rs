//! Session Layer
//!
//! Wall-clock timers, settlement history and share tokens.
//! This layer is **non-deterministic** - all outcome logic runs through `game/`.

pub mod driver;
pub mod history;

pub use driver::{Command, DriverError, DriverHandle, TimerDriver};
pub use history::{
    decode_share_token, encode_share_token, snapshot_from_json, snapshot_to_json, HistoryEntry,
    RoundHistory, ShareError,
};
