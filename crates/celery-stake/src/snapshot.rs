//! Persisted engine state.
//!
//! An [`EngineSnapshot`] captures everything needed to resume an engine over
//! an in-memory ledger: configuration, account records, pool totals, ledger
//! balances and the undrained event journal. Binary form uses bincode; a
//! JSON export exists for inspection.

use serde::{Deserialize, Serialize};

use celery_core::error::CeleryError;
use celery_core::event::StakeEvent;
use celery_core::ledger::MemoryTokenLedger;

use crate::account::AccountBook;
use crate::config::EngineConfig;
use crate::engine::StakeEngine;
use crate::supply::SupplyTotals;

/// Format version written at the front of every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(
    Serialize, Deserialize, Debug, Clone, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct EngineSnapshot {
    pub version: u32,
    pub config: EngineConfig,
    pub accounts: AccountBook,
    pub totals: SupplyTotals,
    pub ledger: MemoryTokenLedger,
    pub journal: Vec<StakeEvent>,
}

impl EngineSnapshot {
    /// Encode to bincode bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CeleryError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| CeleryError::Snapshot(e.to_string()))
    }

    /// Decode from bincode bytes, rejecting unknown versions and trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CeleryError> {
        let (snapshot, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| CeleryError::Snapshot(e.to_string()))?;
        if read != bytes.len() {
            return Err(CeleryError::Snapshot(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CeleryError::Snapshot(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Pretty-printed JSON of the whole snapshot.
    pub fn to_json(&self) -> Result<String, CeleryError> {
        serde_json::to_string_pretty(self).map_err(|e| CeleryError::Snapshot(e.to_string()))
    }
}

impl StakeEngine<MemoryTokenLedger> {
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config().clone(),
            accounts: self.accounts().clone(),
            totals: self.totals(),
            ledger: self.ledger().clone(),
            journal: self.events().to_vec(),
        }
    }

    /// Resume from a snapshot. Listeners are not persisted.
    pub fn restore(snapshot: EngineSnapshot) -> Self {
        Self::from_parts(
            snapshot.config,
            snapshot.accounts,
            snapshot.totals,
            snapshot.ledger,
            snapshot.journal,
        )
    }
}
