//! On-disk engine state for the simulator.
//!
//! The whole engine, ledger included, lives in one bincode snapshot file.
//! Writes go to a sibling temp file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use celery_core::ledger::MemoryTokenLedger;
use celery_stake::{EngineSnapshot, StakeEngine};

/// Engine over the simulator's in-memory ledger.
pub type Engine = StakeEngine<MemoryTokenLedger>;

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Use `path`, or `~/.celery/state.bin` when none is given.
    pub fn resolve(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            return Ok(Self { path });
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self {
            path: home.join(".celery").join("state.bin"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Engine> {
        if !self.exists() {
            bail!(
                "No state at {} (run `celery-cli init` first)",
                self.path.display()
            );
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let snapshot = EngineSnapshot::from_bytes(&bytes)
            .with_context(|| format!("Corrupt state file {}", self.path.display()))?;
        Ok(StakeEngine::restore(snapshot))
    }

    pub fn save(&self, engine: &Engine) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        let bytes = engine.snapshot().to_bytes()?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celery_core::types::{AccountStatus, Amount, Timestamp};
    use celery_stake::EngineConfig;

    #[test]
    fn save_then_load_restores_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::resolve(Some(dir.path().join("nested").join("state.bin"))).unwrap();

        let mut engine = StakeEngine::deploy(EngineConfig::for_deployment(Timestamp::ZERO, Amount::from(1000)));
        let deployer = engine.config().deployer.clone();
        engine
            .increase_balance_and_stake(&deployer, Amount::from(250), Timestamp::new(10))
            .unwrap();
        state.save(&engine).unwrap();
        assert!(state.exists());

        let loaded = state.load().unwrap();
        assert_eq!(loaded.status(&deployer), AccountStatus::Staking);
        assert_eq!(loaded.staked_amount(&deployer), Amount::from(250));
        assert_eq!(loaded.events().len(), 2);
        assert!(!dir.path().join("nested").join("state.tmp").exists());
    }

    #[test]
    fn missing_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::resolve(Some(dir.path().join("absent.bin"))).unwrap();
        let err = state.load().unwrap_err();
        assert!(err.to_string().contains("celery-cli init"));
    }

    #[test]
    fn garbage_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        fs::write(&path, b"not a snapshot").unwrap();
        let state = StateFile::resolve(Some(path)).unwrap();
        assert!(state.load().is_err());
    }

    #[test]
    fn explicit_path_is_kept() {
        let state = StateFile::resolve(Some(PathBuf::from("custom.bin"))).unwrap();
        assert_eq!(state.path(), Path::new("custom.bin"));
    }
}
