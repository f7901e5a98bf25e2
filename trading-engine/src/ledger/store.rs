use std::fs;
use std::path::{Path, PathBuf};

use common::{Result, TradingError};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::LedgerSnapshot;

/// Persistence seam for ledger state
pub trait LedgerStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<LedgerSnapshot>>;

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()>;
}

/// Human-readable JSON file.
///
/// Saves write a sibling temp file and rename it over the target, so a reader never
/// observes a half-written ledger. A file that exists but does not parse is an error,
/// never a silent reset.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved ledger");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&content).map_err(|e| {
            TradingError::StoreError(format!(
                "corrupt ledger file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        info!(path = %self.path.display(), "ledger loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.temp_path();
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}

/// In-process store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<LedgerSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<LedgerSnapshot>> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }
}
