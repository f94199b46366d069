use crate::model::types::TournamentState;
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The one key the tournament is stored under. Only one tournament can be in
/// flight per state directory.
pub const QUIZ_STORAGE_KEY: &str = "quiz-competition-state";

/// Durable store for the whole tournament state, written as one blob.
pub struct PersistenceClient {
    dir: Option<PathBuf>,
}

impl PersistenceClient {
    /// With no directory every operation is a no-op and `load` yields nothing.
    pub fn new(dir: Option<PathBuf>) -> Self {
        match &dir {
            Some(dir) => info!("Tournament persistence enabled in {}", dir.display()),
            None => info!("STATE_DIR not set, tournament persistence disabled"),
        }
        Self { dir }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    fn blob_path(dir: &Path) -> PathBuf {
        dir.join(format!("{QUIZ_STORAGE_KEY}.json"))
    }

    /// Load the stored state. Missing, unreadable or unparseable blobs all
    /// come back as `None`.
    pub fn load(&self) -> Option<TournamentState> {
        let dir = self.dir.as_ref()?;
        let path = Self::blob_path(dir);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No saved tournament state found at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Error reading tournament state from {}: {e}", path.display());
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => {
                info!("Loaded tournament state from {}", path.display());
                Some(state)
            }
            Err(e) => {
                warn!("Discarding unreadable tournament state: {e}");
                None
            }
        }
    }

    /// Overwrite the stored blob with `state`.
    pub fn save(&self, state: &TournamentState) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        fs::create_dir_all(dir)
            .with_context(|| format!("creating state directory {}", dir.display()))?;
        let path = Self::blob_path(dir);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec(state)?;

        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    pub fn clear(&self) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = Self::blob_path(dir);
        match fs::remove_file(&path) {
            Ok(()) => info!("Cleared tournament state at {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!("Failed to clear tournament state at {}: {e}", path.display()),
        }
    }
}
