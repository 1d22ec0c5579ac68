use std::path::{Path, PathBuf};

use async_trait::async_trait;
use relay_core::io::{atomic_write, remove_if_exists};
use relay_core::types::UserId;

use crate::error::PlatformError;
use crate::platform::CredentialStore;

// ─── FileCredentialStore ──────────────────────────────────────────────────

/// Keeps each user's session string in its own file.
///
/// Files live at `<dir>/<user>.session`. The directory is created lazily on
/// the first `save`.
///
/// ```rust,ignore
/// let store = FileCredentialStore::new(&config.sessions.credentials_dir);
/// store.save(UserId(42), "1BVtsOK4...")?;
/// assert!(store.load(UserId(42)).is_some());
/// store.clear(UserId(42))?;
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: &Path) -> Self {
        FileCredentialStore {
            dir: dir.to_path_buf(),
        }
    }

    /// Return the stored credential for `user`, or `None` if none exists.
    pub fn load(&self, user: UserId) -> Option<String> {
        std::fs::read_to_string(self.path(user))
            .ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
    }

    pub fn save(&self, user: UserId, credential: &str) -> relay_core::Result<()> {
        atomic_write(&self.path(user), credential.trim().as_bytes())
    }

    /// Delete the stored credential for `user` (no-op if none exists).
    pub fn clear(&self, user: UserId) -> relay_core::Result<bool> {
        remove_if_exists(&self.path(user))
    }

    fn path(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("{user}.session"))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn stored_session(&self, user: UserId) -> Result<Option<String>, PlatformError> {
        let path = self.path(user);
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_owned()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PlatformError::Unavailable(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
