//! Persisted bearer token storage
//!
//! The dashboard keeps a single bearer token between runs. It is read before
//! every request and cleared when the server answers 401. On Unix the token
//! file is readable by its owner only (mode 0600).

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage for the session's bearer token
pub trait TokenStore: Send + Sync {
    /// Current token, if one is stored
    fn load(&self) -> Option<String>;

    /// Replace the stored token
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token; clearing an empty store is not an error
    fn clear(&self) -> Result<()>;
}

/// Token kept in a single file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let token = content.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(Error::InvalidInput("Refusing to store an empty token".to_string()));
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, token.trim())
            .map_err(|e| Error::TokenStore(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), "Stored bearer token");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::TokenStore(format!("{}: {}", self.path.display(), e))),
        }
    }
}

/// Write `content` to `path`, owner read/write only on Unix
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content.as_bytes())
}

/// In-process token store (tests, embedding)
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| Error::TokenStore("token lock poisoned".to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| Error::TokenStore("token lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load(), None);

        store.save("abc").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc"));

        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }
}
