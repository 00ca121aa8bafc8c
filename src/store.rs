use std::fs;
use std::path::{Path, PathBuf};

use croco_token::CrocoToken;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no ledger at {0}, run `croco init` first")]
    Missing(PathBuf),

    #[error("a ledger already exists at {0}, pass --force to replace it")]
    Exists(PathBuf),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt ledger state in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file holding the whole ledger between invocations.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CrocoToken, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let bytes = fs::read(&self.path).map_err(|source| self.io(source))?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the new ledger next to the old one, then swap it in.
    pub fn save(&self, token: &CrocoToken) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(token).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io(source))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).map_err(|source| self.io(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io(source))?;
        log::debug!("ledger saved to {}", self.path.display());
        Ok(())
    }

    pub fn create(&self, token: &CrocoToken, force: bool) -> Result<(), StoreError> {
        if self.path.exists() && !force {
            return Err(StoreError::Exists(self.path.clone()));
        }
        self.save(token)
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use croco_token::{tokens, Address, TokenConfig};

    #[test]
    fn saved_ledger_loads_back_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        let owner = Address::from_label("owner");
        let mut token = CrocoToken::new(owner, TokenConfig::default()).unwrap();
        token.mint(owner, owner, tokens(100_000)).unwrap();
        token
            .add_or_get_referrer(owner, owner, Address::from_label("acc1"))
            .unwrap();

        store.create(&token, false).unwrap();
        assert_eq!(store.load().unwrap(), token);
        assert!(matches!(
            store.create(&token, false),
            Err(StoreError::Exists(_))
        ));
        store.create(&token, true).unwrap();
    }

    #[test]
    fn missing_ledger_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(matches!(store.load(), Err(StoreError::Missing(_))));
    }
}
