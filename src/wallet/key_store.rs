use crate::error::{LedgerError, Result};
use crate::wallet::KeyPair;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

pub const DEFAULT_KEY_FILE: &str = "node/wallet/private_key";

/// The node's single signing key, stored as hex PKCS#8 text in one file
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> KeyStore {
        KeyStore { path: path.into() }
    }

    pub fn get_path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Generates and writes a new key; refuses to overwrite an existing one.
    ///
    /// A write that fails part way removes the file again.
    pub fn init(&self) -> Result<KeyPair> {
        let key_pair = KeyPair::generate()?;
        let text = key_pair.to_pkcs8_hex();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);
        let file = options.open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => LedgerError::KeyStore(format!(
                "a key already exists at {}",
                self.path.display()
            )),
            _ => LedgerError::from(e),
        })?;

        let mut writer = BufWriter::new(file);
        let written = writer
            .write_all(text.as_bytes())
            .and_then(|_| writer.flush());
        if let Err(e) = written {
            drop(writer);
            let _ = fs::remove_file(&self.path);
            return Err(LedgerError::KeyStore(format!(
                "failed to write key to {}: {e}",
                self.path.display()
            )));
        }
        log::info!("Created new key at {}", self.path.display());
        Ok(key_pair)
    }

    pub fn load(&self) -> Result<KeyPair> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                LedgerError::KeyStore(format!("no key found at {}", self.path.display()))
            }
            _ => LedgerError::from(e),
        })?;
        KeyPair::from_pkcs8_hex(&text)
    }

    pub fn load_or_init(&self) -> Result<KeyPair> {
        if self.exists() {
            self.load()
        } else {
            self.init()
        }
    }
}
