//! Encrypted backup store.
//!
//! Each captured payload becomes one ciphertext file in the backup
//! directory; there is no index, enumeration is a directory listing. Records
//! are encrypted with XChaCha20-Poly1305 under a process-lifetime key that
//! never touches disk: without the in-memory key, captured files are
//! unrecoverable, which is the property the failsafe relies on. Decryption
//! is deliberately absent from normal operation.
//!
//! `erase_all` deletes every record and seals the store so a capture tick
//! racing the failsafe cannot land a file after the erasure pass.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// File extension for encrypted records.
const RECORD_EXT: &str = "enc";

/// Length of the XChaCha20 nonce prepended to each record file.
const NONCE_LEN: usize = 24;

/// Process-lifetime symmetric key for the backup store.
///
/// Generated from the OS entropy source at startup, held only in memory,
/// zeroized on drop.
pub struct BackupKey([u8; 32]);

impl BackupKey {
    /// Generate a fresh random key.
    #[must_use]
    pub fn random() -> Self {
        let mut k = [0u8; 32];
        OsRng.fill_bytes(&mut k);
        Self(k)
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for BackupKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("BackupKey(..)")
    }
}

/// Identifier of a stored record: its file name within the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// The record's file name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statistics about the backup store contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of records currently on disk.
    pub records: usize,
    /// Total ciphertext bytes on disk (nonces included).
    pub total_bytes: u64,
}

/// Encrypted, content-addressed file store for captured payloads.
///
/// Safe to share between the capture loop and the failsafe path: writes and
/// erasure serialize on an internal lock, and erasure seals the store
/// against any later write.
pub struct SecureBackupStore {
    dir: PathBuf,
    cipher: XChaCha20Poly1305,
    seq: AtomicU64,
    sealed: Mutex<bool>,
}

impl std::fmt::Debug for SecureBackupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBackupStore")
            .field("dir", &self.dir)
            .field("cipher", &"<redacted>")
            .field("seq", &self.seq)
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl SecureBackupStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be created.
    pub fn open(dir: impl AsRef<Path>, key: &BackupKey) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| Error::BackupDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        info!("backup store opened at {}", dir.display());
        Ok(Self {
            dir,
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
            seq: AtomicU64::new(0),
            sealed: Mutex::new(false),
        })
    }

    /// The backup directory this store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the store has been erased and refuses new records.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        *self.lock_sealed()
    }

    /// Encrypt `payload` and persist it as a new record.
    ///
    /// The file name is `<label>-<micros>-<seq>-<hash8>.enc`: a
    /// timestamp-derived label disambiguated by a per-process counter
    /// (unique within a run, never overwrites) and addressed by a BLAKE3
    /// prefix of the ciphertext. File contents are the 24-byte nonce
    /// followed by the ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreSealed`] after `erase_all` has run, or a
    /// storage error if encryption or the write fails.
    pub fn encrypt_and_store(&self, payload: &[u8], label: &str) -> Result<RecordId> {
        let sealed = self.lock_sealed();
        if *sealed {
            return Err(Error::StoreSealed);
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, payload)
            .map_err(|e| Error::encrypt(format!("payload encryption failed: {e}")))?;

        let hex = blake3::hash(&ciphertext).to_hex();
        let hash8 = &hex[..8];
        let micros = Utc::now().timestamp_micros();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("{label}-{micros}-{seq:06}-{hash8}.{RECORD_EXT}");

        let path = self.dir.join(&name);
        // create_new: a name collision is a bug, not something to overwrite.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(&nonce_bytes)?;
        file.write_all(&ciphertext)?;
        file.sync_all()?;

        debug!("stored record {}", name);
        Ok(RecordId(name))
    }

    /// Delete every record and seal the store.
    ///
    /// Returns `(before, after)` record counts. The counts are telemetry,
    /// not a correctness contract; individual deletion failures are logged
    /// and show up in `after`. Once this returns, no new record can ever be
    /// written through this store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be enumerated. The
    /// store is sealed even on the error path.
    pub fn erase_all(&self) -> Result<(usize, usize)> {
        let mut sealed = self.lock_sealed();
        *sealed = true;

        let records = self.list_records()?;
        let before = records.len();

        for path in records {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("failed to delete record {}: {}", path.display(), e);
            }
        }

        let after = self.list_records()?.len();
        info!("erased backup store: {} records before, {} after", before, after);
        Ok((before, after))
    }

    /// Count records currently on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be enumerated.
    pub fn count(&self) -> Result<usize> {
        Ok(self.list_records()?.len())
    }

    /// Get store statistics for the reporting collaborator.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be enumerated.
    pub fn stats(&self) -> Result<StoreStats> {
        let records = self.list_records()?;
        let total_bytes = records
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();
        Ok(StoreStats {
            records: records.len(),
            total_bytes,
        })
    }

    /// Enumerate record files in the backup directory.
    fn list_records(&self) -> Result<Vec<PathBuf>> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == RECORD_EXT) {
                records.push(path);
            }
        }
        Ok(records)
    }

    fn lock_sealed(&self) -> std::sync::MutexGuard<'_, bool> {
        // A panic while holding the lock cannot leave the flag in a bad
        // state, so recover from poisoning instead of propagating it.
        self.sealed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
