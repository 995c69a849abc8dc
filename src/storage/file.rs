//! File Store Module
//!
//! Durable one-file-per-key storage under a single directory.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::traits::{PersistentStore, StorageError};

/// Prefix for files named after the hex-encoded key. Also keeps the empty
/// key addressable as a file name.
const INLINE_PREFIX: &str = "k";
/// Prefix for files named after the SHA-256 of the key.
const DIGEST_PREFIX: &str = "h";
const TEMP_SUFFIX: &str = ".tmp";

/// Longest key that gets its own hex file name. Longer keys would overflow
/// the 255-byte file name limit once hex-encoded.
const INLINE_KEY_MAX: usize = 64;

/// Little-endian `u32` key length in front of digest-named files.
const HEADER_LEN: usize = 4;

// == Key Naming ==

fn is_digest_named(key: &[u8]) -> bool {
    key.len() > INLINE_KEY_MAX
}

fn file_name_for(key: &[u8]) -> String {
    if is_digest_named(key) {
        format!("{}{}", DIGEST_PREFIX, hex::encode(Sha256::digest(key)))
    } else {
        format!("{}{}", INLINE_PREFIX, hex::encode(key))
    }
}

fn corrupt(path: &Path) -> StorageError {
    StorageError::Backend(format!("corrupt key header in {}", path.display()))
}

// == File Store ==
/// Directory-backed store holding one file per key.
///
/// Keys up to 64 bytes are stored under their hex encoding and the file
/// holds the raw value. Longer keys are stored under the hex SHA-256 of the
/// key, and the file starts with the key length (`u32`, little-endian) and
/// the key itself so enumeration can recover it.
///
/// Writes land in a temporary file that is synced and then renamed over the
/// target, so a reader never observes a partial value. Occupied size is the
/// sum of file lengths in the directory, temporaries and key headers
/// included, so it can briefly overstate the live data set.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `location`.
    pub fn open(location: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = location.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        // Leftovers from writes interrupted before their rename
        let mut stale = 0;
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TEMP_SUFFIX));
            if is_temp {
                fs::remove_file(&path)?;
                stale += 1;
            }
        }
        debug!(root = %root.display(), stale, "Opened file store");
        Ok(Self {
            root,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Directory holding the key files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        self.root.join(file_name_for(key))
    }

    fn temp_path_for(&self, key: &[u8]) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{}.{}{}", file_name_for(key), n, TEMP_SUFFIX))
    }

    /// Recovers the key a directory entry stores, or `None` for temporaries,
    /// stray files and files removed since the listing.
    fn key_of_entry(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if name.ends_with(TEMP_SUFFIX) {
            return Ok(None);
        }
        if let Some(encoded) = name.strip_prefix(INLINE_PREFIX) {
            return Ok(hex::decode(encoded).ok());
        }
        match name.strip_prefix(DIGEST_PREFIX) {
            Some(digest) if digest.len() == 64 && hex::decode(digest).is_ok() => {
                self.read_stored_key(&self.root.join(name))
            }
            _ => Ok(None),
        }
    }

    /// Reads just the key header of a digest-named file.
    fn read_stored_key(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let file_len = file.metadata()?.len();

        let mut len = [0u8; HEADER_LEN];
        file.read_exact(&mut len).map_err(|_| corrupt(path))?;
        let key_len = u32::from_le_bytes(len) as u64;
        if key_len > file_len - HEADER_LEN as u64 {
            return Err(corrupt(path));
        }

        let mut key = vec![0u8; key_len as usize];
        file.read_exact(&mut key).map_err(|_| corrupt(path))?;
        Ok(Some(key))
    }

    #[cfg(unix)]
    fn sync_root(&self) -> io::Result<()> {
        File::open(&self.root)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_root(&self) -> io::Result<()> {
        Ok(())
    }
}

// == Persistent Store ==
impl PersistentStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        let mut bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if !is_digest_named(key) {
            return Ok(Some(bytes));
        }

        let len: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| corrupt(&path))?;
        let value_start = HEADER_LEN + u32::from_le_bytes(len) as usize;
        let stored_key = bytes.get(HEADER_LEN..value_start).ok_or_else(|| corrupt(&path))?;
        // A different key behind the same digest is not this key
        if stored_key != key {
            return Ok(None);
        }
        bytes.drain(..value_start);
        Ok(Some(bytes))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let temp = self.temp_path_for(key);
        let write = || -> io::Result<()> {
            let mut file = File::create(&temp)?;
            if is_digest_named(key) {
                let key_len = u32::try_from(key.len())
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "key too long"))?;
                file.write_all(&key_len.to_le_bytes())?;
                file.write_all(key)?;
            }
            file.write_all(value)?;
            file.sync_all()?;
            fs::rename(&temp, self.path_for(key))?;
            self.sync_root()
        };
        write().map_err(|err| {
            let _ = fs::remove_file(&temp);
            StorageError::Io(err)
        })
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }
        self.sync_root()?;
        Ok(())
    }

    fn occupied_size(&self) -> Result<u64, StorageError> {
        let mut size = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                // Renamed or deleted between listing and stat
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            if metadata.is_file() {
                size += metadata.len();
            }
        }
        Ok(size)
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Some(key) = self.key_of_entry(&name)? {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
