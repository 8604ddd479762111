//! Storage adapters for the audit chain.
//!
//! The chain only needs `append_bytes` and `read_all` from its backing store.
//! Digests are streamed in fixed-size chunks so memory stays bounded whatever
//! the log size.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use warden_core::AuditChainEntry;

/// Chunk size used when hashing logs.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 of a byte stream, read in [`HASH_CHUNK_SIZE`] chunks, hex encoded.
pub fn stream_digest<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub trait AuditStore: Send + Sync {
    /// Durably append raw bytes.
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    fn read_all(&self) -> Result<Vec<u8>>;

    /// Current size in bytes.
    fn len(&self) -> Result<u64>;

    /// Drop everything after the first `len` bytes. Only used to undo an
    /// append whose chain entry could not be kept.
    fn truncate(&mut self, len: u64) -> Result<()>;

    /// Digest of the first `len` bytes of the store.
    fn digest_prefix(&self, len: u64) -> Result<String> {
        let all = self.read_all()?;
        let Some(prefix) = usize::try_from(len).ok().and_then(|n| all.get(..n)) else {
            bail!("audit log is shorter than {len} bytes");
        };
        Ok(stream_digest(prefix)?)
    }

    fn describe(&self) -> String;
}

/// Volatile store, used when no log path is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    buf: Vec<u8>,
}

impl AuditStore for MemoryAuditStore {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<u8>> {
        Ok(self.buf.clone())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.buf.len() as u64)
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        let len = usize::try_from(len).context("truncate length out of range")?;
        self.buf.truncate(len);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Append-only NDJSON decision log on disk.
#[derive(Debug, Clone)]
pub struct FileAuditStore {
    path: PathBuf,
}

impl FileAuditStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create audit log directory: {}", parent.display())
            })?;
        }
        info!(path = %path.display(), "Opened audit log");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditStore for FileAuditStore {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("Failed to append to audit log: {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("Failed to sync audit log: {}", self.path.display()))?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<u8>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        fs::read(&self.path)
            .with_context(|| format!("Failed to read audit log: {}", self.path.display()))
    }

    fn len(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e).with_context(|| format!("Failed to stat audit log: {}", self.path.display())),
        }
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;
        file.set_len(len)
            .with_context(|| format!("Failed to truncate audit log: {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("Failed to sync audit log: {}", self.path.display()))?;
        Ok(())
    }

    fn digest_prefix(&self, len: u64) -> Result<String> {
        let size = self.len()?;
        if len > size {
            bail!("audit log {} is {size} bytes, entry covers {len}", self.path.display());
        }
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;
        Ok(stream_digest(file.take(len))?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Snapshot of the retained chain window, rewritten after every append.
#[derive(Debug, Clone)]
pub struct ChainFile {
    path: PathBuf,
}

impl ChainFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means an empty chain.
    pub fn load(&self) -> Result<Vec<AuditChainEntry>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Chain file does not exist; starting empty");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read chain file: {}", self.path.display()))?;
        let file: ChainFileContents = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse chain file: {}", self.path.display()))?;
        Ok(file.entries)
    }

    /// Write to a temp file, then rename over the old snapshot.
    pub fn save<'a>(&self, entries: impl IntoIterator<Item = &'a AuditChainEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create chain directory: {}", parent.display())
            })?;
        }
        let contents = ChainFileContents { entries: entries.into_iter().cloned().collect() };
        let json = serde_json::to_string_pretty(&contents)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .with_context(|| format!("Failed to write temp chain file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to rename chain file to: {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ChainFileContents {
    entries: Vec<AuditChainEntry>,
}
