use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::records::WriteBatch;

/// Flush/sync strategy for the WAL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every batch. A commit is durable once it returns.
    #[default]
    EveryWrite,
    /// Flush to the OS page cache only.
    OsDefault,
}

/// Configuration for the write-ahead log.
#[derive(Clone, Debug, Default)]
pub struct WalConfig {
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: u64 = 8;

/// Result of scanning a log front-to-back.
#[derive(Debug, Default)]
pub struct Recovery {
    /// Every intact batch, in commit order.
    pub batches: Vec<WriteBatch>,
    /// Byte length of the intact prefix of the log.
    pub valid_len: u64,
    /// Bytes after the intact prefix (a torn or corrupt tail).
    pub discarded_bytes: u64,
}

struct WalWriter {
    /// `None` once a rollback or a post-rewrite reopen has failed.
    writer: Option<BufWriter<File>>,
    offset: u64,
}

impl WalWriter {
    fn handle(&mut self, path: &Path) -> StoreResult<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| StoreError::LogUnavailable {
            path: path.to_path_buf(),
            reason: "log handle lost after a failed write; reopen the store".into(),
        })
    }

    /// Cut the file back to `offset`, discarding bytes still buffered.
    fn rollback(&mut self, offset: u64) -> StoreResult<()> {
        let Some(stale) = self.writer.take() else {
            return Ok(());
        };
        let (file, _unwritten) = stale.into_parts();
        file.set_len(offset)?;
        self.writer = Some(BufWriter::new(file));
        self.offset = offset;
        Ok(())
    }
}

/// Append-only log of write batches.
///
/// On-disk format, one entry per committed batch:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized WriteBatch)]
/// ```
///
/// Recovery stops at the first entry that is truncated, fails its CRC, or
/// does not decode. Later batches may depend on the lost one, so nothing
/// past it is replayed.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    config: WalConfig,
}

impl WriteAheadLog {
    /// Open (or create) the log file at `path`.
    pub fn open(path: &Path, config: WalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter {
                writer: Some(BufWriter::new(file)),
                offset,
            }),
            config,
        })
    }

    /// Append one batch. Returns the byte offset of the entry.
    ///
    /// If the write fails, nothing of the entry stays in the file or in the
    /// buffer, so a later append cannot resurrect it.
    pub fn append(&self, batch: &WriteBatch) -> StoreResult<u64> {
        let payload = encode(batch)?;
        let mut w = self.lock()?;
        let entry_offset = w.offset;
        let sync = self.config.sync_mode == SyncMode::EveryWrite;

        let written = w.handle(&self.path).and_then(|out| {
            write_entry(out, &payload)?;
            out.flush()?;
            if sync {
                out.get_ref().sync_data()?;
            }
            Ok(())
        });
        if let Err(e) = written {
            abandon_entry(&mut w, entry_offset, &e);
            return Err(e);
        }
        w.offset += HEADER_SIZE + payload.len() as u64;

        debug!(offset = entry_offset, len = payload.len(), scope = %batch.scope, "WAL append");
        Ok(entry_offset)
    }

    /// Read every intact batch from the start of the log.
    pub fn recover(&self) -> StoreResult<Recovery> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut recovery = Recovery::default();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE <= file_len {
            let mut header = [0u8; HEADER_SIZE as usize];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || offset + HEADER_SIZE + u64::from(length) > file_len {
                warn!(offset, length, file_len, "invalid WAL entry length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated WAL entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; stopping recovery"
                );
                break;
            }

            match bincode::deserialize::<WriteBatch>(&payload) {
                Ok(batch) => recovery.batches.push(batch),
                Err(e) => {
                    warn!(offset, error = %e, "undecodable WAL entry; stopping recovery");
                    break;
                }
            }
            offset += HEADER_SIZE + u64::from(length);
        }

        recovery.valid_len = offset;
        recovery.discarded_bytes = file_len - offset;
        debug!(recovered = recovery.batches.len(), discarded = recovery.discarded_bytes, "WAL recovery complete");
        Ok(recovery)
    }

    /// Cut the log back to `len` bytes, dropping a torn tail.
    pub fn truncate_to(&self, len: u64) -> StoreResult<()> {
        let mut w = self.lock()?;
        let out = w.handle(&self.path)?;
        out.flush()?;
        out.get_ref().set_len(len)?;
        out.get_ref().sync_all()?;
        w.offset = len;
        debug!(len, "WAL truncated");
        Ok(())
    }

    /// Replace the whole log with `batches`.
    ///
    /// The new log is written to a temporary file in the same directory and
    /// renamed over the old one, so a crash leaves either log intact.
    pub fn rewrite(&self, batches: &[WriteBatch]) -> StoreResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut w = self.lock()?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        let mut written = 0u64;
        {
            let mut out = BufWriter::new(temp.as_file_mut());
            for batch in batches {
                let payload = encode(batch)?;
                write_entry(&mut out, &payload)?;
                written += HEADER_SIZE + payload.len() as u64;
            }
            out.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        // The old handle points at the replaced file.
        w.writer = None;
        w.writer = Some(BufWriter::new(open_append(&self.path)?));
        w.offset = written;
        debug!(batches = batches.len(), bytes = written, "WAL rewritten");
        Ok(())
    }

    /// Current write offset.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock()?.offset)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave `flushed` in the file and `buffered` in the writer, then fail
    /// the way an interrupted `append` does.
    #[cfg(test)]
    pub(crate) fn interrupt_append(&self, flushed: &[u8], buffered: &[u8]) -> StoreResult<()> {
        let mut w = self.lock()?;
        let entry_offset = w.offset;
        let out = w.handle(&self.path)?;
        out.write_all(flushed)?;
        out.flush()?;
        out.write_all(buffered)?;
        let cause = StoreError::Io(io::Error::new(io::ErrorKind::Other, "interrupted"));
        abandon_entry(&mut w, entry_offset, &cause);
        Err(cause)
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, WalWriter>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

fn abandon_entry(w: &mut WalWriter, entry_offset: u64, cause: &StoreError) {
    warn!(offset = entry_offset, error = %cause, "WAL append failed; rolling back");
    if let Err(e) = w.rollback(entry_offset) {
        w.writer = None;
        warn!(error = %e, "WAL rollback failed; refusing further appends");
    }
}

fn open_append(path: &Path) -> StoreResult<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::LogUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn encode(batch: &WriteBatch) -> StoreResult<Vec<u8>> {
    bincode::serialize(batch).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn write_entry<W: Write>(out: &mut W, payload: &[u8]) -> StoreResult<()> {
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization(format!("batch of {} bytes exceeds WAL entry limit", payload.len())))?;
    out.write_all(&length.to_le_bytes())?;
    out.write_all(&crc32fast::hash(payload).to_le_bytes())?;
    out.write_all(payload)?;
    Ok(())
}
