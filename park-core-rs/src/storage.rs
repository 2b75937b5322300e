//! Persistent storage for lot state.
//!
//! Implements:
//! - Write-ahead journal of change batches (one JSON line per batch)
//! - Crash recovery by snapshot + journal replay
//! - Snapshot with journal compaction
//!
//! A batch is everything one lifecycle operation changed, so a batch is
//! either fully on disk or (torn trailing line) skipped on recovery.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::StorageError;
use crate::types::{BillingRecord, Receipt, Registration, Slot, SlotId, VehicleSession};

const JOURNAL_FILE: &str = "journal.log";
const SNAPSHOT_FILE: &str = "snapshot.json";

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for storage files
    pub dir: PathBuf,
    /// Flush to disk after every batch
    pub fsync_on_write: bool,
    /// Maximum journal size before a snapshot is taken (bytes)
    pub max_wal_size: u64,
    /// Maximum batches in the journal before a snapshot is taken
    pub snapshot_threshold: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./park-data"),
            fsync_on_write: true,
            max_wal_size: 10 * 1024 * 1024, // 10 MB
            snapshot_threshold: 1000,
        }
    }
}

/// One logical mutation of lot state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Change {
    #[serde(rename = "INITIALIZE")]
    Initialize,

    #[serde(rename = "OCCUPY")]
    Occupy {
        slot: SlotId,
        registration: Registration,
    },

    #[serde(rename = "RELEASE")]
    Release { registration: Registration },

    #[serde(rename = "OPEN_SESSION")]
    OpenSession(VehicleSession),

    #[serde(rename = "CLOSE_SESSION")]
    CloseSession { registration: Registration },

    #[serde(rename = "END_SESSION")]
    EndSession { registration: Registration },

    #[serde(rename = "RECORD_BILL")]
    RecordBill(BillingRecord),

    #[serde(rename = "RECORD_RECEIPT")]
    RecordReceipt(Receipt),

    #[serde(rename = "SETTLE_BILL")]
    SettleBill { bill_id: u64 },

    #[serde(rename = "SETTLE_RECEIPT")]
    SettleReceipt { receipt_id: Uuid },
}

/// Changes committed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub seq: u64,
    pub changes: Vec<Change>,
}

/// Journal line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum JournalEntry {
    #[serde(rename = "BATCH")]
    Batch(Batch),

    /// Everything up to `seq` lives in the snapshot file
    #[serde(rename = "SNAPSHOT")]
    SnapshotMarker { seq: u64 },
}

/// Full copy of lot state as of batch `seq`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub seq: u64,
    pub slots: Vec<Slot>,
    pub sessions: Vec<VehicleSession>,
    pub bills: Vec<BillingRecord>,
    pub receipts: Vec<Receipt>,
}

/// Recovered state from storage
#[derive(Debug, Default)]
pub struct Recovered {
    /// Latest snapshot (if any)
    pub snapshot: Option<LotSnapshot>,
    /// Batches committed after the snapshot, in order
    pub batches: Vec<Batch>,
}

/// Where the lot keeps its state
pub trait Storage: Send {
    /// Load everything committed so far and get ready to append
    fn recover(&mut self) -> Result<Recovered, StorageError>;

    /// Durably append one batch, returning its sequence number
    fn commit(&mut self, changes: &[Change]) -> Result<u64, StorageError>;

    /// Replace the journal prefix up to `snapshot.seq` with a full snapshot
    fn save_snapshot(&mut self, snapshot: &LotSnapshot) -> Result<(), StorageError>;

    /// Whether a snapshot is due
    fn should_snapshot(&self) -> bool;

    /// Sequence number of the last committed batch
    fn last_seq(&self) -> u64;
}

/// File-backed journal + snapshot
pub struct FileStorage {
    config: StorageConfig,
    /// Current journal file
    journal: Option<BufWriter<File>>,
    /// Current journal size
    journal_size: u64,
    /// Batches written since last snapshot
    batches_since_snapshot: usize,
    last_seq: u64,
}

impl FileStorage {
    /// Create new storage instance
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.dir)?;

        Ok(Self {
            config,
            journal: None,
            journal_size: 0,
            batches_since_snapshot: 0,
            last_seq: 0,
        })
    }

    fn open_journal(&mut self) -> Result<(), StorageError> {
        let path = self.config.dir.join(JOURNAL_FILE);
        if path.exists() {
            terminate_torn_line(&path)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        self.journal_size = file.metadata()?.len();
        self.journal = Some(BufWriter::new(file));

        debug!("Storage: Opened journal at {:?} (size={})", path, self.journal_size);
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<LotSnapshot>, StorageError> {
        let path = self.config.dir.join(SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)?;
        let snapshot: LotSnapshot = serde_json::from_str(&data)?;
        info!("Storage: Loaded snapshot at seq {}", snapshot.seq);
        Ok(Some(snapshot))
    }

    fn replay_journal(&self, after_seq: u64) -> Result<Vec<Batch>, StorageError> {
        let path = self.config.dir.join(JOURNAL_FILE);
        let mut batches = Vec::new();
        if !path.exists() {
            return Ok(batches);
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut line_num = 0;

        for line in reader.lines() {
            line_num += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Storage: Journal read error at line {}: {}", line_num, e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(JournalEntry::Batch(batch)) if batch.seq > after_seq => batches.push(batch),
                Ok(JournalEntry::Batch(_)) => {}
                Ok(JournalEntry::SnapshotMarker { seq }) => {
                    batches.retain(|b| b.seq > seq);
                }
                Err(e) => {
                    warn!("Storage: Skipping unreadable journal line {}: {}", line_num, e);
                }
            }
        }

        info!(
            "Storage: Replayed {} journal lines, {} batches recovered",
            line_num,
            batches.len()
        );
        Ok(batches)
    }

    fn write_entry(&mut self, entry: &JournalEntry) -> Result<(), StorageError> {
        let data = serde_json::to_string(entry)?;

        if let Err(e) = self.append_line(&data) {
            warn!("Storage: Journal write failed: {}", e);
            self.discard_failed_write();
            return Err(e);
        }

        self.journal_size += data.len() as u64 + 1;
        Ok(())
    }

    fn append_line(&mut self, data: &str) -> Result<(), StorageError> {
        let journal = self.journal.as_mut().ok_or(StorageError::NotOpen)?;

        writeln!(journal, "{}", data)?;
        journal.flush()?;

        if self.config.fsync_on_write {
            journal.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Cut the journal back to its last committed length.
    ///
    /// If that fails the journal stays closed: later commits fail with
    /// `NotOpen` and retry the rollback, so a rejected entry never reaches disk.
    fn discard_failed_write(&mut self) {
        // into_parts hands back the file without flushing what is still buffered
        if let Some(journal) = self.journal.take() {
            let _ = journal.into_parts();
        }

        match self.truncate_journal() {
            Ok(()) => info!("Storage: Journal rolled back to {} bytes", self.journal_size),
            Err(e) => error!("Storage: Journal closed after failed rollback: {}", e),
        }
    }

    fn truncate_journal(&mut self) -> Result<(), StorageError> {
        let path = self.config.dir.join(JOURNAL_FILE);
        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_len(self.journal_size)?;
        file.sync_data()?;
        drop(file);

        self.open_journal()
    }

    /// Start a fresh journal; everything it held is in the snapshot now
    fn compact_journal(&mut self) -> Result<(), StorageError> {
        if let Some(mut journal) = self.journal.take() {
            journal.flush()?;
        }

        let path = self.config.dir.join(JOURNAL_FILE);
        let old_path = self.config.dir.join("journal.old");

        if path.exists() {
            fs::rename(&path, &old_path)?;
        }

        self.journal_size = 0;
        self.batches_since_snapshot = 0;
        self.open_journal()?;

        if old_path.exists() {
            fs::remove_file(&old_path)?;
        }

        info!("Storage: Journal compacted");
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            journal_size: self.journal_size,
            batches_since_snapshot: self.batches_since_snapshot,
            last_seq: self.last_seq,
        }
    }
}

impl Storage for FileStorage {
    fn recover(&mut self) -> Result<Recovered, StorageError> {
        let snapshot = self.load_snapshot()?;
        let after_seq = snapshot.as_ref().map_or(0, |s| s.seq);
        let batches = self.replay_journal(after_seq)?;

        self.last_seq = batches.last().map_or(after_seq, |b| b.seq);
        self.batches_since_snapshot = batches.len();
        self.open_journal()?;

        Ok(Recovered { snapshot, batches })
    }

    fn commit(&mut self, changes: &[Change]) -> Result<u64, StorageError> {
        let seq = self.last_seq + 1;
        self.write_entry(&JournalEntry::Batch(Batch {
            seq,
            changes: changes.to_vec(),
        }))?;

        self.last_seq = seq;
        self.batches_since_snapshot += 1;
        debug!("Storage: Committed batch {} ({} changes)", seq, changes.len());
        Ok(seq)
    }

    fn save_snapshot(&mut self, snapshot: &LotSnapshot) -> Result<(), StorageError> {
        // Temp file then rename, so a crash never leaves a half-written snapshot
        let path = self.config.dir.join(SNAPSHOT_FILE);
        let temp_path = self.config.dir.join("snapshot.json.tmp");

        let data = serde_json::to_string_pretty(snapshot)?;
        fs::write(&temp_path, &data)?;
        fs::rename(&temp_path, &path)?;

        self.write_entry(&JournalEntry::SnapshotMarker { seq: snapshot.seq })?;
        self.compact_journal()?;

        info!("Storage: Saved snapshot at seq {}", snapshot.seq);
        Ok(())
    }

    fn should_snapshot(&self) -> bool {
        self.batches_since_snapshot >= self.config.snapshot_threshold
            || self.journal_size >= self.config.max_wal_size
    }

    fn last_seq(&self) -> u64 {
        self.last_seq
    }
}

/// Make sure the next append starts on a fresh line after a crash mid-write
fn terminate_torn_line(path: &Path) -> Result<(), StorageError> {
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub journal_size: u64,
    pub batches_since_snapshot: usize,
    pub last_seq: u64,
}

/// In-memory storage, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    batches: Vec<Batch>,
    snapshot: Option<LotSnapshot>,
    last_seq: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn recover(&mut self) -> Result<Recovered, StorageError> {
        Ok(Recovered {
            snapshot: self.snapshot.clone(),
            batches: self.batches.clone(),
        })
    }

    fn commit(&mut self, changes: &[Change]) -> Result<u64, StorageError> {
        self.last_seq += 1;
        self.batches.push(Batch {
            seq: self.last_seq,
            changes: changes.to_vec(),
        });
        Ok(self.last_seq)
    }

    fn save_snapshot(&mut self, snapshot: &LotSnapshot) -> Result<(), StorageError> {
        self.batches.retain(|b| b.seq > snapshot.seq);
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn should_snapshot(&self) -> bool {
        false
    }

    fn last_seq(&self) -> u64 {
        self.last_seq
    }
}
