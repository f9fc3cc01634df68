use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::error::PersistError;

/// Per-peer mutable state, guarded by one mutex covering `owned`,
/// `inflight`, and file writes together. `active` (the in-flight task
/// handles) deliberately lives outside this type — it's only ever
/// touched by the single scheduling loop, which keeps it in lockstep
/// with `inflight`.
pub struct SharedPieces {
    inner: Mutex<Inner>,
}

struct Inner {
    owned: HashSet<u32>,
    inflight: HashSet<u32>,
    file: File,
}

impl SharedPieces {
    /// Opens (creating if needed) the backing file and pre-extends it to
    /// `total_bytes` (sparse allocation is fine). `seed_all` starts `owned`
    /// at the full index range, for a peer that already has every piece.
    pub fn open(path: &Path, total_bytes: u64, piece_count: u32, seed_all: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.set_len(total_bytes)?;

        let owned = if seed_all {
            (0..piece_count).collect()
        } else {
            HashSet::new()
        };

        Ok(Self {
            inner: Mutex::new(Inner {
                owned,
                inflight: HashSet::new(),
                file,
            }),
        })
    }

    pub fn owned_snapshot(&self) -> Vec<u32> {
        self.inner.lock().expect("peer mutex poisoned").owned.iter().copied().collect()
    }

    pub fn owned_len(&self) -> usize {
        self.inner.lock().expect("peer mutex poisoned").owned.len()
    }

    pub fn is_owned(&self, idx: u32) -> bool {
        self.inner.lock().expect("peer mutex poisoned").owned.contains(&idx)
    }

    pub fn is_inflight(&self, idx: u32) -> bool {
        self.inner.lock().expect("peer mutex poisoned").inflight.contains(&idx)
    }

    /// Marks `idx` in-flight. Returns `false` if it was already owned or
    /// already in-flight — `owned` and `inflight` are always disjoint.
    pub fn mark_inflight(&self, idx: u32) -> bool {
        let mut inner = self.inner.lock().expect("peer mutex poisoned");
        if inner.owned.contains(&idx) || inner.inflight.contains(&idx) {
            return false;
        }
        inner.inflight.insert(idx);
        true
    }

    /// Reaping path for a failed/cancelled download.
    pub fn clear_inflight(&self, idx: u32) {
        self.inner.lock().expect("peer mutex poisoned").inflight.remove(&idx);
    }

    /// A lock-free-from-the-caller's-perspective snapshot of both sets, for
    /// building the rarest-first candidate map. The scheduler tick only
    /// ever holds the lock for this brief read.
    pub fn snapshot(&self) -> (HashSet<u32>, HashSet<u32>) {
        let inner = self.inner.lock().expect("peer mutex poisoned");
        (inner.owned.clone(), inner.inflight.clone())
    }

    /// Writes a completed piece's bytes at `idx`, then atomically (under
    /// the same lock) marks it owned and no longer in-flight, so the file
    /// write and the `owned` mutation are never observed out of sync.
    /// `piece_size` bounds the write offset.
    pub fn persist_piece(&self, idx: u32, data: &[u8], piece_size: u64) -> Result<(), PersistError> {
        let mut inner = self.inner.lock().expect("peer mutex poisoned");
        inner.file.seek(SeekFrom::Start(idx as u64 * piece_size))?;
        inner.file.write_all(data)?;
        inner.owned.insert(idx);
        inner.inflight.remove(&idx);
        Ok(())
    }

    pub fn is_complete(&self, piece_count: u32) -> bool {
        self.owned_len() as u32 >= piece_count
    }
}
