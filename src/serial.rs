//! Monotonic serial allocator (spec §4.D).
//!
//! LMDB has no built-in sequence counter, so the next-serial watermark lives
//! as a single entry in the `cf` (Config) database and gets advanced in
//! batches: each batch reserves `BATCH_SIZE` serials with one write
//! transaction, then hands them out from an in-process counter until the
//! batch is exhausted. A crash mid-batch burns the unused tail — serials are
//! never reused, but consecutive runs are not guaranteed gap-free.

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};
use std::sync::Mutex;

use crate::error::Result;

const BATCH_SIZE: u64 = 1000;
const WATERMARK_KEY: &[u8] = b"serial_watermark";

struct Batch {
    next: u64,
    end: u64,
}

/// Hands out strictly increasing `u64` serials, batching persistence so a
/// write transaction isn't needed for every allocation.
pub struct SerialAllocator {
    watermark_db: Database<Bytes, Bytes>,
    batch: Mutex<Batch>,
}

impl SerialAllocator {
    /// Open (or initialize) the allocator against the given database, which
    /// the caller created as part of the engine's config/control space.
    pub fn open(watermark_db: Database<Bytes, Bytes>, rtxn: &heed::RoTxn) -> Result<Self> {
        let current = read_watermark(&watermark_db, rtxn)?;
        Ok(Self {
            watermark_db,
            batch: Mutex::new(Batch {
                next: current,
                end: current,
            }),
        })
    }

    /// Allocate the next serial, reserving a fresh batch from LMDB when the
    /// in-process batch is exhausted.
    pub fn next(&self, env: &Env) -> Result<u64> {
        let mut batch = self.batch.lock().unwrap();
        if batch.next >= batch.end {
            let mut wtxn = env.write_txn()?;
            let new_end = batch.end + BATCH_SIZE;
            self.watermark_db
                .put(&mut wtxn, WATERMARK_KEY, &new_end.to_be_bytes())?;
            wtxn.commit()?;
            batch.end = new_end;
        }
        let serial = batch.next;
        batch.next += 1;
        Ok(serial)
    }

    /// Allocate the next serial using an already-open write transaction,
    /// for callers that want the watermark bump in the same transaction as
    /// the rest of an ingest (avoids a second commit per stored event once
    /// the in-process batch runs dry).
    pub fn next_in_txn(&self, wtxn: &mut RwTxn) -> Result<u64> {
        let mut batch = self.batch.lock().unwrap();
        if batch.next >= batch.end {
            let new_end = batch.end + BATCH_SIZE;
            self.watermark_db
                .put(wtxn, WATERMARK_KEY, &new_end.to_be_bytes())?;
            batch.end = new_end;
        }
        let serial = batch.next;
        batch.next += 1;
        Ok(serial)
    }
}

fn read_watermark(db: &Database<Bytes, Bytes>, rtxn: &heed::RoTxn) -> Result<u64> {
    match db.get(rtxn, WATERMARK_KEY)? {
        Some(bytes) if bytes.len() == 8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(u64::from_be_bytes(buf))
        }
        _ => Ok(0),
    }
}
