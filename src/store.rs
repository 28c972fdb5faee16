//! Engine façade: owns the LMDB environment, every index family's database
//! handle, and the serial allocator.

use heed::types::{Bytes, Unit};
use heed::{Database, Env, EnvOpenOptions};
use nostr::{Event, EventId, Filter};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::StoreOptions;
use crate::error::Result;
use crate::serial::SerialAllocator;

/// One `Database` handle per index family. Families with no value column
/// are `Database<Bytes, Unit>`; the families with real payloads (`ev`/`cf`
/// JSON blob, `la`/`ac` timestamps and counts) are `Database<Bytes, Bytes>`.
pub(crate) struct Families {
    pub event: Database<Bytes, Bytes>,
    pub config: Database<Bytes, Bytes>,
    pub id: Database<Bytes, Unit>,
    pub full_index: Database<Bytes, Unit>,
    pub pubkey: Database<Bytes, Unit>,
    pub kind: Database<Bytes, Unit>,
    pub created_at: Database<Bytes, Unit>,
    pub pubkey_created_at: Database<Bytes, Unit>,
    pub kind_created_at: Database<Bytes, Unit>,
    pub kind_pubkey_created_at: Database<Bytes, Unit>,
    pub tag_a: Database<Bytes, Unit>,
    pub tag_identifier: Database<Bytes, Unit>,
    pub tag_event: Database<Bytes, Unit>,
    pub tag_pubkey: Database<Bytes, Unit>,
    pub tag_hashtag: Database<Bytes, Unit>,
    pub tag_letter: Database<Bytes, Unit>,
    pub tag_protected: Database<Bytes, Unit>,
    pub tag_nonstandard: Database<Bytes, Unit>,
    pub fulltext_word: Database<Bytes, Unit>,
    pub first_seen: Database<Bytes, Unit>,
    pub last_accessed: Database<Bytes, Bytes>,
    pub access_counter: Database<Bytes, Bytes>,
}

/// The indexed event store. Clone is cheap (an `Arc` around the LMDB
/// environment handle plus the family database handles, which are
/// themselves small `Copy` handles in `heed`).
#[derive(Clone)]
pub struct Store {
    pub(crate) env: Arc<Env>,
    pub(crate) families: Arc<Families>,
    pub(crate) serials: Arc<SerialAllocator>,
    pub(crate) options: StoreOptions,
}

impl Store {
    /// Open (creating if absent) the LMDB environment at `options.data_dir`
    /// and every family database it needs.
    pub fn open(options: StoreOptions) -> Result<Self> {
        fs::create_dir_all(&options.data_dir)?;

        let mut builder = EnvOpenOptions::new();
        builder.max_dbs(24);
        builder.map_size(options.block_cache_size.max(1024 * 1024));
        let env = unsafe { builder.open(Path::new(&options.data_dir))? };

        let mut wtxn = env.write_txn()?;
        let event = env.create_database(&mut wtxn, Some("ev"))?;
        let config = env.create_database(&mut wtxn, Some("cf"))?;
        let id = env.create_database(&mut wtxn, Some("id"))?;
        let full_index = env.create_database(&mut wtxn, Some("fi"))?;
        let pubkey = env.create_database(&mut wtxn, Some("pk"))?;
        let kind = env.create_database(&mut wtxn, Some("ki"))?;
        let created_at = env.create_database(&mut wtxn, Some("ca"))?;
        let pubkey_created_at = env.create_database(&mut wtxn, Some("pc"))?;
        let kind_created_at = env.create_database(&mut wtxn, Some("kc"))?;
        let kind_pubkey_created_at = env.create_database(&mut wtxn, Some("kp"))?;
        let tag_a = env.create_database(&mut wtxn, Some("ta"))?;
        let tag_identifier = env.create_database(&mut wtxn, Some("td"))?;
        let tag_event = env.create_database(&mut wtxn, Some("te"))?;
        let tag_pubkey = env.create_database(&mut wtxn, Some("tp"))?;
        let tag_hashtag = env.create_database(&mut wtxn, Some("tt"))?;
        let tag_letter = env.create_database(&mut wtxn, Some("t_letter"))?;
        let tag_protected = env.create_database(&mut wtxn, Some("t_protected"))?;
        let tag_nonstandard = env.create_database(&mut wtxn, Some("t_nonstandard"))?;
        let fulltext_word = env.create_database(&mut wtxn, Some("fw"))?;
        let first_seen = env.create_database(&mut wtxn, Some("fs"))?;
        let last_accessed = env.create_database(&mut wtxn, Some("la"))?;
        let access_counter = env.create_database(&mut wtxn, Some("ac"))?;
        wtxn.commit()?;

        let rtxn = env.read_txn()?;
        let serials = SerialAllocator::open(config, &rtxn)?;
        drop(rtxn);

        Ok(Self {
            env: Arc::new(env),
            families: Arc::new(Families {
                event,
                config,
                id,
                full_index,
                pubkey,
                kind,
                created_at,
                pubkey_created_at,
                kind_created_at,
                kind_pubkey_created_at,
                tag_a,
                tag_identifier,
                tag_event,
                tag_pubkey,
                tag_hashtag,
                tag_letter,
                tag_protected,
                tag_nonstandard,
                fulltext_word,
                first_seen,
                last_accessed,
                access_counter,
            }),
            serials: Arc::new(serials),
            options,
        })
    }

    /// Persist a validated event. Delegates to `crate::ingest::store`.
    pub fn store_event(&self, event: &Event) -> Result<()> {
        crate::ingest::store(self, event)
    }

    /// Delete an event and every secondary entry that references it, by
    /// serial. Returns `false` if the serial had no event.
    pub fn delete(&self, serial: u64) -> Result<bool> {
        crate::ingest::delete(self, serial)
    }

    /// Delete an event and every secondary entry that references it, by full
    /// id. Returns `false` if the id was never stored (or was already
    /// deleted).
    pub fn delete_by_id(&self, id: &EventId) -> Result<bool> {
        crate::ingest::delete_by_id(self, id)
    }

    /// Point lookup by full event id (`find_serial_by_id` + `event_by_serial`,
    /// composed).
    pub fn get_by_id(&self, id: &EventId) -> Result<Option<Event>> {
        let rtxn = self.env.read_txn()?;
        let serial = crate::finders::find_serial_by_id(self, &rtxn, id)?;
        match serial {
            Some(serial) => {
                let event = crate::finders::event_by_serial(self, &rtxn, serial)?;
                crate::finders::touch(self, serial)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    /// Run a NIP-01 filter through the query planner.
    pub fn filter(&self, filter: &Filter) -> Result<Vec<Event>> {
        crate::planner::run(self, filter, None)
    }

    /// Run a filter that may carry a `search` term through the fulltext
    /// dimension in addition to the structural planner.
    pub fn filter_with_search(&self, filter: &Filter) -> Result<Vec<Event>> {
        crate::planner::run_with_search(self, filter, None)
    }

    /// Same as `filter`, but aborts mid-scan if `cancel` fires.
    pub fn filter_cancellable(
        &self,
        filter: &Filter,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<Vec<Event>> {
        crate::planner::run(self, filter, Some(cancel))
    }

    /// Read the operator config blob (`cf` family).
    pub fn get_config(&self) -> Result<Option<serde_json::Value>> {
        let rtxn = self.env.read_txn()?;
        match self
            .families
            .config
            .get(&rtxn, &crate::keys::config_key())?
        {
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the operator config blob.
    pub fn set_config(&self, value: &serde_json::Value) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        let raw = serde_json::to_vec(value)?;
        self.families
            .config
            .put(&mut wtxn, &crate::keys::config_key(), &raw)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Close the environment, compacting on the way out if configured
    /// (`compact_on_close`).
    pub fn close(self) -> Result<()> {
        if self.options.compact_on_close {
            // heed doesn't expose an explicit compacting close; LMDB
            // reclaims free pages on the next write anyway. We still force
            // a final sync so the spec's "closes the store cleanly"
            // contract is met.
            self.env.force_sync()?;
        }
        Ok(())
    }
}
