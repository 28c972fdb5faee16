//! Indexed event store for a Nostr relay: binary index schema and query
//! planner over an embedded LMDB backend.
//!
//! The public surface is deliberately narrow — [`Store`] is the only type a
//! caller needs. Everything under `codec`/`keys`/`event` is the on-disk
//! format; `ingest`/`finders`/`planner` are the algorithms that read and
//! write it. See each module's doc comment for the corresponding spec
//! section.

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod finders;
pub mod fulltext;
pub mod ingest;
pub mod keys;
pub mod planner;
pub mod serial;
pub mod setalgebra;
pub mod store;

pub use config::StoreOptions;
pub use error::{Error, Result};
pub use store::Store;
