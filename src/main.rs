//! CLI surface (spec §6): open a store at `--data-dir`, record a
//! `--superuser` pubkey in the operator config blob, and close cleanly on
//! interrupt. Everything else a relay needs around this — the NIP-01
//! gateway, policy, moderation, rate limiting — lives one layer up, outside
//! this crate (spec §1 "out of scope").

use clap::Parser;
use eventdex::config::StoreOptions;
use eventdex::Store;
use nostr::PublicKey;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eventdex")]
#[command(about = "Indexed event store for a Nostr relay", long_about = None)]
struct Cli {
    /// Directory holding the LMDB environment files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Superuser public key, hex or bech32 (npub). Recorded in the operator
    /// config blob; this crate doesn't interpret it further — relay-level
    /// policy around what a superuser can do lives outside this engine.
    #[arg(long)]
    superuser: String,

    /// LMDB map size devoted to the block cache, in bytes. Ignored if
    /// `--config` is given.
    #[arg(long, default_value_t = 1024 * 1024 * 1024)]
    block_cache_size: usize,

    /// Optional TOML file with `StoreOptions` fields, overriding
    /// `--data-dir`/`--block-cache-size`.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let superuser = PublicKey::parse(&cli.superuser)
        .map_err(|e| format!("--superuser is not a valid pubkey (hex or bech32): {e}"))?;

    let options = match &cli.config {
        Some(path) => StoreOptions::from_toml_file(path)?,
        None => StoreOptions {
            data_dir: cli.data_dir.to_string_lossy().to_string(),
            block_cache_size: cli.block_cache_size,
            ..StoreOptions::default()
        },
    };
    let store = Store::open(options)?;
    store.set_config(&serde_json::json!({ "superuser": superuser.to_string() }))?;
    tracing::info!(data_dir = %cli.data_dir.display(), superuser = %superuser, "eventdex store open");

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, closing store");
    store.close()?;

    Ok(())
}
