//! One-shot fetch cycle against a Synapse admin API
//!
//! Loads the saved checkpoint, runs a single fetch cycle, prints every new
//! signal as a JSON line on stdout, then saves the new checkpoint. The
//! checkpoint is only written after the whole cycle succeeded.

use anyhow::{Context, Result};
use clap::Parser;
use exchange::{
    CredentialHelper, CredentialResolver, FileResolver, SignalExchangeApi, SynapseQuarantinedCheckpoint,
    SynapseQuarantinedCollabConfig, SynapseQuarantinedCredentials, SynapseQuarantinedExchangeApi,
};
use fetch_state::{CheckpointStore, StoreConfig};
use signal_types::SignalType;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "synapse-quarantine-fetch",
    version,
    about = "Fetch and hash newly quarantined media from a Synapse homeserver"
)]
struct Cli {
    /// Base URL of the homeserver's admin API
    #[arg(long, env = "SYNAPSE_ADMIN_API_URL")]
    admin_api_url: String,

    /// Collaboration name
    #[arg(long, default_value = "synapse")]
    collab_name: String,

    /// Where the checkpoint is kept between runs
    #[arg(long, default_value = "synapse_quarantined_checkpoint.json")]
    state_file: PathBuf,

    /// Signal type to compute (repeatable): photo_phash, md5, url
    #[arg(long = "signal-type", value_name = "NAME", default_values = ["photo_phash", "md5"])]
    signal_types: Vec<String>,

    /// Read the access token from this file instead of the default sources
    #[arg(long)]
    access_token_file: Option<PathBuf>,

    /// Forget the saved checkpoint and start from the beginning
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let signal_types = cli
        .signal_types
        .iter()
        .map(|name| signal_types::by_name(name).with_context(|| format!("Unknown signal type: {}", name)))
        .collect::<Result<Vec<Box<dyn SignalType>>>>()?;

    let credentials = match &cli.access_token_file {
        Some(path) => {
            let resolvers: Vec<Box<dyn CredentialResolver>> = vec![Box::new(FileResolver::new(path))];
            Some(SynapseQuarantinedCredentials::resolve_with(&resolvers)?)
        }
        None => None,
    };

    let collab = SynapseQuarantinedCollabConfig::new(&cli.collab_name, &cli.admin_api_url);
    let api = SynapseQuarantinedExchangeApi::for_collab(collab, credentials)
        .context("Failed to configure the Synapse exchange")?;

    let store: CheckpointStore<SynapseQuarantinedCheckpoint> =
        CheckpointStore::new(StoreConfig::new(&cli.state_file));
    if cli.reset {
        store.clear().await?;
    }
    let checkpoint = store
        .load()
        .await
        .with_context(|| format!("Failed to load checkpoint from {}", store.path().display()))?;

    info!(
        api = SynapseQuarantinedExchangeApi::api_name(),
        collab = %cli.collab_name,
        resumed = checkpoint.is_some(),
        "Starting fetch cycle"
    );

    let requested: Vec<&dyn SignalType> = signal_types.iter().map(|s| &**s).collect();
    let delta = api.fetch_delta(&requested, checkpoint.as_ref()).await?;

    let mut updates: Vec<_> = delta.updates.iter().collect();
    updates.sort_by(|a, b| a.0.cmp(b.0));
    for ((signal_type, hash), metadata) in updates {
        let line = serde_json::json!({
            "signal_type": signal_type,
            "hash": hash,
            "mxc_uri": metadata.mxc_uri,
        });
        println!("{}", line);
    }

    store
        .save(&delta.checkpoint)
        .await
        .context("Failed to save checkpoint")?;

    info!(signals = delta.len(), "Fetch cycle complete");
    Ok(())
}
