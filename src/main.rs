mod converge;
mod error;
mod options;
mod retry;
mod store;
mod types;

use anyhow::Result;
use clap::Parser;
use kube::{Client, ResourceExt};
use tracing_subscriber::EnvFilter;

use crate::options::{Args, ExpectOption, SelectOption};
use crate::store::KubeStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let select = SelectOption::try_from(&args)?;
    tracing::info!(?select, "select option");
    let expect = ExpectOption::from(&args);
    tracing::info!(?expect, "expect option");
    let interval = args.interval()?;

    let client = Client::try_default().await?;
    let store = KubeStore::new(client);

    let updated =
        converge::converge(&store, &select, &expect, interval, args.timeout()).await?;

    let names = updated.iter().map(|gs| gs.name()).collect::<Vec<_>>();
    tracing::info!(?names, "update GameServers done");

    Ok(())
}
