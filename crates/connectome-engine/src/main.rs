use anyhow::{bail, Context, Result};
use connectome_core::config::EngineConfig;
use connectome_core::ingest::{CatalogLoader, PROFILES_FILE};
use connectome_core::modulation::DurationScale;
use connectome_core::Simulation;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

const USAGE: &str = "usage: connectome <documents.json> <intervention> <setting> <short|standard|extended>";

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON report only
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let [_, documents_path, intervention, setting, duration] = args.as_slice() else {
        bail!(USAGE);
    };
    let duration: DurationScale = duration.parse()?;

    let config = EngineConfig::from_env()?;
    let profiles_path = env::var("CONNECTOME_PROFILES_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config.catalog_path.join(PROFILES_FILE));

    let catalog = Arc::new(CatalogLoader::load_directory(&config.catalog_path).await?);
    let library = CatalogLoader::load_profiles(&profiles_path).await?;
    library.warn_unknown_pairs(&catalog.regions);
    let profile = library.profile(intervention, setting, duration)?;

    let documents = CatalogLoader::load_documents(&PathBuf::from(documents_path)).await?;
    let simulation = Simulation::new(catalog, config)?;
    let outcome = simulation.run(&documents, &profile)?;

    let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise report")?;
    println!("{}", json);

    Ok(())
}
