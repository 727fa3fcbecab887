use crate::catalog::{ConnectivityCatalog, ReferenceCatalog, RegionCatalog};
use crate::mention::Document;
use crate::modulation::ProfileLibrary;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub mod csv_reader;
pub mod documents;

use csv_reader::{CatalogReader, ConnectionCsvReader, RegionCsvReader};

pub const REGIONS_FILE: &str = "regions.csv";
pub const CONNECTIONS_FILE: &str = "connections.csv";
pub const PROFILES_FILE: &str = "profiles.json";

/// Loads reference data and request inputs from disk.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Parse both catalogs from CSV text.
    pub fn from_csv(regions_csv: &str, connections_csv: &str) -> Result<ReferenceCatalog> {
        let regions = RegionCsvReader::new()
            .read(regions_csv)
            .context("Failed to read region catalog")?;
        let regions = RegionCatalog::new(regions).context("Invalid region catalog")?;

        let edges = ConnectionCsvReader::new()
            .read(connections_csv)
            .context("Failed to read connectivity catalog")?;
        let connections = ConnectivityCatalog::new(edges);

        Ok(ReferenceCatalog::new(regions, connections))
    }

    /// Load `regions.csv` and `connections.csv` from a directory.
    pub async fn load_directory(dir_path: &Path) -> Result<ReferenceCatalog> {
        let regions_csv = read(&dir_path.join(REGIONS_FILE)).await?;
        let connections_csv = read(&dir_path.join(CONNECTIONS_FILE)).await?;

        let catalog = Self::from_csv(&regions_csv, &connections_csv)?;
        info!(
            regions = catalog.regions.len(),
            connections = catalog.connections.len(),
            path = %dir_path.display(),
            "Reference catalog loaded"
        );
        Ok(catalog)
    }

    pub async fn load_profiles(path: &Path) -> Result<ProfileLibrary> {
        let json = read(path).await?;
        let library = ProfileLibrary::from_json(&json)
            .with_context(|| format!("Invalid profile library: {:?}", path))?;
        info!(
            interventions = library.interventions.len(),
            settings = library.settings.len(),
            "Profile library loaded"
        );
        Ok(library)
    }

    pub async fn load_documents(path: &Path) -> Result<Vec<Document>> {
        let json = read(path).await?;
        documents::parse_documents(&json)
    }
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {:?}", path))
}
