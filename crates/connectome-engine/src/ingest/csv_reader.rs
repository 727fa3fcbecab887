use crate::catalog::{ConnectionEdge, ConnectionKind, Region};
use crate::error::CatalogError;
use serde::Deserialize;

pub trait CatalogReader {
    type Record;

    fn read(&self, content: &str) -> Result<Vec<Self::Record>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    code: String,
    display_name: String,
    #[serde(default)]
    aliases: String,
    baseline_activity: f64,
    neuroplasticity_potential: f64,
}

#[derive(Debug, Deserialize)]
struct ConnectionRow {
    endpoint_a: String,
    endpoint_b: String,
    kind: String,
    baseline_weight: f64,
}

fn reader(content: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes())
}

/// Reads `code,display_name,aliases,baseline_activity,neuroplasticity_potential`.
/// Aliases are separated by `;`.
pub struct RegionCsvReader {
    pub delimiter: u8,
}

impl Default for RegionCsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionCsvReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }
}

impl CatalogReader for RegionCsvReader {
    type Record = Region;

    fn read(&self, content: &str) -> Result<Vec<Region>, CatalogError> {
        let mut rdr = reader(content, self.delimiter);
        let mut regions = Vec::new();

        for result in rdr.deserialize::<RegionRow>() {
            let row = result?;
            let aliases: Vec<&str> = row.aliases.split(';').collect();
            regions.push(Region::new(
                &row.code,
                &row.display_name,
                &aliases,
                row.baseline_activity,
                row.neuroplasticity_potential,
            ));
        }

        Ok(regions)
    }
}

/// Reads `endpoint_a,endpoint_b,kind,baseline_weight`.
pub struct ConnectionCsvReader {
    pub delimiter: u8,
}

impl Default for ConnectionCsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionCsvReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }
}

impl CatalogReader for ConnectionCsvReader {
    type Record = ConnectionEdge;

    fn read(&self, content: &str) -> Result<Vec<ConnectionEdge>, CatalogError> {
        let mut rdr = reader(content, self.delimiter);
        let mut edges = Vec::new();

        for result in rdr.deserialize::<ConnectionRow>() {
            let row = result?;
            if row.endpoint_a.is_empty() || row.endpoint_b.is_empty() {
                continue;
            }
            let kind: ConnectionKind = row.kind.parse()?;
            edges.push(ConnectionEdge::new(
                &row.endpoint_a,
                &row.endpoint_b,
                kind,
                row.baseline_weight,
            )?);
        }

        Ok(edges)
    }
}
