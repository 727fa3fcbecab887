use crate::mention::Document;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

const HTML_WIDTH: usize = 10_000;

#[derive(Debug, Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default)]
    body: String,
    /// Body is HTML (e.g. an abstract page) and should be flattened to text
    #[serde(default)]
    html: bool,
}

/// Flatten HTML to plain text. Falls back to the raw input if conversion fails.
pub fn html_to_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), HTML_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!("HTML conversion failed, using raw body: {}", e);
            html.to_string()
        }
    }
}

/// Parse a JSON array of `{id?, title, body?, html?}` records.
pub fn parse_documents(json: &str) -> Result<Vec<Document>> {
    let records: Vec<DocumentRecord> =
        serde_json::from_str(json).context("Failed to parse document batch")?;

    Ok(records
        .into_iter()
        .map(|r| {
            let body = if r.html { html_to_text(&r.body) } else { r.body };
            Document::new(&r.title, &body).with_id(&r.id)
        })
        .collect())
}
