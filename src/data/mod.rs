//! Dataset loading: remote (http/https) or local documents, parsed into
//! records with malformed entries skipped. Failures are returned to the
//! caller, which logs them and leaves its view empty; there is no retry.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::logging::{log_dataset, obj, v_str, warn, Domain, ProfileScope};

pub mod outlets;
pub mod stories;

pub use outlets::{parse_outlets, OutletRow};
pub use stories::{parse_stories, Article, Story};

/// Where a dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("empty dataset location");
        }
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Location::Remote(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Location::Local)
                .map_err(|_| anyhow!("bad file url: {}", raw)),
            // Relative paths and Windows drive letters land here.
            _ => Ok(Location::Local(PathBuf::from(raw))),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Remote(url) => write!(f, "{}", url),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches the raw text of a dataset.
#[async_trait]
pub trait Fetch {
    async fn fetch_text(&self, location: &Location) -> Result<String>;
}

/// reqwest for remote documents, the filesystem for local ones.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, location: &Location) -> Result<String> {
        match location {
            Location::Remote(url) => {
                let resp = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("GET {}", url))?;
                let status = resp.status();
                if !status.is_success() {
                    bail!("GET {} returned {}", url, status);
                }
                resp.text().await.with_context(|| format!("reading body of {}", url))
            }
            Location::Local(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display())),
        }
    }
}

/// Parsed dataset plus bookkeeping for logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loaded<T> {
    pub source: String,
    pub records: Vec<T>,
    pub skipped: usize,
    pub sha256: String,
}

pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn load_stories<F: Fetch + ?Sized>(fetcher: &F, location: &Location) -> Result<Loaded<Story>> {
    let text = fetcher.fetch_text(location).await?;
    let _scope = ProfileScope::with_context("parse_stories", &[("bytes", serde_json::json!(text.len()))]);
    let (records, skipped) =
        parse_stories(&text).map_err(|e| anyhow!(e)).with_context(|| format!("parsing {}", location))?;
    let loaded = Loaded {
        source: location.to_string(),
        records,
        skipped,
        sha256: fingerprint(&text),
    };
    log_dataset(&loaded.source, "stories", loaded.records.len(), loaded.skipped, &loaded.sha256);
    Ok(loaded)
}

pub async fn load_outlets<F: Fetch + ?Sized>(fetcher: &F, location: &Location) -> Result<Loaded<OutletRow>> {
    let text = fetcher.fetch_text(location).await?;
    let _scope = ProfileScope::with_context("parse_outlets", &[("bytes", serde_json::json!(text.len()))]);
    if let Some(first) = text.lines().find(|l| !l.trim().is_empty()) {
        let header: Vec<String> = outlets::split_record(first)
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();
        let schema = outlets::validate_header(&header);
        if !schema.ok {
            warn(
                Domain::Data,
                "schema_mismatch",
                obj(&[
                    ("source", v_str(&location.to_string())),
                    ("missing", serde_json::json!(schema.missing)),
                ]),
            );
        }
    }
    let (records, skipped) =
        parse_outlets(&text).map_err(|e| anyhow!(e)).with_context(|| format!("parsing {}", location))?;
    let loaded = Loaded {
        source: location.to_string(),
        records,
        skipped,
        sha256: fingerprint(&text),
    };
    log_dataset(&loaded.source, "outlets", loaded.records.len(), loaded.skipped, &loaded.sha256);
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_parses_urls_and_paths() {
        assert!(matches!(
            Location::parse("https://example.com/a.json").unwrap(),
            Location::Remote(_)
        ));
        assert_eq!(
            Location::parse("dist/a.json").unwrap(),
            Location::Local(PathBuf::from("dist/a.json"))
        );
        assert!(Location::parse("   ").is_err());
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("[]");
        assert_eq!(a, fingerprint("[]"));
        assert_ne!(a, fingerprint("[ ]"));
        assert_eq!(a.len(), 64);
    }
}
