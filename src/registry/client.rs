//! PyPI JSON API client

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;

use super::types::ReleaseInfo;
use super::{RegistryError, DEFAULT_INDEX_URL};

/// Async client for a PyPI-compatible JSON index
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Create a client for the given index base URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pydguard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = if base_url.trim().is_empty() {
            DEFAULT_INDEX_URL.to_string()
        } else {
            base_url.trim().trim_end_matches('/').to_string()
        };

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the JSON document for a project
    pub fn release_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.base_url, urlencoding::encode(name))
    }

    /// Fetch release metadata for one project
    pub async fn fetch_release(&self, name: &str) -> Result<ReleaseInfo, RegistryError> {
        let url = self.release_url(name);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(RegistryError::NotFound(name.to_string())),
            status if !status.is_success() => {
                return Err(RegistryError::Status {
                    name: name.to_string(),
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await?;
        ReleaseInfo::from_json(name, &body)
    }

    /// Fetch several projects with at most `max_concurrent` requests in flight
    ///
    /// Results are returned in input order.
    pub async fn fetch_many(
        &self,
        names: Vec<String>,
        max_concurrent: usize,
    ) -> Vec<(String, Result<ReleaseInfo, RegistryError>)> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(names.len());

        for name in names.iter().cloned() {
            let sem = semaphore.clone();
            let client = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| RegistryError::Task(e.to_string()))?;
                client.fetch_release(&name).await
            }));
        }

        let results = futures::future::join_all(handles).await;

        names
            .into_iter()
            .zip(results)
            .map(|(name, joined)| {
                let result = joined.unwrap_or_else(|e| Err(RegistryError::Task(e.to_string())));
                if let Err(ref e) = result {
                    tracing::warn!("Index lookup failed for {}: {}", name, e);
                }
                (name, result)
            })
            .collect()
    }
}
