use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{DeployError, DeployResult};

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Url,
    pub access_token: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_str())
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl DatabaseConfig {
    pub fn new(url: &str, access_token: impl Into<String>) -> DeployResult<Self> {
        let url = Url::parse(url)?;
        if url.cannot_be_a_base() {
            return Err(DeployError::InvalidDatabaseUrl(url.to_string()));
        }

        Ok(Self {
            url,
            access_token: access_token.into(),
        })
    }

    /// REST endpoint of a slash-separated database path, e.g. `uid/device/firmware/bin.json`.
    ///
    /// Each key is percent-encoded on its own, so `?`, `#` and `%` stay inside their node.
    pub fn endpoint(&self, path: &str) -> DeployResult<Url> {
        let keys: Vec<&str> = path.split('/').filter(|key| !key.is_empty()).collect();
        let mut url = self.url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DeployError::InvalidDatabaseUrl(self.url.to_string()))?;
            segments.pop_if_empty();
            match keys.split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{}.json", last));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        Ok(url)
    }
}

/// Client for the tree-structured realtime database REST API
#[derive(Debug)]
pub struct RealtimeDbClient {
    config: DatabaseConfig,
    client: Client,
}

impl RealtimeDbClient {
    pub fn new(config: DatabaseConfig) -> DeployResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Reads the subtree at `path`; an empty location reads as `Value::Null`
    pub async fn get(&self, path: &str) -> DeployResult<Value> {
        let url = self.config.endpoint(path)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        let response = Self::check_status(path, response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Overwrites the value at `path`
    pub async fn set<T>(&self, path: &str, value: &T) -> DeployResult<()>
    where
        T: Serialize + ?Sized,
    {
        let mut url = self.config.endpoint(path)?;
        url.query_pairs_mut().append_pair("print", "silent");
        debug!("PUT {}", url);

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.config.access_token)
            .json(value)
            .send()
            .await?;

        Self::check_status(path, response).await?;
        Ok(())
    }

    async fn check_status(path: &str, response: Response) -> DeployResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DeployError::Unauthorized {
                path: path.to_string(),
                status: status.as_u16(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(DeployError::Database {
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
