//! Client for the memory knowledge-graph HTTP API
//!
//! The graph service stores named entities and free-text observations about
//! them. Every endpoint takes and returns JSON; responses are passed through
//! unchanged.

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Observation source recorded when the caller gives none
pub const DEFAULT_OBSERVATION_SOURCE: &str = "claude-skill";

/// A new entity: a name, a type, and any extra fields the service accepts
#[derive(Debug, Clone, Serialize)]
pub struct NewEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
struct NewObservation<'a> {
    entity_name: &'a str,
    content: &'a str,
    source: &'a str,
}

pub struct GraphClient {
    client: Client,
    base_url: Url,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid graph service URL: {}", e)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }

    /// `POST /memory/entity`
    pub async fn create_entity(&self, entity: &NewEntity) -> Result<Value> {
        if entity.name.is_empty() || entity.entity_type.is_empty() {
            return Err(Error::InvalidInput("Missing name or type".to_string()));
        }

        let url = self.endpoint("/memory/entity")?;
        debug!(name = %entity.name, "Creating graph entity");
        self.send(self.client.post(url).json(entity)).await
    }

    /// `POST /memory/observation`
    pub async fn add_observation(
        &self,
        entity_name: &str,
        content: &str,
        source: Option<&str>,
    ) -> Result<Value> {
        if entity_name.is_empty() || content.is_empty() {
            return Err(Error::InvalidInput(
                "Missing entity_name or content".to_string(),
            ));
        }

        let url = self.endpoint("/memory/observation")?;
        let body = NewObservation {
            entity_name,
            content,
            source: source
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_OBSERVATION_SOURCE),
        };
        debug!(entity = %entity_name, "Adding graph observation");
        self.send(self.client.post(url).json(&body)).await
    }

    /// `GET /memory/search?q=<query>`
    pub async fn search_entities(&self, query: &str) -> Result<Value> {
        if query.is_empty() {
            return Err(Error::InvalidInput("Missing query".to_string()));
        }

        let mut url = self.endpoint("/memory/search")?;
        url.query_pairs_mut().append_pair("q", query);
        self.send(self.client.get(url)).await
    }

    /// `GET /memory/graph/<entity_name>`
    pub async fn get_graph(&self, entity_name: &str) -> Result<Value> {
        if entity_name.is_empty() {
            return Err(Error::InvalidInput("Missing entity_name".to_string()));
        }

        let mut url = self.endpoint("/memory/graph/")?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid graph service URL: {}", self.base_url)))?
            .pop_if_empty()
            .push(entity_name);
        self.send(self.client.get(url)).await
    }
}
