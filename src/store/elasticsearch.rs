//! Elasticsearch-backed document store over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::document_store::{Document, DocumentStore, IndexStatus, ScoredDocument};
use super::StoreError;
use crate::core::config::ElasticsearchSettings;

#[derive(Clone)]
pub struct ElasticsearchStore {
    base_url: String,
    index: String,
    username: Option<String>,
    password: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct IndexResponse {
    result: String,
}

#[derive(Deserialize)]
struct GetResponse {
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Source>,
}

#[derive(Deserialize)]
struct Source {
    text: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Source,
}

#[derive(Deserialize)]
struct CountResponse {
    count: usize,
}

impl ElasticsearchStore {
    pub fn new(settings: &ElasticsearchSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(!settings.verify_certs)
            .build()
            .map_err(StoreError::unavailable)?;

        if !settings.verify_certs {
            tracing::warn!("Elasticsearch certificate verification is disabled");
        }

        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            index: settings.index.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.index, path)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        self.with_auth(request)
            .send()
            .await
            .map_err(StoreError::unavailable)
    }

    async fn error_from(res: reqwest::Response) -> StoreError {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        StoreError::Unavailable(format!("Elasticsearch returned {}: {}", status, text))
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    fn backend(&self) -> &str {
        "elasticsearch"
    }

    async fn index(&self, doc: &Document) -> Result<IndexStatus, StoreError> {
        doc.validate()?;

        let url = self.url(&format!("_doc/{}", doc.id));
        let res = self
            .send(self.client.put(&url).json(&json!({
                "id": doc.id,
                "text": doc.text,
            })))
            .await?;

        if !res.status().is_success() {
            return Err(Self::error_from(res).await);
        }

        let payload: IndexResponse = res.json().await.map_err(StoreError::malformed)?;
        match payload.result.as_str() {
            "created" => Ok(IndexStatus::Created),
            "updated" | "noop" => Ok(IndexStatus::Updated),
            other => Err(StoreError::Malformed(format!(
                "unexpected index result '{}'",
                other
            ))),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let url = self.url(&format!("_doc/{}", id));
        let res = self.send(self.client.get(&url)).await?;

        // Missing documents and missing indices are both 404.
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(Self::error_from(res).await);
        }

        let payload: GetResponse = res.json().await.map_err(StoreError::malformed)?;
        if !payload.found {
            return Ok(None);
        }
        let source = payload
            .source
            .ok_or_else(|| StoreError::Malformed("found document without _source".into()))?;

        Ok(Some(Document {
            id,
            text: source.text,
        }))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>, StoreError> {
        let url = self.url("_search");
        let res = self
            .send(self.client.post(&url).json(&json!({
                "size": limit,
                "query": { "match": { "text": query } }
            })))
            .await?;

        if res.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Index '{}' does not exist yet; no hits", self.index);
            return Ok(Vec::new());
        }
        if !res.status().is_success() {
            return Err(Self::error_from(res).await);
        }

        let payload: SearchResponse = res.json().await.map_err(StoreError::malformed)?;
        payload
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let id = Uuid::parse_str(&hit.id).map_err(StoreError::malformed)?;
                Ok(ScoredDocument {
                    document: Document {
                        id,
                        text: hit.source.text,
                    },
                    score: hit.score.unwrap_or(0.0),
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let res = self.send(self.client.get(self.url("_count"))).await?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        if !res.status().is_success() {
            return Err(Self::error_from(res).await);
        }

        let payload: CountResponse = res.json().await.map_err(StoreError::malformed)?;
        Ok(payload.count)
    }
}
