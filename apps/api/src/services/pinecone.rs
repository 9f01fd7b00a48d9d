use crate::{
    error::{ApiError, Result},
    services::{
        tagged_document::TaggedDocument,
        vector_index::{SearchHit, VectorIndex},
    },
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Queries a Pinecone index whose match metadata carries the tagged
/// description under `text`.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    namespace: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

impl PineconeIndex {
    /// `host` is the index endpoint, e.g. `https://books-abc123.svc.us-east-1.pinecone.io`.
    pub fn new(api_key: &str, host: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| ApiError::ConfigError(format!("invalid Pinecone API key: {}", e)))?;
        headers.insert("Api-Key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            host,
            namespace: None,
        })
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Recover identifiers from matches, in the order Pinecone returned them.
fn hits_from_response(response: QueryResponse) -> Result<Vec<SearchHit>> {
    response
        .matches
        .into_iter()
        .map(|m| {
            let payload = m
                .metadata
                .and_then(|meta| meta.text)
                .unwrap_or_else(|| m.id.clone());
            let document = TaggedDocument::decode(&payload).map_err(|e| {
                ApiError::RetrievalUnavailable(format!("index match '{}': {}", m.id, e))
            })?;
            Ok(SearchHit {
                isbn13: document.isbn13,
                score: m.score,
            })
        })
        .collect()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let request = QueryRequest {
            namespace: self.namespace.as_deref(),
            vector,
            top_k: k,
            include_values: false,
            include_metadata: true,
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::RetrievalUnavailable(format!(
                "Pinecone query failed ({}): {}",
                status, error_text
            )));
        }

        let query_response: QueryResponse = response.json().await?;
        let hits = hits_from_response(query_response)?;
        debug!("Pinecone returned {} matches (k={})", hits.len(), k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, unreachable_base};
    use serde_json::json;

    #[test]
    fn test_query_request_shape() {
        let vector = [0.5_f32, 0.25];
        let request = QueryRequest {
            namespace: None,
            vector: &vector,
            top_k: 50,
            include_values: false,
            include_metadata: true,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "vector": [0.5, 0.25],
                "topK": 50,
                "includeValues": false,
                "includeMetadata": true
            })
        );
    }

    #[test]
    fn test_hits_decoded_from_text_payload() {
        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                { "id": "a", "score": 0.9, "metadata": { "text": "\"3 Third book\"" } },
                { "id": "b", "score": 0.8, "metadata": { "text": "1 First book" } },
                { "id": "2", "score": 0.7 }
            ],
            "namespace": ""
        }))
        .unwrap();

        let hits = hits_from_response(response).unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.isbn13).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(hits[0].score, 0.9);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [{ "id": "x", "score": 0.9, "metadata": { "text": "no id here" } }]
        }))
        .unwrap();

        assert!(matches!(
            hits_from_response(response),
            Err(ApiError::RetrievalUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_query_decodes_matches() {
        let base = serve(vec![(
            "200 OK",
            json!({
                "matches": [
                    { "id": "a", "score": 0.9, "metadata": { "text": "5 Fifth book" } },
                    { "id": "b", "score": 0.4, "metadata": { "text": "\"2 Second book\"" } }
                ]
            })
            .to_string(),
        )])
        .await;

        let index = PineconeIndex::new("key", &base).unwrap();
        let hits = index.query(&[0.1, 0.2], 2).await.unwrap();
        assert_eq!(
            hits,
            vec![
                SearchHit { isbn13: 5, score: 0.9 },
                SearchHit { isbn13: 2, score: 0.4 },
            ]
        );
    }

    #[tokio::test]
    async fn test_error_status_is_retrieval_unavailable() {
        let base = serve(vec![(
            "500 Internal Server Error",
            r#"{"message":"index is scaling"}"#.to_string(),
        )])
        .await;

        let index = PineconeIndex::new("key", &base).unwrap();
        match index.query(&[0.1], 3).await {
            Err(ApiError::RetrievalUnavailable(msg)) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("index is scaling"));
            }
            other => panic!("expected RetrievalUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_retrieval_unavailable() {
        let index = PineconeIndex::new("key", &unreachable_base().await).unwrap();
        let result = index.query(&[0.1], 3).await;
        assert!(matches!(result, Err(ApiError::RetrievalUnavailable(_))));
    }

    #[test]
    fn test_host_gets_scheme() {
        let index = PineconeIndex::new("key", "books.svc.pinecone.io/").unwrap();
        assert_eq!(index.host, "https://books.svc.pinecone.io");
    }
}
