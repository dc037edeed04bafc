// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NLP Clients
//!
//! Adapters for the `EmbeddingService` and `KeywordExtractor` contracts.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Remote NLP service client plus deterministic local fallbacks
//!
//! The HTTP client talks to a sentence-embedding / keyword-extraction service
//! with two JSON endpoints:
//!
//! | Route | Request | Response |
//! |-------|---------|----------|
//! | `POST /embed` | `{"text": ..}` | `{"embedding": [f32]}` |
//! | `POST /keywords` | `{"text": .., "k": n}` | `{"keywords": [..], "weights": [..]}` |
//!
//! `HashEmbeddingClient` and `FrequencyKeywordExtractor` need no network and
//! are deterministic, which the tests and the CLI rely on.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::engine_config::{NlpProviderKind, NlpSettings};
use crate::domain::nlp::{EmbeddingService, KeywordExtractor, KeywordSet, NlpError};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct KeywordsRequest<'a> {
    text: &'a str,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct KeywordsResponse {
    keywords: Vec<String>,
    #[serde(default)]
    weights: Vec<f32>,
}

/// Client for a remote NLP service
pub struct HttpNlpClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpNlpClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NlpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NlpError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> NlpError {
        if err.is_timeout() {
            NlpError::Timeout(self.timeout.as_secs())
        } else {
            NlpError::Network(err.to_string())
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, NlpError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match response.status() {
            StatusCode::OK => response
                .json::<R>()
                .await
                .map_err(|e| NlpError::InvalidResponse(e.to_string())),
            status => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("HTTP {}", status));
                Err(NlpError::Service {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl EmbeddingService for HttpNlpClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NlpError> {
        let response: EmbedResponse = self.post("/embed", &EmbedRequest { text }).await?;
        if response.embedding.is_empty() {
            return Err(NlpError::EmptyResult("embedding".to_string()));
        }
        Ok(response.embedding)
    }
}

#[async_trait]
impl KeywordExtractor for HttpNlpClient {
    async fn extract_keywords(&self, text: &str, k: usize) -> Result<KeywordSet, NlpError> {
        let response: KeywordsResponse = self.post("/keywords", &KeywordsRequest { text, k }).await?;
        let weights = if response.weights.is_empty() {
            vec![1.0; response.keywords.len()]
        } else {
            response.weights
        };
        KeywordSet::new(response.keywords, weights)
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z][a-z0-9'\-]*[a-z0-9]|[a-z]").expect("valid token pattern"))
}

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "because", "been",
    "but", "by", "can", "could", "did", "do", "does", "each", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "more", "most", "my", "no",
    "not", "of", "on", "one", "only", "or", "other", "our", "out", "over", "she", "so", "some", "such",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "to",
    "up", "us", "very", "was", "we", "were", "what", "when", "which", "while", "who", "will", "with",
    "would", "you", "your",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Lowercased content tokens of `text`, stopwords and one-letter words removed.
pub fn content_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !stopwords().contains(t))
        .map(str::to_string)
        .collect()
}

/// Bag-of-tokens embedding: each token is hashed into a signed bucket.
/// Texts sharing vocabulary get a positive cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbeddingClient {
    dimensions: usize,
}

impl HashEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashEmbeddingClient {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NlpError> {
        let tokens = content_tokens(text);
        if tokens.is_empty() {
            return Err(NlpError::EmptyResult(format!("no content tokens in {:?}", text)));
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for token in &tokens {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }
        Ok(embedding)
    }
}

/// Ranks content tokens by frequency; ties keep first-seen order. Weights
/// are counts relative to the most frequent token.
#[derive(Debug, Clone, Default)]
pub struct FrequencyKeywordExtractor;

#[async_trait]
impl KeywordExtractor for FrequencyKeywordExtractor {
    async fn extract_keywords(&self, text: &str, k: usize) -> Result<KeywordSet, NlpError> {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for token in content_tokens(text) {
            match slots.get(&token) {
                Some(&slot) => order[slot].1 += 1,
                None => {
                    slots.insert(token.clone(), order.len());
                    order.push((token, 1));
                }
            }
        }
        order.sort_by(|a, b| b.1.cmp(&a.1));
        order.truncate(k);

        let top = order.first().map_or(1, |(_, count)| *count) as f32;
        let (keywords, weights) = order
            .into_iter()
            .map(|(token, count)| (token, count as f32 / top))
            .unzip();
        KeywordSet::new(keywords, weights)
    }
}

/// NLP collaborators selected from configuration.
#[derive(Clone)]
pub struct NlpClients {
    pub embedder: Arc<dyn EmbeddingService>,
    pub keywords: Arc<dyn KeywordExtractor>,
}

impl NlpClients {
    pub fn from_settings(settings: &NlpSettings) -> Result<Self, NlpError> {
        match settings.provider {
            NlpProviderKind::Hash => Ok(Self {
                embedder: Arc::new(HashEmbeddingClient::new(settings.hash_dimensions)),
                keywords: Arc::new(FrequencyKeywordExtractor),
            }),
            NlpProviderKind::Http => {
                let client = Arc::new(HttpNlpClient::new(
                    settings.endpoint.clone(),
                    Duration::from_secs(settings.timeout_secs),
                )?);
                Ok(Self {
                    embedder: client.clone(),
                    keywords: client,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::nlp::similarity;

    #[test]
    fn test_content_tokens_drop_stopwords() {
        let tokens = content_tokens("The Graph of a tree is, in fact, acyclic!");
        assert_eq!(tokens, vec!["graph", "tree", "fact", "acyclic"]);
    }

    #[tokio::test]
    async fn test_hash_embedding_is_deterministic() {
        let client = HashEmbeddingClient::new(64);
        let a = client.embed("binary search trees").await.unwrap();
        let b = client.embed("binary search trees").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_hash_embedding_shares_vocabulary() {
        let client = HashEmbeddingClient::default();
        let a = client.embed("graph traversal").await.unwrap();
        let b = client.embed("graph traversal algorithms").await.unwrap();
        assert!(similarity(&a, &b) > 0.5);
    }

    #[test]
    fn test_hash_embedding_rejects_empty_text() {
        let client = HashEmbeddingClient::default();
        let result = tokio_test::block_on(client.embed("the of and"));
        assert!(matches!(result, Err(NlpError::EmptyResult(_))));
    }

    #[tokio::test]
    async fn test_frequency_keywords() {
        let set = FrequencyKeywordExtractor
            .extract_keywords("graphs have edges. graphs have nodes. trees are graphs with edges.", 3)
            .await
            .unwrap();
        assert_eq!(set.keywords, vec!["graphs", "edges", "nodes"]);
        assert_eq!(set.weights[0], 1.0);
        assert!((set.weights[1] - 2.0 / 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_http_client_embed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .create_async()
            .await;

        let client = HttpNlpClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let embedding = client.embed("sets").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_client_keywords_default_weights() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/keywords")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"keywords": ["sets", "logic"]}"#)
            .create_async()
            .await;

        let client = HttpNlpClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let set = client.extract_keywords("sets and logic", 10).await.unwrap();
        assert_eq!(set.keywords, vec!["sets", "logic"]);
        assert_eq!(set.weights, vec![1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_http_client_server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let client = HttpNlpClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client.embed("sets").await.unwrap_err();
        assert!(matches!(err, NlpError::Service { status: 503, .. }));
        assert!(err.is_retryable());
    }
}
