// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Summary Encoder
//!
//! Turns free text into a polyline against a course's topic set:
//!
//! 1. Extract the top `k` keywords with weights.
//! 2. Embed every keyword; weighted centroid `Σ wᵢ·eᵢ / n`.
//! 3. Embed the heading (first non-empty line).
//! 4. Blend `(heading + centroid·k) / (k + 1)`.
//! 5. Similarity of the blend to each topic embedding, mapped to [0, 1].
//! 6. Beta scaling.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::application::error::ProgressError;
use crate::domain::course::TopicSet;
use crate::domain::nlp::{similarity, EmbeddingService, KeywordExtractor};
use crate::domain::polyline::{mean_polyline, Polyline};

/// An encoded text: the scaled polyline plus what produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    pub polyline: Polyline,
    /// Topic similarities before beta scaling.
    pub raw_polyline: Polyline,
    pub keywords: Vec<String>,
}

pub struct SummaryEncoder {
    embedder: Arc<dyn EmbeddingService>,
    extractor: Arc<dyn KeywordExtractor>,
    keyword_count: usize,
}

impl SummaryEncoder {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        extractor: Arc<dyn KeywordExtractor>,
        keyword_count: usize,
    ) -> Self {
        Self {
            embedder,
            extractor,
            keyword_count: keyword_count.max(1),
        }
    }

    pub async fn encode(&self, text: &str, topics: &TopicSet, beta: f64) -> Result<EncodedText, ProgressError> {
        if text.trim().is_empty() {
            return Err(ProgressError::InvalidInput("text is empty".to_string()));
        }
        if topics.is_empty() {
            return Err(ProgressError::InvalidInput(format!(
                "course {} has no topics",
                topics.course_id
            )));
        }

        let keywords = self.extractor.extract_keywords(text, self.keyword_count).await?;
        if keywords.is_empty() {
            return Err(ProgressError::collaborator("keyword extraction returned nothing", true));
        }
        if keywords.weights.len() != keywords.len() {
            return Err(ProgressError::collaborator(
                format!("{} keywords but {} weights", keywords.len(), keywords.weights.len()),
                true,
            ));
        }

        let embeddings = try_join_all(keywords.keywords.iter().map(|k| self.embedder.embed(k))).await?;
        let dims = embeddings.first().map_or(0, Vec::len);
        if dims == 0 || embeddings.iter().any(|e| e.len() != dims) {
            return Err(ProgressError::collaborator("keyword embeddings are empty or ragged", true));
        }

        let n = embeddings.len() as f32;
        let mut centroid = vec![0.0f32; dims];
        for (embedding, (_, weight)) in embeddings.iter().zip(keywords.iter()) {
            for (slot, value) in centroid.iter_mut().zip(embedding) {
                *slot += weight * value / n;
            }
        }

        let heading = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or(text);
        let head = self.embedder.embed(heading).await?;
        if head.len() != dims {
            return Err(ProgressError::collaborator(
                format!("heading embedding has {} dimensions, keywords have {}", head.len(), dims),
                true,
            ));
        }

        let k = self.keyword_count as f32;
        let blend: Vec<f32> = head
            .iter()
            .zip(&centroid)
            .map(|(h, c)| (h + c * k) / (k + 1.0))
            .collect();

        let raw_polyline = Polyline::new(
            topics
                .embeddings()
                .iter()
                .map(|topic| similarity(&blend, topic))
                .collect(),
        )?;
        let polyline = raw_polyline.beta_scaled(beta);
        debug!(keywords = keywords.len(), axes = polyline.len(), "Encoded text");

        Ok(EncodedText {
            polyline,
            raw_polyline,
            keywords: keywords.keywords,
        })
    }

    /// Unscaled topic profile of an explicit keyword list: per keyword the
    /// similarity to every topic, averaged per axis across keywords.
    pub async fn keyword_profile(&self, keywords: &[String], topics: &TopicSet) -> Result<Polyline, ProgressError> {
        let keywords: Vec<&str> = keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()).collect();
        if keywords.is_empty() {
            return Err(ProgressError::InvalidInput("no keywords given".to_string()));
        }
        if topics.is_empty() {
            return Err(ProgressError::InvalidInput(format!(
                "course {} has no topics",
                topics.course_id
            )));
        }

        let embeddings = try_join_all(keywords.iter().map(|k| self.embedder.embed(k))).await?;
        let per_keyword = embeddings
            .iter()
            .map(|embedding| {
                Polyline::new(
                    topics
                        .embeddings()
                        .iter()
                        .map(|topic| similarity(embedding, topic))
                        .collect(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(mean_polyline(&per_keyword)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::course::CourseId;
    use crate::domain::nlp::{KeywordSet, NlpError};
    use crate::infrastructure::nlp::{FrequencyKeywordExtractor, HashEmbeddingClient};
    use async_trait::async_trait;

    async fn topic_set(embedder: &HashEmbeddingClient, names: &[&str]) -> TopicSet {
        let mut embeddings = Vec::new();
        for name in names {
            embeddings.push(embedder.embed(name).await.unwrap());
        }
        TopicSet::new(CourseId::new(), embeddings)
    }

    fn encoder(embedder: HashEmbeddingClient) -> SummaryEncoder {
        SummaryEncoder::new(Arc::new(embedder), Arc::new(FrequencyKeywordExtractor), 10)
    }

    #[tokio::test]
    async fn test_encoding_leans_towards_matching_topic() {
        let embedder = HashEmbeddingClient::new(256);
        let topics = topic_set(&embedder, &["graphs vertices edges", "probability distributions"]).await;
        let encoded = encoder(embedder)
            .encode("Graphs\nA graph has vertices joined by edges. Edges connect vertices.", &topics, 0.0)
            .await
            .unwrap();

        assert_eq!(encoded.polyline.len(), 2);
        assert!(encoded.raw_polyline.as_slice()[0] > encoded.raw_polyline.as_slice()[1]);
        assert!(encoded.keywords.contains(&"vertices".to_string()));
    }

    #[tokio::test]
    async fn test_beta_scaling_applied() {
        let embedder = HashEmbeddingClient::new(256);
        let topics = topic_set(&embedder, &["graphs vertices edges", "probability distributions"]).await;
        let encoded = encoder(embedder)
            .encode("vertices and edges make graphs", &topics, 15.0)
            .await
            .unwrap();
        assert_eq!(encoded.polyline, encoded.raw_polyline.beta_scaled(15.0));
    }

    #[tokio::test]
    async fn test_empty_text_is_invalid() {
        let embedder = HashEmbeddingClient::new(16);
        let topics = topic_set(&embedder, &["sets", "logic"]).await;
        let err = encoder(embedder).encode("   ", &topics, 15.0).await.unwrap_err();
        assert!(matches!(err, ProgressError::InvalidInput(_)));
    }

    struct NoKeywords;

    #[async_trait]
    impl KeywordExtractor for NoKeywords {
        async fn extract_keywords(&self, _text: &str, _k: usize) -> Result<KeywordSet, NlpError> {
            Ok(KeywordSet::default())
        }
    }

    #[tokio::test]
    async fn test_empty_keywords_is_collaborator_failure() {
        let embedder = HashEmbeddingClient::new(16);
        let topics = topic_set(&embedder, &["sets", "logic"]).await;
        let encoder = SummaryEncoder::new(Arc::new(embedder), Arc::new(NoKeywords), 10);
        let err = encoder.encode("sets are collections", &topics, 15.0).await.unwrap_err();
        assert!(matches!(err, ProgressError::CollaboratorFailure { retryable: true, .. }));
        assert!(err.is_retryable());
    }

    struct MissingWeights;

    #[async_trait]
    impl KeywordExtractor for MissingWeights {
        async fn extract_keywords(&self, _text: &str, _k: usize) -> Result<KeywordSet, NlpError> {
            Ok(KeywordSet {
                keywords: vec!["sets".to_string(), "collections".to_string()],
                weights: vec![1.0],
            })
        }
    }

    #[tokio::test]
    async fn test_keywords_without_weights_are_rejected() {
        let embedder = HashEmbeddingClient::new(16);
        let topics = topic_set(&embedder, &["sets", "logic"]).await;
        let encoder = SummaryEncoder::new(Arc::new(embedder), Arc::new(MissingWeights), 10);
        let err = encoder.encode("sets are collections", &topics, 15.0).await.unwrap_err();
        assert!(matches!(err, ProgressError::CollaboratorFailure { retryable: true, .. }));
    }

    #[tokio::test]
    async fn test_keyword_profile_averages_keywords() {
        let embedder = HashEmbeddingClient::new(256);
        let topics = topic_set(&embedder, &["graphs", "probability"]).await;
        let encoder = encoder(embedder);

        let single = encoder.keyword_profile(&["graphs".to_string()], &topics).await.unwrap();
        assert!((single.as_slice()[0] - 1.0).abs() < 1e-9);

        let mixed = encoder
            .keyword_profile(&["graphs".to_string(), "probability".to_string()], &topics)
            .await
            .unwrap();
        assert!((mixed.as_slice()[0] - mixed.as_slice()[1]).abs() < 1e-9);
        assert!(encoder.keyword_profile(&[" ".to_string()], &topics).await.is_err());
    }
}
