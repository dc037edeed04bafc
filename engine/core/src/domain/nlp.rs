// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NLP collaborator interface
//!
//! The engine treats embedding and keyword extraction as black boxes: text
//! in, vector or ranked keyword list out. Implementations live in
//! `crate::infrastructure::nlp`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text to embedding vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NlpError>;
}

/// Text to its `k` highest-ranked keywords.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract_keywords(&self, text: &str, k: usize) -> Result<KeywordSet, NlpError>;
}

/// Ranked keywords with parallel weights, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    pub keywords: Vec<String>,
    pub weights: Vec<f32>,
}

impl KeywordSet {
    pub fn new(keywords: Vec<String>, weights: Vec<f32>) -> Result<Self, NlpError> {
        if keywords.len() != weights.len() {
            return Err(NlpError::InvalidResponse(format!(
                "{} keywords but {} weights",
                keywords.len(),
                weights.len()
            )));
        }
        Ok(Self { keywords, weights })
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, f32)> {
        self.keywords.iter().zip(self.weights.iter().copied())
    }
}

/// Errors from NLP collaborators
#[derive(Debug, thiserror::Error)]
pub enum NlpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),
}

impl NlpError {
    /// Everything except a client-side rejection of the request is retryable,
    /// empty and malformed answers included.
    pub fn is_retryable(&self) -> bool {
        match self {
            NlpError::Service { status, .. } => !(400..500).contains(status) || *status == 408 || *status == 429,
            NlpError::Network(_) | NlpError::Timeout(_) | NlpError::InvalidResponse(_) | NlpError::EmptyResult(_) => {
                true
            }
        }
    }
}

/// Cosine similarity mapped from [-1, 1] to [0, 1]. Zero-norm inputs give 0.
pub fn similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}
