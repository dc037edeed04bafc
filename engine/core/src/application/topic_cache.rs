// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Topic Cache
//!
//! Lazily computes and caches each course's [`TopicSet`]. The first request
//! for a course embeds any topic still missing an embedding and stores it;
//! later requests are served from memory until [`TopicCache::backfill`]
//! recomputes every embedding and replaces the entry.
//!
//! Axis order is the repository's topic order (ordinal, then id) and never
//! changes for a populated course.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::application::error::ProgressError;
use crate::application::locks::KeyedLocks;
use crate::domain::course::{CourseId, Topic, TopicSet};
use crate::domain::nlp::{similarity, EmbeddingService};
use crate::domain::polyline::Polyline;
use crate::domain::repository::TopicRepository;

pub struct TopicCache {
    topics: Arc<dyn TopicRepository>,
    embedder: Arc<dyn EmbeddingService>,
    sets: DashMap<CourseId, Arc<TopicSet>>,
    locks: KeyedLocks<CourseId>,
}

impl TopicCache {
    pub fn new(topics: Arc<dyn TopicRepository>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            topics,
            embedder,
            sets: DashMap::new(),
            locks: KeyedLocks::new(),
        }
    }

    /// The course's topic set, populated on first use.
    pub async fn topic_set(&self, course_id: CourseId) -> Result<Arc<TopicSet>, ProgressError> {
        if let Some(set) = self.sets.get(&course_id) {
            return Ok(set.clone());
        }

        let _guard = self.locks.lock(&course_id).await;
        if let Some(set) = self.sets.get(&course_id) {
            return Ok(set.clone());
        }

        let mut topics = self.load(course_id).await?;
        let mut embedded = 0;
        for topic in topics.iter_mut().filter(|t| t.embedding.is_none()) {
            topic.embedding = Some(self.embedder.embed(topic.embedding_text()).await?);
            self.topics.save(topic).await?;
            embedded += 1;
        }
        debug!(course_id = %course_id, embedded, "Populated topic set");

        let set = Arc::new(Self::build_set(course_id, &topics)?);
        self.sets.insert(course_id, set.clone());
        Ok(set)
    }

    /// Drop the cached set; the next request recomputes it from storage.
    pub fn invalidate(&self, course_id: CourseId) {
        self.sets.remove(&course_id);
    }

    /// Recompute every topic embedding and topic-to-topic similarity
    /// polyline, persist them and replace the cached set.
    pub async fn backfill(&self, course_id: CourseId) -> Result<Arc<TopicSet>, ProgressError> {
        let _guard = self.locks.lock(&course_id).await;
        self.sets.remove(&course_id);

        let mut topics = self.load(course_id).await?;

        let mut by_id: Vec<usize> = (0..topics.len()).collect();
        by_id.sort_by_key(|&i| topics[i].id);
        for i in by_id {
            let embedding = self.embedder.embed(topics[i].embedding_text()).await?;
            topics[i].embedding = Some(embedding);
        }

        let embeddings: Vec<Vec<f32>> = topics
            .iter()
            .map(|t| t.embedding.clone().unwrap_or_default())
            .collect();
        for (i, topic) in topics.iter_mut().enumerate() {
            let row = embeddings
                .iter()
                .enumerate()
                .map(|(j, other)| if i == j { 1.0 } else { similarity(&embeddings[i], other) })
                .collect();
            topic.similarity = Some(Polyline::new(row)?);
            self.topics.save(topic).await?;
        }

        let set = Arc::new(Self::build_set(course_id, &topics)?);
        self.sets.insert(course_id, set.clone());
        info!(course_id = %course_id, topics = topics.len(), "Backfilled topic embeddings");
        Ok(set)
    }

    async fn load(&self, course_id: CourseId) -> Result<Vec<Topic>, ProgressError> {
        let topics = self.topics.find_by_course(course_id).await?;
        if topics.is_empty() {
            return Err(ProgressError::NotFound(format!("topics for course {}", course_id)));
        }
        Ok(topics)
    }

    fn build_set(course_id: CourseId, topics: &[Topic]) -> Result<TopicSet, ProgressError> {
        TopicSet::from_topics(course_id, topics)
            .ok_or_else(|| ProgressError::InvalidInput(format!("course {} has topics without embeddings", course_id)))
    }
}
