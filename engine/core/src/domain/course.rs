// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Course, module and topic identity plus the per-course [`TopicSet`].
//!
//! The index of a topic inside its [`TopicSet`] is the axis index of every
//! polyline in that course, so topic ordering must be stable: topics are
//! ordered by `ordinal`, then by id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::polyline::Polyline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub Uuid);

impl CourseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for CourseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopicId(pub Uuid);

impl TopicId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TopicId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Module ordinal within a course. Module 1 is the course entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub const FIRST: ModuleId = ModuleId(1);
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A course topic and, once backfilled, its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub course_id: CourseId,
    pub ordinal: u32,
    pub name: String,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
    /// Similarity of this topic to every topic of the course, axis-ordered.
    pub similarity: Option<Polyline>,
}

impl Topic {
    pub fn new(course_id: CourseId, ordinal: u32, name: impl Into<String>) -> Self {
        Self {
            id: TopicId::new(),
            course_id,
            ordinal,
            name: name.into(),
            description: None,
            embedding: None,
            similarity: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Text fed to the embedding model: the description, or the name when
    /// the description is missing or blank.
    pub fn embedding_text(&self) -> &str {
        match self.description.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.name,
        }
    }
}

/// Sort topics into axis order.
pub fn sort_axis_order(topics: &mut [Topic]) {
    topics.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then(a.id.cmp(&b.id)));
}

/// Ordered topic embeddings of one course. Index = axis index.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSet {
    pub course_id: CourseId,
    topic_ids: Vec<TopicId>,
    embeddings: Vec<Vec<f32>>,
}

impl TopicSet {
    pub fn new(course_id: CourseId, embeddings: Vec<Vec<f32>>) -> Self {
        Self {
            course_id,
            topic_ids: Vec::new(),
            embeddings,
        }
    }

    /// Build from axis-ordered topics that all carry an embedding.
    pub fn from_topics(course_id: CourseId, topics: &[Topic]) -> Option<Self> {
        let embeddings = topics
            .iter()
            .map(|t| t.embedding.clone())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            course_id,
            topic_ids: topics.iter().map(|t| t.id).collect(),
            embeddings,
        })
    }

    pub fn num_axes(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn topic_ids(&self) -> &[TopicId] {
        &self.topic_ids
    }

    pub fn contains_topic(&self, topic_id: &TopicId) -> bool {
        self.topic_ids.contains(topic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_falls_back_to_name() {
        let course = CourseId::new();
        let topic = Topic::new(course, 0, "Graphs");
        assert_eq!(topic.embedding_text(), "Graphs");

        let topic = topic.with_description("   ");
        assert_eq!(topic.embedding_text(), "Graphs");

        let topic = topic.with_description("Vertices and edges");
        assert_eq!(topic.embedding_text(), "Vertices and edges");
    }

    #[test]
    fn test_axis_order_uses_ordinal_first() {
        let course = CourseId::new();
        let mut topics = vec![
            Topic::new(course, 2, "c"),
            Topic::new(course, 0, "a"),
            Topic::new(course, 1, "b"),
        ];
        sort_axis_order(&mut topics);
        let names: Vec<_> = topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_topic_set_requires_embeddings() {
        let course = CourseId::new();
        let mut topics = vec![Topic::new(course, 0, "a"), Topic::new(course, 1, "b")];
        assert!(TopicSet::from_topics(course, &topics).is_none());

        for topic in topics.iter_mut() {
            topic.embedding = Some(vec![1.0, 0.0]);
        }
        let set = TopicSet::from_topics(course, &topics).unwrap();
        assert_eq!(set.num_axes(), 2);
        assert!(set.contains_topic(&topics[1].id));
        assert!(!set.contains_topic(&TopicId::new()));
    }
}
