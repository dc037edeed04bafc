// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod nlp;
pub mod repositories;

pub use event_bus::{DomainEvent, EventBus, EventBusError, EventReceiver};
pub use nlp::{FrequencyKeywordExtractor, HashEmbeddingClient, HttpNlpClient, NlpClients};
pub use repositories::{
    InMemoryClusterRepository, InMemoryContributionRepository, InMemoryEnrollmentRepository,
    InMemoryResourceRepository, InMemorySummaryRepository, InMemoryTopicRepository,
};
