// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod catalog_service;
pub mod cluster_service;
pub mod engine;
pub mod error;
pub mod locks;
pub mod progress_service;
pub mod summary_encoder;
pub mod topic_cache;

pub use catalog_service::{
    CatalogService, ModuleCentroid, PositionFit, QuizProfile, RegisterResourceRequest, StandardCatalogService,
};
pub use cluster_service::{ClusterService, StandardClusterService};
pub use engine::{EngineRepositories, KnowmapEngine};
pub use error::ProgressError;
pub use progress_service::{
    GradeRevision, ProgressOutcome, ProgressRepositories, ProgressService, StandardProgressService,
    SubmitQuizRequest, SubmitSummaryRequest, SummarySubmission,
};
pub use summary_encoder::{EncodedText, SummaryEncoder};
pub use topic_cache::TopicCache;
