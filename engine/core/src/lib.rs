// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Knowmap Core
//!
//! Semantic progress mapping: turns topic-similarity polylines into 2-D map
//! positions, folds learner evidence into a monotonically advancing
//! position, unlocks resources and clusters summaries per topic.
//!
//! # Architecture
//!
//! | Layer | Contents |
//! |-------|----------|
//! | `domain` | Polyline math, radial projection, accessibility, contribution chain, clustering, repository and NLP traits |
//! | `application` | `ProgressService`, `CatalogService`, `ClusterService`, summary encoding, topic cache |
//! | `infrastructure` | In-memory repositories, event bus, NLP clients |

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
