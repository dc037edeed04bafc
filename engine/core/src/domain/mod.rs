// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure progression math and the aggregates it operates on.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Polylines, map geometry, accessibility, contribution
//!   replay, clustering and the persistence/NLP contracts

pub mod polyline;
pub mod geometry;
pub mod course;
pub mod resource;
pub mod enrollment;
pub mod contribution;
pub mod accessibility;
pub mod clustering;
pub mod summary;
pub mod events;
pub mod repository;
pub mod nlp;
pub mod engine_config;
