// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for summary submission, clustering and catalog operations

use std::sync::Arc;

use knowmap_core::application::catalog_service::RegisterResourceRequest;
use knowmap_core::application::engine::KnowmapEngine;
use knowmap_core::application::error::ProgressError;
use knowmap_core::application::progress_service::SubmitSummaryRequest;
use knowmap_core::domain::contribution::ContributionKind;
use knowmap_core::domain::course::{CourseId, ModuleId, Topic, TopicId};
use knowmap_core::domain::engine_config::EngineSettings;
use knowmap_core::domain::enrollment::LearnerId;
use knowmap_core::domain::geometry::Position;
use knowmap_core::domain::polyline::Polyline;
use knowmap_core::domain::repository::{ResourceRepository, SummaryRepository, TopicRepository};
use knowmap_core::domain::resource::ResourceProfile;
use knowmap_core::domain::summary::ClusterScope;
use knowmap_core::infrastructure::nlp::{FrequencyKeywordExtractor, HashEmbeddingClient};

fn p(values: &[f64]) -> Polyline {
    Polyline::new(values.to_vec()).unwrap()
}

fn create_test_engine() -> KnowmapEngine {
    KnowmapEngine::with_nlp(
        EngineSettings::default(),
        Arc::new(HashEmbeddingClient::new(64)),
        Arc::new(FrequencyKeywordExtractor),
    )
}

/// Seeds four topics and two intro resources; returns the course and its
/// topic ids in axis order.
async fn seed_course(engine: &KnowmapEngine) -> (CourseId, Vec<TopicId>) {
    let course = CourseId::new();
    let mut topic_ids = Vec::new();
    for (ordinal, name) in ["sets", "logic", "graphs", "probability"].iter().enumerate() {
        let topic = Topic::new(course, ordinal as u32, *name);
        engine.repositories.topics.save(&topic).await.unwrap();
        topic_ids.push(topic.id);
    }
    for (name, values) in [("Intro A", [0.2, 0.1, 0.1, 0.1]), ("Intro B", [0.1, 0.2, 0.1, 0.1])] {
        let resource =
            ResourceProfile::new(course, ModuleId::FIRST, name, p(&values), 0.0, &engine.projector).unwrap();
        engine.repositories.resources.save(&resource).await.unwrap();
    }
    (course, topic_ids)
}

const GRAPH_SUMMARY: &str = "Graphs\nA graph connects vertices with edges. Vertices joined by edges form paths.";

#[tokio::test]
async fn test_submit_summary_advances_and_clusters() {
    let engine = create_test_engine();
    let (course, topics) = seed_course(&engine).await;
    let enrollment = engine.progress.enroll(LearnerId::new(), course).await.unwrap();

    let submission = engine
        .progress
        .submit_summary(SubmitSummaryRequest {
            enrollment_id: enrollment.id,
            topic_id: topics[2],
            text: GRAPH_SUMMARY.to_string(),
        })
        .await
        .unwrap();

    for (now, before) in submission.enrollment.polyline.iter().zip(enrollment.polyline.iter()) {
        assert!(now >= before);
    }
    assert!(submission.keywords.contains(&"vertices".to_string()));
    assert!(submission.cluster_index.is_some());
    assert!(!submission.cluster_keywords.is_empty());

    let chain = engine.progress.contributions(enrollment.id).await.unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].kind, ContributionKind::Summary);
    assert_eq!(chain[0].id, submission.contribution_id);
    assert_eq!(chain[0].content, GRAPH_SUMMARY);

    let scope = ClusterScope::new(course, topics[2]);
    let stored = engine.repositories.summaries.find_by_scope(scope).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, submission.summary_id);
    assert_eq!(stored[0].position, submission.summary_position);
    assert_eq!(stored[0].cluster_index, submission.cluster_index);
}

#[tokio::test]
async fn test_every_summary_lands_in_exactly_one_cluster() {
    let engine = create_test_engine();
    let (course, topics) = seed_course(&engine).await;

    let texts = [
        GRAPH_SUMMARY,
        "Trees\nA tree is a graph without cycles.",
        "Probability\nRandom events have probability between zero and one.",
        "Sets\nSets contain elements; union and intersection combine sets.",
    ];
    for text in texts {
        let enrollment = engine.progress.enroll(LearnerId::new(), course).await.unwrap();
        engine
            .progress
            .submit_summary(SubmitSummaryRequest {
                enrollment_id: enrollment.id,
                topic_id: topics[2],
                text: text.to_string(),
            })
            .await
            .unwrap();
    }

    let scope = ClusterScope::new(course, topics[2]);
    let summaries = engine.repositories.summaries.find_by_scope(scope).await.unwrap();
    let clusters = engine.clusters.scope_clusters(scope).await.unwrap();
    assert_eq!(summaries.len(), 4);
    assert!(!clusters.is_empty());
    for summary in &summaries {
        let owners: Vec<_> = clusters.iter().filter(|c| c.contains_summary(&summary.id)).collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(summary.cluster_index, Some(owners[0].index));
    }

    // Other topics of the course are untouched.
    let other = ClusterScope::new(course, topics[0]);
    assert!(engine.clusters.scope_clusters(other).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_summary_rejects_unknown_topic_and_empty_text() {
    let engine = create_test_engine();
    let (course, topics) = seed_course(&engine).await;
    let enrollment = engine.progress.enroll(LearnerId::new(), course).await.unwrap();

    let err = engine
        .progress
        .submit_summary(SubmitSummaryRequest {
            enrollment_id: enrollment.id,
            topic_id: TopicId::new(),
            text: GRAPH_SUMMARY.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::NotFound(_)));

    let err = engine
        .progress
        .submit_summary(SubmitSummaryRequest {
            enrollment_id: enrollment.id,
            topic_id: topics[0],
            text: "   ".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::InvalidInput(_)));
    assert!(engine.progress.contributions(enrollment.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_resource_profiles_keywords() {
    let engine = create_test_engine();
    let (course, _) = seed_course(&engine).await;

    let resource = engine
        .catalog
        .register_resource(RegisterResourceRequest {
            course_id: course,
            module_id: ModuleId(2),
            name: "Graph basics".to_string(),
            keywords: vec!["graphs".to_string()],
            beta: 0.0,
        })
        .await
        .unwrap();

    assert_eq!(resource.polyline.len(), 4);
    assert!((resource.polyline.as_slice()[2] - 1.0).abs() < 1e-6);
    assert!(resource.polyline.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(resource.position, engine.projector.project(&resource.scaled_polyline()).unwrap());

    let stored = engine.repositories.resources.find_by_id(resource.id).await.unwrap();
    assert_eq!(stored.map(|r| r.name), Some("Graph basics".to_string()));
}

#[tokio::test]
async fn test_register_resource_needs_topics_and_keywords() {
    let engine = create_test_engine();

    let err = engine
        .catalog
        .register_resource(RegisterResourceRequest {
            course_id: CourseId::new(),
            module_id: ModuleId::FIRST,
            name: "Orphan".to_string(),
            keywords: vec!["sets".to_string()],
            beta: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::NotFound(_)));

    let (course, _) = seed_course(&engine).await;
    let err = engine
        .catalog
        .register_resource(RegisterResourceRequest {
            course_id: course,
            module_id: ModuleId::FIRST,
            name: "Empty".to_string(),
            keywords: vec![],
            beta: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::InvalidInput(_)));
}

#[tokio::test]
async fn test_reposition_resource_applies_suggested_beta() {
    let engine = create_test_engine();
    let (course, _) = seed_course(&engine).await;
    let resource = ResourceProfile::new(
        course,
        ModuleId(2),
        "Skewed",
        p(&[0.8, 0.2, 0.4, 0.1]),
        0.0,
        &engine.projector,
    )
    .unwrap();
    engine.repositories.resources.save(&resource).await.unwrap();

    let target = Position::new(0.3, 0.1);
    let fit = engine
        .catalog
        .suggest_resource_position(resource.id, target)
        .await
        .unwrap();
    let moved = engine.catalog.reposition_resource(resource.id, target).await.unwrap();

    assert_eq!(moved.beta, fit.beta);
    assert_eq!(moved.position, fit.position);
    assert!(moved.position.distance(&target) <= resource.position.distance(&target));
    assert_eq!(moved.polyline, resource.polyline);

    let stored = engine.repositories.resources.find_by_id(resource.id).await.unwrap().unwrap();
    assert_eq!(stored.beta, fit.beta);
}

#[tokio::test]
async fn test_module_centroids_average_per_module() {
    let engine = create_test_engine();
    let (course, _) = seed_course(&engine).await;
    let later = ResourceProfile::new(course, ModuleId(2), "Later", p(&[0.5, 0.5, 0.5, 0.5]), 0.0, &engine.projector)
        .unwrap();
    engine.repositories.resources.save(&later).await.unwrap();

    let centroids = engine.catalog.module_centroids(course).await.unwrap();
    assert_eq!(centroids.len(), 2);
    assert_eq!(centroids[0].module_id, ModuleId::FIRST);
    assert_eq!(centroids[0].resource_count, 2);
    for (value, expected) in centroids[0].polyline.iter().zip([0.15, 0.15, 0.1, 0.1]) {
        assert!((value - expected).abs() < 1e-9);
    }
    assert_eq!(centroids[1].module_id, ModuleId(2));
    assert_eq!(centroids[1].position, later.position);
}

#[tokio::test]
async fn test_quiz_polyline_is_highline_of_questions() {
    let engine = create_test_engine();
    let (course, _) = seed_course(&engine).await;

    let profile = engine
        .catalog
        .quiz_polyline(course, &[p(&[0.9, 0.1, 0.2, 0.0]), p(&[0.1, 0.4, 0.3, 0.0])])
        .await
        .unwrap();
    assert_eq!(profile.polyline, p(&[0.9, 0.4, 0.3, 0.0]));
    assert_eq!(profile.position, engine.projector.project(&profile.polyline).unwrap());

    let err = engine
        .catalog
        .quiz_polyline(course, &[p(&[0.9, 0.1])])
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::InvalidInput(_)));

    let err = engine.catalog.quiz_polyline(course, &[]).await.unwrap_err();
    assert!(matches!(err, ProgressError::InvalidInput(_)));
}

#[tokio::test]
async fn test_backfill_topics_writes_similarity() {
    let engine = create_test_engine();
    let (course, _) = seed_course(&engine).await;

    assert_eq!(engine.catalog.backfill_topics(course).await.unwrap(), 4);

    let topics = engine.repositories.topics.find_by_course(course).await.unwrap();
    for (axis, topic) in topics.iter().enumerate() {
        let row = topic.similarity.as_ref().unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row.as_slice()[axis], 1.0);
    }
}
