// tests/relationships.rs
//! Relationship building over an in-memory job state.

use inventory2graph::{
    Entity, InMemoryJobState, JobState, KeyListEndpoints, RelationshipBuilder, RelationshipClass,
    RelationshipSpec, RunLogger,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn seeded(policy_users: &[&str]) -> Arc<InMemoryJobState> {
    let job_state = Arc::new(InMemoryJobState::new());
    for key in ["u1", "u2", "u3"] {
        job_state
            .add_entity(Entity::new(key, "directory_user", ["User"]).unwrap())
            .await
            .unwrap();
    }
    let policy = Entity::new("p1", "access_policy", ["AccessPolicy"])
        .unwrap()
        .with_property("includeUsers", policy_users.to_vec());
    job_state.add_entity(policy).await.unwrap();
    job_state
}

fn assignment() -> RelationshipSpec {
    RelationshipSpec::new(
        "access_policy",
        RelationshipClass::Assigned,
        "access_policy",
        "directory_user",
    )
}

fn builder(job_state: &Arc<InMemoryJobState>) -> RelationshipBuilder {
    RelationshipBuilder::new(job_state.clone(), Arc::new(RunLogger::new()))
}

#[tokio::test]
async fn all_sentinel_fans_out_to_every_target() {
    let job_state = seeded(&["All"]).await;

    let outcome = builder(&job_state)
        .build_relationships(&assignment(), &KeyListEndpoints::new("includeUsers"))
        .await
        .unwrap();

    assert_eq!(outcome.created, 3);
    let keys: Vec<String> = job_state
        .snapshot()
        .await
        .relationships
        .iter()
        .map(|r| r.key().to_string())
        .collect();
    assert_eq!(
        keys,
        vec!["p1|assigned|u1", "p1|assigned|u2", "p1|assigned|u3"]
    );
}

#[tokio::test]
async fn none_sentinel_stops_the_list() {
    let job_state = seeded(&["None", "u1"]).await;

    let outcome = builder(&job_state)
        .build_relationships(&assignment(), &KeyListEndpoints::new("includeUsers"))
        .await
        .unwrap();

    assert_eq!(outcome.created, 0);
    assert_eq!(job_state.relationship_count(), 0);
}

#[tokio::test]
async fn repeated_endpoints_produce_one_relationship() {
    let job_state = seeded(&["u2", "u2", "All"]).await;

    let outcome = builder(&job_state)
        .build_relationships(&assignment(), &KeyListEndpoints::new("includeUsers"))
        .await
        .unwrap();

    assert_eq!(outcome.created, 3);
    assert_eq!(outcome.duplicates, 2);
    assert_eq!(job_state.relationship_count(), 3);
}

#[tokio::test]
async fn unknown_endpoints_are_skipped() {
    let job_state = seeded(&["u1", "ghost"]).await;

    let outcome = builder(&job_state)
        .build_relationships(&assignment(), &KeyListEndpoints::new("includeUsers"))
        .await
        .unwrap();

    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.missing_endpoint, 1);
    assert!(job_state.has_key("p1|assigned|u1").await);
    assert!(!job_state.has_key("p1|assigned|ghost").await);
}

#[tokio::test]
async fn rebuilding_is_idempotent() {
    let job_state = seeded(&["All"]).await;
    let extractor = KeyListEndpoints::new("includeUsers");

    builder(&job_state)
        .build_relationships(&assignment(), &extractor)
        .await
        .unwrap();
    builder(&job_state)
        .build_relationships(&assignment(), &extractor)
        .await
        .unwrap();

    assert_eq!(job_state.relationship_count(), 3);
}
