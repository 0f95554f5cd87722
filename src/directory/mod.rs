// src/directory/mod.rs
//! Step table for a directory-style inventory API.
//!
//! Fetch steps pull users, groups, devices, access policies and deployment
//! pipelines into the job state; link steps join them once both sides exist.
//!
//! ```text
//! fetch-account ─┬─ fetch-users ──┬─ fetch-group-members
//!                ├─ fetch-groups ─┘
//!                ├─ fetch-devices ────── build-device-owner-relationships (+ users)
//!                ├─ fetch-policies ───── build-policy-user-relationships (+ users)
//!                └─ fetch-deployment-pipelines
//! ```

mod converters;
mod fetch;
mod link;

pub use converters::{
    create_account_entity, create_device_entity, create_group_entity, create_has_relationship,
    create_pipeline_entity, create_policy_entity, create_stage_entity, create_user_entity,
    stage_key,
};

use crate::steps::Step;
use crate::types::StepId;

/// Scratch-data key under which the account entity is published.
pub const ACCOUNT_ENTITY: &str = "ACCOUNT_ENTITY";

pub const ACCOUNT_ENTITY_TYPE: &str = "directory_account";
pub const USER_ENTITY_TYPE: &str = "directory_user";
pub const GROUP_ENTITY_TYPE: &str = "directory_group";
pub const DEVICE_ENTITY_TYPE: &str = "directory_device";
pub const POLICY_ENTITY_TYPE: &str = "access_policy";
pub const PIPELINE_ENTITY_TYPE: &str = "deployment_pipeline";
pub const STAGE_ENTITY_TYPE: &str = "deployment_stage";

pub const FETCH_ACCOUNT: &str = "fetch-account";
pub const FETCH_USERS: &str = "fetch-users";
pub const FETCH_GROUPS: &str = "fetch-groups";
pub const FETCH_GROUP_MEMBERS: &str = "fetch-group-members";
pub const FETCH_DEVICES: &str = "fetch-devices";
pub const FETCH_POLICIES: &str = "fetch-policies";
pub const FETCH_DEPLOYMENT_PIPELINES: &str = "fetch-deployment-pipelines";
pub const BUILD_POLICY_USER_RELATIONSHIPS: &str = "build-policy-user-relationships";
pub const BUILD_DEVICE_OWNER_RELATIONSHIPS: &str = "build-device-owner-relationships";

fn id(value: &'static str) -> StepId {
    StepId::from_static(value)
}

/// Every step of the directory ingestion, in declaration order.
pub fn directory_steps() -> Vec<Step> {
    vec![
        Step::new(id(FETCH_ACCOUNT), "Fetch account", fetch::fetch_account)
            .produces_entities([ACCOUNT_ENTITY_TYPE]),
        Step::new(id(FETCH_USERS), "Fetch users", fetch::fetch_users)
            .depends_on([id(FETCH_ACCOUNT)])
            .produces_entities([USER_ENTITY_TYPE])
            .produces_relationships(["directory_account_has_directory_user"]),
        Step::new(id(FETCH_GROUPS), "Fetch groups", fetch::fetch_groups)
            .depends_on([id(FETCH_ACCOUNT)])
            .produces_entities([GROUP_ENTITY_TYPE])
            .produces_relationships(["directory_account_has_directory_group"]),
        Step::new(
            id(FETCH_GROUP_MEMBERS),
            "Fetch group members",
            fetch::fetch_group_members,
        )
        .depends_on([id(FETCH_USERS), id(FETCH_GROUPS)])
        .produces_relationships(["directory_group_has_directory_user"]),
        Step::new(id(FETCH_DEVICES), "Fetch devices", fetch::fetch_devices)
            .depends_on([id(FETCH_ACCOUNT)])
            .produces_entities([DEVICE_ENTITY_TYPE]),
        Step::new(id(FETCH_POLICIES), "Fetch access policies", fetch::fetch_policies)
            .depends_on([id(FETCH_ACCOUNT)])
            .produces_entities([POLICY_ENTITY_TYPE]),
        Step::new(
            id(FETCH_DEPLOYMENT_PIPELINES),
            "Fetch deployment pipelines",
            fetch::fetch_deployment_pipelines,
        )
        .depends_on([id(FETCH_ACCOUNT)])
        .produces_entities([PIPELINE_ENTITY_TYPE, STAGE_ENTITY_TYPE])
        .produces_relationships(["deployment_pipeline_contains_deployment_stage"]),
        Step::new(
            id(BUILD_POLICY_USER_RELATIONSHIPS),
            "Build policy to user relationships",
            link::build_policy_user_relationships,
        )
        .depends_on([id(FETCH_POLICIES), id(FETCH_USERS)])
        .produces_relationships(["access_policy_assigned_directory_user"]),
        Step::new(
            id(BUILD_DEVICE_OWNER_RELATIONSHIPS),
            "Build device owner relationships",
            link::build_device_owner_relationships,
        )
        .depends_on([id(FETCH_DEVICES), id(FETCH_USERS)])
        .produces_relationships(["directory_user_has_directory_device"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::plan;
    use pretty_assertions::assert_eq;

    #[test]
    fn step_table_plans_without_errors() {
        let plan = plan(directory_steps()).unwrap();
        let order: Vec<&str> = plan.step_ids().into_iter().map(StepId::as_str).collect();

        assert_eq!(order.len(), 9);
        assert_eq!(order[0], FETCH_ACCOUNT);
        let position = |id: &str| order.iter().position(|s| *s == id).unwrap();
        assert!(position(FETCH_USERS) < position(FETCH_GROUP_MEMBERS));
        assert!(position(FETCH_GROUPS) < position(FETCH_GROUP_MEMBERS));
        assert!(position(FETCH_POLICIES) < position(BUILD_POLICY_USER_RELATIONSHIPS));
        assert!(position(FETCH_DEVICES) < position(BUILD_DEVICE_OWNER_RELATIONSHIPS));
    }

    #[test]
    fn declared_relationship_types_match_derived_names() {
        for step in directory_steps() {
            for relationship_type in &step.produces_relationship_types {
                assert!(
                    relationship_type.contains("_has_")
                        || relationship_type.contains("_assigned_")
                        || relationship_type.contains("_contains_"),
                    "{} declares {}",
                    step.id,
                    relationship_type
                );
            }
        }
    }
}
