// src/directory/fetch.rs
//! Fetch step handlers: listing calls that write entities into the job state.

use super::converters::{
    create_account_entity, create_device_entity, create_group_entity, create_has_relationship,
    create_pipeline_entity, create_policy_entity, create_stage_entity, create_user_entity,
};
use super::{ACCOUNT_ENTITY, GROUP_ENTITY_TYPE, PIPELINE_ENTITY_TYPE, USER_ENTITY_TYPE};
use crate::algebras::{JobState, JobStateExt};
use crate::api::ShapingOptions;
use crate::error::{ApiErrorCode, AppError};
use crate::model::{Entity, Relationship, RelationshipClass};
use crate::steps::StepContext;
use serde_json::Value;
use std::sync::Arc;

const ORGANIZATION_LOCATOR: &str = "organization";
const USERS_LOCATOR: &str = "users";
const GROUPS_LOCATOR: &str = "groups";
const DEVICES_LOCATOR: &str = "devices";
const POLICIES_LOCATOR: &str = "identity/conditionalAccess/policies";
const PIPELINES_LOCATOR: &str = "deploymentPipelines";

/// Deployment pipelines are served by a newer API revision than the rest.
const PIPELINES_API_VERSION: &str = "2023-10-01";

const USER_FIELDS: &[&str] = &[
    "id",
    "displayName",
    "userPrincipalName",
    "mail",
    "accountEnabled",
    "jobTitle",
    "userType",
    "createdDateTime",
];

const GROUP_FIELDS: &[&str] = &[
    "id",
    "displayName",
    "description",
    "mail",
    "securityEnabled",
    "createdDateTime",
];

async fn load_account(context: &StepContext) -> Result<Entity, AppError> {
    context
        .job_state
        .get_entity_data(ACCOUNT_ENTITY)
        .await?
        .ok_or_else(|| AppError::InternalError {
            message: format!(
                "step '{}' ran before the account entity was published",
                context.step_id
            ),
            source: None,
        })
}

/// Adds an entity and links it under `parent` with HAS.
async fn add_owned_entity(
    job_state: &dyn JobState,
    parent: &Entity,
    entity: Entity,
) -> Result<(), AppError> {
    let relationship = create_has_relationship(parent, &entity);
    job_state.add_entity(entity).await?;
    job_state.add_relationship(relationship).await
}

/// Publishes the account every other fetch step hangs its entities under.
///
/// Unlike other listings, a denied organization listing fails the step.
pub async fn fetch_account(context: StepContext) -> Result<(), AppError> {
    let mut records: Vec<Value> = Vec::new();
    let outcome = context
        .client()?
        .iterate_resources(ORGANIZATION_LOCATOR, &ShapingOptions::default(), |record| {
            records.push(record);
            async { Ok(()) }
        })
        .await?;

    if outcome.permission_denied {
        return Err(AppError::Api {
            code: ApiErrorCode::Forbidden,
            status: 403,
            message: "missing permission to read the account record".to_string(),
            locator: ORGANIZATION_LOCATOR.to_string(),
        });
    }

    let record = records.into_iter().next().ok_or_else(|| {
        AppError::MalformedResponse(format!(
            "'{}' returned no account record",
            ORGANIZATION_LOCATOR
        ))
    })?;
    let account = create_account_entity(&record)?;

    context
        .job_state
        .set_entity_data(ACCOUNT_ENTITY, &account)
        .await?;
    context.job_state.add_entity(account).await
}

pub async fn fetch_users(context: StepContext) -> Result<(), AppError> {
    let account = Arc::new(load_account(&context).await?);
    let shaping = ShapingOptions::new().select(USER_FIELDS.iter().copied());

    let outcome = context
        .client()?
        .iterate_resources(USERS_LOCATOR, &shaping, |record| {
            let job_state = Arc::clone(&context.job_state);
            let account = Arc::clone(&account);
            async move {
                let user = create_user_entity(&record)?;
                add_owned_entity(job_state.as_ref(), &account, user).await?;
                Ok(())
            }
        })
        .await?;

    context
        .logger
        .info(&format!("Ingested {} users", outcome.delivered));
    Ok(())
}

pub async fn fetch_groups(context: StepContext) -> Result<(), AppError> {
    let account = Arc::new(load_account(&context).await?);
    let shaping = ShapingOptions::new().select(GROUP_FIELDS.iter().copied());

    let outcome = context
        .client()?
        .iterate_resources(GROUPS_LOCATOR, &shaping, |record| {
            let job_state = Arc::clone(&context.job_state);
            let account = Arc::clone(&account);
            async move {
                let group = create_group_entity(&record)?;
                add_owned_entity(job_state.as_ref(), &account, group).await?;
                Ok(())
            }
        })
        .await?;

    context
        .logger
        .info(&format!("Ingested {} groups", outcome.delivered));
    Ok(())
}

/// Lists the members of every ingested group and links the users among them.
pub async fn fetch_group_members(context: StepContext) -> Result<(), AppError> {
    let client = context.client()?;
    let groups = context.job_state.entities_of_type(GROUP_ENTITY_TYPE).await?;
    let shaping = ShapingOptions::new().select(["id"]);

    for group in groups {
        let group = Arc::new(group);
        let locator = format!("{}/{}/members", GROUPS_LOCATOR, group.key());
        client
            .iterate_resources(&locator, &shaping, |member| {
                let job_state = Arc::clone(&context.job_state);
                let logger = Arc::clone(&context.logger);
                let group = Arc::clone(&group);
                async move {
                    let member_id = member
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| anyhow::anyhow!("Group member record has no 'id'"))?;

                    match job_state.find_entity(member_id).await {
                        Some(user) if user.entity_type() == USER_ENTITY_TYPE => {
                            job_state
                                .add_relationship(create_has_relationship(&group, &user))
                                .await?;
                        }
                        _ => logger.debug(&format!(
                            "Member {} of group {} is not an ingested user",
                            member_id,
                            group.key()
                        )),
                    }
                    Ok(())
                }
            })
            .await?;
    }
    Ok(())
}

pub async fn fetch_devices(context: StepContext) -> Result<(), AppError> {
    let outcome = context
        .client()?
        .iterate_resources(DEVICES_LOCATOR, &ShapingOptions::default(), |record| {
            let job_state = Arc::clone(&context.job_state);
            async move {
                job_state.add_entity(create_device_entity(&record)?).await?;
                Ok(())
            }
        })
        .await?;

    context
        .logger
        .info(&format!("Ingested {} devices", outcome.delivered));
    Ok(())
}

pub async fn fetch_policies(context: StepContext) -> Result<(), AppError> {
    let outcome = context
        .client()?
        .iterate_resources(POLICIES_LOCATOR, &ShapingOptions::default(), |record| {
            let job_state = Arc::clone(&context.job_state);
            async move {
                job_state.add_entity(create_policy_entity(&record)?).await?;
                Ok(())
            }
        })
        .await?;

    context
        .logger
        .info(&format!("Ingested {} access policies", outcome.delivered));
    Ok(())
}

/// Lists pipelines, then walks the stages of each one.
pub async fn fetch_deployment_pipelines(context: StepContext) -> Result<(), AppError> {
    let client = context.client()?;
    let versioned = ShapingOptions::new().api_version(PIPELINES_API_VERSION);

    client
        .iterate_resources(PIPELINES_LOCATOR, &versioned, |record| {
            let job_state = Arc::clone(&context.job_state);
            async move {
                job_state.add_entity(create_pipeline_entity(&record)?).await?;
                Ok(())
            }
        })
        .await?;

    let stage_shaping = versioned.clone().expand("stages");
    for pipeline in context
        .job_state
        .entities_of_type(PIPELINE_ENTITY_TYPE)
        .await?
    {
        let pipeline = Arc::new(pipeline);
        let locator = format!("{}/{}", PIPELINES_LOCATOR, pipeline.key());
        client
            .iterate_stages(&locator, &stage_shaping, |record| {
                let job_state = Arc::clone(&context.job_state);
                let pipeline = Arc::clone(&pipeline);
                async move {
                    let stage = create_stage_entity(pipeline.key(), &record)?;
                    let relationship = Relationship::new(
                        RelationshipClass::Contains,
                        pipeline.key(),
                        pipeline.entity_type(),
                        stage.key(),
                        stage.entity_type(),
                    );
                    job_state.add_entity(stage).await?;
                    job_state.add_relationship(relationship).await?;
                    Ok(())
                }
            })
            .await?;
    }
    Ok(())
}
