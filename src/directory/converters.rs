// src/directory/converters.rs
//! Per-kind mapping from raw directory records to graph entities.
//!
//! Each converter sets the handful of properties downstream queries rely on
//! explicitly, then merges the normalized raw record underneath them.

use super::{
    ACCOUNT_ENTITY_TYPE, DEVICE_ENTITY_TYPE, GROUP_ENTITY_TYPE, PIPELINE_ENTITY_TYPE,
    POLICY_ENTITY_TYPE, STAGE_ENTITY_TYPE, USER_ENTITY_TYPE,
};
use crate::model::{Entity, Relationship, RelationshipClass};
use crate::normalize::{normalize_json, NormalizeOptions};
use anyhow::{anyhow, Context};
use serde_json::Value;

fn raw_properties(raw: &Value) -> Value {
    normalize_json(raw.clone(), &NormalizeOptions::new().with_parse_time())
}

fn required_str<'a>(raw: &'a Value, field: &str, kind: &str) -> anyhow::Result<&'a str> {
    raw.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("{} record has no '{}'", kind, field))
}

fn optional_str<'a>(raw: &'a Value, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Value::as_str)
}

/// Strings at a JSON pointer; anything that is not an array of strings is empty.
fn string_list(raw: &Value, pointer: &str) -> Vec<String> {
    raw.pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn create_account_entity(raw: &Value) -> anyhow::Result<Entity> {
    let id = required_str(raw, "id", "Organization")?;
    let domains: Vec<String> = raw
        .get("verifiedDomains")
        .and_then(Value::as_array)
        .map(|domains| {
            domains
                .iter()
                .filter_map(|domain| domain.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Entity::new(id, ACCOUNT_ENTITY_TYPE, ["Account"])?
        .with_property("name", optional_str(raw, "displayName").unwrap_or(id))
        .with_property("domains", domains)
        .with_normalized(raw_properties(raw)))
}

pub fn create_user_entity(raw: &Value) -> anyhow::Result<Entity> {
    let id = required_str(raw, "id", "User")?;
    let username = optional_str(raw, "userPrincipalName");
    let name = optional_str(raw, "displayName").or(username).unwrap_or(id);

    Ok(Entity::new(id, USER_ENTITY_TYPE, ["User"])?
        .with_property("name", name)
        .with_optional_property("username", username)
        .with_optional_property("email", optional_str(raw, "mail"))
        .with_optional_property("active", raw.get("accountEnabled").and_then(Value::as_bool))
        .with_normalized(raw_properties(raw)))
}

pub fn create_group_entity(raw: &Value) -> anyhow::Result<Entity> {
    let id = required_str(raw, "id", "Group")?;
    let security_enabled = raw
        .get("securityEnabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Entity::new(id, GROUP_ENTITY_TYPE, ["UserGroup"])?
        .with_property("name", optional_str(raw, "displayName").unwrap_or(id))
        .with_property("securityEnabled", security_enabled)
        .with_normalized(raw_properties(raw)))
}

pub fn create_device_entity(raw: &Value) -> anyhow::Result<Entity> {
    let id = required_str(raw, "id", "Device")?;

    Ok(Entity::new(id, DEVICE_ENTITY_TYPE, ["Device", "Host"])?
        .with_property("name", optional_str(raw, "displayName").unwrap_or(id))
        .with_optional_property("description", optional_str(raw, "description"))
        .with_optional_property("platform", optional_str(raw, "operatingSystem"))
        .with_normalized(raw_properties(raw)))
}

/// Policies keep their user assignment lists as arrays, sentinels included.
pub fn create_policy_entity(raw: &Value) -> anyhow::Result<Entity> {
    let id = required_str(raw, "id", "Policy")?;
    let enabled = optional_str(raw, "state").map(|state| state == "enabled");

    Ok(Entity::new(id, POLICY_ENTITY_TYPE, ["AccessPolicy"])?
        .with_property("name", optional_str(raw, "displayName").unwrap_or(id))
        .with_optional_property("enabled", enabled)
        .with_property("includeUsers", string_list(raw, "/conditions/users/includeUsers"))
        .with_property("excludeUsers", string_list(raw, "/conditions/users/excludeUsers"))
        .with_normalized(raw_properties(raw)))
}

pub fn create_pipeline_entity(raw: &Value) -> anyhow::Result<Entity> {
    let id = required_str(raw, "id", "Deployment pipeline")?;

    Ok(Entity::new(id, PIPELINE_ENTITY_TYPE, ["Configuration"])?
        .with_property("name", optional_str(raw, "displayName").unwrap_or(id))
        .with_normalized(raw_properties(raw)))
}

/// Stages have no id of their own; they are keyed by pipeline and position.
pub fn create_stage_entity(pipeline_key: &str, raw: &Value) -> anyhow::Result<Entity> {
    let order = raw
        .get("order")
        .and_then(Value::as_u64)
        .with_context(|| format!("Stage of pipeline {} has no 'order'", pipeline_key))?;
    let key = stage_key(pipeline_key, order);

    Ok(Entity::new(key, STAGE_ENTITY_TYPE, ["Configuration"])?
        .with_property("name", optional_str(raw, "displayName").unwrap_or("stage"))
        .with_property("order", order)
        .with_property("pipelineId", pipeline_key)
        .with_optional_property("workspaceId", optional_str(raw, "workspaceId"))
        .with_normalized(raw_properties(raw)))
}

pub fn stage_key(pipeline_key: &str, order: u64) -> String {
    format!("{}/stages/{}", pipeline_key, order)
}

/// `from HAS to` between two committed entities.
pub fn create_has_relationship(from: &Entity, to: &Entity) -> Relationship {
    Relationship::new(
        RelationshipClass::Has,
        from.key(),
        from.entity_type(),
        to.key(),
        to.entity_type(),
    )
}
