// src/directory/link.rs
//! Link steps: relationships derived from entities already in the job state.

use super::{DEVICE_ENTITY_TYPE, POLICY_ENTITY_TYPE, USER_ENTITY_TYPE};
use crate::error::AppError;
use crate::graph::{KeyListEndpoints, PatternEndpoints, RelationshipSpec, SourceRole};
use crate::model::RelationshipClass;
use crate::steps::StepContext;
use once_cell::sync::Lazy;
use regex::Regex;

/// Device descriptions end with `(owner <user id>)` when an owner is recorded.
static DEVICE_OWNER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(owner\s+([^)\s]+)\)\s*$")
        .expect("Failed to compile device owner regex - this is a bug in the code")
});

/// `access_policy ASSIGNED directory_user` for every user a policy includes.
pub async fn build_policy_user_relationships(context: StepContext) -> Result<(), AppError> {
    let spec = RelationshipSpec::new(
        POLICY_ENTITY_TYPE,
        RelationshipClass::Assigned,
        POLICY_ENTITY_TYPE,
        USER_ENTITY_TYPE,
    );
    let outcome = context
        .relationships()
        .build_relationships(&spec, &KeyListEndpoints::new("includeUsers"))
        .await?;

    context.logger.info(&format!(
        "Linked {} policy assignments ({} endpoints not ingested)",
        outcome.created, outcome.missing_endpoint
    ));
    Ok(())
}

/// `directory_user HAS directory_device` from the owner noted on each device.
pub async fn build_device_owner_relationships(context: StepContext) -> Result<(), AppError> {
    let spec = RelationshipSpec::new(
        DEVICE_ENTITY_TYPE,
        RelationshipClass::Has,
        USER_ENTITY_TYPE,
        DEVICE_ENTITY_TYPE,
    );
    let extractor = PatternEndpoints::new("description", DEVICE_OWNER_PATTERN.clone())
        .with_role(SourceRole::To);
    let outcome = context
        .relationships()
        .build_relationships(&spec, &extractor)
        .await?;

    context.logger.info(&format!(
        "Linked {} device owners ({} endpoints not ingested)",
        outcome.created, outcome.missing_endpoint
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn owner_pattern_captures_trailing_owner() {
        let captures = DEVICE_OWNER_PATTERN
            .captures("Shared laptop (owner u-42)")
            .unwrap();
        assert_eq!(&captures[1], "u-42");
        assert!(DEVICE_OWNER_PATTERN.captures("(owner u-42) kiosk").is_none());
        assert!(DEVICE_OWNER_PATTERN.captures("no owner here").is_none());
    }
}
