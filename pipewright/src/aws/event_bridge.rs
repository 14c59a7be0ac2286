// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! This module contains all wrapped functions of the AWS EventBridge
//! services: wiring a pipeline's trigger to its registered workflow.

use crate::config::Config;
use crate::definition::Trigger;
use crate::error::{PipewrightError, Result};
use rusoto_core::RusotoError;
use rusoto_events::{
    DeleteRuleError, DeleteRuleRequest, EventBridge, EventBridgeClient, PutRuleRequest,
    PutTargetsRequest, RemoveTargetsError, RemoveTargetsRequest, Target,
};

/// Creates the trigger's rule and points it at the registered workflow.
///
/// The rule carries either the trigger's event pattern or its schedule
/// expression, never both. The target assumes the trigger role to start
/// workflow executions.
///
/// # Returns
/// The name of the created rule.
pub async fn wire_trigger(
    client: &EventBridgeClient,
    config: &Config,
    pipeline_name: &str,
    trigger: &Trigger,
    workflow_arn: &str,
) -> Result<String> {
    let rule_name = config.resource_name(trigger.name());
    let event_pattern = trigger
        .event_pattern(config.platform.as_ref())?
        .map(|pattern| pattern.to_string());

    client
        .put_rule(PutRuleRequest {
            name: rule_name.clone(),
            event_pattern,
            schedule_expression: trigger.schedule_expression(),
            ..Default::default()
        })
        .await
        .map_err(|e| PipewrightError::AWS(e.to_string()))?;

    let response = client
        .put_targets(PutTargetsRequest {
            rule: rule_name.clone(),
            targets: vec![Target {
                id: format!("{}-target", config.resource_name(pipeline_name)),
                arn: workflow_arn.to_owned(),
                role_arn: Some(config.trigger_role_arn.clone()),
                ..Default::default()
            }],
            ..Default::default()
        })
        .await
        .map_err(|e| PipewrightError::AWS(e.to_string()))?;

    if response.failed_entry_count.unwrap_or(0) > 0 {
        return Err(PipewrightError::AWS(format!(
            "failed to attach workflow target to rule {}",
            rule_name
        )));
    }

    Ok(rule_name)
}

/// Removes the trigger's target and rule. Absorbs not-found on both calls so
/// teardown is idempotent.
pub async fn unwire_trigger(
    client: &EventBridgeClient,
    config: &Config,
    pipeline_name: &str,
    trigger: &Trigger,
) -> Result<()> {
    let rule_name = config.resource_name(trigger.name());

    match client
        .remove_targets(RemoveTargetsRequest {
            rule: rule_name.clone(),
            ids: vec![format!("{}-target", config.resource_name(pipeline_name))],
            ..Default::default()
        })
        .await
    {
        Ok(_) => {}
        Err(RusotoError::Service(RemoveTargetsError::ResourceNotFound(_))) => {}
        Err(e) => return Err(PipewrightError::AWS(e.to_string())),
    }

    match client
        .delete_rule(DeleteRuleRequest {
            name: rule_name,
            ..Default::default()
        })
        .await
    {
        Ok(_) => Ok(()),
        Err(RusotoError::Service(DeleteRuleError::ResourceNotFound(_))) => Ok(()),
        Err(e) => Err(PipewrightError::AWS(e.to_string())),
    }
}
