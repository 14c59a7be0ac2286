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

//! This module contains all wrapped functions of the AWS Step Functions
//! services: workflow registration and the registry-backed lookup the
//! compiler uses to resolve cross-pipeline references.

use crate::compiler::{PipelineLookup, WorkflowDocument};
use crate::error::{PipewrightError, Result};
use async_trait::async_trait;
use rusoto_core::RusotoError;
use rusoto_stepfunctions::{
    CreateStateMachineError, CreateStateMachineInput, DeleteStateMachineInput,
    ListStateMachinesInput, StepFunctions, StepFunctionsClient, UpdateStateMachineInput,
};

/// The deployed-workflow registry of the target environment.
///
/// Lookups are point-in-time: every call pages the registry afresh, because
/// sibling pipelines deploy independently and addresses are not known
/// statically.
pub struct StateMachineRegistry {
    client: StepFunctionsClient,
}

impl StateMachineRegistry {
    /// Wraps a Step Functions client.
    pub fn new(client: StepFunctionsClient) -> StateMachineRegistry {
        StateMachineRegistry { client }
    }
}

#[async_trait]
impl PipelineLookup for StateMachineRegistry {
    /// Pages the registered workflows and returns the address of the one
    /// matching `name` exactly. No fallback, no case folding.
    async fn lookup_workflow(&self, name: &str) -> Result<String> {
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .client
                .list_state_machines(ListStateMachinesInput {
                    next_token: next_token.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| PipewrightError::AWS(e.to_string()))?;

            if let Some(found) = response
                .state_machines
                .iter()
                .find(|machine| machine.name == name)
            {
                return Ok(found.state_machine_arn.clone());
            }

            next_token = response.next_token;
            if next_token.is_none() {
                return Err(PipewrightError::PipelineDoesNotExist(name.to_owned()));
            }
        }
    }
}

/// Registers a compiled workflow document under the given name.
///
/// If a workflow with that name already exists its definition and role are
/// updated in place, keeping the address stable for pipelines that reference
/// it.
///
/// # Returns
/// The workflow's invocation address, later consumed by trigger wiring.
pub async fn register_workflow(
    client: &StepFunctionsClient,
    name: &str,
    role_arn: &str,
    document: &WorkflowDocument,
) -> Result<String> {
    let definition = document.render()?;
    match client
        .create_state_machine(CreateStateMachineInput {
            definition: definition.clone(),
            name: name.to_owned(),
            role_arn: role_arn.to_owned(),
            ..Default::default()
        })
        .await
    {
        Ok(response) => Ok(response.state_machine_arn),
        Err(RusotoError::Service(CreateStateMachineError::StateMachineAlreadyExists(_))) => {
            let registry = StateMachineRegistry::new(client.clone());
            let arn = registry.lookup_workflow(name).await?;
            client
                .update_state_machine(UpdateStateMachineInput {
                    state_machine_arn: arn.clone(),
                    definition: Some(definition),
                    role_arn: Some(role_arn.to_owned()),
                    ..Default::default()
                })
                .await
                .map_err(|e| PipewrightError::AWS(e.to_string()))?;
            Ok(arn)
        }
        Err(e) => Err(PipewrightError::AWS(e.to_string())),
    }
}

/// Deletes a registered workflow by address. The service treats deletion of
/// an unknown address as a success, so teardown stays idempotent.
pub async fn delete_workflow(client: &StepFunctionsClient, workflow_arn: &str) -> Result<()> {
    client
        .delete_state_machine(DeleteStateMachineInput {
            state_machine_arn: workflow_arn.to_owned(),
        })
        .await
        .map_err(|e| PipewrightError::AWS(e.to_string()))?;
    Ok(())
}
