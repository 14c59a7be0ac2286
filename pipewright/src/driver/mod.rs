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

//! The deployment driver: turns a validated definition into live cloud
//! resources.
//!
//! Deployment is a strict sequential chain: every function deployed, then
//! the workflow compiled, then registered, then the trigger wired. Each
//! stage's output is the precondition of the next, so no stage starts before
//! its predecessor's output is fully available.

use crate::aws::states::StateMachineRegistry;
use crate::aws::{event_bridge, lambda, states};
use crate::compiler::{self, PipelineLookup};
use crate::config::Config;
use crate::definition::PipelineDefinition;
use crate::error::{PipewrightError, Result};
use log::info;
use rusoto_events::EventBridgeClient;
use rusoto_lambda::LambdaClient;
use rusoto_stepfunctions::StepFunctionsClient;
use std::path::Path;

/// Handles returned by a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Invocation address of the registered workflow.
    pub workflow_arn: String,
    /// Name of the trigger rule, when the definition declared a trigger.
    pub trigger_rule: Option<String>,
}

/// Deploys one pipeline definition into the target environment.
///
/// Clients are constructed by the caller and passed in, so alternative
/// regions or credentials stay the caller's concern and tests can construct
/// drivers without ambient state.
pub struct Deployer {
    config:        Config,
    definition:    PipelineDefinition,
    pipeline_name: String,
    lambda:        LambdaClient,
    states:        StepFunctionsClient,
    events:        EventBridgeClient,
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("config", &self.config)
            .field("definition", &self.definition)
            .field("pipeline_name", &self.pipeline_name)
            .finish_non_exhaustive()
    }
}

impl Deployer {
    /// Builds a deployer, validating configuration requirements eagerly: a
    /// definition declaring an external trigger is rejected here when the
    /// `[platform]` section is absent, not at wiring time.
    pub fn try_new(
        config: Config,
        definition: PipelineDefinition,
        lambda: LambdaClient,
        states: StepFunctionsClient,
        events: EventBridgeClient,
    ) -> Result<Deployer> {
        if definition
            .trigger
            .as_ref()
            .map_or(false, |trigger| trigger.requires_platform())
            && config.platform.is_none()
        {
            return Err(PipewrightError::InvalidConfig(
                "an external trigger requires the [platform] section to be set".to_string(),
            ));
        }

        let pipeline_name = pipeline_name_from_path(&definition.source_path);
        Ok(Deployer {
            config,
            definition,
            pipeline_name,
            lambda,
            states,
            events,
        })
    }

    /// The name this pipeline's resources are registered under.
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// Runs the deployment chain:
    /// build-all-functions -> compile-workflow -> register-workflow ->
    /// wire-trigger.
    ///
    /// A compile failure aborts the deploy before anything is registered, so
    /// no partially-applied workflow is ever left behind.
    pub async fn deploy(&self) -> Result<DeployOutcome> {
        info!("deploying pipeline {}", self.pipeline_name);
        let addresses =
            lambda::deploy_functions(&self.lambda, &self.config, &self.definition).await?;

        let registry = StateMachineRegistry::new(self.states.clone());
        let document = compiler::compile(&self.definition, &addresses, &registry).await?;

        let workflow_name = self.config.resource_name(&self.pipeline_name);
        let workflow_arn = states::register_workflow(
            &self.states,
            &workflow_name,
            &self.config.state_machine_role_arn,
            &document,
        )
        .await?;
        info!("registered workflow {}", workflow_arn);

        let trigger_rule = match &self.definition.trigger {
            Some(trigger) => {
                let rule = event_bridge::wire_trigger(
                    &self.events,
                    &self.config,
                    &self.pipeline_name,
                    trigger,
                    &workflow_arn,
                )
                .await?;
                info!("wired trigger rule {}", rule);
                Some(rule)
            }
            None => None,
        };

        Ok(DeployOutcome {
            workflow_arn,
            trigger_rule,
        })
    }

    /// Tears the pipeline's resources down in reverse deployment order.
    /// Every delete path absorbs not-found, so a partially-deployed or
    /// already-destroyed pipeline can be destroyed again safely.
    pub async fn destroy(&self) -> Result<()> {
        info!("destroying pipeline {}", self.pipeline_name);
        if let Some(trigger) = &self.definition.trigger {
            event_bridge::unwire_trigger(&self.events, &self.config, &self.pipeline_name, trigger)
                .await?;
        }

        let registry = StateMachineRegistry::new(self.states.clone());
        let workflow_name = self.config.resource_name(&self.pipeline_name);
        match registry.lookup_workflow(&workflow_name).await {
            Ok(arn) => states::delete_workflow(&self.states, &arn).await?,
            Err(PipewrightError::PipelineDoesNotExist(_)) => {}
            Err(e) => return Err(e),
        }

        for function in &self.definition.functions {
            lambda::delete_function(&self.lambda, &self.config, &function.name).await?;
        }
        Ok(())
    }
}

/// Derives the pipeline name from the declaration's directory, the way the
/// declaration repository lays pipelines out: one directory per pipeline,
/// nested directories joined with hyphens.
fn pipeline_name_from_path(source_path: &str) -> String {
    let path = Path::new(source_path);
    let dir = path
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = dir.trim_matches('/').replace('/', "-").replace('_', "-");
    if !name.is_empty() {
        return name;
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace('_', "-"))
        .unwrap_or_else(|| "pipeline".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FunctionNode, Trigger};
    use rusoto_core::Region;

    fn clients() -> (LambdaClient, StepFunctionsClient, EventBridgeClient) {
        (
            LambdaClient::new(Region::UsEast1),
            StepFunctionsClient::new(Region::UsEast1),
            EventBridgeClient::new(Region::UsEast1),
        )
    }

    #[test]
    fn external_trigger_without_platform_config_is_rejected_eagerly() {
        let definition = PipelineDefinition::try_new(
            "billing/orders/pipeline.json",
            "",
            vec![FunctionNode {
                name: "extract".to_owned(),
                next: None,
            }],
            Some(Trigger::External {
                domain:     "sales".to_owned(),
                name:       "orders".to_owned(),
                client_key: None,
            }),
        )
        .unwrap();

        let config = Config::try_new().unwrap();
        assert!(config.platform.is_none());
        let (lambda, states, events) = clients();
        let err = Deployer::try_new(config, definition, lambda, states, events).unwrap_err();
        assert!(matches!(err, PipewrightError::InvalidConfig(_)));
    }

    #[test]
    fn pipeline_name_comes_from_declaration_directory() {
        assert_eq!(
            "billing-orders",
            pipeline_name_from_path("billing/orders/pipeline.json")
        );
        assert_eq!(
            "billing-order-history",
            pipeline_name_from_path("billing/order_history/pipeline.json")
        );
        assert_eq!("standalone", pipeline_name_from_path("standalone.json"));
    }
}
