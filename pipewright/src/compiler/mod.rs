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

//! The topology compiler: translates a validated [`PipelineDefinition`] plus
//! the addresses of its deployed functions into the workflow document the
//! execution engine consumes.
//!
//! Compilation is deterministic and single-pass. Its only outward dependency
//! is the injected [`PipelineLookup`] capability used to resolve
//! cross-pipeline references against the deployed-workflow registry, so the
//! compiler is independently testable with a fake lookup.

pub mod document;

pub use document::{TaskState, WorkflowDocument, SYNC_EXECUTION_RESOURCE};

use crate::definition::{NextRef, PipelineDefinition};
use crate::error::{PipewrightError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

/// Function name -> invocation address, produced by the deployment stage.
/// Built once per pipeline deploy and consumed read-only here.
pub type DeployedFunctionMap = HashMap<String, String>;

/// Capability to find the address of an already-deployed sibling workflow by
/// name. Point-in-time: sibling pipelines deploy independently, so results
/// must not be cached across the compiler's pass.
#[async_trait]
pub trait PipelineLookup: Send + Sync {
    /// Resolves a workflow name to its invocation address, or fails with
    /// [`PipewrightError::PipelineDoesNotExist`].
    async fn lookup_workflow(&self, name: &str) -> Result<String>;
}

/// A fixed name-to-address table standing in for the deployed-workflow
/// registry. Used by the offline renderer and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    workflows: HashMap<String, String>,
}

impl StaticLookup {
    /// Builds a lookup over a fixed table.
    pub fn new(workflows: HashMap<String, String>) -> StaticLookup {
        StaticLookup { workflows }
    }
}

#[async_trait]
impl PipelineLookup for StaticLookup {
    async fn lookup_workflow(&self, name: &str) -> Result<String> {
        self.workflows
            .get(name)
            .cloned()
            .ok_or_else(|| PipewrightError::PipelineDoesNotExist(name.to_owned()))
    }
}

/// Compiles a pipeline definition into its workflow document.
///
/// The first declared function becomes the entry state. Each node's outgoing
/// edge then determines its state: no successor marks the terminal task, a
/// function reference chains to the named state, and a pipeline reference
/// turns the node into a synchronous execution of the referenced workflow,
/// resolved through `lookup` at compile time.
///
/// Any failure aborts the whole compile; no partial document is returned.
pub async fn compile(
    definition: &PipelineDefinition,
    function_map: &DeployedFunctionMap,
    lookup: &dyn PipelineLookup,
) -> Result<WorkflowDocument> {
    let start = definition
        .functions
        .first()
        .ok_or(PipewrightError::EmptyDefinition)?;

    let mut states = BTreeMap::new();
    for function in &definition.functions {
        let state = match &function.next {
            None => TaskState::terminal(resolve_address(function_map, &function.name)?),
            Some(NextRef::Function(next)) => {
                TaskState::transition(resolve_address(function_map, &function.name)?, next)
            }
            Some(NextRef::Pipeline(pipeline)) => {
                TaskState::sub_workflow(lookup.lookup_workflow(pipeline).await?)
            }
        };
        states.insert(function.name.clone(), state);
    }

    Ok(WorkflowDocument {
        comment: definition.description.clone(),
        start_at: start.name.clone(),
        states,
    })
}

/// Exact-name lookup in the deployed-function map; no fallback, no case
/// folding. A miss means the deployment stage broke its contract of
/// producing an address for every declared function.
fn resolve_address(function_map: &DeployedFunctionMap, name: &str) -> Result<String> {
    function_map.get(name).cloned().ok_or_else(|| {
        PipewrightError::Internal(format!("function `{}` has no deployed address", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FunctionNode;
    use serde_json::json;

    fn node(name: &str, next: Option<NextRef>) -> FunctionNode {
        FunctionNode {
            name: name.to_owned(),
            next,
        }
    }

    fn linear_chain() -> PipelineDefinition {
        PipelineDefinition::try_new(
            "pipelines/test/orders.json",
            "Test pipeline",
            vec![
                node("f1", Some(NextRef::Function("f2".to_owned()))),
                node("f2", Some(NextRef::Function("f3".to_owned()))),
                node("f3", None),
            ],
            None,
        )
        .unwrap()
    }

    fn addresses(pairs: &[(&str, &str)]) -> DeployedFunctionMap {
        pairs
            .iter()
            .map(|(name, arn)| (name.to_string(), arn.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn linear_chain_compiles_to_chained_tasks() -> Result<()> {
        let map = addresses(&[("f1", "a1"), ("f2", "a2"), ("f3", "a3")]);
        let document = compile(&linear_chain(), &map, &StaticLookup::default()).await?;

        assert_eq!("f1", document.start_at);
        assert_eq!(
            json!({
                "Comment": "Test pipeline",
                "StartAt": "f1",
                "States": {
                    "f1": {"Type": "Task", "Resource": "a1", "Next": "f2"},
                    "f2": {"Type": "Task", "Resource": "a2", "Next": "f3"},
                    "f3": {"Type": "Task", "Resource": "a3", "End": true}
                }
            }),
            serde_json::to_value(&document)?
        );
        Ok(())
    }

    #[tokio::test]
    async fn start_state_is_first_declared_function() -> Result<()> {
        // Declaration order decides the entry point, not edge direction.
        let definition = PipelineDefinition::try_new(
            "p",
            "",
            vec![
                node("entry", Some(NextRef::Function("tail".to_owned()))),
                node("tail", None),
            ],
            None,
        )
        .unwrap();
        let map = addresses(&[("entry", "a1"), ("tail", "a2")]);
        let document = compile(&definition, &map, &StaticLookup::default()).await?;
        assert_eq!("entry", document.start_at);
        assert!(document.states.contains_key("entry"));
        Ok(())
    }

    #[tokio::test]
    async fn pipeline_reference_becomes_sync_sub_workflow() -> Result<()> {
        let definition = PipelineDefinition::try_new(
            "p",
            "Test pipeline",
            vec![
                node("f1", Some(NextRef::Function("f2".to_owned()))),
                node("f2", Some(NextRef::Pipeline("downstream".to_owned()))),
            ],
            None,
        )
        .unwrap();
        let map = addresses(&[("f1", "a1"), ("f2", "a2")]);
        let lookup = StaticLookup::new(
            [("downstream".to_owned(), "arn:downstream".to_owned())]
                .into_iter()
                .collect(),
        );

        let document = compile(&definition, &map, &lookup).await?;
        assert_eq!(
            json!({
                "Type": "Task",
                "Resource": "arn:aws:states:::states:startExecution.sync:2",
                "Parameters": {"StateMachineArn": "arn:downstream"},
                "End": true
            }),
            serde_json::to_value(&document.states["f2"])?
        );
        Ok(())
    }

    #[tokio::test]
    async fn unresolved_pipeline_reference_fails_the_compile() {
        let definition = PipelineDefinition::try_new(
            "p",
            "",
            vec![node("f1", Some(NextRef::Pipeline("missing".to_owned())))],
            None,
        )
        .unwrap();
        let map = addresses(&[("f1", "a1")]);

        let err = compile(&definition, &map, &StaticLookup::default())
            .await
            .unwrap_err();
        match err {
            PipewrightError::PipelineDoesNotExist(name) => assert_eq!("missing", name),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn empty_definition_is_rejected() {
        let definition = PipelineDefinition::try_new("p", "", vec![], None).unwrap();
        let err = compile(&definition, &DeployedFunctionMap::new(), &StaticLookup::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipewrightError::EmptyDefinition));
    }

    #[tokio::test]
    async fn missing_function_address_is_an_internal_error() {
        let definition =
            PipelineDefinition::try_new("p", "", vec![node("f1", None)], None).unwrap();
        let err = compile(&definition, &DeployedFunctionMap::new(), &StaticLookup::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipewrightError::Internal(_)));
    }

    #[tokio::test]
    async fn identical_inputs_render_identical_documents() -> Result<()> {
        let map = addresses(&[("f1", "a1"), ("f2", "a2"), ("f3", "a3")]);
        let first = compile(&linear_chain(), &map, &StaticLookup::default())
            .await?
            .render()?;
        let second = compile(&linear_chain(), &map, &StaticLookup::default())
            .await?
            .render()?;
        assert_eq!(first, second);
        Ok(())
    }
}
