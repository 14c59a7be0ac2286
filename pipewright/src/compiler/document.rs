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

//! The workflow document handed to the execution engine.
//!
//! Field names (`Comment`, `StartAt`, `States`, `Type`, `Resource`, `Next`,
//! `Parameters`, `StateMachineArn`, `End`) are dictated by the engine's
//! grammar and reproduced verbatim.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service-integration address for a synchronous nested-workflow execution:
/// the calling workflow blocks until the sub-workflow completes. The engine
/// distinguishes direct task invocation from nested-workflow invocation at
/// the resource-address level, so this is a fixed constant rather than a
/// per-call setting.
pub const SYNC_EXECUTION_RESOURCE: &str = "arn:aws:states:::states:startExecution.sync:2";

/// The state-transition document for one pipeline. Constructed fully before
/// it is handed to the registration call; never emitted partially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Free-text comment, carried from the definition's description.
    #[serde(rename = "Comment")]
    pub comment:  String,
    /// Name of the entry state; always a key of `states`.
    #[serde(rename = "StartAt")]
    pub start_at: String,
    /// The states, keyed by function name. The engine consumes this as a
    /// mapping, so ordering is irrelevant to it; the sorted map keeps
    /// re-serialization byte-identical for identical inputs.
    #[serde(rename = "States")]
    pub states:   BTreeMap<String, TaskState>,
}

impl WorkflowDocument {
    /// Serializes the document into the engine's JSON grammar.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum StateKind {
    Task,
}

/// Parameters of a nested-workflow invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParameters {
    /// Address of the workflow to execute.
    #[serde(rename = "StateMachineArn")]
    pub state_machine_arn: String,
}

/// One state of the workflow document. Every state this system emits is a
/// `Task`: either a direct function invocation (with a successor or marked
/// terminal) or a synchronous sub-workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(rename = "Type")]
    kind: StateKind,
    /// Invocation address: a function address, or [`SYNC_EXECUTION_RESOURCE`]
    /// for a nested-workflow execution.
    #[serde(rename = "Resource")]
    pub resource:   String,
    /// Name of the successor state.
    #[serde(rename = "Next", skip_serializing_if = "Option::is_none")]
    pub next:       Option<String>,
    /// Nested-workflow parameters, only set on sub-workflow states.
    #[serde(rename = "Parameters", skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ExecutionParameters>,
    /// Marks a terminal state.
    #[serde(rename = "End", skip_serializing_if = "Option::is_none")]
    pub end:        Option<bool>,
}

impl TaskState {
    /// A function invocation that hands over to the named successor state.
    pub fn transition(resource: String, next: &str) -> TaskState {
        TaskState {
            kind:       StateKind::Task,
            resource,
            next:       Some(next.to_owned()),
            parameters: None,
            end:        None,
        }
    }

    /// A function invocation that completes the pipeline.
    pub fn terminal(resource: String) -> TaskState {
        TaskState {
            kind:       StateKind::Task,
            resource,
            next:       None,
            parameters: None,
            end:        Some(true),
        }
    }

    /// A synchronous execution of another deployed pipeline. Terminal: the
    /// downstream pipeline carries the flow from here.
    pub fn sub_workflow(workflow_arn: String) -> TaskState {
        TaskState {
            kind:       StateKind::Task,
            resource:   SYNC_EXECUTION_RESOURCE.to_owned(),
            next:       None,
            parameters: Some(ExecutionParameters {
                state_machine_arn: workflow_arn,
            }),
            end:        Some(true),
        }
    }
}
