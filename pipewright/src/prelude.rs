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

//! A "prelude" for users of the pipewright crate.
//!
//! Like the standard library's prelude, this module simplifies importing of
//! common items. Unlike the standard prelude, the contents of this module must
//! be imported manually:
//!
//! ```
//! use pipewright::prelude::*;
//! ```

pub use crate::aws::states::StateMachineRegistry;
pub use crate::compiler::{
    compile, DeployedFunctionMap, PipelineLookup, StaticLookup, TaskState, WorkflowDocument,
    SYNC_EXECUTION_RESOURCE,
};
pub use crate::config::{Config, PlatformConfig};
pub use crate::definition::{FunctionNode, NextRef, PipelineDefinition, Trigger};
pub use crate::driver::{DeployOutcome, Deployer};
pub use crate::error::{PipewrightError, Result};
