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

//! Pipewright error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::result;

/// Result type for operations that could result in a [PipewrightError]
pub type Result<T> = result::Result<T, PipewrightError>;

/// Pipewright error
#[derive(Debug)]
pub enum PipewrightError {
    /// Error returned when a pipeline declaration is malformed or violates a
    /// model invariant, e.g. more than one termination step. Raised at
    /// definition-construction time, before any cloud resource is touched.
    InvalidDefinition(String),
    /// Error returned when a pipeline definition contains no function nodes,
    /// so no start state can be selected.
    EmptyDefinition,
    /// Error returned when a cross-pipeline `next` reference names a workflow
    /// that is not registered in the target environment. Fatal to the whole
    /// compile; no partial document is ever emitted.
    PipelineDoesNotExist(String),
    /// Error returned when the deploy configuration is missing a setting that
    /// the given definition requires. Raised eagerly at construction time.
    InvalidConfig(String),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned as a consequence of an error in Pipewright.
    /// This error should not happen in normal usage: it indicates an internal
    /// invariant that we are unable to ask the compiler to check for us was
    /// not verified during execution.
    Internal(String),
    /// Error returned when accessing the AWS services fails.
    AWS(String),
}

impl From<io::Error> for PipewrightError {
    fn from(e: io::Error) -> Self {
        PipewrightError::IoError(e)
    }
}

impl From<serde_json::Error> for PipewrightError {
    fn from(e: serde_json::Error) -> Self {
        PipewrightError::SerdeJson(e)
    }
}

impl From<&str> for PipewrightError {
    fn from(e: &str) -> Self {
        PipewrightError::Internal(e.to_string())
    }
}

impl Display for PipewrightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            PipewrightError::InvalidDefinition(ref desc) => {
                write!(f, "Invalid pipeline definition: {}", desc)
            }
            PipewrightError::EmptyDefinition => {
                write!(f, "Pipeline definition contains no functions")
            }
            PipewrightError::PipelineDoesNotExist(ref name) => {
                write!(f, "Could not find pipeline {}", name)
            }
            PipewrightError::InvalidConfig(ref desc) => {
                write!(f, "Invalid configuration: {}", desc)
            }
            PipewrightError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            PipewrightError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            PipewrightError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in Pipewright's \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
            PipewrightError::AWS(ref desc) => write!(f, "AWS error: {}", desc),
        }
    }
}

impl error::Error for PipewrightError {}
