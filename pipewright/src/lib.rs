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

#![warn(missing_docs, clippy::needless_borrow)]

//! Pipewright turns a declarative pipeline definition (a directed chain of
//! serverless functions, a trigger, and optional downstream-pipeline
//! chaining) into a deployed cloud workflow: container-image Lambda
//! functions, a Step Functions state machine orchestrating them, and an
//! EventBridge trigger wiring the whole thing to an event source.

pub mod aws;
pub mod compiler;
pub mod config;
pub mod definition;
pub mod driver;
pub mod error;
pub mod prelude;
