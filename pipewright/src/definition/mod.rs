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

//! The validated pipeline definition model.
//!
//! A definition is authored once per data pipeline as a small declaration
//! file, parsed here into an immutable [`PipelineDefinition`], and consumed
//! by the topology compiler. All shape and invariant checks happen at
//! construction time, before any cloud resource is touched.

pub mod trigger;

pub use trigger::Trigger;

use crate::error::{PipewrightError, Result};
use log::warn;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;

/// The outgoing edge of a function node, normalized at the model boundary:
/// the compiler never sees the bare-string shorthand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRef {
    /// The named function within the same pipeline runs next.
    Function(String),
    /// The named, independently deployed pipeline is invoked next.
    Pipeline(String),
}

/// One executable step of a pipeline, ultimately backed by a deployed
/// serverless function. A node without a `next` reference is the pipeline's
/// termination step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionNode {
    /// Function name, unique within the definition.
    pub name: String,
    /// The node's outgoing edge, `None` for the termination step.
    #[serde(default, deserialize_with = "deserialize_next")]
    pub next: Option<NextRef>,
}

/// Declaration-level `next` forms. The bare string is a legacy shorthand for
/// a function reference; `type` defaults to `Function` when omitted.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNext {
    Shorthand(String),
    Reference {
        name: String,
        #[serde(rename = "type", default)]
        kind: RefKind,
    },
}

#[derive(Deserialize, Clone, Copy)]
enum RefKind {
    Function,
    Pipeline,
}

impl Default for RefKind {
    fn default() -> Self {
        RefKind::Function
    }
}

impl From<RawNext> for NextRef {
    fn from(raw: RawNext) -> Self {
        match raw {
            RawNext::Shorthand(name) => NextRef::Function(name),
            RawNext::Reference {
                name,
                kind: RefKind::Function,
            } => NextRef::Function(name),
            RawNext::Reference {
                name,
                kind: RefKind::Pipeline,
            } => NextRef::Pipeline(name),
        }
    }
}

fn deserialize_next<'de, D>(deserializer: D) -> std::result::Result<Option<NextRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawNext>::deserialize(deserializer)?.map(NextRef::from))
}

#[derive(Deserialize)]
struct RawDefinition {
    #[serde(default)]
    description: String,
    functions:   Vec<FunctionNode>,
    #[serde(default)]
    trigger:     Option<Trigger>,
}

/// A validated, immutable pipeline definition.
///
/// The order of `functions` is semantically significant: the first declared
/// function is the workflow's entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    /// Path of the declaration file this definition was parsed from.
    pub source_path: String,
    /// Free-text description, carried into the workflow document's comment.
    pub description: String,
    /// The function nodes, in declaration order.
    pub functions:   Vec<FunctionNode>,
    /// Optional event source that starts workflow executions.
    pub trigger:     Option<Trigger>,
}

impl PipelineDefinition {
    /// Builds a definition from already-shaped parts, enforcing the model
    /// invariants. There is no mutation API: changes require constructing a
    /// new instance.
    pub fn try_new(
        source_path: &str,
        description: &str,
        functions: Vec<FunctionNode>,
        trigger: Option<Trigger>,
    ) -> Result<PipelineDefinition> {
        validate_functions(&functions)?;
        Ok(PipelineDefinition {
            source_path: source_path.to_owned(),
            description: description.to_owned(),
            functions,
            trigger,
        })
    }

    /// Parses a JSON declaration.
    pub fn from_json(source_path: &str, declaration: &str) -> Result<PipelineDefinition> {
        let raw: RawDefinition = serde_json::from_str(declaration)
            .map_err(|e| PipewrightError::InvalidDefinition(e.to_string()))?;
        Self::try_new(source_path, &raw.description, raw.functions, raw.trigger)
    }

    /// Parses an already-deserialized declaration value.
    pub fn from_value(source_path: &str, declaration: Value) -> Result<PipelineDefinition> {
        let raw: RawDefinition = serde_json::from_value(declaration)
            .map_err(|e| PipewrightError::InvalidDefinition(e.to_string()))?;
        Self::try_new(source_path, &raw.description, raw.functions, raw.trigger)
    }
}

/// Scans every node (no short-circuit, so the reported error does not depend
/// on where the offending nodes sit) and rejects duplicate names and more
/// than one termination step.
fn validate_functions(functions: &[FunctionNode]) -> Result<()> {
    let mut seen = HashSet::new();
    for function in functions {
        if !seen.insert(function.name.as_str()) {
            return Err(PipewrightError::InvalidDefinition(format!(
                "duplicate function name `{}`",
                function.name
            )));
        }
    }

    let termination_steps = functions
        .iter()
        .filter(|function| function.next.is_none())
        .count();
    if termination_steps > 1 {
        return Err(PipewrightError::InvalidDefinition(
            "pipeline definition can only contain one termination step".to_string(),
        ));
    }
    if termination_steps == 0 && !functions.is_empty() {
        warn!("pipeline definition has no termination step; every function declares a successor");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(name: &str, next: Option<NextRef>) -> FunctionNode {
        FunctionNode {
            name: name.to_owned(),
            next,
        }
    }

    #[test]
    fn shorthand_next_normalizes_to_function_ref() -> Result<()> {
        let definition = PipelineDefinition::from_value(
            "pipelines/orders.json",
            json!({
                "description": "Order ingest",
                "functions": [
                    {"name": "extract", "next": "load"},
                    {"name": "load"}
                ]
            }),
        )?;
        assert_eq!(
            Some(NextRef::Function("load".to_owned())),
            definition.functions[0].next
        );
        assert_eq!(None, definition.functions[1].next);
        Ok(())
    }

    #[test]
    fn structured_next_defaults_to_function_type() -> Result<()> {
        let definition = PipelineDefinition::from_value(
            "pipelines/orders.json",
            json!({
                "functions": [
                    {"name": "extract", "next": {"name": "load"}},
                    {"name": "load"}
                ]
            }),
        )?;
        assert_eq!(
            Some(NextRef::Function("load".to_owned())),
            definition.functions[0].next
        );
        Ok(())
    }

    #[test]
    fn pipeline_next_parses_as_pipeline_ref() -> Result<()> {
        let definition = PipelineDefinition::from_value(
            "pipelines/orders.json",
            json!({
                "functions": [
                    {"name": "extract", "next": {"name": "downstream", "type": "Pipeline"}}
                ]
            }),
        )?;
        assert_eq!(
            Some(NextRef::Pipeline("downstream".to_owned())),
            definition.functions[0].next
        );
        Ok(())
    }

    #[test]
    fn explicit_null_next_is_a_termination_step() -> Result<()> {
        let definition = PipelineDefinition::from_value(
            "pipelines/orders.json",
            json!({
                "functions": [{"name": "extract", "next": null}]
            }),
        )?;
        assert_eq!(None, definition.functions[0].next);
        Ok(())
    }

    #[test]
    fn one_termination_step_is_accepted() {
        let functions = vec![
            node("a", Some(NextRef::Function("b".to_owned()))),
            node("b", None),
        ];
        assert!(PipelineDefinition::try_new("p", "", functions, None).is_ok());
    }

    #[test]
    fn zero_termination_steps_are_tolerated() {
        let functions = vec![
            node("a", Some(NextRef::Function("b".to_owned()))),
            node("b", Some(NextRef::Pipeline("other".to_owned()))),
        ];
        assert!(PipelineDefinition::try_new("p", "", functions, None).is_ok());
    }

    #[test]
    fn two_termination_steps_are_rejected() {
        let functions = vec![
            node("a", None),
            node("b", Some(NextRef::Function("c".to_owned()))),
            node("c", None),
        ];
        let err = PipelineDefinition::try_new("p", "", functions, None).unwrap_err();
        assert!(matches!(err, PipewrightError::InvalidDefinition(_)));
        assert!(err.to_string().contains("one termination step"));
    }

    #[test]
    fn duplicate_function_names_are_rejected() {
        let functions = vec![node("a", Some(NextRef::Function("a".to_owned()))), node("a", None)];
        let err = PipelineDefinition::try_new("p", "", functions, None).unwrap_err();
        assert!(matches!(err, PipewrightError::InvalidDefinition(_)));
    }

    #[test]
    fn malformed_declaration_carries_field_error_text() {
        let err = PipelineDefinition::from_json("p", r#"{"functions": [{"next": "b"}]}"#)
            .unwrap_err();
        assert!(matches!(err, PipewrightError::InvalidDefinition(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn declaration_with_trigger_parses() -> Result<()> {
        let definition = PipelineDefinition::from_value(
            "pipelines/orders.json",
            json!({
                "description": "Order ingest",
                "functions": [{"name": "extract"}],
                "trigger": {
                    "kind": "cron",
                    "name": "nightly",
                    "cron_expression": "cron(0 2 * * ? *)"
                }
            }),
        )?;
        assert!(definition.trigger.is_some());
        Ok(())
    }
}
