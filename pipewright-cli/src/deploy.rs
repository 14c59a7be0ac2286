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

//! Deploys and destroys pipelines against the target AWS environment.

use anyhow::{Context, Result};
use clap::ArgMatches;
use pipewright::prelude::*;
use rusoto_core::Region;
use rusoto_events::EventBridgeClient;
use rusoto_lambda::LambdaClient;
use rusoto_stepfunctions::StepFunctionsClient;
use std::fs;

fn build_deployer(matches: &ArgMatches) -> Result<Deployer> {
    let config = match matches.value_of("config") {
        Some(path) => Config::from_path(path)?,
        None => Config::try_new()?,
    };

    let path = matches
        .value_of("definition")
        .expect("definition file is required");
    let declaration =
        fs::read_to_string(path).with_context(|| format!("reading declaration {}", path))?;
    let definition = PipelineDefinition::from_json(path, &declaration)?;

    Ok(Deployer::try_new(
        config,
        definition,
        LambdaClient::new(Region::default()),
        StepFunctionsClient::new(Region::default()),
        EventBridgeClient::new(Region::default()),
    )?)
}

pub async fn deploy(matches: &ArgMatches) -> Result<()> {
    let deployer = build_deployer(matches)?;
    let outcome = deployer.deploy().await?;
    println!("deployed workflow {}", outcome.workflow_arn);
    if let Some(rule) = outcome.trigger_rule {
        println!("wired trigger rule {}", rule);
    }
    Ok(())
}

pub async fn destroy(matches: &ArgMatches) -> Result<()> {
    let deployer = build_deployer(matches)?;
    deployer.destroy().await?;
    println!("destroyed pipeline {}", deployer.pipeline_name());
    Ok(())
}
