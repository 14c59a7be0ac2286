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

//! This module contains all wrapped functions of the AWS Lambda services.
//!
//! Pipeline functions run as container-image Lambda functions. Building and
//! pushing the images happens out-of-band; this module only references the
//! resulting URIs when it creates or refreshes the functions.

use crate::compiler::DeployedFunctionMap;
use crate::config::Config;
use crate::definition::PipelineDefinition;
use crate::error::{PipewrightError, Result};
use log::info;
use rusoto_core::RusotoError;
use rusoto_lambda::{
    CreateFunctionRequest, DeleteFunctionError, DeleteFunctionRequest, FunctionCode,
    GetFunctionRequest, Lambda, LambdaClient, UpdateFunctionCodeRequest,
};

/// Creates or refreshes a single pipeline function.
///
/// If the function already exists its code is pointed at the current image;
/// otherwise the function is created from scratch.
///
/// # Returns
/// The invocation address of the function.
pub async fn deploy_function(
    client: &LambdaClient,
    config: &Config,
    function_name: &str,
) -> Result<String> {
    let full_name = config.resource_name(function_name);
    let image_uri = config.image_uri(function_name);

    if client
        .get_function(GetFunctionRequest {
            function_name: full_name.clone(),
            ..Default::default()
        })
        .await
        .is_ok()
    {
        let conf = client
            .update_function_code(UpdateFunctionCodeRequest {
                function_name: full_name,
                image_uri: Some(image_uri),
                ..Default::default()
            })
            .await
            .map_err(|e| PipewrightError::AWS(e.to_string()))?;
        conf.function_arn
            .ok_or_else(|| PipewrightError::AWS("No function ARN!".to_string()))
    } else {
        let conf = client
            .create_function(CreateFunctionRequest {
                code: FunctionCode {
                    image_uri: Some(image_uri),
                    ..Default::default()
                },
                function_name: full_name,
                package_type: Some("Image".to_owned()),
                role: config.lambda_role_arn.clone(),
                memory_size: Some(config.lambda_memory_size),
                timeout: Some(config.lambda_timeout),
                ..Default::default()
            })
            .await
            .map_err(|e| PipewrightError::AWS(e.to_string()))?;
        conf.function_arn
            .ok_or_else(|| PipewrightError::AWS("No function ARN!".to_string()))
    }
}

/// Deploys every function of the definition, in declaration order, and
/// returns the name-to-address map the compiler consumes. The map must be
/// complete before compilation starts, so each deployment is awaited in
/// turn.
pub async fn deploy_functions(
    client: &LambdaClient,
    config: &Config,
    definition: &PipelineDefinition,
) -> Result<DeployedFunctionMap> {
    let mut addresses = DeployedFunctionMap::new();
    for function in &definition.functions {
        let arn = deploy_function(client, config, &function.name).await?;
        info!("deployed function {} as {}", function.name, arn);
        addresses.insert(function.name.clone(), arn);
    }
    Ok(addresses)
}

/// Deletes a pipeline function. Absorbs not-found so teardown is idempotent.
pub async fn delete_function(
    client: &LambdaClient,
    config: &Config,
    function_name: &str,
) -> Result<()> {
    match client
        .delete_function(DeleteFunctionRequest {
            function_name: config.resource_name(function_name),
            ..Default::default()
        })
        .await
    {
        Ok(_) => Ok(()),
        Err(RusotoError::Service(DeleteFunctionError::ResourceNotFound(_))) => Ok(()),
        Err(e) => Err(PipewrightError::AWS(e.to_string())),
    }
}
