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

//! Deploy-time configuration settings that affect all crates in current
//! system.

use crate::error::{PipewrightError, Result};
use ini::Ini;
use lazy_static::lazy_static;

lazy_static! {
    /// Default settings shipped with the crate.
    pub static ref PIPEWRIGHT_CONF: Ini = Ini::load_from_str(include_str!("config.toml")).unwrap();
}

/// Settings for the external data-platform integration. Only required when a
/// pipeline declares an external trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Bucket the platform lands ingested objects in.
    pub data_bucket:  String,
    /// Layer the raw data is written to, e.g. `raw`.
    pub ingest_layer: String,
}

/// Typed deploy configuration, parsed once and passed explicitly into the
/// components that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Project prefix for every provisioned resource name.
    pub project:                String,
    /// Target environment, e.g. `dev`.
    pub environment:            String,
    /// Container registry holding one image per pipeline function.
    pub registry:               String,
    /// Image tag to deploy.
    pub image_tag:              String,
    /// Execution role assumed by every pipeline function.
    pub lambda_role_arn:        String,
    /// Role assumed by the state machine to invoke its task functions.
    pub state_machine_role_arn: String,
    /// Role assumed by the event trigger to start workflow executions.
    pub trigger_role_arn:       String,
    /// Memory size for every pipeline function, in MB.
    pub lambda_memory_size:     i64,
    /// Timeout for every pipeline function, in seconds.
    pub lambda_timeout:         i64,
    /// Optional data-platform integration settings.
    pub platform:               Option<PlatformConfig>,
}

impl Config {
    /// Builds a configuration from the settings shipped with the crate.
    pub fn try_new() -> Result<Config> {
        Config::from_ini(&PIPEWRIGHT_CONF)
    }

    /// Loads a configuration file from disk.
    pub fn from_path(path: &str) -> Result<Config> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| PipewrightError::InvalidConfig(e.to_string()))?;
        Config::from_ini(&ini)
    }

    /// Builds a typed configuration out of parsed INI settings.
    pub fn from_ini(ini: &Ini) -> Result<Config> {
        let platform = match ini
            .section(Some("platform"))
            .and_then(|s| s.get("data_bucket"))
        {
            Some(bucket) => Some(PlatformConfig {
                data_bucket:  bucket.to_owned(),
                ingest_layer: get(ini, "platform", "ingest_layer")?,
            }),
            None => None,
        };

        Ok(Config {
            project:                get(ini, "core", "project")?,
            environment:            get(ini, "core", "environment")?,
            registry:               get(ini, "aws", "registry")?,
            image_tag:              get(ini, "aws", "image_tag")?,
            lambda_role_arn:        get(ini, "aws", "lambda_role")?,
            state_machine_role_arn: get(ini, "aws", "state_machine_role")?,
            trigger_role_arn:       get(ini, "aws", "trigger_role")?,
            lambda_memory_size:     get(ini, "lambda", "memory_size")?.parse().map_err(|_| {
                PipewrightError::InvalidConfig("`memory_size` must be an integer".to_string())
            })?,
            lambda_timeout:         get(ini, "lambda", "timeout")?.parse().map_err(|_| {
                PipewrightError::InvalidConfig("`timeout` must be an integer".to_string())
            })?,
            platform,
        })
    }

    /// Full name of a provisioned resource: `{project}-{environment}-{name}`.
    pub fn resource_name(&self, name: &str) -> String {
        format!("{}-{}-{}", self.project, self.environment, name)
    }

    /// Container image URI for the given pipeline function.
    pub fn image_uri(&self, function_name: &str) -> String {
        format!(
            "{}/{}:{}",
            self.registry,
            self.resource_name(function_name),
            self.image_tag
        )
    }
}

fn get(ini: &Ini, section: &str, key: &str) -> Result<String> {
    ini.section(Some(section))
        .and_then(|s| s.get(key))
        .map(|v| v.to_owned())
        .ok_or_else(|| {
            PipewrightError::InvalidConfig(format!("missing `{}` in [{}]", key, section))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_load() -> Result<()> {
        let conf = Config::try_new()?;
        assert_eq!("pipewright", conf.project);
        assert_eq!("dev", conf.environment);
        assert_eq!(128, conf.lambda_memory_size);
        assert_eq!(900, conf.lambda_timeout);
        // The shipped settings leave the platform section empty.
        assert!(conf.platform.is_none());
        Ok(())
    }

    #[test]
    fn resource_naming() -> Result<()> {
        let conf = Config::try_new()?;
        assert_eq!(
            "pipewright-dev-extract-orders",
            conf.resource_name("extract-orders")
        );
        assert_eq!(
            "123456789012.dkr.ecr.eu-west-2.amazonaws.com/pipewright-dev-extract-orders:latest",
            conf.image_uri("extract-orders")
        );
        Ok(())
    }

    #[test]
    fn missing_key_is_rejected() {
        let ini = Ini::load_from_str("[core]\nproject = demo\n").unwrap();
        let err = Config::from_ini(&ini).unwrap_err();
        assert!(matches!(err, PipewrightError::InvalidConfig(_)));
        assert!(err.to_string().contains("environment"));
    }

    #[test]
    fn platform_section_is_optional() -> Result<()> {
        let settings = "\
[core]
project = demo
environment = test
[aws]
registry = registry.example.com
image_tag = v1
lambda_role = arn:aws:iam::1:role/lambda
state_machine_role = arn:aws:iam::1:role/states
trigger_role = arn:aws:iam::1:role/trigger
[lambda]
memory_size = 256
timeout = 60
[platform]
data_bucket = landing
ingest_layer = raw
";
        let conf = Config::from_ini(&Ini::load_from_str(settings).unwrap())?;
        let platform = conf.platform.expect("platform section was set");
        assert_eq!("landing", platform.data_bucket);
        assert_eq!("raw", platform.ingest_layer);
        Ok(())
    }
}
