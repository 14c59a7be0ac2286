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

//! Event sources that start workflow executions.
//!
//! A trigger materializes as an EventBridge rule. Storage and external
//! triggers match object-landed events with an event pattern; cron triggers
//! fire on a schedule expression. Exactly one of the two is produced per
//! variant.

use crate::config::PlatformConfig;
use crate::error::{PipewrightError, Result};
use serde::Deserialize;
use serde_json::{json, Value};

/// The event source of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Trigger {
    /// Fires when an object lands under a key prefix in a storage bucket.
    Storage {
        /// Rule name, unique within the environment.
        name:       String,
        /// Bucket to watch.
        bucket:     String,
        /// Object key prefix to match.
        key_prefix: String,
    },
    /// Fires on a schedule.
    Cron {
        /// Rule name, unique within the environment.
        name:            String,
        /// Schedule expression, e.g. `cron(0 2 * * ? *)`.
        cron_expression: String,
    },
    /// Fires when the external data platform lands an ingested object for the
    /// given domain/dataset. Requires the `[platform]` configuration section.
    External {
        /// Platform domain the dataset belongs to.
        domain:     String,
        /// Dataset name.
        name:       String,
        /// Pre-provisioned platform client key, if one exists.
        #[serde(default)]
        client_key: Option<String>,
    },
}

impl Trigger {
    /// The trigger's name, used to derive the rule name.
    pub fn name(&self) -> &str {
        match self {
            Trigger::Storage { name, .. } => name,
            Trigger::Cron { name, .. } => name,
            Trigger::External { name, .. } => name,
        }
    }

    /// Whether this trigger needs the `[platform]` configuration section.
    pub fn requires_platform(&self) -> bool {
        matches!(self, Trigger::External { .. })
    }

    /// The event-filter expression for this trigger, `None` for schedules.
    pub fn event_pattern(&self, platform: Option<&PlatformConfig>) -> Result<Option<Value>> {
        match self {
            Trigger::Storage {
                bucket, key_prefix, ..
            } => Ok(Some(object_landed_pattern(bucket, key_prefix))),
            Trigger::Cron { .. } => Ok(None),
            Trigger::External { .. } => {
                let platform = platform.ok_or_else(|| {
                    PipewrightError::InvalidConfig(
                        "an external trigger requires the [platform] section to be set"
                            .to_string(),
                    )
                })?;
                Ok(Some(object_landed_pattern(
                    &platform.data_bucket,
                    &self.platform_key_prefix(&platform.ingest_layer),
                )))
            }
        }
    }

    /// The schedule expression for this trigger, `None` for event patterns.
    pub fn schedule_expression(&self) -> Option<String> {
        match self {
            Trigger::Cron {
                cron_expression, ..
            } => Some(cron_expression.clone()),
            _ => None,
        }
    }

    /// Key prefix the platform lands this dataset's objects under.
    fn platform_key_prefix(&self, layer: &str) -> String {
        match self {
            Trigger::External { domain, name, .. } => {
                format!("data/{}/{}/{}/", layer, domain.to_lowercase(), name)
            }
            _ => unreachable!("only external triggers have a platform prefix"),
        }
    }
}

/// EventBridge pattern matching object-landed events under a key prefix.
fn object_landed_pattern(bucket: &str, key_prefix: &str) -> Value {
    json!({
        "source": ["aws.s3"],
        "detail": {
            "eventSource": ["s3.amazonaws.com"],
            "eventName": ["PutObject", "CompleteMultipartUpload"],
            "requestParameters": {
                "bucketName": [bucket],
                "key": [{"prefix": key_prefix}]
            }
        }
    })
}
