//! The YAML configuration listing the workflows to run.

use std::{collections::HashMap, fmt, path::Path, str::FromStr};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// The root of a configuration file.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// The workflows to run, in order.
    pub workflows: Vec<WorkflowConfig>,
}

/// A single entry of [`Config::workflows`].
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// The type of the workflow, matched case-insensitively against the registry.
    #[serde(rename = "type")]
    pub workflow_type: String,
    /// A human readable name for logs.
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides the retry limit for this workflow.
    #[serde(default)]
    pub retries: Option<u8>,
    /// Raw parameter templates, rendered right before the workflow runs.
    #[serde(default, deserialize_with = "scalar_map")]
    pub parameters: HashMap<String, String>,
}

impl WorkflowConfig {
    /// The name to show in logs.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.workflow_type)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }
}

impl Config {
    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error naming the path if the file cannot be read or is not a valid configuration.
    pub async fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        debug!("loading configuration from {path:?}…");

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read configuration {path:?}"))?;
        let config = content
            .parse::<Self>()
            .with_context(|| format!("invalid configuration {path:?}"))?;

        debug!("loaded {} workflows from {path:?}", config.workflows.len());
        Ok(config)
    }
}

/// Accepts strings, numbers and booleans as parameter values, storing them as strings.
fn scalar_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Scalar(String);

    impl<'de> Deserialize<'de> for Scalar {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct ScalarVisitor;

            impl serde::de::Visitor<'_> for ScalarVisitor {
                type Value = Scalar;

                fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                    formatter.write_str("a string, number or boolean")
                }

                fn visit_str<E>(self, value: &str) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(value.to_owned()))
                }

                fn visit_string<E>(self, value: String) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(value))
                }

                fn visit_bool<E>(self, value: bool) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(value.to_string()))
                }

                fn visit_i64<E>(self, value: i64) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(value.to_string()))
                }

                fn visit_u64<E>(self, value: u64) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(value.to_string()))
                }

                fn visit_f64<E>(self, value: f64) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(value.to_string()))
                }

                fn visit_unit<E>(self) -> Result<Scalar, E>
                where
                    E: serde::de::Error,
                {
                    Ok(Scalar(String::new()))
                }
            }

            deserializer.deserialize_any(ScalarVisitor)
        }
    }

    let map = Option::<HashMap<String, Scalar>>::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .map(|(key, Scalar(value))| (key, value))
        .collect())
}
