//! The state carried between workflows and the payload handed to each of them.

use std::{collections::HashMap, env};

use anyhow::{Result, anyhow};

use crate::template::Namespace;

/// Values available to placeholders while a configuration runs.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// The process environment, captured once.
    pub env: HashMap<String, String>,
    /// The outputs of the previous workflow.
    pub input: HashMap<String, String>,
}

impl Context {
    /// Captures the current process environment.
    pub fn from_env() -> Self {
        Self::with_env(env::vars().collect())
    }

    /// Creates a context with a given environment and no input.
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            env,
            input: HashMap::new(),
        }
    }

    /// Looks up a key in a namespace.
    pub fn lookup(&self, namespace: Namespace, key: &str) -> Option<&str> {
        match namespace {
            Namespace::Env => self.env.get(key),
            Namespace::Input => self.input.get(key),
        }
        .map(String::as_str)
    }

    /// Replaces the input with the outputs of a finished workflow.
    pub fn advance(&mut self, output: Payload) {
        self.input = output
            .parameters
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
    }
}

/// The parameters handed to a workflow, or the outputs it returns.
///
/// Keys are always one of the names a workflow declares, hence `'static`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    /// The values by key.
    pub parameters: HashMap<&'static str, String>,
}

impl Payload {
    /// Creates a payload from a map.
    pub fn new(parameters: HashMap<&'static str, String>) -> Self {
        Self { parameters }
    }

    /// Creates a payload from key-value pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        Self::new(pairs.into_iter().collect())
    }

    /// Returns the value of a key, or an empty string if it is absent.
    pub fn parameter(&self, key: &'static str) -> &str {
        self.parameters.get(key).map_or("", String::as_str)
    }

    /// Returns the value of a key if it is present and not empty.
    pub fn optional(&self, key: &'static str) -> Option<&str> {
        Some(self.parameter(key)).filter(|s| !s.is_empty())
    }

    /// Returns the value of a key that must be present and not empty.
    ///
    /// # Errors
    ///
    /// Returns an error naming the key if it is absent or empty.
    pub fn require(&self, key: &'static str) -> Result<&str> {
        self.optional(key)
            .ok_or_else(|| anyhow!("parameter `{key}` is required"))
    }

    /// Interprets a key as a boolean flag. Anything but `true` is `false`.
    pub fn flag(&self, key: &'static str) -> bool {
        self.parameter(key).trim().parse().unwrap_or(false)
    }
}
