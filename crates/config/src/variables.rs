//! Access to task inputs, pipeline variables and endpoint credentials.
//!
//! The agent exports everything a task can see as process environment
//! variables: inputs as `INPUT_<NAME>`, pipeline variables with `.` mapped
//! to `_`, and endpoint authorizations as `ENDPOINT_AUTH_<ID>` JSON.
//! [`ProcessEnvironment`] reads those; [`MemoryEnvironment`] holds the same
//! data in maps for tests and offline runs.

use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Endpoint that carries the job's OAuth token.
pub const SYSTEM_VSS_CONNECTION: &str = "SystemVssConnection";

/// Authorization block of a service endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointAuthorization {
    /// Scheme-specific parameters (`AccessToken` for OAuth).
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Authorization scheme, e.g. `OAuth`.
    #[serde(default)]
    pub scheme: String,
}

impl EndpointAuthorization {
    /// The `AccessToken` parameter, if present.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.parameters.get("AccessToken").map(String::as_str)
    }
}

/// A variable written back to the store during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableUpdate {
    /// Variable name as it was set
    pub name: String,
    /// New value
    pub value: String,
}

impl fmt::Display for VariableUpdate {
    /// Renders the agent logging command that persists the variable for
    /// later steps of the job.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "##vso[task.setvariable variable={}]{}",
            self.name, self.value
        )
    }
}

/// The variable store a task runs against.
///
/// Values are trimmed and blank values read as absent, matching how the
/// agent task library treats them.
pub trait TaskEnvironment {
    /// Raw task input.
    fn input(&self, name: &str) -> Option<String>;

    /// Raw pipeline variable.
    fn variable(&self, name: &str) -> Option<String>;

    /// Write a variable. Later [`TaskEnvironment::variable`] calls observe it.
    fn set_variable(&mut self, name: &str, value: &str);

    /// Authorization for a service endpoint.
    fn endpoint_authorization(&self, id: &str) -> Result<Option<EndpointAuthorization>>;

    /// Drain the writes made since the last call.
    fn take_updates(&mut self) -> Vec<VariableUpdate>;

    /// Boolean input: true only for a case-insensitive `true`.
    fn bool_input(&self, name: &str) -> bool {
        is_true(self.input(name).as_deref())
    }

    /// Boolean variable: true only for a case-insensitive `true`.
    fn bool_variable(&self, name: &str) -> bool {
        is_true(self.variable(name).as_deref())
    }

    /// Input split on `delimiter`, empty items dropped.
    fn delimited_input(&self, name: &str, delimiter: char) -> Vec<String> {
        self.input(name)
            .map(|value| {
                value
                    .split(delimiter)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Case-insensitive comparison against `true`.
#[must_use]
pub fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn input_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

fn variable_key(name: &str) -> String {
    name.replace(['.', ' '], "_").to_uppercase()
}

fn endpoint_key(id: &str) -> String {
    format!("ENDPOINT_AUTH_{}", id.to_uppercase())
}

fn clean(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads the agent-provided process environment.
///
/// Writes never touch the real process environment; they go to an overlay
/// and are queued as [`VariableUpdate`]s for the caller to emit.
#[derive(Debug, Default)]
pub struct ProcessEnvironment {
    overlay: HashMap<String, String>,
    updates: Vec<VariableUpdate>,
}

impl ProcessEnvironment {
    /// Create an environment reader with an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskEnvironment for ProcessEnvironment {
    fn input(&self, name: &str) -> Option<String> {
        std::env::var(input_key(name)).ok().and_then(clean)
    }

    fn variable(&self, name: &str) -> Option<String> {
        let key = variable_key(name);
        if let Some(value) = self.overlay.get(&key) {
            return clean(value.clone());
        }
        std::env::var(key).ok().and_then(clean)
    }

    fn set_variable(&mut self, name: &str, value: &str) {
        debug!(name, value, "Setting task variable");
        self.overlay.insert(variable_key(name), value.to_string());
        self.updates.push(VariableUpdate {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn endpoint_authorization(&self, id: &str) -> Result<Option<EndpointAuthorization>> {
        match std::env::var(endpoint_key(id)) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(_) => Ok(None),
        }
    }

    fn take_updates(&mut self) -> Vec<VariableUpdate> {
        std::mem::take(&mut self.updates)
    }
}

/// Serialized form of a [`MemoryEnvironment`].
#[derive(Debug, Default, Deserialize)]
struct MemoryDocument {
    #[serde(default)]
    inputs: HashMap<String, String>,
    #[serde(default)]
    variables: HashMap<String, String>,
    #[serde(default)]
    endpoints: HashMap<String, EndpointAuthorization>,
}

/// In-memory variable store.
///
/// Names are normalized the same way the agent normalizes environment keys,
/// so `Build.BuildId` and `BUILD_BUILDID` are the same variable.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvironment {
    inputs: HashMap<String, String>,
    variables: HashMap<String, String>,
    endpoints: HashMap<String, EndpointAuthorization>,
    updates: Vec<VariableUpdate>,
}

impl MemoryEnvironment {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task input.
    #[must_use]
    pub fn with_input(mut self, name: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(input_key(name), value.into());
        self
    }

    /// Add a pipeline variable.
    #[must_use]
    pub fn with_variable(mut self, name: &str, value: impl Into<String>) -> Self {
        self.variables.insert(variable_key(name), value.into());
        self
    }

    /// Add an endpoint authorization.
    #[must_use]
    pub fn with_endpoint(mut self, id: &str, authorization: EndpointAuthorization) -> Self {
        self.endpoints.insert(endpoint_key(id), authorization);
        self
    }

    /// Add an OAuth endpoint carrying `token`.
    #[must_use]
    pub fn with_access_token(self, id: &str, token: impl Into<String>) -> Self {
        let authorization = EndpointAuthorization {
            parameters: HashMap::from([("AccessToken".to_string(), token.into())]),
            scheme: "OAuth".to_string(),
        };
        self.with_endpoint(id, authorization)
    }

    /// Parse a JSON document with `inputs`, `variables` and `endpoints` maps.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: MemoryDocument = serde_json::from_str(json)?;
        let mut env = Self::new();
        for (name, value) in doc.inputs {
            env = env.with_input(&name, value);
        }
        for (name, value) in doc.variables {
            env = env.with_variable(&name, value);
        }
        for (id, authorization) in doc.endpoints {
            env = env.with_endpoint(&id, authorization);
        }
        Ok(env)
    }

    /// Load a JSON document from disk. See [`MemoryEnvironment::from_json`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

impl TaskEnvironment for MemoryEnvironment {
    fn input(&self, name: &str) -> Option<String> {
        self.inputs.get(&input_key(name)).cloned().and_then(clean)
    }

    fn variable(&self, name: &str) -> Option<String> {
        self.variables
            .get(&variable_key(name))
            .cloned()
            .and_then(clean)
    }

    fn set_variable(&mut self, name: &str, value: &str) {
        self.variables
            .insert(variable_key(name), value.to_string());
        self.updates.push(VariableUpdate {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn endpoint_authorization(&self, id: &str) -> Result<Option<EndpointAuthorization>> {
        Ok(self.endpoints.get(&endpoint_key(id)).cloned())
    }

    fn take_updates(&mut self) -> Vec<VariableUpdate> {
        std::mem::take(&mut self.updates)
    }
}
