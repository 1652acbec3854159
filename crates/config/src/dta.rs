//! Distributed test agent (DTA) environment descriptor and instance counter.

use crate::error::{Error, Result};
use crate::variables::{SYSTEM_VSS_CONNECTION, TaskEnvironment};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use tracing::{debug, info};

/// Variable holding the last instance id handed out in this job.
pub const DTA_INSTANCE_ID: &str = "DTA_INSTANCE_ID";

/// Log file the execution host writes into the working directory.
const HOST_LOG_FILE: &str = "DTAExecutionHost.exe.log";

/// Per-job counter that tells repeated task invocations apart.
///
/// The counter lives in the variable store; [`InstanceCounter::claim`] reads,
/// increments and writes it back in one step so the descriptor builder only
/// ever sees a plain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceCounter {
    last: Option<i64>,
}

impl InstanceCounter {
    /// Load the counter from the store. Non-numeric values count as unset.
    pub fn load(env: &impl TaskEnvironment) -> Self {
        let last = env
            .variable(DTA_INSTANCE_ID)
            .and_then(|raw| raw.parse::<i64>().ok());
        Self { last }
    }

    /// The id the next invocation gets: 1 when unset, otherwise one more
    /// than the stored value.
    #[must_use]
    pub fn next_id(&self) -> i64 {
        self.last.map_or(1, |last| last.saturating_add(1))
    }

    /// Take the next id and persist it.
    pub fn claim(env: &mut impl TaskEnvironment) -> i64 {
        let id = Self::load(&*env).next_id();
        env.set_variable(DTA_INSTANCE_ID, &id.to_string());
        debug!(id, "Claimed DTA instance id");
        id
    }
}

fn expose_token<S: Serializer>(
    token: &SecretString,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(token.expose_secret())
}

/// Where and as whom the distributed run registers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DtaEnvironment {
    /// Collection URL of the server
    pub tfs_collection_url: Option<String>,
    /// OAuth token of the job; redacted in `Debug`
    #[serde(serialize_with = "expose_token")]
    pub pat_token: SecretString,
    /// `<machine>-<agent name>-<agent id>`
    pub agent_name: String,
    /// `dta://env/...` URI shared by every agent of the run
    pub environment_uri: String,
    /// Execution host log file
    pub dta_host_log_file_path: PathBuf,
}

/// Release and build identifiers that decide the shape of the environment URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    /// Deployment phase of a release.
    Release {
        /// `Release.ReleaseId`
        release_id: String,
        /// `Release.DeployPhaseId`
        phase_id: String,
        /// `System.JobId` under multi-configuration parallelism
        job_id: Option<String>,
    },
    /// Build.
    Build {
        /// `Build.BuildId`
        build_id: Option<String>,
    },
}

impl RunScope {
    /// Read the scope from pipeline variables.
    pub fn from_env(env: &impl TaskEnvironment) -> Self {
        let Some(release_id) = env.variable("Release.ReleaseId") else {
            return Self::Build {
                build_id: env.variable("Build.BuildId"),
            };
        };

        let multi_configuration = env
            .variable("System.ParallelExecutionType")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("multiconfiguration"));

        Self::Release {
            release_id,
            phase_id: env.variable("Release.DeployPhaseId").unwrap_or_default(),
            job_id: if multi_configuration {
                Some(env.variable("System.JobId").unwrap_or_default())
            } else {
                None
            },
        }
    }

    /// Compose the environment URI for `project` and `instance_id`.
    #[must_use]
    pub fn environment_uri(&self, project: &str, instance_id: i64) -> String {
        match self {
            Self::Release {
                release_id,
                phase_id,
                job_id: Some(job_id),
            } => format!(
                "dta://env/{project}/_apis/release/{release_id}/{phase_id}/{job_id}/{instance_id}"
            ),
            Self::Release {
                release_id,
                phase_id,
                job_id: None,
            } => format!("dta://env/{project}/_apis/release/{release_id}/{phase_id}/{instance_id}"),
            Self::Build { build_id } => format!(
                "dta://env/{project}/_apis/build/{}/{instance_id}",
                build_id.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// The OAuth token of the job.
///
/// # Errors
///
/// Fails when the job's OAuth endpoint is missing or malformed.
pub fn job_token(env: &impl TaskEnvironment) -> Result<SecretString> {
    env.endpoint_authorization(SYSTEM_VSS_CONNECTION)?
        .and_then(|auth| {
            auth.access_token()
                .map(|token| SecretString::from(token.to_string()))
        })
        .ok_or_else(|| Error::MissingEndpointAuthorization {
            endpoint: SYSTEM_VSS_CONNECTION.to_string(),
        })
}

impl DtaEnvironment {
    /// Build the descriptor for the invocation identified by `instance_id`.
    ///
    /// # Errors
    ///
    /// Fails when the job's OAuth endpoint is missing or malformed.
    pub fn from_env(env: &impl TaskEnvironment, instance_id: i64) -> Result<Self> {
        let token = job_token(env)?;
        Ok(Self::with_token(env, token, instance_id))
    }

    /// Build the descriptor around an already resolved `token`.
    pub fn with_token(env: &impl TaskEnvironment, token: SecretString, instance_id: i64) -> Self {
        let agent_name = [
            env.variable("Agent.MachineName"),
            env.variable("Agent.Name"),
            env.variable("Agent.Id"),
        ]
        .map(Option::unwrap_or_default)
        .join("-");

        let project = env.variable("System.TeamProject").unwrap_or_default();
        let environment_uri = RunScope::from_env(env).environment_uri(&project, instance_id);
        info!("DTA environment: {environment_uri}");

        let working_dir = env
            .variable("System.DefaultWorkingDirectory")
            .map(PathBuf::from)
            .unwrap_or_default();

        Self {
            tfs_collection_url: env.variable("System.TeamFoundationCollectionUri"),
            pat_token: token,
            agent_name,
            environment_uri,
            dta_host_log_file_path: working_dir.join(HOST_LOG_FILE),
        }
    }
}
