//! Error types for task configuration assembly.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration assembly.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort configuration assembly.
///
/// Everything except [`Error::UnsupportedConfiguration`] is a plain
/// configuration error: the task inputs are malformed and the task should
/// fail before any test runs.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The custom test adapter path does not name an existing directory.
    #[error("Path to custom adapters is invalid: {}", path.display())]
    #[diagnostic(
        code(vstest_config::custom_adapters),
        help("Point 'pathtoCustomTestAdapters' at a directory that contains the test adapters")
    )]
    InvalidCustomAdapterPath {
        /// The resolved path that failed the check
        path: PathBuf,
    },

    /// Location method is `version` but no version was given.
    #[error("vsTestVersion is null or empty")]
    #[diagnostic(
        code(vstest_config::missing_version),
        help("Set 'vsTestVersion' to 14.0, 15.0 or latest")
    )]
    MissingVsTestVersion,

    /// The requested test platform version is not one we know.
    #[error("Invalid test platform version: {version}")]
    #[diagnostic(
        code(vstest_config::invalid_version),
        help("Supported values are 14.0, 15.0 and latest")
    )]
    InvalidVsTestVersion {
        /// The rejected version string
        version: String,
    },

    /// The on-demand test run id is not a positive integer.
    #[error("Test run id is invalid: {id}")]
    #[diagnostic(
        code(vstest_config::test_run_id),
        help("'tcmTestRun' must be a positive integer")
    )]
    InvalidTestRunId {
        /// The rejected id as it was supplied
        id: String,
    },

    /// The test selector is not one of the known modes.
    #[error("Unknown test selector: {selector}")]
    #[diagnostic(
        code(vstest_config::test_selector),
        help("Use one of testPlan, testAssemblies or testRun")
    )]
    UnknownTestSelector {
        /// The selector as it was supplied
        selector: String,
    },

    /// The inputs are valid but cannot be honored by the chosen mode.
    #[error("Unsupported configuration: {message}")]
    #[diagnostic(code(vstest_config::unsupported))]
    UnsupportedConfiguration {
        /// What is unsupported
        message: String,
    },

    /// No authorization is available for a service endpoint.
    #[error("No authorization found for endpoint {endpoint}")]
    #[diagnostic(
        code(vstest_config::endpoint_auth),
        help("Allow scripts to access the OAuth token for this job")
    )]
    MissingEndpointAuthorization {
        /// Endpoint id
        endpoint: String,
    },

    /// Wrapped JSON error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(vstest_config::json))]
    Json(#[from] serde_json::Error),

    /// Wrapped I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(vstest_config::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unsupported configuration error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid test run id error.
    #[must_use]
    pub fn invalid_test_run_id(id: impl Into<String>) -> Self {
        Self::InvalidTestRunId { id: id.into() }
    }

    /// Create an invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVsTestVersion {
            version: version.into(),
        }
    }

    /// True when the inputs were well formed but the execution mode cannot
    /// honor them.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedConfiguration { .. })
    }
}
